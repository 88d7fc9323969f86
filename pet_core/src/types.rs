//! Core domain types for the Petpal system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Stats and the three simulated stat kinds
//! - Couples and their members
//! - Pets and action records
//! - Catalog definitions (pet types, action types)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use uuid::Uuid;

/// External user identifier (e.g. a messenger account id)
pub type UserId = i64;

/// Store-assigned couple identifier, never zero
pub type CoupleId = u64;

/// Store-assigned pet identifier, never zero
pub type PetId = u64;

/// Lower bound of every stat
pub const STAT_MIN: f64 = 0.0;

/// Upper bound of every stat
pub const STAT_MAX: f64 = 100.0;

// ============================================================================
// Stats
// ============================================================================

/// One of the three simulated stats
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Hunger,
    Happiness,
    Energy,
}

impl Stat {
    pub const ALL: [Stat; 3] = [Stat::Hunger, Stat::Happiness, Stat::Energy];

    /// The extreme this stat drifts toward when the pet is left alone.
    ///
    /// Hunger rises toward 100 ("starving"); happiness and energy fall to 0.
    pub fn neglected_extreme(self) -> f64 {
        match self {
            Stat::Hunger => STAT_MAX,
            Stat::Happiness | Stat::Energy => STAT_MIN,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stat::Hunger => "hunger",
            Stat::Happiness => "happiness",
            Stat::Energy => "energy",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a raw stat value into `[0, 100]`
pub fn clamp_stat(value: f64) -> f64 {
    if value.is_nan() {
        return STAT_MIN;
    }
    value.clamp(STAT_MIN, STAT_MAX)
}

/// Snapshot of the three bounded stats
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Stats {
    pub hunger: f64,
    pub happiness: f64,
    pub energy: f64,
}

impl Stats {
    /// Build a snapshot, clamping every value into range
    pub fn new(hunger: f64, happiness: f64, energy: f64) -> Self {
        Self {
            hunger: clamp_stat(hunger),
            happiness: clamp_stat(happiness),
            energy: clamp_stat(energy),
        }
    }

    pub fn get(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Hunger => self.hunger,
            Stat::Happiness => self.happiness,
            Stat::Energy => self.energy,
        }
    }

    /// Set a stat, clamping it into `[0, 100]`
    pub fn set(&mut self, stat: Stat, value: f64) {
        let value = clamp_stat(value);
        match stat {
            Stat::Hunger => self.hunger = value,
            Stat::Happiness => self.happiness = value,
            Stat::Energy => self.energy = value,
        }
    }

    /// Apply signed deltas and clamp each result
    pub fn apply(&self, deltas: &StatDeltas) -> Self {
        Self::new(
            self.hunger + deltas.hunger,
            self.happiness + deltas.happiness,
            self.energy + deltas.energy,
        )
    }

    pub fn in_bounds(&self) -> bool {
        Stat::ALL
            .iter()
            .all(|s| (STAT_MIN..=STAT_MAX).contains(&self.get(*s)))
    }
}

/// Signed per-stat changes applied by an action
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct StatDeltas {
    #[serde(default)]
    pub hunger: f64,
    #[serde(default)]
    pub happiness: f64,
    #[serde(default)]
    pub energy: f64,
}

// ============================================================================
// Couples
// ============================================================================

/// One of the two users in a couple
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoupleMember {
    pub id: UserId,
    pub name: String,
}

/// Two users who jointly own a pet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Couple {
    pub id: CoupleId,
    pub user1: CoupleMember,
    pub user2: CoupleMember,
    pub created_at: DateTime<Utc>,
}

impl Couple {
    pub fn has_member(&self, user_id: UserId) -> bool {
        self.user1.id == user_id || self.user2.id == user_id
    }
}

/// Couple creation request handed to the store
#[derive(Clone, Debug)]
pub struct NewCouple {
    pub user1: CoupleMember,
    pub user2: CoupleMember,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Pets
// ============================================================================

/// A couple's pet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Pet {
    pub id: PetId,
    pub couple_id: CoupleId,
    pub name: String,
    pub pet_type: String,
    pub stats: Stats,
    pub experience: u64,
    pub level: u32,
    pub created_at: DateTime<Utc>,
    /// Decay watermark: stats are current as of this instant
    pub last_updated: DateTime<Utc>,
    /// Last time each action type was applied, for cooldowns
    #[serde(default)]
    pub last_performed: BTreeMap<String, DateTime<Utc>>,
}

impl Pet {
    pub fn snapshot(&self) -> PetSnapshot {
        PetSnapshot {
            hunger: self.stats.hunger,
            happiness: self.stats.happiness,
            energy: self.stats.energy,
            experience: self.experience,
            level: self.level,
        }
    }

    /// Short human-readable mood descriptors derived from the stats
    pub fn mood(&self) -> Vec<&'static str> {
        let mut mood = Vec::new();

        if self.stats.hunger >= 80.0 {
            mood.push("very hungry");
        } else if self.stats.hunger >= 60.0 {
            mood.push("hungry");
        }

        if self.stats.happiness <= 20.0 {
            mood.push("very sad");
        } else if self.stats.happiness <= 40.0 {
            mood.push("sad");
        } else if self.stats.happiness >= 80.0 {
            mood.push("very happy");
        }

        if self.stats.energy <= 20.0 {
            mood.push("exhausted");
        } else if self.stats.energy <= 40.0 {
            mood.push("tired");
        } else if self.stats.energy >= 80.0 {
            mood.push("full of energy");
        }

        if mood.is_empty() {
            mood.push("feeling fine");
        }
        mood
    }
}

/// Pet creation request handed to the store
#[derive(Clone, Debug)]
pub struct NewPet {
    pub couple_id: CoupleId,
    pub name: String,
    pub pet_type: String,
    pub stats: Stats,
    pub experience: u64,
    pub level: u32,
    pub created_at: DateTime<Utc>,
}

/// Stats, experience and level captured after an action
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct PetSnapshot {
    pub hunger: f64,
    pub happiness: f64,
    pub energy: f64,
    pub experience: u64,
    pub level: u32,
}

/// Immutable entry in the append-only action log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActionRecord {
    pub id: Uuid,
    pub couple_id: CoupleId,
    pub pet_id: PetId,
    pub user_id: UserId,
    pub action_type: String,
    pub timestamp: DateTime<Utc>,
    pub experience_gained: u64,
    pub snapshot: PetSnapshot,
}

// ============================================================================
// Catalog Types
// ============================================================================

/// Per-hour drift of each stat toward its neglected extreme.
///
/// Rates are magnitudes; the direction comes from [`Stat::neglected_extreme`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct DecayRates {
    pub hunger_per_hour: f64,
    pub happiness_per_hour: f64,
    pub energy_per_hour: f64,
}

impl DecayRates {
    pub fn per_hour(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Hunger => self.hunger_per_hour,
            Stat::Happiness => self.happiness_per_hour,
            Stat::Energy => self.energy_per_hour,
        }
    }
}

/// Experience curve for a pet type.
///
/// Going from level `L` to `L + 1` costs `xp_per_level * L` experience.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelCurve {
    pub xp_per_level: u64,
}

/// A pet species definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PetTypeDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub emoji: Option<String>,
    pub base_stats: Stats,
    pub decay: DecayRates,
    pub leveling: LevelCurve,
}

/// Inclusive bounds a stat must satisfy before an action may run
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct StatRequirement {
    pub stat: Stat,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// A player action definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionTypeDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub emoji: Option<String>,
    pub deltas: StatDeltas,
    #[serde(default)]
    pub requires: Vec<StatRequirement>,
    #[serde(default)]
    pub cooldown_seconds: Option<u64>,
    pub experience_reward: u64,
}

/// The complete catalog of pet and action types
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    pub pet_types: HashMap<String, PetTypeDef>,
    pub actions: HashMap<String, ActionTypeDef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pet(hunger: f64, happiness: f64, energy: f64) -> Pet {
        let now = Utc::now();
        Pet {
            id: 1,
            couple_id: 1,
            name: "Murzik".into(),
            pet_type: "cat".into(),
            stats: Stats::new(hunger, happiness, energy),
            experience: 0,
            level: 1,
            created_at: now,
            last_updated: now,
            last_performed: BTreeMap::new(),
        }
    }

    #[test]
    fn test_stats_new_clamps() {
        let stats = Stats::new(150.0, -20.0, 50.0);
        assert_eq!(stats.hunger, 100.0);
        assert_eq!(stats.happiness, 0.0);
        assert_eq!(stats.energy, 50.0);
        assert!(stats.in_bounds());
    }

    #[test]
    fn test_apply_deltas_clamps() {
        let stats = Stats::new(10.0, 95.0, 40.0);
        let next = stats.apply(&StatDeltas {
            hunger: -30.0,
            happiness: 25.0,
            energy: 20.0,
        });
        assert_eq!(next.hunger, 0.0);
        assert_eq!(next.happiness, 100.0);
        assert_eq!(next.energy, 60.0);
    }

    #[test]
    fn test_nan_clamps_to_min() {
        assert_eq!(clamp_stat(f64::NAN), 0.0);
    }

    #[test]
    fn test_couple_membership() {
        let couple = Couple {
            id: 3,
            user1: CoupleMember { id: 10, name: "A".into() },
            user2: CoupleMember { id: 20, name: "B".into() },
            created_at: Utc::now(),
        };
        assert!(couple.has_member(10));
        assert!(couple.has_member(20));
        assert!(!couple.has_member(30));
    }

    #[test]
    fn test_mood_descriptors() {
        assert_eq!(sample_pet(50.0, 50.0, 50.0).mood(), vec!["feeling fine"]);
        assert_eq!(
            sample_pet(85.0, 10.0, 90.0).mood(),
            vec!["very hungry", "very sad", "full of energy"]
        );
    }
}
