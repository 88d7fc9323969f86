//! Default catalog of pet types and action types.
//!
//! The catalog is immutable at runtime. It is either the built-in default or
//! a TOML file named in the configuration, validated once at startup and then
//! handed to the engine.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog_internal);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog with the built-in pets and actions
///
/// **Note**: prefer `get_default_catalog()` for read-only use. This function
/// returns an owned copy that tests and custom catalogs can modify.
pub fn build_default_catalog() -> Catalog {
    build_default_catalog_internal()
}

fn build_default_catalog_internal() -> Catalog {
    let mut pet_types = HashMap::new();
    let mut actions = HashMap::new();

    // ========================================================================
    // Pet Types
    // ========================================================================

    pet_types.insert(
        "cat".into(),
        PetTypeDef {
            id: "cat".into(),
            name: "Cat".into(),
            emoji: Some("🐱".into()),
            base_stats: Stats::new(50.0, 50.0, 50.0),
            decay: DecayRates {
                hunger_per_hour: 5.0,
                happiness_per_hour: 3.0,
                energy_per_hour: 2.0,
            },
            leveling: LevelCurve { xp_per_level: 100 },
        },
    );

    pet_types.insert(
        "dog".into(),
        PetTypeDef {
            id: "dog".into(),
            name: "Dog".into(),
            emoji: Some("🐕".into()),
            base_stats: Stats::new(50.0, 60.0, 60.0),
            decay: DecayRates {
                hunger_per_hour: 6.0,
                happiness_per_hour: 4.0,
                energy_per_hour: 3.0,
            },
            leveling: LevelCurve { xp_per_level: 90 },
        },
    );

    pet_types.insert(
        "rabbit".into(),
        PetTypeDef {
            id: "rabbit".into(),
            name: "Rabbit".into(),
            emoji: Some("🐰".into()),
            base_stats: Stats::new(40.0, 50.0, 55.0),
            decay: DecayRates {
                hunger_per_hour: 7.0,
                happiness_per_hour: 2.5,
                energy_per_hour: 2.0,
            },
            leveling: LevelCurve { xp_per_level: 110 },
        },
    );

    // ========================================================================
    // Actions
    // ========================================================================

    actions.insert(
        "feed".into(),
        ActionTypeDef {
            id: "feed".into(),
            name: "Feed".into(),
            emoji: Some("🍽️".into()),
            deltas: StatDeltas {
                hunger: -30.0,
                happiness: 5.0,
                energy: 0.0,
            },
            // Nothing to eat for a pet that is already full
            requires: vec![StatRequirement {
                stat: Stat::Hunger,
                min: Some(10.0),
                max: None,
            }],
            cooldown_seconds: Some(30 * 60),
            experience_reward: 10,
        },
    );

    actions.insert(
        "play".into(),
        ActionTypeDef {
            id: "play".into(),
            name: "Play".into(),
            emoji: Some("🎾".into()),
            deltas: StatDeltas {
                hunger: 5.0,
                happiness: 25.0,
                energy: -10.0,
            },
            requires: vec![StatRequirement {
                stat: Stat::Energy,
                min: Some(10.0),
                max: None,
            }],
            cooldown_seconds: Some(10 * 60),
            experience_reward: 15,
        },
    );

    actions.insert(
        "sleep".into(),
        ActionTypeDef {
            id: "sleep".into(),
            name: "Put to sleep".into(),
            emoji: Some("😴".into()),
            deltas: StatDeltas {
                hunger: 2.0,
                happiness: 0.0,
                energy: 40.0,
            },
            requires: vec![StatRequirement {
                stat: Stat::Energy,
                min: None,
                max: Some(90.0),
            }],
            cooldown_seconds: Some(60 * 60),
            experience_reward: 5,
        },
    );

    actions.insert(
        "pet".into(),
        ActionTypeDef {
            id: "pet".into(),
            name: "Pet".into(),
            emoji: Some("🤗".into()),
            deltas: StatDeltas {
                hunger: 0.0,
                happiness: 15.0,
                energy: 0.0,
            },
            requires: vec![],
            cooldown_seconds: Some(5 * 60),
            experience_reward: 5,
        },
    );

    Catalog { pet_types, actions }
}

impl Catalog {
    /// Load a catalog from a TOML file and validate it
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let catalog: Catalog = toml::from_str(&contents)?;
        catalog.ensure_valid()?;
        tracing::info!(
            "Loaded catalog from {:?} ({} pet types, {} actions)",
            path,
            catalog.pet_types.len(),
            catalog.actions.len()
        );
        Ok(catalog)
    }

    /// Look up a pet type, failing with a validation error if unknown
    pub fn pet_type(&self, tag: &str) -> Result<&PetTypeDef> {
        self.pet_types
            .get(tag)
            .ok_or_else(|| Error::Validation(format!("Unknown pet type '{}'", tag)))
    }

    /// Look up an action type, failing with a validation error if unknown
    pub fn action_type(&self, tag: &str) -> Result<&ActionTypeDef> {
        self.actions
            .get(tag)
            .ok_or_else(|| Error::Validation(format!("Unknown action type '{}'", tag)))
    }

    /// Turn the list from `validate()` into a single error
    pub fn ensure_valid(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::CatalogValidation(errors.join("; ")))
        }
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.pet_types.is_empty() {
            errors.push("Catalog has no pet types".to_string());
        }
        if self.actions.is_empty() {
            errors.push("Catalog has no actions".to_string());
        }

        for (id, def) in &self.pet_types {
            if id.is_empty() || def.id.is_empty() {
                errors.push("Pet type has empty ID".to_string());
            }
            if id != &def.id {
                errors.push(format!(
                    "Pet type key '{}' doesn't match pet_type.id '{}'",
                    id, def.id
                ));
            }
            if def.name.is_empty() {
                errors.push(format!("Pet type '{}' has empty name", id));
            }
            if !def.base_stats.in_bounds() {
                errors.push(format!("Pet type '{}': base stats outside 0..=100", id));
            }
            for stat in Stat::ALL {
                let rate = def.decay.per_hour(stat);
                if !rate.is_finite() || rate < 0.0 {
                    errors.push(format!(
                        "Pet type '{}': {} decay rate {} must be a non-negative number",
                        id, stat, rate
                    ));
                }
            }
            if def.leveling.xp_per_level == 0 {
                errors.push(format!("Pet type '{}': xp_per_level must be > 0", id));
            }
        }

        for (id, def) in &self.actions {
            if id.is_empty() || def.id.is_empty() {
                errors.push("Action has empty ID".to_string());
            }
            if id != &def.id {
                errors.push(format!(
                    "Action key '{}' doesn't match action.id '{}'",
                    id, def.id
                ));
            }
            if def.name.is_empty() {
                errors.push(format!("Action '{}' has empty name", id));
            }
            for stat in Stat::ALL {
                let delta = match stat {
                    Stat::Hunger => def.deltas.hunger,
                    Stat::Happiness => def.deltas.happiness,
                    Stat::Energy => def.deltas.energy,
                };
                if !delta.is_finite() {
                    errors.push(format!("Action '{}': {} delta is not finite", id, stat));
                }
            }
            for req in &def.requires {
                let in_range = |v: f64| v.is_finite() && (STAT_MIN..=STAT_MAX).contains(&v);
                if req.min.is_none() && req.max.is_none() {
                    errors.push(format!(
                        "Action '{}': {} requirement has neither min nor max",
                        id, req.stat
                    ));
                }
                if req.min.is_some_and(|v| !in_range(v)) || req.max.is_some_and(|v| !in_range(v)) {
                    errors.push(format!(
                        "Action '{}': {} requirement outside 0..=100",
                        id, req.stat
                    ));
                }
                if let (Some(min), Some(max)) = (req.min, req.max) {
                    if min > max {
                        errors.push(format!(
                            "Action '{}': {} requirement min {} > max {}",
                            id, req.stat, min, max
                        ));
                    }
                }
            }
        }

        errors
    }
}
