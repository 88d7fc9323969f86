//! JSON shapes returned to the boundary layer.
//!
//! Field names match what the mini-app client already reads.

use crate::engine::{ActionOutcome, UserStatus};
use crate::{ActionRecord, Couple, CoupleId, Error, Pet, PetId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Stats are stored with full precision and rendered to one decimal
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `{id, name, type, hunger, happiness, energy, level, experience, last_updated, mood}`
#[derive(Debug, Serialize)]
pub struct PetStateResponse {
    pub id: PetId,
    pub name: String,
    #[serde(rename = "type")]
    pub pet_type: String,
    pub hunger: f64,
    pub happiness: f64,
    pub energy: f64,
    pub level: u32,
    pub experience: u64,
    pub last_updated: DateTime<Utc>,
    pub mood: Vec<&'static str>,
}

impl From<&Pet> for PetStateResponse {
    fn from(pet: &Pet) -> Self {
        Self {
            id: pet.id,
            name: pet.name.clone(),
            pet_type: pet.pet_type.clone(),
            hunger: round1(pet.stats.hunger),
            happiness: round1(pet.stats.happiness),
            energy: round1(pet.stats.energy),
            level: pet.level,
            experience: pet.experience,
            last_updated: pet.last_updated,
            mood: pet.mood(),
        }
    }
}

/// Pet as embedded in an action result (no watermark)
#[derive(Debug, Serialize)]
pub struct ActionPet {
    pub id: PetId,
    pub name: String,
    #[serde(rename = "type")]
    pub pet_type: String,
    pub hunger: f64,
    pub happiness: f64,
    pub energy: f64,
    pub level: u32,
    pub experience: u64,
}

impl From<&Pet> for ActionPet {
    fn from(pet: &Pet) -> Self {
        Self {
            id: pet.id,
            name: pet.name.clone(),
            pet_type: pet.pet_type.clone(),
            hunger: round1(pet.stats.hunger),
            happiness: round1(pet.stats.happiness),
            energy: round1(pet.stats.energy),
            level: pet.level,
            experience: pet.experience,
        }
    }
}

/// `{success, pet, action, message}`; a rejected action is reported as a
/// [`FailureResponse`]
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub pet: ActionPet,
    pub action: String,
    pub message: String,
}

impl From<&ActionOutcome> for ActionResponse {
    fn from(outcome: &ActionOutcome) -> Self {
        Self {
            success: true,
            pet: ActionPet::from(&outcome.pet),
            action: outcome.record.action_type.clone(),
            message: outcome.message.clone(),
        }
    }
}

/// `{success: false, error}`
#[derive(Debug, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
}

impl From<&Error> for FailureResponse {
    fn from(err: &Error) -> Self {
        Self {
            success: false,
            error: err.to_string(),
        }
    }
}

/// `{actions: [...]}`, newest first
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub actions: Vec<ActionRecord>,
}

/// `{user_id, has_couple, couple_id}`
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user_id: UserId,
    pub has_couple: bool,
    pub couple_id: Option<CoupleId>,
}

impl From<&UserStatus> for UserResponse {
    fn from(status: &UserStatus) -> Self {
        Self {
            user_id: status.user_id,
            has_couple: status.couple_id.is_some(),
            couple_id: status.couple_id,
        }
    }
}

/// `{id, user1_id, user2_id, user1_name, user2_name, created_at}`
#[derive(Debug, Serialize)]
pub struct CoupleResponse {
    pub id: CoupleId,
    pub user1_id: UserId,
    pub user2_id: UserId,
    pub user1_name: String,
    pub user2_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Couple> for CoupleResponse {
    fn from(couple: &Couple) -> Self {
        Self {
            id: couple.id,
            user1_id: couple.user1.id,
            user2_id: couple.user2.id,
            user1_name: couple.user1.name.clone(),
            user2_name: couple.user2.name.clone(),
            created_at: couple.created_at,
        }
    }
}

/// `{success: true, couple_id, message}`
#[derive(Debug, Serialize)]
pub struct CoupleCreatedResponse {
    pub success: bool,
    pub couple_id: CoupleId,
    pub message: String,
}

impl CoupleCreatedResponse {
    pub fn new(couple_id: CoupleId) -> Self {
        Self {
            success: true,
            couple_id,
            message: "Couple created successfully!".into(),
        }
    }
}

/// `{success: true, pet_id, message}`
#[derive(Debug, Serialize)]
pub struct PetCreatedResponse {
    pub success: bool,
    pub pet_id: PetId,
    pub message: String,
}

impl PetCreatedResponse {
    pub fn new(pet_id: PetId) -> Self {
        Self {
            success: true,
            pet_id,
            message: "Pet created successfully!".into(),
        }
    }
}
