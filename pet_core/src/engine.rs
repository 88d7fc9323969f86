//! Pet simulation engine.
//!
//! Orchestrates the catalog, decay, resolver and store:
//! - Reads bring a pet's stats current and persist the refreshed snapshot
//! - Actions run decay, validation and application inside the store's
//!   locked update and commit the pet together with its history record
//! - Couple and pet creation reject duplicates with a conflict error
//!
//! The store's write lock is the only serialization point, so engines in
//! separate processes sharing one data directory see each other's updates.

use crate::clock::{Clock, DefaultClock, SharedClock};
use crate::decay::{decay, elapsed_seconds};
use crate::leveling::level_for;
use crate::resolver::apply_action;
use crate::store::{PetStore, PetWrite};
use crate::{
    history, ActionRecord, Catalog, Couple, CoupleId, CoupleMember, Error, NewCouple, NewPet,
    Pet, Result, UserId,
};
use std::path::Path;
use std::sync::Arc;

/// Result of a successfully applied action
#[derive(Clone, Debug)]
pub struct ActionOutcome {
    pub pet: Pet,
    pub record: ActionRecord,
    /// Human-readable description built from the action's display name
    pub message: String,
}

/// Whether a user already belongs to a couple
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserStatus {
    pub user_id: UserId,
    pub couple_id: Option<CoupleId>,
}

/// Reactive simulation engine shared across request threads
pub struct PetEngine {
    store: Arc<dyn PetStore>,
    catalog: Arc<Catalog>,
    clock: SharedClock,
}

impl PetEngine {
    pub fn new(store: Arc<dyn PetStore>, catalog: Arc<Catalog>) -> Self {
        Self::with_clock(store, catalog, Arc::new(DefaultClock))
    }

    pub fn with_clock(
        store: Arc<dyn PetStore>,
        catalog: Arc<Catalog>,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // ========================================================================
    // Couples
    // ========================================================================

    /// Create a couple from two distinct users.
    ///
    /// Blank names fall back to "User 1" / "User 2". A user who already
    /// belongs to a couple cannot join another.
    pub fn create_couple(&self, user1: CoupleMember, user2: CoupleMember) -> Result<Couple> {
        if user1.id == 0 || user2.id == 0 {
            return Err(Error::Validation("user1_id and user2_id required".into()));
        }
        if user1.id == user2.id {
            return Err(Error::Validation(
                "A couple needs two different users".into(),
            ));
        }

        let new_couple = NewCouple {
            user1: with_default_name(user1, "User 1"),
            user2: with_default_name(user2, "User 2"),
            created_at: self.clock.utc(),
        };
        let id = self.store.create_couple(new_couple.clone())?;

        tracing::info!(
            "Created couple {} for users {} and {}",
            id,
            new_couple.user1.id,
            new_couple.user2.id
        );

        Ok(Couple {
            id,
            user1: new_couple.user1,
            user2: new_couple.user2,
            created_at: new_couple.created_at,
        })
    }

    /// Report whether `user_id` belongs to a couple
    pub fn user_status(&self, user_id: UserId) -> Result<UserStatus> {
        if user_id == 0 {
            return Err(Error::Validation("user_id required".into()));
        }
        let couple = self.store.find_couple_by_user(user_id)?;
        Ok(UserStatus {
            user_id,
            couple_id: couple.map(|c| c.id),
        })
    }

    /// The couple `user_id` belongs to
    pub fn couple_for_user(&self, user_id: UserId) -> Result<Couple> {
        if user_id == 0 {
            return Err(Error::Validation("user_id required".into()));
        }
        self.store
            .find_couple_by_user(user_id)?
            .ok_or_else(|| Error::NotFound("Couple not found".into()))
    }

    fn require_couple(&self, couple_id: CoupleId) -> Result<Couple> {
        self.store
            .get_couple(couple_id)?
            .ok_or_else(|| Error::NotFound(format!("Couple {} not found", couple_id)))
    }

    // ========================================================================
    // Pets
    // ========================================================================

    /// Create the couple's pet with the pet type's base stats.
    ///
    /// A blank name falls back to "Pet". A couple may own only one pet.
    pub fn create_pet(
        &self,
        couple_id: CoupleId,
        pet_type: &str,
        name: Option<&str>,
    ) -> Result<Pet> {
        if couple_id == 0 || pet_type.trim().is_empty() {
            return Err(Error::Validation("couple_id and pet_type required".into()));
        }

        self.require_couple(couple_id)?;
        let def = self.catalog.pet_type(pet_type)?;

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Pet")
            .to_string();

        let experience = 0;
        let new_pet = NewPet {
            couple_id,
            name,
            pet_type: def.id.clone(),
            stats: def.base_stats,
            experience,
            level: level_for(experience, &def.leveling).level,
            created_at: self.clock.utc(),
        };
        self.store.create_pet(new_pet)?;

        let pet = self
            .store
            .get_pet(couple_id)?
            .ok_or_else(|| Error::Storage(format!("Pet for couple {} vanished", couple_id)))?;

        tracing::info!(
            "Created {} '{}' (pet {}) for couple {}",
            pet.pet_type,
            pet.name,
            pet.id,
            couple_id
        );
        Ok(pet)
    }

    /// Load the couple's pet with stats brought current.
    ///
    /// The refreshed snapshot and advanced watermark are persisted, so the
    /// next read decays from here rather than from the stale baseline.
    pub fn get_pet_state(&self, couple_id: CoupleId) -> Result<Pet> {
        if couple_id == 0 {
            return Err(Error::Validation("couple_id required".into()));
        }

        let written = self.store.update_pet(couple_id, &mut |mut pet| {
            let now = self.clock.utc();
            if now <= pet.last_updated {
                return Ok(PetWrite::Unchanged(pet));
            }

            let def = self.catalog.pet_type(&pet.pet_type)?;
            pet.stats = decay(
                &pet.stats,
                &def.decay,
                elapsed_seconds(pet.last_updated, now),
            );
            pet.last_updated = now;
            tracing::debug!("Refreshed pet {} to {}", pet.id, now);
            Ok(PetWrite::Save(pet))
        })?;

        written
            .map(PetWrite::into_pet)
            .ok_or_else(|| Error::NotFound("Pet not found".into()))
    }

    /// Apply `action_type` to the couple's pet on behalf of `user_id`.
    ///
    /// On any failure nothing is persisted.
    pub fn perform_action(
        &self,
        couple_id: CoupleId,
        action_type: &str,
        user_id: UserId,
    ) -> Result<ActionOutcome> {
        if couple_id == 0 || action_type.trim().is_empty() || user_id == 0 {
            return Err(Error::Validation(
                "couple_id, action_type and user_id required".into(),
            ));
        }

        // Couples are immutable; store calls inside the update would deadlock
        let couple = self.require_couple(couple_id)?;

        let written = self.store.update_pet(couple_id, &mut |pet| {
            match apply_action(
                &self.catalog,
                &couple,
                &pet,
                action_type,
                user_id,
                self.clock.utc(),
            ) {
                Ok(resolved) => Ok(PetWrite::Commit(resolved.pet, resolved.record)),
                Err(e) => {
                    tracing::info!(
                        "Rejected '{}' on pet {} by user {}: {}",
                        action_type,
                        pet.id,
                        user_id,
                        e
                    );
                    Err(e)
                }
            }
        })?;

        let (pet, record) = match written {
            Some(PetWrite::Commit(pet, record)) => (pet, record),
            Some(_) => {
                return Err(Error::Storage(format!(
                    "Action on pet for couple {} was not committed",
                    couple_id
                )))
            }
            None => return Err(Error::NotFound("Pet not found".into())),
        };

        let action = self.catalog.action_type(&record.action_type)?;
        let message = format!("Action \"{}\" performed!", action.name);

        tracing::info!(
            "User {} performed '{}' on pet {} (xp {}, level {})",
            user_id,
            action.id,
            pet.id,
            pet.experience,
            pet.level
        );

        Ok(ActionOutcome {
            pet,
            record,
            message,
        })
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Most recent actions for a couple, newest first, at most 10
    pub fn recent_actions(
        &self,
        couple_id: CoupleId,
        limit: Option<usize>,
    ) -> Result<Vec<ActionRecord>> {
        if couple_id == 0 {
            return Err(Error::Validation("couple_id required".into()));
        }
        self.store
            .list_recent_actions(couple_id, history::effective_limit(limit))
    }

    /// Export a couple's full action log to CSV, oldest first
    pub fn export_history(&self, couple_id: CoupleId, path: &Path) -> Result<usize> {
        if couple_id == 0 {
            return Err(Error::Validation("couple_id required".into()));
        }
        self.require_couple(couple_id)?;
        let records = self.store.list_actions(couple_id)?;
        history::export_csv(&records, path)
    }
}

fn with_default_name(member: CoupleMember, fallback: &str) -> CoupleMember {
    let name = member.name.trim();
    CoupleMember {
        id: member.id,
        name: if name.is_empty() {
            fallback.to_string()
        } else {
            name.to_string()
        },
    }
}
