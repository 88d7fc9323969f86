//! Persistence store contracts.
//!
//! The store holds couples, pets and the append-only action log. Its only
//! business rules are the uniqueness ones that must hold across processes:
//! a user belongs to at most one couple and a couple owns at most one pet.
//! Both are checked under the store's write lock.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::{
    ActionRecord, Couple, CoupleId, Error, NewCouple, NewPet, Pet, PetId, Result, UserId,
};

/// What [`PetStore::update_pet`] should persist
#[derive(Clone, Debug)]
pub enum PetWrite {
    /// Leave storage untouched
    Unchanged(Pet),
    /// Replace the pet's snapshot
    Save(Pet),
    /// Commit the pet together with the record that produced it
    Commit(Pet, ActionRecord),
}

impl PetWrite {
    pub fn pet(&self) -> &Pet {
        match self {
            PetWrite::Unchanged(pet) | PetWrite::Save(pet) | PetWrite::Commit(pet, _) => pet,
        }
    }

    pub fn into_pet(self) -> Pet {
        match self {
            PetWrite::Unchanged(pet) | PetWrite::Save(pet) | PetWrite::Commit(pet, _) => pet,
        }
    }
}

/// Conflict error if either member of `couple` already belongs to one of
/// `existing`
fn membership_conflict<'a>(
    mut existing: impl Iterator<Item = &'a Couple>,
    couple: &NewCouple,
) -> Option<Error> {
    existing.find_map(|c| {
        [couple.user1.id, couple.user2.id]
            .into_iter()
            .find(|&user_id| c.has_member(user_id))
            .map(|user_id| {
                Error::Conflict(format!(
                    "User {} already belongs to couple {}",
                    user_id, c.id
                ))
            })
    })
}

/// Storage operations required by the simulation engine
pub trait PetStore: Send + Sync {
    /// Load a couple by id
    fn get_couple(&self, couple_id: CoupleId) -> Result<Option<Couple>>;

    /// Find the couple a user belongs to, if any
    fn find_couple_by_user(&self, user_id: UserId) -> Result<Option<Couple>>;

    /// Load the pet owned by a couple
    fn get_pet(&self, couple_id: CoupleId) -> Result<Option<Pet>>;

    /// Persist a new couple and return its id.
    ///
    /// Fails with a conflict if either user already belongs to a couple.
    fn create_couple(&self, couple: NewCouple) -> Result<CoupleId>;

    /// Persist a new pet and return its id
    fn create_pet(&self, pet: NewPet) -> Result<PetId>;

    /// Overwrite a pet's stored snapshot
    fn save_pet(&self, pet: &Pet) -> Result<()>;

    /// Append one record to the action log
    fn append_action(&self, record: &ActionRecord) -> Result<()>;

    /// Persist an updated pet together with the record that produced it.
    ///
    /// Implementations must make both writes visible or neither.
    fn commit_action(&self, pet: &Pet, record: &ActionRecord) -> Result<()>;

    /// Load the couple's pet, hand it to `update` and persist what it
    /// returns, all under one write lock.
    ///
    /// Concurrent updates of the same pet, from this process or another,
    /// run one after the other. Returns `None` without calling `update` if
    /// the couple has no pet. An error from `update` leaves storage as it
    /// was.
    fn update_pet(
        &self,
        couple_id: CoupleId,
        update: &mut dyn FnMut(Pet) -> Result<PetWrite>,
    ) -> Result<Option<PetWrite>>;

    /// All records for a couple, oldest first
    fn list_actions(&self, couple_id: CoupleId) -> Result<Vec<ActionRecord>>;

    /// Up to `limit` records for a couple, newest first
    fn list_recent_actions(&self, couple_id: CoupleId, limit: usize) -> Result<Vec<ActionRecord>> {
        let mut actions = self.list_actions(couple_id)?;
        actions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        actions.truncate(limit);
        Ok(actions)
    }
}
