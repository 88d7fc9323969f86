//! In-memory store, used by tests and embedders that bring their own
//! durability.

use super::{membership_conflict, PetStore, PetWrite};
use crate::{
    ActionRecord, Couple, CoupleId, Error, NewCouple, NewPet, Pet, PetId, Result, UserId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    couples: BTreeMap<CoupleId, Couple>,
    pets: HashMap<CoupleId, Pet>,
    actions: Vec<ActionRecord>,
    next_couple_id: CoupleId,
    next_pet_id: PetId,
}

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Storage("memory store lock was poisoned".into()))
    }
}

impl PetStore for MemoryStore {
    fn get_couple(&self, couple_id: CoupleId) -> Result<Option<Couple>> {
        Ok(self.lock()?.couples.get(&couple_id).cloned())
    }

    fn find_couple_by_user(&self, user_id: UserId) -> Result<Option<Couple>> {
        Ok(self
            .lock()?
            .couples
            .values()
            .find(|c| c.has_member(user_id))
            .cloned())
    }

    fn get_pet(&self, couple_id: CoupleId) -> Result<Option<Pet>> {
        Ok(self.lock()?.pets.get(&couple_id).cloned())
    }

    fn create_couple(&self, couple: NewCouple) -> Result<CoupleId> {
        let mut inner = self.lock()?;
        if let Some(conflict) = membership_conflict(inner.couples.values(), &couple) {
            return Err(conflict);
        }
        inner.next_couple_id += 1;
        let id = inner.next_couple_id;
        inner.couples.insert(
            id,
            Couple {
                id,
                user1: couple.user1,
                user2: couple.user2,
                created_at: couple.created_at,
            },
        );
        Ok(id)
    }

    fn create_pet(&self, pet: NewPet) -> Result<PetId> {
        let mut inner = self.lock()?;
        if inner.pets.contains_key(&pet.couple_id) {
            return Err(Error::Conflict(format!(
                "Couple {} already has a pet",
                pet.couple_id
            )));
        }
        inner.next_pet_id += 1;
        let id = inner.next_pet_id;
        inner.pets.insert(
            pet.couple_id,
            Pet {
                id,
                couple_id: pet.couple_id,
                name: pet.name,
                pet_type: pet.pet_type,
                stats: pet.stats,
                experience: pet.experience,
                level: pet.level,
                created_at: pet.created_at,
                last_updated: pet.created_at,
                last_performed: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    fn save_pet(&self, pet: &Pet) -> Result<()> {
        self.lock()?.pets.insert(pet.couple_id, pet.clone());
        Ok(())
    }

    fn append_action(&self, record: &ActionRecord) -> Result<()> {
        self.lock()?.actions.push(record.clone());
        Ok(())
    }

    fn commit_action(&self, pet: &Pet, record: &ActionRecord) -> Result<()> {
        // One guard covers both writes
        let mut inner = self.lock()?;
        inner.actions.push(record.clone());
        inner.pets.insert(pet.couple_id, pet.clone());
        Ok(())
    }

    fn update_pet(
        &self,
        couple_id: CoupleId,
        update: &mut dyn FnMut(Pet) -> Result<PetWrite>,
    ) -> Result<Option<PetWrite>> {
        let mut inner = self.lock()?;
        let Some(pet) = inner.pets.get(&couple_id).cloned() else {
            return Ok(None);
        };

        let write = update(pet)?;
        match &write {
            PetWrite::Unchanged(_) => {}
            PetWrite::Save(pet) => {
                inner.pets.insert(pet.couple_id, pet.clone());
            }
            PetWrite::Commit(pet, record) => {
                inner.actions.push(record.clone());
                inner.pets.insert(pet.couple_id, pet.clone());
            }
        }
        Ok(Some(write))
    }

    fn list_actions(&self, couple_id: CoupleId) -> Result<Vec<ActionRecord>> {
        Ok(self
            .lock()?
            .actions
            .iter()
            .filter(|r| r.couple_id == couple_id)
            .cloned()
            .collect())
    }
}
