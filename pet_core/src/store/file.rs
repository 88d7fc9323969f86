//! File-backed store.
//!
//! Layout under the data directory:
//! - `registry.json`: couples and id counters
//! - `pets/<couple_id>.json`: one snapshot per pet, replaced atomically
//! - `actions.wal`: append-only JSONL action log
//! - `store.lock`: advisory lock serializing writers across processes
//!
//! An action commits when its record reaches the WAL. The pet snapshot is
//! written afterwards; if that second write fails or is lost, the commit
//! still stands and `get_pet` rolls the pet forward from the newest WAL
//! record for its couple.

use super::{membership_conflict, PetStore, PetWrite};
use crate::{
    ActionRecord, Couple, CoupleId, Error, NewCouple, NewPet, Pet, PetId, Result, UserId,
};
use fs2::FileExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;

const REGISTRY_FILE: &str = "registry.json";
const PETS_DIR: &str = "pets";
const WAL_FILE: &str = "actions.wal";
const LOCK_FILE: &str = "store.lock";

/// Couples plus the id counters for couples and pets
#[derive(Debug, Default, Serialize, Deserialize)]
struct Registry {
    next_couple_id: CoupleId,
    next_pet_id: PetId,
    #[serde(default)]
    couples: Vec<Couple>,
}

/// Held for the duration of one store operation
struct StoreLock<'a> {
    _guard: MutexGuard<'a, ()>,
    file: File,
}

impl Drop for StoreLock<'_> {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Store persisted as JSON files under a data directory
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    io: Mutex<()>,
}

impl FileStore {
    /// Open (or initialize) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(PETS_DIR))?;
        tracing::debug!("Opened file store at {:?}", root);
        Ok(Self {
            root,
            io: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn wal_path(&self) -> PathBuf {
        self.root.join(WAL_FILE)
    }

    fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    fn pet_path(&self, couple_id: CoupleId) -> PathBuf {
        self.root.join(PETS_DIR).join(format!("{}.json", couple_id))
    }

    fn lock(&self, exclusive: bool) -> Result<StoreLock<'_>> {
        let guard = self
            .io
            .lock()
            .map_err(|_| Error::Storage("file store lock was poisoned".into()))?;

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.root.join(LOCK_FILE))?;
        if exclusive {
            file.lock_exclusive()?;
        } else {
            file.lock_shared()?;
        }

        Ok(StoreLock {
            _guard: guard,
            file,
        })
    }

    fn load_registry(&self) -> Result<Registry> {
        Ok(read_json(&self.registry_path())?.unwrap_or_default())
    }

    fn load_pet_snapshot(&self, couple_id: CoupleId) -> Result<Option<Pet>> {
        read_json(&self.pet_path(couple_id))
    }

    fn append_wal(&self, record: &ActionRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(self.wal_path())?;

        // A torn write from a crash must not swallow the next record
        let needs_newline = if file.metadata()?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            last[0] != b'\n'
        } else {
            false
        };

        let mut writer = std::io::BufWriter::new(&file);
        if needs_newline {
            writer.write_all(b"\n")?;
        }
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);
        file.sync_data()?;

        tracing::debug!("Appended action {} to WAL", record.id);
        Ok(())
    }

    /// Snapshot rolled forward to the WAL. Caller holds the store lock.
    fn load_pet(&self, couple_id: CoupleId) -> Result<Option<Pet>> {
        let Some(mut pet) = self.load_pet_snapshot(couple_id)? else {
            return Ok(None);
        };

        let newest = read_wal(&self.wal_path())?
            .into_iter()
            .filter(|r| r.couple_id == couple_id)
            .max_by_key(|r| r.timestamp);

        if let Some(record) = newest {
            if record.timestamp > pet.last_updated {
                tracing::warn!(
                    "Pet snapshot for couple {} is behind the action log, rolling forward to {}",
                    couple_id,
                    record.id
                );
                roll_forward(&mut pet, &record);
            }
        }

        Ok(Some(pet))
    }

    /// Append the record, then write the snapshot. Caller holds the
    /// exclusive store lock.
    ///
    /// Once the record is in the WAL the action is durable, so a failed
    /// snapshot write is logged and left for roll-forward.
    fn commit_locked(&self, pet: &Pet, record: &ActionRecord) -> Result<()> {
        self.append_wal(record)?;
        if let Err(e) = write_json_atomic(&self.pet_path(pet.couple_id), pet) {
            tracing::warn!(
                "Action {} committed but the snapshot for couple {} was not written: {}",
                record.id,
                pet.couple_id,
                e
            );
        }
        Ok(())
    }
}

impl PetStore for FileStore {
    fn get_couple(&self, couple_id: CoupleId) -> Result<Option<Couple>> {
        let _lock = self.lock(false)?;
        Ok(self
            .load_registry()?
            .couples
            .into_iter()
            .find(|c| c.id == couple_id))
    }

    fn find_couple_by_user(&self, user_id: UserId) -> Result<Option<Couple>> {
        let _lock = self.lock(false)?;
        Ok(self
            .load_registry()?
            .couples
            .into_iter()
            .find(|c| c.has_member(user_id)))
    }

    fn get_pet(&self, couple_id: CoupleId) -> Result<Option<Pet>> {
        let _lock = self.lock(false)?;
        self.load_pet(couple_id)
    }

    fn create_couple(&self, couple: NewCouple) -> Result<CoupleId> {
        let _lock = self.lock(true)?;
        let mut registry = self.load_registry()?;
        if let Some(conflict) = membership_conflict(registry.couples.iter(), &couple) {
            return Err(conflict);
        }

        registry.next_couple_id += 1;
        let id = registry.next_couple_id;
        registry.couples.push(Couple {
            id,
            user1: couple.user1,
            user2: couple.user2,
            created_at: couple.created_at,
        });

        write_json_atomic(&self.registry_path(), &registry)?;
        tracing::debug!("Stored couple {}", id);
        Ok(id)
    }

    fn create_pet(&self, pet: NewPet) -> Result<PetId> {
        let _lock = self.lock(true)?;
        let path = self.pet_path(pet.couple_id);
        if path.exists() {
            return Err(Error::Conflict(format!(
                "Couple {} already has a pet",
                pet.couple_id
            )));
        }

        // Consume the id before writing the pet so a crash leaves a gap,
        // never a reused id
        let mut registry = self.load_registry()?;
        registry.next_pet_id += 1;
        let id = registry.next_pet_id;
        write_json_atomic(&self.registry_path(), &registry)?;

        let pet = Pet {
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
        };
        write_json_atomic(&path, &pet)?;
        tracing::debug!("Stored pet {} for couple {}", id, pet.couple_id);
        Ok(id)
    }

    fn save_pet(&self, pet: &Pet) -> Result<()> {
        let _lock = self.lock(true)?;
        write_json_atomic(&self.pet_path(pet.couple_id), pet)
    }

    fn append_action(&self, record: &ActionRecord) -> Result<()> {
        let _lock = self.lock(true)?;
        self.append_wal(record)
    }

    fn commit_action(&self, pet: &Pet, record: &ActionRecord) -> Result<()> {
        let _lock = self.lock(true)?;
        self.commit_locked(pet, record)
    }

    fn update_pet(
        &self,
        couple_id: CoupleId,
        update: &mut dyn FnMut(Pet) -> Result<PetWrite>,
    ) -> Result<Option<PetWrite>> {
        let _lock = self.lock(true)?;
        let Some(pet) = self.load_pet(couple_id)? else {
            return Ok(None);
        };

        let write = update(pet)?;
        match &write {
            PetWrite::Unchanged(_) => {}
            PetWrite::Save(pet) => write_json_atomic(&self.pet_path(pet.couple_id), pet)?,
            PetWrite::Commit(pet, record) => self.commit_locked(pet, record)?,
        }
        Ok(Some(write))
    }

    fn list_actions(&self, couple_id: CoupleId) -> Result<Vec<ActionRecord>> {
        let _lock = self.lock(false)?;
        let mut actions: Vec<_> = read_wal(&self.wal_path())?
            .into_iter()
            .filter(|r| r.couple_id == couple_id)
            .collect();
        actions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(actions)
    }
}

/// Bring a stale pet snapshot up to the state recorded in `record`
fn roll_forward(pet: &mut Pet, record: &ActionRecord) {
    let snap = &record.snapshot;
    pet.stats = crate::Stats::new(snap.hunger, snap.happiness, snap.energy);
    pet.experience = pet.experience.max(snap.experience);
    pet.level = snap.level;
    pet.last_updated = record.timestamp;
    pet.last_performed
        .insert(record.action_type.clone(), record.timestamp);
}

/// Read every parseable record from the WAL, skipping corrupt lines
fn read_wal(path: &Path) -> Result<Vec<ActionRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ActionRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse action at line {}: {}", line_num + 1, e);
            }
        }
    }

    tracing::debug!("Read {} actions from WAL", records.len());
    Ok(records)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut contents = String::new();
    File::open(path)?.read_to_string(&mut contents)?;
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Atomically replace `path` with the JSON encoding of `value`:
/// write a temp file in the same directory, sync it, rename it over.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "store path missing parent")
    })?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        let contents = serde_json::to_string(value)?;
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Wrote {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support;
    use chrono::{Duration, Utc};

    fn open_temp() -> (tempfile::TempDir, FileStore) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path().join("data")).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_couples() {
        let (_dir, store) = open_temp();
        test_support::check_couples(&store);
    }

    #[test]
    fn test_pets() {
        let (_dir, store) = open_temp();
        test_support::check_pets(&store);
    }

    #[test]
    fn test_actions() {
        let (_dir, store) = open_temp();
        test_support::check_actions(&store);
    }

    #[test]
    fn test_update_pet() {
        let (_dir, store) = open_temp();
        test_support::check_update_pet(&store);
    }

    #[test]
    fn test_data_survives_reopen() {
        let (dir, store) = open_temp();
        let couple_id = store.create_couple(test_support::new_couple(1, 2)).unwrap();
        store.create_pet(test_support::new_pet(couple_id)).unwrap();
        drop(store);

        let reopened = FileStore::open(dir.path().join("data")).unwrap();
        assert!(reopened.get_couple(couple_id).unwrap().is_some());
        assert!(reopened.get_pet(couple_id).unwrap().is_some());

        // Counters continue rather than restart
        let next = reopened.create_couple(test_support::new_couple(3, 4)).unwrap();
        assert_eq!(next, couple_id + 1);
    }

    #[test]
    fn test_second_pet_conflicts() {
        let (_dir, store) = open_temp();
        let couple_id = store.create_couple(test_support::new_couple(1, 2)).unwrap();
        store.create_pet(test_support::new_pet(couple_id)).unwrap();

        let err = store
            .create_pet(test_support::new_pet(couple_id))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_rolls_forward_from_wal_when_snapshot_is_stale() {
        let (_dir, store) = open_temp();
        let couple_id = store.create_couple(test_support::new_couple(1, 2)).unwrap();
        store.create_pet(test_support::new_pet(couple_id)).unwrap();
        let pet = store.get_pet(couple_id).unwrap().unwrap();

        // Simulate a crash after the WAL append but before the snapshot write
        let mut next = pet.clone();
        next.stats = crate::Stats::new(30.0, 70.0, 50.0);
        next.experience = 5;
        next.last_updated = pet.last_updated + Duration::minutes(1);
        let record = test_support::record(&next, 1, next.last_updated);
        store.append_action(&record).unwrap();

        let loaded = store.get_pet(couple_id).unwrap().unwrap();
        assert_eq!(loaded.stats, next.stats);
        assert_eq!(loaded.experience, 5);
        assert_eq!(loaded.last_updated, record.timestamp);
        assert_eq!(loaded.last_performed.get("pet"), Some(&record.timestamp));
    }

    #[test]
    fn test_corrupted_wal_lines_are_skipped() {
        let (_dir, store) = open_temp();
        let couple_id = store.create_couple(test_support::new_couple(1, 2)).unwrap();
        store.create_pet(test_support::new_pet(couple_id)).unwrap();
        let pet = store.get_pet(couple_id).unwrap().unwrap();

        store
            .append_action(&test_support::record(&pet, 1, Utc::now()))
            .unwrap();
        let mut wal = OpenOptions::new()
            .append(true)
            .open(store.wal_path())
            .unwrap();
        wal.write_all(b"{ invalid json }\n{\"truncated\":").unwrap();

        assert_eq!(store.list_actions(couple_id).unwrap().len(), 1);

        // The next append starts on a fresh line despite the torn tail
        store
            .append_action(&test_support::record(&pet, 2, Utc::now()))
            .unwrap();
        assert_eq!(store.list_actions(couple_id).unwrap().len(), 2);
    }

    #[test]
    fn test_couple_membership_checked_across_handles() {
        let (dir, _store) = open_temp();
        let root = dir.path().join("data");

        // Every handle tries to pair user 1; only one may succeed
        let handles: Vec<_> = (0..8i64)
            .map(|i| {
                let root = root.clone();
                std::thread::spawn(move || {
                    let store = FileStore::open(&root).unwrap();
                    store.create_couple(test_support::new_couple(1, 100 + i))
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, Error::Conflict(_))));
        let registry = FileStore::open(&root).unwrap().load_registry().unwrap();
        assert_eq!(registry.couples.len(), 1);
    }

    #[test]
    fn test_commit_survives_failed_snapshot_write() {
        let (_dir, store) = open_temp();
        let couple_id = store.create_couple(test_support::new_couple(1, 2)).unwrap();
        store.create_pet(test_support::new_pet(couple_id)).unwrap();
        let pet = store.get_pet(couple_id).unwrap().unwrap();

        // A directory in place of the snapshot makes the rename fail
        let snapshot = store.pet_path(couple_id);
        std::fs::remove_file(&snapshot).unwrap();
        std::fs::create_dir(&snapshot).unwrap();
        std::fs::write(snapshot.join("blocker"), b"x").unwrap();

        let mut next = pet.clone();
        next.experience = 5;
        next.last_updated = pet.last_updated + Duration::minutes(1);
        let record = test_support::record(&next, 1, next.last_updated);
        store.commit_action(&next, &record).unwrap();
        assert_eq!(store.list_actions(couple_id).unwrap().len(), 1);

        // With the old snapshot back, reads pick the action up from the WAL
        std::fs::remove_dir_all(&snapshot).unwrap();
        write_json_atomic(&snapshot, &pet).unwrap();
        let loaded = store.get_pet(couple_id).unwrap().unwrap();
        assert_eq!(loaded.experience, 5);
        assert_eq!(loaded.last_updated, record.timestamp);
    }
}
