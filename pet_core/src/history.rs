//! Action history queries and CSV export.

use crate::{ActionRecord, Result};
use std::fs::OpenOptions;
use std::path::Path;

/// Default and maximum number of records returned by a history query
pub const MAX_HISTORY_LIMIT: usize = 10;

/// Resolve a requested history limit against the default/maximum
pub fn effective_limit(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(MAX_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT)
}

/// A row in the CSV export
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    couple_id: u64,
    pet_id: u64,
    user_id: i64,
    action_type: String,
    timestamp: String,
    experience_gained: u64,
    hunger: f64,
    happiness: f64,
    energy: f64,
    experience: u64,
    level: u32,
}

impl From<&ActionRecord> for CsvRow {
    fn from(record: &ActionRecord) -> Self {
        CsvRow {
            id: record.id.to_string(),
            couple_id: record.couple_id,
            pet_id: record.pet_id,
            user_id: record.user_id,
            action_type: record.action_type.clone(),
            timestamp: record.timestamp.to_rfc3339(),
            experience_gained: record.experience_gained,
            hunger: record.snapshot.hunger,
            happiness: record.snapshot.happiness,
            energy: record.snapshot.energy,
            experience: record.snapshot.experience,
            level: record.snapshot.level,
        }
    }
}

/// Write records to a CSV file, replacing any previous export.
///
/// Returns the number of rows written.
pub fn export_csv(records: &[ActionRecord], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(file);
    for record in records {
        writer.serialize(CsvRow::from(record))?;
    }
    writer.flush()?;

    tracing::info!("Exported {} actions to {:?}", records.len(), path);
    Ok(records.len())
}
