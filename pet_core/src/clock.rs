//! Time sources for the engine.
//!
//! Production code uses [`DefaultClock`]; `--now` and tests use
//! [`FixedClock`].

use chrono::{DateTime, Duration, Local, Utc};
use std::sync::{Arc, Mutex, MutexGuard};

pub use mockable::{Clock, DefaultClock};

/// Clock shared between the engine and its callers
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Manually controlled time, for replays and tests
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock_clock() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.lock_clock() += by;
    }

    // A poisoned lock still holds a valid instant
    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}
