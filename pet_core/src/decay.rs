//! Time-driven stat decay.
//!
//! Stats are never ticked by a timer. Whenever a pet is read or acted on,
//! the caller computes the current stats from the stored snapshot and the
//! time elapsed since `last_updated`, then persists the result together
//! with the advanced watermark.

use crate::{DecayRates, Stat, Stats};
use chrono::{DateTime, Utc};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Decay a stat snapshot by `elapsed_seconds` of neglect.
///
/// Each stat moves linearly toward its neglected extreme at the configured
/// per-hour rate and is clamped into `[0, 100]`. Zero or negative elapsed
/// time returns the snapshot unchanged.
pub fn decay(stats: &Stats, rates: &DecayRates, elapsed_seconds: f64) -> Stats {
    if !(elapsed_seconds > 0.0) {
        return *stats;
    }

    let hours = elapsed_seconds / SECONDS_PER_HOUR;
    let mut next = *stats;
    for stat in Stat::ALL {
        let current = stats.get(stat);
        let target = stat.neglected_extreme();
        let drift = rates.per_hour(stat).max(0.0) * hours;

        let moved = if target > current {
            (current + drift).min(target)
        } else {
            (current - drift).max(target)
        };
        next.set(stat, moved);
    }
    next
}

/// Seconds between the watermark and `now`, never negative
pub fn elapsed_seconds(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - last_updated).num_milliseconds();
    if millis <= 0 {
        0.0
    } else {
        millis as f64 / 1000.0
    }
}
