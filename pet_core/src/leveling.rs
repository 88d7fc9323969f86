//! Leveling policy: cumulative experience to level.
//!
//! Level 1 is free. Advancing from level `L` to `L + 1` costs
//! `xp_per_level * L` experience, so with `xp_per_level = 100` the
//! thresholds are 100, 300, 600, 1000, ...

use crate::LevelCurve;
use serde::Serialize;

/// Level derived from an experience total
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    pub level: u32,
    /// Experience earned since reaching `level`
    pub experience_into_level: u64,
    /// Experience still needed to reach `level + 1`
    pub experience_to_next: u64,
}

/// Cumulative experience at which `level` is reached
fn threshold(curve: &LevelCurve, level: u32) -> u128 {
    let level = u128::from(level);
    u128::from(curve.xp_per_level.max(1)) * (level * level.saturating_sub(1) / 2)
}

/// Compute the level reached with `experience` on the given curve
pub fn level_for(experience: u64, curve: &LevelCurve) -> LevelProgress {
    let xp = u128::from(experience);
    let base = curve.xp_per_level.max(1) as f64;

    // Closed-form estimate, then corrected for float rounding
    let estimate = ((1.0 + (1.0 + 8.0 * experience as f64 / base).sqrt()) / 2.0).floor();
    let mut level = estimate.clamp(1.0, f64::from(u32::MAX)) as u32;
    while level > 1 && threshold(curve, level) > xp {
        level -= 1;
    }
    while level < u32::MAX && threshold(curve, level + 1) <= xp {
        level += 1;
    }

    let into = xp - threshold(curve, level);
    let to_next = if level == u32::MAX {
        0
    } else {
        threshold(curve, level + 1) - xp
    };

    LevelProgress {
        level,
        experience_into_level: u64::try_from(into).unwrap_or(u64::MAX),
        experience_to_next: u64::try_from(to_next).unwrap_or(u64::MAX),
    }
}
