//! Action resolver: validate one player action and compute its result.
//!
//! The resolver is pure. It never touches storage; the engine persists the
//! returned pet and record as a single unit.

use crate::decay::{decay, elapsed_seconds};
use crate::leveling::level_for;
use crate::{
    ActionRecord, ActionTypeDef, Catalog, Couple, Error, Pet, Result, StatRequirement, Stats,
    UserId,
};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Updated pet and the history record describing the applied action
#[derive(Clone, Debug)]
pub struct ResolvedAction {
    pub pet: Pet,
    pub record: ActionRecord,
}

/// Apply `action_type` to `pet` on behalf of `user_id` at `now`.
///
/// Fails with [`Error::Validation`] if the action is unknown, the user is
/// not one of the couple's members, a stat prerequisite is not met on the
/// decayed stats, or the action's cooldown has not elapsed.
///
/// Decay for the time since `last_updated` is always applied first; the
/// action's deltas operate on that fresh baseline.
pub fn apply_action(
    catalog: &Catalog,
    couple: &Couple,
    pet: &Pet,
    action_type: &str,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<ResolvedAction> {
    let action = catalog.action_type(action_type)?;

    if !couple.has_member(user_id) {
        return Err(Error::Validation(format!(
            "User {} is not a member of couple {}",
            user_id, couple.id
        )));
    }

    let pet_type = catalog.pet_type(&pet.pet_type)?;

    // The watermark never moves backward, even if the clock does
    let timestamp = now.max(pet.last_updated);

    // 1. Bring stats current
    let baseline = decay(
        &pet.stats,
        &pet_type.decay,
        elapsed_seconds(pet.last_updated, timestamp),
    );

    // 2. Prerequisites and cooldown
    check_requirements(action, &baseline)?;
    check_cooldown(action, pet, timestamp)?;

    // 3. Deltas, clamped
    let stats = baseline.apply(&action.deltas);

    // 4-5. Experience and level
    let experience = pet.experience.saturating_add(action.experience_reward);
    let level = level_for(experience, &pet_type.leveling).level;

    // 6. Advance the watermark
    let mut updated = pet.clone();
    updated.stats = stats;
    updated.experience = experience;
    updated.level = level;
    updated.last_updated = timestamp;
    updated
        .last_performed
        .insert(action.id.clone(), timestamp);

    // 7. History record
    let record = ActionRecord {
        id: Uuid::new_v4(),
        couple_id: couple.id,
        pet_id: pet.id,
        user_id,
        action_type: action.id.clone(),
        timestamp,
        experience_gained: action.experience_reward,
        snapshot: updated.snapshot(),
    };

    if level > pet.level {
        tracing::info!("Pet {} reached level {}", pet.id, level);
    }

    Ok(ResolvedAction {
        pet: updated,
        record,
    })
}

fn check_requirements(action: &ActionTypeDef, stats: &Stats) -> Result<()> {
    for req in &action.requires {
        if let Some(reason) = unmet_requirement(req, stats) {
            return Err(Error::Validation(format!(
                "Cannot perform '{}': {}",
                action.name, reason
            )));
        }
    }
    Ok(())
}

fn unmet_requirement(req: &StatRequirement, stats: &Stats) -> Option<String> {
    let value = stats.get(req.stat);
    if let Some(min) = req.min {
        if value < min {
            return Some(format!(
                "{} is {:.0} but must be at least {}",
                req.stat, value, min
            ));
        }
    }
    if let Some(max) = req.max {
        if value > max {
            return Some(format!(
                "{} is {:.0} but must be at most {}",
                req.stat, value, max
            ));
        }
    }
    None
}

fn check_cooldown(action: &ActionTypeDef, pet: &Pet, at: DateTime<Utc>) -> Result<()> {
    let (Some(cooldown), Some(last)) = (action.cooldown_seconds, pet.last_performed.get(&action.id))
    else {
        return Ok(());
    };

    let ready_at = i64::try_from(cooldown)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|cooldown| last.checked_add_signed(cooldown));

    match ready_at {
        Some(ready_at) if at >= ready_at => Ok(()),
        Some(ready_at) => {
            let wait = (ready_at - at).num_seconds().max(1);
            Err(Error::Validation(format!(
                "'{}' is on cooldown for another {} seconds",
                action.name, wait
            )))
        }
        None => Err(Error::Validation(format!("'{}' is on cooldown", action.name))),
    }
}
