//! Selection predicate.

use chrono::{DateTime, Utc};
use stowage_core::{InstanceRecord, whole_days_since};
use stowage_state::InstanceDirectory;

/// Whether `record` needs a new backup at `now`.
///
/// Never-backed-up active instances are always due. Otherwise the
/// container must have been alive after the last backup and at least
/// `min_interval_days` whole days must have passed. A container that has
/// run continuously since before its last backup is therefore not due
/// until it stops or restarts.
pub fn is_due(record: &InstanceRecord, min_interval_days: u32, now: DateTime<Utc>) -> bool {
    if record.is_ghost() {
        return false;
    }
    let Some(last_backed) = record.dt_last_backed else {
        return true;
    };
    let changed = record
        .container_dt_last_alive
        .is_some_and(|alive| alive > last_backed);
    changed && whole_days_since(last_backed, now) >= i64::from(min_interval_days)
}

/// Instance names of every due row, in table order.
pub fn due_instances(
    dir: &InstanceDirectory,
    min_interval_days: u32,
    now: DateTime<Utc>,
) -> Vec<String> {
    dir.records()
        .iter()
        .filter(|r| is_due(r, min_interval_days, now))
        .map(|r| r.instance_name())
        .collect()
}
