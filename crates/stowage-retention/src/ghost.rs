//! Age-based pruning of ghost instances.

use chrono::{DateTime, Utc};
use stowage_core::{RunLog, human_bytes, whole_days_since};
use stowage_state::InstanceDirectory;
use tracing::debug;

use crate::artifacts::{Artifact, BackupDir, matching};
use crate::error::RetentionResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GhostPruneReport {
    /// Ghost rows old enough to be pruned.
    pub selected: usize,
    /// Rows removed after all their artifacts were deleted.
    pub pruned: usize,
    pub freed_bytes: u64,
}

/// Delete every artifact of ghosts older than `keep_days` whole days and
/// drop their rows. A row stays when it has no artifacts or any of its
/// artifacts could not be deleted. `keep_days = None` disables pruning.
pub fn prune_ghosts(
    dir: &mut InstanceDirectory,
    backups: &BackupDir,
    keep_days: Option<u32>,
    now: DateTime<Utc>,
    log: &mut RunLog,
) -> RetentionResult<GhostPruneReport> {
    let Some(keep_days) = keep_days else {
        debug!("ghost pruning disabled");
        return Ok(GhostPruneReport::default());
    };

    let expired = expired_ghosts(dir, keep_days, now);
    if expired.is_empty() {
        return Ok(GhostPruneReport::default());
    }
    log.info(format!(
        "Backups of {} ghost instances to be pruned.",
        expired.len()
    ));

    let artifacts = backups.scan(log)?;
    Ok(remove_ghosts(dir, backups, &expired, &artifacts, log))
}

/// Names of ghost rows deleted at least `keep_days` whole days before `now`.
pub fn expired_ghosts(dir: &InstanceDirectory, keep_days: u32, now: DateTime<Utc>) -> Vec<String> {
    dir.records()
        .iter()
        .filter(|r| {
            r.dt_deleted
                .is_some_and(|deleted| whole_days_since(deleted, now) >= i64::from(keep_days))
        })
        .map(|r| r.instance_name())
        .collect()
}

/// Delete the artifacts of each `expired` instance found in `artifacts`,
/// then drop the rows whose artifacts were all deleted.
pub fn remove_ghosts(
    dir: &mut InstanceDirectory,
    backups: &BackupDir,
    expired: &[String],
    artifacts: &[Artifact],
    log: &mut RunLog,
) -> GhostPruneReport {
    let mut report = GhostPruneReport {
        selected: expired.len(),
        ..Default::default()
    };
    let mut removable = Vec::new();
    for name in expired {
        let owned = matching(artifacts, name);
        if owned.is_empty() {
            log.warn(format!(
                "Cannot find backups of ghost instance {name}! Keeping it for now."
            ));
            continue;
        }

        let mut all_deleted = true;
        for artifact in owned {
            match backups.delete(artifact) {
                Ok(bytes) => report.freed_bytes += bytes,
                Err(e) => {
                    all_deleted = false;
                    log.warn(format!("Failed to delete {}: {e}", artifact.file_name));
                }
            }
        }
        if all_deleted {
            removable.push(name.as_str());
        }
    }

    report.pruned = dir.remove_all(removable);
    log.info(format!(
        "{} out of {} instances successfully pruned! Freed {}.",
        report.pruned,
        report.selected,
        human_bytes(report.freed_bytes)
    ));
    report
}
