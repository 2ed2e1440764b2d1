//! Count-based pruning, run just before a new backup is created.

use chrono::NaiveDate;
use stowage_core::{RunLog, human_bytes};
use tracing::debug;

use crate::artifacts::{Artifact, BackupDir};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountPruneOutcome {
    /// Artifacts actually removed.
    pub pruned: usize,
    pub freed_bytes: u64,
}

/// Delete the oldest of `existing` so that, once the artifact dated
/// `new_date` is written, at most `keep` remain. `keep = None` never
/// prunes.
///
/// An existing artifact already dated `new_date` is about to be
/// overwritten, so it is neither counted nor deleted. Artifacts with equal
/// dates keep their order in `existing`. A failed delete is reported and
/// skipped.
pub fn prune_excess(
    backups: &BackupDir,
    instance_name: &str,
    existing: &[&Artifact],
    keep: Option<u32>,
    new_date: NaiveDate,
    log: &mut RunLog,
) -> CountPruneOutcome {
    let mut outcome = CountPruneOutcome::default();
    let Some(keep) = keep else {
        return outcome;
    };
    let keep = keep as usize;
    let mut oldest_first: Vec<&Artifact> = existing
        .iter()
        .copied()
        .filter(|a| a.date != new_date)
        .collect();
    if oldest_first.len() < keep {
        return outcome;
    }

    log.info(format!(
        "{instance_name} has {}/{keep} backups, pruning the oldest...",
        oldest_first.len()
    ));

    oldest_first.sort_by_key(|a| a.date);
    let excess = oldest_first.len() - keep + 1;

    for artifact in oldest_first.into_iter().take(excess) {
        match backups.delete(artifact) {
            Ok(bytes) => {
                outcome.pruned += 1;
                outcome.freed_bytes += bytes;
            }
            Err(e) => log.warn(format!("Failed to delete {}: {e}", artifact.file_name)),
        }
    }

    debug!(
        instance = instance_name,
        pruned = outcome.pruned,
        freed = %human_bytes(outcome.freed_bytes),
        "count pruning done"
    );
    outcome
}
