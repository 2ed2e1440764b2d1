//! The backup pass over every due instance.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use stowage_core::{BackupConfig, RunLog, RunTotals, human_bytes};
use stowage_retention::artifacts::matching;
use stowage_retention::{BackupDir, prune_excess};
use stowage_runtime::ContainerRuntime;
use stowage_state::InstanceDirectory;
use tracing::{debug, info};

use crate::archive::create_artifact;
use crate::due::due_instances;
use crate::error::SchedulerResult;

/// Outcome of one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulePass {
    pub due: usize,
    pub created: usize,
    pub failed: usize,
    pub totals: RunTotals,
}

pub struct BackupScheduler<'a> {
    runtime: &'a dyn ContainerRuntime,
    backups: &'a BackupDir,
    config: &'a BackupConfig,
}

impl<'a> BackupScheduler<'a> {
    pub fn new(
        runtime: &'a dyn ContainerRuntime,
        backups: &'a BackupDir,
        config: &'a BackupConfig,
    ) -> Self {
        Self {
            runtime,
            backups,
            config,
        }
    }

    /// Prune and back up every due instance in `dir`.
    ///
    /// Only an unreadable backups directory fails the pass; a failure for
    /// one instance is logged and leaves that row unchanged.
    pub async fn run(
        &self,
        dir: &mut InstanceDirectory,
        now: DateTime<Utc>,
        log: &mut RunLog,
    ) -> SchedulerResult<SchedulePass> {
        let due = due_instances(dir, self.config.min_backup_interval, now);
        let containers: HashSet<&str> = due
            .iter()
            .filter_map(|name| dir.get(name))
            .map(|r| r.container_id.as_str())
            .collect();
        log.info(format!(
            "{} instance(s) from {} container(s) require backup.",
            due.len(),
            containers.len()
        ));

        let mut pass = SchedulePass {
            due: due.len(),
            ..SchedulePass::default()
        };
        if due.is_empty() {
            return Ok(pass);
        }

        let artifacts = self.backups.scan(log)?;
        let threshold = self.config.warn_large_backup_bytes();

        for name in &due {
            let Some(record) = dir.get(name).cloned() else {
                continue;
            };

            let pruned = prune_excess(
                self.backups,
                name,
                &matching(&artifacts, name),
                self.config.backup_keep_num,
                now.date_naive(),
                log,
            );
            pass.totals.pruned_bytes += pruned.freed_bytes;

            let created =
                match create_artifact(self.runtime, self.backups.path(), &record, now).await {
                    Ok(created) => created,
                    Err(e) => {
                        pass.failed += 1;
                        log.warn(format!("Failed to back up {name}: {e}"));
                        continue;
                    }
                };

            pass.created += 1;
            pass.totals.created_bytes += created.size;
            if let Some(row) = dir.get_mut(name) {
                row.dt_last_backed = Some(now);
                row.size_last_backed = Some(created.size);
            }
            info!(instance = %name, bytes = created.size, "backup created");

            let growth = created.size as i128 - pruned.freed_bytes as i128;
            if growth > threshold as i128 {
                log.warn(format!(
                    "Large backup of {name} detected! Pruned {} backups: {}, Created: {}",
                    pruned.pruned,
                    human_bytes(pruned.freed_bytes),
                    human_bytes(created.size)
                ));
            }
        }

        debug!(?pass, "scheduling pass complete");
        Ok(pass)
    }
}
