//! The run state machine.

use anyhow::Context;
use chrono::{DateTime, Utc};
use stowage_core::disk::remaining_space_line;
use stowage_core::{ArchiveLayout, BackupConfig, RunLog, RunTotals, human_bytes};
use stowage_liveness::{DetectionSummary, detect};
use stowage_notify::{Notifier, deliver};
use stowage_retention::{BackupDir, GhostPruneReport, prune_ghosts};
use stowage_runtime::ContainerRuntime;
use stowage_scheduler::{BackupScheduler, SchedulePass};
use stowage_state::StateStore;
use tracing::info;

use crate::report::{end_message, start_message};

/// What a completed run did. Phases that were skipped or failed are `None`.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub runtime_available: bool,
    pub detection: Option<DetectionSummary>,
    pub ghosts: Option<GhostPruneReport>,
    pub backups: Option<SchedulePass>,
    pub persisted: bool,
    pub totals: RunTotals,
    /// The end-of-run message sent to the notifier.
    pub report: String,
}

pub struct Orchestrator<'a> {
    config: &'a BackupConfig,
    layout: &'a ArchiveLayout,
    runtime: &'a dyn ContainerRuntime,
    notifier: &'a dyn Notifier,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a BackupConfig,
        layout: &'a ArchiveLayout,
        runtime: &'a dyn ContainerRuntime,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            config,
            layout,
            runtime,
            notifier,
        }
    }

    /// Execute one run at `now`.
    ///
    /// Returns an error only for fatal conditions: an unreadable or
    /// unwritable state table. The end report is delivered either way.
    pub async fn run(&self, now: DateTime<Utc>, log: &mut RunLog) -> anyhow::Result<RunOutcome> {
        let store = StateStore::new(&self.layout.state_path);
        let backups = BackupDir::new(&self.layout.backups_dir);
        let mut outcome = RunOutcome::default();

        deliver(self.notifier, &start_message(&self.layout.backups_dir)).await;

        // LOAD
        let mut dir = match store.load(log) {
            Ok(dir) => dir,
            Err(e) => {
                log.critical(format!(
                    "Cannot read instance table {}: {e}",
                    store.path().display()
                ));
                self.report(log, &mut outcome).await;
                return Err(anyhow::Error::new(e).context("loading instance table"));
            }
        };
        log.info(format!("{} instance(s) loaded.", dir.len()));

        // DETECT
        outcome.runtime_available = match self.runtime.ping().await {
            Ok(()) => true,
            Err(e) => {
                log.error(format!(
                    "Cannot access the container runtime, skipping detection and backups: {e}"
                ));
                false
            }
        };
        if outcome.runtime_available {
            match detect(self.runtime, &mut dir, self.config, now, log).await {
                Ok(summary) => outcome.detection = Some(summary),
                Err(e) => log.error(format!(
                    "Error while updating instances information! Skipping backups: {e}"
                )),
            }
        }

        // GHOST_PRUNE
        match prune_ghosts(
            &mut dir,
            &backups,
            self.config.ghost_backup_keep_days,
            now,
            log,
        ) {
            Ok(report) => {
                outcome.totals.pruned_bytes += report.freed_bytes;
                outcome.ghosts = Some(report);
            }
            Err(e) => log.warn(format!("Error while pruning ghost backups! {e}")),
        }

        // SCHEDULE_BACKUP
        if outcome.detection.is_some() {
            let scheduler = BackupScheduler::new(self.runtime, &backups, self.config);
            match scheduler.run(&mut dir, now, log).await {
                Ok(pass) => {
                    outcome.totals.absorb(pass.totals);
                    outcome.backups = Some(pass);
                }
                Err(e) => log.error(format!(
                    "Error either while pruning extra or making backups! {e}"
                )),
            }
        }

        // PERSIST
        let persisted = store.save(&dir);
        if let Err(e) = &persisted {
            log.critical(format!(
                "Cannot save instance table {}: {e}",
                store.path().display()
            ));
        }
        outcome.persisted = persisted.is_ok();

        // REPORT
        self.report(log, &mut outcome).await;
        persisted.context("saving instance table")?;
        Ok(outcome)
    }

    async fn report(&self, log: &RunLog, outcome: &mut RunOutcome) {
        info!(
            pruned = %human_bytes(outcome.totals.pruned_bytes),
            created = %human_bytes(outcome.totals.created_bytes),
            "run finished"
        );
        let disk_line = remaining_space_line(&self.layout.backups_dir);
        outcome.report = end_message(log, outcome.totals, &disk_line);
        deliver(self.notifier, &outcome.report).await;
    }
}
