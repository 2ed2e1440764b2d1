//! End-to-end runs against an in-memory runtime and a recording notifier.
//!
//! Each test drives `Orchestrator::run` over several simulated days and
//! checks the backups directory, the persisted table and the messages
//! delivered to the operator.

use chrono::{DateTime, Duration, TimeZone, Utc};
use stowage_core::{ArchiveLayout, BackupConfig, ContainerSummary, Level, RunLog};
use stowage_notify::MemoryNotifier;
use stowage_runtime::MemoryRuntime;
use stowage_state::{InstanceDirectory, StateStore};
use stowaged::{Orchestrator, RunOutcome};

const WEB: &str = "abc123456789";

struct Harness {
    _tmp: tempfile::TempDir,
    config: BackupConfig,
    layout: ArchiveLayout,
    runtime: MemoryRuntime,
    notifier: MemoryNotifier,
}

impl Harness {
    fn new(toml: &str) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let config = BackupConfig::from_toml_str(toml, tmp.path(), None).unwrap();
        let layout = ArchiveLayout::new(&config.archive_dir_path);
        layout.bootstrap().unwrap();
        Self {
            _tmp: tmp,
            config,
            layout,
            runtime: MemoryRuntime::new(),
            notifier: MemoryNotifier::new(),
        }
    }

    async fn run(&self, now: DateTime<Utc>) -> (anyhow::Result<RunOutcome>, RunLog) {
        let mut log = RunLog::new();
        let result = Orchestrator::new(&self.config, &self.layout, &self.runtime, &self.notifier)
            .run(now, &mut log)
            .await;
        (result, log)
    }

    async fn run_ok(&self, now: DateTime<Utc>) -> (RunOutcome, RunLog) {
        let (result, log) = self.run(now).await;
        (result.unwrap(), log)
    }

    fn artifacts(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.layout.backups_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn table(&self) -> InstanceDirectory {
        StateStore::new(&self.layout.state_path)
            .load(&mut RunLog::new())
            .unwrap()
    }
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, d, 10, 0, 0).unwrap()
}

fn running(id: &str, name: &str, since: DateTime<Utc>) -> ContainerSummary {
    ContainerSummary {
        id: id.into(),
        name: name.into(),
        started_at: since,
        finished_at: Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap(),
    }
}

fn stopped(id: &str, name: &str, finished: DateTime<Utc>) -> ContainerSummary {
    ContainerSummary {
        id: id.into(),
        name: name.into(),
        started_at: finished - Duration::hours(2),
        finished_at: finished,
    }
}

fn noise(len: usize) -> Vec<u8> {
    let mut x: u64 = 0x2545_F491_4F6C_DD1D;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            (x >> 32) as u8
        })
        .collect()
}

#[tokio::test]
async fn keep_num_caps_artifacts_across_runs() {
    let h = Harness::new("backup_keep_num = 2");
    h.runtime.set_containers([running(WEB, "web", day(1))]);

    h.run_ok(day(1)).await;
    assert_eq!(h.artifacts(), vec!["abc123456789-web-%-240601.tar.gz"]);
    assert_eq!(
        h.table().get("abc123456789-web-%").unwrap().dt_last_backed,
        Some(day(1))
    );

    h.run_ok(day(2)).await;
    assert_eq!(h.artifacts().len(), 2);

    h.run_ok(day(3)).await;
    assert_eq!(
        h.artifacts(),
        vec![
            "abc123456789-web-%-240602.tar.gz",
            "abc123456789-web-%-240603.tar.gz",
        ]
    );
    let row = h.table().get("abc123456789-web-%").cloned().unwrap();
    assert_eq!(row.dt_last_backed, Some(day(3)));
    assert!(row.size_last_backed.unwrap() > 0);
}

#[tokio::test]
async fn expired_ghost_is_pruned_with_its_artifacts() {
    let h = Harness::new("ghost_backup_keep_days = 7");
    h.runtime.set_containers([running(WEB, "web", day(1))]);
    h.run_ok(day(1)).await;
    assert_eq!(h.artifacts().len(), 1);

    // container removed: becomes a ghost on day 2
    h.runtime.set_containers(Vec::new());
    h.run_ok(day(2)).await;
    assert_eq!(
        h.table().get("abc123456789-web-%").unwrap().dt_deleted,
        Some(day(2))
    );

    // six whole days after deletion: kept
    h.run_ok(day(8)).await;
    assert_eq!(h.artifacts().len(), 1);

    let (outcome, _) = h.run_ok(day(10)).await;
    let ghosts = outcome.ghosts.unwrap();
    assert_eq!((ghosts.selected, ghosts.pruned), (1, 1));
    assert!(h.artifacts().is_empty());
    assert!(h.table().is_empty());
    assert!(outcome.totals.pruned_bytes > 0);
}

#[tokio::test]
async fn large_backup_triggers_warning_in_report() {
    let h = Harness::new("warn_large_backup_mb = 1");
    h.runtime.set_containers([
        running(WEB, "web", day(1)),
        running("def456789012", "small", day(1)),
    ]);
    h.runtime.set_archive(WEB, "/", noise(5 * 1024 * 1024));
    h.runtime.set_archive("def456789012", "/", noise(512 * 1024));

    let (outcome, log) = h.run_ok(day(1)).await;
    let warnings = log.messages(Level::Warning);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Large backup of abc123456789-web-% detected!"));
    assert!(outcome.report.starts_with("Warning(s) encountered!\n1. Large backup"));

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].starts_with("Starting backup run..."));
    assert_eq!(sent[1], outcome.report);
}

#[tokio::test]
async fn resurrected_instance_is_active_again() {
    let h = Harness::new("");
    h.runtime.set_containers([running(WEB, "web", day(1))]);
    h.run_ok(day(1)).await;

    h.runtime.set_containers(Vec::new());
    h.run_ok(day(2)).await;
    assert!(h.table().get("abc123456789-web-%").unwrap().is_ghost());

    h.runtime.set_containers([running(WEB, "web", day(3))]);
    let (outcome, _) = h.run_ok(day(3)).await;
    assert_eq!(outcome.detection.unwrap().resurrected, 1);
    let row = h.table().get("abc123456789-web-%").cloned().unwrap();
    assert!(row.dt_deleted.is_none());
    assert_eq!(row.dt_last_backed, Some(day(3)));
}

#[tokio::test]
async fn never_backed_up_stopped_container_is_backed_up() {
    let h = Harness::new("min_backup_interval = 30");
    h.runtime
        .set_containers([stopped(WEB, "web", day(1) - Duration::days(365))]);

    let (outcome, _) = h.run_ok(day(1)).await;
    assert_eq!(outcome.backups.unwrap().created, 1);

    // nothing changed since: not due again
    let (outcome, _) = h.run_ok(day(2)).await;
    assert_eq!(outcome.backups.unwrap().due, 0);
    assert_eq!(h.artifacts().len(), 1);
}

#[tokio::test]
async fn unreachable_runtime_still_prunes_ghosts_and_persists() {
    let h = Harness::new("ghost_backup_keep_days = 1");
    h.runtime.set_containers([running(WEB, "web", day(1))]);
    h.run_ok(day(1)).await;
    h.runtime.set_containers(Vec::new());
    let (outcome, _) = h.run_ok(day(2)).await;
    assert_eq!(outcome.ghosts.unwrap().selected, 0);
    assert_eq!(h.artifacts().len(), 1);

    h.runtime.set_reachable(false);
    std::fs::write(
        h.layout.backups_dir.join("fedcba987654-old-%-240101.tar.gz"),
        b"x",
    )
    .unwrap();
    let (outcome, log) = h.run_ok(day(3)).await;

    assert!(!outcome.runtime_available);
    assert!(outcome.detection.is_none());
    assert!(outcome.backups.is_none());
    let ghosts = outcome.ghosts.unwrap();
    assert_eq!((ghosts.selected, ghosts.pruned), (1, 1));
    assert!(outcome.persisted);
    assert!(h.table().is_empty());
    assert_eq!(log.messages(Level::Error).len(), 1);
    assert!(outcome.report.starts_with("Error(s) encountered!"));
    assert_eq!(h.artifacts(), vec!["fedcba987654-old-%-240101.tar.gz"]);
}

#[tokio::test]
async fn failed_listing_skips_backups_and_keeps_table() {
    let h = Harness::new("");
    h.runtime.set_containers([running(WEB, "web", day(1))]);
    h.run_ok(day(1)).await;

    h.runtime.set_listing_fails(true);
    let (outcome, log) = h.run_ok(day(2)).await;

    assert!(outcome.runtime_available);
    assert!(outcome.detection.is_none());
    assert!(outcome.backups.is_none());
    assert!(outcome.persisted);
    assert_eq!(log.messages(Level::Error).len(), 1);
    assert!(outcome.report.starts_with("Error(s) encountered!"));
    assert_eq!(h.artifacts(), vec!["abc123456789-web-%-240601.tar.gz"]);
    let row = h.table().get("abc123456789-web-%").cloned().unwrap();
    assert_eq!(row.dt_last_backed, Some(day(1)));
    assert!(row.dt_deleted.is_none());
}

#[tokio::test]
async fn same_day_rerun_keeps_history() {
    let h = Harness::new("backup_keep_num = 2");
    h.runtime.set_containers([running(WEB, "web", day(1))]);
    h.run_ok(day(1)).await;
    h.run_ok(day(2)).await;

    let (outcome, _) = h.run_ok(day(2) + Duration::hours(1)).await;
    assert_eq!(outcome.backups.unwrap().created, 1);
    assert_eq!(
        h.artifacts(),
        vec![
            "abc123456789-web-%-240601.tar.gz",
            "abc123456789-web-%-240602.tar.gz",
        ]
    );
}

#[tokio::test]
async fn unreadable_state_table_is_fatal() {
    let h = Harness::new("");
    std::fs::write(&h.layout.state_path, b"garbage").unwrap();
    h.runtime.set_containers([running(WEB, "web", day(1))]);

    let (result, log) = h.run(day(1)).await;
    assert!(result.is_err());
    assert_eq!(log.messages(Level::Critical).len(), 1);
    assert!(h.artifacts().is_empty());

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].starts_with("Critical error(s) encountered!"));
}

#[tokio::test]
async fn malformed_backup_names_are_reported_not_fatal() {
    let h = Harness::new("backup_keep_num = 1");
    h.runtime.set_containers([running(WEB, "web", day(1))]);
    std::fs::write(h.layout.backups_dir.join("README"), b"hands off").unwrap();

    let (outcome, log) = h.run_ok(day(1)).await;
    assert_eq!(outcome.backups.unwrap().created, 1);
    assert_eq!(log.messages(Level::Warning).len(), 1);
    assert!(h.layout.backups_dir.join("README").exists());
}
