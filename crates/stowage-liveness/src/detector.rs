//! Liveness & deletion detection over the instance table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use stowage_core::{BackupConfig, ContainerSummary, RunLog, short_id};
use stowage_runtime::{ContainerRuntime, RuntimeError};
use stowage_state::InstanceDirectory;
use thiserror::Error;
use tracing::debug;

use crate::plan::TrackingPlan;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("cannot list containers: {0}")]
    Listing(#[from] RuntimeError),
}

pub type DetectResult<T> = Result<T, DetectError>;

/// Counts describing what one detection pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionSummary {
    pub containers: usize,
    pub tracked: usize,
    pub added: usize,
    pub resurrected: usize,
    pub ghosts_before: usize,
    pub ghosts_after: usize,
}

/// `now` while the container has not validly finished, else its finish time.
pub fn last_alive(container: &ContainerSummary, now: DateTime<Utc>) -> DateTime<Utc> {
    if container.started_at >= container.finished_at {
        now
    } else {
        container.finished_at
    }
}

/// Reconcile `dir` with a container listing.
pub fn apply(
    dir: &mut InstanceDirectory,
    containers: &[ContainerSummary],
    config: &BackupConfig,
    now: DateTime<Utc>,
) -> DetectionSummary {
    let ghosts_before = dir.ghost_count();
    let liveness: HashMap<String, DateTime<Utc>> = containers
        .iter()
        .map(|c| (short_id(&c.id), last_alive(c, now)))
        .collect();

    let plan = TrackingPlan::build(config, containers);
    let added = dir.merge(plan.targets().iter().cloned());

    let mut resurrected = 0;
    for record in dir.records_mut() {
        if plan.tracks(&record.container_id, &record.path_backed) {
            if record.dt_deleted.take().is_some() {
                resurrected += 1;
            }
        } else if record.dt_deleted.is_none() {
            record.dt_deleted = Some(now);
        }

        if let Some(&alive) = liveness.get(&record.container_id) {
            record.container_dt_last_alive = Some(alive);
        }
    }

    DetectionSummary {
        containers: containers.len(),
        tracked: plan.len(),
        added,
        resurrected,
        ghosts_before,
        ghosts_after: dir.ghost_count(),
    }
}

/// List containers from `runtime` and reconcile `dir` with them.
///
/// On error `dir` is left untouched.
pub async fn detect(
    runtime: &dyn ContainerRuntime,
    dir: &mut InstanceDirectory,
    config: &BackupConfig,
    now: DateTime<Utc>,
    log: &mut RunLog,
) -> DetectResult<DetectionSummary> {
    let containers = runtime.list_containers().await?;
    let summary = apply(dir, &containers, config, now);
    debug!(?summary, "detection complete");

    log.info(format!(
        "{} instance(s) tracked from {} container(s), {} new.",
        summary.tracked, summary.containers, summary.added
    ));
    if summary.resurrected > 0 {
        log.info(format!(
            "{} ghost instance(s) reappeared and are active again.",
            summary.resurrected
        ));
    }
    let delta = summary.ghosts_after as i64 - summary.ghosts_before as i64;
    log.info(format!(
        "Ghost instances: {} ({delta:+}).",
        summary.ghosts_after
    ));
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::path::Path;
    use stowage_runtime::MemoryRuntime;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
    }

    fn running(id: &str, name: &str) -> ContainerSummary {
        ContainerSummary {
            id: id.into(),
            name: name.into(),
            started_at: at(1),
            finished_at: Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn stopped(id: &str, name: &str, finished: DateTime<Utc>) -> ContainerSummary {
        ContainerSummary {
            id: id.into(),
            name: name.into(),
            started_at: finished - Duration::hours(1),
            finished_at: finished,
        }
    }

    fn config(toml: &str) -> BackupConfig {
        BackupConfig::from_toml_str(toml, Path::new("/srv"), None).unwrap()
    }

    #[test]
    fn running_container_is_alive_now() {
        assert_eq!(last_alive(&running("a", "web"), at(5)), at(5));
    }

    #[test]
    fn restarted_container_is_alive_now() {
        let c = ContainerSummary {
            id: "a".into(),
            name: "web".into(),
            started_at: at(3),
            finished_at: at(3),
        };
        assert_eq!(last_alive(&c, at(5)), at(5));
    }

    #[test]
    fn stopped_container_is_alive_until_finish() {
        assert_eq!(last_alive(&stopped("a", "web", at(2)), at(5)), at(2));
    }

    #[test]
    fn discovers_new_targets() {
        let mut dir = InstanceDirectory::new();
        let summary = apply(
            &mut dir,
            &[running("aaaaaaaaaaaa", "web"), stopped("bbbbbbbbbbbb", "db", at(2))],
            &config(""),
            at(5),
        );
        assert_eq!(summary.added, 2);
        assert_eq!(dir.len(), 2);

        let web = dir.get("aaaaaaaaaaaa-web-%").unwrap();
        assert_eq!(web.container_dt_last_alive, Some(at(5)));
        assert!(web.dt_deleted.is_none());
        assert!(web.dt_last_backed.is_none());
        let db = dir.get("bbbbbbbbbbbb-db-%").unwrap();
        assert_eq!(db.container_dt_last_alive, Some(at(2)));
    }

    #[test]
    fn vanished_container_becomes_ghost_once() {
        let mut dir = InstanceDirectory::new();
        let cfg = config("");
        apply(&mut dir, &[running("aaaaaaaaaaaa", "web")], &cfg, at(1));

        let summary = apply(&mut dir, &[], &cfg, at(2));
        assert_eq!(summary.ghosts_before, 0);
        assert_eq!(summary.ghosts_after, 1);
        let web = dir.get("aaaaaaaaaaaa-web-%").unwrap();
        assert_eq!(web.dt_deleted, Some(at(2)));
        // last known liveness is kept
        assert_eq!(web.container_dt_last_alive, Some(at(1)));

        apply(&mut dir, &[], &cfg, at(3));
        assert_eq!(dir.get("aaaaaaaaaaaa-web-%").unwrap().dt_deleted, Some(at(2)));
    }

    #[test]
    fn reappearing_instance_is_resurrected() {
        let mut dir = InstanceDirectory::new();
        let cfg = config("");
        apply(&mut dir, &[running("aaaaaaaaaaaa", "web")], &cfg, at(1));
        apply(&mut dir, &[], &cfg, at(2));

        let summary = apply(&mut dir, &[running("aaaaaaaaaaaa", "web")], &cfg, at(3));
        assert_eq!(summary.resurrected, 1);
        assert_eq!(summary.added, 0);
        assert!(dir.get("aaaaaaaaaaaa-web-%").unwrap().dt_deleted.is_none());
    }

    #[test]
    fn untracked_container_still_refreshes_liveness() {
        let mut dir = InstanceDirectory::new();
        apply(&mut dir, &[running("aaaaaaaaaaaa", "web")], &config(""), at(1));

        let untracked = config("backup_by_default = false");
        apply(
            &mut dir,
            &[stopped("aaaaaaaaaaaa", "web", at(4))],
            &untracked,
            at(5),
        );
        let web = dir.get("aaaaaaaaaaaa-web-%").unwrap();
        assert_eq!(web.dt_deleted, Some(at(5)));
        assert_eq!(web.container_dt_last_alive, Some(at(4)));
    }

    #[test]
    fn dropped_path_ghosts_only_that_instance() {
        let mut dir = InstanceDirectory::new();
        let both = config("[container_paths]\naaaaaaaaaaaa = [\"/data\", \"/etc\"]");
        apply(&mut dir, &[running("aaaaaaaaaaaa", "web")], &both, at(1));
        assert_eq!(dir.len(), 2);

        let one = config("[container_paths]\naaaaaaaaaaaa = [\"/data\"]");
        apply(&mut dir, &[running("aaaaaaaaaaaa", "web")], &one, at(2));
        assert!(dir.get("aaaaaaaaaaaa-web-%data").unwrap().dt_deleted.is_none());
        assert_eq!(dir.get("aaaaaaaaaaaa-web-%etc").unwrap().dt_deleted, Some(at(2)));
    }

    #[tokio::test]
    async fn unreachable_runtime_leaves_table_untouched() {
        let runtime = MemoryRuntime::with_containers([running("aaaaaaaaaaaa", "web")]);
        runtime.set_reachable(false);
        let mut dir = InstanceDirectory::new();
        let mut log = RunLog::new();

        let result = detect(&runtime, &mut dir, &config(""), at(1), &mut log).await;
        assert!(matches!(result, Err(DetectError::Listing(_))));
        assert!(dir.is_empty());
    }

    #[tokio::test]
    async fn detect_lists_and_applies() {
        let runtime = MemoryRuntime::with_containers([running("aaaaaaaaaaaa", "web")]);
        let mut dir = InstanceDirectory::new();
        let mut log = RunLog::new();

        let summary = detect(&runtime, &mut dir, &config(""), at(1), &mut log)
            .await
            .unwrap();
        assert_eq!(summary.tracked, 1);
        assert_eq!(dir.len(), 1);
        assert!(log.is_empty());
    }
}
