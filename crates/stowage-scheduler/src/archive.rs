//! Writing one backup artifact.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use stowage_core::InstanceRecord;
use stowage_core::naming::artifact_file_name;
use stowage_runtime::ContainerRuntime;
use tracing::debug;

use crate::error::{SchedulerError, SchedulerResult};

/// A freshly written artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedArtifact {
    pub path: PathBuf,
    /// Compressed size on disk.
    pub size: u64,
}

/// Suffix of the file an artifact is streamed into before it is renamed
/// into place.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Stream `record`'s path from the runtime into a gzip file in
/// `backups_dir` named after the instance and `now`'s date.
///
/// The stream is written to a `.partial` sibling that replaces the final
/// file only once it is complete, so an existing artifact of the same
/// date survives a failed attempt. On failure the partial file is removed.
pub async fn create_artifact(
    runtime: &dyn ContainerRuntime,
    backups_dir: &Path,
    record: &InstanceRecord,
    now: DateTime<Utc>,
) -> SchedulerResult<CreatedArtifact> {
    let file_name = artifact_file_name(&record.instance_name(), now.date_naive());
    let path = backups_dir.join(&file_name);
    let partial = backups_dir.join(format!("{file_name}{PARTIAL_SUFFIX}"));

    let written = match write_artifact(runtime, &partial, record).await {
        Ok(size) => std::fs::rename(&partial, &path)
            .map(|()| size)
            .map_err(|source| SchedulerError::Write {
                path: path.clone(),
                source,
            }),
        Err(e) => Err(e),
    };

    match written {
        Ok(size) => Ok(CreatedArtifact { path, size }),
        Err(e) => {
            if partial.exists() {
                if let Err(rm) = std::fs::remove_file(&partial) {
                    debug!(path = ?partial, error = %rm, "cannot remove partial artifact");
                }
            }
            Err(e)
        }
    }
}

async fn write_artifact(
    runtime: &dyn ContainerRuntime,
    path: &Path,
    record: &InstanceRecord,
) -> SchedulerResult<u64> {
    let write_err = |source| SchedulerError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let streamed = runtime
        .get_archive(&record.container_id, &record.path_backed, &mut encoder)
        .await?;

    let file = encoder
        .finish()
        .map_err(write_err)?
        .into_inner()
        .map_err(|e| write_err(e.into_error()))?;
    file.sync_all().map_err(write_err)?;
    let size = file.metadata().map_err(write_err)?.len();

    debug!(path = ?path, streamed, size, "artifact written");
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use stowage_core::{ContainerSummary, InstanceKey};
    use stowage_runtime::MemoryRuntime;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap()
    }

    fn runtime() -> MemoryRuntime {
        MemoryRuntime::with_containers([ContainerSummary {
            id: "aaaaaaaaaaaa".into(),
            name: "web".into(),
            started_at: now(),
            finished_at: now(),
        }])
    }

    #[tokio::test]
    async fn writes_gzip_named_after_instance_and_date() {
        let tmp = tempfile::tempdir().unwrap();
        let rt = runtime();
        rt.set_archive("aaaaaaaaaaaa", "/srv", b"tar bytes".to_vec());
        let record = InstanceRecord::new(InstanceKey::new("aaaaaaaaaaaa", "web", "/srv"));

        let created = create_artifact(&rt, tmp.path(), &record, now()).await.unwrap();
        assert_eq!(created.path, tmp.path().join("aaaaaaaaaaaa-web-%srv-240229.tar.gz"));
        assert_eq!(created.size, std::fs::metadata(&created.path).unwrap().len());

        let mut decoded = Vec::new();
        GzDecoder::new(File::open(&created.path).unwrap())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, b"tar bytes");
    }

    #[tokio::test]
    async fn failed_stream_leaves_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let rt = runtime();
        rt.fail_archive("aaaaaaaaaaaa", "/");
        let record = InstanceRecord::new(InstanceKey::new("aaaaaaaaaaaa", "web", "/"));

        let err = create_artifact(&rt, tmp.path(), &record, now()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Runtime(_)));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_directory_is_a_write_error() {
        let tmp = tempfile::tempdir().unwrap();
        let record = InstanceRecord::new(InstanceKey::new("aaaaaaaaaaaa", "web", "/"));
        let err = create_artifact(&runtime(), &tmp.path().join("nope"), &record, now())
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Write { .. }));
    }

    #[tokio::test]
    async fn failed_rerun_keeps_same_day_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let existing = tmp.path().join("aaaaaaaaaaaa-web-%-240229.tar.gz");
        std::fs::write(&existing, b"earlier backup").unwrap();
        let rt = runtime();
        rt.fail_archive("aaaaaaaaaaaa", "/");
        let record = InstanceRecord::new(InstanceKey::new("aaaaaaaaaaaa", "web", "/"));

        assert!(create_artifact(&rt, tmp.path(), &record, now()).await.is_err());
        assert_eq!(std::fs::read(&existing).unwrap(), b"earlier backup");
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn successful_rerun_replaces_same_day_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let existing = tmp.path().join("aaaaaaaaaaaa-web-%-240229.tar.gz");
        std::fs::write(&existing, b"earlier backup").unwrap();
        let record = InstanceRecord::new(InstanceKey::new("aaaaaaaaaaaa", "web", "/"));

        let created = create_artifact(&runtime(), tmp.path(), &record, now()).await.unwrap();
        assert_eq!(created.path, existing);
        let mut decoded = Vec::new();
        GzDecoder::new(File::open(&existing).unwrap())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, b"aaaaaaaaaaaa:/");
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }
}
