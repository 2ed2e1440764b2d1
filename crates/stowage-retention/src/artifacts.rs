//! Enumerating and deleting backup artifacts.

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use stowage_core::{ArtifactName, RunLog};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{RetentionError, RetentionResult};

/// A backup file whose name decoded successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub file_name: String,
    pub instance_name: String,
    pub date: NaiveDate,
    /// Size in bytes when the directory was scanned.
    pub size: u64,
}

/// The flat directory holding every artifact.
#[derive(Debug, Clone)]
pub struct BackupDir {
    path: PathBuf,
}

impl BackupDir {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every regular file directly inside the directory whose name
    /// decodes as an artifact name, sorted by file name.
    pub fn scan(&self, log: &mut RunLog) -> RetentionResult<Vec<Artifact>> {
        if !self.path.is_dir() {
            return Err(RetentionError::MissingDir(self.path.clone()));
        }

        let mut artifacts = Vec::new();
        let walker = WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|source| RetentionError::Scan {
                path: self.path.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else {
                log.warn(format!(
                    "Ignoring backup file with non UTF-8 name: {}",
                    entry.path().display()
                ));
                continue;
            };
            let name = match ArtifactName::parse(file_name) {
                Ok(name) => name,
                Err(e) => {
                    log.warn(format!("Ignoring unrecognised backup file: {e}"));
                    continue;
                }
            };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            artifacts.push(Artifact {
                path: entry.path().to_path_buf(),
                file_name: file_name.to_string(),
                instance_name: name.instance_name,
                date: name.date,
                size,
            });
        }

        debug!(dir = ?self.path, count = artifacts.len(), "backup directory scanned");
        Ok(artifacts)
    }

    /// Remove one artifact and return the bytes freed.
    pub fn delete(&self, artifact: &Artifact) -> io::Result<u64> {
        std::fs::remove_file(&artifact.path)?;
        debug!(file = %artifact.file_name, bytes = artifact.size, "artifact deleted");
        Ok(artifact.size)
    }
}

/// Artifacts belonging to `instance_name`.
pub fn matching<'a>(artifacts: &'a [Artifact], instance_name: &str) -> Vec<&'a Artifact> {
    artifacts
        .iter()
        .filter(|a| a.instance_name == instance_name)
        .collect()
}
