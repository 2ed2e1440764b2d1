//! Archive directory layout and bootstrapping.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::naming::DATE_FORMAT;

pub const STATE_FILENAME: &str = "instance_info.redb";
pub const BACKUPS_DIRNAME: &str = "backups";
pub const LOGS_DIRNAME: &str = "logs";

/// Paths derived from `archive_dir_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    pub root: PathBuf,
    pub state_path: PathBuf,
    pub backups_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl ArchiveLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            state_path: root.join(STATE_FILENAME),
            backups_dir: root.join(BACKUPS_DIRNAME),
            logs_dir: root.join(LOGS_DIRNAME),
        }
    }

    /// Create the archive, backups and logs directories.
    /// Returns `true` if the archive root itself had to be created.
    pub fn bootstrap(&self) -> io::Result<bool> {
        let created_root = !self.root.exists();
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(&self.backups_dir)?;
        std::fs::create_dir_all(&self.logs_dir)?;
        Ok(created_root)
    }

    /// Log file for a run starting at `now`, never clobbering an earlier
    /// run's log from the same day.
    pub fn log_file_path(&self, now: DateTime<Utc>) -> PathBuf {
        let stem = format!("stowage_log_{}", now.format(DATE_FORMAT));
        uniquify(&self.logs_dir, &stem, "log")
    }
}

/// `dir/stem.ext`, or `dir/stem (n).ext` for the first free `n`.
pub fn uniquify(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{stem}.{ext}"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{stem} ({counter}).{ext}"));
        counter += 1;
    }
    candidate
}
