//! Scheduler error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("cannot enumerate existing backups: {0}")]
    Retention(#[from] stowage_retention::RetentionError),

    #[error("archive stream failed: {0}")]
    Runtime(#[from] stowage_runtime::RuntimeError),

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
