use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("backup directory {0} does not exist")]
    MissingDir(PathBuf),

    #[error("cannot list backup directory {path}: {source}")]
    Scan {
        path: PathBuf,
        source: walkdir::Error,
    },
}

pub type RetentionResult<T> = Result<T, RetentionError>;
