//! Runtime client error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by a container runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unsupported runtime host {0:?}: only unix:// sockets are supported")]
    UnsupportedHost(String),

    #[error("cannot connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    Request(#[from] http::Error),

    #[error("runtime returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed runtime response: {0}")]
    Decode(String),

    #[error("i/o error while writing archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("runtime unavailable")]
    Unavailable,

    #[error("no such container: {0}")]
    NotFound(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
