//! stowage-state — the instance directory.
//!
//! Holds every tracked `(container, path)` instance in memory and
//! persists the whole table to a single redb file between runs.
//!
//! # Architecture
//!
//! Each row is JSON-serialized into redb's `&[u8]` value column, keyed by
//! its instance name. A run loads the table once, mutates it in memory,
//! and writes it back in one transaction at the end.

pub mod directory;
pub mod error;
pub mod store;
pub mod tables;

pub use directory::InstanceDirectory;
pub use error::{StateError, StateResult};
pub use store::StateStore;
