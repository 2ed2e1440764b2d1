//! stowage-core — shared vocabulary for the stowage crates.
//!
//! Configuration, the instance/artifact naming codec, table record types,
//! the per-run message buffer and small filesystem helpers.

pub mod config;
pub mod disk;
pub mod layout;
pub mod naming;
pub mod report;
pub mod types;

pub use config::{BackupConfig, ConfigError, ConfigSource, TelegramConfig};
pub use disk::DiskSpace;
pub use layout::ArchiveLayout;
pub use naming::{ArtifactName, CodecError};
pub use report::{human_bytes, Level, RunLog, RunTotals};
pub use types::*;
