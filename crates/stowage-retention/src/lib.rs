//! stowage-retention — deciding which backup artifacts to delete.
//!
//! Two independent policies work over the artifacts found in the backups
//! directory:
//!
//! ```text
//! ghost pruning   rows with dt_deleted older than ghost_backup_keep_days
//!                 lose every artifact, then the row itself
//! count pruning   before a new backup, keep at most backup_keep_num - 1
//!                 existing artifacts so the new one brings it to the limit
//! ```
//!
//! Artifact names that cannot be decoded are reported and ignored.

pub mod artifacts;
pub mod count;
pub mod error;
pub mod ghost;

pub use artifacts::{Artifact, BackupDir};
pub use count::{CountPruneOutcome, prune_excess};
pub use error::{RetentionError, RetentionResult};
pub use ghost::{GhostPruneReport, expired_ghosts, prune_ghosts, remove_ghosts};
