//! stowage-scheduler — creating new backups.
//!
//! After detection, every active instance whose container may have
//! changed since its last backup (and whose interval has elapsed) gets a
//! new gzip-compressed tar artifact streamed from the runtime. Count
//! pruning runs for the instance just before its artifact is written.
//!
//! # Architecture
//!
//! ```text
//! BackupScheduler::run
//!   ├── due_instances (selection predicate)
//!   └── per due instance
//!       ├── prune_excess (stowage-retention)
//!       └── create_artifact (runtime tar stream → GzEncoder → file)
//! ```

pub mod archive;
pub mod due;
pub mod error;
pub mod scheduler;

pub use archive::create_artifact;
pub use due::{due_instances, is_due};
pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{BackupScheduler, SchedulePass};
