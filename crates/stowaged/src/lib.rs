//! stowaged — one batch backup run.
//!
//! Assembles the stowage crates into the run state machine:
//!
//! ```text
//! LOAD → DETECT → GHOST_PRUNE → SCHEDULE_BACKUP → PERSIST → REPORT
//! ```
//!
//! DETECT is skipped when the runtime is unreachable; SCHEDULE_BACKUP is
//! skipped when DETECT did not complete. GHOST_PRUNE only needs the
//! backups directory and always runs. REPORT always runs.

pub mod logging;
pub mod orchestrator;
pub mod report;
pub mod status;

pub use orchestrator::{Orchestrator, RunOutcome};
