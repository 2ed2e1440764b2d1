//! Operator-facing start and end messages.

use std::path::Path;

use stowage_core::disk::remaining_space_line;
use stowage_core::{RunLog, RunTotals, human_bytes};

pub fn start_message(backups_dir: &Path) -> String {
    format!("Starting backup run...\n{}", remaining_space_line(backups_dir))
}

/// Buffered warnings and errors, byte totals and the disk snapshot.
pub fn end_message(log: &RunLog, totals: RunTotals, disk_line: &str) -> String {
    let summary = log.summary();
    let mut text = String::new();
    if !summary.is_empty() {
        text.push_str(&summary);
        text.push_str("\n\n");
    }
    text.push_str(&format!(
        "Pruned: {}, Created: {}\n{disk_line}",
        human_bytes(totals.pruned_bytes),
        human_bytes(totals.created_bytes)
    ));
    text
}
