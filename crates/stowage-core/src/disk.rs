//! Free-space snapshot of the filesystem holding the backups.

use std::io;
use std::path::Path;

use crate::report::human_bytes;

/// Capacity and space available to unprivileged users, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskSpace {
    pub total: u64,
    pub free: u64,
}

impl DiskSpace {
    /// Capacity of the filesystem containing `path`.
    pub fn measure(path: &Path) -> io::Result<Self> {
        Ok(Self {
            total: fs4::total_space(path)?,
            free: fs4::available_space(path)?,
        })
    }

    pub fn free_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.free as f64 / self.total as f64 * 100.0
    }

    /// `42.3%, 12.5 GiB`
    pub fn describe(&self) -> String {
        format!("{:.1}%, {}", self.free_percent(), human_bytes(self.free))
    }
}

/// Report line used in start and end notifications.
pub fn remaining_space_line(path: &Path) -> String {
    match DiskSpace::measure(path) {
        Ok(space) => format!("Remaining disk space: {}", space.describe()),
        Err(_) => "Remaining disk space: unknown".to_string(),
    }
}
