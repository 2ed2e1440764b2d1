//! Per-run message buffer and byte counters.
//!
//! `RunLog` is handed `&mut` through every phase of a run. Each call
//! emits a `tracing` event and keeps WARNING and above so the run summary
//! can be delivered to the operator at the end.

use std::fmt;

use tracing::{error, info, warn};

/// Severity of a buffered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        })
    }
}

/// Messages of WARNING and above collected during one run.
#[derive(Debug, Default)]
pub struct RunLog {
    warnings: Vec<String>,
    errors: Vec<String>,
    critical: Vec<String>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Informational message; not buffered.
    pub fn info(&self, message: impl AsRef<str>) {
        info!("{}", message.as_ref());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.warnings.push(message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{message}");
        self.errors.push(message);
    }

    /// Reserved for conditions that also abort the run.
    pub fn critical(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(critical = true, "{message}");
        self.critical.push(message);
    }

    pub fn messages(&self, level: Level) -> &[String] {
        match level {
            Level::Warning => &self.warnings,
            Level::Error => &self.errors,
            Level::Critical => &self.critical,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty() && self.critical.is_empty()
    }

    /// Numbered sections, most severe first, separated by a blank line.
    /// Empty when nothing was buffered.
    pub fn summary(&self) -> String {
        let sections = [
            (Level::Critical, "Critical error(s) encountered!"),
            (Level::Error, "Error(s) encountered!"),
            (Level::Warning, "Warning(s) encountered!"),
        ];
        sections
            .iter()
            .filter(|(level, _)| !self.messages(*level).is_empty())
            .map(|(level, title)| format!("{title}\n{}", format_messages(self.messages(*level))))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// `1. first\n2. second`
pub fn format_messages(messages: &[String]) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{}. {m}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bytes pruned and created during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub pruned_bytes: u64,
    pub created_bytes: u64,
}

impl RunTotals {
    pub fn absorb(&mut self, other: RunTotals) {
        self.pruned_bytes += other.pruned_bytes;
        self.created_bytes += other.created_bytes;
    }
}

/// Human-readable binary size: `0 B`, `512 B`, `1.5 KiB`, `2.25 GiB`.
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut idx = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && idx < UNITS.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[idx])
}
