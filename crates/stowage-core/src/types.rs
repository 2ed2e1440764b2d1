//! Shared types used across stowage crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::naming;

/// Length of the container id prefix used everywhere in stowage.
pub const SHORT_ID_LEN: usize = 12;

/// Truncate a runtime container id to its 12-character prefix.
pub fn short_id(container_id: &str) -> String {
    container_id.chars().take(SHORT_ID_LEN).collect()
}

/// Identity of a tracked backup target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceKey {
    pub container_id: String,
    pub container_name: String,
    pub path_backed: String,
}

impl InstanceKey {
    pub fn new(
        container_id: impl Into<String>,
        container_name: impl Into<String>,
        path_backed: impl Into<String>,
    ) -> Self {
        Self {
            container_id: container_id.into(),
            container_name: container_name.into(),
            path_backed: path_backed.into(),
        }
    }

    /// Filesystem-safe name, used as table key and artifact prefix.
    pub fn instance_name(&self) -> String {
        naming::instance_name(&self.container_id, &self.container_name, &self.path_backed)
    }
}

/// One row of the state table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub container_id: String,
    pub container_name: String,
    pub path_backed: String,
    /// Now if the container was running at the last detection, else the
    /// time it last finished.
    pub container_dt_last_alive: Option<DateTime<Utc>>,
    /// When the most recent backup artifact was created.
    pub dt_last_backed: Option<DateTime<Utc>>,
    /// Size of the most recent backup artifact in bytes.
    pub size_last_backed: Option<u64>,
    /// Since when this instance has been a ghost. `None` while active.
    pub dt_deleted: Option<DateTime<Utc>>,
}

impl InstanceRecord {
    /// A freshly discovered instance with no history.
    pub fn new(key: InstanceKey) -> Self {
        Self {
            container_id: key.container_id,
            container_name: key.container_name,
            path_backed: key.path_backed,
            container_dt_last_alive: None,
            dt_last_backed: None,
            size_last_backed: None,
            dt_deleted: None,
        }
    }

    pub fn key(&self) -> InstanceKey {
        InstanceKey::new(&self.container_id, &self.container_name, &self.path_backed)
    }

    pub fn instance_name(&self) -> String {
        naming::instance_name(&self.container_id, &self.container_name, &self.path_backed)
    }

    pub fn is_ghost(&self) -> bool {
        self.dt_deleted.is_some()
    }
}

/// A container as reported by the runtime's listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    /// Short (12-character) container id.
    pub id: String,
    /// Name without the leading `/`.
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Whole days elapsed from `earlier` to `now`, truncated toward zero.
pub fn whole_days_since(earlier: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - earlier).num_days()
}
