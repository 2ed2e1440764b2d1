//! Which `(container, path)` pairs should currently be backed up.

use std::collections::HashSet;

use stowage_core::{BackupConfig, ContainerSummary, InstanceKey, short_id};

/// Backup targets derived from the configuration and a container listing.
#[derive(Debug, Clone, Default)]
pub struct TrackingPlan {
    targets: Vec<InstanceKey>,
    pairs: HashSet<(String, String)>,
}

impl TrackingPlan {
    pub fn build(config: &BackupConfig, containers: &[ContainerSummary]) -> Self {
        let mut plan = Self::default();
        for container in containers {
            let id = short_id(&container.id);
            let Some(paths) = config.paths_for(&id) else {
                continue;
            };
            for path in paths {
                if plan.pairs.insert((id.clone(), path.clone())) {
                    plan.targets
                        .push(InstanceKey::new(&id, &container.name, path));
                }
            }
        }
        plan
    }

    /// Keys to register, in listing order.
    pub fn targets(&self) -> &[InstanceKey] {
        &self.targets
    }

    /// Whether `path` of `container_id` is selected for backup.
    pub fn tracks(&self, container_id: &str, path: &str) -> bool {
        self.pairs
            .contains(&(container_id.to_string(), path.to_string()))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
