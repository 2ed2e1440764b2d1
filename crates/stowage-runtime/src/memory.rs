//! In-process runtime backed by plain collections.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use stowage_core::ContainerSummary;

use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::ContainerRuntime;

/// A runtime whose containers and archive contents are set directly.
///
/// Archives not registered with [`MemoryRuntime::set_archive`] stream the
/// bytes `"<id>:<path>"`.
#[derive(Debug)]
pub struct MemoryRuntime {
    reachable: AtomicBool,
    listing_fails: AtomicBool,
    containers: Mutex<Vec<ContainerSummary>>,
    archives: Mutex<HashMap<(String, String), Vec<u8>>>,
    failing: Mutex<HashSet<(String, String)>>,
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self {
            reachable: AtomicBool::new(true),
            listing_fails: AtomicBool::new(false),
            containers: Mutex::new(Vec::new()),
            archives: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }
}

impl MemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_containers(containers: impl IntoIterator<Item = ContainerSummary>) -> Self {
        let rt = Self::new();
        rt.set_containers(containers);
        rt
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Make `list_containers` fail while `ping` still succeeds.
    pub fn set_listing_fails(&self, fails: bool) {
        self.listing_fails.store(fails, Ordering::SeqCst);
    }

    pub fn set_containers(&self, containers: impl IntoIterator<Item = ContainerSummary>) {
        *lock(&self.containers) = containers.into_iter().collect();
    }

    /// Replace one container (matched by id), or add it.
    pub fn upsert_container(&self, container: ContainerSummary) {
        let mut containers = lock(&self.containers);
        match containers.iter_mut().find(|c| c.id == container.id) {
            Some(existing) => *existing = container,
            None => containers.push(container),
        }
    }

    pub fn remove_container(&self, id: &str) {
        lock(&self.containers).retain(|c| c.id != id);
    }

    pub fn set_archive(&self, container_id: &str, path: &str, bytes: Vec<u8>) {
        lock(&self.archives).insert((container_id.to_string(), path.to_string()), bytes);
    }

    /// Make `get_archive` fail after writing part of the stream.
    pub fn fail_archive(&self, container_id: &str, path: &str) {
        lock(&self.failing).insert((container_id.to_string(), path.to_string()));
    }

    fn check_reachable(&self) -> RuntimeResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RuntimeError::Unavailable)
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ContainerRuntime for MemoryRuntime {
    async fn ping(&self) -> RuntimeResult<()> {
        self.check_reachable()
    }

    async fn list_containers(&self) -> RuntimeResult<Vec<ContainerSummary>> {
        self.check_reachable()?;
        if self.listing_fails.load(Ordering::SeqCst) {
            return Err(RuntimeError::Status {
                status: 500,
                message: "container listing failed".into(),
            });
        }
        Ok(lock(&self.containers).clone())
    }

    async fn get_archive(
        &self,
        container_id: &str,
        path: &str,
        sink: &mut (dyn Write + Send),
    ) -> RuntimeResult<u64> {
        self.check_reachable()?;
        if !lock(&self.containers).iter().any(|c| c.id == container_id) {
            return Err(RuntimeError::NotFound(container_id.to_string()));
        }

        let key = (container_id.to_string(), path.to_string());
        let bytes = lock(&self.archives)
            .get(&key)
            .cloned()
            .unwrap_or_else(|| format!("{container_id}:{path}").into_bytes());

        if lock(&self.failing).contains(&key) {
            sink.write_all(&bytes[..bytes.len() / 2])?;
            return Err(RuntimeError::Status {
                status: 500,
                message: format!("archive of {path} interrupted"),
            });
        }

        sink.write_all(&bytes)?;
        Ok(bytes.len() as u64)
    }
}
