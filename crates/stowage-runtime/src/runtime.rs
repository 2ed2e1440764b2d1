//! The runtime capability used by detection and backup creation.

use std::io::Write;

use async_trait::async_trait;
use stowage_core::ContainerSummary;

use crate::error::RuntimeResult;

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Cheap reachability check, performed once per run.
    async fn ping(&self) -> RuntimeResult<()>;

    /// Every container the runtime knows about, running or stopped.
    async fn list_containers(&self) -> RuntimeResult<Vec<ContainerSummary>>;

    /// Stream a tar archive of `path` inside `container_id` into `sink`.
    /// Returns the number of archive bytes written.
    async fn get_archive(
        &self,
        container_id: &str,
        path: &str,
        sink: &mut (dyn Write + Send),
    ) -> RuntimeResult<u64>;
}
