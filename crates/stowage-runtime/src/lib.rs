//! stowage-runtime — the container runtime collaborator.
//!
//! Stowage needs three things from a container runtime: whether it is
//! reachable, the list of all containers (running and stopped) with their
//! start/finish times, and a tar stream of a path inside a container.
//!
//! # Architecture
//!
//! ```text
//! ContainerRuntime (trait)
//!   ├── DockerRuntime  — Docker Engine API over a unix socket (hyper)
//!   └── MemoryRuntime  — in-process containers and archives (tests)
//! ```

#[cfg(unix)]
pub mod docker;
pub mod error;
pub mod memory;
pub mod runtime;
pub mod time;

#[cfg(unix)]
pub use docker::DockerRuntime;
pub use error::{RuntimeError, RuntimeResult};
pub use memory::MemoryRuntime;
pub use runtime::ContainerRuntime;
