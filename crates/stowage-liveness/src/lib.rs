//! stowage-liveness — reconciles the instance table with the runtime.
//!
//! Each run the detector:
//! 1. computes a liveness timestamp for every listed container,
//! 2. registers newly selected `(container, path)` targets,
//! 3. marks rows that are no longer selected as ghosts (and un-marks
//!    resurrected ones),
//! 4. refreshes `container_dt_last_alive` for rows whose container is
//!    still listed.

pub mod detector;
pub mod plan;

pub use detector::{DetectError, DetectResult, DetectionSummary, apply, detect, last_alive};
pub use plan::TrackingPlan;
