//! Vinadock Molecules - AutoDock Vina invocation layer.
//!
//! 1. Describing a docking request (receptor, ligand, docking box)
//! 2. Preparing an isolated working directory per job
//! 3. Running AutoDock Vina and classifying its outcome
//! 4. Queueing jobs and tracking their state

pub mod request;
pub mod workspace;
pub mod docking;
pub mod job;

#[cfg(all(test, unix))]
pub(crate) mod testing;

pub use docking::{check_vina_available, DockingFailure, DockingResult, VinaCommand, VinaRunner};
pub use job::{JobEvent, JobId, JobQueue, JobRecord, JobStatus};
pub use request::{DockingBox, DockingRequest, Upload, Vec3};
pub use workspace::JobWorkspace;
