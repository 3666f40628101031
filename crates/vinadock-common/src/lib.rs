//! vinadock-common — Shared error type and configuration used across all Vinadock crates.

pub mod error;
pub mod config;

// Re-export commonly used types
pub use config::{Config, DockingSettings, ExitPolicy, ServerConfig};
pub use error::{Result, VinadockError};
