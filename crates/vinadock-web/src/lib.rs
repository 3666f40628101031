//! vinadock-web — Web form for AutoDock Vina
//! Provides a single docking page with:
//!   - Receptor / ligand upload and docking box inputs
//!   - Job status page with the Vina log and downloads
//!   - JSON job API and live job events

pub mod router;
pub mod handlers;
pub mod state;
pub mod sse;
pub mod templates;
