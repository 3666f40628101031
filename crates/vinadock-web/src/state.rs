//! Shared application state for the web server.

use std::sync::Arc;
use tokio::sync::broadcast;

use vinadock_common::{Config, Result};
use vinadock_molecules::{JobEvent, JobQueue};

use crate::templates;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: Config,
    pub jobs: JobQueue,
    pub templates: minijinja::Environment<'static>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let jobs = JobQueue::from_settings(&config.docking);
        let templates = templates::environment()?;
        Ok(Self { config, jobs, templates })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.jobs.subscribe()
    }
}

pub type SharedState = Arc<AppState>;
