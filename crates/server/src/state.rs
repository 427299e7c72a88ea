// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use crate::config::JobSettings;
use crate::jobs::{Collaborators, JobRegistry, Reaper, StageRunner};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// All jobs that are running or still within retention.
    pub registry: Arc<JobRegistry>,
    /// Starts pipelines for newly submitted jobs.
    pub runner: StageRunner,
    pub settings: JobSettings,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(collaborators: Collaborators, settings: JobSettings) -> Arc<Self> {
        let registry = Arc::new(JobRegistry::new());
        let reaper = Reaper::new(Arc::clone(&registry), settings.retention);
        Arc::new(Self {
            start_time: Instant::now(),
            registry,
            runner: StageRunner::new(collaborators, reaper),
            settings,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
