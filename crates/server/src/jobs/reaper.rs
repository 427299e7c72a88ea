// crates/server/src/jobs/reaper.rs
//! Delayed removal of finished jobs from the registry.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::registry::JobRegistry;
use super::types::JobId;

/// Deletes a finished job once its retention window has passed, so late
/// clients can still fetch the result but abandoned jobs don't pile up.
#[derive(Clone)]
pub struct Reaper {
    registry: Arc<JobRegistry>,
    retention: Duration,
}

impl Reaper {
    pub fn new(registry: Arc<JobRegistry>, retention: Duration) -> Self {
        Self {
            registry,
            retention,
        }
    }

    /// Schedule deletion of `id` after the retention window. Fire and forget;
    /// the handle is only useful to tests.
    pub fn schedule(&self, id: JobId) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let retention = self.retention;
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            if registry.delete(&id) {
                tracing::info!(
                    task_id = %id,
                    retention_secs = retention.as_secs(),
                    "job reaped"
                );
            }
        })
    }
}
