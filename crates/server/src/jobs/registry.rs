// crates/server/src/jobs/registry.rs
//! Process-wide map from job id to job state.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::state::JobState;
use super::types::JobId;

/// Registry of live jobs.
///
/// All access goes through one mutex; the lock is never held across an
/// `.await`. Removing an entry does not affect holders of the `Arc<JobState>`:
/// a running job or an attached subscriber keeps its handle until it drops it.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Arc<JobState>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job under a fresh identifier and return it.
    pub fn create(&self) -> Arc<JobState> {
        let mut jobs = self.lock();
        loop {
            let id = JobId::new();
            if let Entry::Vacant(slot) = jobs.entry(id) {
                let job = Arc::new(JobState::new(id));
                slot.insert(Arc::clone(&job));
                tracing::debug!(task_id = %id, active = jobs.len(), "job registered");
                return job;
            }
        }
    }

    pub fn lookup(&self, id: &JobId) -> Option<Arc<JobState>> {
        self.lock().get(id).cloned()
    }

    /// Remove a job. Returns `false` if it was not registered.
    pub fn delete(&self, id: &JobId) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Arc<JobState>>> {
        self.jobs.lock().unwrap_or_else(|e| {
            tracing::error!("Mutex poisoned on job registry: {e}");
            e.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::Snapshot;

    #[test]
    fn test_create_and_lookup() {
        let registry = JobRegistry::new();
        let job = registry.create();
        let found = registry.lookup(&job.id()).expect("job registered");
        assert!(Arc::ptr_eq(&job, &found));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = JobRegistry::new();
        let a = registry.create();
        let b = registry.create();
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_lookup_unknown_or_deleted_is_none() {
        let registry = JobRegistry::new();
        assert!(registry.lookup(&JobId::new()).is_none());

        let job = registry.create();
        assert!(registry.delete(&job.id()));
        assert!(registry.lookup(&job.id()).is_none());
        assert!(!registry.delete(&job.id()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_delete_keeps_held_handles_usable() {
        let registry = JobRegistry::new();
        let job = registry.create();
        let subscriber_handle = registry.lookup(&job.id()).unwrap();

        registry.delete(&job.id());

        assert!(job.publish(Snapshot::working(0, None)));
        assert_eq!(subscriber_handle.len(), 1);
    }

    #[test]
    fn test_concurrent_creates() {
        let registry = Arc::new(JobRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    (0..50).map(|_| registry.create().id()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<JobId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = ids.len();
        ids.sort_by_key(|id| id.to_string());
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(registry.len(), 400);
    }
}
