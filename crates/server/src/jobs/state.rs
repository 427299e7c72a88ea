// crates/server/src/jobs/state.rs
//! State of a single storybook job: its snapshot log and lifecycle status.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::types::{JobId, JobStatus, Snapshot};

/// One job.
///
/// Snapshots are appended to a log that is never truncated, so every
/// subscriber can replay the whole sequence with its own cursor. The length
/// of the log is mirrored into a `watch` channel to wake waiting readers.
///
/// Only the stage runner publishes; readers never remove anything.
pub struct JobState {
    id: JobId,
    created_at: DateTime<Utc>,
    status: AtomicU8,
    log: RwLock<Vec<Snapshot>>,
    len_tx: watch::Sender<usize>,
}

impl JobState {
    pub fn new(id: JobId) -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            id,
            created_at: Utc::now(),
            status: AtomicU8::new(JobStatus::Pending as u8),
            log: RwLock::new(Vec::new()),
            len_tx,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Append a snapshot and wake subscribers.
    ///
    /// Returns `false` (and logs) when the snapshot would break the log's
    /// ordering: anything after a terminal snapshot, a `current` counter that
    /// goes backwards, or data that drops a previously known field.
    pub fn publish(&self, snapshot: Snapshot) -> bool {
        let mut log = self.write_log();

        if let Some(last) = log.last() {
            if last.is_terminal() {
                tracing::warn!(task_id = %self.id, "snapshot after terminal snapshot dropped");
                return false;
            }
            if snapshot.progress.current < last.progress.current {
                tracing::warn!(
                    task_id = %self.id,
                    previous = last.progress.current,
                    current = snapshot.progress.current,
                    "snapshot with decreasing progress dropped"
                );
                return false;
            }
            let keeps_data = match (&snapshot.data, &last.data) {
                (_, None) => true,
                (Some(new), Some(old)) => new.extends(old),
                (None, Some(_)) => false,
            };
            if !keeps_data {
                tracing::warn!(task_id = %self.id, "snapshot dropping known fields rejected");
                return false;
            }
        }

        self.status.store(snapshot.status as u8, Ordering::Release);
        log.push(snapshot);
        // Still under the write lock so the length never runs ahead of the log.
        self.len_tx.send_replace(log.len());
        true
    }

    /// Snapshot at position `index` in publication order.
    pub fn snapshot_at(&self, index: usize) -> Option<Snapshot> {
        self.read_log().get(index).cloned()
    }

    /// All snapshots published so far.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.read_log().clone()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.read_log().last().cloned()
    }

    /// The terminal snapshot, once the job has finished.
    pub fn outcome(&self) -> Option<Snapshot> {
        self.read_log().last().filter(|s| s.is_terminal()).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_log().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver that changes whenever a snapshot is appended.
    pub fn watch(&self) -> watch::Receiver<usize> {
        self.len_tx.subscribe()
    }

    fn read_log(&self) -> RwLockReadGuard<'_, Vec<Snapshot>> {
        self.log.read().unwrap_or_else(|e| {
            tracing::error!(task_id = %self.id, "RwLock poisoned reading snapshot log: {e}");
            e.into_inner()
        })
    }

    fn write_log(&self) -> RwLockWriteGuard<'_, Vec<Snapshot>> {
        self.log.write().unwrap_or_else(|e| {
            tracing::error!(task_id = %self.id, "RwLock poisoned writing snapshot log: {e}");
            e.into_inner()
        })
    }
}
