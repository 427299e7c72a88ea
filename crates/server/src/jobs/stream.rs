// crates/server/src/jobs/stream.rs
//! Per-subscriber view over a job's snapshot log.

use std::sync::Arc;
use std::time::Duration;

use tokio_stream::Stream;

use super::state::JobState;
use super::types::Snapshot;

/// Interval between keep-alives while a job has nothing new.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Item produced for one subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Snapshot(Snapshot),
    KeepAlive,
}

/// Ordered, lazy stream of a job's snapshots for one subscriber.
///
/// Starts at the first snapshot ever published, whenever the subscriber
/// attaches, and reads without consuming so any number of subscribers see
/// the same sequence. While nothing new is available it yields a
/// `KeepAlive` and waits up to `poll_interval` (less if a snapshot lands).
/// Ends right after the terminal snapshot.
pub fn snapshot_stream(job: Arc<JobState>, poll_interval: Duration) -> impl Stream<Item = StreamItem> {
    async_stream::stream! {
        let mut changes = job.watch();
        let mut cursor = 0usize;

        loop {
            if let Some(snapshot) = job.snapshot_at(cursor) {
                cursor += 1;
                let terminal = snapshot.is_terminal();
                yield StreamItem::Snapshot(snapshot);
                if terminal {
                    break;
                }
                continue;
            }

            // Mark the current length as seen, then re-check so a snapshot
            // published in between is not left waiting a full interval.
            changes.borrow_and_update();
            if cursor < job.len() {
                continue;
            }

            yield StreamItem::KeepAlive;
            let _ = tokio::time::timeout(poll_interval, changes.changed()).await;
        }

        tracing::debug!(task_id = %job.id(), delivered = cursor, "snapshot stream finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::{JobId, StoryPayload};
    use tokio_stream::StreamExt;

    fn payload(title: &str) -> StoryPayload {
        let mut payload = StoryPayload::new("a fox", 1);
        payload.title = Some(title.into());
        payload
    }

    #[tokio::test]
    async fn test_replays_finished_job_and_ends() {
        let job = Arc::new(JobState::new(JobId::new()));
        job.publish(Snapshot::working(0, None));
        job.publish(Snapshot::working(1, Some(payload("The Fox"))));
        job.publish(Snapshot::done(payload("The Fox")));

        let items: Vec<_> = snapshot_stream(job, Duration::from_millis(10))
            .collect()
            .await;
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| matches!(i, StreamItem::Snapshot(_))));
    }

    #[tokio::test]
    async fn test_keep_alive_only_while_waiting() {
        let job = Arc::new(JobState::new(JobId::new()));
        job.publish(Snapshot::working(1, Some(payload("The Fox"))));
        job.publish(Snapshot::working(2, Some(payload("The Fox"))));
        job.publish(Snapshot::working(3, Some(payload("The Fox"))));

        let stream = snapshot_stream(Arc::clone(&job), Duration::from_millis(20));
        tokio::pin!(stream);

        for expected in 1..=3 {
            match stream.next().await {
                Some(StreamItem::Snapshot(s)) => assert_eq!(s.progress.current, expected),
                other => panic!("expected snapshot, got {other:?}"),
            }
        }
        assert_eq!(stream.next().await, Some(StreamItem::KeepAlive));

        let publisher = Arc::clone(&job);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(70)).await;
            publisher.publish(Snapshot::done(payload("The Fox")));
        });

        let mut rest = Vec::new();
        while let Some(item) = stream.next().await {
            rest.push(item);
        }

        let terminal: Vec<_> = rest
            .iter()
            .filter(|i| matches!(i, StreamItem::Snapshot(s) if s.is_terminal()))
            .collect();
        assert_eq!(terminal.len(), 1);
        assert!(matches!(rest.last(), Some(StreamItem::Snapshot(s)) if s.is_terminal()));
        assert!(rest[..rest.len() - 1]
            .iter()
            .all(|i| *i == StreamItem::KeepAlive));
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_full_sequence() {
        let job = Arc::new(JobState::new(JobId::new()));
        let early = snapshot_stream(Arc::clone(&job), Duration::from_millis(5));

        job.publish(Snapshot::working(0, None));
        job.publish(Snapshot::working(1, Some(payload("The Fox"))));
        job.publish(Snapshot::done(payload("The Fox")));

        let late = snapshot_stream(Arc::clone(&job), Duration::from_millis(5));

        let only_snapshots = |items: Vec<StreamItem>| -> Vec<Snapshot> {
            items
                .into_iter()
                .filter_map(|i| match i {
                    StreamItem::Snapshot(s) => Some(s),
                    StreamItem::KeepAlive => None,
                })
                .collect()
        };

        let early = only_snapshots(early.collect().await);
        let late = only_snapshots(late.collect().await);
        assert_eq!(early, job.snapshots());
        assert_eq!(late, job.snapshots());
    }

    #[tokio::test]
    async fn test_wakes_before_poll_interval_on_publish() {
        let job = Arc::new(JobState::new(JobId::new()));
        let stream = snapshot_stream(Arc::clone(&job), Duration::from_secs(30));
        tokio::pin!(stream);

        assert_eq!(stream.next().await, Some(StreamItem::KeepAlive));
        job.publish(Snapshot::done(payload("The Fox")));

        let next = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("woken by publish, not by the 30s poll");
        assert!(matches!(next, Some(StreamItem::Snapshot(s)) if s.is_terminal()));
    }
}
