// crates/server/src/jobs/mod.rs
//! Background job system for storybook generation.
//!
//! Provides:
//! - `JobRegistry` — id → job map shared by all request handlers
//! - `JobState` — append-only snapshot log for one job
//! - `StageRunner` — runs the generation pipeline in the background
//! - `Reaper` — delayed removal of finished jobs
//! - `snapshot_stream` — per-subscriber replay of a job's snapshots

pub mod reaper;
pub mod registry;
pub mod runner;
pub mod state;
pub mod stream;
pub mod types;

pub use reaper::Reaper;
pub use registry::JobRegistry;
pub use runner::{Collaborators, Stage, StageError, StageRunner, StoryRequest};
pub use state::JobState;
pub use stream::{snapshot_stream, StreamItem, DEFAULT_POLL_INTERVAL};
pub use types::{
    FailureKind, JobFailure, JobId, JobStatus, Progress, Snapshot, StoryPayload, TOTAL_STAGES,
};
