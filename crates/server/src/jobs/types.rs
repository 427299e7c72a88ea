// crates/server/src/jobs/types.rs
//! Types for the storybook job system.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of progress steps in a job: title, page texts, image prompts,
/// illustrations.
pub const TOTAL_STAGES: u32 = 4;

/// Opaque, randomly generated identifier for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending = 0,
    Working = 1,
    Done = 2,
    Failed = 3,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => JobStatus::Pending,
            1 => JobStatus::Working,
            2 => JobStatus::Done,
            _ => JobStatus::Failed,
        }
    }
}

/// Progress counters carried by every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: u32,
    pub current: u32,
}

impl Progress {
    pub fn at(current: u32) -> Self {
        Self {
            total: TOTAL_STAGES,
            current,
        }
    }
}

/// Immutable text shared between snapshots. Each cumulative snapshot holds
/// a reference to the same allocation instead of its own copy.
pub type SharedText = Arc<str>;

/// Convert freshly generated strings into shared text.
pub fn share_all(items: Vec<String>) -> Vec<SharedText> {
    items.into_iter().map(SharedText::from).collect()
}

/// Everything known about the storybook so far.
///
/// Fields are filled in stage by stage and never cleared; unknown fields are
/// left out of the JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPayload {
    pub user_input: String,
    pub total_pages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_description: Option<Vec<SharedText>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_description: Option<Vec<SharedText>>,
    /// Data URIs can be megabytes each.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub illustrations: Option<Vec<SharedText>>,
}

impl StoryPayload {
    pub fn new(user_input: impl Into<String>, total_pages: u32) -> Self {
        Self {
            user_input: user_input.into(),
            total_pages,
            ..Self::default()
        }
    }

    /// True when every field known in `previous` is still known here with the
    /// same value. List fields may only grow at the end.
    pub fn extends(&self, previous: &StoryPayload) -> bool {
        fn keeps<T: PartialEq>(new: &Option<T>, old: &Option<T>) -> bool {
            old.is_none() || new == old
        }
        fn grows(new: &Option<Vec<SharedText>>, old: &Option<Vec<SharedText>>) -> bool {
            match (new, old) {
                (_, None) => true,
                (Some(new), Some(old)) => new.starts_with(old),
                (None, Some(_)) => false,
            }
        }

        self.user_input == previous.user_input
            && self.total_pages == previous.total_pages
            && keeps(&self.title, &previous.title)
            && keeps(&self.text_description, &previous.text_description)
            && keeps(&self.image_description, &previous.image_description)
            && grows(&self.illustrations, &previous.illustrations)
    }
}

/// Why a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The prompt did not pass moderation. Nothing downstream was called.
    ModerationRejected,
    /// The moderation service itself errored.
    Moderation,
    TextGeneration,
    ImageGeneration,
    Internal,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::ModerationRejected => "moderation_rejected",
            FailureKind::Moderation => "moderation",
            FailureKind::TextGeneration => "text_generation",
            FailureKind::ImageGeneration => "image_generation",
            FailureKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// One immutable progress record, as sent to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub status: JobStatus,
    pub progress: Progress,
    pub data: Option<StoryPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
}

impl Snapshot {
    pub fn working(current: u32, data: Option<StoryPayload>) -> Self {
        Self {
            status: JobStatus::Working,
            progress: Progress::at(current),
            data,
            error: None,
        }
    }

    pub fn done(data: StoryPayload) -> Self {
        Self {
            status: JobStatus::Done,
            progress: Progress::at(TOTAL_STAGES),
            data: Some(data),
            error: None,
        }
    }

    /// A failure keeps the progress and data of the last published snapshot.
    pub fn failed(progress: Progress, data: Option<StoryPayload>, error: JobFailure) -> Self {
        Self {
            status: JobStatus::Failed,
            progress,
            data,
            error: Some(error),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
