// crates/server/src/jobs/runner.rs
//! Stage runner: executes the storybook pipeline for one job.
//!
//! Stages, in order:
//! 1. moderation of the user prompt
//! 2. title
//! 3. page texts
//! 4. image prompts
//! 5. one illustration per image prompt
//!
//! A snapshot is published after stages 2-4 and after every single
//! illustration. Every stage returns a `Result`; whatever ends the pipeline
//! (success, error or panic) is turned into exactly one terminal snapshot.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use storybook_core::prompts::{image_prompt_prompt, page_text_prompt, title_prompt};
use storybook_core::{
    parse_pages, CompletionRequest, ImageError, ImageGenerator, LlmError, LlmProvider,
    ModerationProvider,
};
use thiserror::Error;
use tokio::task::JoinHandle;

use super::reaper::Reaper;
use super::state::JobState;
use super::types::{
    share_all, FailureKind, JobFailure, Progress, SharedText, Snapshot, StoryPayload, TOTAL_STAGES,
};
use crate::metrics::{record_job_finished, record_job_started, record_stage};

/// External services the pipeline calls.
#[derive(Clone)]
pub struct Collaborators {
    pub moderator: Arc<dyn ModerationProvider>,
    pub llm: Arc<dyn LlmProvider>,
    pub images: Arc<dyn ImageGenerator>,
}

/// What the user asked for.
#[derive(Debug, Clone)]
pub struct StoryRequest {
    pub user_input: String,
    pub total_pages: u32,
}

/// Pipeline stage, used for logs, metrics and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Moderation,
    Title,
    PageText,
    ImagePrompts,
    Illustration,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Moderation => "moderation",
            Stage::Title => "title",
            Stage::PageText => "page_text",
            Stage::ImagePrompts => "image_prompts",
            Stage::Illustration => "illustration",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error ending the pipeline at a stage boundary.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("prompt rejected by moderation ({})", .categories.join(", "))]
    Rejected { categories: Vec<String> },

    #[error("moderation check failed: {0}")]
    Moderation(#[source] LlmError),

    #[error("{stage} generation failed: {source}")]
    Text {
        stage: Stage,
        #[source]
        source: LlmError,
    },

    #[error("illustration for page {page} failed: {source}")]
    Image {
        page: usize,
        #[source]
        source: ImageError,
    },
}

impl StageError {
    pub fn kind(&self) -> FailureKind {
        match self {
            StageError::Rejected { .. } => FailureKind::ModerationRejected,
            StageError::Moderation(_) => FailureKind::Moderation,
            StageError::Text { .. } => FailureKind::TextGeneration,
            StageError::Image { .. } => FailureKind::ImageGeneration,
        }
    }

    fn into_failure(self) -> JobFailure {
        JobFailure {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct TokenUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Runs jobs in the background and hands finished jobs to the reaper.
#[derive(Clone)]
pub struct StageRunner {
    collaborators: Collaborators,
    reaper: Reaper,
}

impl StageRunner {
    pub fn new(collaborators: Collaborators, reaper: Reaper) -> Self {
        Self {
            collaborators,
            reaper,
        }
    }

    /// Start the job on its own task. Not cancellable: the job keeps running
    /// when subscribers disconnect.
    pub fn spawn(&self, job: Arc<JobState>, request: StoryRequest) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run(job, request).await })
    }

    /// Run the job to its terminal snapshot, then schedule reaping.
    pub async fn run(&self, job: Arc<JobState>, request: StoryRequest) {
        let task_id = job.id();
        record_job_started();
        job.publish(Snapshot::working(0, None));
        tracing::info!(%task_id, total_pages = request.total_pages, "storybook job started");

        // The pipeline gets its own task so a panic inside a collaborator
        // still ends in a terminal snapshot.
        let pipeline = {
            let runner = self.clone();
            let job = Arc::clone(&job);
            tokio::spawn(async move { runner.execute(&job, request).await })
        };

        let outcome = match pipeline.await {
            Ok(Ok(payload)) => {
                job.publish(Snapshot::done(payload));
                tracing::info!(%task_id, "storybook job done");
                "done"
            }
            Ok(Err(err)) => {
                let kind = err.kind();
                match kind {
                    FailureKind::ModerationRejected => {
                        tracing::info!(%task_id, error = %err, "storybook job rejected")
                    }
                    _ => tracing::error!(%task_id, error = %err, "storybook job failed"),
                }
                publish_failure(&job, err.into_failure());
                kind.as_str()
            }
            Err(join_err) => {
                tracing::error!(%task_id, error = %join_err, "storybook pipeline task aborted");
                publish_failure(
                    &job,
                    JobFailure {
                        kind: FailureKind::Internal,
                        message: "pipeline task aborted".into(),
                    },
                );
                FailureKind::Internal.as_str()
            }
        };

        record_job_finished(outcome);
        self.reaper.schedule(task_id);
    }

    async fn execute(&self, job: &JobState, request: StoryRequest) -> Result<StoryPayload, StageError> {
        let task_id = job.id();
        let StoryRequest {
            user_input,
            total_pages,
        } = request;

        let started = Instant::now();
        let verdict = self
            .collaborators
            .moderator
            .moderate(&user_input)
            .await
            .map_err(StageError::Moderation)?;
        record_stage(Stage::Moderation.as_str(), started.elapsed());
        if !verdict.passed() {
            return Err(StageError::Rejected {
                categories: verdict.categories,
            });
        }

        let text_started = Instant::now();
        let mut usage = TokenUsage::default();
        let mut payload = StoryPayload::new(user_input.clone(), total_pages);

        let title = self
            .generate(Stage::Title, title_prompt(&user_input), &mut usage)
            .await?;
        payload.title = Some(clean_title(&title));
        job.publish(Snapshot::working(1, Some(payload.clone())));

        let title = payload.title.clone().unwrap_or_default();
        let page_text = self
            .generate(
                Stage::PageText,
                page_text_prompt(&user_input, &title, total_pages),
                &mut usage,
            )
            .await?;
        payload.text_description = Some(share_all(parse_pages(&page_text)));
        job.publish(Snapshot::working(2, Some(payload.clone())));

        let raw_prompts = self
            .generate(
                Stage::ImagePrompts,
                image_prompt_prompt(&title, &page_text, total_pages),
                &mut usage,
            )
            .await?;
        let image_prompts = share_all(parse_pages(&raw_prompts));
        payload.image_description = Some(image_prompts.clone());
        job.publish(Snapshot::working(3, Some(payload.clone())));

        tracing::info!(
            %task_id,
            pages = payload.text_description.as_ref().map_or(0, Vec::len),
            image_prompts = image_prompts.len(),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.prompt_tokens + usage.completion_tokens,
            elapsed_ms = text_started.elapsed().as_millis() as u64,
            "text stages complete"
        );

        let images_started = Instant::now();
        let mut illustrations = Vec::with_capacity(image_prompts.len());
        for (index, prompt) in image_prompts.iter().enumerate() {
            let started = Instant::now();
            let image = self
                .collaborators
                .images
                .generate(prompt)
                .await
                .map_err(|source| StageError::Image {
                    page: index + 1,
                    source,
                })?;
            record_stage(Stage::Illustration.as_str(), started.elapsed());

            illustrations.push(SharedText::from(image));
            payload.illustrations = Some(illustrations.clone());
            job.publish(Snapshot::working(TOTAL_STAGES, Some(payload.clone())));
        }
        payload.illustrations = Some(illustrations);

        tracing::info!(
            %task_id,
            images = image_prompts.len(),
            elapsed_ms = images_started.elapsed().as_millis() as u64,
            "illustrations complete"
        );

        Ok(payload)
    }

    async fn generate(
        &self,
        stage: Stage,
        request: CompletionRequest,
        usage: &mut TokenUsage,
    ) -> Result<String, StageError> {
        let started = Instant::now();
        let response = self
            .collaborators
            .llm
            .complete(request)
            .await
            .map_err(|source| StageError::Text { stage, source })?;
        record_stage(stage.as_str(), started.elapsed());

        usage.prompt_tokens += response.input_tokens.unwrap_or(0);
        usage.completion_tokens += response.output_tokens.unwrap_or(0);
        tracing::debug!(
            %stage,
            provider = self.collaborators.llm.name(),
            latency_ms = response.latency_ms,
            "text stage finished"
        );
        Ok(response.content)
    }
}

fn publish_failure(job: &JobState, failure: JobFailure) {
    let (progress, data) = match job.latest() {
        Some(last) => (last.progress, last.data),
        None => (Progress::at(0), None),
    };
    job.publish(Snapshot::failed(progress, data, failure));
}

/// Models like to wrap titles in quotes or prefix them.
fn clean_title(raw: &str) -> String {
    let title = raw.trim();
    let title = title.strip_prefix("Title:").unwrap_or(title).trim();
    title.trim_matches(|c| c == '"' || c == '\'').trim().to_string()
}
