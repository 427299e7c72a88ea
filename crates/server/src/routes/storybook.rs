// crates/server/src/routes/storybook.rs
//! Storybook job endpoints.
//!
//! - GET /get_storybook?des=&pgs=         — Submit a job, returns its task id
//! - GET /get_updates/{task_id}           — SSE stream of the job's snapshots
//! - GET /get_final_output/{task_id}      — Terminal result of one job

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::sse::{Event, Sse},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;

use crate::error::{ApiError, ApiResult};
use crate::jobs::{
    snapshot_stream, JobFailure, JobId, JobState, JobStatus, StoryPayload, StoryRequest,
    StreamItem,
};
use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

/// Query parameters for GET /get_storybook.
#[derive(Debug, Default, Deserialize)]
pub struct StorybookQuery {
    /// Free-text story description.
    pub des: Option<String>,
    /// Number of pages, kept as text so a bad value gets a precise 400.
    pub pgs: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct SubmitResponse {
    pub task_id: JobId,
}

/// Response for GET /get_final_output/{task_id}.
#[derive(Debug, Serialize)]
pub struct FinalOutputResponse {
    pub task_id: JobId,
    pub status: JobStatus,
    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
    /// Finished book; `null` until the job is done, and for failed jobs.
    pub final_output: Option<StoryPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /get_storybook — Register a job and start its pipeline.
async fn submit_storybook(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StorybookQuery>, QueryRejection>,
) -> ApiResult<Json<SubmitResponse>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = validate_request(query, state.settings.max_pages)?;

    let job = state.registry.create();
    let task_id = job.id();
    tracing::info!(%task_id, total_pages = request.total_pages, "storybook job submitted");
    state.runner.spawn(job, request);

    Ok(Json(SubmitResponse { task_id }))
}

/// GET /get_updates/{task_id} — Replay every snapshot of the job, then
/// follow it live until the terminal one.
async fn get_updates(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<Event, axum::Error>>>> {
    let job = lookup_job(&state, &task_id)?;
    tracing::debug!(task_id = %job.id(), "update stream attached");

    let stream = snapshot_stream(job, state.settings.poll_interval).map(|item| match item {
        StreamItem::Snapshot(snapshot) => Event::default().json_data(&snapshot),
        StreamItem::KeepAlive => Ok(Event::default().comment("keep alive")),
    });

    Ok(Sse::new(stream))
}

/// GET /get_final_output/{task_id} — Result of one job.
async fn get_final_output(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<FinalOutputResponse>> {
    let job = lookup_job(&state, &task_id)?;

    // Status follows the outcome once there is one.
    let (status, final_output, error) = match job.outcome() {
        Some(snapshot) if snapshot.status == JobStatus::Done => (snapshot.status, snapshot.data, None),
        Some(snapshot) => (snapshot.status, None, snapshot.error),
        None => (job.status(), None, None),
    };

    Ok(Json(FinalOutputResponse {
        task_id: job.id(),
        status,
        created_at: job.created_at(),
        final_output,
        error,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn lookup_job(state: &AppState, raw: &str) -> ApiResult<Arc<JobState>> {
    let id: JobId = raw
        .parse()
        .map_err(|_| ApiError::UnknownJob(raw.to_string()))?;
    state
        .registry
        .lookup(&id)
        .ok_or_else(|| ApiError::UnknownJob(raw.to_string()))
}

fn validate_request(query: StorybookQuery, max_pages: u32) -> ApiResult<StoryRequest> {
    let user_input = query
        .des
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::BadRequest("des must be a non-empty description".into()))?;

    let raw_pages = query
        .pgs
        .ok_or_else(|| ApiError::BadRequest("pgs is required".into()))?;
    let total_pages = raw_pages
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|n| (1..=max_pages).contains(n))
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "pgs must be an integer between 1 and {max_pages}, got {raw_pages:?}"
            ))
        })?;

    Ok(StoryRequest {
        user_input,
        total_pages,
    })
}

/// Build the storybook router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/get_storybook", get(submit_storybook))
        .route("/get_updates/{task_id}", get(get_updates))
        .route("/get_final_output/{task_id}", get(get_final_output))
}
