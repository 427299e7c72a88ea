//! Shared fixtures for the HTTP tests: scripted collaborators and request
//! helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use storybook_core::{
    CompletionRequest, CompletionResponse, ImageError, ImageGenerator, LlmError, LlmProvider,
    ModerationProvider, ModerationVerdict,
};
use storybook_server::jobs::Collaborators;
use storybook_server::{create_app, AppState, JobSettings};
use tokio::sync::Semaphore;
use tower::ServiceExt;

/// Flags any prompt containing "forbidden".
pub struct StubModerator;

#[async_trait]
impl ModerationProvider for StubModerator {
    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, LlmError> {
        if text.contains("forbidden") {
            Ok(ModerationVerdict::rejected(vec!["violence".into()]))
        } else {
            Ok(ModerationVerdict::allowed())
        }
    }

    fn name(&self) -> &str {
        "stub-moderation"
    }
}

/// Answers each stage from the prompt alone, so concurrent jobs can share it.
#[derive(Default)]
pub struct StubLlm {
    pub calls: AtomicUsize,
}

#[async_trait]
impl LlmProvider for StubLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = &request.user_prompt;

        let content = if prompt.contains("create a title") {
            format!("\"The Book of {}\"", topic(prompt))
        } else if prompt.contains("prompt for the image") {
            (1..=page_count(prompt))
                .map(|n| format!("Page {n}: illustration {n}, soft morning light"))
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            (1..=page_count(prompt))
                .map(|n| format!("Page {n}: {} on page {n}.", topic(prompt)))
                .collect::<Vec<_>>()
                .join("\n")
        };

        Ok(CompletionResponse {
            content,
            model: Some("stub-model".into()),
            input_tokens: Some(20),
            output_tokens: Some(10),
            latency_ms: 1,
        })
    }

    fn name(&self) -> &str {
        "stub-llm"
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}

fn topic(prompt: &str) -> String {
    prompt
        .lines()
        .find_map(|line| line.trim().strip_prefix("Sentence/topic:"))
        .unwrap_or("nothing")
        .trim()
        .to_string()
}

fn page_count(prompt: &str) -> usize {
    prompt
        .split("each of the ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(1)
}

/// Returns a fake URL per prompt. With a gate, every call waits for a permit.
#[derive(Default)]
pub struct StubImages {
    pub gate: Option<Arc<Semaphore>>,
    pub calls: AtomicUsize,
}

impl StubImages {
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let images = Self {
            gate: Some(Arc::clone(&gate)),
            calls: AtomicUsize::new(0),
        };
        (images, gate)
    }
}

#[async_trait]
impl ImageGenerator for StubImages {
    async fn generate(&self, prompt: &str) -> Result<String, ImageError> {
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.map_err(|_| ImageError::NoImage)?;
            permit.forget();
        }
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let slug: String = prompt.chars().filter(char::is_ascii_alphanumeric).take(16).collect();
        Ok(format!("https://img.test/{n}-{slug}.png"))
    }

    fn name(&self) -> &str {
        "stub-images"
    }
}

pub fn settings() -> JobSettings {
    JobSettings {
        retention: Duration::from_secs(3600),
        poll_interval: Duration::from_millis(20),
        max_pages: 12,
    }
}

pub fn app_with(images: StubImages, settings: JobSettings) -> (Router, Arc<AppState>) {
    let collaborators = Collaborators {
        moderator: Arc::new(StubModerator),
        llm: Arc::new(StubLlm::default()),
        images: Arc::new(images),
    };
    let state = AppState::new(collaborators, settings);
    (create_app(Arc::clone(&state)), state)
}

pub fn app() -> (Router, Arc<AppState>) {
    app_with(StubImages::default(), settings())
}

/// GET `uri`, returning status, content type and the whole body.
pub async fn get(app: &Router, uri: &str) -> (StatusCode, String, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, _, body) = get(app, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

/// Submit a job and return its task id.
pub async fn submit(app: &Router, des: &str, pgs: u32) -> String {
    let des = des.replace(' ', "+");
    let (status, json) = get_json(app, &format!("/get_storybook?des={des}&pgs={pgs}")).await;
    assert_eq!(status, StatusCode::OK, "submit failed: {json}");
    json["task_id"].as_str().unwrap().to_string()
}

/// Read the full update stream of a task.
pub async fn updates(app: &Router, task_id: &str) -> SseBody {
    let (status, content_type, body) = tokio::time::timeout(
        Duration::from_secs(10),
        get(app, &format!("/get_updates/{task_id}")),
    )
    .await
    .expect("update stream did not end");
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/event-stream"), "{content_type}");
    SseBody::parse(&body)
}

/// Data events and comment lines of an SSE body.
pub struct SseBody {
    pub events: Vec<serde_json::Value>,
    pub comments: Vec<String>,
}

impl SseBody {
    pub fn parse(body: &str) -> Self {
        let mut events = Vec::new();
        let mut comments = Vec::new();
        for frame in body.split("\n\n").filter(|f| !f.trim().is_empty()) {
            let mut data = Vec::new();
            for line in frame.lines() {
                if let Some(comment) = line.strip_prefix(':') {
                    comments.push(comment.trim().to_string());
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push(value.strip_prefix(' ').unwrap_or(value));
                }
            }
            if !data.is_empty() {
                events.push(serde_json::from_str(&data.join("\n")).unwrap());
            }
        }
        Self { events, comments }
    }

    pub fn statuses(&self) -> Vec<&str> {
        self.events
            .iter()
            .map(|e| e["status"].as_str().unwrap())
            .collect()
    }

    pub fn progress(&self) -> Vec<u64> {
        self.events
            .iter()
            .map(|e| e["progress"]["current"].as_u64().unwrap())
            .collect()
    }
}
