//! HTTP route handlers for the storybook server.

pub mod health;
pub mod metrics;
pub mod storybook;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router.
///
/// Routes:
/// - GET /                              - Health check
/// - GET /get_storybook?des=&pgs=       - Submit a storybook job
/// - GET /get_updates/{task_id}         - SSE stream of job snapshots
/// - GET /get_final_output/{task_id}    - Result of one job
/// - GET /metrics                       - Prometheus metrics
pub fn app_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(storybook::router())
        .merge(metrics::router())
        .with_state(state)
}
