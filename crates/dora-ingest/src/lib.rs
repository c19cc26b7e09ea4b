//! # dora-ingest
//!
//! The single ingress endpoint: an authenticated CI webhook client posts a
//! repository-change trigger, and exactly one analysis job lands on the
//! queue.
//!
//! ```text
//! POST /trigger   Authorization: Bearer <secret>
//!                 { "repoUrl": ..., "sha": ..., "event": ..., "prNumber"?: ... }
//!   202 { "jobId": ... }   on enqueue
//!   401 / 403 / 400 / 500  on auth, body, or queue problems
//! GET  /health → 200
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use dora_queue::{AnalysisJob, JobQueue};

/// Shared handler state.
#[derive(Clone)]
pub struct IngestState {
    queue: Arc<dyn JobQueue>,
    secret: Arc<str>,
}

impl IngestState {
    pub fn new(queue: Arc<dyn JobQueue>, secret: impl Into<Arc<str>>) -> Self {
        Self {
            queue,
            secret: secret.into(),
        }
    }
}

/// Build the ingress router.
pub fn router(state: IngestState) -> Router {
    Router::new()
        .route("/trigger", post(trigger))
        .route("/health", get(health))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Every field optional at parse time: presence is validated by hand so
/// missing fields and malformed JSON both answer 400, never a serde 422.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriggerBody {
    #[serde(default)]
    repo_url: Option<String>,
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    pr_number: Option<i64>,
}

enum TriggerError {
    /// Missing or malformed Authorization header.
    Unauthenticated,
    /// Wrong token.
    Forbidden,
    /// Missing or invalid body fields.
    BadBody(String),
    /// Queue publish failed.
    Publish,
}

impl IntoResponse for TriggerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "missing bearer token".to_string()),
            Self::Forbidden => (StatusCode::FORBIDDEN, "invalid token".to_string()),
            Self::BadBody(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Publish => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to enqueue job".to_string(),
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Pull the bearer token out of the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn trigger(
    State(state): State<IngestState>,
    headers: HeaderMap,
    body: Result<Json<TriggerBody>, axum::extract::rejection::JsonRejection>,
) -> Result<impl IntoResponse, TriggerError> {
    // Auth strictly before body inspection.
    let token = bearer_token(&headers).ok_or(TriggerError::Unauthenticated)?;
    if token != state.secret.as_ref() {
        warn!("trigger with wrong token rejected");
        return Err(TriggerError::Forbidden);
    }

    let Json(body) =
        body.map_err(|_| TriggerError::BadBody("invalid JSON body".to_string()))?;

    let required = |field: Option<String>, name: &str| {
        field
            .filter(|v| !v.is_empty())
            .ok_or_else(|| TriggerError::BadBody(format!("{name} is required")))
    };

    let job = AnalysisJob {
        repo_url: required(body.repo_url, "repoUrl")?,
        sha: required(body.sha, "sha")?,
        event: required(body.event, "event")?,
        pr_number: body.pr_number,
        received_at: Utc::now(),
    };

    let job_id = state.queue.publish_analysis(&job).await.map_err(|e| {
        error!(error = %e, "failed to publish analysis job");
        TriggerError::Publish
    })?;

    info!(job_id = %job_id, repo = %job.repo_url, sha = %job.sha, "trigger accepted");
    Ok((StatusCode::ACCEPTED, Json(json!({ "jobId": job_id }))))
}

async fn health() -> &'static str {
    "OK"
}
