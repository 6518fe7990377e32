//! Queue management handlers.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use stitch_models::parse_url_batch;

use crate::error::{ApiError, ApiResult};
use crate::sessions::DEFAULT_SESSION;
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

/// Add-to-queue request.
#[derive(Deserialize)]
pub struct AddToQueueRequest {
    pub session_id: Option<String>,
    /// One or more clip URLs separated by commas, whitespace, or newlines.
    pub urls: String,
}

#[derive(Serialize)]
pub struct AddToQueueResponse {
    pub session_id: String,
    pub queue_length: usize,
    pub added: Vec<String>,
}

/// Clear-queue request.
#[derive(Deserialize)]
pub struct ClearQueueRequest {
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct ClearQueueResponse {
    pub session_id: String,
    pub cleared: usize,
}

#[derive(Deserialize)]
pub struct QueueQuery {
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct QueueResponse {
    pub session_id: String,
    pub urls: Vec<String>,
    pub count: usize,
}

fn session_label(session: &Option<String>) -> String {
    match session.as_deref() {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => DEFAULT_SESSION.to_string(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Add a batch of clip URLs to a session's queue.
///
/// Any malformed URL rejects the whole batch; nothing is enqueued.
pub async fn add_to_queue(
    State(state): State<AppState>,
    Json(req): Json<AddToQueueRequest>,
) -> ApiResult<Json<AddToQueueResponse>> {
    let urls = parse_url_batch(&req.urls).map_err(|e| ApiError::validation(e.to_string()))?;

    let queue_length = state.sessions.add(req.session_id.as_deref(), &urls).await;
    let session_id = session_label(&req.session_id);

    info!(
        session_id = %session_id,
        added = urls.len(),
        queue_length,
        "Added clips to queue"
    );

    Ok(Json(AddToQueueResponse {
        session_id,
        queue_length,
        added: urls,
    }))
}

/// Empty a session's queue.
pub async fn clear_queue(
    State(state): State<AppState>,
    Json(req): Json<ClearQueueRequest>,
) -> ApiResult<Json<ClearQueueResponse>> {
    let cleared = state.sessions.clear(req.session_id.as_deref()).await;
    let session_id = session_label(&req.session_id);

    info!(session_id = %session_id, cleared, "Cleared queue");

    Ok(Json(ClearQueueResponse {
        session_id,
        cleared,
    }))
}

/// Current contents of a session's queue.
pub async fn get_queue(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> ApiResult<Json<QueueResponse>> {
    let urls = state.sessions.snapshot(query.session_id.as_deref()).await;
    let session_id = session_label(&query.session_id);

    Ok(Json(QueueResponse {
        session_id,
        count: urls.len(),
        urls,
    }))
}
