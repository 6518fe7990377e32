//! Merge submission handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use stitch_models::Job;

use crate::error::{ApiError, ApiResult};
use crate::registry::run_job;
use crate::state::AppState;

/// Merge request.
#[derive(Deserialize)]
pub struct MergeRequest {
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct MergeResponse {
    pub job_id: String,
    pub clips_requested: usize,
}

/// Submit the session's queued clips as one merge job.
///
/// The queue is snapshotted and cleared atomically; the registry entry is
/// visible to status polls before the runner task is spawned. An empty
/// queue is a synchronous validation error and creates nothing.
pub async fn submit_merge(
    State(state): State<AppState>,
    Json(req): Json<MergeRequest>,
) -> ApiResult<(StatusCode, Json<MergeResponse>)> {
    let clips = state.sessions.take(req.session_id.as_deref()).await;
    if clips.is_empty() {
        return Err(ApiError::validation("queue is empty; add clips before merging"));
    }

    let job = Job::new(clips.clone());
    let job_id = job.id.as_str().to_string();
    let output_path = state.output_path_for(&job_id);

    state.jobs.insert(job).await;

    info!(job_id = %job_id, clips = clips.len(), "Merge job submitted");

    tokio::spawn(run_job(
        state.jobs.clone(),
        state.fetcher.clone(),
        job_id.clone(),
        clips.clone(),
        state.config.work_dir.clone(),
        output_path,
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(MergeResponse {
            job_id,
            clips_requested: clips.len(),
        }),
    ))
}
