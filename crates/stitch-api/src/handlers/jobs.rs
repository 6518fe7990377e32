//! Job status polling handler.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: String,
    pub clips_requested: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clips_skipped: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report a job's current lifecycle state. Read-only; polling never
/// mutates the registry.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job = state
        .jobs
        .status_of(&job_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("job {job_id} not found")))?;

    Ok(Json(JobStatusResponse {
        job_id,
        status: job.status.as_str().to_string(),
        clips_requested: job.clips.len(),
        clips_skipped: (job.clips_skipped > 0).then_some(job.clips_skipped),
        error: job.error_message,
    }))
}
