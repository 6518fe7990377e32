//! Output download handler.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue};
use tokio::fs;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::registry::DownloadClaim;
use crate::state::AppState;

/// Deliver a completed job's output exactly once.
///
/// A successful claim removes the registry entry and, after the bytes are
/// read, the backing file; a second request for the same job sees 404.
/// Non-terminal jobs and failed jobs answer 409 without consuming anything.
pub async fn download_output(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<(HeaderMap, Body)> {
    let output = match state.jobs.claim_download(&job_id).await {
        DownloadClaim::Ready { output } => output,
        DownloadClaim::NotReady { status } => {
            return Err(ApiError::conflict(format!(
                "job {job_id} is {status}; output is not ready"
            )));
        }
        DownloadClaim::Failed { error } => {
            return Err(ApiError::conflict(format!(
                "job {job_id} failed: {}",
                error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        DownloadClaim::Unknown => {
            return Err(ApiError::not_found(format!("job {job_id} not found")));
        }
    };

    let bytes = fs::read(&output).await.map_err(|e| {
        ApiError::internal(format!("failed to read output for job {job_id}: {e}"))
    })?;

    if let Err(e) = fs::remove_file(&output).await {
        warn!(
            job_id = %job_id,
            output = %output.display(),
            error = %e,
            "Failed to remove delivered output"
        );
    }

    info!(job_id = %job_id, size = bytes.len(), "Delivered output");

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
    let disposition = format!("attachment; filename=\"merged_{job_id}.mp4\"");
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .map_err(|e| ApiError::internal(format!("invalid disposition header: {e}")))?,
    );

    Ok((headers, Body::from(bytes)))
}
