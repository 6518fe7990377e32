//! In-memory job registry and the spawned merge runner.
//!
//! The registry is created once at process start and injected through
//! `AppState`; handlers and runner tasks share it by cloning the handle.
//! Entries live until the output is claimed by a download or the process
//! exits; there is no persistence layer behind it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info};

use stitch_media::{merge_clips, Fetcher};
use stitch_models::{Job, JobStatus};

/// Outcome of an atomic download claim.
#[derive(Debug)]
pub enum DownloadClaim {
    /// Job completed; the entry has been removed and the file is the
    /// caller's to serve and delete.
    Ready { output: PathBuf },
    /// Job exists but has not reached a terminal state.
    NotReady { status: JobStatus },
    /// Job failed; the entry stays so the cause remains pollable.
    Failed { error: Option<String> },
    /// No such job.
    Unknown,
}

/// Concurrency-safe map of job id to job record.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job; the entry is visible to status polls immediately.
    pub async fn insert(&self, job: Job) {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.id.as_str().to_string(), job);
    }

    /// Snapshot of a job's current record.
    pub async fn status_of(&self, job_id: &str) -> Option<Job> {
        let jobs = self.jobs.read().await;
        jobs.get(job_id).cloned()
    }

    /// Transition a job to processing.
    pub async fn mark_processing(&self, job_id: &str) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            job.start();
        }
    }

    /// Record a successful merge.
    pub async fn complete(&self, job_id: &str, output: PathBuf, clips_skipped: u32) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            job.complete(output, clips_skipped);
        }
    }

    /// Record a failed merge with its cause.
    pub async fn fail(&self, job_id: &str, error: impl Into<String>) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            job.fail(error);
        }
    }

    /// Atomically claim a completed job's output for download.
    ///
    /// A completed entry is removed under the write lock, so exactly one
    /// caller ever receives `Ready` for a given job. Failed entries are
    /// left in place; their cause stays pollable.
    pub async fn claim_download(&self, job_id: &str) -> DownloadClaim {
        let mut jobs = self.jobs.write().await;

        let status = match jobs.get(job_id) {
            Some(job) => job.status,
            None => return DownloadClaim::Unknown,
        };

        match status {
            JobStatus::Completed => {
                // An output path must exist before the entry is consumed;
                // an inconsistent record stays in place and pollable.
                if jobs.get(job_id).and_then(|j| j.output_path.as_ref()).is_none() {
                    return DownloadClaim::Failed {
                        error: Some("completed job has no output recorded".to_string()),
                    };
                }
                // Entry removal and the Ready verdict happen under one
                // lock hold; a racing second claim sees Unknown.
                match jobs.remove(job_id).and_then(|job| job.output_path) {
                    Some(output) => DownloadClaim::Ready { output },
                    None => DownloadClaim::Unknown,
                }
            }
            JobStatus::Failed => {
                let error = jobs.get(job_id).and_then(|j| j.error_message.clone());
                DownloadClaim::Failed { error }
            }
            status => DownloadClaim::NotReady { status },
        }
    }

    /// Number of tracked jobs.
    pub async fn len(&self) -> usize {
        let jobs = self.jobs.read().await;
        jobs.len()
    }
}

/// Drive one merge job to a terminal state.
///
/// Runs under `tokio::spawn`; every exit path records exactly one
/// terminal transition. There are no retries; failure is surfaced
/// through the status endpoint only.
pub async fn run_job(
    registry: JobRegistry,
    fetcher: Fetcher,
    job_id: String,
    clips: Vec<String>,
    work_dir: PathBuf,
    output_path: PathBuf,
) {
    registry.mark_processing(&job_id).await;

    match merge_clips(&job_id, &clips, &fetcher, &work_dir, &output_path).await {
        Ok(outcome) => {
            info!(
                job_id = %job_id,
                clips_merged = outcome.clips_merged,
                clips_skipped = outcome.clips_skipped,
                frames = outcome.frames_written,
                "Job completed"
            );
            registry
                .complete(&job_id, outcome.output, outcome.clips_skipped)
                .await;
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Job failed");
            registry.fail(&job_id, e.to_string()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queued_job() -> Job {
        Job::new(vec!["http://example.com/a.mp4".to_string()])
    }

    #[tokio::test]
    async fn test_insert_is_immediately_visible() {
        let registry = JobRegistry::new();
        let job = queued_job();
        let id = job.id.as_str().to_string();

        registry.insert(job).await;

        let found = registry.status_of(&id).await.unwrap();
        assert_eq!(found.status, JobStatus::Queued);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_status_polling_does_not_mutate() {
        let registry = JobRegistry::new();
        let job = queued_job();
        let id = job.id.as_str().to_string();
        registry.insert(job).await;

        for _ in 0..3 {
            let found = registry.status_of(&id).await.unwrap();
            assert_eq!(found.status, JobStatus::Queued);
        }
    }

    #[tokio::test]
    async fn test_claim_download_is_at_most_once() {
        let registry = JobRegistry::new();
        let job = queued_job();
        let id = job.id.as_str().to_string();
        registry.insert(job).await;
        registry.mark_processing(&id).await;
        registry.complete(&id, PathBuf::from("/tmp/out.mp4"), 0).await;

        match registry.claim_download(&id).await {
            DownloadClaim::Ready { output } => {
                assert_eq!(output, PathBuf::from("/tmp/out.mp4"));
            }
            other => panic!("expected Ready, got {other:?}"),
        }

        assert!(matches!(
            registry.claim_download(&id).await,
            DownloadClaim::Unknown
        ));
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_claim_download_before_terminal_is_not_ready() {
        let registry = JobRegistry::new();
        let job = queued_job();
        let id = job.id.as_str().to_string();
        registry.insert(job).await;
        registry.mark_processing(&id).await;

        assert!(matches!(
            registry.claim_download(&id).await,
            DownloadClaim::NotReady {
                status: JobStatus::Processing
            }
        ));
        // The entry survives a refused claim.
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_claim_download_of_failed_job_keeps_entry() {
        let registry = JobRegistry::new();
        let job = queued_job();
        let id = job.id.as_str().to_string();
        registry.insert(job).await;
        registry.fail(&id, "first clip download failed").await;

        match registry.claim_download(&id).await {
            DownloadClaim::Failed { error } => {
                assert_eq!(error.as_deref(), Some("first clip download failed"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(registry.status_of(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_claim_download_completed_without_output_keeps_entry() {
        let registry = JobRegistry::new();
        let mut job = queued_job();
        let id = job.id.as_str().to_string();
        // Force an inconsistent record: terminal success with no output.
        job.status = JobStatus::Completed;
        registry.insert(job).await;

        for _ in 0..2 {
            match registry.claim_download(&id).await {
                DownloadClaim::Failed { error } => {
                    assert!(error.unwrap().contains("no output recorded"));
                }
                other => panic!("expected Failed, got {other:?}"),
            }
        }
        // The record was never consumed.
        assert!(registry.status_of(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_claim_download_unknown_job() {
        let registry = JobRegistry::new();
        assert!(matches!(
            registry.claim_download("no-such-job").await,
            DownloadClaim::Unknown
        ));
    }
}
