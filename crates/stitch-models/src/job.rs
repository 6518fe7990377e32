//! Merge job definitions and lifecycle state.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a merge job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job processing status.
///
/// Transitions are monotonic and one-directional:
/// `Queued -> Processing -> {Completed | Failed}`. A job never re-enters an
/// earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is registered and waiting for its runner to start
    #[default]
    Queued,
    /// Job is actively downloading and assembling clips
    Processing,
    /// Job completed successfully; output is ready for delivery
    Completed,
    /// Job failed with an error
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A merge job tracked by the registry.
///
/// The clip list is frozen at submission time; ordering is significant and
/// preserved exactly as submitted. Only the job's own runner mutates the
/// record after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Ordered clip URLs, frozen at submission
    pub clips: Vec<String>,

    /// Current lifecycle status
    #[serde(default)]
    pub status: JobStatus,

    /// Path of the assembled output (only when completed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Human-readable cause (only when failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Clips excluded during the best-effort download phase
    #[serde(default)]
    pub clips_skipped: u32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Started at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Completed at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new queued job with a frozen clip list.
    pub fn new(clips: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            clips,
            status: JobStatus::Queued,
            output_path: None,
            error_message: None,
            clips_skipped: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition to processing. Called by the runner before any fetch.
    pub fn start(&mut self) {
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Mark job as completed and record the output location.
    pub fn complete(&mut self, output_path: PathBuf, clips_skipped: u32) {
        self.status = JobStatus::Completed;
        self.output_path = Some(output_path);
        self.clips_skipped = clips_skipped;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Mark job as failed with a cause string.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(error.into());
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }
}
