//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during clip fetching and assembly.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("fetch failed for {url}: {message}")]
    FetchFailed { url: String, message: String },

    #[error("probe failed for {path}: {message}")]
    ProbeFailed { path: PathBuf, message: String },

    #[error("no clips in queue")]
    EmptyQueue,

    #[error("none of the requested clips could be downloaded")]
    NoDownloadableClips,

    #[error("merge failed: {message}")]
    MergeFailed {
        message: String,
        #[source]
        source: Option<Box<MediaError>>,
    },

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("frame geometry mismatch: got {got_width}x{got_height}, expected {want_width}x{want_height}")]
    FrameGeometry {
        got_width: u32,
        got_height: u32,
        want_width: u32,
        want_height: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a fetch failure error.
    pub fn fetch_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a probe failure error.
    pub fn probe_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ProbeFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
        }
    }

    /// Wrap an underlying error as a merge failure.
    pub fn merge_failed(message: impl Into<String>, source: MediaError) -> Self {
        Self::MergeFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
