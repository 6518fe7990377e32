//! Shared data models for the ClipStitch backend.
//!
//! Everything that crosses a crate boundary lives here: job identifiers,
//! job lifecycle state, and URL batch parsing.

pub mod job;
pub mod links;

pub use job::{Job, JobId, JobStatus};
pub use links::{parse_url_batch, UrlBatchError};
