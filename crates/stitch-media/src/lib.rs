//! Clip fetch, probe, and frame-accurate merge pipeline.
//!
//! This crate provides:
//! - Streaming HTTP clip downloads with partial-file cleanup
//! - FFprobe geometry extraction with a documented frame-rate fallback
//! - A pure frame compositor (resize normalization + crossfade blending)
//! - Rawvideo decode/encode seams over FFmpeg pipes
//! - The merge engine orchestrating the above into one output file

pub mod decode;
pub mod encode;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod frame;
pub mod probe;

pub use engine::{merge_clips, MergeOutcome};
pub use error::{MediaError, MediaResult};
pub use fetch::Fetcher;
pub use frame::{crossfade, normalize, Frame};
pub use probe::{probe_geometry, OutputGeometry};
