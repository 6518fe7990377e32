//! Axum HTTP API server.
//!
//! This crate provides:
//! - Session-scoped clip queues and batch URL submission
//! - Asynchronous merge job submission with status polling
//! - At-most-once download of assembled outputs
//! - Health probes

pub mod config;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod routes;
pub mod sessions;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use registry::{DownloadClaim, JobRegistry};
pub use routes::create_router;
pub use sessions::SessionStore;
pub use state::AppState;
