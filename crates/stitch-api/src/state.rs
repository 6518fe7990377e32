//! Application state.

use std::path::PathBuf;

use stitch_media::Fetcher;

use crate::config::ApiConfig;
use crate::registry::JobRegistry;
use crate::sessions::SessionStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub jobs: JobRegistry,
    pub sessions: SessionStore,
    pub fetcher: Fetcher,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(&config.work_dir)?;
        std::fs::create_dir_all(&config.output_dir)?;
        let fetcher = Fetcher::new(config.fetch_timeout)?;

        Ok(Self {
            config,
            jobs: JobRegistry::new(),
            sessions: SessionStore::new(),
            fetcher,
        })
    }

    /// Deterministic output location for a job's assembled video.
    pub fn output_path_for(&self, job_id: &str) -> PathBuf {
        self.config.output_dir.join(format!("merged_{job_id}.mp4"))
    }
}
