//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Directory per-job scratch files are created under
    pub work_dir: PathBuf,
    /// Directory assembled outputs are written to
    pub output_dir: PathBuf,
    /// Per-request clip download timeout
    pub fetch_timeout: Duration,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            work_dir: std::env::temp_dir().join("clipstitch-work"),
            output_dir: std::env::temp_dir().join("clipstitch"),
            fetch_timeout: Duration::from_secs(120),
            cors_origins: vec!["*".to_string()],
            max_body_size: 1024 * 1024, // 1MB; requests carry URLs, not media
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            fetch_timeout: Duration::from_secs(
                std::env::var("FETCH_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
