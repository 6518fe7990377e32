//! Streaming clip downloads.
//!
//! Clips are fetched over plain HTTP(S) and streamed to disk in bounded
//! chunks so arbitrarily large sources never sit in memory. A fixed
//! browser-style User-Agent identifies the service; several clip hosts
//! reject default library agents outright.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// User-Agent sent with every clip request.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default per-request timeout when none is configured.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP clip fetcher with timeout and identification headers.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Build a fetcher with the given per-request timeout.
    pub fn new(timeout: Duration) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(15))
            .timeout(timeout)
            .build()
            .map_err(|e| MediaError::fetch_failed("<client>", e.to_string()))?;

        Ok(Self { client })
    }

    /// Download `url` to `dest`, streaming the body to disk.
    ///
    /// On success exactly one complete file exists at `dest`. On any
    /// failure (non-2xx, timeout, transport or write error) the partial
    /// file is removed before the error is returned, so callers never
    /// see a truncated clip.
    pub async fn fetch(&self, url: &str, dest: impl AsRef<Path>) -> MediaResult<()> {
        let dest = dest.as_ref();

        debug!(url = %url, dest = %dest.display(), "Downloading clip");

        match self.fetch_inner(url, dest).await {
            Ok(bytes) => {
                info!(
                    url = %url,
                    size_mb = bytes as f64 / (1024.0 * 1024.0),
                    "Downloaded clip"
                );
                Ok(())
            }
            Err(e) => {
                if dest.exists() {
                    if let Err(rm) = fs::remove_file(dest).await {
                        warn!(
                            dest = %dest.display(),
                            error = %rm,
                            "Failed to remove partial download"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    async fn fetch_inner(&self, url: &str, dest: &Path) -> MediaResult<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::fetch_failed(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::fetch_failed(
                url,
                format!("unexpected status {}", status),
            ));
        }

        let mut file = fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| MediaError::fetch_failed(url, e.to_string()))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        Ok(written)
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        // The builder only fails on TLS backend misconfiguration, which is
        // a compile-time property of the dependency tree.
        Self::new(DEFAULT_FETCH_TIMEOUT).expect("reqwest client with static config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_writes_complete_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xABu8; 4096]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("clip.mp4");
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();

        fetcher
            .fetch(&format!("{}/clip.mp4", server.uri()), &dest)
            .await
            .unwrap();

        let data = std::fs::read(&dest).unwrap();
        assert_eq!(data.len(), 4096);
        assert!(data.iter().all(|&b| b == 0xAB));
    }

    #[tokio::test]
    async fn test_fetch_non_2xx_fails_without_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("missing.mp4");
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();

        let err = fetcher
            .fetch(&format!("{}/missing.mp4", server.uri()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::FetchFailed { .. }));
        assert!(!dest.exists(), "no partial file may remain after failure");
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_fails() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("clip.mp4");
        let fetcher = Fetcher::new(Duration::from_secs(2)).unwrap();

        // Reserved TEST-NET-1 address; nothing listens there.
        let err = fetcher
            .fetch("http://192.0.2.1:9/clip.mp4", &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::FetchFailed { .. }));
        assert!(!dest.exists());
    }
}
