//! Clip URL batch parsing and validation.
//!
//! Queue submissions accept several links at once, separated by commas,
//! whitespace, or newlines. Every entry must be a well-formed http(s) URL;
//! a single malformed entry rejects the whole batch so the caller never
//! ends up with a silently truncated queue.

use thiserror::Error;
use url::Url;

/// Errors produced while parsing a URL batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlBatchError {
    #[error("no URLs provided")]
    Empty,

    #[error("malformed URL: {0}")]
    Malformed(String),

    #[error("unsupported URL scheme '{scheme}' in {url}")]
    UnsupportedScheme { scheme: String, url: String },
}

/// Split a delimiter-separated batch into normalized clip URLs.
///
/// Accepted delimiters: commas, any whitespace, newlines. Entries are
/// validated with the `url` crate and re-serialized in normalized form.
/// Ordering is preserved.
pub fn parse_url_batch(raw: &str) -> Result<Vec<String>, UrlBatchError> {
    let mut urls = Vec::new();

    for token in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let parsed =
            Url::parse(token).map_err(|_| UrlBatchError::Malformed(token.to_string()))?;

        match parsed.scheme() {
            "http" | "https" => urls.push(parsed.to_string()),
            other => {
                return Err(UrlBatchError::UnsupportedScheme {
                    scheme: other.to_string(),
                    url: token.to_string(),
                })
            }
        }
    }

    if urls.is_empty() {
        return Err(UrlBatchError::Empty);
    }

    Ok(urls)
}
