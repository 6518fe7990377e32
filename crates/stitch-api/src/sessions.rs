//! Session-scoped clip queues.
//!
//! Queues live in memory only; nothing survives the process. A single
//! coarse lock serializes every mutation, which keeps `take` atomic:
//! no concurrent add can be lost or handed to two merge jobs.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

/// Queue key used when the client does not supply a session id.
pub const DEFAULT_SESSION: &str = "default";

/// In-memory map of session id to pending clip URLs.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    queues: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

fn key(session: Option<&str>) -> &str {
    match session {
        Some(s) if !s.trim().is_empty() => s,
        _ => DEFAULT_SESSION,
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append URLs to a session's queue; returns the new queue length.
    pub async fn add(&self, session: Option<&str>, urls: &[String]) -> usize {
        let mut queues = self.queues.lock().await;
        let queue = queues.entry(key(session).to_string()).or_default();
        queue.extend(urls.iter().cloned());
        queue.len()
    }

    /// Empty a session's queue; returns how many entries were dropped.
    pub async fn clear(&self, session: Option<&str>) -> usize {
        let mut queues = self.queues.lock().await;
        queues.remove(key(session)).map(|q| q.len()).unwrap_or(0)
    }

    /// Current contents of a session's queue, in submission order.
    pub async fn snapshot(&self, session: Option<&str>) -> Vec<String> {
        let queues = self.queues.lock().await;
        queues.get(key(session)).cloned().unwrap_or_default()
    }

    /// Atomically remove and return a session's queue.
    ///
    /// The snapshot-and-clear happens under one lock hold, so a URL added
    /// concurrently lands either in the returned batch or in the queue for
    /// the next merge, never both and never neither.
    pub async fn take(&self, session: Option<&str>) -> Vec<String> {
        let mut queues = self.queues.lock().await;
        queues.remove(key(session)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_add_and_snapshot_preserve_order() {
        let store = SessionStore::new();
        let n = store.add(Some("s1"), &urls(&["http://a/1", "http://a/2"])).await;
        assert_eq!(n, 2);
        let n = store.add(Some("s1"), &urls(&["http://a/3"])).await;
        assert_eq!(n, 3);

        let queue = store.snapshot(Some("s1")).await;
        assert_eq!(queue, urls(&["http://a/1", "http://a/2", "http://a/3"]));
    }

    #[tokio::test]
    async fn test_missing_session_maps_to_default() {
        let store = SessionStore::new();
        store.add(None, &urls(&["http://a/1"])).await;
        store.add(Some(""), &urls(&["http://a/2"])).await;
        store.add(Some("  "), &urls(&["http://a/3"])).await;

        let queue = store.snapshot(Some(DEFAULT_SESSION)).await;
        assert_eq!(queue.len(), 3);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        store.add(Some("a"), &urls(&["http://a/1"])).await;
        store.add(Some("b"), &urls(&["http://b/1", "http://b/2"])).await;

        assert_eq!(store.snapshot(Some("a")).await.len(), 1);
        assert_eq!(store.snapshot(Some("b")).await.len(), 2);
    }

    #[tokio::test]
    async fn test_take_empties_the_queue() {
        let store = SessionStore::new();
        store.add(Some("s"), &urls(&["http://a/1", "http://a/2"])).await;

        let taken = store.take(Some("s")).await;
        assert_eq!(taken.len(), 2);
        assert!(store.snapshot(Some("s")).await.is_empty());
        assert!(store.take(Some("s")).await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_reports_dropped_count() {
        let store = SessionStore::new();
        store.add(Some("s"), &urls(&["http://a/1", "http://a/2"])).await;

        assert_eq!(store.clear(Some("s")).await, 2);
        assert_eq!(store.clear(Some("s")).await, 0);
    }
}
