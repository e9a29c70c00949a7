// Result Store
// Finished document results waiting to be collected by id

use hyperion_engine::DocumentResult;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// How long an uncollected result is kept
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Concurrent id to result map; reading a result removes it.
///
/// Results nobody collects expire after the store's time to live. Expired
/// entries are swept whenever a new result is inserted.
#[derive(Debug, Clone)]
pub struct ResultStore {
    results: Arc<Mutex<HashMap<String, (DocumentResult, Instant)>>>,
    ttl: Duration,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_RESULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            results: Arc::default(),
            ttl,
        }
    }

    /// Store the result for `id`, replacing an earlier one
    pub async fn insert(&self, id: impl Into<String>, result: DocumentResult) {
        let now = Instant::now();
        let mut results = self.results.lock().await;
        let before = results.len();
        results.retain(|_, (_, stored)| now.duration_since(*stored) < self.ttl);
        if results.len() < before {
            tracing::debug!("dropped {} expired result(s)", before - results.len());
        }
        results.insert(id.into(), (result, now));
    }

    /// Remove and return the result for `id` unless it has expired
    pub async fn take(&self, id: &str) -> Option<DocumentResult> {
        let (result, stored) = self.results.lock().await.remove(id)?;
        (stored.elapsed() < self.ttl).then_some(result)
    }

    pub async fn len(&self) -> usize {
        self.results.lock().await.len()
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_take_consumes() {
        let store = ResultStore::new();
        store.insert("a", DocumentResult::failed()).await;
        assert_eq!(store.len().await, 1);

        let result = store.take("a").await.unwrap();
        assert!(!result.success);
        assert!(store.take("a").await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_one_entry_per_id() {
        let store = ResultStore::new();
        store.insert("a", DocumentResult::failed()).await;
        store.insert("a", DocumentResult::failed()).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_uncollected_results_expire() {
        let store = ResultStore::with_ttl(Duration::from_millis(50));
        store.insert("old", DocumentResult::failed()).await;
        store.insert("stale", DocumentResult::failed()).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(store.take("stale").await.is_none());

        store.insert("new", DocumentResult::failed()).await;
        assert_eq!(store.len().await, 1);
        assert!(store.take("new").await.is_some());
    }
}
