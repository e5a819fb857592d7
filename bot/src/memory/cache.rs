//! Per-user TTL index over recent memory record ids. Sits in front of the
//! document store so recent-memory lookups don't touch SQLite at all.

use retainer::Cache;
use std::sync::Arc;
use std::time::Duration;

const INDEX_TTL: Duration = Duration::from_secs(60 * 60);
const INDEX_CAP: usize = 32;

#[derive(Clone)]
pub struct MemoryCache {
    inner: Arc<Cache<i64, Vec<String>>>,
}

impl MemoryCache {
    /// Create the cache and spawn its eviction monitor.
    pub fn new() -> Self {
        let inner: Arc<Cache<i64, Vec<String>>> = Arc::new(Cache::new());

        let monitored = inner.clone();
        tokio::spawn(async move {
            monitored.monitor(4, 0.25, Duration::from_secs(30)).await;
        });

        Self { inner }
    }

    /// Append a record id to a user's index, most recent first. Re-inserting
    /// refreshes the TTL for the whole entry.
    pub async fn note(&self, user_id: i64, record_id: &str) {
        let mut ids = self
            .inner
            .get(&user_id)
            .await
            .map(|guard| guard.clone())
            .unwrap_or_default();

        ids.insert(0, record_id.to_string());
        ids.truncate(INDEX_CAP);

        self.inner.insert(user_id, ids, INDEX_TTL).await;
    }

    pub async fn recent_ids(&self, user_id: i64) -> Vec<String> {
        self.inner
            .get(&user_id)
            .await
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn note_then_recent_roundtrip_newest_first() {
        let cache = MemoryCache::new();

        cache.note(1, "first").await;
        cache.note(1, "second").await;

        let ids = cache.recent_ids(1).await;
        assert_eq!(ids, vec!["second".to_string(), "first".to_string()]);
    }

    #[tokio::test]
    async fn users_are_indexed_independently() {
        let cache = MemoryCache::new();

        cache.note(1, "mine").await;
        assert!(cache.recent_ids(2).await.is_empty());
    }

    #[tokio::test]
    async fn index_is_capped() {
        let cache = MemoryCache::new();

        for i in 0..(INDEX_CAP + 10) {
            cache.note(5, &format!("id-{i}")).await;
        }

        let ids = cache.recent_ids(5).await;
        assert_eq!(ids.len(), INDEX_CAP);
        assert_eq!(ids[0], format!("id-{}", INDEX_CAP + 9));
    }
}
