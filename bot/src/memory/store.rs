//! SQLite-backed document store for memory records. Writes and reads go
//! through a bounded retry schedule with a per-attempt timeout; callers above
//! this layer treat an exhausted schedule as "no memory", never as fatal.

use crate::error::StoreError;
use crate::memory::record::{Annotation, MemoryRecord};
use chrono::{DateTime, Utc};
use rand::RngExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

const RETRY_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(200);
const BACKOFF_JITTER_MS: u64 = 50;
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct MemoryStore {
    pool: SqlitePool,
}

impl MemoryStore {
    /// Connect and create tables. SQLite allows one writer, so the pool is
    /// capped at a single connection.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                content TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                channel_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                annotation TEXT NOT NULL,
                confidence REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_memories_user_id ON memories(user_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS patterns (
                name TEXT PRIMARY KEY,
                seen_count INTEGER NOT NULL DEFAULT 0,
                last_seen TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert(&self, record: &MemoryRecord) -> Result<(), StoreError> {
        let annotation_json =
            serde_json::to_string(&record.annotation).unwrap_or_else(|_| "{}".to_string());

        with_retry("insert memory", || async {
            sqlx::query(
                r#"
                INSERT INTO memories (id, kind, content, user_id, channel_id, created_at, annotation, confidence)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.id)
            .bind(&record.kind)
            .bind(&record.content)
            .bind(record.user_id)
            .bind(record.channel_id)
            .bind(record.created_at)
            .bind(&annotation_json)
            .bind(record.confidence)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    pub async fn recent_for_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<MemoryRecord>, StoreError> {
        let rows: Vec<(String, String, String, i64, i64, DateTime<Utc>, String, f64)> =
            with_retry("fetch recent memories", || async {
                sqlx::query_as(
                    r#"
                    SELECT id, kind, content, user_id, channel_id, created_at, annotation, confidence
                    FROM memories
                    WHERE user_id = ?
                    ORDER BY created_at DESC
                    LIMIT ?
                    "#,
                )
                .bind(user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            })
            .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, kind, content, user_id, channel_id, created_at, annotation, confidence)| {
                    MemoryRecord {
                        id,
                        kind,
                        content,
                        user_id,
                        channel_id,
                        created_at,
                        annotation: serde_json::from_str(&annotation)
                            .unwrap_or_else(|_| Annotation::default()),
                        confidence,
                    }
                },
            )
            .collect())
    }

    /// Bump a recognized pattern tag, inserting it on first sight.
    pub async fn record_pattern(&self, name: &str) -> Result<(), StoreError> {
        with_retry("record pattern", || async {
            sqlx::query(
                r#"
                INSERT INTO patterns (name, seen_count, last_seen)
                VALUES (?, 1, ?)
                ON CONFLICT(name) DO UPDATE SET
                    seen_count = seen_count + 1,
                    last_seen = excluded.last_seen
                "#,
            )
            .bind(name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    pub async fn top_patterns(&self, limit: i64) -> Result<Vec<(String, i64)>, StoreError> {
        with_retry("fetch top patterns", || async {
            sqlx::query_as(
                "SELECT name, seen_count FROM patterns ORDER BY seen_count DESC LIMIT ?",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        })
        .await
    }
}

/// Exponential backoff schedule, before jitter. `attempt` starts at 0.
fn backoff_delay(attempt: u32) -> Duration {
    BACKOFF_BASE * 2u32.saturating_pow(attempt)
}

async fn with_retry<T, F, Fut>(op: &'static str, mut run: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut last_err: StoreError = StoreError::Timeout(op);

    for attempt in 0..RETRY_ATTEMPTS {
        match tokio::time::timeout(ATTEMPT_TIMEOUT, run()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(op, attempt, error = %e, "store operation failed");
                last_err = e.into();
            }
            Err(_) => {
                tracing::warn!(op, attempt, "store operation timed out");
                last_err = StoreError::Timeout(op);
            }
        }

        if attempt + 1 < RETRY_ATTEMPTS {
            let jitter = Duration::from_millis(rand::rng().random_range(0..=BACKOFF_JITTER_MS));
            tokio::time::sleep(backoff_delay(attempt) + jitter).await;
        }
    }

    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::record::parse_annotation;

    async fn test_store() -> MemoryStore {
        MemoryStore::connect("sqlite::memory:").await.unwrap()
    }

    #[test]
    fn backoff_schedule_is_monotonic() {
        for attempt in 0..4 {
            assert!(backoff_delay(attempt) < backoff_delay(attempt + 1));
        }
        assert_eq!(backoff_delay(0), Duration::from_millis(200));
        assert_eq!(backoff_delay(2), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn insert_then_fetch_roundtrip() {
        let store = test_store().await;

        let (annotation, confidence) =
            parse_annotation(r#"{"mood": "wary", "intensity": 4, "patterns": ["maze"]}"#);
        let record =
            MemoryRecord::interaction(7, 99, "asked about hallways".into(), annotation, confidence);
        store.insert(&record).await.unwrap();

        let fetched = store.recent_for_user(7, 10).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, record.id);
        assert_eq!(fetched[0].annotation.mood, "wary");
        assert_eq!(fetched[0].confidence, 1.0);
    }

    #[tokio::test]
    async fn recent_is_ordered_newest_first_and_limited() {
        let store = test_store().await;

        for i in 0i64..5 {
            let mut record = MemoryRecord::interaction(
                1,
                1,
                format!("interaction {i}"),
                Annotation::default(),
                0.0,
            );
            record.created_at = Utc::now() - chrono::Duration::minutes(5 - i);
            store.insert(&record).await.unwrap();
        }

        let fetched = store.recent_for_user(1, 3).await.unwrap();
        assert_eq!(fetched.len(), 3);
        assert_eq!(fetched[0].content, "interaction 4");
    }

    #[tokio::test]
    async fn patterns_upsert_and_rank() {
        let store = test_store().await;

        store.record_pattern("maze").await.unwrap();
        store.record_pattern("maze").await.unwrap();
        store.record_pattern("hum").await.unwrap();

        let top = store.top_patterns(10).await.unwrap();
        assert_eq!(top[0], ("maze".to_string(), 2));
        assert_eq!(top[1], ("hum".to_string(), 1));
    }

    #[tokio::test]
    async fn unknown_user_yields_empty_not_error() {
        let store = test_store().await;
        assert!(store.recent_for_user(404, 5).await.unwrap().is_empty());
    }
}
