//! Post-interaction annotation pipeline. Runs detached from the reply path:
//! a failure here costs a memory record, never a chat response.

use crate::chat::{CHAT_MODEL, ChatClient, ChatMessage, prompt};
use crate::memory::cache::MemoryCache;
use crate::memory::record::{MemoryRecord, parse_annotation};
use crate::memory::store::MemoryStore;
use crate::text::truncate_with_limit;
use std::sync::Arc;

/// How much of an interaction is kept in the stored record.
const CONTENT_PREVIEW_LIMIT: usize = 500;
const CONTEXT_RECORDS: i64 = 3;

pub struct MemoryPipeline {
    chat: ChatClient,
    store: MemoryStore,
    cache: MemoryCache,
}

impl MemoryPipeline {
    pub fn new(chat: ChatClient, store: MemoryStore) -> Arc<Self> {
        Arc::new(Self {
            chat,
            store,
            cache: MemoryCache::new(),
        })
    }

    /// Fire-and-forget annotation of one finished interaction.
    pub fn spawn_annotation(
        self: &Arc<Self>,
        user_id: u64,
        channel_id: u64,
        question: String,
        reply: String,
    ) {
        let pipeline = self.clone();
        tokio::spawn(async move {
            if let Err(e) = pipeline
                .annotate(user_id as i64, channel_id as i64, &question, &reply)
                .await
            {
                tracing::warn!(error = %e, user_id, "memory annotation failed, record dropped");
            }
        });
    }

    async fn annotate(
        &self,
        user_id: i64,
        channel_id: i64,
        question: &str,
        reply: &str,
    ) -> Result<(), eyre::Error> {
        let exchange = format!("User: {question}\nBot: {reply}");
        let messages = vec![
            ChatMessage::system(prompt::ANNOTATION_PROMPT),
            ChatMessage::user(exchange),
        ];

        let response = self.chat.complete(CHAT_MODEL, &messages, None).await?;
        let raw = response.content.unwrap_or_default();
        let (annotation, confidence) = parse_annotation(&raw);

        let record = MemoryRecord::interaction(
            user_id,
            channel_id,
            truncate_with_limit(question, CONTENT_PREVIEW_LIMIT),
            annotation,
            confidence,
        );

        self.store.insert(&record).await?;
        self.cache.note(user_id, &record.id).await;

        for pattern in &record.annotation.patterns {
            if let Err(e) = self.store.record_pattern(pattern).await {
                tracing::debug!(error = %e, pattern, "pattern upsert failed");
            }
        }

        tracing::debug!(
            record_id = %record.id,
            mood = %record.annotation.mood,
            confidence = record.confidence,
            "stored interaction memory"
        );
        Ok(())
    }

    /// Distill a user's recent memories into one compact system line for the
    /// next chat call. Cache index and store rows are fetched concurrently;
    /// a store failure degrades to whatever the cache knew.
    pub async fn context_for(&self, user_id: u64) -> Option<String> {
        let user_id = user_id as i64;

        let (cached_ids, recent, top_patterns) = tokio::join!(
            self.cache.recent_ids(user_id),
            self.store.recent_for_user(user_id, CONTEXT_RECORDS),
            self.store.top_patterns(CONTEXT_RECORDS),
        );

        let recent = recent
            .inspect_err(|e| {
                tracing::debug!(error = %e, user_id, "memory store read failed, using cache only");
            })
            .unwrap_or_default();
        let top_patterns = top_patterns.unwrap_or_default();

        if recent.is_empty() && cached_ids.is_empty() {
            return None;
        }

        let mut line = String::from("Archived impressions of this user (internal, do not quote):");
        for record in &recent {
            line.push_str(&format!(
                " [{} mood={} intensity={} tags={}]",
                record.created_at.format("%m-%d"),
                record.annotation.mood,
                record.annotation.intensity,
                record.annotation.patterns.join(",")
            ));
        }
        if recent.is_empty() {
            line.push_str(&format!(" {} recent interactions on file.", cached_ids.len()));
        }
        if !top_patterns.is_empty() {
            let tags: Vec<&str> = top_patterns.iter().map(|(tag, _)| tag.as_str()).collect();
            line.push_str(&format!(" Recurring tags across the archive: {}.", tags.join(", ")));
        }

        Some(line)
    }
}
