//! Host-provided tools the model may call, and the dispatcher that maps a
//! requested tool name to exactly one handler. Handler failures never
//! propagate: every failure becomes a structured `{"error": true, "message"}`
//! result so the model can react in character.

pub mod discord_info;
pub mod gif_search;
pub mod image_analysis;
pub mod tweet_search;
pub mod web_search;

use crate::chat::{ChatClient, ToolSpec};
use crate::ratelimit::ApiLimiters;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

pub const TOOL_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared dependencies handed to every tool call.
pub struct ToolContext {
    /// Discord REST client, independent of the gateway connection.
    pub discord_http: Arc<serenity::http::Http>,
    pub http: reqwest::Client,
    pub chat: ChatClient,
    pub tenor_api_key: Option<String>,
    pub twitter_bearer_token: Option<String>,
    pub limiters: ApiLimiters,
}

impl ToolContext {
    pub fn new(
        discord_http: Arc<serenity::http::Http>,
        chat: ChatClient,
        tenor_api_key: Option<String>,
        twitter_bearer_token: Option<String>,
    ) -> Result<Self, eyre::Error> {
        let http = reqwest::Client::builder()
            .timeout(TOOL_HTTP_TIMEOUT)
            .build()?;

        Ok(Self {
            discord_http,
            http,
            chat,
            tenor_api_key,
            twitter_bearer_token,
            limiters: ApiLimiters::new(),
        })
    }
}

/// Every tool offered to the model, in declaration order.
pub fn definitions() -> Vec<ToolSpec> {
    vec![
        web_search::definition(),
        gif_search::definition(),
        tweet_search::definition(),
        discord_info::user_definition(),
        discord_info::channel_definition(),
        image_analysis::definition(),
    ]
}

pub fn error_result(message: impl Into<String>) -> Value {
    json!({ "error": true, "message": message.into() })
}

/// Route one model-requested call to its handler. `raw_args` is the argument
/// string exactly as the model produced it; malformed JSON degrades to `{}`.
pub async fn dispatch(ctx: &ToolContext, name: &str, raw_args: &str) -> Value {
    let args: Value = serde_json::from_str(raw_args).unwrap_or_else(|e| {
        tracing::warn!(tool = name, error = %e, "model produced malformed tool arguments");
        json!({})
    });

    let result = match name {
        web_search::NAME => web_search::call(ctx, args).await,
        gif_search::NAME => gif_search::call(ctx, args).await,
        tweet_search::NAME => tweet_search::call(ctx, args).await,
        discord_info::USER_NAME => discord_info::user_call(ctx, args).await,
        discord_info::CHANNEL_NAME => discord_info::channel_call(ctx, args).await,
        image_analysis::NAME => image_analysis::call(ctx, args).await,
        _ => {
            tracing::warn!(tool = name, "model requested unknown tool");
            return error_result(format!("unknown tool: {name}"));
        }
    };

    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(tool = name, error = %e, "tool call failed");
            error_result(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::DEFAULT_API_BASE;

    fn test_context() -> ToolContext {
        ToolContext::new(
            Arc::new(serenity::http::Http::new("")),
            ChatClient::new("test-key".into(), DEFAULT_API_BASE.into()).unwrap(),
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn every_declared_tool_has_a_unique_name() {
        let defs = definitions();
        assert_eq!(defs.len(), 6);

        let mut names: Vec<_> = defs.iter().map(|d| d.function.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 6, "duplicate tool names in definitions()");
    }

    #[tokio::test]
    async fn unknown_tool_name_returns_structured_error() {
        let ctx = test_context();
        let out = dispatch(&ctx, "summon_demon", "{}").await;
        assert_eq!(out["error"], true);
        assert!(out["message"].as_str().unwrap().contains("summon_demon"));
    }

    #[tokio::test]
    async fn missing_backing_key_returns_structured_error() {
        let ctx = test_context();
        let out = dispatch(&ctx, gif_search::NAME, r#"{"query":"cats"}"#).await;
        assert_eq!(out["error"], true);
    }

    #[tokio::test]
    async fn malformed_arguments_degrade_to_structured_error() {
        let ctx = test_context();
        // gif_search requires a query; `{}` fails argument deserialization
        let out = dispatch(&ctx, gif_search::NAME, "not json at all").await;
        assert_eq!(out["error"], true);
    }
}
