//! The tool-calling orchestration loop: a fixed two-round exchange. Round
//! one offers the tool list; if the model requests calls they all execute
//! (independently, in parallel) and their results feed exactly one follow-up
//! completion with no tools offered. There is no planning and no third round.

use crate::chat::{CHAT_MODEL, ChatClient, ChatMessage, prompt};
use crate::text::{sanitize_response, truncate_for_discord};
use crate::tools::{self, ToolContext};
use std::sync::Arc;

pub const APOLOGY: &str =
    "BURT stares at the wall for a moment. something went wrong in there. try again?";

pub struct Orchestrator {
    client: ChatClient,
    tools: Arc<ToolContext>,
}

impl Orchestrator {
    pub fn new(client: ChatClient, tools: Arc<ToolContext>) -> Self {
        Self { client, tools }
    }

    /// Answer one user turn. `memory_context` is an optional line distilled
    /// from the memory pipeline, prepended as a second system message.
    pub async fn respond(
        &self,
        user_content: String,
        memory_context: Option<String>,
    ) -> Result<String, eyre::Error> {
        if self.tools.limiters.llm.check().is_err() {
            eyre::bail!("LLM backend quota exhausted");
        }

        let mut messages = vec![ChatMessage::system(prompt::SYSTEM_PROMPT)];
        if let Some(context) = memory_context {
            messages.push(ChatMessage::system(context));
        }
        messages.push(ChatMessage::user(user_content));

        let specs = tools::definitions();
        let first = self.client.complete(CHAT_MODEL, &messages, Some(&specs)).await?;

        let final_content = match first.tool_calls.filter(|c| !c.is_empty()) {
            Some(calls) => {
                tracing::debug!(count = calls.len(), "model requested tool calls");

                let results = futures::future::join_all(calls.iter().map(|call| {
                    tools::dispatch(&self.tools, &call.function.name, &call.function.arguments)
                }))
                .await;

                messages.push(ChatMessage::assistant_tool_calls(
                    first.content,
                    calls.clone(),
                ));
                for (call, result) in calls.iter().zip(results) {
                    messages.push(ChatMessage::tool_result(
                        call.id.clone(),
                        result.to_string(),
                    ));
                }

                // Follow-up round: no tools offered, so a model that asks
                // again gets nothing and must answer in text.
                let second = self.client.complete(CHAT_MODEL, &messages, None).await?;
                if second.tool_calls.as_ref().is_some_and(|c| !c.is_empty()) {
                    tracing::warn!("model requested tools in the follow-up round, ignoring");
                }
                second.content
            }
            None => first.content,
        };

        let content = final_content
            .map(|c| sanitize_response(&c))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| APOLOGY.to_string());

        Ok(truncate_for_discord(&content))
    }

    /// Vision path used by `/analyze` and `!analyze`.
    pub async fn analyze_image(
        &self,
        image_url: &str,
        question: Option<&str>,
    ) -> Result<String, eyre::Error> {
        let analysis =
            crate::tools::image_analysis::analyze(&self.tools, image_url, question).await?;
        Ok(truncate_for_discord(&sanitize_response(&analysis)))
    }
}
