//! Image analysis as a tool: a nested vision chat completion over an image
//! URL. No tools are offered inside the nested call, so the two-round
//! orchestration cap holds.

use super::ToolContext;
use crate::chat::{
    ChatMessage, ContentPart, FunctionSpec, ImageUrl, ToolSpec, VISION_MODEL, prompt,
};
use serde::Deserialize;
use serde_json::{Value, json};

pub const NAME: &str = "analyze_image";

#[derive(Debug, Deserialize)]
pub struct AnalyzeImageArgs {
    pub image_url: String,
    #[serde(default)]
    pub question: Option<String>,
}

pub fn definition() -> ToolSpec {
    ToolSpec {
        kind: "function",
        function: FunctionSpec {
            name: NAME,
            description: "Analyze an image at a URL and describe what it shows, optionally \
                answering a question about it."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "image_url": {
                        "type": "string",
                        "description": "URL of the image to analyze"
                    },
                    "question": {
                        "type": "string",
                        "description": "Optional question about the image"
                    }
                },
                "required": ["image_url"]
            }),
        },
    }
}

pub async fn call(ctx: &ToolContext, args: Value) -> Result<Value, eyre::Error> {
    let args: AnalyzeImageArgs = serde_json::from_value(args)
        .map_err(|e| eyre::eyre!("invalid analyze_image arguments: {e}"))?;

    let analysis = analyze(ctx, &args.image_url, args.question.as_deref()).await?;
    Ok(json!({ "image_url": args.image_url, "analysis": analysis }))
}

/// Run the vision completion. Shared with the `/analyze` command path.
pub async fn analyze(
    ctx: &ToolContext,
    image_url: &str,
    question: Option<&str>,
) -> Result<String, eyre::Error> {
    url::Url::parse(image_url).map_err(|_| eyre::eyre!("`{image_url}` is not a valid URL"))?;

    if ctx.limiters.llm.check().is_err() {
        eyre::bail!("image analysis is rate limited right now, try again later");
    }

    let messages = vec![
        ChatMessage::system(prompt::VISION_PROMPT),
        ChatMessage::user_parts(vec![
            ContentPart::Text {
                text: question.unwrap_or("What is in this image?").to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image_url.to_string(),
                },
            },
        ]),
    ];

    let response = ctx.chat.complete(VISION_MODEL, &messages, None).await?;
    response
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| eyre::eyre!("vision model returned an empty analysis"))
}
