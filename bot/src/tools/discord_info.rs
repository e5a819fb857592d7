//! Discord introspection tools: user and channel lookups over the REST API.

use super::ToolContext;
use crate::chat::{FunctionSpec, ToolSpec};
use serde::Deserialize;
use serde_json::{Value, json};
use serenity::all::{Channel, ChannelId, UserId};

pub const USER_NAME: &str = "user_info";
pub const CHANNEL_NAME: &str = "channel_info";

#[derive(Debug, Deserialize)]
pub struct UserInfoArgs {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelInfoArgs {
    pub channel_id: String,
}

pub fn user_definition() -> ToolSpec {
    ToolSpec {
        kind: "function",
        function: FunctionSpec {
            name: USER_NAME,
            description: "Look up a Discord user by id: display name, bot flag, account age."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "user_id": {
                        "type": "string",
                        "description": "Discord user id (snowflake), as a string"
                    }
                },
                "required": ["user_id"]
            }),
        },
    }
}

pub fn channel_definition() -> ToolSpec {
    ToolSpec {
        kind: "function",
        function: FunctionSpec {
            name: CHANNEL_NAME,
            description: "Look up a Discord channel by id: name, topic, kind, nsfw flag."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "channel_id": {
                        "type": "string",
                        "description": "Discord channel id (snowflake), as a string"
                    }
                },
                "required": ["channel_id"]
            }),
        },
    }
}

pub async fn user_call(ctx: &ToolContext, args: Value) -> Result<Value, eyre::Error> {
    let args: UserInfoArgs =
        serde_json::from_value(args).map_err(|e| eyre::eyre!("invalid user_info arguments: {e}"))?;
    let id = parse_snowflake(&args.user_id)?;

    let user = ctx
        .discord_http
        .get_user(UserId::new(id))
        .await
        .map_err(|e| eyre::eyre!("could not fetch user {id}: {e}"))?;

    Ok(json!({
        "id": user.id.get().to_string(),
        "name": user.name,
        "display_name": user.global_name,
        "bot": user.bot,
        "created_at": user.id.created_at().to_rfc3339(),
    }))
}

pub async fn channel_call(ctx: &ToolContext, args: Value) -> Result<Value, eyre::Error> {
    let args: ChannelInfoArgs = serde_json::from_value(args)
        .map_err(|e| eyre::eyre!("invalid channel_info arguments: {e}"))?;
    let id = parse_snowflake(&args.channel_id)?;

    let channel = ctx
        .discord_http
        .get_channel(ChannelId::new(id))
        .await
        .map_err(|e| eyre::eyre!("could not fetch channel {id}: {e}"))?;

    Ok(match channel {
        Channel::Guild(c) => json!({
            "id": c.id.get().to_string(),
            "name": c.name,
            "topic": c.topic,
            "kind": format!("{:?}", c.kind),
            "nsfw": c.nsfw,
        }),
        Channel::Private(c) => json!({
            "id": c.id.get().to_string(),
            "name": c.name(),
            "kind": "Private",
        }),
        other => json!({
            "id": other.id().get().to_string(),
            "kind": "unknown",
        }),
    })
}

fn parse_snowflake(raw: &str) -> Result<u64, eyre::Error> {
    let trimmed = raw.trim().trim_start_matches("<@").trim_start_matches('#');
    let trimmed = trimmed.trim_end_matches('>');
    trimmed
        .parse::<u64>()
        .map_err(|_| eyre::eyre!("`{raw}` is not a Discord id"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflakes_parse_from_plain_and_mention_forms() {
        assert_eq!(parse_snowflake("1133997981637554188").unwrap(), 1133997981637554188);
        assert_eq!(parse_snowflake("<@123456>").unwrap(), 123456);
        assert_eq!(parse_snowflake(" 42 ").unwrap(), 42);
    }

    #[test]
    fn garbage_ids_are_rejected() {
        assert!(parse_snowflake("not-an-id").is_err());
        assert!(parse_snowflake("").is_err());
    }
}
