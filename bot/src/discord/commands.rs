//! Slash-command declarations and option plumbing.

use serenity::all::{
    Attachment, Command, CommandInteraction, CommandOptionType, CreateCommand,
    CreateCommandOption, ResolvedOption, ResolvedValue,
};
use serenity::http::Http;

pub const MAX_GALLERY_AMOUNT: i64 = 10;
pub const DEFAULT_GALLERY_AMOUNT: usize = 5;

pub async fn register_all(http: &Http) -> Result<(), serenity::Error> {
    let commands = vec![ask(), analyze(), images(), tweets()];
    let registered = Command::set_global_commands(http, commands).await?;
    tracing::info!(count = registered.len(), "registered global slash commands");
    Ok(())
}

fn ask() -> CreateCommand {
    CreateCommand::new("ask")
        .description("Ask BURT something")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "question", "What to ask")
                .required(true),
        )
}

fn analyze() -> CreateCommand {
    CreateCommand::new("analyze")
        .description("Have BURT look at an image")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Attachment, "image", "Image to analyze")
                .required(true),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::String,
            "question",
            "Optional question about the image",
        ))
}

fn images() -> CreateCommand {
    CreateCommand::new("images")
        .description("Open a GIF gallery")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "amount", "How many GIFs (1-10)")
                .min_int_value(1)
                .max_int_value(MAX_GALLERY_AMOUNT as u64),
        )
}

fn tweets() -> CreateCommand {
    CreateCommand::new("tweets")
        .description("Open a gallery of recent tweets")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "amount",
                "How many tweets (1-10)",
            )
            .min_int_value(1)
            .max_int_value(MAX_GALLERY_AMOUNT as u64),
        )
}

pub fn option_str<'a>(cmd: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    cmd.data.options().into_iter().find_map(|opt| match opt {
        ResolvedOption {
            name: n,
            value: ResolvedValue::String(s),
            ..
        } if n == name => Some(s),
        _ => None,
    })
}

pub fn option_int(cmd: &CommandInteraction, name: &str) -> Option<i64> {
    cmd.data.options().into_iter().find_map(|opt| match opt {
        ResolvedOption {
            name: n,
            value: ResolvedValue::Integer(i),
            ..
        } if n == name => Some(i),
        _ => None,
    })
}

pub fn option_attachment<'a>(cmd: &'a CommandInteraction, name: &str) -> Option<&'a Attachment> {
    cmd.data.options().into_iter().find_map(|opt| match opt {
        ResolvedOption {
            name: n,
            value: ResolvedValue::Attachment(a),
            ..
        } if n == name => Some(a),
        _ => None,
    })
}

/// Clamp a user-supplied gallery amount into 1..=10, defaulting when absent.
pub fn gallery_amount(requested: Option<i64>) -> usize {
    requested
        .map(|n| n.clamp(1, MAX_GALLERY_AMOUNT) as usize)
        .unwrap_or(DEFAULT_GALLERY_AMOUNT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_amount_clamps_and_defaults() {
        assert_eq!(gallery_amount(None), DEFAULT_GALLERY_AMOUNT);
        assert_eq!(gallery_amount(Some(3)), 3);
        assert_eq!(gallery_amount(Some(0)), 1);
        assert_eq!(gallery_amount(Some(-4)), 1);
        assert_eq!(gallery_amount(Some(500)), 10);
    }
}
