use crate::chat::Orchestrator;
use crate::discord::commands::{self, gallery_amount};
use crate::discord::gallery::{
    BTN_CLOSE, BTN_NEXT, BTN_PREV, ButtonOutcome, GALLERY_FETCH_TIMEOUT, Gallery, GalleryItem,
    GalleryManager,
};
use crate::memory::MemoryPipeline;
use crate::ratelimit::{SlidingWindow, USER_RATE_LIMIT, USER_RATE_WINDOW};
use crate::tools::{ToolContext, gif_search, tweet_search};
use arc_swap::ArcSwap;
use serenity::all::{
    ChannelId, CommandInteraction, ComponentInteraction, Context, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, EditInteractionResponse, Interaction, Message,
    Ready, Typing, UserId,
};
use serenity::async_trait;
use serenity::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Fixed search themes for the galleries; BURT has a one-track mind.
const GIF_THEME: &str = "backrooms liminal space";
const TWEET_THEME: &str = "backrooms -is:retweet";

const EMPTY_GALLERY_APOLOGY: &str =
    "BURT wandered the archives and came back empty-handed. try again in a bit.";
const ANALYZE_NEEDS_IMAGE: &str = "attach an image for BURT to stare at.";

pub struct BurtBot {
    orchestrator: Orchestrator,
    memory: Arc<MemoryPipeline>,
    galleries: Arc<GalleryManager>,
    tools: Arc<ToolContext>,
    user_limiter: SlidingWindow,
    bot_user_id: ArcSwap<Option<UserId>>,
    sweeper_started: AtomicBool,
}

impl BurtBot {
    pub fn new(
        orchestrator: Orchestrator,
        memory: Arc<MemoryPipeline>,
        tools: Arc<ToolContext>,
    ) -> Self {
        Self {
            orchestrator,
            memory,
            galleries: GalleryManager::new(),
            tools,
            user_limiter: SlidingWindow::new(USER_RATE_LIMIT, USER_RATE_WINDOW),
            bot_user_id: ArcSwap::new(Arc::new(None)),
            sweeper_started: AtomicBool::new(false),
        }
    }

    /// One chat interaction end to end: cooldown check, memory context,
    /// orchestration, then the detached annotation. Always returns something
    /// sendable; failures collapse into an in-character apology.
    async fn answer_question(
        &self,
        user_id: UserId,
        channel_id: ChannelId,
        question: String,
    ) -> String {
        if question.trim().is_empty() {
            return "ask me something. anything. please.".to_string();
        }

        if let Err(wait) = self.user_limiter.check(user_id.get()).await {
            return format!(
                "easy there. BURT needs another {}s before thinking about you again.",
                wait.as_secs().max(1)
            );
        }

        let context = self.memory.context_for(user_id.get()).await;

        match self.orchestrator.respond(question.clone(), context).await {
            Ok(reply) => {
                self.memory.spawn_annotation(
                    user_id.get(),
                    channel_id.get(),
                    question,
                    reply.clone(),
                );
                reply
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = user_id.get(), "chat interaction failed");
                crate::chat::APOLOGY.to_string()
            }
        }
    }

    async fn answer_analysis(
        &self,
        user_id: UserId,
        image_url: &str,
        question: Option<&str>,
    ) -> String {
        if let Err(wait) = self.user_limiter.check(user_id.get()).await {
            return format!(
                "easy there. BURT needs another {}s before staring at more pictures.",
                wait.as_secs().max(1)
            );
        }

        match self.orchestrator.analyze_image(image_url, question).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::error!(error = %e, "image analysis failed");
                crate::chat::APOLOGY.to_string()
            }
        }
    }

    /// Populate a GIF gallery, bounded by the fetch timeout. Whatever has
    /// arrived when the timer fires is what the gallery gets.
    async fn fetch_gif_items(&self, amount: usize) -> Vec<GalleryItem> {
        let fetched = tokio::time::timeout(
            GALLERY_FETCH_TIMEOUT,
            gif_search::search(&self.tools, GIF_THEME, amount),
        )
        .await;

        match fetched {
            Ok(Ok(gifs)) => gifs
                .into_iter()
                .map(|g| GalleryItem {
                    title: if g.title.is_empty() { "untitled".to_string() } else { g.title },
                    description: None,
                    image_url: Some(g.gif_url),
                    link: Some(g.page_url),
                })
                .collect(),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "GIF gallery population failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!("GIF gallery population timed out");
                Vec::new()
            }
        }
    }

    async fn fetch_tweet_items(&self, amount: usize) -> Vec<GalleryItem> {
        let fetched = tokio::time::timeout(
            GALLERY_FETCH_TIMEOUT,
            tweet_search::search(&self.tools, TWEET_THEME, amount),
        )
        .await;

        match fetched {
            Ok(Ok(tweets)) => tweets
                .into_iter()
                .map(|t| GalleryItem {
                    title: format!("tweet by {}", if t.author_id.is_empty() { "unknown" } else { &t.author_id }),
                    description: Some(t.text.clone()),
                    image_url: None,
                    link: Some(t.url()),
                })
                .collect(),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "tweet gallery population failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!("tweet gallery population timed out");
                Vec::new()
            }
        }
    }

    async fn handle_slash(&self, ctx: &Context, cmd: &CommandInteraction) {
        // Everything below takes longer than the 3s interaction deadline
        if let Err(e) = cmd.defer(&ctx.http).await {
            tracing::error!(error = %e, command = %cmd.data.name, "failed to defer interaction");
            return;
        }

        let reply = match cmd.data.name.as_str() {
            "ask" => {
                let question = commands::option_str(cmd, "question").unwrap_or_default();
                Some(
                    self.answer_question(cmd.user.id, cmd.channel_id, question.to_string())
                        .await,
                )
            }
            "analyze" => Some(match commands::option_attachment(cmd, "image") {
                Some(att)
                    if att
                        .content_type
                        .as_deref()
                        .is_some_and(|ct| ct.starts_with("image/")) =>
                {
                    self.answer_analysis(
                        cmd.user.id,
                        &att.proxy_url,
                        commands::option_str(cmd, "question"),
                    )
                    .await
                }
                _ => ANALYZE_NEEDS_IMAGE.to_string(),
            }),
            "images" => {
                let amount = gallery_amount(commands::option_int(cmd, "amount"));
                let items = self.fetch_gif_items(amount).await;
                self.finish_gallery_interaction(ctx, cmd, "GIFs", items).await;
                None
            }
            "tweets" => {
                let amount = gallery_amount(commands::option_int(cmd, "amount"));
                let items = self.fetch_tweet_items(amount).await;
                self.finish_gallery_interaction(ctx, cmd, "Tweets", items).await;
                None
            }
            other => {
                tracing::warn!(command = other, "unhandled slash command");
                Some("BURT doesn't know that one.".to_string())
            }
        };

        if let Some(reply) = reply {
            let _ = cmd
                .edit_response(&ctx.http, EditInteractionResponse::new().content(reply))
                .await
                .inspect_err(|e| {
                    tracing::error!(error = %e, command = %cmd.data.name, "failed to edit response");
                });
        }
    }

    async fn finish_gallery_interaction(
        &self,
        ctx: &Context,
        cmd: &CommandInteraction,
        label: &str,
        items: Vec<GalleryItem>,
    ) {
        if items.is_empty() {
            let _ = cmd
                .edit_response(
                    &ctx.http,
                    EditInteractionResponse::new().content(EMPTY_GALLERY_APOLOGY),
                )
                .await
                .inspect_err(|e| tracing::error!(error = %e, "failed to send gallery apology"));
            return;
        }

        let gallery = Gallery::new(label.to_string(), items, cmd.user.id, cmd.channel_id);
        let (embed, rows) = gallery.render();

        match cmd
            .edit_response(
                &ctx.http,
                EditInteractionResponse::new().embed(embed).components(rows),
            )
            .await
        {
            Ok(message) => self.galleries.insert(message.id.get(), gallery).await,
            Err(e) => tracing::error!(error = %e, "failed to post gallery"),
        }
    }

    async fn post_legacy_gallery(
        &self,
        ctx: &Context,
        msg: &Message,
        label: &str,
        items: Vec<GalleryItem>,
    ) {
        if items.is_empty() {
            let _ = msg
                .channel_id
                .say(&ctx.http, EMPTY_GALLERY_APOLOGY)
                .await
                .inspect_err(|e| tracing::error!(error = %e, "failed to send gallery apology"));
            return;
        }

        let gallery = Gallery::new(label.to_string(), items, msg.author.id, msg.channel_id);
        let (embed, rows) = gallery.render();

        match msg
            .channel_id
            .send_message(&ctx.http, CreateMessage::new().embed(embed).components(rows))
            .await
        {
            Ok(message) => self.galleries.insert(message.id.get(), gallery).await,
            Err(e) => tracing::error!(error = %e, "failed to post gallery"),
        }
    }

    async fn handle_component(&self, ctx: &Context, comp: &ComponentInteraction) {
        let custom_id = comp.data.custom_id.as_str();
        if !matches!(custom_id, BTN_PREV | BTN_NEXT | BTN_CLOSE) {
            return;
        }

        let outcome = self
            .galleries
            .handle_button(comp.message.id.get(), custom_id, comp.user.id)
            .await;

        let response = match outcome {
            ButtonOutcome::Update(embed, rows) => CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .components(rows),
            ),
            ButtonOutcome::Close => CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new().components(Vec::new()),
            ),
            ButtonOutcome::NotOwner => CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content("not your gallery. open your own.")
                    .ephemeral(true),
            ),
            ButtonOutcome::Expired => CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content("this gallery has expired.")
                    .ephemeral(true),
            ),
        };

        let _ = comp
            .create_response(&ctx.http, response)
            .await
            .inspect_err(|e| {
                tracing::error!(error = %e, custom_id, "failed to respond to gallery button");
            });
    }

    async fn handle_legacy(&self, ctx: &Context, msg: &Message, command: LegacyCommand) {
        match command {
            LegacyCommand::Ask(question) => {
                let _typing = Typing::start(ctx.http.clone(), msg.channel_id);
                let reply = self
                    .answer_question(msg.author.id, msg.channel_id, question)
                    .await;
                let _ = msg
                    .channel_id
                    .say(&ctx.http, reply)
                    .await
                    .inspect_err(|e| tracing::error!(error = %e, "failed to send reply"));
            }
            LegacyCommand::Analyze(question) => {
                let image_url = msg
                    .attachments
                    .iter()
                    .find(|a| {
                        a.content_type
                            .as_deref()
                            .is_some_and(|ct| ct.starts_with("image/"))
                    })
                    .map(|a| a.proxy_url.clone());

                let reply = match image_url {
                    Some(url) => {
                        let _typing = Typing::start(ctx.http.clone(), msg.channel_id);
                        let question = (!question.trim().is_empty()).then_some(question);
                        self.answer_analysis(msg.author.id, &url, question.as_deref())
                            .await
                    }
                    None => ANALYZE_NEEDS_IMAGE.to_string(),
                };
                let _ = msg
                    .channel_id
                    .say(&ctx.http, reply)
                    .await
                    .inspect_err(|e| tracing::error!(error = %e, "failed to send reply"));
            }
            LegacyCommand::Images(amount) => {
                let items = self.fetch_gif_items(gallery_amount(amount)).await;
                self.post_legacy_gallery(ctx, msg, "GIFs", items).await;
            }
            LegacyCommand::Tweets(amount) => {
                let items = self.fetch_tweet_items(gallery_amount(amount)).await;
                self.post_legacy_gallery(ctx, msg, "Tweets", items).await;
            }
        }
    }
}

#[async_trait]
impl EventHandler for BurtBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!(name = %ready.user.name, "BURT is connected");
        self.bot_user_id.store(Arc::new(Some(ready.user.id)));

        if let Err(e) = commands::register_all(&ctx.http).await {
            tracing::error!(error = %e, "failed to register slash commands");
        }

        // ready fires again on reconnect; the sweeper must only start once
        if self
            .sweeper_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.galleries.spawn_sweeper(ctx.http.clone());
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        if let Some(command) = parse_legacy(&msg.content) {
            self.handle_legacy(&ctx, &msg, command).await;
            return;
        }

        // A bare mention with a question rides the ask path
        if let Some(bot_id) = **self.bot_user_id.load() {
            if msg.mentions_user_id(bot_id) {
                let question = strip_mentions(&msg.content, bot_id);
                self.handle_legacy(&ctx, &msg, LegacyCommand::Ask(question))
                    .await;
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(cmd) => self.handle_slash(&ctx, &cmd).await,
            Interaction::Component(comp) => self.handle_component(&ctx, &comp).await,
            _ => {}
        }
    }
}

#[derive(Debug, PartialEq)]
enum LegacyCommand {
    Ask(String),
    Analyze(String),
    Images(Option<i64>),
    Tweets(Option<i64>),
}

/// Parse the legacy `!`-prefixed command path.
fn parse_legacy(content: &str) -> Option<LegacyCommand> {
    let content = content.trim();
    let (name, rest) = match content.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (content, ""),
    };

    match name {
        "!ask" => Some(LegacyCommand::Ask(rest.to_string())),
        "!analyze" => Some(LegacyCommand::Analyze(rest.to_string())),
        "!images" => Some(LegacyCommand::Images(rest.parse().ok())),
        "!tweets" => Some(LegacyCommand::Tweets(rest.parse().ok())),
        _ => None,
    }
}

fn strip_mentions(content: &str, bot_id: UserId) -> String {
    content
        .replace(&format!("<@{}>", bot_id.get()), "")
        .replace(&format!("<@!{}>", bot_id.get()), "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_commands_parse() {
        assert_eq!(
            parse_legacy("!ask why is the ceiling humming"),
            Some(LegacyCommand::Ask("why is the ceiling humming".into()))
        );
        assert_eq!(parse_legacy("!images 7"), Some(LegacyCommand::Images(Some(7))));
        assert_eq!(parse_legacy("!images"), Some(LegacyCommand::Images(None)));
        assert_eq!(parse_legacy("!tweets lots"), Some(LegacyCommand::Tweets(None)));
        assert_eq!(parse_legacy("!analyze"), Some(LegacyCommand::Analyze("".into())));
    }

    #[test]
    fn non_commands_are_ignored() {
        assert_eq!(parse_legacy("hello there"), None);
        assert_eq!(parse_legacy("!unknown thing"), None);
        assert_eq!(parse_legacy(""), None);
    }

    #[test]
    fn mention_stripping_handles_both_mention_forms() {
        let id = UserId::new(42);
        assert_eq!(strip_mentions("<@42> hello", id), "hello");
        assert_eq!(strip_mentions("<@!42> hello", id), "hello");
        assert_eq!(strip_mentions("hello <@42>", id), "hello");
    }
}
