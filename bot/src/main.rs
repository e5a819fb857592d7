use dotenv::dotenv;
use serenity::all::GatewayIntents;
use serenity::prelude::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod chat;
mod config;
mod discord;
mod error;
mod memory;
mod ratelimit;
mod text;
mod tools;

use chat::{ChatClient, Orchestrator};
use config::BotConfig;
use discord::BurtBot;
use memory::{MemoryPipeline, MemoryStore};
use tools::ToolContext;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), eyre::Error> {
    dotenv().ok();

    // LOG_LEVEL feeds the filter; bad directives fall back to info
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BotConfig::new_from_env();

    let store = match MemoryStore::connect(&config.database_url).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(
                error = %e,
                url = %config.database_url,
                "could not open memory store, falling back to in-memory"
            );
            MemoryStore::connect("sqlite::memory:").await?
        }
    };

    let chat_client = ChatClient::new(config.xai_api_key.clone(), config.xai_api_base.clone())?;

    // REST-only Discord client for the introspection tools; the gateway
    // connection below has its own
    let discord_http = Arc::new(serenity::http::Http::new(&config.discord_token));

    let tool_context = Arc::new(ToolContext::new(
        discord_http,
        chat_client.clone(),
        config.tenor_api_key.clone(),
        config.twitter_bearer_token.clone(),
    )?);

    let orchestrator = Orchestrator::new(chat_client.clone(), tool_context.clone());
    let pipeline = MemoryPipeline::new(chat_client, store);

    let handler = BurtBot::new(orchestrator, pipeline, tool_context);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await?;

    tracing::info!("starting gateway client");
    client.start().await?;

    Ok(())
}
