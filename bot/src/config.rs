pub struct BotConfig {
    pub discord_token: String,
    pub xai_api_key: String,
    pub xai_api_base: String,
    pub tenor_api_key: Option<String>,
    pub twitter_bearer_token: Option<String>,
    pub database_url: String,
}

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => match e {
            std::env::VarError::NotPresent => Ok(None),
            std::env::VarError::NotUnicode(_) => Err(format!(
                "Could not get the environment variable `{key}` due to unicode error"
            )),
        },
    }
}

fn required_var(key: &str) -> String {
    let val = var(key);
    match val {
        Ok(val) => match val {
            Some(val) => val,
            None => {
                tracing::error!("Environment variable `{key}` is required");
                std::process::exit(1)
            }
        },
        Err(e) => {
            tracing::error!(
                "Environment variable `{key}` is required, but could not retrieve: {e}"
            );
            std::process::exit(1)
        }
    }
}

fn optional_var(key: &str) -> Option<String> {
    var(key).ok().flatten().filter(|v| !v.trim().is_empty())
}

impl BotConfig {
    pub fn new_from_env() -> Self {
        let tenor_api_key = optional_var("TENOR_API_KEY");
        if tenor_api_key.is_none() {
            tracing::warn!("TENOR_API_KEY is not set, GIF search will be unavailable");
        }

        let twitter_bearer_token = optional_var("TWITTER_BEARER_TOKEN");
        if twitter_bearer_token.is_none() {
            tracing::warn!("TWITTER_BEARER_TOKEN is not set, tweet search will be unavailable");
        }

        BotConfig {
            discord_token: required_var("DISCORD_TOKEN"),
            xai_api_key: required_var("XAI_API_KEY"),
            xai_api_base: optional_var("XAI_API_BASE")
                .unwrap_or_else(|| crate::chat::DEFAULT_API_BASE.to_string()),
            tenor_api_key,
            twitter_bearer_token,
            database_url: optional_var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://burt-memory.db".to_string()),
        }
    }
}
