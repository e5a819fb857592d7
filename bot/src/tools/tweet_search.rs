//! Tweet lookup via the Twitter v2 recent-search endpoint. Bearer auth;
//! the `/tweets` gallery reuses [`search`] directly.

use super::ToolContext;
use crate::chat::{FunctionSpec, ToolSpec};
use serde::Deserialize;
use serde_json::{Value, json};

pub const NAME: &str = "tweet_search";

/// The recent-search endpoint rejects max_results outside 10..=100.
const API_MIN_RESULTS: usize = 10;
const API_MAX_RESULTS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct TweetSearchArgs {
    pub query: String,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub created_at: String,
}

impl Tweet {
    pub fn url(&self) -> String {
        format!("https://twitter.com/i/web/status/{}", self.id)
    }
}

pub fn definition() -> ToolSpec {
    ToolSpec {
        kind: "function",
        function: FunctionSpec {
            name: NAME,
            description: "Search recent tweets matching a query. Returns tweet text, author id \
                and a link per result."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Twitter search query"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "How many tweets to return (default 10)"
                    }
                },
                "required": ["query"]
            }),
        },
    }
}

pub async fn call(ctx: &ToolContext, args: Value) -> Result<Value, eyre::Error> {
    let args: TweetSearchArgs = serde_json::from_value(args)
        .map_err(|e| eyre::eyre!("invalid tweet_search arguments: {e}"))?;

    let tweets = search(ctx, &args.query, args.max_results.unwrap_or(10)).await?;

    Ok(json!({
        "query": args.query,
        "results": tweets
            .iter()
            .map(|t| json!({
                "id": t.id,
                "text": t.text,
                "author_id": t.author_id,
                "created_at": t.created_at,
                "url": t.url(),
            }))
            .collect::<Vec<_>>(),
    }))
}

#[derive(Debug, Deserialize)]
struct RecentSearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
}

pub async fn search(
    ctx: &ToolContext,
    query: &str,
    wanted: usize,
) -> Result<Vec<Tweet>, eyre::Error> {
    let Some(bearer) = ctx.twitter_bearer_token.as_deref() else {
        eyre::bail!("tweet search is unavailable: no Twitter bearer token configured");
    };

    if ctx.limiters.twitter.check().is_err() {
        eyre::bail!("tweet search is rate limited right now, try again later");
    }

    let mut url = url::Url::parse("https://api.twitter.com/2/tweets/search/recent")?;
    url.query_pairs_mut()
        .append_pair("query", query)
        .append_pair(
            "max_results",
            &wanted.clamp(API_MIN_RESULTS, API_MAX_RESULTS).to_string(),
        )
        .append_pair("tweet.fields", "author_id,created_at");

    let response: RecentSearchResponse = ctx
        .http
        .get(url)
        .bearer_auth(bearer)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    // The API floor is 10; trim back down to what the caller asked for.
    let mut tweets = response.data;
    tweets.truncate(wanted.max(1));
    Ok(tweets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_search_response_deserializes() {
        let raw = json!({
            "data": [
                { "id": "1", "text": "hello", "author_id": "42", "created_at": "2024-01-01T00:00:00Z" },
                { "id": "2", "text": "world" }
            ],
            "meta": { "result_count": 2 }
        });
        let parsed: RecentSearchResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert!(parsed.data[1].author_id.is_empty());
        assert_eq!(parsed.data[0].url(), "https://twitter.com/i/web/status/1");
    }

    #[test]
    fn empty_response_body_deserializes_to_no_tweets() {
        let parsed: RecentSearchResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.data.is_empty());
    }
}
