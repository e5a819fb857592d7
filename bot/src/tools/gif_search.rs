//! GIF search via the Tenor v2 API. The `/images` gallery reuses
//! [`search`] directly; the model goes through [`call`].

use super::ToolContext;
use crate::chat::{FunctionSpec, ToolSpec};
use serde::Deserialize;
use serde_json::{Value, json};

pub const NAME: &str = "gif_search";

pub const MAX_GIF_RESULTS: usize = 10;

#[derive(Debug, Deserialize)]
pub struct GifSearchArgs {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// One search hit, reduced to what the galleries and the model need.
#[derive(Debug, Clone)]
pub struct Gif {
    pub title: String,
    pub page_url: String,
    pub gif_url: String,
}

pub fn definition() -> ToolSpec {
    ToolSpec {
        kind: "function",
        function: FunctionSpec {
            name: NAME,
            description: "Search Tenor for GIFs matching a query. Returns GIF titles and URLs."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search GIFs for"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Number of results, 1-10 (default 5)"
                    }
                },
                "required": ["query"]
            }),
        },
    }
}

pub async fn call(ctx: &ToolContext, args: Value) -> Result<Value, eyre::Error> {
    let args: GifSearchArgs = serde_json::from_value(args)
        .map_err(|e| eyre::eyre!("invalid gif_search arguments: {e}"))?;

    let limit = args.limit.unwrap_or(5).clamp(1, MAX_GIF_RESULTS);
    let gifs = search(ctx, &args.query, limit).await?;

    Ok(json!({
        "query": args.query,
        "results": gifs
            .iter()
            .map(|g| json!({ "title": g.title, "url": g.page_url, "gif": g.gif_url }))
            .collect::<Vec<_>>(),
    }))
}

#[derive(Debug, Deserialize)]
struct TenorResponse {
    #[serde(default)]
    results: Vec<TenorResult>,
}

#[derive(Debug, Deserialize)]
struct TenorResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content_description: String,
    #[serde(default)]
    itemurl: String,
    #[serde(default)]
    media_formats: serde_json::Map<String, Value>,
}

pub async fn search(ctx: &ToolContext, query: &str, limit: usize) -> Result<Vec<Gif>, eyre::Error> {
    let Some(api_key) = ctx.tenor_api_key.as_deref() else {
        eyre::bail!("GIF search is unavailable: no Tenor API key configured");
    };

    if ctx.limiters.tenor.check().is_err() {
        eyre::bail!("GIF search is rate limited right now, try again later");
    }

    let mut url = url::Url::parse("https://tenor.googleapis.com/v2/search")?;
    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("key", api_key)
        .append_pair("limit", &limit.clamp(1, MAX_GIF_RESULTS).to_string())
        .append_pair("media_filter", "gif");

    let response: TenorResponse = ctx
        .http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(response
        .results
        .into_iter()
        .filter_map(|r| {
            let gif_url = r
                .media_formats
                .get("gif")
                .and_then(|m| m.get("url"))
                .and_then(|u| u.as_str())?
                .to_string();
            let title = if r.title.is_empty() {
                r.content_description
            } else {
                r.title
            };
            Some(Gif {
                title,
                page_url: r.itemurl,
                gif_url,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenor_results_without_gif_format_are_skipped() {
        let raw = json!({
            "results": [
                {
                    "title": "",
                    "content_description": "a cat",
                    "itemurl": "https://tenor.com/view/1",
                    "media_formats": { "gif": { "url": "https://media.tenor.com/1.gif" } }
                },
                {
                    "title": "no formats",
                    "itemurl": "https://tenor.com/view/2",
                    "media_formats": {}
                }
            ]
        });
        let parsed: TenorResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert!(parsed.results[1].media_formats.get("gif").is_none());
    }
}
