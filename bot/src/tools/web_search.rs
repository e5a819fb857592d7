//! Web search against the DuckDuckGo instant-answer API.

use super::ToolContext;
use crate::chat::{FunctionSpec, ToolSpec};
use serde::Deserialize;
use serde_json::{Value, json};

pub const NAME: &str = "web_search";

const MAX_RELATED_TOPICS: usize = 5;

#[derive(Debug, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
}

pub fn definition() -> ToolSpec {
    ToolSpec {
        kind: "function",
        function: FunctionSpec {
            name: NAME,
            description: "Search the web via the DuckDuckGo instant-answer API. \
                Returns an abstract and related topics when available."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    }
                },
                "required": ["query"]
            }),
        },
    }
}

pub async fn call(ctx: &ToolContext, args: Value) -> Result<Value, eyre::Error> {
    let args: WebSearchArgs = serde_json::from_value(args)
        .map_err(|e| eyre::eyre!("invalid web_search arguments: {e}"))?;

    if ctx.limiters.duckduckgo.check().is_err() {
        eyre::bail!("web search is rate limited right now, try again later");
    }

    let answer = fetch_instant_answer(ctx, &args.query).await?;
    Ok(answer)
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

/// DuckDuckGo nests topic groups inside the same array as plain topics; a
/// group carries `Topics` instead of `Text`/`FirstURL`.
#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "FirstURL", default)]
    first_url: String,
    #[serde(rename = "Topics", default)]
    topics: Vec<RelatedTopic>,
}

async fn fetch_instant_answer(ctx: &ToolContext, query: &str) -> Result<Value, eyre::Error> {
    let mut url = url::Url::parse("https://api.duckduckgo.com/")?;
    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("format", "json")
        .append_pair("no_html", "1")
        .append_pair("skip_disambig", "1");

    let answer: InstantAnswer = ctx
        .http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let related = flatten_topics(&answer.related_topics, MAX_RELATED_TOPICS);

    if answer.abstract_text.is_empty() && related.is_empty() {
        return Ok(json!({
            "query": query,
            "message": "no instant answer available for this query",
        }));
    }

    Ok(json!({
        "query": query,
        "heading": answer.heading,
        "abstract": answer.abstract_text,
        "source": answer.abstract_url,
        "related": related,
    }))
}

fn flatten_topics(topics: &[RelatedTopic], limit: usize) -> Vec<Value> {
    let mut out = Vec::new();
    collect_topics(topics, limit, &mut out);
    out
}

fn collect_topics(topics: &[RelatedTopic], limit: usize, out: &mut Vec<Value>) {
    for topic in topics {
        if out.len() >= limit {
            return;
        }
        if !topic.text.is_empty() {
            out.push(json!({ "text": topic.text, "url": topic.first_url }));
        } else if !topic.topics.is_empty() {
            collect_topics(&topic.topics, limit, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_topic_groups_are_flattened_up_to_the_limit() {
        let raw = json!({
            "AbstractText": "",
            "RelatedTopics": [
                { "Text": "a", "FirstURL": "https://a" },
                { "Name": "group", "Topics": [
                    { "Text": "b", "FirstURL": "https://b" },
                    { "Text": "c", "FirstURL": "https://c" }
                ]},
                { "Text": "d", "FirstURL": "https://d" }
            ]
        });
        let answer: InstantAnswer = serde_json::from_value(raw).unwrap();

        let all = flatten_topics(&answer.related_topics, 10);
        assert_eq!(all.len(), 4);
        assert_eq!(all[1]["text"], "b");

        let capped = flatten_topics(&answer.related_topics, 2);
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let answer: InstantAnswer = serde_json::from_value(json!({})).unwrap();
        assert!(answer.abstract_text.is_empty());
        assert!(answer.related_topics.is_empty());
    }
}
