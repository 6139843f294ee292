//! Web access tools: search results and readable article text.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::binding::ToolBinding;
use super::schema::{ParamType, ParameterSchema};
use crate::models::content::Content;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; agentloop/0.1)";
const DUCKDUCKGO_HOST: &str = "https://html.duckduckgo.com";
const DEFAULT_MAX_RESULTS: usize = 5;
const DEFAULT_MAX_CHARS: usize = 20_000;

fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()?)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {}: {:?}", css, e))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Web search through DuckDuckGo's HTML endpoint (no API key needed)
pub struct DuckDuckGoSearch {
    client: Client,
    host: String,
    schema: ParameterSchema,
}

impl DuckDuckGoSearch {
    pub fn new() -> Result<Self> {
        Self::with_host(DUCKDUCKGO_HOST)
    }

    pub fn with_host<S: Into<String>>(host: S) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            host: host.into(),
            schema: ParameterSchema::new()
                .required("query", ParamType::String, "The search query")
                .optional(
                    "max_results",
                    ParamType::Integer,
                    "Maximum number of results to return (default: 5)",
                ),
        })
    }
}

#[async_trait]
impl ToolBinding for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web. Returns a list of results with title, url and snippet."
    }

    fn parameter_schema(&self) -> &ParameterSchema {
        &self.schema
    }

    async fn invoke(&self, args: Value) -> Result<Content> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| anyhow!("Missing 'query' argument"))?;
        let max_results = args["max_results"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_RESULTS);

        let url = format!(
            "{}/html/?q={}",
            self.host.trim_end_matches('/'),
            urlencoding::encode(query)
        );
        debug!(%url, "searching");

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let html = response.text().await?;
        let hits = parse_duckduckgo_results(&html, max_results)?;

        Ok(Content::json(json!({ "query": query, "results": hits })))
    }
}

/// Extract result entries from a DuckDuckGo HTML results page
pub fn parse_duckduckgo_results(html: &str, limit: usize) -> Result<Vec<SearchHit>> {
    let document = Html::parse_document(html);
    let result = selector("div.result")?;
    let link = selector("a.result__a")?;
    let snippet = selector(".result__snippet")?;

    let mut hits = Vec::new();
    for node in document.select(&result) {
        if hits.len() >= limit {
            break;
        }
        let Some(anchor) = node.select(&link).next() else {
            continue;
        };
        let title = collapse_whitespace(&anchor.text().collect::<String>());
        if title.is_empty() {
            continue;
        }
        let url = anchor
            .value()
            .attr("href")
            .map(resolve_redirect)
            .unwrap_or_default();
        let snippet = node
            .select(&snippet)
            .next()
            .map(|s| collapse_whitespace(&s.text().collect::<String>()))
            .unwrap_or_default();

        hits.push(SearchHit {
            title,
            url,
            snippet,
        });
    }

    Ok(hits)
}

/// DuckDuckGo wraps result links as `//duckduckgo.com/l/?uddg=<target>`
fn resolve_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    Url::parse(&absolute)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, target)| target.into_owned())
        })
        .unwrap_or(absolute)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub title: String,
    pub text: String,
}

/// Fetches a page and extracts its title and body text
pub struct ArticleReader {
    client: Client,
    max_chars: usize,
    schema: ParameterSchema,
}

impl ArticleReader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            max_chars: DEFAULT_MAX_CHARS,
            schema: ParameterSchema::new().required(
                "url",
                ParamType::String,
                "The URL of the article to read",
            ),
        })
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

#[async_trait]
impl ToolBinding for ArticleReader {
    fn name(&self) -> &str {
        "read_article"
    }

    fn description(&self) -> &str {
        "Read an article from a URL. Returns the title and the main text of the page."
    }

    fn parameter_schema(&self) -> &ParameterSchema {
        &self.schema
    }

    async fn invoke(&self, args: Value) -> Result<Content> {
        let url = args["url"]
            .as_str()
            .ok_or_else(|| anyhow!("Missing 'url' argument"))?;
        let url = Url::parse(url).with_context(|| format!("'{}' is not a valid URL", url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("unsupported URL scheme '{}'", url.scheme()));
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;
        let html = response.text().await?;
        let article = extract_article(&html, self.max_chars)?;

        Ok(Content::json(json!({
            "url": url.as_str(),
            "title": article.title,
            "text": article.text,
        })))
    }
}

/// Pull the title and paragraph text out of an HTML page, preferring `<article>` content
pub fn extract_article(html: &str, max_chars: usize) -> Result<Article> {
    let document = Html::parse_document(html);

    let og_title = selector(r#"meta[property="og:title"]"#)?;
    let title_tag = selector("title")?;
    let title = document
        .select(&og_title)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(collapse_whitespace)
        .or_else(|| {
            document
                .select(&title_tag)
                .next()
                .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        })
        .unwrap_or_default();

    let mut paragraphs: Vec<String> = document
        .select(&selector("article p")?)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|p| !p.is_empty())
        .collect();
    if paragraphs.is_empty() {
        paragraphs = document
            .select(&selector("p")?)
            .map(|p| collapse_whitespace(&p.text().collect::<String>()))
            .filter(|p| !p.is_empty())
            .collect();
    }

    Ok(Article {
        title,
        text: truncate_chars(&paragraphs.join("\n\n"), max_chars),
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}... [truncated]", &text[..idx]),
        None => text.to_string(),
    }
}
