//! Web search snippets about a title, embedded into the classifier prompt
//!
//! Best effort: on any failure the prompt goes out without snippets.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Maximum number of hits handed to the classifier
pub const MAX_RESULTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// Scrapes the DuckDuckGo HTML frontend (no API key needed)
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    base_url: String,
    region: String,
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(DUCKDUCKGO_HTML_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            region: "us-en".to_string(),
        })
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        debug!(query = %query, region = %self.region, "Searching DuckDuckGo");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query), ("kl", self.region.as_str())])
            .send()
            .await
            .context("DuckDuckGo request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("DuckDuckGo returned status: {}", response.status());
        }

        let html = response
            .text()
            .await
            .context("Failed to read DuckDuckGo response")?;

        Ok(parse_results(&html, MAX_RESULTS))
    }
}

/// Extract result hits from a DuckDuckGo HTML page
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    // Selectors are static and known to be valid
    let (Ok(result_sel), Ok(title_sel), Ok(snippet_sel)) = (
        Selector::parse("div.result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let mut hits = Vec::new();
    for result in document.select(&result_sel) {
        let Some(link) = result.select(&title_sel).next() else {
            continue;
        };
        let title = collapse_whitespace(&link.text().collect::<String>());
        if title.is_empty() {
            continue;
        }
        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(|s| collapse_whitespace(&s.text().collect::<String>()))
            .unwrap_or_default();
        let url = link
            .value()
            .attr("href")
            .map(resolve_redirect)
            .unwrap_or_default();

        hits.push(SearchHit { title, snippet, url });
        if hits.len() >= limit {
            break;
        }
    }
    hits
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<target>`
fn resolve_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    Url::parse(&absolute)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or(absolute)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render hits in the block format embedded into the prompt
pub fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "Result {}:\nTitle: {}\nSnippet: {}\nURL: {}",
                i + 1,
                hit.title,
                hit.snippet,
                hit.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
