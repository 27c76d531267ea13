//! Ollama API client for classifying movie folders by country of origin
//!
//! The model is asked a yes/no question about the folder name. Its reply is
//! free text, so it is reduced to a tri-state [Answer]: anything that is not
//! a clear yes or no is [Answer::Indeterminate] and is treated like a failed
//! request. An unclear reply must never be stored as "not a match", or the
//! movie would be skipped forever.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::retry::{RetryConfig, retry_async};
use super::search::{WebSearch, format_hits};
use crate::models::{Answer, Verdict};

const NO_SEARCH_RESULTS: &str = "No search results available.";

/// Configuration for the Ollama classifier
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout_seconds: 30,
            temperature: 0.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("failed to reach Ollama: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Ollama API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode Ollama response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("model gave no clear yes/no answer: {response:?}")]
    Indeterminate { response: String },
}

/// Decides whether a movie folder is an Indian cinema production.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, movie_name: &str) -> Result<Verdict, ClassificationError>;
}

/// Request body for Ollama generate API
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Response from Ollama generate API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    total_duration: u64,
    #[serde(default)]
    eval_count: u32,
}

/// Classifier backed by an Ollama server
pub struct OllamaClassifier {
    client: reqwest::Client,
    config: OllamaConfig,
    search: Option<Arc<dyn WebSearch>>,
    retry: RetryConfig,
    cancel: CancellationToken,
}

impl OllamaClassifier {
    pub fn new(config: OllamaConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            search: None,
            retry: RetryConfig::default(),
            cancel: CancellationToken::new(),
        })
    }

    /// Feed web search snippets into the prompt
    pub fn with_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Stop waiting between attempts once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    async fn search_context(&self, movie_name: &str) -> String {
        let Some(search) = &self.search else {
            return NO_SEARCH_RESULTS.to_string();
        };

        let query = format!("{movie_name} movie country origin");
        match search.search(&query).await {
            Ok(hits) if !hits.is_empty() => {
                debug!(movie = %movie_name, hits = hits.len(), "Web search returned results");
                format_hits(&hits)
            }
            Ok(_) => {
                debug!(movie = %movie_name, "Web search returned nothing");
                NO_SEARCH_RESULTS.to_string()
            }
            Err(e) => {
                warn!(movie = %movie_name, error = %e, "Web search failed");
                NO_SEARCH_RESULTS.to_string()
            }
        }
    }

    /// One round trip to `/api/generate`, returning the raw model text
    async fn generate(&self, prompt: &str) -> Result<String, ClassificationError> {
        let request = OllamaRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        let url = format!("{}/api/generate", self.config.url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(ClassificationError::Request)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassificationError::Status { status, body });
        }

        let ollama_response: OllamaResponse =
            response.json().await.map_err(ClassificationError::Decode)?;

        debug!(
            duration_ms = ollama_response.total_duration / 1_000_000,
            tokens = ollama_response.eval_count,
            "Ollama responded"
        );

        Ok(ollama_response.response.trim().to_string())
    }

    async fn attempt(&self, movie_name: &str, prompt: &str) -> Result<Verdict, ClassificationError> {
        let raw = self.generate(prompt).await?;
        debug!(movie = %movie_name, response = %raw, "Model response");

        match parse_answer(&raw) {
            Answer::Positive => Ok(Verdict::new(true, raw)),
            Answer::Negative => Ok(Verdict::new(false, raw)),
            Answer::Indeterminate => Err(ClassificationError::Indeterminate { response: raw }),
        }
    }
}

#[async_trait]
impl Classifier for OllamaClassifier {
    async fn classify(&self, movie_name: &str) -> Result<Verdict, ClassificationError> {
        let context = self.search_context(movie_name).await;
        let prompt = build_prompt(movie_name, &context);
        debug!(movie = %movie_name, prompt = %prompt, "Classification prompt");

        let operation = format!("classify '{movie_name}'");
        let verdict = retry_async(
            || self.attempt(movie_name, &prompt),
            &self.retry,
            &operation,
            &self.cancel,
        )
        .await?;

        info!(
            movie = %movie_name,
            model = %self.config.model,
            is_match = verdict.is_match,
            "Classified movie"
        );
        Ok(verdict)
    }
}

/// Build the yes/no question for a folder name and search context
pub fn build_prompt(movie_name: &str, search_results: &str) -> String {
    format!(
        "Based on the following web search results about the movie '{movie_name}', \
determine if this is a Bollywood, Indian, or Telugu speaking movie.

Search Results:
{search_results}

If the search results are not conclusive, use what you know about the movie. \
If you still are not sure, make an educated guess from the title.

Is '{movie_name}' a Bollywood, Indian, or Telugu speaking movie? \
Answer with exactly one word: 'yes' or 'no'. No explanations."
    )
}

/// Reduce free-form model output to a tri-state answer.
///
/// Reasoning blocks (`<think>...</think>`) are dropped and the rest is split
/// into lowercase alphabetic words. A leading `yes`/`no` decides. Otherwise the
/// reply counts only if exactly one of the two words appears anywhere. Words
/// are matched whole, so "know" or "nobody" never read as "no".
pub fn parse_answer(response: &str) -> Answer {
    let visible = strip_think_blocks(response);
    let words: Vec<String> = visible
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    match words.first().map(String::as_str) {
        Some("yes") => return Answer::Positive,
        Some("no") => return Answer::Negative,
        _ => {}
    }

    let has_yes = words.iter().any(|w| w == "yes");
    let has_no = words.iter().any(|w| w == "no");
    match (has_yes, has_no) {
        (true, false) => Answer::Positive,
        (false, true) => Answer::Negative,
        _ => Answer::Indeterminate,
    }
}

fn strip_think_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            // Unterminated block: nothing after it is a final answer
            None => return out,
        }
    }
    out.push_str(rest);
    out
}
