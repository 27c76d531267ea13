//! Push notifications for matched movies
//!
//! Delivery is fire-and-forget: a failed push is reported to the caller, who
//! logs it and moves on. Nothing is retried and nothing is persisted.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("failed to send notification: {0}")]
    Request(#[from] reqwest::Error),

    #[error("notification endpoint returned status {status}")]
    Status { status: u16 },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Alert that `movie_name` was identified as a match
    async fn notify(&self, movie_name: &str) -> Result<(), NotificationError>;
}

/// Notification service configuration
#[derive(Debug, Clone)]
pub struct NtfyConfig {
    /// Full topic URL, e.g. `https://ntfy.sh/mytopic`
    pub url: String,
    /// Access token for protected topics
    pub token: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for NtfyConfig {
    fn default() -> Self {
        Self {
            url: "https://ntfy.sh/mytopic".to_string(),
            token: None,
            timeout_seconds: 10,
        }
    }
}

/// Publishes plain-text messages to an ntfy topic
pub struct NtfyNotifier {
    client: reqwest::Client,
    config: NtfyConfig,
}

impl NtfyNotifier {
    pub fn new(config: NtfyConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }
}

pub fn message_for(movie_name: &str) -> String {
    format!("Found Indian movie: {movie_name}")
}

#[async_trait]
impl Notifier for NtfyNotifier {
    async fn notify(&self, movie_name: &str) -> Result<(), NotificationError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .header("Title", "New Indian Movie Found")
            .header("Priority", "default")
            .header("Tags", "movie,bollywood")
            .body(message_for(movie_name));

        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(NotificationError::Status {
                status: response.status().as_u16(),
            });
        }

        info!(movie = %movie_name, "Notification sent");
        Ok(())
    }
}
