//! Application configuration management

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::services::logging::LogFormat;
use crate::services::{NtfyConfig, OllamaConfig, RadarrConfig, RetryConfig};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory holding one folder per movie
    pub movies_dir: PathBuf,

    /// Directory of `.checked` marker files
    pub checked_dir: PathBuf,

    /// Ollama base URL
    pub ollama_endpoint: String,

    /// Ollama model name
    pub ollama_model: String,

    pub ollama_timeout_seconds: u64,

    /// Attempts per movie before giving up until the next cycle
    pub classify_max_attempts: u32,

    pub classify_retry_delay_seconds: u64,

    /// Add web search snippets to the prompt
    pub web_search_enabled: bool,

    /// ntfy topic URL
    pub ntfy_url: String,

    pub ntfy_token: Option<String>,

    pub notify_timeout_seconds: u64,

    /// Seconds between cycles
    pub check_interval_seconds: u64,

    /// Run a single cycle and exit
    pub run_once: bool,

    /// Pause between movies within a cycle
    pub candidate_delay_ms: u64,

    /// Delete matched movies from Radarr
    pub delete_enabled: bool,

    pub radarr_url: Option<String>,

    pub radarr_api_key: Option<String>,

    /// Let Radarr remove files from disk when deleting
    pub radarr_delete_files: bool,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            movies_dir: PathBuf::from(get("MOVIES_DIR", "/movies")),
            checked_dir: PathBuf::from(get("CHECKED_DIR", "/checked")),

            ollama_endpoint: get("OLLAMA_ENDPOINT", "http://localhost:11434")
                .trim_end_matches('/')
                .to_string(),
            ollama_model: get("OLLAMA_MODEL", "llama3.2"),
            ollama_timeout_seconds: parse_number("OLLAMA_TIMEOUT_SECONDS", &get("OLLAMA_TIMEOUT_SECONDS", "30"))?,
            classify_max_attempts: parse_number("CLASSIFY_MAX_ATTEMPTS", &get("CLASSIFY_MAX_ATTEMPTS", "3"))?,
            classify_retry_delay_seconds: parse_number(
                "CLASSIFY_RETRY_DELAY_SECONDS",
                &get("CLASSIFY_RETRY_DELAY_SECONDS", "5"),
            )?,
            web_search_enabled: parse_bool(&get("WEB_SEARCH_ENABLED", "true")),

            ntfy_url: get("NTFY_URL", "https://ntfy.sh/mytopic"),
            ntfy_token: optional("NTFY_TOKEN"),
            notify_timeout_seconds: parse_number("NOTIFY_TIMEOUT_SECONDS", &get("NOTIFY_TIMEOUT_SECONDS", "10"))?,

            check_interval_seconds: parse_number("CHECK_INTERVAL", &get("CHECK_INTERVAL", "3600"))?,
            run_once: parse_bool(&get("RUN_ONCE", "false")),
            candidate_delay_ms: parse_number("CANDIDATE_DELAY_MS", &get("CANDIDATE_DELAY_MS", "1000"))?,

            delete_enabled: parse_bool(&get("DELETE_ENABLED", "false")),
            radarr_url: optional("RADARR_URL"),
            radarr_api_key: optional("RADARR_API_KEY"),
            radarr_delete_files: parse_bool(&get("RADARR_DELETE_FILES", "true")),

            log_format: LogFormat::from_value(&get("LOG_FORMAT", "pretty")),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.delete_enabled {
            self.radarr_url
                .as_ref()
                .context("RADARR_URL is required when DELETE_ENABLED is set")?;
            self.radarr_api_key
                .as_ref()
                .context("RADARR_API_KEY is required when DELETE_ENABLED is set")?;
        }
        if self.classify_max_attempts == 0 {
            anyhow::bail!("CLASSIFY_MAX_ATTEMPTS must be at least 1");
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    pub fn candidate_delay(&self) -> Duration {
        Duration::from_millis(self.candidate_delay_ms)
    }

    pub fn ollama(&self) -> OllamaConfig {
        OllamaConfig {
            url: self.ollama_endpoint.clone(),
            model: self.ollama_model.clone(),
            timeout_seconds: self.ollama_timeout_seconds,
            ..OllamaConfig::default()
        }
    }

    pub fn classify_retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.classify_max_attempts,
            initial_interval: Duration::from_secs(self.classify_retry_delay_seconds),
            ..RetryConfig::default()
        }
    }

    pub fn ntfy(&self) -> NtfyConfig {
        NtfyConfig {
            url: self.ntfy_url.clone(),
            token: self.ntfy_token.clone(),
            timeout_seconds: self.notify_timeout_seconds,
        }
    }

    /// Radarr settings, present only when deletion is enabled
    pub fn radarr(&self) -> Option<RadarrConfig> {
        if !self.delete_enabled {
            return None;
        }
        Some(RadarrConfig {
            url: self.radarr_url.clone()?,
            api_key: self.radarr_api_key.clone()?,
            delete_files: self.radarr_delete_files,
            timeout_seconds: 30,
        })
    }

    /// Log the effective configuration with credentials redacted
    pub fn log_summary(&self) {
        tracing::info!(
            movies_dir = %self.movies_dir.display(),
            checked_dir = %self.checked_dir.display(),
            ollama_endpoint = %self.ollama_endpoint,
            ollama_model = %self.ollama_model,
            ntfy_url = %self.ntfy_url,
            web_search = self.web_search_enabled,
            run_once = self.run_once,
            interval_secs = self.check_interval_seconds,
            delete_enabled = self.delete_enabled,
            radarr_url = %self.radarr_url.as_deref().unwrap_or("-"),
            radarr_api_key = if self.radarr_api_key.is_some() { "<set>" } else { "-" },
            "Configuration loaded"
        );
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid {key}: {value:?}"))
}
