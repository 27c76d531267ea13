//! External service integrations and local storage

pub mod logging;
pub mod notifications;
pub mod ollama;
pub mod radarr;
pub mod retry;
pub mod scanner;
pub mod search;
pub mod state_store;
pub mod text_utils;

pub use notifications::{NotificationError, Notifier, NtfyConfig, NtfyNotifier};
pub use ollama::{ClassificationError, Classifier, OllamaClassifier, OllamaConfig};
pub use radarr::{DeletionError, LibraryManager, RadarrClient, RadarrConfig};
pub use retry::RetryConfig;
pub use scanner::{ScanError, list_candidates};
pub use search::{DuckDuckGoSearch, WebSearch};
pub use state_store::{FileStateStore, MemoryStateStore, StateStore, StoreError};
