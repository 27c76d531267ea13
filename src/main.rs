//! Kapaladaru movie checker entry point

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use kapaladaru::cli::CliOptions;
use kapaladaru::config::Config;
use kapaladaru::jobs::{MovieCheckJob, Scheduler};
use kapaladaru::services::{
    self, DuckDuckGoSearch, FileStateStore, OllamaClassifier, NtfyNotifier, RadarrClient,
    StateStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let mut config = Config::from_env()?;
    CliOptions::from_args().apply(&mut config);

    services::logging::init(config.log_format)?;
    tracing::info!("Starting Kapaladaru movie checker");
    config.log_summary();

    // A missing root at startup is fatal; later scan failures only skip a cycle
    let movies_dir = &config.movies_dir;
    if !movies_dir.is_dir() {
        anyhow::bail!("Movies directory not found: {}", movies_dir.display());
    }

    let store = FileStateStore::open(&config.checked_dir)
        .await
        .with_context(|| format!("State directory is not writable: {}", config.checked_dir.display()))?;
    tracing::info!(count = store.count().await?, "Found already checked movies");

    let cancel = CancellationToken::new();

    let mut classifier = OllamaClassifier::new(config.ollama())
        .context("Failed to create Ollama client")?
        .with_retry(config.classify_retry())
        .with_cancellation(cancel.clone());
    if config.web_search_enabled {
        let search = DuckDuckGoSearch::new(Duration::from_secs(15))?;
        classifier = classifier.with_search(Arc::new(search));
    }

    let notifier = NtfyNotifier::new(config.ntfy()).context("Failed to create ntfy client")?;

    let mut job = MovieCheckJob::new(
        config.movies_dir.clone(),
        Arc::new(store),
        Arc::new(classifier),
        Arc::new(notifier),
    )
    .with_candidate_delay(config.candidate_delay());

    if let Some(radarr) = config.radarr() {
        tracing::info!(url = %radarr.url, delete_files = radarr.delete_files, "Radarr deletion enabled");
        let client = RadarrClient::new(radarr).context("Failed to create Radarr client")?;
        job = job.with_library_manager(Arc::new(client));
    }

    tokio::spawn(shutdown_signal(cancel.clone()));

    Scheduler::new(config.check_interval(), config.run_once)
        .run(&job, &cancel)
        .await;

    tracing::info!("Shut down cleanly");
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}
