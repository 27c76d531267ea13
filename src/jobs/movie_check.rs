//! Movie check job: scan, skip checked, classify, notify, delete, record
//!
//! Ordering per movie is fixed. A movie is recorded only after the
//! classifier gave a clear answer. A failed or unclear classification leaves
//! no record, so the movie comes up again next cycle. Notification and
//! deletion failures are logged and never stop the record from being written.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::PeriodicJob;
use crate::models::Candidate;
use crate::services::{
    Classifier, LibraryManager, Notifier, ScanError, StateStore, list_candidates,
};

/// Counters for one pass over the movies directory
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    /// Folders found under the root
    pub found: usize,
    /// Folders skipped because a record already existed
    pub already_checked: usize,
    /// Newly classified and recorded
    pub checked: usize,
    pub matches: usize,
    /// Classification failed or was unclear; will be retried
    pub failed: usize,
    pub notify_failures: usize,
    pub deleted: usize,
    pub delete_failures: usize,
    pub store_errors: usize,
    /// Stopped early because shutdown was requested
    pub interrupted: bool,
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} folders, {} already checked, {} newly checked ({} matches), {} failed",
            self.found, self.already_checked, self.checked, self.matches, self.failed
        )?;
        if self.notify_failures > 0 {
            write!(f, ", {} notifications failed", self.notify_failures)?;
        }
        if self.deleted > 0 || self.delete_failures > 0 {
            write!(f, ", {} deleted, {} deletions failed", self.deleted, self.delete_failures)?;
        }
        if self.store_errors > 0 {
            write!(f, ", {} state store errors", self.store_errors)?;
        }
        if self.interrupted {
            write!(f, " (interrupted)")?;
        }
        Ok(())
    }
}

pub struct MovieCheckJob {
    movies_dir: PathBuf,
    store: Arc<dyn StateStore>,
    classifier: Arc<dyn Classifier>,
    notifier: Arc<dyn Notifier>,
    library: Option<Arc<dyn LibraryManager>>,
    candidate_delay: Duration,
}

impl MovieCheckJob {
    pub fn new(
        movies_dir: impl Into<PathBuf>,
        store: Arc<dyn StateStore>,
        classifier: Arc<dyn Classifier>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            movies_dir: movies_dir.into(),
            store,
            classifier,
            notifier,
            library: None,
            candidate_delay: Duration::ZERO,
        }
    }

    /// Delete matches from this library manager
    pub fn with_library_manager(mut self, library: Arc<dyn LibraryManager>) -> Self {
        self.library = Some(library);
        self
    }

    /// Pause between movies so the backends are not hammered
    pub fn with_candidate_delay(mut self, delay: Duration) -> Self {
        self.candidate_delay = delay;
        self
    }

    /// Run one full cycle. Only a failed scan aborts it.
    pub async fn check_movies(&self, cancel: &CancellationToken) -> Result<CycleSummary, ScanError> {
        let candidates = list_candidates(&self.movies_dir)?;
        let mut summary = CycleSummary {
            found: candidates.len(),
            ..Default::default()
        };

        let mut pending = Vec::new();
        for candidate in candidates {
            match self.store.has(&candidate.name).await {
                Ok(true) => summary.already_checked += 1,
                Ok(false) => pending.push(candidate),
                Err(e) => {
                    // Unknown state, try again next cycle
                    warn!(movie = %candidate.name, error = %e, "Could not read state, skipping");
                    summary.store_errors += 1;
                }
            }
        }

        info!(
            new = pending.len(),
            already_checked = summary.already_checked,
            "Found new movies to check"
        );

        let total = pending.len();
        for (index, candidate) in pending.iter().enumerate() {
            if index > 0 && !self.candidate_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.candidate_delay) => {}
                }
            }
            if cancel.is_cancelled() {
                info!(remaining = total - index, "Shutdown requested, stopping cycle early");
                summary.interrupted = true;
                break;
            }

            info!(movie = %candidate.name, "Processing movie {}/{}", index + 1, total);
            self.process(candidate, &mut summary).await;
        }

        Ok(summary)
    }

    async fn process(&self, candidate: &Candidate, summary: &mut CycleSummary) {
        let name = candidate.name.as_str();

        let verdict = match self.classifier.classify(name).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(movie = %name, error = %e, "Classification failed, will retry next cycle");
                summary.failed += 1;
                return;
            }
        };

        if verdict.is_match {
            summary.matches += 1;
            info!(movie = %name, "Identified as Indian movie");

            if let Err(e) = self.notifier.notify(name).await {
                warn!(movie = %name, error = %e, "Failed to send notification");
                summary.notify_failures += 1;
            }

            if let Some(library) = &self.library {
                match library.delete_title(name).await {
                    Ok(()) => summary.deleted += 1,
                    Err(e) => {
                        warn!(movie = %name, error = %e, "Failed to delete movie from library");
                        summary.delete_failures += 1;
                    }
                }
            }
        } else {
            info!(movie = %name, "Not an Indian movie");
        }

        match self.store.record(name, &verdict).await {
            Ok(()) => summary.checked += 1,
            Err(e) => {
                error!(movie = %name, error = %e, "Failed to mark movie as checked");
                summary.store_errors += 1;
            }
        }
    }
}

#[async_trait]
impl PeriodicJob for MovieCheckJob {
    fn name(&self) -> &str {
        "movie-check"
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> anyhow::Result<()> {
        let summary = self.check_movies(cancel).await?;
        info!(
            found = summary.found,
            checked = summary.checked,
            matches = summary.matches,
            failed = summary.failed,
            "Processing complete: {summary}"
        );
        Ok(())
    }
}
