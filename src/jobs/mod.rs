//! Periodic job scheduling

pub mod movie_check;

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub use movie_check::{CycleSummary, MovieCheckJob};

/// A unit of work run once per scheduler tick
#[async_trait]
pub trait PeriodicJob: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Run one cycle. Errors are logged by the scheduler and the loop goes on.
    async fn run_cycle(&self, cancel: &CancellationToken) -> anyhow::Result<()>;
}

/// Runs a job on a fixed interval until cancelled, or exactly once
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    run_once: bool,
}

impl Scheduler {
    pub fn new(interval: Duration, run_once: bool) -> Self {
        Self { interval, run_once }
    }

    /// Drive `job` until done. Returns the number of cycles run.
    pub async fn run<J: PeriodicJob + ?Sized>(&self, job: &J, cancel: &CancellationToken) -> usize {
        if self.run_once {
            info!(job = %job.name(), "Running in single-run mode");
        } else {
            info!(
                job = %job.name(),
                interval_secs = self.interval.as_secs(),
                "Running in continuous mode"
            );
        }

        let mut cycles = 0;
        loop {
            cycles += 1;
            if let Err(e) = job.run_cycle(cancel).await {
                error!(job = %job.name(), error = %e, "Cycle failed, will retry next interval");
            }

            if self.run_once {
                info!(job = %job.name(), "Single run complete");
                break;
            }
            if cancel.is_cancelled() {
                break;
            }

            info!(secs = self.interval.as_secs(), "Sleeping until next check");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(job = %job.name(), cycles, "Scheduler stopped");
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingJob {
        runs: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PeriodicJob for CountingJob {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run_cycle(&self, _cancel: &CancellationToken) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("scan failed");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_once_runs_single_cycle() {
        let job = CountingJob::default();
        let cycles = Scheduler::new(Duration::from_secs(3600), true)
            .run(&job, &CancellationToken::new())
            .await;
        assert_eq!(cycles, 1);
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_cycle_does_not_stop_loop() {
        let job = CountingJob {
            fail: true,
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            stopper.cancel();
        });

        let cycles = Scheduler::new(Duration::from_millis(10), false)
            .run(&job, &cancel)
            .await;
        assert!(cycles >= 2, "expected several cycles, got {cycles}");
    }

    #[tokio::test]
    async fn test_cancel_interrupts_sleep() {
        let job = CountingJob::default();
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopper.cancel();
        });

        let scheduler = Scheduler::new(Duration::from_secs(3600), false);
        let cycles = tokio::time::timeout(Duration::from_secs(5), scheduler.run(&job, &cancel))
            .await
            .expect("scheduler should stop on cancel");
        assert_eq!(cycles, 1);
    }
}
