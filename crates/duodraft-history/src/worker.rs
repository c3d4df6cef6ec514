//! Background worker that keeps the adjacency index caught up with the ledger

use crate::{HistoryError, PairHistoryService, ReconcileReport};
use duodraft_domain::traits::{AdjacencyIndex, RoundStore};
use std::fmt::Display;
use std::future::Future;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Background worker that runs [`PairHistoryService::catch_up`] on a schedule
///
/// A merge that failed after its round was appended leaves the ledger ahead
/// of the index. The worker finds those rounds and merges them again, which
/// is safe because merging is a set union.
///
/// # Examples
///
/// ```no_run
/// use duodraft_history::{HistoryConfig, PairHistoryService, ReconcileWorker};
/// use duodraft_store::SqliteStore;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = SqliteStore::new("duodraft.db")?;
///     let service = PairHistoryService::new(store, HistoryConfig::default());
///     let mut worker = ReconcileWorker::new(service, Duration::from_secs(300));
///
///     // Run until Ctrl+C
///     worker.run(async { tokio::signal::ctrl_c().await.ok(); }).await;
///     Ok(())
/// }
/// ```
pub struct ReconcileWorker<S> {
    service: PairHistoryService<S>,
    interval: Duration,
    report: ReconcileReport,
}

impl<S> ReconcileWorker<S>
where
    S: RoundStore + AdjacencyIndex + Send + 'static,
    <S as RoundStore>::Error: Display,
    <S as AdjacencyIndex>::Error: Display,
{
    /// Create a worker that ticks every `interval`
    pub fn new(service: PairHistoryService<S>, interval: Duration) -> Self {
        Self {
            service,
            interval,
            report: ReconcileReport::new(),
        }
    }

    /// Run until `shutdown` resolves
    ///
    /// Failed cycles are logged and retried on the next tick.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!("Reconcile worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.cycle().await {
                        tracing::error!("Catch-up cycle failed: {}", e);
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received, stopping reconcile worker");
                    break;
                }
            }
        }

        tracing::info!("Reconcile worker stopped.\n{}", self.report.summary());
    }

    /// Run a fixed number of cycles (useful for testing and one-shot repair)
    ///
    /// # Errors
    ///
    /// Returns the first cycle error.
    pub async fn run_cycles(&mut self, cycles: usize) -> Result<(), HistoryError> {
        let mut ticker = interval(self.interval);

        for cycle in 0..cycles {
            ticker.tick().await;
            tracing::debug!("Starting catch-up cycle {}/{}", cycle + 1, cycles);
            self.cycle().await?;
        }

        tracing::info!("Reconcile worker finished {} cycles.\n{}", cycles, self.report.summary());
        Ok(())
    }

    async fn cycle(&mut self) -> Result<(), HistoryError> {
        let run = self.service.catch_up().await?;
        if !run.is_clean() {
            tracing::warn!(
                "{} rounds remain unindexed after catch-up",
                run.failed.len()
            );
        }
        self.report.absorb(run);
        Ok(())
    }

    /// Cumulative report across all cycles
    pub fn report(&self) -> &ReconcileReport {
        &self.report
    }

    /// Reset the cumulative report
    pub fn reset_report(&mut self) {
        self.report.reset();
    }
}
