//! Configuration for the pairing history service
//!
//! Storage timeouts, merge retry policy, paging limits and the background
//! reconcile interval.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`crate::PairHistoryService`] and [`crate::ReconcileWorker`]
///
/// # Examples
///
/// ```
/// use duodraft_history::HistoryConfig;
///
/// let config = HistoryConfig::default();
/// assert_eq!(config.merge_retries, 3);
/// assert_eq!(config.storage_timeout().as_millis(), 5000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Upper bound for a single storage call, in milliseconds
    #[serde(default = "default_storage_timeout_ms")]
    pub storage_timeout_ms: u64,

    /// Extra attempts to merge a round into the index after the first one fails
    #[serde(default = "default_merge_retries")]
    pub merge_retries: u32,

    /// Pause between merge attempts, in milliseconds
    #[serde(default = "default_merge_backoff_ms")]
    pub merge_backoff_ms: u64,

    /// Largest page a round listing may request
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// How often the reconcile worker merges unindexed rounds, in seconds.
    /// 0 disables the worker.
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
}

fn default_storage_timeout_ms() -> u64 {
    5000
}

fn default_merge_retries() -> u32 {
    3
}

fn default_merge_backoff_ms() -> u64 {
    50
}

fn default_max_page_size() -> usize {
    100
}

fn default_reconcile_interval_secs() -> u64 {
    300
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            storage_timeout_ms: default_storage_timeout_ms(),
            merge_retries: default_merge_retries(),
            merge_backoff_ms: default_merge_backoff_ms(),
            max_page_size: default_max_page_size(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
        }
    }
}

impl HistoryConfig {
    /// Storage timeout as Duration
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }

    /// Merge backoff as Duration
    pub fn merge_backoff(&self) -> Duration {
        Duration::from_millis(self.merge_backoff_ms)
    }

    /// Reconcile interval, `None` when the worker is disabled
    pub fn reconcile_interval(&self) -> Option<Duration> {
        (self.reconcile_interval_secs > 0).then(|| Duration::from_secs(self.reconcile_interval_secs))
    }
}
