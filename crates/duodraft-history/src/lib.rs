//! DuoDraft Pairing History
//!
//! Query service and index maintenance for the pairing history ledger.
//!
//! # Overview
//!
//! The service composes the round store and the adjacency index:
//! - **Save**: append a round, then merge it into the index (retried)
//! - **Latest / by id**: a round plus the co-pairing history of its students
//! - **List**: paged round summaries, newest first
//! - **Rebuild**: replay a teacher's ledger into a fresh index
//! - **Catch-up**: merge rounds the ledger holds but the index missed
//!
//! # Usage
//!
//! ```no_run
//! use duodraft_domain::{NewRound, Pair, StudentId, StudentRef, TeacherId};
//! use duodraft_history::{HistoryConfig, PairHistoryService};
//! use duodraft_store::SqliteStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::new("duodraft.db")?;
//!     let service = PairHistoryService::new(store, HistoryConfig::default());
//!
//!     let teacher = TeacherId::parse("64b7f0c2a1e4d3b2c1a09f8e")?;
//!     let ana = StudentRef::new(StudentId::parse("aaaaaaaaaaaaaaaaaaaaaaaa")?, "Ana");
//!     let bo = StudentRef::new(StudentId::parse("bbbbbbbbbbbbbbbbbbbbbbbb")?, "Bo");
//!
//!     service.save_round(NewRound::new(teacher.clone(), vec![Pair::two(ana, bo)], 1)?).await?;
//!
//!     let latest = service.latest_with_history(&teacher).await?;
//!     println!("{} pairs, {} students with history", latest.round.pairs.len(), latest.previous_pairs.len());
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [history]
//! storage_timeout_ms = 5000
//! merge_retries = 3
//! merge_backoff_ms = 50
//! max_page_size = 100
//! reconcile_interval_secs = 300
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod report;
mod service;
mod worker;

pub use config::HistoryConfig;
pub use error::HistoryError;
pub use report::{RebuildReport, ReconcileReport};
pub use service::{
    HistoryView, PairHistoryService, RoundListing, RoundSummary, RoundWithHistory,
};
pub use worker::ReconcileWorker;
