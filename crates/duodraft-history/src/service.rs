//! Query service over the round store and adjacency index
//!
//! Every storage call runs on the blocking pool and is bounded by the
//! configured storage timeout. Reads that join a round with its adjacency
//! map do both under one lock so they observe a single state.

use crate::{HistoryConfig, HistoryError, RebuildReport, ReconcileReport};
use duodraft_domain::traits::{AdjacencyIndex, RoundPage, RoundStore};
use duodraft_domain::{AdjacencyMap, NewRound, Round, RoundId, StudentId, TeacherId};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument, warn};

/// Which adjacency state to attach to a historical round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryView {
    /// Everything in the index now, including rounds saved after this one
    #[default]
    Current,

    /// Only rounds up to and including this one, replayed from the ledger
    AsOfRound,
}

/// A round together with the co-pairing history of its students
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundWithHistory {
    /// The round
    pub round: Round,

    /// Previous partners of every student in the round
    pub previous_pairs: AdjacencyMap,
}

/// Lightweight listing entry, no adjacency resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    /// Round id
    pub id: RoundId,
    /// Creation time, Unix milliseconds
    pub created_at: u64,
    /// Shuffle number tag
    pub shuffle_number: u32,
    /// Number of pairs (including a single leftover)
    pub pair_count: usize,
    /// Number of students in the round
    pub student_count: usize,
}

impl From<&Round> for RoundSummary {
    fn from(round: &Round) -> Self {
        Self {
            id: round.id,
            created_at: round.created_at,
            shuffle_number: round.shuffle_number,
            pair_count: round.pairs.len(),
            student_count: round.student_ids().len(),
        }
    }
}

/// One page of a teacher's rounds, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundListing {
    /// Total rounds stored for the teacher
    pub total: u64,
    /// Offset this page starts at
    pub offset: usize,
    /// Rounds on this page
    pub rounds: Vec<RoundSummary>,
}

/// Pairing history service
///
/// Cloning is cheap; clones share the same store handle.
pub struct PairHistoryService<S> {
    store: Arc<Mutex<S>>,
    config: HistoryConfig,
}

impl<S> Clone for PairHistoryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S> PairHistoryService<S>
where
    S: RoundStore + AdjacencyIndex + Send + 'static,
    <S as RoundStore>::Error: Display,
    <S as AdjacencyIndex>::Error: Display,
{
    /// Create a service that takes ownership of a store
    pub fn new(store: S, config: HistoryConfig) -> Self {
        Self::from_shared(Arc::new(Mutex::new(store)), config)
    }

    /// Create a service over a store handle shared with other components
    pub fn from_shared(store: Arc<Mutex<S>>, config: HistoryConfig) -> Self {
        Self { store, config }
    }

    /// Service configuration
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    async fn with_store<T, F>(&self, operation: &'static str, f: F) -> Result<T, HistoryError>
    where
        F: FnOnce(&mut S) -> Result<T, HistoryError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || {
            let mut guard = store
                .lock()
                .map_err(|_| HistoryError::storage(operation, "store mutex poisoned"))?;
            f(&mut *guard)
        });

        let result = match timeout(self.config.storage_timeout(), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(HistoryError::storage(
                operation,
                format!("task join error: {}", join_err),
            )),
            Err(_) => Err(HistoryError::StorageTimeout { operation }),
        };

        match &result {
            Err(e @ HistoryError::Storage { .. }) => error!(operation, error = %e, "storage call failed"),
            Err(HistoryError::StorageTimeout { .. }) => error!(
                operation,
                timeout_ms = self.config.storage_timeout_ms,
                "storage call timed out"
            ),
            _ => {}
        }
        result
    }

    /// Append a round to the ledger and merge it into the adjacency index
    ///
    /// The merge is retried `merge_retries` times. If it still fails the
    /// round stays in the ledger, unindexed, and `IndexInconsistency` is
    /// returned; [`Self::catch_up`] or [`Self::rebuild_index`] repairs it.
    #[instrument(skip(self, new_round), fields(teacher_id = %new_round.teacher_id()))]
    pub async fn save_round(&self, new_round: NewRound) -> Result<Round, HistoryError> {
        let round = self
            .with_store("append_round", move |store| {
                store
                    .append_round(new_round)
                    .map_err(|e| HistoryError::storage("append_round", e))
            })
            .await?;

        info!(
            round_id = %round.id,
            pairs = round.pairs.len(),
            shuffle_number = round.shuffle_number,
            "round appended"
        );

        self.merge_with_retry(&round).await?;
        Ok(round)
    }

    async fn merge_with_retry(&self, round: &Round) -> Result<(), HistoryError> {
        let attempts = self.config.merge_retries + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            let to_merge = round.clone();
            let merged = self
                .with_store("merge", move |store| {
                    store
                        .merge(&to_merge)
                        .map_err(|e| HistoryError::storage("merge", e))
                })
                .await;

            match merged {
                Ok(()) => {
                    debug!(round_id = %round.id, attempt, "round merged into adjacency index");
                    return Ok(());
                }
                Err(e) => {
                    warn!(round_id = %round.id, attempt, attempts, error = %e, "merge failed");
                    last_error = Some(e);
                    if attempt < attempts {
                        sleep(self.config.merge_backoff()).await;
                    }
                }
            }
        }

        let message = last_error.map(|e| e.to_string()).unwrap_or_default();
        error!(
            teacher_id = %round.teacher_id,
            round_id = %round.id,
            operation = "merge",
            needs_rebuild = true,
            %message,
            "ledger is ahead of adjacency index"
        );
        Err(HistoryError::IndexInconsistency {
            teacher_id: round.teacher_id.clone(),
            round_id: round.id,
            message,
        })
    }

    /// Latest round for a teacher plus the history of its students
    #[instrument(skip(self), fields(teacher_id = %teacher))]
    pub async fn latest_with_history(
        &self,
        teacher: &TeacherId,
    ) -> Result<RoundWithHistory, HistoryError> {
        let teacher_id = teacher.clone();
        let found = self
            .with_store("latest_with_history", move |store| {
                let Some(round) = store
                    .latest_round(&teacher_id)
                    .map_err(|e| HistoryError::storage("latest_round", e))?
                else {
                    return Ok(None);
                };
                let previous_pairs = store
                    .resolve(&round.student_ids())
                    .map_err(|e| HistoryError::storage("resolve", e))?;
                Ok(Some(RoundWithHistory {
                    round,
                    previous_pairs,
                }))
            })
            .await?;

        match found {
            Some(found) => {
                debug!(round_id = %found.round.id, "latest round resolved");
                Ok(found)
            }
            None => {
                debug!("teacher has no pair history yet");
                Err(HistoryError::NoHistory {
                    teacher_id: teacher.clone(),
                })
            }
        }
    }

    /// A specific round plus the history of its students
    #[instrument(skip(self), fields(teacher_id = %teacher, round_id = %round_id))]
    pub async fn round_with_history(
        &self,
        teacher: &TeacherId,
        round_id: RoundId,
        view: HistoryView,
    ) -> Result<RoundWithHistory, HistoryError> {
        let teacher_id = teacher.clone();
        let found = self
            .with_store("round_with_history", move |store| {
                let Some(round) = store
                    .get_round(&teacher_id, round_id)
                    .map_err(|e| HistoryError::storage("get_round", e))?
                else {
                    return Ok(None);
                };
                let students = round.student_ids();

                let previous_pairs = match view {
                    HistoryView::Current => store
                        .resolve(&students)
                        .map_err(|e| HistoryError::storage("resolve", e))?,
                    HistoryView::AsOfRound => {
                        let ledger = store
                            .list_rounds(&teacher_id, &RoundPage::all())
                            .map_err(|e| HistoryError::storage("list_rounds", e))?;
                        let cutoff = round.order_key();
                        AdjacencyMap::from_rounds(ledger.iter().filter(|r| r.order_key() <= cutoff))
                            .restrict(&students)
                    }
                };

                Ok(Some(RoundWithHistory {
                    round,
                    previous_pairs,
                }))
            })
            .await?;

        found.ok_or_else(|| HistoryError::RoundNotFound {
            teacher_id: teacher.clone(),
            round_id,
        })
    }

    /// Page through a teacher's rounds, newest first
    ///
    /// A requested limit is capped at `max_page_size`; no limit returns every
    /// round.
    #[instrument(skip(self), fields(teacher_id = %teacher))]
    pub async fn list_rounds(
        &self,
        teacher: &TeacherId,
        page: RoundPage,
    ) -> Result<RoundListing, HistoryError> {
        let page = RoundPage {
            offset: page.offset,
            limit: page.limit.map(|l| l.min(self.config.max_page_size)),
        };
        let teacher_id = teacher.clone();

        self.with_store("list_rounds", move |store| {
            let total = store
                .count_rounds(&teacher_id)
                .map_err(|e| HistoryError::storage("count_rounds", e))?;
            let rounds = store
                .list_rounds(&teacher_id, &page)
                .map_err(|e| HistoryError::storage("list_rounds", e))?;
            Ok(RoundListing {
                total,
                offset: page.offset,
                rounds: rounds.iter().map(RoundSummary::from).collect(),
            })
        })
        .await
    }

    /// Current partners of the given students
    pub async fn resolve(&self, students: BTreeSet<StudentId>) -> Result<AdjacencyMap, HistoryError> {
        self.with_store("resolve", move |store| {
            store
                .resolve(&students)
                .map_err(|e| HistoryError::storage("resolve", e))
        })
        .await
    }

    /// Rebuild the adjacency records of a teacher's students from the ledger
    ///
    /// Every student in the teacher's rounds is reset, then every round that
    /// mentions one of them is replayed, including rounds saved under other
    /// teachers. Edges between students outside the teacher's ledger are
    /// untouched.
    #[instrument(skip(self), fields(teacher_id = %teacher))]
    pub async fn rebuild_index(&self, teacher: &TeacherId) -> Result<RebuildReport, HistoryError> {
        let teacher_id = teacher.clone();
        let report = self
            .with_store("rebuild_index", move |store| {
                let own = store
                    .list_rounds(&teacher_id, &RoundPage::all())
                    .map_err(|e| HistoryError::storage("list_rounds", e))?;
                let students: BTreeSet<StudentId> =
                    own.iter().flat_map(Round::student_ids).collect();
                let rounds = store
                    .rounds_with_students(&students)
                    .map_err(|e| HistoryError::storage("rounds_with_students", e))?;
                store
                    .rebuild(&students, &rounds)
                    .map_err(|e| HistoryError::storage("rebuild", e))?;
                Ok(RebuildReport {
                    teacher_id,
                    rounds_replayed: rounds.len(),
                    students_reset: students.len(),
                })
            })
            .await?;

        info!(
            rounds_replayed = report.rounds_replayed,
            students_reset = report.students_reset,
            "adjacency index rebuilt"
        );
        Ok(report)
    }

    /// Merge every round the ledger holds that the index has not seen
    pub async fn catch_up(&self) -> Result<ReconcileReport, HistoryError> {
        let report = self
            .with_store("catch_up", |store| {
                let pending = store
                    .unindexed_rounds()
                    .map_err(|e| HistoryError::storage("unindexed_rounds", e))?;

                let mut report = ReconcileReport::new();
                report.cycles = 1;
                for round in &pending {
                    match store.merge(round) {
                        Ok(()) => report.record_merged(),
                        Err(e) => {
                            error!(
                                teacher_id = %round.teacher_id,
                                round_id = %round.id,
                                operation = "catch_up",
                                needs_rebuild = true,
                                error = %e,
                                "merge failed during catch-up"
                            );
                            report.record_failure(round.id);
                        }
                    }
                }
                Ok(report)
            })
            .await?;

        if report.rounds_merged > 0 || !report.is_clean() {
            info!(
                merged = report.rounds_merged,
                failed = report.failed.len(),
                "index catch-up finished"
            );
        }
        Ok(report)
    }

    /// Ledger rounds not yet merged into the index, oldest first
    pub async fn pending_rounds(&self) -> Result<Vec<Round>, HistoryError> {
        self.with_store("unindexed_rounds", |store| {
            store
                .unindexed_rounds()
                .map_err(|e| HistoryError::storage("unindexed_rounds", e))
        })
        .await
    }

    /// Number of ledger rounds not yet merged into the index
    pub async fn pending_index_count(&self) -> Result<usize, HistoryError> {
        self.pending_rounds().await.map(|rounds| rounds.len())
    }
}
