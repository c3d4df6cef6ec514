//! Trait definitions for storage
//!
//! These traits define the boundary between the pairing history logic and
//! the infrastructure that persists it. Implementations live in other crates.

use crate::{AdjacencyMap, NewRound, Round, RoundId, StudentId, TeacherId};
use std::collections::BTreeSet;

/// Append-only ledger of pairing rounds
///
/// Implemented by the infrastructure layer (duodraft-store)
pub trait RoundStore {
    /// Error type for store operations
    type Error;

    /// Persist a validated round, assigning its id, timestamp and sequence
    fn append_round(&mut self, round: NewRound) -> Result<Round, Self::Error>;

    /// The round with the greatest `(created_at, sequence)` for a teacher
    fn latest_round(&self, teacher: &TeacherId) -> Result<Option<Round>, Self::Error>;

    /// A round by id, only if it belongs to `teacher`
    fn get_round(&self, teacher: &TeacherId, id: RoundId) -> Result<Option<Round>, Self::Error>;

    /// Rounds for a teacher, newest first
    fn list_rounds(&self, teacher: &TeacherId, page: &RoundPage) -> Result<Vec<Round>, Self::Error>;

    /// Number of rounds stored for a teacher
    fn count_rounds(&self, teacher: &TeacherId) -> Result<u64, Self::Error>;

    /// Rounds whose merge into the adjacency index has not been recorded,
    /// oldest first
    fn unindexed_rounds(&self) -> Result<Vec<Round>, Self::Error>;

    /// Every round, under any teacher, in which one of `students` appears,
    /// oldest first
    fn rounds_with_students(&self, students: &BTreeSet<StudentId>) -> Result<Vec<Round>, Self::Error>;
}

/// Derived per-student adjacency index
///
/// Implemented by the infrastructure layer (duodraft-store)
pub trait AdjacencyIndex {
    /// Error type for index operations
    type Error;

    /// Add the symmetric edges of `round` and record it as indexed
    ///
    /// Must be safe to call more than once for the same round.
    fn merge(&mut self, round: &Round) -> Result<(), Self::Error>;

    /// Current partners of each requested student; students without history
    /// map to an empty set
    fn resolve(&self, students: &BTreeSet<StudentId>) -> Result<AdjacencyMap, Self::Error>;

    /// Drop every edge touching the given students, in both directions
    fn clear(&mut self, students: &BTreeSet<StudentId>) -> Result<(), Self::Error>;

    /// Clear `students`, then replay `rounds`
    ///
    /// `rounds` must hold every ledger round containing one of `students`
    /// (see [`RoundStore::rounds_with_students`]); otherwise edges from the
    /// missing rounds are lost. Edges not touching `students` are left alone.
    ///
    /// The default clears and merges one round at a time; stores with
    /// transactions should override it to apply atomically.
    fn rebuild(&mut self, students: &BTreeSet<StudentId>, rounds: &[Round]) -> Result<(), Self::Error> {
        self.clear(students)?;
        for round in rounds {
            self.merge(round)?;
        }
        Ok(())
    }
}

/// Paging window for round listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundPage {
    /// Rounds to skip from the newest
    pub offset: usize,

    /// Maximum rounds to return; `None` returns the rest
    pub limit: Option<usize>,
}

impl RoundPage {
    /// Every round
    pub fn all() -> Self {
        Self::default()
    }

    /// A bounded window
    pub fn window(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }
}
