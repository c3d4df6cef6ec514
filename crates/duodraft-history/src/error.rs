//! Error types for pairing history operations

use duodraft_domain::{RoundId, TeacherId, ValidationError};
use std::fmt::Display;
use thiserror::Error;

/// Errors that can occur while saving or querying pairing history
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Submission rejected before reaching storage
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The teacher has not saved any rounds yet
    #[error("No pair history found for teacher {teacher_id}")]
    NoHistory {
        /// Teacher that was queried
        teacher_id: TeacherId,
    },

    /// No round with this id belongs to the teacher
    #[error("Round {round_id} not found for teacher {teacher_id}")]
    RoundNotFound {
        /// Teacher that was queried
        teacher_id: TeacherId,
        /// Requested round
        round_id: RoundId,
    },

    /// Storage layer error
    #[error("Storage error during {operation}: {message}")]
    Storage {
        /// Operation that failed
        operation: &'static str,
        /// Underlying error text
        message: String,
    },

    /// A storage call did not complete in time
    #[error("Storage timeout during {operation}")]
    StorageTimeout {
        /// Operation that timed out
        operation: &'static str,
    },

    /// The round is in the ledger but its merge into the index failed
    #[error("Round {round_id} for teacher {teacher_id} is stored but not indexed: {message}")]
    IndexInconsistency {
        /// Owning teacher
        teacher_id: TeacherId,
        /// Round that is missing from the index
        round_id: RoundId,
        /// Last merge error
        message: String,
    },
}

impl HistoryError {
    pub(crate) fn storage(operation: &'static str, err: impl Display) -> Self {
        HistoryError::Storage {
            operation,
            message: err.to_string(),
        }
    }

    /// Whether this is an expected "nothing there" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            HistoryError::NoHistory { .. } | HistoryError::RoundNotFound { .. }
        )
    }

    /// Whether the caller is at fault (validation or lookup misses)
    pub fn is_client_error(&self) -> bool {
        matches!(self, HistoryError::Validation(_)) || self.is_not_found()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let teacher_id = TeacherId::parse("64b7f0c2a1e4d3b2c1a09f8e").unwrap();
        let no_history = HistoryError::NoHistory {
            teacher_id: teacher_id.clone(),
        };
        assert!(no_history.is_not_found());
        assert!(no_history.is_client_error());

        let timeout = HistoryError::StorageTimeout { operation: "merge" };
        assert!(!timeout.is_not_found());
        assert!(!timeout.is_client_error());

        let validation = HistoryError::from(ValidationError::EmptyPairs);
        assert!(validation.is_client_error());
    }

    #[test]
    fn test_storage_message() {
        let err = HistoryError::storage("latest_round", "disk I/O error");
        assert_eq!(err.to_string(), "Storage error during latest_round: disk I/O error");
    }
}
