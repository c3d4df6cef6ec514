//! Error types for the admin tool.

use duodraft_domain::IdError;
use duodraft_history::HistoryError;
use duodraft_store::StoreError;
use thiserror::Error;

/// Result type alias for admin operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Admin-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database could not be opened
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Service call failed
    #[error("{0}")]
    History(#[from] HistoryError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed identifier argument
    #[error("Invalid input: {0}")]
    InvalidId(#[from] IdError),

    /// Some rounds still could not be indexed
    #[error("{0} round(s) remain unindexed; run `rebuild` for the affected teachers")]
    Unreconciled(usize),
}
