//! DuoDraft Domain Layer
//!
//! Core model for the pairing history ledger: the rounds a teacher saves and
//! the adjacency index derived from them. It defines value objects,
//! validation, and the storage traits every other crate depends upon.
//!
//! ## Key Concepts
//!
//! - **Round**: one saved pairing assignment; immutable once stored
//! - **Pair**: two students, or one left over when the count is odd
//! - **Adjacency Index**: per-student set of everyone they have been paired with
//! - **Ledger**: the append-only round store, the source of truth
//!
//! ## Architecture
//!
//! - Pure logic and trait definitions only
//! - Infrastructure implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adjacency;
pub mod id;
pub mod round;
pub mod traits;

// Re-exports for convenience
pub use adjacency::{AdjacencyMap, AdjacencyRecord};
pub use id::{IdError, StudentId, TeacherId};
pub use round::{NewRound, Pair, Round, RoundId, StudentRef, ValidationError};
