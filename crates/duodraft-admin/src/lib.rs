//! DuoDraft admin library.
//!
//! Maintenance commands for a pairing history database: find rounds the
//! adjacency index missed, merge them, rebuild a teacher's index and dump
//! a teacher's rounds.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::AdminConfig;
pub use error::{CliError, Result};
pub use output::Formatter;
