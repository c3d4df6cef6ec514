//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DuoDraft admin - Maintain the pairing history ledger and its index.
#[derive(Debug, Parser)]
#[command(name = "duodraft-admin")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQLite database file (overrides the config file)
    #[arg(short, long, global = true, env = "DUODRAFT_DATABASE")]
    pub database: Option<PathBuf>,

    /// API config file to read `database_path` and `[history]` from
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, global = true, default_value = "json")]
    pub format: CliFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format
    Table,
    /// JSON format (default)
    Json,
    /// Quiet format (IDs only)
    Quiet,
}

/// Admin commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List rounds that are stored but not merged into the adjacency index
    Check,

    /// Merge every unindexed round into the adjacency index
    CatchUp,

    /// Rebuild a teacher's adjacency records from their ledger
    Rebuild(RebuildArgs),

    /// Show a teacher's rounds, newest first
    History(HistoryArgs),
}

/// Arguments for the rebuild command.
#[derive(Debug, Parser)]
pub struct RebuildArgs {
    /// Teacher object id
    #[arg(short, long)]
    pub teacher: String,
}

/// Arguments for the history command.
#[derive(Debug, Parser)]
pub struct HistoryArgs {
    /// Teacher object id
    #[arg(short, long)]
    pub teacher: String,

    /// Maximum number of rounds
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Rounds to skip
    #[arg(long, default_value = "0")]
    pub offset: usize,
}

impl From<CliFormat> for crate::output::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::output::OutputFormat::Table,
            CliFormat::Json => crate::output::OutputFormat::Json,
            CliFormat::Quiet => crate::output::OutputFormat::Quiet,
        }
    }
}
