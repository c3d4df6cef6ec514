//! Configuration for the admin tool.
//!
//! Reads the API server's TOML file so both point at the same database.
//! Keys the admin tool does not use are ignored.

use crate::error::{CliError, Result};
use duodraft_history::HistoryConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Admin configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Service settings
    #[serde(default)]
    pub history: HistoryConfig,
}

impl AdminConfig {
    /// Load configuration from an API config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AdminConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the effective configuration from command-line flags.
    ///
    /// `--database` wins over the file's `database_path`. One of the two
    /// must be given.
    pub fn resolve(database: Option<PathBuf>, config: Option<&Path>) -> Result<Self> {
        let mut resolved = match config {
            Some(path) => Self::load(path)?,
            None => {
                let database_path = database.clone().ok_or_else(|| {
                    CliError::Config("pass --database or --config".to_string())
                })?;
                Self {
                    database_path,
                    history: HistoryConfig::default(),
                }
            }
        };

        if let Some(database) = database {
            resolved.database_path = database;
        }
        Ok(resolved)
    }
}
