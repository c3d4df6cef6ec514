//! Configuration file parsing for the API server.
//!
//! Loads settings from TOML files including bind address, database path,
//! log filter and the `[history]` service table.

use duodraft_history::HistoryConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// API configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// Field present but unusable
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// API configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 8080)
    pub bind_port: u16,

    /// SQLite database file (":memory:" for a throwaway store)
    pub database_path: PathBuf,

    /// Fallback tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Service settings
    #[serde(default)]
    pub history: HistoryConfig,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl ApiConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ApiConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("database_path".to_string()));
        }
        if self.history.storage_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "history.storage_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.history.max_page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "history.max_page_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Create a default configuration for testing
    pub fn default_test_config() -> Self {
        ApiConfig {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8080,
            database_path: PathBuf::from(":memory:"),
            log_filter: default_log_filter(),
            history: HistoryConfig::default(),
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default_test_config();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.database_path, PathBuf::from(":memory:"));
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.history, HistoryConfig::default());
    }

    #[test]
    fn test_bind_addr() {
        let config = ApiConfig::default_test_config();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            bind_address = "0.0.0.0"
            bind_port = 9000
            database_path = "/var/lib/duodraft/history.db"
            log_filter = "duodraft=debug"

            [history]
            storage_timeout_ms = 2000
            merge_retries = 5
            reconcile_interval_secs = 0
        "#;

        let config: ApiConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.log_filter, "duodraft=debug");
        assert_eq!(config.history.storage_timeout_ms, 2000);
        assert_eq!(config.history.merge_retries, 5);
        assert_eq!(config.history.max_page_size, 100);
        assert!(config.history.reconcile_interval().is_none());
    }

    #[test]
    fn test_history_table_optional() {
        let toml = r#"
            bind_address = "127.0.0.1"
            bind_port = 8080
            database_path = "history.db"
        "#;

        let config: ApiConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.history, HistoryConfig::default());
    }

    #[test]
    fn test_from_file_rejects_zero_timeout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "bind_address = \"127.0.0.1\"\nbind_port = 8080\ndatabase_path = \"h.db\"\n\n[history]\nstorage_timeout_ms = 0"
        )
        .unwrap();

        let err = ApiConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_from_file_missing() {
        let err = ApiConfig::from_file("/nonexistent/duodraft.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(_)));
    }
}
