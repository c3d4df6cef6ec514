//! Command-line flags for the API server.

use crate::config::{ApiConfig, ConfigError};
use clap::Parser;
use std::path::PathBuf;

/// DuoDraft API - Serve the pairing history ledger over HTTP.
///
/// Without `--config` the server keeps rounds in an in-memory database.
#[derive(Debug, Parser)]
#[command(name = "duodraft-api")]
#[command(version, about, long_about = None)]
pub struct ServeArgs {
    /// TOML config file (bind address, database, `[history]` table)
    #[arg(short, long, env = "DUODRAFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides `database_path`)
    #[arg(short, long, env = "DUODRAFT_DATABASE")]
    pub database: Option<PathBuf>,

    /// Port to listen on (overrides `bind_port`)
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl ServeArgs {
    /// Whether the server will run without a durable database
    pub fn is_ephemeral(&self) -> bool {
        self.config.is_none() && self.database.is_none()
    }

    /// Load the config file, or the in-memory defaults, then apply overrides
    pub fn into_config(self) -> Result<ApiConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ApiConfig::from_file(path)?,
            None => ApiConfig::default_test_config(),
        };
        if let Some(database) = self.database {
            config.database_path = database;
        }
        if let Some(port) = self.port {
            config.bind_port = port;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_no_flags_is_in_memory() {
        let args = ServeArgs::parse_from(["duodraft-api"]);
        assert!(args.is_ephemeral());
        let config = args.into_config().unwrap();
        assert_eq!(config.database_path, PathBuf::from(":memory:"));
        assert_eq!(config.bind_port, 8080);
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bind_address = "0.0.0.0"
bind_port = 9000
database_path = "/var/lib/duodraft/history.db"
"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let path = path.as_str();

        let from_file = ServeArgs::parse_from(["duodraft-api", "--config", path])
            .into_config()
            .unwrap();
        assert_eq!(from_file.bind_addr(), "0.0.0.0:9000");

        let args = ServeArgs::parse_from([
            "duodraft-api",
            "-c",
            path,
            "--database",
            "other.db",
            "-p",
            "9100",
        ]);
        assert!(!args.is_ephemeral());
        let config = args.into_config().unwrap();
        assert_eq!(config.database_path, PathBuf::from("other.db"));
        assert_eq!(config.bind_port, 9100);
        assert_eq!(config.bind_address, "0.0.0.0");
    }

    #[test]
    fn test_missing_config_file_fails() {
        let args =
            ServeArgs::parse_from(["duodraft-api", "--config", "/nonexistent/duodraft.toml"]);
        assert!(matches!(args.into_config(), Err(ConfigError::FileRead(_))));
    }
}
