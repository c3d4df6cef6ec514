//! DuoDraft Pairing History API
//!
//! HTTP boundary for saving pairing rounds and reading them back with the
//! co-pairing history of their students. Runs the reconcile worker next to
//! the server so rounds whose index merge failed are picked up again.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod dto;
pub mod handlers;

use config::ApiConfig;
use duodraft_history::{PairHistoryService, ReconcileWorker};
use duodraft_store::{SqliteStore, StoreError};
use handlers::{create_router, AppState};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Database could not be opened
    #[error("Failed to open database: {0}")]
    Storage(#[from] StoreError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured filter. Calling this twice is a no-op.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Open the store and build the service described by `config`
pub fn build_service(config: &ApiConfig) -> Result<PairHistoryService<SqliteStore>, ServerError> {
    let store = SqliteStore::new(&config.database_path)?;
    Ok(PairHistoryService::new(store, config.history.clone()))
}

/// Start the HTTP server
///
/// Opens the database, spawns the reconcile worker (unless disabled) and
/// serves until Ctrl+C.
pub async fn start_server(config: ApiConfig) -> Result<(), ServerError> {
    init_tracing(&config.log_filter);

    info!("Starting DuoDraft pairing history API");
    info!("Bind address: {}", config.bind_addr());
    info!("Database: {}", config.database_path.display());

    let service = build_service(&config)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = match config.history.reconcile_interval() {
        Some(interval) => {
            let mut worker = ReconcileWorker::new(service.clone(), interval);
            let mut rx = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                worker
                    .run(async move {
                        let _ = rx.changed().await;
                    })
                    .await;
            }))
        }
        None => {
            warn!("Reconcile worker disabled; unindexed rounds need a manual catch-up");
            None
        }
    };

    let app = create_router(AppState::new(service));

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("API listening on {}", config.bind_addr());

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await
        .map_err(|e| ServerError::Server(e.to_string()));

    let _ = shutdown_tx.send(true);
    if let Some(handle) = worker {
        if let Err(e) = handle.await {
            warn!("Reconcile worker ended abnormally: {}", e);
        }
    }

    served
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config() {
        let config = ApiConfig::default_test_config();
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.history.storage_timeout_ms, 5000);
    }

    #[tokio::test]
    async fn test_build_service_in_memory() {
        let service = build_service(&ApiConfig::default_test_config()).unwrap();
        assert_eq!(service.pending_index_count().await.unwrap(), 0);
    }

    #[test]
    fn test_build_service_bad_path() {
        let mut config = ApiConfig::default_test_config();
        config.database_path = "/nonexistent-dir/duodraft/history.db".into();
        assert!(matches!(build_service(&config), Err(ServerError::Storage(_))));
    }
}
