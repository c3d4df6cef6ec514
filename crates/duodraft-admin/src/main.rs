//! DuoDraft admin - maintenance commands for the pairing history database.

use anyhow::Context;
use clap::Parser;
use duodraft_admin::commands;
use duodraft_admin::{AdminConfig, Cli, Command, Formatter};
use duodraft_history::PairHistoryService;
use duodraft_store::SqliteStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();

    // Service logs go to stderr so JSON on stdout stays clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = AdminConfig::resolve(cli.database.clone(), cli.config.as_deref())
        .context("failed to load configuration")?;
    let store = SqliteStore::new(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;
    let service = PairHistoryService::new(store, config.history);

    let formatter = Formatter::new(cli.format.into(), !cli.no_color);

    match cli.command {
        Command::Check => {
            let pending = commands::execute_check(&service, &formatter).await?;
            // Exit 2 while rounds are waiting for the index
            return Ok(if pending == 0 { 0 } else { 2 });
        }
        Command::CatchUp => commands::execute_catch_up(&service, &formatter).await?,
        Command::Rebuild(args) => commands::execute_rebuild(args, &service, &formatter).await?,
        Command::History(args) => commands::execute_history(args, &service, &formatter).await?,
    }

    Ok(0)
}
