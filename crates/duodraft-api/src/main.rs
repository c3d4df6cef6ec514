//! DuoDraft pairing history API server

use clap::Parser;
use duodraft_api::{cli::ServeArgs, start_server, ServerError};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let args = ServeArgs::parse();
    if args.is_ephemeral() {
        eprintln!("Warning: no --config or --database, using an in-memory database");
    }
    start_server(args.into_config()?).await
}
