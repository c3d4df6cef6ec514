//! Catch-up command implementation.

use crate::error::{CliError, Result};
use crate::output::Formatter;
use duodraft_history::PairHistoryService;
use duodraft_store::SqliteStore;

/// Execute the catch-up command.
pub async fn execute_catch_up(
    service: &PairHistoryService<SqliteStore>,
    formatter: &Formatter,
) -> Result<()> {
    let report = service.catch_up().await?;
    println!("{}", formatter.format_reconcile(&report)?);

    if !report.is_clean() {
        return Err(CliError::Unreconciled(report.failed.len()));
    }
    Ok(())
}
