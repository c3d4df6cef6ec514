//! Check command implementation.

use crate::error::Result;
use crate::output::Formatter;
use duodraft_history::PairHistoryService;
use duodraft_store::SqliteStore;

/// Execute the check command.
///
/// Returns the number of unindexed rounds so the caller can pick an exit code.
pub async fn execute_check(
    service: &PairHistoryService<SqliteStore>,
    formatter: &Formatter,
) -> Result<usize> {
    let pending = service.pending_rounds().await?;
    println!("{}", formatter.format_pending(&pending)?);
    Ok(pending.len())
}
