//! Rebuild command implementation.

use crate::cli::RebuildArgs;
use crate::error::Result;
use crate::output::Formatter;
use duodraft_domain::TeacherId;
use duodraft_history::PairHistoryService;
use duodraft_store::SqliteStore;

/// Execute the rebuild command.
pub async fn execute_rebuild(
    args: RebuildArgs,
    service: &PairHistoryService<SqliteStore>,
    formatter: &Formatter,
) -> Result<()> {
    let teacher = TeacherId::parse(&args.teacher)?;
    let report = service.rebuild_index(&teacher).await?;
    println!("{}", formatter.format_rebuild(&report)?);
    Ok(())
}
