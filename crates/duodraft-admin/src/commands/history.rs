//! History command implementation.

use crate::cli::HistoryArgs;
use crate::error::Result;
use crate::output::Formatter;
use duodraft_domain::traits::RoundPage;
use duodraft_domain::TeacherId;
use duodraft_history::PairHistoryService;
use duodraft_store::SqliteStore;

/// Execute the history command.
pub async fn execute_history(
    args: HistoryArgs,
    service: &PairHistoryService<SqliteStore>,
    formatter: &Formatter,
) -> Result<()> {
    let teacher = TeacherId::parse(&args.teacher)?;
    let page = RoundPage {
        offset: args.offset,
        limit: args.limit,
    };
    let listing = service.list_rounds(&teacher, page).await?;
    println!("{}", formatter.format_listing(&listing)?);
    Ok(())
}
