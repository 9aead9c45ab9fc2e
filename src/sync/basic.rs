use rusqlite::Connection;

use crate::model::{FetchOutcome, Result, SyncError};
use crate::store::stock_basic;
use crate::tushare::api_caller;

/// Refreshes the stock master table from the provider in one pass. Listing
/// status and names drift, so this runs ahead of the daily incremental sync.
pub async fn refresh_stock_basic(conn: &mut Connection) -> Result<usize> {
    stock_basic::create_table(conn)?;

    match api_caller::stock_basic().await? {
        FetchOutcome::Rows(stocks) => {
            let written = stock_basic::upsert(conn, &stocks)?;
            log::info!("refreshed {} stock_basic rows", written);
            Ok(written)
        }
        FetchOutcome::Empty => Err(SyncError::EmptyCodeList),
    }
}
