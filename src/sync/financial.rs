use rusqlite::Connection;

use crate::codes;
use crate::model::{FetchError, FetchUnit, Result};
use crate::pipeline::engine::{self, SyncOptions};
use crate::pipeline::stats::RunStats;
use crate::store::fin_indicator;
use crate::tushare::api_caller;

/// Syncs per-period financial indicators for the given stocks, one code per
/// fetch. Without a codes file the main-board universe is used.
pub async fn sync_codes(
    conn: &mut Connection,
    codes_file: Option<&str>,
    start_date: &str,
    end_date: &str,
    opts: &SyncOptions,
) -> Result<RunStats> {
    let stock_codes = match codes_file {
        Some(path) => codes::read_codes_from_file(path)?,
        None => codes::main_board_codes().await?,
    };
    log::info!(
        "syncing financial indicators for {} stocks ({} to {})",
        stock_codes.len(),
        start_date,
        end_date
    );

    fin_indicator::create_table(conn)?;

    let units: Vec<FetchUnit> = stock_codes.into_iter().map(FetchUnit::Code).collect();
    let stats = engine::run_batched_sync(
        "fina_indicator",
        units,
        async |unit: FetchUnit| match unit {
            FetchUnit::Code(code) => api_caller::fina_indicator(&code, start_date, end_date).await,
            other => Err(FetchError::Rejected(format!(
                "unsupported unit kind for financial sync: {}",
                other
            ))),
        },
        |rows| fin_indicator::upsert(conn, &rows),
        opts,
    )
    .await?;

    stats.log_summary("fina_indicator");
    Ok(stats)
}
