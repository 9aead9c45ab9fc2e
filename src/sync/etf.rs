use rusqlite::Connection;

use crate::model::{FetchError, FetchUnit, Result, SyncError};
use crate::pipeline::engine::{self, SyncOptions};
use crate::pipeline::stats::RunStats;
use crate::store::bars::{self, BarTable};
use crate::tushare::api_caller;

/// Syncs all ETFs' daily bars for every trading day in the range, one day per
/// fetch, same shape as the stock daily pass.
pub async fn sync_range(
    conn: &mut Connection,
    start_date: &str,
    end_date: &str,
    opts: &SyncOptions,
) -> Result<RunStats> {
    let trading_days = api_caller::trade_cal(start_date, end_date).await?;
    if trading_days.is_empty() {
        return Err(SyncError::NoTradingDays(start_date.into(), end_date.into()));
    }
    log::info!(
        "syncing ETF daily bars over {} trading days ({} to {})",
        trading_days.len(),
        start_date,
        end_date
    );

    bars::create_table(conn, BarTable::EtfDaily)?;

    let units: Vec<FetchUnit> = trading_days.into_iter().map(FetchUnit::TradeDate).collect();
    let stats = engine::run_batched_sync(
        BarTable::EtfDaily.name(),
        units,
        async |unit: FetchUnit| match unit {
            FetchUnit::TradeDate(date) => api_caller::fund_daily_by_date(&date).await,
            other => Err(FetchError::Rejected(format!(
                "unsupported unit kind for ETF sync: {}",
                other
            ))),
        },
        |rows| bars::upsert(conn, BarTable::EtfDaily, &rows),
        opts,
    )
    .await?;

    stats.log_summary(BarTable::EtfDaily.name());
    Ok(stats)
}
