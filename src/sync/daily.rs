use chrono::Days;
use chrono_tz::Asia::Shanghai;
use rusqlite::Connection;

use crate::codes;
use crate::model::{FetchError, FetchUnit, Result, SyncError};
use crate::pipeline::engine::{self, SyncOptions};
use crate::pipeline::stats::RunStats;
use crate::store::bars::{self, BarTable};
use crate::tushare::api_caller;

async fn run(conn: &mut Connection, units: Vec<FetchUnit>, opts: &SyncOptions) -> Result<RunStats> {
    bars::create_table(conn, BarTable::Daily)?;

    let stats = engine::run_batched_sync(
        BarTable::Daily.name(),
        units,
        async |unit: FetchUnit| match unit {
            FetchUnit::TradeDate(date) => api_caller::daily_by_date(&date).await,
            FetchUnit::CodeDate { code, date } => api_caller::daily_for_code(&code, &date).await,
            other => Err(FetchError::Rejected(format!(
                "unsupported unit kind for daily sync: {}",
                other
            ))),
        },
        |rows| bars::upsert(conn, BarTable::Daily, &rows),
        opts,
    )
    .await?;

    stats.log_summary(BarTable::Daily.name());
    Ok(stats)
}

/// Syncs the whole market's daily bars for every trading day in the range,
/// one day per fetch (a year is ~240 calls instead of 5000+ per-stock calls).
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
        "syncing daily bars over {} trading days ({} to {})",
        trading_days.len(),
        start_date,
        end_date
    );

    let units = trading_days.into_iter().map(FetchUnit::TradeDate).collect();
    run(conn, units, opts).await
}

/// Syncs the latest completed trading day: the whole market as one unit, or
/// one unit per code when a codes file narrows the pass.
pub async fn sync_latest(
    conn: &mut Connection,
    codes_file: Option<&str>,
    opts: &SyncOptions,
) -> Result<RunStats> {
    let latest = latest_trading_day().await?;
    log::info!("latest open trading day is {}", latest);

    let units = match codes_file {
        Some(path) => codes::read_codes_from_file(path)?
            .into_iter()
            .map(|code| FetchUnit::CodeDate {
                code,
                date: latest.clone(),
            })
            .collect(),
        None => vec![FetchUnit::TradeDate(latest)],
    };
    run(conn, units, opts).await
}

// Looks back two weeks from today in exchange-local time; the last open day
// in that window is the most recent completed session.
async fn latest_trading_day() -> Result<String> {
    let today = chrono::Utc::now().with_timezone(&Shanghai).date_naive();
    let start = today - Days::new(14);
    let start = start.format("%Y%m%d").to_string();
    let end = today.format("%Y%m%d").to_string();

    let days = api_caller::trade_cal(&start, &end).await?;
    days.last()
        .cloned()
        .ok_or(SyncError::NoTradingDays(start, end))
}
