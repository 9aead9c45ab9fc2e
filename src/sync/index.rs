use rusqlite::Connection;

use crate::model::{FetchError, FetchUnit, Result};
use crate::pipeline::engine::{self, SyncOptions};
use crate::pipeline::stats::RunStats;
use crate::store::bars::{self, BarTable};
use crate::tushare::api_caller;

/// Syncs index bars for the given index codes over a date range, one code per
/// fetch. `weekly` switches both the endpoint and the target table.
pub async fn sync_codes(
    conn: &mut Connection,
    index_codes: &[String],
    start_date: &str,
    end_date: &str,
    weekly: bool,
    opts: &SyncOptions,
) -> Result<RunStats> {
    let table = if weekly { BarTable::IndexWeekly } else { BarTable::IndexDaily };
    bars::create_table(conn, table)?;

    log::info!(
        "syncing {} for {} indexes ({} to {})",
        table.name(),
        index_codes.len(),
        start_date,
        end_date
    );

    let units: Vec<FetchUnit> = index_codes.iter().cloned().map(FetchUnit::Code).collect();
    let stats = engine::run_batched_sync(
        table.name(),
        units,
        async |unit: FetchUnit| match unit {
            FetchUnit::Code(code) if weekly => {
                api_caller::index_weekly(&code, start_date, end_date).await
            }
            FetchUnit::Code(code) => api_caller::index_daily(&code, start_date, end_date).await,
            other => Err(FetchError::Rejected(format!(
                "unsupported unit kind for index sync: {}",
                other
            ))),
        },
        |rows| bars::upsert(conn, table, &rows),
        opts,
    )
    .await?;

    stats.log_summary(table.name());
    Ok(stats)
}
