use rusqlite::Connection;
use tokio::time::sleep;

use crate::constants;
use crate::model::{FetchError, FetchOutcome, FetchUnit, Result, SyncError};
use crate::pipeline::engine::{self, SyncOptions};
use crate::pipeline::stats::RunStats;
use crate::store::{ths_index, ths_member};
use crate::tushare::api_caller;

// The provider caps ths_index at 5000 rows per call; fetching per type keeps
// every family complete.
const INDEX_TYPES: &[&str] = &["N", "I", "R", "S", "ST", "TH", "BB"];

/// Refreshes the index definition table across all index types, then returns
/// how many definitions were written.
pub async fn refresh_indexes(conn: &mut Connection) -> Result<usize> {
    ths_index::create_table(conn)?;

    let mut all = Vec::new();
    for index_type in INDEX_TYPES {
        match api_caller::ths_index(Some(index_type)).await {
            Ok(FetchOutcome::Rows(indexes)) => {
                log::info!("fetched {} type-{} indexes", indexes.len(), index_type);
                all.extend(indexes);
            }
            Ok(FetchOutcome::Empty) => {
                log::warn!("no type-{} indexes returned", index_type);
            }
            Err(err) => {
                log::error!("failed to fetch type-{} indexes: {}", index_type, err);
            }
        }
        sleep(constants::DEFAULT_FETCH_DELAY).await;
    }

    if all.is_empty() {
        return Err(SyncError::NoConceptIndexes);
    }
    let written = ths_index::upsert(conn, &all)?;
    log::info!("refreshed {} index definitions", written);
    Ok(written)
}

/// Runs the member pipeline over every concept index known to the database.
/// `refresh_indexes` must have populated the definitions first.
pub async fn sync_members(conn: &mut Connection, opts: &SyncOptions) -> Result<RunStats> {
    ths_member::create_table(conn)?;

    let concept_codes = ths_index::concept_codes(conn)?;
    if concept_codes.is_empty() {
        return Err(SyncError::NoConceptIndexes);
    }
    log::info!("syncing members of {} concept indexes", concept_codes.len());

    let units: Vec<FetchUnit> = concept_codes.into_iter().map(FetchUnit::Code).collect();
    let stats = engine::run_batched_sync(
        "ths_member",
        units,
        async |unit: FetchUnit| match unit {
            FetchUnit::Code(code) => api_caller::ths_member(&code).await,
            other => Err(FetchError::Rejected(format!(
                "unsupported unit kind for member sync: {}",
                other
            ))),
        },
        |rows| ths_member::upsert(conn, &rows),
        opts,
    )
    .await?;

    stats.log_summary("ths_member");
    Ok(stats)
}
