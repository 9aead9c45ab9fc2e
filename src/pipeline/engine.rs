use std::time::Duration;

use crate::constants;
use crate::model::{FetchError, FetchOutcome, FetchUnit, SyncError};

use super::batch::BatchAccumulator;
use super::retry::{self, FetchResult, RetryPolicy};
use super::stats::RunStats;
use super::throttle::Throttle;

/// Knobs for one batched sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Contributing units accumulated before a storage flush.
    pub batch_threshold: usize,
    /// Sleep between consecutive provider calls.
    pub delay: Duration,
    /// Calls between extended pauses (0 disables them).
    pub pacing_batch_size: usize,
    /// Total fetch attempts per unit.
    pub max_retries: u32,
    /// Base of the linear retry backoff.
    pub retry_base_delay: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_threshold: constants::DEFAULT_BATCH_THRESHOLD,
            delay: constants::DEFAULT_FETCH_DELAY,
            pacing_batch_size: constants::DEFAULT_PACING_BATCH_SIZE,
            max_retries: constants::DEFAULT_MAX_RETRIES,
            retry_base_delay: constants::RETRY_BASE_DELAY,
        }
    }
}

/// Walks `units` in order, fetching each through bounded retry, accumulating
/// successful rows, and flushing merged batches to `upsert` at the threshold,
/// at the hard cap, and unconditionally at the end of the iteration.
///
/// Per-unit and per-batch failures are absorbed into the returned statistics;
/// once iteration starts the run always completes. Only configuration errors
/// abort up front.
pub async fn run_batched_sync<T, F, U>(
    label: &str,
    units: Vec<FetchUnit>,
    mut fetch: F,
    mut upsert: U,
    opts: &SyncOptions,
) -> Result<RunStats, SyncError>
where
    F: AsyncFnMut(FetchUnit) -> Result<FetchOutcome<T>, FetchError>,
    U: FnMut(Vec<T>) -> rusqlite::Result<usize>,
{
    if units.is_empty() {
        return Err(SyncError::EmptyUnitList);
    }
    if opts.batch_threshold == 0 {
        return Err(SyncError::InvalidBatchThreshold);
    }

    let throttle = Throttle::new(opts.delay, opts.pacing_batch_size);
    let policy = RetryPolicy {
        max_retries: opts.max_retries,
        base_delay: opts.retry_base_delay,
    };

    let total = units.len();
    let mut stats = RunStats::default();
    let mut batch = BatchAccumulator::new();

    log::info!(
        "{}: starting sync over {} units, flushing every {} units",
        label,
        total,
        opts.batch_threshold.min(constants::BATCH_UNIT_HARD_CAP),
    );

    for (i, unit) in units.into_iter().enumerate() {
        let seq = i + 1;
        stats.record_attempt();

        match retry::fetch_with_retry(&mut fetch, &unit, &policy).await {
            FetchResult::Rows(rows) => {
                log::info!("{}: fetched {} rows for {} ({}/{})", label, rows.len(), unit, seq, total);
                stats.record_success(rows.len());
                batch.append(unit, rows);
            }
            FetchResult::Empty => {
                log::warn!("{}: no data for {}", label, unit);
                stats.record_empty();
            }
            FetchResult::Failed(err) => {
                log::error!("{}: giving up on {}: {}", label, unit, err);
                stats.record_failure(unit);
            }
        }

        throttle.pace(seq).await;

        let is_last = seq == total;
        if batch.should_flush(opts.batch_threshold, is_last) {
            log::info!(
                "{}: flushing batch {} ({} rows from {} units)",
                label,
                stats.batches_attempted + 1,
                batch.row_count(),
                batch.unit_count(),
            );
            let (rows, contributing) = batch.drain();
            let row_count = rows.len();
            match upsert(rows) {
                Ok(written) => stats.record_flush(true, written),
                Err(err) => {
                    // Rows of a failed flush are not re-queued; a re-run over
                    // the same range is the supported backfill path.
                    log::error!(
                        "{}: batch upsert failed, {} rows from units [{}] lost for this run: {}",
                        label,
                        row_count,
                        contributing
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", "),
                        err,
                    );
                    stats.record_flush(false, 0);
                }
            }
        }

        if seq % constants::PROGRESS_LOG_INTERVAL == 0 || is_last {
            log::info!(
                "{}: progress {}/{} ({:.1}%), {} succeeded, {} failed, {} records written",
                label,
                seq,
                total,
                seq as f64 / total as f64 * 100.0,
                stats.succeeded_units,
                stats.failed_units.len(),
                stats.total_records,
            );
        }
    }

    debug_assert!(batch.is_empty());
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BATCH_UNIT_HARD_CAP;

    fn fast_opts(batch_threshold: usize) -> SyncOptions {
        SyncOptions {
            batch_threshold,
            delay: Duration::ZERO,
            pacing_batch_size: 0,
            max_retries: 3,
            retry_base_delay: Duration::ZERO,
        }
    }

    fn date_units(dates: &[&str]) -> Vec<FetchUnit> {
        dates.iter().map(|d| FetchUnit::TradeDate(d.to_string())).collect()
    }

    #[tokio::test]
    async fn flushes_at_threshold_then_drains_remainder() {
        let units = date_units(&["20240102", "20240103", "20240104"]);
        let mut flushes: Vec<usize> = Vec::new();

        let fetch = async |_unit: FetchUnit| Ok(FetchOutcome::Rows(vec![0u8; 5]));
        let stats = run_batched_sync(
            "test",
            units,
            fetch,
            |rows| {
                flushes.push(rows.len());
                Ok(rows.len())
            },
            &fast_opts(2),
        )
        .await
        .unwrap();

        assert_eq!(flushes, vec![10, 5]);
        assert_eq!(stats.total_records, 15);
        assert_eq!(stats.batches_attempted, 2);
        assert_eq!(stats.batches_succeeded, 2);
        assert_eq!(stats.succeeded_units, 3);
        assert_eq!(stats.success_rate(), 1.0);
    }

    #[tokio::test]
    async fn failed_unit_is_isolated_and_recorded_once() {
        let units = date_units(&["20240102", "20240103", "20240104"]);
        let mut flushes: Vec<usize> = Vec::new();

        let fetch = async |unit: FetchUnit| match unit {
            FetchUnit::TradeDate(ref d) if d == "20240103" => {
                Err(FetchError::Transient("provider timeout".into()))
            }
            _ => Ok(FetchOutcome::Rows(vec![0u8; 5])),
        };
        let stats = run_batched_sync(
            "test",
            units,
            fetch,
            |rows| {
                flushes.push(rows.len());
                Ok(rows.len())
            },
            &fast_opts(2),
        )
        .await
        .unwrap();

        // Units 1 and 3 contribute contiguously; the flush lands on the last
        // unit with both of them.
        assert_eq!(flushes, vec![10]);
        assert_eq!(stats.total_records, 10);
        assert_eq!(stats.failed_units, vec![FetchUnit::TradeDate("20240103".into())]);
        assert!((stats.success_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failed_flush_is_recorded_and_run_completes() {
        let units = date_units(&["20240102", "20240103", "20240104", "20240105"]);
        let mut upsert_calls = 0;

        let fetch = async |_unit: FetchUnit| Ok(FetchOutcome::Rows(vec![0u8; 5]));
        let stats = run_batched_sync(
            "test",
            units,
            fetch,
            |rows| {
                upsert_calls += 1;
                if upsert_calls == 1 {
                    Err(rusqlite::Error::QueryReturnedNoRows)
                } else {
                    Ok(rows.len())
                }
            },
            &fast_opts(2),
        )
        .await
        .unwrap();

        assert_eq!(stats.batches_attempted, 2);
        assert_eq!(stats.batches_failed, 1);
        assert_eq!(stats.batches_succeeded, 1);
        // The failed batch's rows are dropped for this run.
        assert_eq!(stats.total_records, 10);
        assert_eq!(stats.fetched_records, 20);
        assert!((stats.batch_success_rate() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_units_are_skipped_not_failed() {
        let units = date_units(&["20240102", "20240103", "20240104"]);
        let mut fetch_calls = 0;

        let mut fetch = async |unit: FetchUnit| {
            fetch_calls += 1;
            match unit {
                FetchUnit::TradeDate(ref d) if d == "20240103" => Ok(FetchOutcome::Empty),
                _ => Ok(FetchOutcome::Rows(vec![0u8; 2])),
            }
        };
        let stats = run_batched_sync("test", units, &mut fetch, |rows| Ok(rows.len()), &fast_opts(10))
            .await
            .unwrap();

        drop(fetch);
        // Empty results are not retried.
        assert_eq!(fetch_calls, 3);
        assert_eq!(stats.empty_units, 1);
        assert!(stats.failed_units.is_empty());
        assert_eq!(stats.succeeded_units, 2);
        assert_eq!(stats.total_records, 4);
    }

    #[tokio::test]
    async fn hard_cap_bounds_batch_size_despite_large_threshold() {
        let dates: Vec<String> = (1..=25).map(|i| format!("202401{:02}", i)).collect();
        let units: Vec<FetchUnit> = dates.iter().map(|d| FetchUnit::TradeDate(d.clone())).collect();
        let mut flushes: Vec<usize> = Vec::new();

        let fetch = async |_unit: FetchUnit| Ok(FetchOutcome::Rows(vec![0u8; 1]));
        let stats = run_batched_sync(
            "test",
            units,
            fetch,
            |rows| {
                flushes.push(rows.len());
                Ok(rows.len())
            },
            &fast_opts(1000),
        )
        .await
        .unwrap();

        assert_eq!(flushes, vec![BATCH_UNIT_HARD_CAP, 25 - BATCH_UNIT_HARD_CAP]);
        assert_eq!(stats.total_records, 25);
    }

    #[tokio::test]
    async fn empty_unit_list_fails_fast() {
        let fetch = async |_unit: FetchUnit| Ok(FetchOutcome::Rows(vec![0u8; 1]));
        let result =
            run_batched_sync("test", Vec::new(), fetch, |rows| Ok(rows.len()), &fast_opts(2)).await;
        assert!(matches!(result, Err(SyncError::EmptyUnitList)));
    }

    #[tokio::test]
    async fn zero_batch_threshold_fails_fast() {
        let units = date_units(&["20240102"]);
        let fetch = async |_unit: FetchUnit| Ok(FetchOutcome::Rows(vec![0u8; 1]));
        let result = run_batched_sync("test", units, fetch, |rows| Ok(rows.len()), &fast_opts(0)).await;
        assert!(matches!(result, Err(SyncError::InvalidBatchThreshold)));
    }

    #[tokio::test]
    async fn all_failures_still_return_stats() {
        let units = date_units(&["20240102", "20240103"]);
        let fetch = async |_unit: FetchUnit| -> Result<FetchOutcome<u8>, FetchError> {
            Err(FetchError::Transient("down".into()))
        };
        let stats = run_batched_sync("test", units, fetch, |rows| Ok(rows.len()), &fast_opts(2))
            .await
            .unwrap();

        assert_eq!(stats.attempted_units, 2);
        assert_eq!(stats.succeeded_units, 0);
        assert_eq!(stats.failed_units.len(), 2);
        assert_eq!(stats.batches_attempted, 0);
        assert_eq!(stats.success_rate(), 0.0);
    }
}
