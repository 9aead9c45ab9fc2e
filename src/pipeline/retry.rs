use std::time::Duration;

use tokio::time::sleep;

use crate::model::{FetchError, FetchOutcome, FetchUnit};

/// Bounded retry around a single remote fetch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_retries: u32,
    /// Backoff before retry n is `base_delay * n` (linear; provider limits
    /// are per-minute windows, not congestion-sensitive).
    pub base_delay: Duration,
}

impl RetryPolicy {
    fn backoff(&self, failed_attempts: u32) -> Duration {
        self.base_delay * failed_attempts
    }
}

/// The settled outcome of one unit after retries.
#[derive(Debug)]
pub enum FetchResult<T> {
    Rows(Vec<T>),
    Empty,
    Failed(FetchError),
}

/// Calls `fetch` until it yields rows, reports a legitimately empty result,
/// exhausts the retry budget, or is rejected outright. Never propagates an
/// error: the pipeline must not abort because one unit failed.
pub async fn fetch_with_retry<T, F>(
    fetch: &mut F,
    unit: &FetchUnit,
    policy: &RetryPolicy,
) -> FetchResult<T>
where
    F: AsyncFnMut(FetchUnit) -> Result<FetchOutcome<T>, FetchError>,
{
    let max_attempts = policy.max_retries.max(1);
    let mut attempt = 0;
    loop {
        match fetch(unit.clone()).await {
            Ok(FetchOutcome::Rows(rows)) if rows.is_empty() => return FetchResult::Empty,
            Ok(FetchOutcome::Rows(rows)) => return FetchResult::Rows(rows),
            Ok(FetchOutcome::Empty) => return FetchResult::Empty,
            Err(err @ FetchError::Rejected(_)) => {
                log::error!("fetch for {} rejected, not retrying: {}", unit, err);
                return FetchResult::Failed(err);
            }
            Err(err) => {
                attempt += 1;
                if attempt >= max_attempts {
                    log::error!("fetch for {} failed after {} attempts: {}", unit, attempt, err);
                    return FetchResult::Failed(err);
                }
                log::warn!("attempt {} for {} failed: {}, retrying", attempt, unit, err);
                sleep(policy.backoff(attempt)).await;
            }
        }
    }
}
