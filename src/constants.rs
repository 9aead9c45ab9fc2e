use std::time::Duration;

/// Total attempts per unit before it is recorded as failed.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base of the linear retry backoff (1s, 2s, ... before each retry).
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Contributing units accumulated before a storage flush.
pub const DEFAULT_BATCH_THRESHOLD: usize = 10;

// Flush regardless of the configured threshold once this many units have
// accumulated, so a misconfigured threshold cannot exhaust memory on wide
// date ranges.
pub const BATCH_UNIT_HARD_CAP: usize = 20;

/// Sleep between consecutive provider calls.
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(500);

/// Concept-member endpoint tolerates a shorter delay (200 calls/min quota).
pub const CONCEPT_FETCH_DELAY: Duration = Duration::from_millis(300);

/// Financial-statement endpoints carry tighter quotas.
pub const FINANCIAL_FETCH_DELAY: Duration = Duration::from_secs(1);

/// Calls between extended pauses.
pub const DEFAULT_PACING_BATCH_SIZE: usize = 50;

/// Length of the extended pause inserted every `pacing_batch_size` calls.
pub const EXTENDED_PAUSE: Duration = Duration::from_secs(2);

/// Units between progress log lines.
pub const PROGRESS_LOG_INTERVAL: usize = 10;

/// A run whose batch success rate falls below this exits non-zero.
pub const BATCH_SUCCESS_THRESHOLD: f64 = 0.8;

/// Major A-share indexes synced by default.
pub const MAJOR_INDEX_CODES: &[&str] = &[
    "000001.SH", // SSE Composite
    "000300.SH", // CSI 300
    "000905.SH", // CSI 500
    "000852.SH", // CSI 1000
    "000016.SH", // SSE 50
    "000688.SH", // STAR 50
    "399001.SZ", // SZSE Component
    "399006.SZ", // ChiNext
    "399303.SZ", // CNI 2000
];
