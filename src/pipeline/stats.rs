use crate::model::FetchUnit;

/// Counters accumulated over one `run_batched_sync` call. Owned by the engine
/// for the run's duration and returned by value; performs no I/O of its own.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    pub attempted_units: usize,
    pub succeeded_units: usize,
    pub empty_units: usize,
    pub failed_units: Vec<FetchUnit>,
    /// Rows returned by successful fetches.
    pub fetched_records: usize,
    /// Rows durably written by successful flushes.
    pub total_records: usize,
    pub batches_attempted: usize,
    pub batches_succeeded: usize,
    pub batches_failed: usize,
}

impl RunStats {
    pub fn record_attempt(&mut self) {
        self.attempted_units += 1;
    }

    pub fn record_success(&mut self, row_count: usize) {
        self.succeeded_units += 1;
        self.fetched_records += row_count;
    }

    pub fn record_empty(&mut self) {
        self.empty_units += 1;
    }

    pub fn record_failure(&mut self, unit: FetchUnit) {
        self.failed_units.push(unit);
    }

    pub fn record_flush(&mut self, success: bool, row_count: usize) {
        self.batches_attempted += 1;
        if success {
            self.batches_succeeded += 1;
            self.total_records += row_count;
        } else {
            self.batches_failed += 1;
        }
    }

    pub fn success_rate(&self) -> f64 {
        self.succeeded_units as f64 / self.attempted_units.max(1) as f64
    }

    pub fn batch_success_rate(&self) -> f64 {
        self.batches_succeeded as f64 / self.batches_attempted.max(1) as f64
    }

    pub fn log_summary(&self, label: &str) {
        log::info!(
            "{}: {}/{} units succeeded ({:.1}%), {} empty, {} failed",
            label,
            self.succeeded_units,
            self.attempted_units,
            self.success_rate() * 100.0,
            self.empty_units,
            self.failed_units.len(),
        );
        log::info!(
            "{}: wrote {} of {} fetched records in {} batches ({} ok, {} failed)",
            label,
            self.total_records,
            self.fetched_records,
            self.batches_attempted,
            self.batches_succeeded,
            self.batches_failed,
        );
        if !self.failed_units.is_empty() {
            let failed: Vec<String> = self.failed_units.iter().map(ToString::to_string).collect();
            log::warn!("{}: failed units: {}", label, failed.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_on_fresh_stats_do_not_divide_by_zero() {
        let stats = RunStats::default();
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.batch_success_rate(), 0.0);
    }

    #[test]
    fn success_rate_counts_empty_as_attempted() {
        let mut stats = RunStats::default();
        stats.record_attempt();
        stats.record_success(5);
        stats.record_attempt();
        stats.record_empty();
        stats.record_attempt();
        stats.record_failure(FetchUnit::TradeDate("20240103".into()));

        assert_eq!(stats.attempted_units, 3);
        assert!((stats.success_rate() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.fetched_records, 5);
    }

    #[test]
    fn only_successful_flushes_count_written_records() {
        let mut stats = RunStats::default();
        stats.record_flush(true, 10);
        stats.record_flush(false, 0);
        stats.record_flush(true, 5);

        assert_eq!(stats.total_records, 15);
        assert_eq!(stats.batches_attempted, 3);
        assert_eq!(stats.batches_failed, 1);
        assert!((stats.batch_success_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
