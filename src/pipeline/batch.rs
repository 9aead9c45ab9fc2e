use crate::constants::BATCH_UNIT_HARD_CAP;
use crate::model::FetchUnit;

/// In-memory accumulation of fetched rows awaiting one storage flush, together
/// with the units that contributed them.
#[derive(Debug)]
pub struct BatchAccumulator<T> {
    rows: Vec<T>,
    units: Vec<FetchUnit>,
}

impl<T> BatchAccumulator<T> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            units: Vec::new(),
        }
    }

    pub fn append(&mut self, unit: FetchUnit, mut rows: Vec<T>) {
        self.rows.append(&mut rows);
        self.units.push(unit);
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// An empty batch never flushes. A non-empty one flushes at the configured
    /// threshold, at the hard cap, or when the iteration ends.
    pub fn should_flush(&self, threshold: usize, is_last: bool) -> bool {
        if self.units.is_empty() {
            return false;
        }
        self.units.len() >= threshold || self.units.len() >= BATCH_UNIT_HARD_CAP || is_last
    }

    /// Hands off all accumulated rows (in append order) and the contributing
    /// units, leaving the accumulator empty.
    pub fn drain(&mut self) -> (Vec<T>, Vec<FetchUnit>) {
        (
            std::mem::take(&mut self.rows),
            std::mem::take(&mut self.units),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(date: &str) -> FetchUnit {
        FetchUnit::TradeDate(date.into())
    }

    #[test]
    fn empty_batch_never_flushes() {
        let batch: BatchAccumulator<u32> = BatchAccumulator::new();
        assert!(!batch.should_flush(1, false));
        assert!(!batch.should_flush(1, true));
    }

    #[test]
    fn flushes_at_threshold() {
        let mut batch = BatchAccumulator::new();
        batch.append(unit("20240102"), vec![1, 2, 3]);
        assert!(!batch.should_flush(2, false));
        batch.append(unit("20240103"), vec![4]);
        assert!(batch.should_flush(2, false));
    }

    #[test]
    fn flushes_below_threshold_on_last_unit() {
        let mut batch = BatchAccumulator::new();
        batch.append(unit("20240102"), vec![1]);
        assert!(!batch.should_flush(10, false));
        assert!(batch.should_flush(10, true));
    }

    #[test]
    fn hard_cap_overrides_large_threshold() {
        let mut batch = BatchAccumulator::new();
        for i in 0..BATCH_UNIT_HARD_CAP {
            assert!(!batch.should_flush(1000, false));
            batch.append(unit(&format!("2024{:04}", i)), vec![i]);
        }
        assert!(batch.should_flush(1000, false));
    }

    #[test]
    fn drain_preserves_order_and_resets() {
        let mut batch = BatchAccumulator::new();
        batch.append(unit("20240102"), vec![1, 2]);
        batch.append(unit("20240103"), vec![3]);

        let (rows, units) = batch.drain();
        assert_eq!(rows, vec![1, 2, 3]);
        assert_eq!(units, vec![unit("20240102"), unit("20240103")]);
        assert!(batch.is_empty());
        assert_eq!(batch.row_count(), 0);
        assert_eq!(batch.unit_count(), 0);
    }
}
