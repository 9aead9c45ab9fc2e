use std::time::Duration;

use tokio::time::sleep;

use crate::constants;

/// Pacing between provider calls: a short sleep after every call plus an
/// extended pause every `pacing_batch_size` calls to smooth burst load.
/// Scheduling policy only; no correctness implications.
#[derive(Debug, Clone)]
pub struct Throttle {
    delay: Duration,
    pacing_batch_size: usize,
    extended_pause: Duration,
}

impl Throttle {
    pub fn new(delay: Duration, pacing_batch_size: usize) -> Self {
        Self {
            delay,
            pacing_batch_size,
            extended_pause: constants::EXTENDED_PAUSE,
        }
    }

    fn extended_pause_due(&self, call_index: usize) -> bool {
        self.pacing_batch_size > 0 && call_index > 0 && call_index % self.pacing_batch_size == 0
    }

    /// Sleeps after the call with the given 1-based index.
    pub async fn pace(&self, call_index: usize) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if self.extended_pause_due(call_index) && !self.extended_pause.is_zero() {
            log::debug!(
                "completed {} calls, pausing {:?} to smooth provider load",
                call_index,
                self.extended_pause
            );
            sleep(self.extended_pause).await;
        }
    }
}
