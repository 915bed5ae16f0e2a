//! Backpressure for time-series ingestion.

use std::time::{Duration, Instant};

/// Admits a sample only every `every` messages and no more often than
/// `min_interval`.
#[derive(Debug, Clone)]
pub struct IngestThrottle {
    every: u64,
    min_interval: Duration,
    seen: u64,
    last_admitted: Option<Instant>,
}

impl IngestThrottle {
    pub fn new(every: u64, min_interval: Duration) -> Self {
        Self {
            every: every.max(1),
            min_interval,
            seen: 0,
            last_admitted: None,
        }
    }

    /// Count one message and decide whether it should be ingested.
    pub fn admit(&mut self, now: Instant) -> bool {
        self.seen += 1;
        if self.seen % self.every != 0 {
            return false;
        }
        if let Some(last) = self.last_admitted {
            if now.saturating_duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_admitted = Some(now);
        true
    }

    /// Forget history so the next eligible message is admitted.
    pub fn reset(&mut self) {
        self.seen = 0;
        self.last_admitted = None;
    }

    pub fn messages_seen(&self) -> u64 {
        self.seen
    }
}
