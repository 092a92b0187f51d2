use crate::flag::TickOutcome;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize)]
pub struct SamplingStats {
    pub ticks_received: u64,
    /// Ticks merged into an already pending request.
    pub ticks_coalesced: u64,
    /// Ticks that arrived after the engine was killed.
    pub ticks_rejected: u64,
    pub samples_taken: u64,
    pub sample_failures: u64,
    pub last_sample_us: u64,
    pub max_sample_us: u64,
}

impl SamplingStats {
    /// Completed sample operations, successful or not.
    pub fn attempts(&self) -> u64 {
        self.samples_taken + self.sample_failures
    }
}

/// Lock-free counters written from the timer and sampling threads.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    ticks_received: AtomicU64,
    ticks_coalesced: AtomicU64,
    ticks_rejected: AtomicU64,
    samples_taken: AtomicU64,
    sample_failures: AtomicU64,
    last_sample_us: AtomicU64,
    max_sample_us: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_tick(&self, outcome: TickOutcome) {
        self.ticks_received.fetch_add(1, Ordering::Relaxed);
        match outcome {
            TickOutcome::Armed => {}
            TickOutcome::Coalesced => {
                self.ticks_coalesced.fetch_add(1, Ordering::Relaxed);
            }
            TickOutcome::Rejected => {
                self.ticks_rejected.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub(crate) fn record_sample(&self, elapsed: Duration, ok: bool) {
        let us = elapsed.as_micros() as u64;
        self.last_sample_us.store(us, Ordering::Relaxed);
        self.max_sample_us.fetch_max(us, Ordering::Relaxed);
        if ok {
            self.samples_taken.fetch_add(1, Ordering::Relaxed);
        } else {
            self.sample_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> SamplingStats {
        SamplingStats {
            ticks_received: self.ticks_received.load(Ordering::Relaxed),
            ticks_coalesced: self.ticks_coalesced.load(Ordering::Relaxed),
            ticks_rejected: self.ticks_rejected.load(Ordering::Relaxed),
            samples_taken: self.samples_taken.load(Ordering::Relaxed),
            sample_failures: self.sample_failures.load(Ordering::Relaxed),
            last_sample_us: self.last_sample_us.load(Ordering::Relaxed),
            max_sample_us: self.max_sample_us.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_ticks_by_outcome() {
        let counters = StatsCounters::default();
        counters.record_tick(TickOutcome::Armed);
        counters.record_tick(TickOutcome::Coalesced);
        counters.record_tick(TickOutcome::Coalesced);
        counters.record_tick(TickOutcome::Rejected);
        let stats = counters.snapshot();
        assert_eq!(stats.ticks_received, 4);
        assert_eq!(stats.ticks_coalesced, 2);
        assert_eq!(stats.ticks_rejected, 1);
    }

    #[test]
    fn tracks_worst_sample_time() {
        let counters = StatsCounters::default();
        counters.record_sample(Duration::from_micros(300), true);
        counters.record_sample(Duration::from_micros(900), false);
        counters.record_sample(Duration::from_micros(100), true);
        let stats = counters.snapshot();
        assert_eq!(stats.max_sample_us, 900);
        assert_eq!(stats.last_sample_us, 100);
        assert_eq!(stats.samples_taken, 2);
        assert_eq!(stats.sample_failures, 1);
        assert_eq!(stats.attempts(), 3);
    }

    #[test]
    fn snapshot_serializes() {
        let json = serde_json::to_value(SamplingStats::default()).unwrap();
        assert_eq!(json["samples_taken"], 0);
    }
}
