use crate::infra::metrics::{
    init_metrics, serve_metrics, DISPATCH_DROPPED, MAX_SAMPLE_US, SAMPLES_TAKEN, SAMPLE_FAILURES,
    TICKS_COALESCED,
};
use sensor_spine::{EventQueue, SamplingEngine, SamplingStats};
use std::sync::{atomic::AtomicBool, Arc};
use std::thread;
use std::time::Duration;
use tracing::info;

pub fn init() {
    init_metrics();
}

pub fn start_metrics_server(addr: &Option<String>) -> Option<thread::JoinHandle<()>> {
    addr.as_ref().map(|addr| {
        info!(addr = %addr, "Starting metrics server");
        serve_metrics(addr.clone())
    })
}

/// Engine counters are monotonic; only the growth since the last poll is
/// added to the Prometheus counters.
fn publish(name: &str, previous: &SamplingStats, current: &SamplingStats) {
    let taken = current.samples_taken.saturating_sub(previous.samples_taken);
    if taken > 0 {
        SAMPLES_TAKEN.with_label_values(&[name]).inc_by(taken);
    }
    let failed = current.sample_failures.saturating_sub(previous.sample_failures);
    if failed > 0 {
        SAMPLE_FAILURES.with_label_values(&[name]).inc_by(failed);
    }
    let coalesced = current.ticks_coalesced.saturating_sub(previous.ticks_coalesced);
    if coalesced > 0 {
        TICKS_COALESCED.with_label_values(&[name]).inc_by(coalesced);
    }
    MAX_SAMPLE_US
        .with_label_values(&[name])
        .set(current.max_sample_us as i64);
}

pub fn start_metrics_updater(
    engines: Vec<Arc<SamplingEngine>>,
    queue: Arc<EventQueue>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last = vec![SamplingStats::default(); engines.len()];
        let mut last_dropped = 0u64;
        loop {
            for (engine, previous) in engines.iter().zip(last.iter_mut()) {
                let current = engine.stats();
                publish(engine.name(), previous, &current);
                *previous = current;
            }
            let dropped = queue.dropped();
            if dropped > last_dropped {
                DISPATCH_DROPPED.inc_by(dropped - last_dropped);
                last_dropped = dropped;
            }

            if stop.load(std::sync::atomic::Ordering::Relaxed) {
                break;
            }
            thread::sleep(Duration::from_millis(200));
        }
    })
}
