//! Prometheus metrics for sensor-rig.
//!
//! Per-sensor counters mirror the engines' sampling statistics; the gauges
//! are updated from the dispatch queue with every delivered sample.

use prometheus::{
    Encoder, GaugeVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;
use std::thread;
use tiny_http::{Response, Server};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Sampling Metrics
// ============================================================================

/// Completed samples per sensor
pub static SAMPLES_TAKEN: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("sensorrig_samples_taken_total", "Samples committed per sensor"),
        &["sensor"],
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Failed sample operations per sensor
pub static SAMPLE_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "sensorrig_sample_failures_total",
            "Sample operations that returned an error or panicked",
        ),
        &["sensor"],
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Timer ticks merged into an already pending sample request
pub static TICKS_COALESCED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "sensorrig_ticks_coalesced_total",
            "Timer ticks coalesced because a sample was already due",
        ),
        &["sensor"],
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Worst observed sample operation time
pub static MAX_SAMPLE_US: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    let gauge = IntGaugeVec::new(
        Opts::new(
            "sensorrig_max_sample_microseconds",
            "Longest sample operation observed, in microseconds",
        ),
        &["sensor"],
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Dispatch Metrics
// ============================================================================

/// Latest dispatched value per sensor
pub static LAST_SAMPLE: LazyLock<GaugeVec> = LazyLock::new(|| {
    let gauge = GaugeVec::new(
        Opts::new("sensorrig_last_sample", "Latest dispatched sample value"),
        &["sensor", "measurement"],
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Jobs dropped because the dispatch queue was full
pub static DISPATCH_DROPPED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "sensorrig_dispatch_dropped_total",
        "Samples dropped because the dispatch queue was full",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Set by the first delivered sample.
static READY: AtomicBool = AtomicBool::new(false);

pub fn mark_ready() {
    READY.store(true, Ordering::Relaxed);
}

pub fn is_ready() -> bool {
    READY.load(Ordering::Relaxed)
}

fn readiness() -> (u16, &'static str) {
    if is_ready() {
        (200, "Ready")
    } else {
        (503, "Not Ready")
    }
}

// ============================================================================
// Metrics HTTP Server
// ============================================================================

fn encode() -> Result<Vec<u8>, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(buffer)
}

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            match request.url() {
                "/metrics" => {
                    let buffer = match encode() {
                        Ok(buffer) => buffer,
                        Err(e) => {
                            tracing::warn!("Failed to encode metrics: {}", e);
                            let _ = request.respond(
                                Response::from_string("Internal Server Error")
                                    .with_status_code(500),
                            );
                            continue;
                        }
                    };

                    let mut response = Response::from_data(buffer);
                    if let Ok(header) = tiny_http::Header::from_bytes(
                        &b"Content-Type"[..],
                        &b"text/plain; version=0.0.4"[..],
                    ) {
                        response = response.with_header(header);
                    }
                    let _ = request.respond(response);
                }
                "/health" => {
                    let _ = request.respond(Response::from_string("OK"));
                }
                "/ready" => {
                    let (status, body) = readiness();
                    let _ = request.respond(Response::from_string(body).with_status_code(status));
                }
                _ => {
                    let _ =
                        request.respond(Response::from_string("Not Found").with_status_code(404));
                }
            }
        }
    })
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    LazyLock::force(&SAMPLES_TAKEN);
    LazyLock::force(&SAMPLE_FAILURES);
    LazyLock::force(&TICKS_COALESCED);
    LazyLock::force(&MAX_SAMPLE_US);
    LazyLock::force(&LAST_SAMPLE);
    LazyLock::force(&DISPATCH_DROPPED);
}
