use crate::error::RigError;
use crate::infra::metrics::{mark_ready, LAST_SAMPLE};
use crate::infra::sample_log::SampleLogger;
use crate::runtime::config::{RuntimeConfig, SensorKind};
use crate::runtime::logging::init_tracing;
use crate::runtime::telemetry;
use sensor_spine::{
    CounterSensor, DispatchSink, EngineConfig, EventQueue, QueueSink, SamplingEngine,
    SimBehaviour, SineSensor,
};
use std::path::PathBuf;
use std::sync::{atomic::AtomicBool, Arc};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

pub fn run_from_args() -> Result<(), RigError> {
    let config = RuntimeConfig::from_env()?;
    if config.show_help {
        RuntimeConfig::print_help();
        return Ok(());
    }
    run(config)
}

pub fn run(config: RuntimeConfig) -> Result<(), RigError> {
    init_tracing(config.json_logs);
    telemetry::init();
    let _metrics_handle = telemetry::start_metrics_server(&config.metrics_addr);

    let sample_log = open_sample_log(config.sample_log.as_ref())?;
    let queue = Arc::new(
        EventQueue::with_capacity("dispatch", config.queue_capacity).map_err(RigError::Queue)?,
    );

    let behaviour = SimBehaviour {
        delay: config.sample_delay_ms.map(Duration::from_millis),
        fail_every: config.fail_every,
    };

    let mut engines = Vec::with_capacity(config.sensors.len());
    for (index, kind) in config.sensors.iter().copied().enumerate() {
        let name = format!("{kind}-{index}");
        let sink = build_sink(&name, kind, &queue, sample_log.clone());
        let engine = match kind {
            SensorKind::Counter => SamplingEngine::with_config(
                CounterSensor::with_behaviour(behaviour),
                Some(sink),
                EngineConfig::named(name),
            )?,
            SensorKind::Sine => SamplingEngine::with_config(
                SineSensor::new(5.0, 0.5, 12.0).with_behaviour(behaviour),
                Some(sink),
                EngineConfig::named(name),
            )?,
        };
        engines.push(Arc::new(engine));
    }

    let period = Duration::from_millis(config.period_ms);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        sensors = engines.len(),
        period_ms = config.period_ms,
        queue_capacity = config.queue_capacity,
        "Starting sampling engines"
    );
    for engine in &engines {
        engine.start(period);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let updater = telemetry::start_metrics_updater(
        engines.clone(),
        Arc::clone(&queue),
        Arc::clone(&stop),
    );

    match config.run_seconds {
        Some(seconds) => {
            info!(seconds, "Running for limited duration");
            thread::sleep(Duration::from_secs(seconds));
        }
        None => loop {
            thread::park();
        },
    }

    for engine in &engines {
        engine.stop();
    }
    // kill waits for any in-flight sample, so the summary below is final
    for engine in &engines {
        engine.kill();
    }
    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    if updater.join().is_err() {
        warn!("Metrics updater panicked");
    }

    for engine in &engines {
        let stats = engine.stats();
        info!(
            sensor = engine.name(),
            measurement = %engine.measurement(),
            last_value = engine.get_data(),
            samples_taken = stats.samples_taken,
            sample_failures = stats.sample_failures,
            ticks_coalesced = stats.ticks_coalesced,
            ticks_rejected = stats.ticks_rejected,
            max_sample_us = stats.max_sample_us,
            "Run complete"
        );
    }

    // engines hold sink clones of the queue
    drop(engines);
    match Arc::try_unwrap(queue) {
        Ok(queue) => {
            let (executed, dropped) = queue.shutdown();
            info!(executed, dropped, "Dispatch queue drained");
        }
        Err(_) => warn!("Dispatch queue still shared at shutdown"),
    }

    Ok(())
}

fn build_sink(
    name: &str,
    kind: SensorKind,
    queue: &Arc<EventQueue>,
    sample_log: Option<Arc<SampleLogger>>,
) -> Arc<dyn DispatchSink> {
    let sensor = name.to_string();
    let measurement = kind.measurement();
    let gauge = LAST_SAMPLE.with_label_values(&[name, measurement.key()]);

    Arc::new(QueueSink::new(Arc::clone(queue), move |value| {
        gauge.set(value);
        mark_ready();
        if let Some(logger) = &sample_log {
            if let Err(e) = logger.record(&sensor, measurement, value) {
                warn!(error = %e, sensor = %sensor, "Failed to write sample log");
            }
        }
    }))
}

fn open_sample_log(path: Option<&PathBuf>) -> Result<Option<Arc<SampleLogger>>, RigError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let logger = SampleLogger::new(path).map_err(|source| RigError::SampleLog {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "Sample logging enabled");
    Ok(Some(Arc::new(logger)))
}
