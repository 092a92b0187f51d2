use crate::dispatch::{panic_message, DispatchSink};
use crate::error::{EngineError, SampleError};
use crate::flag::{ReadinessFlag, Wake};
use crate::measurement::MeasurementType;
use crate::sensor::Sensor;
use crate::stats::{SamplingStats, StatsCounters};
use crate::timer::{ThreadTicker, TickHandler, TimerSource};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Sampling thread is idle, no timer armed yet.
    Created,
    Running,
    /// Timer disarmed, sampling thread alive and idle.
    Stopped,
    /// Sampling thread ended. Absorbing.
    Killed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Created => "created",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Killed => "killed",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Used for thread names and log lines.
    pub name: String,
    pub stack_size: Option<usize>,
}

impl EngineConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "sensor".to_string(),
            stack_size: None,
        }
    }
}

/// State shared between the caller, the timer context and the sampling
/// thread.
struct Shared {
    flag: ReadinessFlag,
    last_sample: AtomicU64,
    stats: StatsCounters,
}

impl Shared {
    fn on_tick(&self) {
        self.stats.record_tick(self.flag.raise());
    }

    fn commit(&self, value: f64) {
        self.last_sample.store(value.to_bits(), Ordering::Release);
    }

    fn last_sample(&self) -> f64 {
        f64::from_bits(self.last_sample.load(Ordering::Acquire))
    }
}

struct Control {
    state: LifecycleState,
    period: Option<Duration>,
    timer: Box<dyn TimerSource>,
    worker: Option<thread::JoinHandle<()>>,
}

/// Samples a [`Sensor`] on a fixed period from a dedicated thread.
///
/// All lifecycle operations are total: calling them in a state where they do
/// not apply is a no-op. Dropping the engine kills it.
pub struct SamplingEngine {
    name: String,
    measurement: MeasurementType,
    shared: Arc<Shared>,
    control: Mutex<Control>,
}

impl SamplingEngine {
    /// Builds an engine driven by a [`ThreadTicker`].
    pub fn new<S>(sensor: S, sink: Option<Arc<dyn DispatchSink>>) -> Result<Self, EngineError>
    where
        S: Sensor + 'static,
    {
        Self::with_config(sensor, sink, EngineConfig::default())
    }

    pub fn with_config<S>(
        sensor: S,
        sink: Option<Arc<dyn DispatchSink>>,
        config: EngineConfig,
    ) -> Result<Self, EngineError>
    where
        S: Sensor + 'static,
    {
        let timer = ThreadTicker::new(format!("{}-ticker", config.name));
        Self::with_timer(sensor, sink, timer, config)
    }

    /// Builds an engine with an injected timer source. The sampling thread is
    /// spawned immediately and waits for the first tick.
    pub fn with_timer<S, T>(
        sensor: S,
        sink: Option<Arc<dyn DispatchSink>>,
        timer: T,
        config: EngineConfig,
    ) -> Result<Self, EngineError>
    where
        S: Sensor + 'static,
        T: TimerSource + 'static,
    {
        let shared = Arc::new(Shared {
            flag: ReadinessFlag::new(),
            last_sample: AtomicU64::new(0.0f64.to_bits()),
            stats: StatsCounters::default(),
        });
        let measurement = sensor.measurement();

        let mut builder = thread::Builder::new().name(format!("{}-sampler", config.name));
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }
        let loop_shared = Arc::clone(&shared);
        let loop_name = config.name.clone();
        let worker = builder
            .spawn(move || sampling_loop(&loop_name, sensor, &loop_shared, sink.as_deref()))
            .map_err(|source| EngineError::Spawn {
                name: config.name.clone(),
                source,
            })?;

        Ok(Self {
            name: config.name,
            measurement,
            shared,
            control: Mutex::new(Control {
                state: LifecycleState::Created,
                period: None,
                timer: Box::new(timer),
                worker: Some(worker),
            }),
        })
    }

    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Arms the timer at `period`. While running, re-arms with the new
    /// period; a sample already in flight is not cancelled.
    pub fn start(&self, period: Duration) {
        let mut control = self.lock_control();
        if control.state == LifecycleState::Killed {
            log::debug!("{}: start ignored, engine is killed", self.name);
            return;
        }
        if period.is_zero() {
            log::warn!("{}: start ignored, period must be non-zero", self.name);
            return;
        }

        control.timer.detach();
        self.shared.flag.clear_pending();

        let shared = Arc::clone(&self.shared);
        let handler: TickHandler = Arc::new(move || shared.on_tick());
        match control.timer.attach(period, handler) {
            Ok(()) => {
                control.period = Some(period);
                control.state = LifecycleState::Running;
                log::info!("{}: sampling every {:?}", self.name, period);
            }
            Err(err) => {
                log::error!("{}: failed to arm timer: {}", self.name, err);
                if control.state == LifecycleState::Running {
                    control.state = LifecycleState::Stopped;
                }
            }
        }
    }

    /// Disarms the timer. A sample in flight runs to completion; a request
    /// that has not started yet is dropped.
    pub fn stop(&self) {
        let mut control = self.lock_control();
        if control.state != LifecycleState::Running {
            return;
        }
        control.timer.detach();
        self.shared.flag.clear_pending();
        control.state = LifecycleState::Stopped;
        log::info!("{}: stopped", self.name);
    }

    /// Permanently ends sampling. Returns once the sampling thread has
    /// exited, which waits for any sample in flight.
    pub fn kill(&self) {
        let worker = {
            let mut control = self.lock_control();
            if control.state == LifecycleState::Killed {
                return;
            }
            control.timer.detach();
            self.shared.flag.kill();
            control.state = LifecycleState::Killed;
            control.worker.take()
        };

        let Some(worker) = worker else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            // killed from inside the sample operation; the loop exits on return
            return;
        }
        if let Err(err) = worker.join() {
            log::warn!("{}: failed to join sampling thread: {:?}", self.name, err);
        }
        log::info!("{}: killed", self.name);
    }

    /// Last committed sample; `0.0` before the first one.
    pub fn get_data(&self) -> f64 {
        self.shared.last_sample()
    }

    pub fn state(&self) -> LifecycleState {
        self.lock_control().state
    }

    /// Period of the most recent successful `start`.
    pub fn period(&self) -> Option<Duration> {
        self.lock_control().period
    }

    pub fn stats(&self) -> SamplingStats {
        self.shared.stats.snapshot()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn measurement(&self) -> MeasurementType {
        self.measurement
    }
}

impl Drop for SamplingEngine {
    fn drop(&mut self) {
        self.kill();
    }
}

fn sampling_loop<S: Sensor>(
    name: &str,
    mut sensor: S,
    shared: &Shared,
    sink: Option<&dyn DispatchSink>,
) {
    log::debug!("{}: sampling thread started", name);

    while shared.flag.wait() == Wake::Sample {
        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| sensor.sample()))
            .unwrap_or_else(|panic| Err(SampleError::Panicked(panic_message(&*panic))));
        let elapsed = started.elapsed();

        match result {
            Ok(value) => {
                shared.commit(value);
                shared.stats.record_sample(elapsed, true);
                if let Some(sink) = sink {
                    sink.submit(value);
                }
            }
            Err(err @ SampleError::Panicked(_)) => {
                shared.stats.record_sample(elapsed, false);
                log::error!("{}: {} (code {:#x})", name, err, err.code().value());
            }
            Err(err) => {
                shared.stats.record_sample(elapsed, false);
                log::warn!(
                    "{}: sample failed, keeping {}: {} (code {:#x})",
                    name,
                    shared.last_sample(),
                    err,
                    err.code().value()
                );
            }
        }

        shared.flag.complete();
    }

    log::debug!("{}: sampling thread exiting", name);
}
