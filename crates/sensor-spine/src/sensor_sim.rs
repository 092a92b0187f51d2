use crate::error::SampleError;
use crate::measurement::MeasurementType;
use crate::sensor::Sensor;
use std::thread;
use std::time::{Duration, Instant};

/// Behaviour shared by the simulated sensors: an artificial conversion delay
/// and periodic injected failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimBehaviour {
    pub delay: Option<Duration>,
    /// Every n-th read fails with `SampleError::Timeout`. Zero disables it.
    pub fail_every: u64,
}

impl SimBehaviour {
    fn before_read(&self, reads: u64) -> Result<(), SampleError> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if self.fail_every > 0 && reads % self.fail_every == 0 {
            return Err(SampleError::Timeout);
        }
        Ok(())
    }
}

/// Reports 1, 2, 3, ... on successive successful reads.
#[derive(Debug, Clone, Default)]
pub struct CounterSensor {
    reads: u64,
    count: u64,
    behaviour: SimBehaviour,
}

impl CounterSensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behaviour(behaviour: SimBehaviour) -> Self {
        Self {
            behaviour,
            ..Self::default()
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Sensor for CounterSensor {
    fn sample(&mut self) -> Result<f64, SampleError> {
        self.reads += 1;
        self.behaviour.before_read(self.reads)?;
        self.count += 1;
        Ok(self.count as f64)
    }
}

/// Sine wave over wall time, e.g. a panel voltage under a moving shadow.
#[derive(Debug, Clone)]
pub struct SineSensor {
    amplitude: f64,
    frequency_hz: f64,
    offset: f64,
    kind: MeasurementType,
    epoch: Instant,
    reads: u64,
    behaviour: SimBehaviour,
}

impl SineSensor {
    pub fn new(amplitude: f64, frequency_hz: f64, offset: f64) -> Self {
        Self {
            amplitude,
            frequency_hz,
            offset,
            kind: MeasurementType::Voltage,
            epoch: Instant::now(),
            reads: 0,
            behaviour: SimBehaviour::default(),
        }
    }

    pub fn with_behaviour(mut self, behaviour: SimBehaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn with_measurement(mut self, kind: MeasurementType) -> Self {
        self.kind = kind;
        self
    }

    fn value_at(&self, t_s: f64) -> f64 {
        let omega = 2.0 * std::f64::consts::PI * self.frequency_hz;
        self.offset + self.amplitude * (omega * t_s).sin()
    }
}

impl Sensor for SineSensor {
    fn sample(&mut self) -> Result<f64, SampleError> {
        self.reads += 1;
        self.behaviour.before_read(self.reads)?;
        Ok(self.value_at(self.epoch.elapsed().as_secs_f64()))
    }

    fn measurement(&self) -> MeasurementType {
        self.kind
    }
}
