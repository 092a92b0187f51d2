pub mod dispatch;
pub mod engine;
pub mod error;
pub mod flag;
mod flag_proptest;
pub mod measurement;
pub mod sensor;
#[cfg(feature = "simulation")]
pub mod sensor_sim;
pub mod stats;
pub mod timer;

pub use dispatch::{DispatchSink, EventQueue, QueueSink};
pub use engine::{EngineConfig, LifecycleState, SamplingEngine};
pub use error::{EngineError, ErrorCode, SampleError};
pub use flag::{ReadinessFlag, TickOutcome, Wake};
pub use measurement::MeasurementType;
pub use sensor::{Sensor, Tagged};
#[cfg(feature = "simulation")]
pub use sensor_sim::{CounterSensor, SimBehaviour, SineSensor};
pub use stats::SamplingStats;
pub use timer::{ManualTimer, ManualTrigger, ThreadTicker, TickHandler, TimerSource};
