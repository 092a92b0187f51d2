//! JSONL log of dispatched samples.

use sensor_spine::MeasurementType;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// One line of the sample log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Monotonic microseconds since the logger was opened
    pub timestamp_us: u64,
    /// Wall-clock Unix timestamp in microseconds
    pub unix_us: u64,
    pub sensor: String,
    pub measurement: MeasurementType,
    pub value: f64,
}

/// Thread-safe sample logger that appends to a JSONL file
pub struct SampleLogger {
    writer: Mutex<BufWriter<File>>,
    epoch: Instant,
}

impl SampleLogger {
    /// Opens `path` in append mode, creating parent directories as needed.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::with_capacity(8192, file)),
            epoch: Instant::now(),
        })
    }

    pub fn log(&self, record: &SampleRecord) -> std::io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    /// Stamps and appends one sample.
    pub fn record(
        &self,
        sensor: &str,
        measurement: MeasurementType,
        value: f64,
    ) -> std::io::Result<()> {
        self.log(&SampleRecord {
            timestamp_us: self.epoch.elapsed().as_micros() as u64,
            unix_us: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_micros() as u64,
            sensor: sensor.to_string(),
            measurement,
            value,
        })
    }
}
