//! Error types for sensors and sampling engines.

use thiserror::Error;

/// Numeric error codes shared with the rest of the measurement stack.
///
/// Codes below `0x100` are standard; `0x100` and above are extended codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    None = 0x00,
    Unknown = 0x01,
    BadState = 0x02,
    InvalidMsgId = 0x20,
    InvalidMsgData = 0x21,
    InvalidMsgDataLen = 0x22,
    UnexpectedMsgId = 0x23,
    InvalidProfile = 0x100,
    InvalidVoltageStart = 0x101,
    InvalidVoltageEnd = 0x102,
    InvalidVoltageConsistency = 0x103,
    InvalidVoltageResolution = 0x104,
    InvalidFifoDequeue = 0x105,
}

impl ErrorCode {
    pub fn value(self) -> u16 {
        self as u16
    }

    pub fn is_extended(self) -> bool {
        self.value() >= 0x100
    }
}

/// Failure reported by a sensor's sample operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    /// Device did not answer in time.
    #[error("sensor timed out")]
    Timeout,

    /// Device answered with something that is not a valid reading.
    #[error("invalid sensor data: {0}")]
    InvalidData(String),

    /// Reading is finite but outside what the device can physically report.
    #[error("reading {value} out of range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    /// Device is in a state where it cannot be sampled.
    #[error("sensor in bad state: {0}")]
    BadState(String),

    /// Device-specific failure.
    #[error("device error: {0}")]
    Device(String),

    /// The sample operation panicked; the engine caught it.
    #[error("sample operation panicked: {0}")]
    Panicked(String),
}

impl SampleError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SampleError::Timeout => ErrorCode::Unknown,
            SampleError::InvalidData(_) => ErrorCode::InvalidMsgData,
            SampleError::OutOfRange { .. } => ErrorCode::InvalidMsgData,
            SampleError::BadState(_) => ErrorCode::BadState,
            SampleError::Device(_) => ErrorCode::Unknown,
            SampleError::Panicked(_) => ErrorCode::BadState,
        }
    }
}

/// Errors raised while building a sampling engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to spawn sampling thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_codes_start_at_0x100() {
        assert!(!ErrorCode::UnexpectedMsgId.is_extended());
        assert!(ErrorCode::InvalidProfile.is_extended());
        assert_eq!(ErrorCode::InvalidFifoDequeue.value(), 0x105);
    }

    #[test]
    fn sample_errors_map_to_codes() {
        assert_eq!(SampleError::BadState("idle".into()).code(), ErrorCode::BadState);
        assert_eq!(
            SampleError::OutOfRange {
                value: 9.0,
                min: 0.0,
                max: 5.0
            }
            .code(),
            ErrorCode::InvalidMsgData
        );
    }
}
