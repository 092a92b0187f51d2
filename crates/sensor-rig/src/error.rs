use sensor_spine::EngineError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{flag} expects a value")]
    MissingValue { flag: String },

    #[error("invalid value {value:?} for {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("unknown sensor kind {0:?} (expected counter or sine)")]
    UnknownSensor(String),

    #[error("unknown option {0} (see --help)")]
    UnknownFlag(String),
}

#[derive(Error, Debug)]
pub enum RigError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("failed to open sample log {}: {source}", .path.display())]
    SampleLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start dispatch queue: {0}")]
    Queue(#[source] std::io::Error),
}
