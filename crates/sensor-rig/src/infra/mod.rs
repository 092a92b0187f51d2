pub mod metrics;
pub mod sample_log;
