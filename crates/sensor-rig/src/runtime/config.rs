use crate::error::ConfigError;
use sensor_spine::MeasurementType;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Counter,
    Sine,
}

impl SensorKind {
    pub fn measurement(self) -> MeasurementType {
        match self {
            SensorKind::Counter => MeasurementType::None,
            SensorKind::Sine => MeasurementType::Voltage,
        }
    }
}

impl FromStr for SensorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(SensorKind::Counter),
            "sine" => Ok(SensorKind::Sine),
            other => Err(ConfigError::UnknownSensor(other.to_string())),
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Counter => f.write_str("counter"),
            SensorKind::Sine => f.write_str("sine"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub run_seconds: Option<u64>,
    pub period_ms: u64,
    pub sensors: Vec<SensorKind>,
    pub sample_delay_ms: Option<u64>,
    pub fail_every: u64,
    pub queue_capacity: usize,
    pub json_logs: bool,
    pub metrics_addr: Option<String>,
    pub sample_log: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            run_seconds: None,
            period_ms: 100,
            sensors: Vec::new(),
            sample_delay_ms: None,
            fail_every: 0,
            queue_capacity: sensor_spine::dispatch::DEFAULT_QUEUE_CAPACITY,
            json_logs: false,
            metrics_addr: None,
            sample_log: None,
        }
    }
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, ConfigError> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingValue {
            flag: flag.to_string(),
        })
}

fn number<T: FromStr>(args: &[String], i: usize, flag: &str) -> Result<T, ConfigError> {
    let raw = value(args, i, flag)?;
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value: raw.to_string(),
    })
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--sensor" => {
                    cfg.sensors.push(value(args, i, flag)?.parse()?);
                    i += 1;
                }
                "--period-ms" => {
                    cfg.period_ms = number(args, i, flag)?;
                    if cfg.period_ms == 0 {
                        return Err(ConfigError::InvalidValue {
                            flag: flag.to_string(),
                            value: "0".to_string(),
                        });
                    }
                    i += 1;
                }
                "--sample-delay-ms" => {
                    cfg.sample_delay_ms = Some(number(args, i, flag)?);
                    i += 1;
                }
                "--fail-every" => {
                    cfg.fail_every = number(args, i, flag)?;
                    i += 1;
                }
                "--queue-capacity" => {
                    cfg.queue_capacity = number(args, i, flag)?;
                    i += 1;
                }
                "--run-seconds" => {
                    cfg.run_seconds = Some(number(args, i, flag)?);
                    i += 1;
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--metrics-addr" => {
                    cfg.metrics_addr = Some(value(args, i, flag)?.to_string());
                    i += 1;
                }
                "--sample-log" => {
                    cfg.sample_log = Some(PathBuf::from(value(args, i, flag)?));
                    i += 1;
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                other => return Err(ConfigError::UnknownFlag(other.to_string())),
            }
            i += 1;
        }

        if cfg.sensors.is_empty() {
            cfg.sensors.push(SensorKind::Counter);
        }
        Ok(cfg)
    }

    pub fn print_help() {
        println!(
            r#"sensor-rig - periodic sampling of simulated sensors

USAGE:
    sensor-rig [OPTIONS]

OPTIONS:
    --sensor <KIND>           Add a simulated sensor (counter|sine); repeatable [default: counter]
    --period-ms <MS>          Sample period in milliseconds [default: 100]
    --sample-delay-ms <MS>    Artificial conversion time per sample (slow device)
    --fail-every <N>          Make every N-th read fail
    --queue-capacity <N>      Dispatch queue capacity [default: 256]
    --run-seconds <SECS>      Run for a fixed duration then exit
    --json-logs               Output logs in JSON format
    --metrics-addr <ADDR>     Enable Prometheus metrics server on address (e.g., 0.0.0.0:9100)
    --sample-log <PATH>       Append every dispatched sample to a JSONL file
    -h, --help                Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                  Set log filter (e.g., RUST_LOG=debug,sensor_spine=trace)

EXAMPLES:
    # Two sensors at 50 Hz for ten seconds
    sensor-rig --sensor counter --sensor sine --period-ms 20 --run-seconds 10

    # Slow device: 25 ms conversions at a 10 ms period
    sensor-rig --period-ms 10 --sample-delay-ms 25 --metrics-addr 127.0.0.1:9100
"#
        );
    }
}
