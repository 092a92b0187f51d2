use serde::{Deserialize, Serialize};

/// Kind of physical quantity a sensor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    #[default]
    None,
    Voltage,
    Current,
    Irradiance,
    Temperature,
    Reserved1,
    Reserved2,
    Reserved3,
}

impl MeasurementType {
    pub const ALL: [MeasurementType; 8] = [
        MeasurementType::None,
        MeasurementType::Voltage,
        MeasurementType::Current,
        MeasurementType::Irradiance,
        MeasurementType::Temperature,
        MeasurementType::Reserved1,
        MeasurementType::Reserved2,
        MeasurementType::Reserved3,
    ];

    /// Stable numeric tag, as carried in message frames.
    pub fn tag(self) -> u8 {
        match self {
            MeasurementType::None => 0,
            MeasurementType::Voltage => 1,
            MeasurementType::Current => 2,
            MeasurementType::Irradiance => 3,
            MeasurementType::Temperature => 4,
            MeasurementType::Reserved1 => 5,
            MeasurementType::Reserved2 => 6,
            MeasurementType::Reserved3 => 7,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn key(self) -> &'static str {
        match self {
            MeasurementType::None => "none",
            MeasurementType::Voltage => "voltage",
            MeasurementType::Current => "current",
            MeasurementType::Irradiance => "irradiance",
            MeasurementType::Temperature => "temperature",
            MeasurementType::Reserved1 => "reserved1",
            MeasurementType::Reserved2 => "reserved2",
            MeasurementType::Reserved3 => "reserved3",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MeasurementType::Voltage => "V",
            MeasurementType::Current => "A",
            MeasurementType::Irradiance => "W/m2",
            MeasurementType::Temperature => "degC",
            _ => "",
        }
    }
}

impl std::fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
