use serde::Serialize;

/// Failures while taking a measurement.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// The ranging driver could not produce a distance.
    #[error("ranging failed: {0}")]
    Ranging(String),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One measured quantity, published as `{"type", "unit", "value"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reading {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub unit: &'static str,
    /// `None` when the quantity cannot be derived from the configuration.
    pub value: Option<i64>,
}

impl Reading {
    pub fn new(kind: &'static str, unit: &'static str, value: Option<i64>) -> Self {
        Self { kind, unit, value }
    }
}

/// The sensor families the node knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Ultrasonic level sensor over a dam or tank.
    Level,
}

impl SensorKind {
    /// Resolves a configured peripheral by model id, then by name.
    pub fn from_peripheral(model: &str, name: &str) -> Option<Self> {
        match (model, name) {
            ("USLS01", _) | (_, "LevelSensor") => Some(SensorKind::Level),
            _ => None,
        }
    }

    /// The `type` field of published payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Level => "LevelSensor",
        }
    }
}

/// A peripheral that can be sampled on a timer.
pub trait Sensor {
    /// Model id of the peripheral.
    fn id(&self) -> &str;

    fn kind(&self) -> SensorKind;

    /// Takes one measurement.
    fn measure(&mut self) -> Result<Vec<Reading>, SensorError>;
}
