//! # Level sensor
//!
//! Derives the liquid level, fill percentage and volume of a round dam or
//! tank from an ultrasonic range finder mounted above it.
//!
//! ```text
//!   ┬  ── sensor ──            ┬
//!   │        │ distance        │
//!   │   ~~~~~~~~~~~~~~ surface │ sensor_height
//!   │ dam_height │ level       │
//!   ┴  ──── floor ────         ┴
//! ```
//!
//! Readings closer to the sensor than the dam rim (`distance <=
//! sensor_height - dam_height`) are echoes off the rim or noise and are
//! discarded before filtering.

use std::f64::consts::PI;

use embedded_hal::delay::DelayNs;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ConfigError;
use crate::datalogger::filter::signal_filter;
use crate::datalogger::sensor::{Reading, Sensor, SensorError, SensorKind};
use crate::device::Number;

/// Samples taken per measurement.
pub const SAMPLES: usize = 8;

/// Pause between samples so echoes settle.
pub const SAMPLE_DELAY_MS: u32 = 1;

/// Distance source, supplied by the ultrasonic driver.
pub trait RangeFinder {
    /// Distance to the nearest surface in millimeters.
    fn distance_mm(&mut self) -> Result<u32, SensorError>;
}

impl<T: RangeFinder + ?Sized> RangeFinder for Box<T> {
    fn distance_mm(&mut self) -> Result<u32, SensorError> {
        (**self).distance_mm()
    }
}

/// Converts a `{"value": .., "unit": ..}` parameter to millimeters.
///
/// `measure` is accepted as an alias of `value`, and the value may be a
/// number or a numeric string.
pub fn to_millimeters(name: &str, param: &Value) -> Result<i64, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let object = param.as_object().ok_or_else(|| invalid("expected an object"))?;
    let raw = object
        .get("value")
        .or_else(|| object.get("measure"))
        .ok_or_else(|| invalid("missing value"))?;
    let measure: Number =
        serde_json::from_value(raw.clone()).map_err(|_| invalid("value is not a number"))?;
    let unit = object
        .get("unit")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing unit"))?;

    let mult = match unit {
        "mm" => 1.0,
        "cm" => 10.0,
        "m" => 1000.0,
        other => return Err(ConfigError::UnsupportedUnit(other.to_string())),
    };

    Ok((measure.as_f64()? * mult).round() as i64)
}

/// Derived level quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelReading {
    /// Liquid depth in millimeters.
    pub level: i64,
    /// Depth as a share of the dam height.
    pub percentage: i64,
    /// Volume in liters, when the diameter is known.
    pub volume: Option<i64>,
}

/// Installation geometry, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    dam_height: i64,
    sensor_height: i64,
    dam_diameter: Option<i64>,
}

impl Calibration {
    pub fn new(dam_height: i64, sensor_height: i64, dam_diameter: Option<i64>) -> Result<Self, ConfigError> {
        if dam_height <= 0 {
            return Err(ConfigError::InvalidParameter {
                name: "dam_height".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(Self {
            dam_height,
            sensor_height,
            dam_diameter,
        })
    }

    /// Reads `dam_height`, `sensor_height` and the optional `dam_diameter`.
    pub fn from_parameters(params: &Map<String, Value>) -> Result<Self, ConfigError> {
        let required = |name: &str| {
            params
                .get(name)
                .ok_or_else(|| ConfigError::MissingParameter(name.to_string()))
                .and_then(|p| to_millimeters(name, p))
        };

        let dam_diameter = match params.get("dam_diameter") {
            Some(Value::Null) | None => None,
            Some(p) => Some(to_millimeters("dam_diameter", p)?),
        };

        Self::new(required("dam_height")?, required("sensor_height")?, dam_diameter)
    }

    pub fn dam_height(&self) -> i64 {
        self.dam_height
    }

    pub fn sensor_height(&self) -> i64 {
        self.sensor_height
    }

    pub fn dam_diameter(&self) -> Option<i64> {
        self.dam_diameter
    }

    /// Samples at or below this distance are rejected as noise.
    pub fn noise_floor(&self) -> i64 {
        self.sensor_height - self.dam_height
    }

    /// Computes level, fill percentage and volume for a measured distance.
    pub fn level(&self, distance: i64) -> LevelReading {
        let level = (self.sensor_height - distance).max(0);
        let percentage = (level as f64 / self.dam_height as f64 * 100.0).trunc() as i64;
        let volume = self.dam_diameter.map(|diameter| {
            let radius_m = diameter as f64 / 2000.0;
            (PI * radius_m * radius_m * level as f64).trunc() as i64
        });

        LevelReading {
            level,
            percentage,
            volume,
        }
    }
}

/// An ultrasonic level sensor.
pub struct LevelSensor<R, D> {
    id: String,
    ranging: R,
    delay: D,
    calibration: Calibration,
}

impl<R, D> LevelSensor<R, D>
where
    R: RangeFinder,
    D: DelayNs,
{
    /// Creates a [`LevelSensor`] for the given range finder and delay provider.
    #[must_use]
    pub fn new(id: impl Into<String>, ranging: R, delay: D, calibration: Calibration) -> Self {
        Self {
            id: id.into(),
            ranging,
            delay,
            calibration,
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Takes [`SAMPLES`] readings and returns the filtered distance in mm.
    ///
    /// # Errors
    ///
    /// Returns an error if the range finder fails.
    pub fn distance(&mut self) -> Result<i64, SensorError> {
        let floor = self.calibration.noise_floor();
        let mut samples = Vec::with_capacity(SAMPLES);

        for _ in 0..SAMPLES {
            let sample = i64::from(self.ranging.distance_mm()?);
            if sample > floor {
                samples.push(sample);
            }
            self.delay.delay_ms(SAMPLE_DELAY_MS);
        }

        if samples.is_empty() {
            warn!(sensor = %self.id, "All samples rejected as noise");
        }

        let distance = signal_filter(&mut samples);
        debug!(sensor = %self.id, distance, "Measured distance");
        Ok(distance)
    }
}

impl<R, D> Sensor for LevelSensor<R, D>
where
    R: RangeFinder,
    D: DelayNs,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> SensorKind {
        SensorKind::Level
    }

    fn measure(&mut self) -> Result<Vec<Reading>, SensorError> {
        let distance = self.distance()?;
        let LevelReading {
            level,
            percentage,
            volume,
        } = self.calibration.level(distance);

        Ok(vec![
            Reading::new("Level", "mm", Some(level)),
            Reading::new("Level", "%", Some(percentage)),
            Reading::new("Level", "liter", volume),
        ])
    }
}
