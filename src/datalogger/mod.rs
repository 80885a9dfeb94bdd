//! Interval-driven sensor logging.
//!
//! - **`logger`**: [`DataLogger`] arms a timer per peripheral and publishes readings
//! - **`scheduler`**: [`Scheduler`] owns the loggers and drains their tick queue
//! - **`factory`**: builds loggers from the device configuration
//! - **`sensor`**: the [`Sensor`] trait and published [`Reading`]s
//! - **`level`**: the ultrasonic level sensor and its calibration
//! - **`filter`**: median-of-three noise filter
//! - **`interval`**: `15m`-style interval parsing
//! - **`publish`**: the broker-facing [`Publish`] trait
//! - **`delay`**: a blocking [`DelayNs`](embedded_hal::delay::DelayNs) for hosts

pub mod delay;
pub mod factory;
pub mod filter;
pub mod interval;
pub mod level;
pub mod logger;
pub mod publish;
pub mod scheduler;
pub mod sensor;

pub use logger::{DataLogger, DeviceIdentity, Tick};
pub use publish::Publish;
pub use scheduler::Scheduler;
pub use sensor::{Reading, Sensor, SensorError, SensorKind};
