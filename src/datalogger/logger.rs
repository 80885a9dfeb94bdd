use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info};

use crate::config::ConfigError;
use crate::datalogger::interval::parse_interval;
use crate::datalogger::publish::Publish;
use crate::datalogger::sensor::{Reading, Sensor, SensorError};
use crate::device::Location;

/// Event posted by a logger's timer.
///
/// `id` picks the logger. `generation` counts the logger's starts, so ticks
/// left queued by a timer that has since been stopped can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tick {
    pub id: usize,
    pub generation: u64,
}

impl Tick {
    pub fn new(id: usize, generation: u64) -> Self {
        Self { id, generation }
    }
}

/// A logger's handle on the scheduler's tick queue.
#[derive(Debug, Clone)]
pub struct TickSource {
    id: usize,
    tx: UnboundedSender<Tick>,
}

impl TickSource {
    pub fn new(id: usize, tx: UnboundedSender<Tick>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> usize {
        self.id
    }
}

/// Which node a payload comes from and where it is.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub location: Location,
}

#[derive(Serialize)]
struct Payload<'a> {
    timestamp: u64,
    device_id: &'a str,
    peripheral_id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    location: PayloadLocation,
    measurement: Vec<Reading>,
}

#[derive(Serialize)]
struct PayloadLocation {
    lon: f64,
    lat: f64,
}

/// Periodically measures one sensor and publishes the result.
///
/// The timer only posts a [`Tick`]; the measurement itself runs when the
/// event loop hands the tick back through [`run`](Self::run).
pub struct DataLogger {
    sensor: Box<dyn Sensor>,
    publisher: Arc<dyn Publish>,
    topic: String,
    interval: Duration,
    device: DeviceIdentity,
    ticks: TickSource,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl DataLogger {
    /// Creates a stopped logger.
    ///
    /// # Errors
    ///
    /// Returns an error if `interval` is not a valid interval string.
    pub fn new(
        device: DeviceIdentity,
        publisher: Arc<dyn Publish>,
        interval: &str,
        topic: impl Into<String>,
        sensor: Box<dyn Sensor>,
        ticks: TickSource,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            sensor,
            publisher,
            topic: topic.into(),
            interval: parse_interval(interval)?,
            device,
            ticks,
            generation: 0,
            timer: None,
        })
    }

    /// Scheduler key of this logger.
    pub fn id(&self) -> usize {
        self.ticks.id()
    }

    /// The tick the current timer posts.
    pub fn tick(&self) -> Tick {
        Tick::new(self.ticks.id(), self.generation)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }

    pub fn sensor_id(&self) -> &str {
        self.sensor.id()
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Arms the periodic timer. Does nothing if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        self.generation += 1;
        let period = self.interval;
        let tick = self.tick();
        let tx = self.ticks.tx.clone();
        self.timer = Some(tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            loop {
                timer.tick().await;
                if tx.send(tick).is_err() {
                    break;
                }
            }
        }));

        info!(
            sensor = self.sensor.id(),
            interval_ms = self.interval_ms(),
            topic = %self.topic,
            "Started data logger"
        );
    }

    /// Disarms the timer. Ticks it already queued are ignored, even after a
    /// later restart.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            debug!(sensor = self.sensor.id(), "Stopped data logger");
        }
    }

    /// Measures once and publishes the payload.
    pub fn run(&mut self) -> Result<(), SensorError> {
        let payload = self.payload()?;
        self.publisher.publish(&self.topic, &payload);
        info!(sensor = self.sensor.id(), topic = %self.topic, "Transmitting data");
        Ok(())
    }

    /// Measures once and encodes the JSON payload.
    pub fn payload(&mut self) -> Result<String, SensorError> {
        let measurement = self.sensor.measure()?;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let payload = Payload {
            timestamp,
            device_id: &self.device.device_id,
            peripheral_id: self.sensor.id(),
            kind: self.sensor.kind().as_str(),
            location: PayloadLocation {
                lon: self.device.location.lon,
                lat: self.device.location.lat,
            },
            measurement,
        };
        Ok(serde_json::to_string(&payload)?)
    }
}

impl Drop for DataLogger {
    fn drop(&mut self) {
        self.stop();
    }
}
