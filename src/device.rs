//! Device configuration and the hardware-facing collaborators.
//!
//! The JSON device configuration is written by the provisioning API and read
//! at startup to decide which peripherals to log. Keys missing from the file
//! fall back to the built-in defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::{ConfigError, Mode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: String,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker host name or address.
    pub ip: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
}

fn default_mqtt_port() -> u16 {
    1883
}

/// Where the node is installed.
///
/// Accepts either `[lon, lat]` or `{"lat": .., "lon": ..}`; coordinates may
/// be numbers or numeric strings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LocationRepr")]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LocationRepr {
    Pair(Number, Number),
    Object { lat: Number, lon: Number },
}

impl TryFrom<LocationRepr> for Location {
    type Error = ConfigError;

    fn try_from(repr: LocationRepr) -> Result<Self, Self::Error> {
        let (lon, lat) = match repr {
            LocationRepr::Pair(lon, lat) => (lon, lat),
            LocationRepr::Object { lat, lon } => (lon, lat),
        };
        Ok(Location {
            lat: lat.as_f64()?,
            lon: lon.as_f64()?,
        })
    }
}

/// A number that provisioning clients sometimes send as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Num(f64),
    Text(String),
}

impl Number {
    pub fn as_f64(&self) -> Result<f64, ConfigError> {
        match self {
            Number::Num(n) => Ok(*n),
            Number::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidMeasure(s.clone())),
        }
    }
}

/// Per-peripheral logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeripheralSettings {
    pub topic: String,
    pub interval: String,
    #[serde(default)]
    pub trigger: Option<Value>,
    /// Sensor-specific calibration, interpreted by the sensor.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeripheralConfig {
    /// `sensor` or `actuator`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human name, e.g. `LevelSensor`.
    #[serde(default)]
    pub name: String,
    /// Model id, e.g. `USLS01`.
    pub id: String,
    pub config: PeripheralSettings,
}

impl PeripheralConfig {
    pub fn is_sensor(&self) -> bool {
        self.kind == "sensor"
    }
}

/// Pins a ranging sensor is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMapping {
    pub trigger_pin: u8,
    pub echo_pin: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub id: String,
    pub version: String,
    pub arch: String,
    pub wifi: WifiConfig,
    pub mqtt: MqttConfig,
    pub location: Location,
    pub peripherals: BTreeMap<String, PeripheralConfig>,
    pub topic_prefix: BTreeMap<String, String>,
    pub pin_mapping: BTreeMap<String, PinMapping>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let parameters = serde_json::json!({
            "dam_height": {"value": 1500, "unit": "mm"},
            "sensor_height": {"value": 1700, "unit": "mm"},
            "dam_diameter": {"value": 6, "unit": "m"},
        });
        let parameters = match parameters {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let peripherals = BTreeMap::from([(
            "0".to_string(),
            PeripheralConfig {
                kind: "sensor".to_string(),
                name: "LevelSensor".to_string(),
                id: "USLS01".to_string(),
                config: PeripheralSettings {
                    topic: "dam/level".to_string(),
                    interval: "15m".to_string(),
                    trigger: None,
                    parameters,
                },
            },
        )]);

        Self {
            id: "FB20GY".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            arch: std::env::consts::ARCH.to_string(),
            wifi: WifiConfig {
                ssid: "SenceIt".to_string(),
                password: None,
            },
            mqtt: MqttConfig {
                ip: "senceit-ctrl".to_string(),
                port: default_mqtt_port(),
            },
            location: Location {
                lat: -23.54654,
                lon: 25.59877,
            },
            peripherals,
            topic_prefix: BTreeMap::from([
                ("sensor".to_string(), "stat".to_string()),
                ("actuator".to_string(), "cmnd".to_string()),
            ]),
            pin_mapping: BTreeMap::from([(
                "USLS01".to_string(),
                PinMapping {
                    trigger_pin: 14,
                    echo_pin: 15,
                },
            )]),
        }
    }
}

impl DeviceConfig {
    /// Reads the device configuration. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No device configuration, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Sensor peripherals, keyed by their configuration key.
    pub fn sensors(&self) -> impl Iterator<Item = (&str, &PeripheralConfig)> {
        self.peripherals
            .iter()
            .filter(|(_, p)| p.is_sensor())
            .map(|(key, p)| (key.as_str(), p))
    }

    /// Pin mapping for a peripheral, by configuration key then model id.
    pub fn pins_for(&self, key: &str, peripheral: &PeripheralConfig) -> Option<&PinMapping> {
        self.pin_mapping
            .get(key)
            .or_else(|| self.pin_mapping.get(&peripheral.id))
    }
}

/// Device operations the provisioning API needs.
pub trait DeviceControl: Send + Sync {
    /// SSIDs of open networks in range.
    fn wifi_networks(&self) -> Vec<String>;

    /// Makes the next boot start in run mode.
    fn enable_run_mode(&self) -> anyhow::Result<()>;

    /// Restarts the node after `after`.
    fn schedule_reboot(&self, after: Duration);
}

/// [`DeviceControl`] for a node running on a host operating system.
///
/// The boot mode is recorded in a marker file and a reboot is a graceful
/// shutdown of the event loop, left to the supervisor to restart.
pub struct HostDevice {
    mode_file: PathBuf,
    shutdown: Arc<watch::Sender<bool>>,
}

impl HostDevice {
    pub fn new(mode_file: impl Into<PathBuf>, shutdown: watch::Sender<bool>) -> Self {
        Self {
            mode_file: mode_file.into(),
            shutdown: Arc::new(shutdown),
        }
    }
}

impl DeviceControl for HostDevice {
    fn wifi_networks(&self) -> Vec<String> {
        Vec::new()
    }

    fn enable_run_mode(&self) -> anyhow::Result<()> {
        info!("Enabling run mode on restart");
        std::fs::write(&self.mode_file, Mode::Run.as_str())?;
        Ok(())
    }

    fn schedule_reboot(&self, after: Duration) {
        info!(after_ms = after.as_millis() as u64, "Reboot scheduled");
        let shutdown = Arc::clone(&self.shutdown);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if shutdown.send(true).is_err() {
                warn!("Event loop already stopped");
            }
        });
    }
}
