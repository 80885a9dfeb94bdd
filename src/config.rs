//! Node runtime settings.
//!
//! Loaded once at startup from a YAML file, then overridden by environment
//! variables, and passed down to the components that need it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::http::connection::ConnectionLimits;
use crate::http::router::DEFAULT_WWW_ROOT;

/// Environment variable naming the settings file.
pub const CONFIG_PATH_VAR: &str = "SENCEIT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "senceit.yaml";

/// Configuration failures, for both node settings and device configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid device configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown operating mode '{0}'")]
    InvalidMode(String),

    #[error("invalid interval '{0}'")]
    InvalidInterval(String),

    #[error("Unsupported measurement unit '{0}'")]
    UnsupportedUnit(String),

    #[error("invalid measure '{0}'")]
    InvalidMeasure(String),

    #[error("missing parameter '{0}'")]
    MissingParameter(String),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

/// Which half of the firmware runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Provisioning web server.
    #[default]
    Config,
    /// Sensor sampling and publishing.
    Run,
}

impl Mode {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "config" => Ok(Mode::Config),
            "run" => Ok(Mode::Run),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Config => "config",
            Mode::Run => "run",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub www_root: PathBuf,
    pub read_timeout_ms: u64,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:80".to_string(),
            www_root: PathBuf::from(DEFAULT_WWW_ROOT),
            read_timeout_ms: 5000,
            max_body_bytes: 8 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn limits(&self) -> ConnectionLimits {
        ConnectionLimits {
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    /// The JSON device configuration written by provisioning.
    pub device_config: PathBuf,
    /// Marker file recording the mode to boot into.
    pub mode_file: PathBuf,
    pub mode: Mode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            device_config: PathBuf::from("config.json"),
            mode_file: PathBuf::from("device_mode"),
            mode: Mode::default(),
        }
    }
}

impl Config {
    /// Loads settings from `$SENCEIT_CONFIG` (or `senceit.yaml`), the mode
    /// marker file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut cfg = Self::from_file(&path)?;
        cfg.apply_mode_file()?;
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// Reads a settings file. A missing file yields the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_yaml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Applies `LISTEN`, `WWW_ROOT` and `NODE_MODE` from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("LISTEN") {
            self.server.listen_addr = addr;
        }
        if let Some(root) = lookup("WWW_ROOT") {
            self.server.www_root = PathBuf::from(root);
        }
        if let Some(mode) = lookup("NODE_MODE") {
            self.mode = Mode::parse(&mode)?;
        }
        Ok(())
    }

    /// Picks up the mode recorded by provisioning, if any.
    pub fn apply_mode_file(&mut self) -> Result<(), ConfigError> {
        match std::fs::read_to_string(&self.mode_file) {
            Ok(text) => {
                self.mode = Mode::parse(&text)?;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ConfigError::Io {
                path: self.mode_file.clone(),
                source,
            }),
        }
    }
}
