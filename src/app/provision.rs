//! The provisioning API served in config mode.
//!
//! - `GET /config` returns the current device configuration and the wifi
//!   networks in range.
//! - `POST /config` stores a new configuration, switches the node to run mode
//!   and reboots it shortly after answering.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::{Value, json};
use tracing::info;

use crate::device::{DeviceConfig, DeviceControl};
use crate::http::error::HttpError;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, StatusCode};
use crate::http::router::Http;

/// Delay between accepting a configuration and rebooting.
pub const REBOOT_DELAY: Duration = Duration::from_secs(5);

/// Registers the `/config` handlers on `http`.
pub fn register_routes(http: &mut Http, config_path: impl Into<PathBuf>, device: Arc<dyn DeviceControl>) {
    let config_path = config_path.into();

    let path = config_path.clone();
    let control = Arc::clone(&device);
    http.register_handler(Method::GET, "/config", move |req| get_config(req, &path, control.as_ref()));

    let path = config_path;
    let control = device;
    http.register_handler(Method::POST, "/config", move |req| save_config(req, &path, control.as_ref()));
}

fn get_config(_req: &Request, path: &Path, device: &dyn DeviceControl) -> anyhow::Result<Response> {
    let config = DeviceConfig::load(path)?;
    let mut body = serde_json::to_value(&config)?;
    if let Value::Object(map) = &mut body {
        map.insert("networks".to_string(), json!(device.wifi_networks()));
    }
    Ok(Response::json(StatusCode::Ok, body))
}

fn save_config(req: &Request, path: &Path, device: &dyn DeviceControl) -> anyhow::Result<Response> {
    let body = req
        .body()
        .ok_or_else(|| HttpError::BadRequest("missing configuration body".to_string()))?;
    DeviceConfig::from_value(body.clone())
        .map_err(|e| HttpError::BadRequest(e.to_string()))?;

    let text = serde_json::to_string_pretty(body)?;
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Saved device configuration");

    device.enable_run_mode()?;
    device.schedule_reboot(REBOOT_DELAY);

    Ok(Response::json(StatusCode::Ok, json!({ "success": true })))
}
