use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use senceit_node::config::{Config, ConfigError, Mode};
use senceit_node::device::{DeviceConfig, Location};
use serde_json::json;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:80");
    assert_eq!(cfg.server.www_root, PathBuf::from("/www"));
    assert_eq!(cfg.device_config, PathBuf::from("config.json"));
    assert_eq!(cfg.mode, Mode::Config);

    let limits = cfg.server.limits();
    assert_eq!(limits.read_timeout, Duration::from_secs(5));
    assert_eq!(limits.max_body_bytes, 8192);
}

#[test]
fn test_config_from_yaml() {
    let cfg = Config::from_yaml_str(
        "server:\n  listen_addr: 127.0.0.1:8080\n  max_body_bytes: 1024\nmode: run\n",
    )
    .unwrap();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.server.max_body_bytes, 1024);
    assert_eq!(cfg.server.read_timeout_ms, 5000);
    assert_eq!(cfg.mode, Mode::Run);
}

#[test]
fn test_config_empty_yaml_is_default() {
    let cfg = Config::from_yaml_str("  \n").unwrap();
    assert_eq!(cfg.server.listen_addr, Config::default().server.listen_addr);
}

#[test]
fn test_config_invalid_yaml() {
    assert!(matches!(
        Config::from_yaml_str("server: [1, 2"),
        Err(ConfigError::Yaml(_))
    ));
}

#[test]
fn test_config_missing_file_is_default() {
    let dir = TempDir::new().unwrap();
    let cfg = Config::from_file(dir.path().join("absent.yaml")).unwrap();

    assert_eq!(cfg.mode, Mode::Config);
}

#[test]
fn test_config_env_overrides() {
    let mut cfg = Config::default();
    cfg.apply_overrides(env(&[
        ("LISTEN", "0.0.0.0:3000"),
        ("WWW_ROOT", "/srv/www"),
        ("NODE_MODE", "RUN"),
    ]))
    .unwrap();

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    assert_eq!(cfg.server.www_root, PathBuf::from("/srv/www"));
    assert_eq!(cfg.mode, Mode::Run);
}

#[test]
fn test_config_invalid_mode_override() {
    let mut cfg = Config::default();
    let err = cfg.apply_overrides(env(&[("NODE_MODE", "sleep")])).unwrap_err();

    assert!(matches!(err, ConfigError::InvalidMode(mode) if mode == "sleep"));
}

#[test]
fn test_config_mode_file() {
    let dir = TempDir::new().unwrap();
    let mut cfg = Config {
        mode_file: dir.path().join("device_mode"),
        ..Config::default()
    };

    cfg.apply_mode_file().unwrap();
    assert_eq!(cfg.mode, Mode::Config);

    std::fs::write(&cfg.mode_file, "run\n").unwrap();
    cfg.apply_mode_file().unwrap();
    assert_eq!(cfg.mode, Mode::Run);
}

#[test]
fn test_device_config_defaults() {
    let device = DeviceConfig::default();

    assert_eq!(device.id, "FB20GY");
    assert_eq!(device.mqtt.port, 1883);
    assert_eq!(device.sensors().count(), 1);
    let (key, peripheral) = device.sensors().next().unwrap();
    assert_eq!(device.pins_for(key, peripheral).unwrap().trigger_pin, 14);
}

#[test]
fn test_device_config_from_provisioning_body() {
    let device = DeviceConfig::from_value(json!({
        "id": "AB12CD",
        "wifi": {"ssid": "Dam", "password": "secret"},
        "mqtt": {"ip": "10.0.0.2"},
        "location": ["25.5", "-23.5"],
        "peripherals": {
            "0": {
                "type": "sensor",
                "name": "LevelSensor",
                "id": "USLS01",
                "config": {
                    "topic": "dam/level",
                    "interval": "5m",
                    "parameters": {
                        "dam_height": {"value": 2, "unit": "m"},
                        "sensor_height": {"value": 220, "unit": "cm"}
                    }
                }
            }
        }
    }))
    .unwrap();

    assert_eq!(device.id, "AB12CD");
    assert_eq!(device.wifi.password.as_deref(), Some("secret"));
    assert_eq!(device.mqtt.port, 1883);
    assert_eq!(device.location, Location { lat: -23.5, lon: 25.5 });
    assert_eq!(device.peripherals["0"].config.interval, "5m");
    // Keys left out fall back to the defaults.
    assert!(device.pin_mapping.contains_key("USLS01"));
}

#[test]
fn test_device_config_location_object() {
    let device = DeviceConfig::from_json_str(r#"{"location": {"lat": 1.5, "lon": 2.5}}"#).unwrap();

    assert_eq!(device.location, Location { lat: 1.5, lon: 2.5 });
}

#[test]
fn test_device_config_password_not_written_back() {
    let mut device = DeviceConfig::default();
    device.wifi.password = Some("secret".into());

    let value = serde_json::to_value(&device).unwrap();
    assert!(value["wifi"].get("password").is_none());
}

#[test]
fn test_device_config_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let device = DeviceConfig::load(dir.path().join("config.json")).unwrap();

    assert_eq!(device, DeviceConfig::default());
}
