use std::sync::{Arc, Mutex};
use std::time::Duration;

use senceit_node::datalogger::delay::StdDelay;
use senceit_node::datalogger::factory::build_loggers;
use senceit_node::datalogger::level::RangeFinder;
use senceit_node::datalogger::logger::{DataLogger, DeviceIdentity, Tick};
use senceit_node::datalogger::publish::Publish;
use senceit_node::datalogger::scheduler::Scheduler;
use senceit_node::datalogger::sensor::{Reading, Sensor, SensorError, SensorKind};
use senceit_node::device::{DeviceConfig, Location, PeripheralConfig, PeripheralSettings, PinMapping};
use serde_json::{Map, Value, json};

type Published = Arc<Mutex<Vec<(String, String)>>>;

fn recorder() -> (Arc<dyn Publish>, Published) {
    let log: Published = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let publisher = move |topic: &str, payload: &str| {
        sink.lock().unwrap().push((topic.to_string(), payload.to_string()));
    };
    (Arc::new(publisher), log)
}

fn identity() -> DeviceIdentity {
    DeviceIdentity {
        device_id: "FB20GY".to_string(),
        location: Location {
            lat: -23.54654,
            lon: 25.59877,
        },
    }
}

struct FixedSensor;

impl Sensor for FixedSensor {
    fn id(&self) -> &str {
        "USLS01"
    }

    fn kind(&self) -> SensorKind {
        SensorKind::Level
    }

    fn measure(&mut self) -> Result<Vec<Reading>, SensorError> {
        Ok(vec![Reading::new("Level", "mm", Some(1000))])
    }
}

struct FailingSensor;

impl Sensor for FailingSensor {
    fn id(&self) -> &str {
        "USLS01"
    }

    fn kind(&self) -> SensorKind {
        SensorKind::Level
    }

    fn measure(&mut self) -> Result<Vec<Reading>, SensorError> {
        Err(SensorError::Ranging("no echo".into()))
    }
}

struct FixedDistance(u32);

impl RangeFinder for FixedDistance {
    fn distance_mm(&mut self) -> Result<u32, SensorError> {
        Ok(self.0)
    }
}

fn logger(scheduler: &mut Scheduler, publisher: Arc<dyn Publish>, interval: &str, sensor: Box<dyn Sensor>) -> DataLogger {
    DataLogger::new(identity(), publisher, interval, "dam/level", sensor, scheduler.tick_source()).unwrap()
}

#[test]
fn test_logger_interval_conversion() {
    let mut scheduler = Scheduler::new();
    let (publisher, _) = recorder();

    for (interval, ms) in [("15m", 900_000), ("1h", 3_600_000), ("30s", 30_000), ("45", 45_000)] {
        let logger = logger(&mut scheduler, Arc::clone(&publisher), interval, Box::new(FixedSensor));
        assert_eq!(logger.interval_ms(), ms);
    }
}

#[test]
fn test_logger_rejects_invalid_interval() {
    let mut scheduler = Scheduler::new();
    let (publisher, _) = recorder();

    for interval in ["", "0m", "soon", "-5s", "5000000000000000h"] {
        let result = DataLogger::new(
            identity(),
            Arc::clone(&publisher),
            interval,
            "dam/level",
            Box::new(FixedSensor),
            scheduler.tick_source(),
        );
        assert!(result.is_err(), "{interval:?}");
    }
}

#[test]
fn test_logger_payload_shape() {
    let mut scheduler = Scheduler::new();
    let (publisher, _) = recorder();
    let mut logger = logger(&mut scheduler, publisher, "15m", Box::new(FixedSensor));

    let payload: Value = serde_json::from_str(&logger.payload().unwrap()).unwrap();

    assert_eq!(payload["device_id"], "FB20GY");
    assert_eq!(payload["peripheral_id"], "USLS01");
    assert_eq!(payload["type"], "LevelSensor");
    assert_eq!(payload["location"], json!({"lon": 25.59877, "lat": -23.54654}));
    assert_eq!(payload["measurement"], json!([{"type": "Level", "unit": "mm", "value": 1000}]));
    assert!(payload["timestamp"].as_u64().unwrap() > 0);
}

#[tokio::test(start_paused = true)]
async fn test_logger_start_twice_arms_one_timer() {
    let mut scheduler = Scheduler::new();
    let (publisher, published) = recorder();
    let logger = logger(&mut scheduler, publisher, "30s", Box::new(FixedSensor));
    scheduler.add(logger);

    scheduler.start_all();
    scheduler.start_all();
    assert!(scheduler.loggers().all(DataLogger::is_running));

    tokio::time::sleep(Duration::from_secs(95)).await;

    assert_eq!(scheduler.run_pending(), 3);
    let published = published.lock().unwrap();
    assert_eq!(published.len(), 3);
    assert!(published.iter().all(|(topic, _)| topic == "dam/level"));
}

#[tokio::test(start_paused = true)]
async fn test_logger_first_tick_after_one_interval() {
    let mut scheduler = Scheduler::new();
    let (publisher, _) = recorder();
    let logger = logger(&mut scheduler, publisher, "1m", Box::new(FixedSensor));
    scheduler.add(logger);
    scheduler.start_all();

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(scheduler.run_pending(), 0);

    let tick = scheduler.next_tick().await;
    assert_eq!(tick, Tick::new(0, 1));
    assert!(scheduler.dispatch(tick));
}

#[tokio::test(start_paused = true)]
async fn test_logger_stop_disarms_timer() {
    let mut scheduler = Scheduler::new();
    let (publisher, published) = recorder();
    let logger = logger(&mut scheduler, publisher, "10s", Box::new(FixedSensor));
    scheduler.add(logger);

    scheduler.start_all();
    tokio::time::sleep(Duration::from_secs(15)).await;
    scheduler.stop_all();
    assert!(!scheduler.loggers().any(DataLogger::is_running));

    tokio::time::sleep(Duration::from_secs(60)).await;

    // The tick queued before stopping is ignored too.
    assert_eq!(scheduler.run_pending(), 0);
    assert!(published.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_logger_restart_ignores_ticks_from_old_timer() {
    let mut scheduler = Scheduler::new();
    let (publisher, published) = recorder();
    let logger = logger(&mut scheduler, publisher, "30s", Box::new(FixedSensor));
    scheduler.add(logger);

    scheduler.start_all();
    tokio::time::sleep(Duration::from_secs(31)).await;
    scheduler.stop_all();
    scheduler.start_all();

    assert_eq!(scheduler.run_pending(), 0);
    assert!(published.lock().unwrap().is_empty());

    // The new timer still ticks on its own schedule.
    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(scheduler.run_pending(), 1);
    assert_eq!(published.lock().unwrap().len(), 1);
    scheduler.stop_all();
}

#[tokio::test]
async fn test_scheduler_dispatch() {
    let mut scheduler = Scheduler::new();
    let (publisher, published) = recorder();
    let good = logger(&mut scheduler, Arc::clone(&publisher), "15m", Box::new(FixedSensor));
    let bad = logger(&mut scheduler, publisher, "15m", Box::new(FailingSensor));
    let (good_id, bad_id) = (good.id(), bad.id());
    scheduler.add(good);
    scheduler.add(bad);

    // Stopped loggers ignore ticks.
    assert!(!scheduler.dispatch(Tick::new(good_id, 0)));

    scheduler.start_all();
    assert!(scheduler.dispatch(Tick::new(good_id, 1)));
    assert!(scheduler.dispatch(Tick::new(bad_id, 1)));
    assert!(!scheduler.dispatch(Tick::new(42, 1)));

    assert_eq!(published.lock().unwrap().len(), 1);
    scheduler.stop_all();
}

#[test]
fn test_closure_is_a_publisher() {
    let (publisher, published) = recorder();
    publisher.publish("stat/level", "{}");

    assert_eq!(
        published.lock().unwrap().as_slice(),
        [("stat/level".to_string(), "{}".to_string())]
    );
}

fn peripheral(kind: &str, name: &str, id: &str, interval: &str) -> PeripheralConfig {
    let mut parameters = Map::new();
    parameters.insert("dam_height".into(), json!({"value": 1500, "unit": "mm"}));
    parameters.insert("sensor_height".into(), json!({"value": 1700, "unit": "mm"}));
    parameters.insert("dam_diameter".into(), json!({"value": 6, "unit": "m"}));

    PeripheralConfig {
        kind: kind.to_string(),
        name: name.to_string(),
        id: id.to_string(),
        config: PeripheralSettings {
            topic: "dam/level".to_string(),
            interval: interval.to_string(),
            trigger: None,
            parameters,
        },
    }
}

#[tokio::test]
async fn test_factory_builds_configured_sensors() {
    let mut device = DeviceConfig::default();
    device.peripherals.insert("1".into(), peripheral("sensor", "Thermometer", "TMP01", "1m"));
    device.peripherals.insert("2".into(), peripheral("actuator", "Pump", "PMP01", "1m"));
    device.peripherals.insert("3".into(), peripheral("sensor", "LevelSensor", "USLS02", "whenever"));
    device.peripherals.insert("4".into(), peripheral("sensor", "LevelSensor", "USLS03", "30s"));
    device.pin_mapping.insert("4".into(), PinMapping { trigger_pin: 4, echo_pin: 5 });

    let mut wired = Vec::new();
    let mut scheduler = Scheduler::new();
    let (publisher, published) = recorder();
    let built = build_loggers(
        &device,
        publisher,
        &mut scheduler,
        |pins: &PinMapping| {
            wired.push(*pins);
            Ok(Box::new(FixedDistance(700)) as Box<dyn RangeFinder>)
        },
        StdDelay,
    );

    assert_eq!(built, 2);
    assert_eq!(scheduler.len(), 2);
    assert_eq!(
        wired,
        vec![
            PinMapping { trigger_pin: 14, echo_pin: 15 },
            PinMapping { trigger_pin: 4, echo_pin: 5 },
        ]
    );

    let intervals: Vec<u64> = scheduler.loggers().map(DataLogger::interval_ms).collect();
    assert_eq!(intervals, vec![900_000, 30_000]);

    scheduler.start_all();
    let ticks: Vec<Tick> = scheduler.loggers().map(DataLogger::tick).collect();
    assert!(scheduler.dispatch(ticks[0]));

    let published = published.lock().unwrap();
    let (topic, payload) = &published[0];
    let payload: Value = serde_json::from_str(payload).unwrap();
    assert_eq!(topic, "dam/level");
    assert_eq!(payload["peripheral_id"], "USLS01");
    assert_eq!(
        payload["measurement"],
        json!([
            {"type": "Level", "unit": "mm", "value": 1000},
            {"type": "Level", "unit": "%", "value": 66},
            {"type": "Level", "unit": "liter", "value": 28274},
        ])
    );
    drop(published);
    scheduler.stop_all();
}

#[test]
fn test_factory_skips_sensor_without_pins() {
    let mut device = DeviceConfig::default();
    device.pin_mapping.clear();

    let mut scheduler = Scheduler::new();
    let (publisher, _) = recorder();
    let built = build_loggers(
        &device,
        publisher,
        &mut scheduler,
        |_: &PinMapping| Ok(Box::new(FixedDistance(700)) as Box<dyn RangeFinder>),
        StdDelay,
    );

    assert_eq!(built, 0);
    assert!(scheduler.is_empty());
}
