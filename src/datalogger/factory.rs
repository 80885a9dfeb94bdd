//! Builds data loggers from the device configuration.

use std::sync::Arc;

use anyhow::Context;
use embedded_hal::delay::DelayNs;
use tracing::{info, warn};

use crate::datalogger::level::{Calibration, LevelSensor, RangeFinder};
use crate::datalogger::logger::{DataLogger, DeviceIdentity};
use crate::datalogger::publish::Publish;
use crate::datalogger::scheduler::Scheduler;
use crate::datalogger::sensor::{Sensor, SensorError, SensorKind};
use crate::device::{DeviceConfig, PeripheralConfig, PinMapping};

/// Creates one logger per configured sensor and adds it to `scheduler`.
///
/// `ranging` opens the range finder wired to the given pins. Peripherals
/// that fail to build are logged and skipped. Returns how many loggers were
/// added.
pub fn build_loggers<P, D>(
    device: &DeviceConfig,
    publisher: Arc<dyn Publish>,
    scheduler: &mut Scheduler,
    mut ranging: P,
    delay: D,
) -> usize
where
    P: FnMut(&PinMapping) -> Result<Box<dyn RangeFinder>, SensorError>,
    D: DelayNs + Clone + 'static,
{
    let identity = DeviceIdentity {
        device_id: device.id.clone(),
        location: device.location,
    };

    let mut built = 0;
    for (key, peripheral) in device.sensors() {
        let sensor = build_sensor(device, key, peripheral, &mut ranging, delay.clone());
        let logger = sensor.and_then(|sensor| {
            let logger = DataLogger::new(
                identity.clone(),
                Arc::clone(&publisher),
                &peripheral.config.interval,
                peripheral.config.topic.clone(),
                sensor,
                scheduler.tick_source(),
            )?;
            Ok(logger)
        });

        match logger {
            Ok(logger) => {
                info!(key, sensor = %peripheral.id, "Configured data logger");
                scheduler.add(logger);
                built += 1;
            }
            Err(e) => warn!(key, sensor = %peripheral.id, "Skipping peripheral: {:#}", e),
        }
    }
    built
}

fn build_sensor<P, D>(
    device: &DeviceConfig,
    key: &str,
    peripheral: &PeripheralConfig,
    ranging: &mut P,
    delay: D,
) -> anyhow::Result<Box<dyn Sensor>>
where
    P: FnMut(&PinMapping) -> Result<Box<dyn RangeFinder>, SensorError>,
    D: DelayNs + 'static,
{
    let kind = SensorKind::from_peripheral(&peripheral.id, &peripheral.name)
        .with_context(|| format!("unsupported sensor '{}'", peripheral.name))?;

    match kind {
        SensorKind::Level => {
            let pins = device
                .pins_for(key, peripheral)
                .context("no pin mapping")?;
            info!(
                trigger = pins.trigger_pin,
                echo = pins.echo_pin,
                "Configured level sensor pins"
            );
            let calibration = Calibration::from_parameters(&peripheral.config.parameters)?;
            let finder = ranging(pins)?;
            Ok(Box::new(LevelSensor::new(
                peripheral.id.clone(),
                finder,
                delay,
                calibration,
            )))
        }
    }
}
