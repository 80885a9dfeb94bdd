use std::sync::Arc;

use senceit_node::app::{self, EventLoop};
use senceit_node::config::{Config, Mode};
use senceit_node::datalogger::delay::StdDelay;
use senceit_node::datalogger::level::RangeFinder;
use senceit_node::datalogger::publish::LogPublisher;
use senceit_node::datalogger::sensor::SensorError;
use senceit_node::device::{DeviceConfig, HostDevice, PinMapping};
use tokio::sync::watch;
use tracing::{Instrument, info, info_span};
use tracing_subscriber::EnvFilter;

/// Stand-in for the ultrasonic driver on hosts without GPIO.
struct Unattached(PinMapping);

impl RangeFinder for Unattached {
    fn distance_mm(&mut self) -> Result<u32, SensorError> {
        Err(SensorError::Ranging(format!(
            "no ranging driver attached to pins {}/{}",
            self.0.trigger_pin, self.0.echo_pin
        )))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let device = DeviceConfig::load(&cfg.device_config)?;
    info!(mode = cfg.mode.as_str(), version = %device.version, "Starting node");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let host = Arc::new(HostDevice::new(&cfg.mode_file, shutdown_tx));

    let event_loop: EventLoop = match cfg.mode {
        Mode::Config => app::config_mode(&cfg, host, shutdown_rx).await?,
        Mode::Run => {
            let publisher = Arc::new(LogPublisher::new(format!("{}:{}", device.mqtt.ip, device.mqtt.port)));
            app::run_mode(
                &device,
                publisher,
                |pins: &PinMapping| Ok(Box::new(Unattached(*pins)) as Box<dyn RangeFinder>),
                StdDelay,
                shutdown_rx,
            )
        }
    };

    let span = info_span!("node", device = %device.id);
    tokio::select! {
        _ = event_loop.run().instrument(span) => {
            info!("Event loop stopped");
        }

        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
