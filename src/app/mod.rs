//! Wiring for the two operating modes.
//!
//! Both modes run the same [`EventLoop`]: config mode with a webserver and
//! no loggers, run mode with loggers and no webserver.

pub mod provision;

use std::sync::Arc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use tokio::sync::watch;
use tracing::info;

use crate::config::Config;
use crate::datalogger::factory::build_loggers;
use crate::datalogger::level::RangeFinder;
use crate::datalogger::publish::Publish;
use crate::datalogger::scheduler::Scheduler;
use crate::datalogger::sensor::SensorError;
use crate::device::{DeviceConfig, DeviceControl, PinMapping};
use crate::http::router::Http;
use crate::server::Webserver;

/// Pause after a poll that found no client.
pub const IDLE_DELAY: Duration = Duration::from_millis(50);

/// The node's single main loop.
///
/// Alternates between polling the webserver for one client and handling the
/// ticks queued by data logger timers, until a reboot is requested.
pub struct EventLoop {
    web: Option<Webserver>,
    scheduler: Scheduler,
    shutdown: watch::Receiver<bool>,
}

impl EventLoop {
    pub fn new(web: Option<Webserver>, scheduler: Scheduler, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            web,
            scheduler,
            shutdown,
        }
    }

    pub fn webserver(&self) -> Option<&Webserver> {
        self.web.as_ref()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Runs until shutdown is signalled, then stops the loggers and releases
    /// the listener.
    pub async fn run(mut self) {
        self.scheduler.start_all();

        loop {
            if *self.shutdown.borrow() {
                info!("Shutdown requested");
                break;
            }

            match &self.web {
                Some(web) => {
                    let accepted = web.handle_client().await;
                    let ticks = self.scheduler.run_pending();
                    if !accepted && ticks == 0 {
                        tokio::time::sleep(IDLE_DELAY).await;
                    }
                }
                None => {
                    tokio::select! {
                        tick = self.scheduler.next_tick() => {
                            self.scheduler.dispatch(tick);
                        }
                        _ = shutdown_requested(&mut self.shutdown) => {}
                    }
                }
            }
        }

        self.scheduler.stop_all();
        if let Some(web) = self.web {
            web.close();
        }
    }
}

/// Resolves once shutdown is signalled. Never resolves if the sender is gone.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Config mode: the provisioning webserver.
pub async fn config_mode(
    cfg: &Config,
    device: Arc<dyn DeviceControl>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<EventLoop> {
    let mut http = Http::new().with_www_root(&cfg.server.www_root);
    provision::register_routes(&mut http, &cfg.device_config, device);

    let web = Webserver::bind(&cfg.server, http).await?;
    Ok(EventLoop::new(Some(web), Scheduler::new(), shutdown))
}

/// Run mode: one data logger per configured sensor.
pub fn run_mode<P, D>(
    device: &DeviceConfig,
    publisher: Arc<dyn Publish>,
    ranging: P,
    delay: D,
    shutdown: watch::Receiver<bool>,
) -> EventLoop
where
    P: FnMut(&PinMapping) -> Result<Box<dyn RangeFinder>, SensorError>,
    D: DelayNs + Clone + 'static,
{
    let mut scheduler = Scheduler::new();
    let built = build_loggers(device, publisher, &mut scheduler, ranging, delay);
    info!(loggers = built, "Run mode ready");

    EventLoop::new(None, scheduler, shutdown)
}
