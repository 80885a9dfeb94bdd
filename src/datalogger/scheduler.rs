use std::collections::BTreeMap;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, warn};

use crate::datalogger::logger::{DataLogger, Tick, TickSource};

/// Owns the data loggers and the queue their timers post ticks to.
///
/// Ticks are handled one at a time on the caller's task, so sensors and the
/// publisher are never used concurrently.
pub struct Scheduler {
    loggers: BTreeMap<usize, DataLogger>,
    tx: UnboundedSender<Tick>,
    rx: UnboundedReceiver<Tick>,
    next: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            loggers: BTreeMap::new(),
            tx,
            rx,
            next: 0,
        }
    }

    /// Reserves a tick id for a logger about to be created.
    pub fn tick_source(&mut self) -> TickSource {
        let id = self.next;
        self.next += 1;
        TickSource::new(id, self.tx.clone())
    }

    /// Takes ownership of a logger. A logger with the same id is replaced.
    pub fn add(&mut self, logger: DataLogger) {
        if let Some(mut old) = self.loggers.insert(logger.id(), logger) {
            warn!(sensor = old.sensor_id(), "Replaced data logger");
            old.stop();
        }
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }

    pub fn loggers(&self) -> impl Iterator<Item = &DataLogger> {
        self.loggers.values()
    }

    pub fn start_all(&mut self) {
        self.loggers.values_mut().for_each(DataLogger::start);
    }

    pub fn stop_all(&mut self) {
        self.loggers.values_mut().for_each(DataLogger::stop);
    }

    /// Waits for the next tick.
    pub async fn next_tick(&mut self) -> Tick {
        // `self.tx` keeps the channel open, so `recv` never yields `None`.
        loop {
            if let Some(tick) = self.rx.recv().await {
                return tick;
            }
        }
    }

    /// Runs the logger a tick belongs to. Failures are logged.
    ///
    /// Ticks from a stopped logger, or from a timer armed before the logger's
    /// latest start, are dropped.
    ///
    /// Returns whether a logger handled the tick.
    pub fn dispatch(&mut self, tick: Tick) -> bool {
        let Some(logger) = self.loggers.get_mut(&tick.id) else {
            warn!(?tick, "Tick for unknown logger");
            return false;
        };
        if !logger.is_running() || logger.tick() != tick {
            debug!(?tick, "Ignoring stale tick");
            return false;
        }
        if let Err(e) = logger.run() {
            error!(sensor = logger.sensor_id(), error = %e, "Measurement failed");
        }
        true
    }

    /// Handles every tick already queued without waiting.
    pub fn run_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(tick) = self.rx.try_recv() {
            if self.dispatch(tick) {
                handled += 1;
            }
        }
        handled
    }
}
