use std::time::Duration;

use embedded_hal::delay::DelayNs;

/// Blocking delay backed by the operating system scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}
