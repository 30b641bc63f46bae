//! Decides when the pool should download a fresh batch of proxies.

use std::time::{Duration, Instant};

/// Refresh schedule for the crawled set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Schedule {
    interval: Option<Duration>,
}

impl Schedule {
    /// A zero interval disables time-based refresh.
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            interval: interval.filter(|interval| !interval.is_zero()),
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Whether a harvest is due at `now`.
    pub fn should_harvest(
        &self,
        crawled_is_empty: bool,
        last_download: Option<Instant>,
        now: Instant,
    ) -> bool {
        if crawled_is_empty {
            return true;
        }

        match (self.interval, last_download) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(interval), Some(last)) => now.saturating_duration_since(last) > interval,
        }
    }
}
