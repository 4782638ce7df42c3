//! Fixed-cadence rate limiting.

use std::thread;
use std::time::{Duration, Instant};

use crate::compute::CancelToken;

const SLICE: Duration = Duration::from_millis(10);

/// Lets one event through per interval.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    next: Option<Instant>,
}

impl RateLimiter {
    /// `rate` events per second. Non-positive or non-finite rates disable
    /// limiting.
    pub fn per_second(rate: f64) -> Self {
        let interval = if rate.is_finite() && rate > 0.0 {
            Duration::from_secs_f64(1.0 / rate)
        } else {
            Duration::ZERO
        };
        Self {
            interval,
            next: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until the next slot.
    ///
    /// The first call returns immediately. Sleeps in short slices and returns
    /// false as soon as `cancel` fires.
    pub fn wait(&mut self, cancel: &CancelToken) -> bool {
        let now = Instant::now();
        let slot = match self.next {
            Some(slot) if slot > now => slot,
            _ => now,
        };

        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= slot {
                break;
            }
            thread::sleep((slot - now).min(SLICE));
        }

        self.next = Some(slot + self.interval);
        true
    }
}
