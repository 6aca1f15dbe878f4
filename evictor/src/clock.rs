//! Clock injection.
//!
//! The manager never reads wall-clock time directly: every timestamp
//! comparison goes through a [`Clock`], so tests can step time
//! deterministically instead of racing against `Instant::now()`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Thin wrapper around the monotonic system clock, used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that tests step explicitly. Anchored to the process-start
/// `Instant` plus an offset so `now()` stays monotonic and comparable with
/// `Instant` arithmetic elsewhere in the manager.
pub struct FakeClock {
    base: Instant,
    offset_millis: AtomicU64,
}

impl FakeClock {
    pub fn new() -> Self {
        FakeClock {
            base: Instant::now(),
            offset_millis: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_millis
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_millis.load(Ordering::SeqCst))
    }
}
