//! Clock abstraction so time-driven rules (decay, recovery windows, sleep
//! timers) can be driven deterministically in tests.

use chrono::{DateTime, Duration, Local, Timelike, Utc};
use std::sync::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Local wall-clock hour (0..24) used for night/morning rules.
    fn local_hour(&self) -> u32 {
        self.now().with_timezone(&Local).hour()
    }
}

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock. Its UTC hour doubles as the local hour so tests
/// do not depend on the host time zone.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// A clock pinned to the given UTC hour on 2025-01-01.
    pub fn at_hour(hour: u32) -> Self {
        let start = DateTime::<Utc>::from_timestamp(1_735_689_600, 0)
            .unwrap_or_default()
            .with_hour(hour % 24)
            .unwrap_or_default();
        Self::new(start)
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }

    fn local_hour(&self) -> u32 {
        self.now().hour()
    }
}
