//! Clock abstraction so time-driven behavior can be simulated in tests

use std::sync::Mutex;

use chrono::{DateTime, Duration, Local, NaiveDateTime, Utc};

/// Source of current time for the engine.
///
/// `now_local` feeds the scheduler's wall-clock comparison; `now_utc` stamps
/// readings.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    fn now_local(&self) -> NaiveDateTime;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Manually driven clock for tests and replay.
///
/// Local time equals the naive UTC time, so scheduler scenarios can be
/// scripted without a timezone database.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.lock();
        *now = *now + by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned lock would only mean a panicked test thread; keep the
        // last written time rather than propagating the panic.
        self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.lock()
    }

    fn now_local(&self) -> NaiveDateTime {
        self.lock().naive_utc()
    }
}
