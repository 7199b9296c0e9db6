//! Machine status scheduler — daily wall-clock reset loop
//!
//! Once per calendar day at a configured local time, every machine's
//! operational status is reset to "To Check", regardless of current status
//! and of gauge alert state. Implemented as an explicit recurring trigger
//! over a `Clock` so the firing can be simulated in tests, rather than a
//! cron-string dependency.
//!
//! Configuration lives in the persisted settings (`machine_reset_enabled`,
//! `machine_reset_time` as "HH:MM") and is re-read on every poll, which
//! covers enable, disable, and re-arm transitions without a channel.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{NaiveDate, NaiveTime};
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::storage::Persistence;
use crate::types::MachineStatus;

/// Settings key for the scheduler enable flag ("true"/"false").
pub const RESET_ENABLED_KEY: &str = "machine_reset_enabled";

/// Settings key for the reset time of day ("HH:MM").
pub const RESET_TIME_KEY: &str = "machine_reset_time";

/// Cadence at which the loop re-reads settings and checks the wall clock.
const POLL_INTERVAL: StdDuration = StdDuration::from_secs(60);

/// Scheduler configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid time of day '{0}' (expected HH:MM, 00:00–23:59)")]
    InvalidTime(String),
}

/// Parse a "HH:MM" wall-clock time, hours 0–23 and minutes 0–59.
///
/// Strict two-field form: seconds, sign prefixes and out-of-range fields
/// are all rejected.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, ScheduleError> {
    let invalid = || ScheduleError::InvalidTime(raw.to_string());
    let (hours, minutes) = raw.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

/// Scheduler state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    Disabled,
    Scheduled(NaiveTime),
}

/// Daily machine status reset trigger.
pub struct ResetScheduler {
    persistence: Arc<dyn Persistence>,
    clock: Arc<dyn Clock>,
    state: ScheduleState,
    /// Calendar day of the last firing; guards against double fires and
    /// against firing for a time-of-day that already passed when the
    /// schedule was armed.
    last_fired: Option<NaiveDate>,
}

impl ResetScheduler {
    pub fn new(persistence: Arc<dyn Persistence>, clock: Arc<dyn Clock>) -> Self {
        Self {
            persistence,
            clock,
            state: ScheduleState::Disabled,
            last_fired: None,
        }
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }

    /// Apply a configuration.
    ///
    /// Disabling always succeeds. Enabling requires a valid "HH:MM" time;
    /// on error the previous state is left unchanged. Re-applying the same
    /// enabled configuration is a no-op so that polling cannot disturb an
    /// armed schedule.
    pub fn configure(
        &mut self,
        enabled: bool,
        time_of_day: Option<&str>,
    ) -> Result<(), ScheduleError> {
        if !enabled {
            if self.state != ScheduleState::Disabled {
                info!("machine reset schedule disabled");
            }
            self.state = ScheduleState::Disabled;
            return Ok(());
        }

        let raw = time_of_day.ok_or_else(|| ScheduleError::InvalidTime(String::new()))?;
        let at = parse_time_of_day(raw)?;

        if self.state == ScheduleState::Scheduled(at) {
            return Ok(());
        }

        self.state = ScheduleState::Scheduled(at);
        // Arm for the next occurrence: if today's firing time already
        // passed, the first fire is tomorrow.
        let now = self.clock.now_local();
        self.last_fired = (now.time() >= at).then(|| now.date());
        info!(time = %at.format("%H:%M"), "machine reset scheduled");
        Ok(())
    }

    /// Re-read the schedule from the persisted settings.
    ///
    /// A malformed or unreadable configuration is logged and the previous
    /// schedule (or Disabled state) is kept.
    pub fn reload(&mut self) {
        let enabled = match self.persistence.get_setting(RESET_ENABLED_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!(error = %e, "could not read reset schedule settings");
                return;
            }
        };
        let time = match self.persistence.get_setting(RESET_TIME_KEY) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "could not read reset schedule settings");
                return;
            }
        };
        if let Err(e) = self.configure(enabled, time.as_deref()) {
            warn!(error = %e, "invalid reset schedule configuration — keeping previous schedule");
        }
    }

    /// Check the wall clock and fire if due. Returns whether a fire happened.
    ///
    /// Fires at most once per calendar day; there is no catch-up for days
    /// missed while disabled or stopped.
    pub fn tick(&mut self) -> bool {
        let ScheduleState::Scheduled(at) = self.state else {
            return false;
        };
        let now = self.clock.now_local();
        if now.time() < at {
            return false;
        }
        if self.last_fired == Some(now.date()) {
            return false;
        }
        // Mark the day before firing: a failed reset is not retried until
        // the next scheduled day.
        self.last_fired = Some(now.date());
        self.fire();
        true
    }

    fn fire(&self) {
        match self
            .persistence
            .reset_all_machine_status(MachineStatus::ToCheck)
        {
            Ok(count) => info!(machines = count, "daily machine status reset"),
            Err(e) => {
                error!(error = %e, "machine status reset failed — next attempt tomorrow");
            }
        }
    }

    /// Run the scheduler loop (call from tokio::spawn).
    ///
    /// This never returns under normal operation; drop the JoinHandle's
    /// task to stop it.
    pub async fn run(mut self) {
        info!(
            backend = self.persistence.backend_name(),
            "machine reset scheduler started"
        );
        loop {
            self.reload();
            self.tick();
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::InMemoryStore;
    use crate::types::NewMachine;
    use chrono::{Duration, TimeZone, Utc};

    fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for (name, status) in [
            ("Press 1", MachineStatus::Running),
            ("Press 2", MachineStatus::Stop),
            ("Lathe", MachineStatus::OutOfOrder),
        ] {
            store
                .insert_machine(NewMachine {
                    name: name.to_string(),
                    machine_number: name.replace(' ', "-"),
                    status,
                })
                .unwrap();
        }
        store
    }

    fn clock_at(h: u32, m: u32) -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 10, h, m, 0).unwrap(),
        ))
    }

    #[test]
    fn parse_accepts_valid_times() {
        assert_eq!(parse_time_of_day("06:00").unwrap(), NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        assert_eq!(parse_time_of_day("23:59").unwrap(), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
        assert_eq!(parse_time_of_day("0:5").unwrap(), NaiveTime::from_hms_opt(0, 5, 0).unwrap());
    }

    #[test]
    fn parse_rejects_malformed_times() {
        for raw in ["24:00", "06:60", "600", "06:00:00", "six", "", "-1:30"] {
            assert!(parse_time_of_day(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn disabled_scheduler_never_fires() {
        let store = seeded_store();
        let clock = clock_at(6, 0);
        let mut scheduler = ResetScheduler::new(store.clone(), clock);
        assert_eq!(scheduler.state(), ScheduleState::Disabled);
        assert!(!scheduler.tick());
        assert_eq!(store.list_machines().unwrap()[0].status, MachineStatus::Running);
    }

    #[test]
    fn fires_once_at_configured_time_next_day() {
        let store = seeded_store();
        let clock = clock_at(12, 0);
        let mut scheduler = ResetScheduler::new(store.clone(), clock.clone());
        scheduler.configure(true, Some("06:00")).unwrap();

        // Today's 06:00 already passed when the schedule was armed
        assert!(!scheduler.tick());

        // 05:59 next day: not yet
        clock.set(Utc.with_ymd_and_hms(2024, 5, 11, 5, 59, 0).unwrap());
        assert!(!scheduler.tick());

        // 06:00 next day: fires exactly once
        clock.set(Utc.with_ymd_and_hms(2024, 5, 11, 6, 0, 0).unwrap());
        assert!(scheduler.tick());
        for machine in store.list_machines().unwrap() {
            assert_eq!(machine.status, MachineStatus::ToCheck);
        }

        // Later the same day: no second fire
        clock.advance(Duration::hours(2));
        assert!(!scheduler.tick());

        // The day after: fires again
        clock.set(Utc.with_ymd_and_hms(2024, 5, 12, 6, 0, 0).unwrap());
        assert!(scheduler.tick());
    }

    #[test]
    fn fires_same_day_when_armed_before_the_time() {
        let store = seeded_store();
        let clock = clock_at(5, 0);
        let mut scheduler = ResetScheduler::new(store, clock.clone());
        scheduler.configure(true, Some("06:00")).unwrap();

        assert!(!scheduler.tick());
        clock.set(Utc.with_ymd_and_hms(2024, 5, 10, 6, 0, 30).unwrap());
        assert!(scheduler.tick());
    }

    #[test]
    fn invalid_time_keeps_previous_schedule() {
        let store = seeded_store();
        let mut scheduler = ResetScheduler::new(store, clock_at(5, 0));
        scheduler.configure(true, Some("06:00")).unwrap();
        let armed = scheduler.state();

        assert!(scheduler.configure(true, Some("25:99")).is_err());
        assert_eq!(scheduler.state(), armed);

        assert!(scheduler.configure(true, None).is_err());
        assert_eq!(scheduler.state(), armed);
    }

    #[test]
    fn disable_transitions_to_disabled() {
        let store = seeded_store();
        let mut scheduler = ResetScheduler::new(store, clock_at(5, 0));
        scheduler.configure(true, Some("06:00")).unwrap();
        scheduler.configure(false, None).unwrap();
        assert_eq!(scheduler.state(), ScheduleState::Disabled);
        assert!(!scheduler.tick());
    }

    #[test]
    fn rearm_on_time_change() {
        let store = seeded_store();
        let clock = clock_at(7, 0);
        let mut scheduler = ResetScheduler::new(store, clock.clone());
        scheduler.configure(true, Some("06:00")).unwrap();
        assert_eq!(
            scheduler.state(),
            ScheduleState::Scheduled(NaiveTime::from_hms_opt(6, 0, 0).unwrap())
        );

        // 08:00 is still ahead today: re-arming must fire the same day
        scheduler.configure(true, Some("08:00")).unwrap();
        clock.set(Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap());
        assert!(scheduler.tick());
    }

    #[test]
    fn reload_follows_settings() {
        let store = seeded_store();
        let clock = clock_at(5, 0);
        let mut scheduler = ResetScheduler::new(store.clone(), clock.clone());

        scheduler.reload();
        assert_eq!(scheduler.state(), ScheduleState::Disabled);

        store.put_setting(RESET_ENABLED_KEY, "true").unwrap();
        store.put_setting(RESET_TIME_KEY, "06:00").unwrap();
        scheduler.reload();
        assert_eq!(
            scheduler.state(),
            ScheduleState::Scheduled(NaiveTime::from_hms_opt(6, 0, 0).unwrap())
        );

        // A bad edit leaves the armed schedule in place
        store.put_setting(RESET_TIME_KEY, "26:00").unwrap();
        scheduler.reload();
        assert_eq!(
            scheduler.state(),
            ScheduleState::Scheduled(NaiveTime::from_hms_opt(6, 0, 0).unwrap())
        );

        store.put_setting(RESET_ENABLED_KEY, "false").unwrap();
        scheduler.reload();
        assert_eq!(scheduler.state(), ScheduleState::Disabled);
    }

    #[test]
    fn polling_reload_does_not_disturb_armed_schedule() {
        let store = seeded_store();
        let clock = clock_at(5, 0);
        let mut scheduler = ResetScheduler::new(store.clone(), clock.clone());
        store.put_setting(RESET_ENABLED_KEY, "true").unwrap();
        store.put_setting(RESET_TIME_KEY, "06:00").unwrap();

        // Simulate the poll loop across the firing time: reload before
        // every tick must not suppress the fire or cause a second one.
        let mut fires = 0;
        for minutes in 0..180 {
            clock.set(
                Utc.with_ymd_and_hms(2024, 5, 10, 5, 0, 0).unwrap() + Duration::minutes(minutes),
            );
            scheduler.reload();
            if scheduler.tick() {
                fires += 1;
            }
        }
        assert_eq!(fires, 1);
    }
}
