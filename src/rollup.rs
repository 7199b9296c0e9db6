//! Aggregation engine: alert rollup and freshness evaluation
//!
//! Two independent rollups, both pure functions over already-loaded data.
//!
//! Alert rollup is a strict OR: one alerting gauge makes its station and
//! machine ALERT. This derived signal is distinct from the operator-set
//! `Machine.status` field.
//!
//! Freshness answers "were all of a station's gauges read within the
//! trailing window" (24 hours by default) and is what dashboards use to
//! flag stale checkpoints.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::classify::classify_current;
use crate::types::{Gauge, GaugeTypeRegistry, Id, Reading};

/// Trailing window, in hours, a gauge must have been read within to count
/// as fresh.
pub const DEFAULT_FRESHNESS_WINDOW_HOURS: i64 = 24;

/// Two-state derived alert signal at station/machine level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RollupStatus {
    Alert,
    Normal,
}

impl std::fmt::Display for RollupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollupStatus::Alert => write!(f, "ALERT"),
            RollupStatus::Normal => write!(f, "NORMAL"),
        }
    }
}

/// Staleness verdict for a station or machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Freshness {
    /// Every gauge was read within the trailing window.
    Recent,
    /// At least one gauge is overdue (or has never been read).
    Old,
    /// Nothing to evaluate: no gauges, or no readings at all.
    Unknown,
}

impl std::fmt::Display for Freshness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Freshness::Recent => write!(f, "RECENT"),
            Freshness::Old => write!(f, "OLD"),
            Freshness::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ============================================================================
// Alert rollup
// ============================================================================

/// Station-level alert rollup over the gauges' cached current state.
///
/// ALERT iff any gauge classifies ALERT; a station with zero gauges is
/// NORMAL (vacuous OR). Gauges with an unregistered type carry no evaluable
/// signal and never alert.
pub fn station_status(gauges: &[Gauge], registry: &GaugeTypeRegistry) -> RollupStatus {
    let any_alert = gauges.iter().any(|gauge| match registry.get(gauge.gauge_type_id) {
        Some(ty) => classify_current(gauge, ty).is_alert(),
        None => {
            warn!(
                gauge_id = gauge.id,
                gauge_type_id = gauge.gauge_type_id,
                "gauge references unknown type — treating as normal"
            );
            false
        }
    });
    if any_alert {
        RollupStatus::Alert
    } else {
        RollupStatus::Normal
    }
}

/// Machine-level alert rollup: ALERT iff any owned station is ALERT.
pub fn machine_status(stations: &[RollupStatus]) -> RollupStatus {
    if stations.contains(&RollupStatus::Alert) {
        RollupStatus::Alert
    } else {
        RollupStatus::Normal
    }
}

// ============================================================================
// Freshness rollup
// ============================================================================

/// Station freshness within the default 24-hour window.
pub fn station_freshness(gauges: &[Gauge], readings: &[Reading], now: DateTime<Utc>) -> Freshness {
    freshness_of(gauges, readings, now, Duration::hours(DEFAULT_FRESHNESS_WINDOW_HOURS))
}

/// Station freshness with an explicit window (configuration hook).
pub fn station_freshness_with_window(
    gauges: &[Gauge],
    readings: &[Reading],
    now: DateTime<Utc>,
    window: Duration,
) -> Freshness {
    freshness_of(gauges, readings, now, window)
}

/// Machine freshness: the station rules applied to the union of all gauges
/// across the machine's stations.
pub fn machine_freshness(gauges: &[Gauge], readings: &[Reading], now: DateTime<Utc>) -> Freshness {
    machine_freshness_with_window(
        gauges,
        readings,
        now,
        Duration::hours(DEFAULT_FRESHNESS_WINDOW_HOURS),
    )
}

/// Machine freshness with an explicit window (configuration hook).
pub fn machine_freshness_with_window(
    gauges: &[Gauge],
    readings: &[Reading],
    now: DateTime<Utc>,
    window: Duration,
) -> Freshness {
    freshness_of(gauges, readings, now, window)
}

fn freshness_of(
    gauges: &[Gauge],
    readings: &[Reading],
    now: DateTime<Utc>,
    window: Duration,
) -> Freshness {
    if gauges.is_empty() {
        return Freshness::Unknown;
    }

    // Most recent reading per gauge. Strictly-greater comparison: equal
    // timestamps may keep either, only the threshold check matters.
    let mut latest: HashMap<Id, DateTime<Utc>> = HashMap::with_capacity(gauges.len());
    for reading in readings {
        if !gauges.iter().any(|g| g.id == reading.gauge_id) {
            continue;
        }
        latest
            .entry(reading.gauge_id)
            .and_modify(|ts| {
                if reading.timestamp > *ts {
                    *ts = reading.timestamp;
                }
            })
            .or_insert(reading.timestamp);
    }

    if latest.is_empty() {
        return Freshness::Unknown;
    }

    let cutoff = now - window;
    for gauge in gauges {
        match latest.get(&gauge.id) {
            // A gauge that has never been read fails freshness
            None => return Freshness::Old,
            Some(ts) if *ts < cutoff => return Freshness::Old,
            Some(_) => {}
        }
    }
    Freshness::Recent
}
