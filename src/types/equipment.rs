//! Equipment hierarchy types: Machine, Station, Gauge

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity identifier used across the equipment hierarchy.
pub type Id = i64;

// ============================================================================
// Machine
// ============================================================================

/// Operational status of a machine.
///
/// Operator- or scheduler-set. Orthogonal to derived gauge alert status:
/// recording a reading never changes it, and the daily reset scheduler sets
/// every machine back to `ToCheck` regardless of gauge state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub enum MachineStatus {
    Running,
    Stop,
    /// Requires the morning check round.
    #[default]
    ToCheck,
    OutOfOrder,
}

impl MachineStatus {
    /// Operator-facing display name
    pub fn display_name(&self) -> &'static str {
        match self {
            MachineStatus::Running => "Running",
            MachineStatus::Stop => "Stop",
            MachineStatus::ToCheck => "To Check",
            MachineStatus::OutOfOrder => "Out of Order",
        }
    }
}

impl std::fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Top-level equipment unit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Machine {
    pub id: Id,
    pub name: String,
    pub machine_number: String,
    pub status: MachineStatus,
}

/// Machine fields supplied at creation; the backend assigns the id.
#[derive(Debug, Clone)]
pub struct NewMachine {
    pub name: String,
    pub machine_number: String,
    pub status: MachineStatus,
}

// ============================================================================
// Station
// ============================================================================

/// A physical checkpoint grouping several gauges, owned by a machine.
///
/// Deleting a station cascades to its gauges and their readings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Station {
    pub id: Id,
    pub machine_id: Id,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewStation {
    pub machine_id: Id,
    pub name: String,
    pub description: Option<String>,
}

// ============================================================================
// Gauge
// ============================================================================

/// A single monitored signal (numeric or condition) attached to a station.
///
/// The optional fields are only meaningful when the corresponding capability
/// flag is set on the gauge's type. `current_reading`, `last_checked` and
/// `condition` are a cache of the most recently accepted reading; ingestion
/// is the only writer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gauge {
    pub id: Id,
    pub station_id: Id,
    pub gauge_type_id: Id,
    pub name: String,
    pub unit: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub step: Option<f64>,
    /// Last accepted value (0/1 encoding for condition gauges), default 0.
    pub current_reading: f64,
    /// Timestamp of the last accepted reading, `None` until first read.
    pub last_checked: Option<DateTime<Utc>>,
    /// Last known condition string, condition gauges only.
    pub condition: Option<String>,
    pub instruction: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewGauge {
    pub station_id: Id,
    pub gauge_type_id: Id,
    pub name: String,
    pub unit: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub step: Option<f64>,
    pub instruction: Option<String>,
}

/// Gauge cache fields overwritten when a reading is accepted.
///
/// Whole-row overwrite: concurrent writers to the same gauge are
/// last-write-wins, the reading history itself is never lost.
#[derive(Debug, Clone)]
pub struct GaugeSnapshot {
    pub current_reading: f64,
    pub last_checked: DateTime<Utc>,
    pub condition: Option<String>,
}

// ============================================================================
// Display ordering
// ============================================================================

/// Extract the display-order prefix embedded in a gauge name by convention,
/// e.g. "2. Temperature" → 2. Names without the "<digits>." prefix have no
/// explicit order and sort after the prefixed ones.
pub fn display_order(name: &str) -> Option<u32> {
    let trimmed = name.trim_start();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    if !trimmed[digits.len()..].starts_with('.') {
        return None;
    }
    digits.parse().ok()
}

/// Sort gauges for display: numeric name prefix first, creation id as the
/// tie-break and the fallback for unprefixed names.
pub fn sort_for_display(gauges: &mut [Gauge]) {
    gauges.sort_by_key(|g| (display_order(&g.name).unwrap_or(u32::MAX), g.id));
}
