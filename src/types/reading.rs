//! Reading types: the immutable observation record and its status encoding

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::equipment::{Gauge, Id};

// ============================================================================
// Observed status
// ============================================================================

/// Status snapshot taken at the moment a reading was recorded.
///
/// Replaces the historical trick of overloading the reading's numeric value
/// with a 0/1 condition encoding. The tagged field is authoritative;
/// `encoded()` exposes the legacy 0/1 for backward-compatible consumers, so
/// live classification and history browsing agree by construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub enum ObservedStatus {
    #[default]
    Normal,
    Alert,
}

impl ObservedStatus {
    /// Legacy numeric encoding: 0 = Normal, 1 = Alert.
    pub fn encoded(self) -> i64 {
        match self {
            ObservedStatus::Normal => 0,
            ObservedStatus::Alert => 1,
        }
    }

    /// Decode a legacy stored value (history rows predating the tagged field).
    pub fn from_encoded(value: f64) -> Self {
        if value > 0.0 {
            ObservedStatus::Alert
        } else {
            ObservedStatus::Normal
        }
    }
}

impl std::fmt::Display for ObservedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObservedStatus::Normal => write!(f, "NORMAL"),
            ObservedStatus::Alert => write!(f, "ALERT"),
        }
    }
}

// ============================================================================
// Reading
// ============================================================================

/// One immutable timestamped observation of a gauge.
///
/// Append-only historical fact; corrections are new readings, not edits.
/// For condition-based gauges `value` is the 0/1 status encoding, not a
/// physical measurement, and `condition` holds the human-readable snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    pub id: Id,
    pub station_id: Id,
    pub gauge_id: Id,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub recorded_by: Option<Id>,
    pub image_url: Option<String>,
    pub comment: Option<String>,
    /// Condition string at recording time, condition gauges only.
    pub condition: Option<String>,
    pub observed_status: ObservedStatus,
}

impl Reading {
    /// Status at the moment this reading was recorded.
    pub fn status(&self) -> ObservedStatus {
        self.observed_status
    }
}

/// Reading fields supplied at insert; the backend assigns the id.
#[derive(Debug, Clone)]
pub struct NewReading {
    pub station_id: Id,
    pub gauge_id: Id,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub recorded_by: Option<Id>,
    pub image_url: Option<String>,
    pub comment: Option<String>,
    pub condition: Option<String>,
    pub observed_status: ObservedStatus,
}

/// Operator form input for recording a reading.
#[derive(Debug, Clone, Default)]
pub struct ReadingInput {
    pub station_id: Id,
    pub gauge_id: Id,
    /// Physical measurement, numeric gauges only.
    pub value: Option<f64>,
    /// Condition string, condition gauges only.
    pub condition: Option<String>,
    /// Photographic evidence payload, stored through the blob store.
    pub image: Option<Vec<u8>>,
    pub comment: Option<String>,
    pub recorded_by: Option<Id>,
}

// ============================================================================
// Observation
// ============================================================================

/// Borrowed view of a candidate value/condition fed to the classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Observation<'a> {
    pub value: Option<f64>,
    pub condition: Option<&'a str>,
}

impl<'a> Observation<'a> {
    pub fn value(value: f64) -> Self {
        Self { value: Some(value), condition: None }
    }

    pub fn condition(condition: &'a str) -> Self {
        Self { value: None, condition: Some(condition) }
    }

    /// The gauge's cached "current" state.
    ///
    /// Until the first accepted reading, `current_reading` holds the 0.0
    /// placeholder and is withheld from the classifier; a bounded gauge that
    /// has never been read classifies UNKNOWN, not against 0.0.
    pub fn of_gauge(gauge: &'a Gauge) -> Self {
        Self {
            value: gauge.last_checked.is_some().then_some(gauge.current_reading),
            condition: gauge.condition.as_deref(),
        }
    }

    /// A historical reading's snapshot.
    pub fn of_reading(reading: &'a Reading) -> Self {
        Self {
            value: Some(reading.value),
            condition: reading.condition.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_round_trip() {
        assert_eq!(ObservedStatus::Normal.encoded(), 0);
        assert_eq!(ObservedStatus::Alert.encoded(), 1);
        assert_eq!(ObservedStatus::from_encoded(0.0), ObservedStatus::Normal);
        assert_eq!(ObservedStatus::from_encoded(1.0), ObservedStatus::Alert);
    }

    #[test]
    fn from_encoded_treats_any_positive_as_alert() {
        // Matches the historical "value > 0" history-view rule.
        assert_eq!(ObservedStatus::from_encoded(2.0), ObservedStatus::Alert);
        assert_eq!(ObservedStatus::from_encoded(-1.0), ObservedStatus::Normal);
    }

    #[test]
    fn of_gauge_withholds_value_until_first_read() {
        let mut gauge = Gauge {
            id: 1,
            station_id: 1,
            gauge_type_id: 1,
            name: "1. Pressure".to_string(),
            unit: None,
            min_value: Some(2.0),
            max_value: None,
            step: None,
            current_reading: 0.0,
            last_checked: None,
            condition: None,
            instruction: None,
        };
        assert_eq!(Observation::of_gauge(&gauge).value, None);

        gauge.current_reading = 5.0;
        gauge.last_checked = Some(Utc::now());
        assert_eq!(Observation::of_gauge(&gauge).value, Some(5.0));
    }
}
