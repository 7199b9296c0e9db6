//! Gauge classification engine
//!
//! Turns a gauge observation into a normalized ALERT / NORMAL / OTHER /
//! UNKNOWN signal. Pure and deterministic — the same function serves the
//! live dashboard state and retroactive history evaluation.
//!
//! Rule precedence:
//! 1. Condition-based (type has `has_condition`): "Bad"/"Problem" alert,
//!    "Good"/"Good condition" normal, other non-empty strings OTHER,
//!    missing condition UNKNOWN. Takes precedence over range rules when a
//!    type somehow enables both families.
//! 2. Range-based (`has_min_value`/`has_max_value`): out of the gauge's
//!    configured bounds is an alert.
//! 3. Types with neither family carry no evaluable signal: always NORMAL.

use serde::{Deserialize, Serialize};

use crate::types::{Gauge, GaugeType, Observation};

/// Condition strings that classify as an alert.
const ALERT_CONDITIONS: [&str; 2] = ["Bad", "Problem"];

/// Condition strings that classify as normal.
const NORMAL_CONDITIONS: [&str; 2] = ["Good", "Good condition"];

/// Normalized classification of a gauge observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GaugeStatus {
    Alert,
    Normal,
    /// Condition string recognized as neither good nor bad.
    Other,
    /// No condition recorded yet ("Not Set"), or a range gauge with bounds
    /// but no observed value.
    Unknown,
}

impl GaugeStatus {
    pub fn is_alert(&self) -> bool {
        matches!(self, GaugeStatus::Alert)
    }
}

impl std::fmt::Display for GaugeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GaugeStatus::Alert => write!(f, "ALERT"),
            GaugeStatus::Normal => write!(f, "NORMAL"),
            GaugeStatus::Other => write!(f, "OTHER"),
            GaugeStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify an observation against a gauge and its type.
///
/// Flags come from the type, bounds from the gauge (a bound whose flag is
/// set but whose value is unset cannot be evaluated and never alerts).
pub fn classify(gauge: &Gauge, ty: &GaugeType, observation: Observation<'_>) -> GaugeStatus {
    if ty.has_condition {
        return classify_condition(observation.condition);
    }

    if ty.has_min_value || ty.has_max_value {
        let min = ty.has_min_value.then_some(gauge.min_value).flatten();
        let max = ty.has_max_value.then_some(gauge.max_value).flatten();
        return classify_range(observation.value, min, max);
    }

    GaugeStatus::Normal
}

/// Classify a gauge's cached "current" state.
pub fn classify_current(gauge: &Gauge, ty: &GaugeType) -> GaugeStatus {
    classify(gauge, ty, Observation::of_gauge(gauge))
}

fn classify_condition(condition: Option<&str>) -> GaugeStatus {
    let condition = match condition.map(str::trim) {
        None | Some("") => return GaugeStatus::Unknown,
        Some(c) => c,
    };
    if ALERT_CONDITIONS.contains(&condition) {
        GaugeStatus::Alert
    } else if NORMAL_CONDITIONS.contains(&condition) {
        GaugeStatus::Normal
    } else {
        GaugeStatus::Other
    }
}

fn classify_range(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> GaugeStatus {
    let Some(value) = value else {
        // Bounds exist but nothing to compare against
        return if min.is_some() || max.is_some() {
            GaugeStatus::Unknown
        } else {
            GaugeStatus::Normal
        };
    };
    let below = min.is_some_and(|m| value < m);
    let above = max.is_some_and(|m| value > m);
    if below || above {
        GaugeStatus::Alert
    } else {
        GaugeStatus::Normal
    }
}
