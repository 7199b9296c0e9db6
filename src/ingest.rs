//! Reading ingestion and history encoding
//!
//! Validates an operator-submitted reading against the gauge's type,
//! snapshots the status at recording time, persists the reading append-only,
//! and overwrites the gauge's cached current state. All validation happens
//! before the first write, so a rejected reading leaves nothing behind.

use std::sync::Arc;

use tracing::info;

use crate::classify::{classify, GaugeStatus};
use crate::clock::Clock;
use crate::storage::{BlobError, BlobStore, Persistence, PersistenceError};
use crate::types::{
    Gauge, GaugeSnapshot, GaugeType, Id, NewReading, Observation, ObservedStatus, Reading,
    ReadingInput,
};

/// Ingestion failures, surfaced directly to the caller with enough detail
/// for a user-facing message. Nothing is persisted when validation or
/// resolution fails.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("station {0} not found")]
    StationNotFound(Id),
    #[error("gauge {0} not found")]
    GaugeNotFound(Id),
    #[error("gauge type {0} not found")]
    GaugeTypeNotFound(Id),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Blob(#[from] BlobError),
}

/// Records operator readings against gauges.
pub struct ReadingRecorder {
    persistence: Arc<dyn Persistence>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
}

impl ReadingRecorder {
    pub fn new(
        persistence: Arc<dyn Persistence>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { persistence, blobs, clock }
    }

    /// Record a reading.
    ///
    /// Steps, in order: resolve station and gauge, resolve the gauge's type,
    /// validate required fields, compute the stored value and status
    /// snapshot, upload the image (if any), insert the reading, overwrite
    /// the gauge's cached state. The gauge cache is only touched after the
    /// reading row exists, and never for a rejected reading.
    pub fn record(&self, input: ReadingInput) -> Result<Reading, IngestError> {
        let station = self
            .persistence
            .get_station(input.station_id)?
            .ok_or(IngestError::StationNotFound(input.station_id))?;
        let gauge = self
            .persistence
            .get_gauge(input.gauge_id)?
            .ok_or(IngestError::GaugeNotFound(input.gauge_id))?;
        if gauge.station_id != station.id {
            // A gauge id under a different station is as good as missing
            return Err(IngestError::GaugeNotFound(input.gauge_id));
        }
        let ty = self
            .persistence
            .get_gauge_type(gauge.gauge_type_id)?
            .ok_or(IngestError::GaugeTypeNotFound(gauge.gauge_type_id))?;

        let (stored_value, condition, observed_status) =
            encode_observation(&gauge, &ty, &input)?;

        let timestamp = self.clock.now_utc();

        let image_url = match input.image {
            Some(bytes) => {
                let name = format!("reading-{}-{}.jpg", gauge.id, timestamp.timestamp());
                Some(self.blobs.store(&bytes, &name)?)
            }
            None => None,
        };

        let reading = self.persistence.insert_reading(NewReading {
            station_id: station.id,
            gauge_id: gauge.id,
            value: stored_value,
            timestamp,
            recorded_by: input.recorded_by,
            image_url,
            comment: input.comment,
            condition: condition.clone(),
            observed_status,
        })?;

        self.persistence.update_gauge_snapshot(
            gauge.id,
            GaugeSnapshot {
                current_reading: stored_value,
                last_checked: timestamp,
                condition,
            },
        )?;

        info!(
            station_id = station.id,
            gauge_id = gauge.id,
            value = stored_value,
            status = %observed_status,
            "reading recorded"
        );

        Ok(reading)
    }
}

/// Compute the persisted value, condition snapshot, and status tag.
///
/// Condition gauges store the legacy 0/1 encoding as the value plus the
/// literal condition string, so historical status survives later changes to
/// the gauge's own condition field. Numeric gauges store the measurement.
fn encode_observation(
    gauge: &Gauge,
    ty: &GaugeType,
    input: &ReadingInput,
) -> Result<(f64, Option<String>, ObservedStatus), IngestError> {
    if ty.requires_condition() {
        let condition = input
            .condition
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                IngestError::Validation(format!("gauge '{}' requires a condition", gauge.name))
            })?;
        let status = to_observed(classify(gauge, ty, Observation::condition(condition)));
        return Ok((status.encoded() as f64, Some(condition.to_string()), status));
    }

    if ty.requires_value() {
        let value = input.value.ok_or_else(|| {
            IngestError::Validation(format!("gauge '{}' requires a numeric value", gauge.name))
        })?;
        if !value.is_finite() {
            return Err(IngestError::Validation(format!(
                "gauge '{}' received a non-finite value",
                gauge.name
            )));
        }
        let status = to_observed(classify(gauge, ty, Observation::value(value)));
        return Ok((value, None, status));
    }

    // Type carries no evaluable signal; store whatever value was given.
    Ok((input.value.unwrap_or(0.0), None, ObservedStatus::Normal))
}

/// Collapse the four-way classification into the stored two-way snapshot:
/// only a definite alert encodes as 1.
fn to_observed(status: GaugeStatus) -> ObservedStatus {
    if status.is_alert() {
        ObservedStatus::Alert
    } else {
        ObservedStatus::Normal
    }
}
