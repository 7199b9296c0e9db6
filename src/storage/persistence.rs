//! Persistence trait — pluggable storage backend
//!
//! Abstracts entity storage so different backends can be swapped without
//! touching the engine code:
//! - `InMemoryStore`: in-memory store for testing and minimal deployments
//! - Future: SQL backend for production deployments
//!
//! "Not found" is expressed as `Ok(None)` / `Ok(false)`, not an error; the
//! error enum covers backend failures only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use crate::types::{
    Gauge, GaugeSnapshot, GaugeType, Id, Machine, MachineStatus, NewGauge, NewMachine,
    NewReading, NewStation, Reading, Station,
};

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Trait for pluggable persistence backends
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across async tasks. Single-row updates are expected to be atomic; the
/// engine requires no further locking guarantees.
pub trait Persistence: Send + Sync {
    // --- machines ---

    fn insert_machine(&self, machine: NewMachine) -> Result<Machine, PersistenceError>;

    fn get_machine(&self, id: Id) -> Result<Option<Machine>, PersistenceError>;

    fn list_machines(&self) -> Result<Vec<Machine>, PersistenceError>;

    /// Set one machine's operational status. Returns false for an unknown id.
    fn set_machine_status(&self, id: Id, status: MachineStatus) -> Result<bool, PersistenceError>;

    /// Bulk update of every machine's status (the daily reset). Returns the
    /// number of machines updated. A single backend call; not transactionally
    /// coupled to concurrent reads.
    fn reset_all_machine_status(&self, status: MachineStatus) -> Result<u64, PersistenceError>;

    // --- stations ---

    fn insert_station(&self, station: NewStation) -> Result<Station, PersistenceError>;

    fn get_station(&self, id: Id) -> Result<Option<Station>, PersistenceError>;

    fn list_stations(&self, machine_id: Id) -> Result<Vec<Station>, PersistenceError>;

    /// Delete a station, cascading to its gauges and their readings.
    fn delete_station(&self, id: Id) -> Result<bool, PersistenceError>;

    // --- gauge types ---

    /// Gauge types are reference data with caller-assigned ids.
    fn insert_gauge_type(&self, ty: GaugeType) -> Result<(), PersistenceError>;

    fn get_gauge_type(&self, id: Id) -> Result<Option<GaugeType>, PersistenceError>;

    fn list_gauge_types(&self) -> Result<Vec<GaugeType>, PersistenceError>;

    // --- gauges ---

    fn insert_gauge(&self, gauge: NewGauge) -> Result<Gauge, PersistenceError>;

    fn get_gauge(&self, id: Id) -> Result<Option<Gauge>, PersistenceError>;

    /// Gauges of a station in creation-id order.
    fn list_gauges(&self, station_id: Id) -> Result<Vec<Gauge>, PersistenceError>;

    /// Delete a gauge, cascading to its readings.
    fn delete_gauge(&self, id: Id) -> Result<bool, PersistenceError>;

    /// Overwrite a gauge's cached current-reading fields. The reading
    /// ingestion path is the only caller.
    fn update_gauge_snapshot(
        &self,
        id: Id,
        snapshot: GaugeSnapshot,
    ) -> Result<bool, PersistenceError>;

    // --- readings ---

    fn insert_reading(&self, reading: NewReading) -> Result<Reading, PersistenceError>;

    fn readings_for_gauge(&self, gauge_id: Id) -> Result<Vec<Reading>, PersistenceError>;

    fn readings_for_station(&self, station_id: Id) -> Result<Vec<Reading>, PersistenceError>;

    // --- settings ---

    fn get_setting(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn put_setting(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

// ============================================================================
// In-memory backend
// ============================================================================

/// In-memory persistence for testing and minimal deployments
///
/// Thread-safe via `RwLock`. Not durable — data lost on restart.
pub struct InMemoryStore {
    machines: RwLock<HashMap<Id, Machine>>,
    stations: RwLock<HashMap<Id, Station>>,
    gauge_types: RwLock<HashMap<Id, GaugeType>>,
    gauges: RwLock<HashMap<Id, Gauge>>,
    readings: RwLock<Vec<Reading>>,
    settings: RwLock<HashMap<String, String>>,
    next_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            machines: RwLock::new(HashMap::new()),
            stations: RwLock::new(HashMap::new()),
            gauge_types: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            readings: RwLock::new(Vec::new()),
            settings: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn next_id(&self) -> Id {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> PersistenceError {
    PersistenceError::Storage(e.to_string())
}

impl Persistence for InMemoryStore {
    fn insert_machine(&self, machine: NewMachine) -> Result<Machine, PersistenceError> {
        let mut machines = self.machines.write().map_err(lock_err)?;
        let machine = Machine {
            id: self.next_id(),
            name: machine.name,
            machine_number: machine.machine_number,
            status: machine.status,
        };
        machines.insert(machine.id, machine.clone());
        Ok(machine)
    }

    fn get_machine(&self, id: Id) -> Result<Option<Machine>, PersistenceError> {
        Ok(self.machines.read().map_err(lock_err)?.get(&id).cloned())
    }

    fn list_machines(&self) -> Result<Vec<Machine>, PersistenceError> {
        let mut machines: Vec<Machine> =
            self.machines.read().map_err(lock_err)?.values().cloned().collect();
        machines.sort_by_key(|m| m.id);
        Ok(machines)
    }

    fn set_machine_status(&self, id: Id, status: MachineStatus) -> Result<bool, PersistenceError> {
        let mut machines = self.machines.write().map_err(lock_err)?;
        match machines.get_mut(&id) {
            Some(machine) => {
                machine.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn reset_all_machine_status(&self, status: MachineStatus) -> Result<u64, PersistenceError> {
        let mut machines = self.machines.write().map_err(lock_err)?;
        for machine in machines.values_mut() {
            machine.status = status;
        }
        Ok(machines.len() as u64)
    }

    fn insert_station(&self, station: NewStation) -> Result<Station, PersistenceError> {
        let mut stations = self.stations.write().map_err(lock_err)?;
        let station = Station {
            id: self.next_id(),
            machine_id: station.machine_id,
            name: station.name,
            description: station.description,
        };
        stations.insert(station.id, station.clone());
        Ok(station)
    }

    fn get_station(&self, id: Id) -> Result<Option<Station>, PersistenceError> {
        Ok(self.stations.read().map_err(lock_err)?.get(&id).cloned())
    }

    fn list_stations(&self, machine_id: Id) -> Result<Vec<Station>, PersistenceError> {
        let mut stations: Vec<Station> = self
            .stations
            .read()
            .map_err(lock_err)?
            .values()
            .filter(|s| s.machine_id == machine_id)
            .cloned()
            .collect();
        stations.sort_by_key(|s| s.id);
        Ok(stations)
    }

    fn delete_station(&self, id: Id) -> Result<bool, PersistenceError> {
        let mut stations = self.stations.write().map_err(lock_err)?;
        if stations.remove(&id).is_none() {
            return Ok(false);
        }
        let mut gauges = self.gauges.write().map_err(lock_err)?;
        gauges.retain(|_, g| g.station_id != id);
        let mut readings = self.readings.write().map_err(lock_err)?;
        readings.retain(|r| r.station_id != id);
        Ok(true)
    }

    fn insert_gauge_type(&self, ty: GaugeType) -> Result<(), PersistenceError> {
        self.gauge_types.write().map_err(lock_err)?.insert(ty.id, ty);
        Ok(())
    }

    fn get_gauge_type(&self, id: Id) -> Result<Option<GaugeType>, PersistenceError> {
        Ok(self.gauge_types.read().map_err(lock_err)?.get(&id).cloned())
    }

    fn list_gauge_types(&self) -> Result<Vec<GaugeType>, PersistenceError> {
        let mut types: Vec<GaugeType> =
            self.gauge_types.read().map_err(lock_err)?.values().cloned().collect();
        types.sort_by_key(|t| t.id);
        Ok(types)
    }

    fn insert_gauge(&self, gauge: NewGauge) -> Result<Gauge, PersistenceError> {
        let mut gauges = self.gauges.write().map_err(lock_err)?;
        let gauge = Gauge {
            id: self.next_id(),
            station_id: gauge.station_id,
            gauge_type_id: gauge.gauge_type_id,
            name: gauge.name,
            unit: gauge.unit,
            min_value: gauge.min_value,
            max_value: gauge.max_value,
            step: gauge.step,
            current_reading: 0.0,
            last_checked: None,
            condition: None,
            instruction: gauge.instruction,
        };
        gauges.insert(gauge.id, gauge.clone());
        Ok(gauge)
    }

    fn get_gauge(&self, id: Id) -> Result<Option<Gauge>, PersistenceError> {
        Ok(self.gauges.read().map_err(lock_err)?.get(&id).cloned())
    }

    fn list_gauges(&self, station_id: Id) -> Result<Vec<Gauge>, PersistenceError> {
        let mut gauges: Vec<Gauge> = self
            .gauges
            .read()
            .map_err(lock_err)?
            .values()
            .filter(|g| g.station_id == station_id)
            .cloned()
            .collect();
        gauges.sort_by_key(|g| g.id);
        Ok(gauges)
    }

    fn delete_gauge(&self, id: Id) -> Result<bool, PersistenceError> {
        let mut gauges = self.gauges.write().map_err(lock_err)?;
        if gauges.remove(&id).is_none() {
            return Ok(false);
        }
        let mut readings = self.readings.write().map_err(lock_err)?;
        readings.retain(|r| r.gauge_id != id);
        Ok(true)
    }

    fn update_gauge_snapshot(
        &self,
        id: Id,
        snapshot: GaugeSnapshot,
    ) -> Result<bool, PersistenceError> {
        let mut gauges = self.gauges.write().map_err(lock_err)?;
        match gauges.get_mut(&id) {
            Some(gauge) => {
                gauge.current_reading = snapshot.current_reading;
                gauge.last_checked = Some(snapshot.last_checked);
                gauge.condition = snapshot.condition;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert_reading(&self, reading: NewReading) -> Result<Reading, PersistenceError> {
        let mut readings = self.readings.write().map_err(lock_err)?;
        let reading = Reading {
            id: self.next_id(),
            station_id: reading.station_id,
            gauge_id: reading.gauge_id,
            value: reading.value,
            timestamp: reading.timestamp,
            recorded_by: reading.recorded_by,
            image_url: reading.image_url,
            comment: reading.comment,
            condition: reading.condition,
            observed_status: reading.observed_status,
        };
        readings.push(reading.clone());
        Ok(reading)
    }

    fn readings_for_gauge(&self, gauge_id: Id) -> Result<Vec<Reading>, PersistenceError> {
        Ok(self
            .readings
            .read()
            .map_err(lock_err)?
            .iter()
            .filter(|r| r.gauge_id == gauge_id)
            .cloned()
            .collect())
    }

    fn readings_for_station(&self, station_id: Id) -> Result<Vec<Reading>, PersistenceError> {
        Ok(self
            .readings
            .read()
            .map_err(lock_err)?
            .iter()
            .filter(|r| r.station_id == station_id)
            .cloned()
            .collect())
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.settings.read().map_err(lock_err)?.get(key).cloned())
    }

    fn put_setting(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.settings
            .write()
            .map_err(lock_err)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObservedStatus;
    use chrono::Utc;

    fn seed_station(store: &InMemoryStore) -> (Station, Gauge) {
        let machine = store
            .insert_machine(NewMachine {
                name: "Press 1".to_string(),
                machine_number: "M-001".to_string(),
                status: MachineStatus::Running,
            })
            .unwrap();
        let station = store
            .insert_station(NewStation {
                machine_id: machine.id,
                name: "Hydraulics".to_string(),
                description: None,
            })
            .unwrap();
        let gauge = store
            .insert_gauge(NewGauge {
                station_id: station.id,
                gauge_type_id: 1,
                name: "1. Oil Pressure".to_string(),
                unit: Some("bar".to_string()),
                min_value: Some(2.0),
                max_value: Some(8.0),
                step: None,
                instruction: None,
            })
            .unwrap();
        (station, gauge)
    }

    fn reading_for(station: &Station, gauge: &Gauge, value: f64) -> NewReading {
        NewReading {
            station_id: station.id,
            gauge_id: gauge.id,
            value,
            timestamp: Utc::now(),
            recorded_by: None,
            image_url: None,
            comment: None,
            condition: None,
            observed_status: ObservedStatus::Normal,
        }
    }

    #[test]
    fn new_gauge_starts_with_empty_snapshot() {
        let store = InMemoryStore::new();
        let (_, gauge) = seed_station(&store);
        assert_eq!(gauge.current_reading, 0.0);
        assert_eq!(gauge.last_checked, None);
        assert_eq!(gauge.condition, None);
    }

    #[test]
    fn reset_all_machine_status_updates_every_machine() {
        let store = InMemoryStore::new();
        for (n, status) in [
            ("A", MachineStatus::Running),
            ("B", MachineStatus::Stop),
            ("C", MachineStatus::OutOfOrder),
        ] {
            store
                .insert_machine(NewMachine {
                    name: n.to_string(),
                    machine_number: format!("M-{n}"),
                    status,
                })
                .unwrap();
        }

        let updated = store.reset_all_machine_status(MachineStatus::ToCheck).unwrap();
        assert_eq!(updated, 3);
        for machine in store.list_machines().unwrap() {
            assert_eq!(machine.status, MachineStatus::ToCheck);
        }
    }

    #[test]
    fn delete_station_cascades_to_gauges_and_readings() {
        let store = InMemoryStore::new();
        let (station, gauge) = seed_station(&store);
        store.insert_reading(reading_for(&station, &gauge, 5.0)).unwrap();

        assert!(store.delete_station(station.id).unwrap());
        assert!(store.get_gauge(gauge.id).unwrap().is_none());
        assert!(store.readings_for_station(station.id).unwrap().is_empty());
    }

    #[test]
    fn delete_gauge_cascades_to_readings() {
        let store = InMemoryStore::new();
        let (station, gauge) = seed_station(&store);
        store.insert_reading(reading_for(&station, &gauge, 5.0)).unwrap();

        assert!(store.delete_gauge(gauge.id).unwrap());
        assert!(store.readings_for_gauge(gauge.id).unwrap().is_empty());
        // The station itself survives
        assert!(store.get_station(station.id).unwrap().is_some());
    }

    #[test]
    fn settings_round_trip() {
        let store = InMemoryStore::new();
        assert_eq!(store.get_setting("machine_reset_time").unwrap(), None);
        store.put_setting("machine_reset_time", "06:00").unwrap();
        assert_eq!(
            store.get_setting("machine_reset_time").unwrap().as_deref(),
            Some("06:00")
        );
    }
}
