//! Gauge type registry: capability flags and defaults per gauge kind
//!
//! A gauge type is immutable reference data. Its capability flags determine
//! which optional fields are meaningful on a gauge of that type and which
//! classification rule family applies (condition-based vs range-based).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::equipment::{Id, NewGauge};
use crate::storage::{Persistence, PersistenceError};

/// Schema describing which optional fields a gauge of this kind carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GaugeType {
    pub id: Id,
    pub name: String,
    pub has_unit: bool,
    pub has_min_value: bool,
    pub has_max_value: bool,
    pub has_step: bool,
    pub has_condition: bool,
    pub has_instruction: bool,
    pub default_unit: Option<String>,
    pub default_min_value: Option<f64>,
    pub default_max_value: Option<f64>,
    pub default_step: Option<f64>,
    pub default_instruction: Option<String>,
}

impl GaugeType {
    /// A numeric value is required on every reading for this type.
    pub fn requires_value(&self) -> bool {
        self.has_unit || self.has_min_value || self.has_max_value
    }

    /// A condition string is required on every reading for this type.
    pub fn requires_condition(&self) -> bool {
        self.has_condition
    }

    /// The range-based classification family applies.
    ///
    /// Condition takes precedence when both families are somehow enabled,
    /// so this is false for any type with `has_condition`.
    pub fn is_range_based(&self) -> bool {
        !self.has_condition && (self.has_min_value || self.has_max_value)
    }
}

/// In-memory lookup of gauge types, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct GaugeTypeRegistry {
    types: HashMap<Id, GaugeType>,
}

impl GaugeTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the persisted gauge types.
    pub fn load(persistence: &dyn Persistence) -> Result<Self, PersistenceError> {
        let mut registry = Self::new();
        for ty in persistence.list_gauge_types()? {
            registry.insert(ty);
        }
        Ok(registry)
    }

    /// Register a type. Replaces any previous type with the same id.
    pub fn insert(&mut self, ty: GaugeType) {
        self.types.insert(ty.id, ty);
    }

    pub fn get(&self, id: Id) -> Option<&GaugeType> {
        self.types.get(&id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GaugeType> {
        self.types.values()
    }

    /// Prepare a new gauge of the given type, applying the type's defaults.
    ///
    /// Fields whose capability flag is off stay `None` regardless of any
    /// default the type carries. Returns `None` for an unknown type id.
    pub fn new_gauge(&self, station_id: Id, type_id: Id, name: &str) -> Option<NewGauge> {
        let ty = self.get(type_id)?;
        Some(NewGauge {
            station_id,
            gauge_type_id: type_id,
            name: name.to_string(),
            unit: ty.has_unit.then(|| ty.default_unit.clone()).flatten(),
            min_value: if ty.has_min_value { ty.default_min_value } else { None },
            max_value: if ty.has_max_value { ty.default_max_value } else { None },
            step: if ty.has_step { ty.default_step } else { None },
            instruction: ty
                .has_instruction
                .then(|| ty.default_instruction.clone())
                .flatten(),
        })
    }
}
