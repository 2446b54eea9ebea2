//! Material properties store.
//!
//! A [`Properties`] bag maps variable names to [`Value`]s, holds optional
//! piecewise-linear tables keyed by (input, output) variable, an optional
//! constitutive law prototype and nested sub-properties. Properties are
//! built during setup and shared read-only (`Arc<Properties>`) by the
//! entities that use them.

use crate::constitutive::ConstitutiveLaw;
use crate::error::{FemError, Result};
use crate::table::Table;
use crate::values::Value;
use nalgebra::Vector3;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Properties {
    id: usize,
    values: BTreeMap<String, Value>,
    tables: BTreeMap<(String, String), Table>,
    law: Option<Arc<dyn ConstitutiveLaw>>,
    sub_properties: Vec<Arc<Properties>>,
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Properties")
            .field("id", &self.id)
            .field("values", &self.values)
            .field("tables", &self.tables.keys().collect::<Vec<_>>())
            .field("law", &self.law.as_ref().map(|l| l.name()))
            .field("sub_properties", &self.sub_properties)
            .finish()
    }
}

impl Properties {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.values.insert(name.to_string(), value.into());
    }

    /// Builder-style `set`
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// Required scalar value
    pub fn get_f64(&self, name: &str) -> Result<f64> {
        match self.values.get(name) {
            Some(value) => value.as_f64().ok_or_else(|| FemError::InvalidProperty {
                properties_id: self.id,
                variable: name.to_string(),
                reason: "expected a scalar".to_string(),
            }),
            None => Err(FemError::MissingProperty {
                properties_id: self.id,
                variable: name.to_string(),
            }),
        }
    }

    /// Optional scalar value with a default
    pub fn get_f64_or(&self, name: &str, default: f64) -> Result<f64> {
        if self.has(name) {
            self.get_f64(name)
        } else {
            Ok(default)
        }
    }

    /// Required 3-vector value
    pub fn get_vector3(&self, name: &str) -> Result<Vector3<f64>> {
        match self.values.get(name) {
            Some(value) => value.as_vector3().ok_or_else(|| FemError::InvalidProperty {
                properties_id: self.id,
                variable: name.to_string(),
                reason: "expected a vector with 2 or 3 components".to_string(),
            }),
            None => Err(FemError::MissingProperty {
                properties_id: self.id,
                variable: name.to_string(),
            }),
        }
    }

    /// Required scalar that must be strictly greater than `min`
    pub fn get_f64_above(&self, name: &str, min: f64) -> Result<f64> {
        let value = self.get_f64(name)?;
        if value > min {
            Ok(value)
        } else {
            Err(FemError::InvalidProperty {
                properties_id: self.id,
                variable: name.to_string(),
                reason: format!("value {} must be greater than {}", value, min),
            })
        }
    }

    /// Lookup falling back through sub-properties (ascending id, depth first)
    pub fn find(&self, name: &str) -> Option<&Value> {
        self.values.get(name).or_else(|| {
            self.sub_properties
                .iter()
                .find_map(|sub| sub.find(name))
        })
    }

    pub fn has_table(&self, input: &str, output: &str) -> bool {
        self.tables
            .contains_key(&(input.to_string(), output.to_string()))
    }

    pub fn table(&self, input: &str, output: &str) -> Option<&Table> {
        self.tables.get(&(input.to_string(), output.to_string()))
    }

    pub fn set_table(&mut self, input: &str, output: &str, table: Table) {
        self.tables
            .insert((input.to_string(), output.to_string()), table);
    }

    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    /// Evaluate the (input → output) table at `x`
    pub fn table_value(&self, input: &str, output: &str, x: f64) -> Result<f64> {
        self.table(input, output)
            .and_then(|t| t.value(x))
            .ok_or_else(|| FemError::MissingProperty {
                properties_id: self.id,
                variable: format!("table {} -> {}", input, output),
            })
    }

    pub fn law(&self) -> Option<&Arc<dyn ConstitutiveLaw>> {
        self.law.as_ref()
    }

    /// Law prototype, or a configuration error naming this properties id
    pub fn require_law(&self) -> Result<&Arc<dyn ConstitutiveLaw>> {
        self.law.as_ref().ok_or_else(|| FemError::MissingProperty {
            properties_id: self.id,
            variable: "CONSTITUTIVE_LAW".to_string(),
        })
    }

    pub fn set_law(&mut self, law: Arc<dyn ConstitutiveLaw>) {
        self.law = Some(law);
    }

    pub fn add_sub_properties(&mut self, sub: Arc<Properties>) {
        self.sub_properties.push(sub);
    }

    pub fn sub_properties(&self, id: usize) -> Option<&Arc<Properties>> {
        self.sub_properties.iter().find(|p| p.id == id)
    }

    pub fn all_sub_properties(&self) -> &[Arc<Properties>] {
        &self.sub_properties
    }

    pub fn num_sub_properties(&self) -> usize {
        self.sub_properties.len()
    }
}
