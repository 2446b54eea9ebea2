//! Typed values, entity data containers and flags.

use crate::error::{FemError, Result};
use nalgebra::{DMatrix, DVector, Vector3};
use std::collections::BTreeMap;

/// Value stored in properties, entity data or read back from a law
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    Vector(DVector<f64>),
    Matrix(DMatrix<f64>),
    String(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&DVector<f64>> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// First three components of a vector value
    pub fn as_vector3(&self) -> Option<Vector3<f64>> {
        match self {
            Value::Vector(v) if v.len() >= 3 => Some(Vector3::new(v[0], v[1], v[2])),
            Value::Vector(v) if v.len() == 2 => Some(Vector3::new(v[0], v[1], 0.0)),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&DMatrix<f64>> {
        match self {
            Value::Matrix(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<Vector3<f64>> for Value {
    fn from(v: Vector3<f64>) -> Self {
        Value::Vector(DVector::from_column_slice(v.as_slice()))
    }
}

impl From<DVector<f64>> for Value {
    fn from(v: DVector<f64>) -> Self {
        Value::Vector(v)
    }
}

impl From<DMatrix<f64>> for Value {
    fn from(m: DMatrix<f64>) -> Self {
        Value::Matrix(m)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Named non-historical values attached to an entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataContainer {
    values: BTreeMap<String, Value>,
}

impl DataContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_f64(&self, name: &str) -> Result<f64> {
        self.get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| FemError::Validation(format!("data value {} is not set", name)))
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Bit set of entity tags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags(u32);

impl Flags {
    pub const ACTIVE: Flags = Flags(1);
    pub const BOUNDARY: Flags = Flags(1 << 1);
    pub const STRUCTURE: Flags = Flags(1 << 2);
    pub const SLIP: Flags = Flags(1 << 3);

    pub fn empty() -> Self {
        Flags(0)
    }

    pub fn is(&self, flag: Flags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn set(&mut self, flag: Flags, on: bool) {
        if on {
            self.0 |= flag.0;
        } else {
            self.0 &= !flag.0;
        }
    }
}
