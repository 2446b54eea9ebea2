//! Materials document model.
//!
//! The document is a JSON object with a `properties` array. Every entry
//! targets a mesh part by name and carries a `Material` block:
//!
//! ```json
//! {
//!   "properties": [{
//!     "model_part_name": "Structure.Parts_Solid",
//!     "properties_id": 1,
//!     "Material": {
//!       "constitutive_law": { "name": "LinearElastic3DLaw" },
//!       "Variables": { "YOUNG_MODULUS": 210000.0, "POISSON_RATIO": 0.3 },
//!       "Tables": {}
//!     },
//!     "sub_properties": []
//!   }]
//! }
//! ```
//!
//! This module only parses and shapes the data; interpretation (typed
//! variables, law construction, sub-property ordering) happens in the core.

use crate::error::{IoError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level materials document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialsDocument {
    #[serde(default)]
    pub properties: Vec<PropertyBlock>,
}

/// One `properties[]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyBlock {
    pub model_part_name: String,
    pub properties_id: usize,
    #[serde(rename = "Material", default)]
    pub material: MaterialBlock,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_properties: Vec<SubPropertyBlock>,
}

/// Nested sub-properties entry (recursive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPropertyBlock {
    pub properties_id: usize,
    #[serde(rename = "Material", default)]
    pub material: MaterialBlock,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_properties: Vec<SubPropertyBlock>,
}

/// Contents of a `Material` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constitutive_law: Option<LawSelector>,
    #[serde(rename = "Variables", default)]
    pub variables: BTreeMap<String, Value>,
    #[serde(rename = "Tables", default)]
    pub tables: BTreeMap<String, TableBlock>,
}

/// Named constitutive law selector; extra keys are law parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LawSelector {
    pub name: String,
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

/// Piecewise-linear table samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    pub input_variable: String,
    pub output_variable: String,
    #[serde(default)]
    pub data: Vec<[f64; 2]>,
}

/// Shape-typed value of a `Variables` entry
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Vector(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
    String(String),
}

impl MaterialValue {
    /// Numeric value as f64 (integers are widened)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MaterialValue::Double(v) => Some(*v),
            MaterialValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            MaterialValue::Bool(_) => "bool",
            MaterialValue::Int(_) => "int",
            MaterialValue::Double(_) => "double",
            MaterialValue::Vector(_) => "vector",
            MaterialValue::Matrix(_) => "matrix",
            MaterialValue::String(_) => "string",
        }
    }
}

impl TryFrom<&Value> for MaterialValue {
    type Error = IoError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(MaterialValue::Bool(*b)),
            Value::String(s) => Ok(MaterialValue::String(s.clone())),
            Value::Number(n) => {
                if n.is_f64() {
                    n.as_f64()
                        .map(MaterialValue::Double)
                        .ok_or_else(|| IoError::InvalidData(format!("non-finite number {}", n)))
                } else if let Some(i) = n.as_i64() {
                    Ok(MaterialValue::Int(i))
                } else {
                    // u64 beyond i64 range
                    n.as_f64()
                        .map(MaterialValue::Double)
                        .ok_or_else(|| IoError::InvalidData(format!("unrepresentable number {}", n)))
                }
            }
            Value::Array(items) => array_value(items),
            Value::Null => Err(IoError::InvalidData("null is not a material value".to_string())),
            Value::Object(_) => Err(IoError::InvalidData(
                "objects are not material values".to_string(),
            )),
        }
    }
}

fn number_row(items: &[Value]) -> Option<Vec<f64>> {
    items.iter().map(Value::as_f64).collect()
}

fn array_value(items: &[Value]) -> Result<MaterialValue> {
    if items.iter().all(Value::is_number) {
        return number_row(items)
            .map(MaterialValue::Vector)
            .ok_or_else(|| IoError::InvalidData("vector entries must be finite numbers".to_string()));
    }

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let row = item
            .as_array()
            .and_then(|r| number_row(r))
            .ok_or_else(|| {
                IoError::InvalidData("matrix rows must be arrays of numbers".to_string())
            })?;
        rows.push(row);
    }

    let width = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != width) {
        return Err(IoError::InvalidData(format!(
            "matrix rows have inconsistent lengths (expected {})",
            width
        )));
    }

    Ok(MaterialValue::Matrix(rows))
}

/// Parse a materials document from a JSON string
pub fn parse_materials(json: &str) -> Result<MaterialsDocument> {
    let document: MaterialsDocument = serde_json::from_str(json)?;
    tracing::debug!(entries = document.properties.len(), "parsed materials document");
    Ok(document)
}

/// Read a materials document from a JSON file
pub fn read_materials_file(path: impl AsRef<Path>) -> Result<MaterialsDocument> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    parse_materials(&contents)
}
