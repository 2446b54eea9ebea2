//! Materials reader: builds [`Properties`] from a materials document.
//!
//! For every `properties[]` entry the reader
//! - builds the constitutive law prototype from the `constitutive_law` block,
//! - types every `Variables` entry through the variable registry,
//! - converts `Tables` into piecewise-linear [`Table`]s,
//! - recursively reads `sub_properties`, whose ids must be `1, 2, 3, ...`.
//!
//! Entries that reuse a properties id start from the values read so far for
//! that id, so later entries overwrite earlier ones.

use crate::constitutive::create_constitutive_law;
use crate::error::{FemError, Result};
use crate::properties::Properties;
use crate::table::Table;
use crate::values::Value;
use crate::variables::{self, VariableKind};
use mpfe_io::{MaterialBlock, MaterialValue, MaterialsDocument, SubPropertyBlock};
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Properties read for one mesh part
#[derive(Debug, Clone)]
pub struct PropertyAssignment {
    pub model_part_name: String,
    pub properties: Arc<Properties>,
}

/// Read every entry of a parsed materials document
pub fn read_materials(document: &MaterialsDocument) -> Result<Vec<PropertyAssignment>> {
    tracing::info!(entries = document.properties.len(), "reading materials started");

    let mut by_id: BTreeMap<usize, Properties> = BTreeMap::new();
    let mut assignments = Vec::with_capacity(document.properties.len());
    for block in &document.properties {
        let mut properties = match by_id.get(&block.properties_id) {
            Some(existing) => existing.clone(),
            None => Properties::new(block.properties_id),
        };
        read_material(&mut properties, &block.material)?;
        read_sub_properties(&mut properties, &block.sub_properties)?;

        tracing::debug!(
            model_part = %block.model_part_name,
            properties_id = block.properties_id,
            variables = properties.num_values(),
            tables = properties.num_tables(),
            "assigned properties"
        );
        by_id.insert(block.properties_id, properties.clone());
        assignments.push(PropertyAssignment {
            model_part_name: block.model_part_name.clone(),
            properties: Arc::new(properties),
        });
    }

    tracing::info!("reading materials finished");
    Ok(assignments)
}

/// Parse and read a materials document from a JSON string
pub fn read_materials_str(json: &str) -> Result<Vec<PropertyAssignment>> {
    let document = mpfe_io::parse_materials(json)?;
    read_materials(&document)
}

/// Parse and read a materials document from a JSON file
pub fn read_materials_file(path: impl AsRef<Path>) -> Result<Vec<PropertyAssignment>> {
    let document = mpfe_io::read_materials_file(path)?;
    read_materials(&document)
}

fn read_material(properties: &mut Properties, material: &MaterialBlock) -> Result<()> {
    if let Some(selector) = &material.constitutive_law {
        let law = create_constitutive_law(&selector.name, &selector.parameters)?;
        properties.set(variables::CONSTITUTIVE_LAW_NAME, law.name());
        properties.set_law(law);
    }

    if properties.num_values() > 0 && !material.variables.is_empty() {
        tracing::warn!(
            properties_id = properties.id(),
            existing = properties.num_values(),
            "properties already hold variables, values may be overwritten"
        );
    }

    for (name, json) in &material.variables {
        let trimmed = variables::trim_component_name(name);
        if trimmed != name {
            tracing::warn!("variable name {} is module-qualified, using {}", name, trimmed);
        }
        let value = typed_value(properties.id(), trimmed, json)?;
        properties.set(trimmed, value);
    }

    if properties.num_tables() > 0 && !material.tables.is_empty() {
        tracing::warn!(
            properties_id = properties.id(),
            existing = properties.num_tables(),
            "properties already hold tables, tables may be overwritten"
        );
    }

    for (table_name, block) in &material.tables {
        if block.data.is_empty() {
            return Err(FemError::Configuration(format!(
                "properties {}: table {} has no data",
                properties.id(),
                table_name
            )));
        }
        let table = Table::from_points(block.data.iter().map(|[x, y]| (*x, *y)));
        properties.set_table(
            variables::trim_component_name(&block.input_variable),
            variables::trim_component_name(&block.output_variable),
            table,
        );
    }
    Ok(())
}

fn read_sub_properties(parent: &mut Properties, blocks: &[SubPropertyBlock]) -> Result<()> {
    for (position, block) in blocks.iter().enumerate() {
        let expected = position + 1;
        if block.properties_id != expected {
            return Err(FemError::Configuration(format!(
                "properties {}: sub_properties ids must be consecutive from 1, found {} at position {}",
                parent.id(),
                block.properties_id,
                expected
            )));
        }
        let mut sub = Properties::new(block.properties_id);
        read_material(&mut sub, &block.material)?;
        read_sub_properties(&mut sub, &block.sub_properties)?;
        parent.add_sub_properties(Arc::new(sub));
    }
    Ok(())
}

/// Convert a JSON value, checking its shape against the registered kind
fn typed_value(properties_id: usize, name: &str, json: &serde_json::Value) -> Result<Value> {
    let invalid = |reason: String| FemError::InvalidProperty {
        properties_id,
        variable: name.to_string(),
        reason,
    };
    let value = MaterialValue::try_from(json).map_err(|e| invalid(e.to_string()))?;

    let Some(kind) = variables::kind_of(name) else {
        return Ok(to_value(value));
    };
    let typed = match (kind, value) {
        (VariableKind::Double, MaterialValue::Double(v)) => Value::Double(v),
        (VariableKind::Double, MaterialValue::Int(v)) => Value::Double(v as f64),
        (VariableKind::Int, MaterialValue::Int(v)) => Value::Int(v),
        (VariableKind::Bool, MaterialValue::Bool(v)) => Value::Bool(v),
        (VariableKind::String, MaterialValue::String(v)) => Value::String(v),
        (VariableKind::Vector, MaterialValue::Vector(v)) if v.len() != 3 => {
            return Err(invalid(format!("expected 3 components, got {}", v.len())));
        }
        (VariableKind::Vector, v @ MaterialValue::Vector(_)) => to_value(v),
        (VariableKind::Matrix, v @ MaterialValue::Matrix(_)) => to_value(v),
        (kind, other) => {
            return Err(invalid(format!(
                "expected a {:?} value, got {}",
                kind,
                other.kind_name()
            )));
        }
    };
    Ok(typed)
}

fn to_value(value: MaterialValue) -> Value {
    match value {
        MaterialValue::Bool(v) => Value::Bool(v),
        MaterialValue::Int(v) => Value::Int(v),
        MaterialValue::Double(v) => Value::Double(v),
        MaterialValue::Vector(v) => Value::Vector(DVector::from_vec(v)),
        MaterialValue::Matrix(rows) => {
            let ncols = rows.first().map_or(0, Vec::len);
            Value::Matrix(DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]))
        }
        MaterialValue::String(v) => Value::String(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn document(sub_ids: &[usize]) -> String {
        let subs: Vec<String> = sub_ids
            .iter()
            .map(|id| {
                format!(
                    r#"{{ "properties_id": {}, "Material": {{ "Variables": {{ "DENSITY": {}.0 }} }} }}"#,
                    id, id
                )
            })
            .collect();
        format!(
            r#"{{ "properties": [{{
                "model_part_name": "Structure.Parts_Solid",
                "properties_id": 1,
                "Material": {{ "Variables": {{ "YOUNG_MODULUS": 210000.0 }} }},
                "sub_properties": [{}]
            }}] }}"#,
            subs.join(",")
        )
    }

    #[test]
    fn test_double_round_trip() {
        let assignments = read_materials_str(&document(&[])).unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].model_part_name, "Structure.Parts_Solid");
        assert_eq!(
            assignments[0].properties.get_f64("YOUNG_MODULUS").unwrap(),
            210000.0
        );
    }

    #[test]
    fn test_sub_properties_must_be_sequential() {
        let assignments = read_materials_str(&document(&[1, 2, 3])).unwrap();
        let properties = &assignments[0].properties;
        assert_eq!(properties.num_sub_properties(), 3);
        assert_eq!(
            properties.sub_properties(2).unwrap().get_f64("DENSITY").unwrap(),
            2.0
        );

        for ids in [&[1, 3, 2][..], &[2, 1][..]] {
            assert!(matches!(
                read_materials_str(&document(ids)),
                Err(FemError::Configuration(message)) if message.contains("properties 1")
            ));
        }
    }

    #[test]
    fn test_law_tables_and_prefixes() {
        let json = r#"{ "properties": [{
            "model_part_name": "Structure.Parts_Solid",
            "properties_id": 3,
            "Material": {
                "constitutive_law": {
                    "name": "StructuralMechanicsApplication.SmallStrainJ2Plasticity3DLaw",
                    "hardening": "linear"
                },
                "Variables": {
                    "StructuralMechanicsApplication.YIELD_STRESS": 250,
                    "VOLUME_ACCELERATION": [0.0, 0.0, -9.81],
                    "CUSTOM_FLAG": true,
                    "CUSTOM_MATRIX": [[1.0, 2.0], [3.0, 4.0]]
                },
                "Tables": {
                    "E_vs_T": {
                        "input_variable": "TEMPERATURE",
                        "output_variable": "YOUNG_MODULUS",
                        "data": [[100.0, 200000.0], [0.0, 210000.0]]
                    }
                }
            }
        }] }"#;
        let assignments = read_materials_str(json).unwrap();
        let properties = &assignments[0].properties;

        assert_eq!(properties.require_law().unwrap().name(), "SmallStrainJ2Plasticity3DLaw");
        assert_eq!(
            properties.get(variables::CONSTITUTIVE_LAW_NAME).and_then(Value::as_str),
            Some("SmallStrainJ2Plasticity3DLaw")
        );
        assert_eq!(properties.get("YIELD_STRESS"), Some(&Value::Double(250.0)));
        assert_eq!(
            properties.get_vector3("VOLUME_ACCELERATION").unwrap().z,
            -9.81
        );
        assert_eq!(properties.get("CUSTOM_FLAG"), Some(&Value::Bool(true)));
        assert_eq!(
            properties.get("CUSTOM_MATRIX").and_then(Value::as_matrix).map(|m| m[(1, 0)]),
            Some(3.0)
        );
        assert_relative_eq!(
            properties.table_value("TEMPERATURE", "YOUNG_MODULUS", 50.0).unwrap(),
            205000.0
        );
    }

    #[test]
    fn test_known_variable_with_wrong_shape() {
        let json = r#"{ "properties": [{
            "model_part_name": "Part",
            "properties_id": 1,
            "Material": { "Variables": { "YOUNG_MODULUS": [1.0, 2.0] } }
        }] }"#;
        assert!(matches!(
            read_materials_str(json),
            Err(FemError::InvalidProperty { variable, .. }) if variable == "YOUNG_MODULUS"
        ));
    }

    #[test]
    fn test_unknown_law_is_a_configuration_error() {
        let json = r#"{ "properties": [{
            "model_part_name": "Part",
            "properties_id": 1,
            "Material": { "constitutive_law": { "name": "NoSuchLaw" } }
        }] }"#;
        let err = read_materials_str(json).unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Configuration);
    }

    #[test]
    fn test_repeated_ids_merge() {
        let json = r#"{ "properties": [
            { "model_part_name": "A", "properties_id": 1,
              "Material": { "Variables": { "YOUNG_MODULUS": 1.0, "DENSITY": 5.0 } } },
            { "model_part_name": "B", "properties_id": 1,
              "Material": { "Variables": { "YOUNG_MODULUS": 2.0 } } }
        ] }"#;
        let assignments = read_materials_str(json).unwrap();
        assert_eq!(assignments[0].properties.get_f64("YOUNG_MODULUS").unwrap(), 1.0);
        assert_eq!(assignments[1].properties.get_f64("YOUNG_MODULUS").unwrap(), 2.0);
        assert_eq!(assignments[1].properties.get_f64("DENSITY").unwrap(), 5.0);
    }

    #[test]
    fn test_vector_variables_have_three_components() {
        let json = r#"{ "properties": [{
            "model_part_name": "Part",
            "properties_id": 1,
            "Material": { "Variables": { "VOLUME_ACCELERATION": [0.0, -9.81] } }
        }] }"#;
        assert!(matches!(
            read_materials_str(json),
            Err(FemError::InvalidProperty { variable, .. }) if variable == "VOLUME_ACCELERATION"
        ));

        let json = r#"{ "properties": [{
            "model_part_name": "Part",
            "properties_id": 1,
            "Material": { "Variables": { "VOLUME_ACCELERATION": [0.0, -9.81, 0] } }
        }] }"#;
        let assignments = read_materials_str(json).unwrap();
        assert_eq!(
            assignments[0].properties.get_vector3("VOLUME_ACCELERATION").unwrap(),
            nalgebra::Vector3::new(0.0, -9.81, 0.0)
        );
    }

    #[test]
    fn test_repeated_ids_overwrite_tables() {
        let table = |y: f64| {
            format!(
                r#"{{ "t": {{ "input_variable": "TEMPERATURE", "output_variable": "YOUNG_MODULUS",
                     "data": [[0.0, {}], [100.0, {}]] }} }}"#,
                y, y
            )
        };
        let json = format!(
            r#"{{ "properties": [
                {{ "model_part_name": "A", "properties_id": 3, "Material": {{ "Tables": {} }} }},
                {{ "model_part_name": "B", "properties_id": 3, "Material": {{ "Tables": {} }} }}
            ] }}"#,
            table(1.0),
            table(2.0)
        );
        let assignments = read_materials_str(&json).unwrap();
        assert_eq!(assignments[1].properties.num_tables(), 1);
        assert_eq!(
            assignments[1].properties.table_value("TEMPERATURE", "YOUNG_MODULUS", 50.0).unwrap(),
            2.0
        );
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let json = r#"{ "properties": [{
            "model_part_name": "Part",
            "properties_id": 1,
            "Material": { "Tables": { "t": {
                "input_variable": "TEMPERATURE", "output_variable": "YOUNG_MODULUS", "data": []
            } } }
        }] }"#;
        assert!(matches!(read_materials_str(json), Err(FemError::Configuration(_))));
    }
}
