/// End-to-end tests: materials file → properties → entities → global system

use approx::assert_relative_eq;
use mpfe_core::variables::{DISPLACEMENT, ROTATION};
use mpfe_core::{
    Assembler, AssemblyOptions, AssemblyStrategy, DofNumbering, DynamicEntity, ErrorCategory,
    FemError, Mesh, ProcessInfo, PropertyAssignment, read_materials_file,
};
use std::io::Write;
use std::sync::Arc;

const MATERIALS: &str = r#"{
    "properties": [
        {
            "model_part_name": "Structure.Beams",
            "properties_id": 1,
            "Material": {
                "Variables": {
                    "CROSS_AREA": 0.01,
                    "StructuralMechanicsApplication.YOUNG_MODULUS": 210e9,
                    "POISSON_RATIO": 0.3,
                    "DENSITY": 7850.0,
                    "I22": 2e-6,
                    "I33": 1e-6,
                    "TORSIONAL_INERTIA": 3e-6
                }
            }
        },
        {
            "model_part_name": "Structure.Unfinished",
            "properties_id": 2,
            "Material": {
                "Variables": { "YOUNG_MODULUS": 210e9 }
            }
        }
    ]
}"#;

fn load_materials() -> Vec<PropertyAssignment> {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MATERIALS.as_bytes()).unwrap();
    read_materials_file(file.path()).unwrap()
}

fn properties_for(assignments: &[PropertyAssignment], part: &str) -> Arc<mpfe_core::Properties> {
    assignments
        .iter()
        .find(|a| a.model_part_name == part)
        .map(|a| a.properties.clone())
        .unwrap()
}

/// Curved chain of beams with a non-trivial displacement field
fn beam_chain(properties: Arc<mpfe_core::Properties>, num_elements: usize) -> (Mesh, Vec<DynamicEntity>) {
    let mut mesh = Mesh::new();
    for i in 0..=num_elements {
        let x = i as f64;
        mesh.create_node(i + 1, x, 0.2 * x * x, -0.1 * x);
    }
    let mut vars: Vec<&str> = DISPLACEMENT.to_vec();
    vars.extend_from_slice(&ROTATION);
    mesh.add_variables_with_dofs(&vars);
    for (id, node) in mesh.nodes.iter_mut() {
        let s = *id as f64;
        node.set_solution_step_value("DISPLACEMENT_Y", 1e-3 * s.sin());
        node.set_solution_step_value("ROTATION_X", 2e-4 * s.cos());
    }
    let entities = (1..=num_elements)
        .map(|i| DynamicEntity::create("CrLinearBeamElement3D2N", i, vec![i, i + 1], properties.clone()).unwrap())
        .collect();
    (mesh, entities)
}

fn assemble(
    strategy: AssemblyStrategy,
    compute_lhs: bool,
    mesh: &Mesh,
    entities: &[DynamicEntity],
    n: usize,
) -> mpfe_core::AssembledSystem {
    Assembler::new(AssemblyOptions { strategy, compute_lhs })
        .assemble(mesh, entities, n, &ProcessInfo::default())
        .unwrap()
}

#[test]
fn test_materials_file_drives_assembly() {
    let assignments = load_materials();
    assert_eq!(assignments.len(), 2);
    let beams = properties_for(&assignments, "Structure.Beams");
    assert_eq!(beams.get_f64("YOUNG_MODULUS").unwrap(), 210e9);

    let (mut mesh, entities) = beam_chain(beams, 16);
    let n = DofNumbering::assign(&mut mesh, &entities).unwrap();
    assert_eq!(n, 17 * 6);

    let ordered = assemble(AssemblyStrategy::Ordered, true, &mesh, &entities, n);
    let colored = assemble(AssemblyStrategy::Colored, true, &mesh, &entities, n);
    let locked = assemble(AssemblyStrategy::RowLocked, true, &mesh, &entities, n);

    // Rows of a chain receive at most two contributions, so colouring cannot reorder a sum
    assert_eq!(ordered, colored);

    let (a, b) = (ordered.lhs_dense(), locked.lhs_dense());
    for i in 0..n {
        assert_relative_eq!(ordered.rhs[i], locked.rhs[i], epsilon = 1e-6, max_relative = 1e-12);
        for j in 0..n {
            assert_relative_eq!(a[(i, j)], b[(i, j)], epsilon = 1e-3, max_relative = 1e-12);
        }
    }
}

#[test]
fn test_rhs_only_pass_matches_full_pass() {
    let beams = properties_for(&load_materials(), "Structure.Beams");
    let (mut mesh, entities) = beam_chain(beams, 5);
    let n = DofNumbering::assign(&mut mesh, &entities).unwrap();

    let full = assemble(AssemblyStrategy::Ordered, true, &mesh, &entities, n);
    let rhs_only = assemble(AssemblyStrategy::Ordered, false, &mesh, &entities, n);
    assert_eq!(full.rhs, rhs_only.rhs);
    assert_eq!(rhs_only.lhs.nnz(), 0);
}

#[test]
fn test_incomplete_material_fails_check_with_entity_id() {
    let assignments = load_materials();
    let beams = properties_for(&assignments, "Structure.Beams");
    let unfinished = properties_for(&assignments, "Structure.Unfinished");

    let (mut mesh, mut entities) = beam_chain(beams, 3);
    entities[2] = DynamicEntity::create("CrLinearBeamElement3D2N", 3, vec![3, 4], unfinished).unwrap();
    let n = DofNumbering::assign(&mut mesh, &entities).unwrap();

    let err = Assembler::default()
        .assemble(&mesh, &entities, n, &ProcessInfo::default())
        .unwrap_err();
    assert_eq!(err.entity_id(), Some(3));
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(matches!(err.root_cause(), FemError::MissingProperty { .. }));
}
