/// Contracts every registered entity type must honour:
/// LHS/RHS halves match the local system, `check` is repeatable,
/// and equation ids, DOF lists and values are index-aligned.

use mpfe_core::variables::{
    self, ADJOINT_AUXILIARY_VELOCITY_POTENTIAL, ADJOINT_DISPLACEMENT, ADJOINT_ROTATION,
    ADJOINT_VELOCITY_POTENTIAL, AUXILIARY_VELOCITY_POTENTIAL, DISPLACEMENT, ROTATION,
    TURBULENT_ENERGY_DISSIPATION_RATE, TURBULENT_KINETIC_ENERGY, VELOCITY_POTENTIAL,
};
use mpfe_core::{
    DofNumbering, DynamicEntity, Entity, Mesh, ProcessInfo, Properties, create_constitutive_law,
};
use nalgebra::Vector3;
use serde_json::Map;
use std::sync::Arc;

/// Unit cube nodes carrying every field used by the registered entities
fn universal_mesh() -> Mesh {
    let mut mesh = Mesh::new();
    for (id, x, y, z) in [
        (1, 0.0, 0.0, 0.0),
        (2, 1.0, 0.0, 0.0),
        (3, 1.0, 1.0, 0.0),
        (4, 0.0, 1.0, 0.0),
        (5, 0.0, 0.0, 1.0),
        (6, 1.0, 0.0, 1.0),
        (7, 1.0, 1.0, 1.0),
        (8, 0.0, 1.0, 1.0),
    ] {
        mesh.create_node(id, x, y, z);
    }

    let mut dofs: Vec<&str> = Vec::new();
    dofs.extend_from_slice(&DISPLACEMENT);
    dofs.extend_from_slice(&ROTATION);
    dofs.extend_from_slice(&ADJOINT_DISPLACEMENT);
    dofs.extend_from_slice(&ADJOINT_ROTATION);
    dofs.extend_from_slice(&[
        TURBULENT_KINETIC_ENERGY,
        TURBULENT_ENERGY_DISSIPATION_RATE,
        VELOCITY_POTENTIAL,
        AUXILIARY_VELOCITY_POTENTIAL,
        ADJOINT_VELOCITY_POTENTIAL,
        ADJOINT_AUXILIARY_VELOCITY_POTENTIAL,
    ]);
    mesh.add_variables_with_dofs(&dofs);

    for (id, node) in mesh.nodes.iter_mut() {
        let x = node.initial_position();
        node.set_solution_step_value("DISPLACEMENT_X", 1e-3 * x.y);
        node.set_solution_step_value("DISPLACEMENT_Y", -2e-3 * x.z);
        node.set_solution_step_value("DISPLACEMENT_Z", 5e-4 * x.x);
        node.set_solution_step_value("ROTATION_Z", 1e-4 * *id as f64);
        node.set_solution_step_value("VELOCITY_X", 1.0 + x.y);
        node.set_solution_step_value("VELOCITY_Y", 0.5 * x.x);
        node.set_solution_step_value("VELOCITY_Z", 0.0);
        node.set_solution_step_value(variables::KINEMATIC_VISCOSITY, 1e-3);
        node.set_solution_step_value(variables::TURBULENT_VISCOSITY, 1e-2);
        node.set_solution_step_value(TURBULENT_KINETIC_ENERGY, 0.1 + 0.05 * x.x);
        node.set_solution_step_value(VELOCITY_POTENTIAL, x.x);
        node.set_solution_step_value(AUXILIARY_VELOCITY_POTENTIAL, 2.0 * x.x);
        // node 1 lies behind the wake: the wall [1, 2] takes the Kutta split
        let distance = if *id == 1 { -0.5 } else { 0.5 };
        node.set_solution_step_value(variables::DISTANCE, distance);
    }
    mesh
}

fn shared_properties(id: usize) -> Properties {
    Properties::new(id)
        .with("YOUNG_MODULUS", 1000.0)
        .with("POISSON_RATIO", 0.3)
        .with("DENSITY", 2.0)
        .with("VOLUME_ACCELERATION", Vector3::new(0.0, 0.0, -9.81))
        .with("CROSS_AREA", 0.1)
        .with("I22", 1e-3)
        .with("I33", 2e-3)
        .with("TORSIONAL_INERTIA", 3e-3)
        .with("TURBULENT_KINETIC_ENERGY_SIGMA", 1.0)
        .with("TURBULENCE_RANS_C_MU", 0.09)
        .with("FREE_STREAM_VELOCITY", Vector3::new(1.0, 0.2, 0.0))
}

fn properties_with_law(id: usize, law: &str) -> Arc<Properties> {
    let mut properties = shared_properties(id);
    properties.set_law(create_constitutive_law(law, &Map::new()).unwrap());
    Arc::new(properties)
}

/// (registered name, node ids, properties) of one entity per registered type
fn entity_specs() -> Vec<(&'static str, Vec<usize>, Arc<Properties>)> {
    let small = properties_with_law(1, "LinearElastic3DLaw");
    let large = properties_with_law(2, "LargeStrain3DLaw");
    let plain = Arc::new(shared_properties(3));

    let hex = vec![1, 2, 3, 4, 5, 6, 7, 8];
    let tet = vec![1, 2, 4, 5];
    vec![
        ("SmallDisplacementElement3D4N", tet.clone(), small.clone()),
        ("SmallDisplacementElement3D8N", hex.clone(), small),
        ("TotalLagrangianElement3D4N", tet.clone(), large.clone()),
        ("TotalLagrangianElement3D8N", hex, large),
        ("CrLinearBeamElement3D2N", vec![1, 7], plain.clone()),
        ("EvmKElement2D3N", vec![1, 2, 4], plain.clone()),
        ("EvmKElement3D4N", tet, plain.clone()),
        ("AdjointFiniteDifferenceCrBeamElement3D2N", vec![1, 7], plain.clone()),
        ("PotentialWallCondition2D2N", vec![1, 2], plain.clone()),
        ("EvmEpsilonWallCondition2D2N", vec![2, 3], plain.clone()),
        ("AdjointPotentialWallCondition2D2N", vec![1, 2], plain),
    ]
}

fn all_entities(mesh: &Mesh) -> Vec<DynamicEntity> {
    let info = ProcessInfo::default();
    entity_specs()
        .into_iter()
        .enumerate()
        .map(|(i, (name, nodes, properties))| {
            let mut entity = DynamicEntity::create(name, i + 1, nodes, properties).unwrap();
            let resolved = mesh.resolve(entity.geometry().node_ids()).unwrap();
            entity.initialize(&resolved, &info).unwrap();
            entity
        })
        .collect()
}

#[test]
fn test_every_registered_type_is_covered() {
    let mut covered: Vec<&str> = entity_specs().into_iter().map(|(name, _, _)| name).collect();
    let mut registered: Vec<&str> = mpfe_core::elements::factory::registered_names().collect();
    covered.sort_unstable();
    registered.sort_unstable();
    assert_eq!(covered, registered);
}

#[test]
fn test_halves_match_local_system() {
    let mesh = universal_mesh();
    let info = ProcessInfo::default();
    for entity in all_entities(&mesh) {
        let nodes = mesh.resolve(entity.geometry().node_ids()).unwrap();
        let n = entity.local_size();
        let system = entity.calculate_local_system(&nodes, &info).unwrap();
        assert_eq!(system.lhs.shape(), (n, n), "{}", entity.type_name());
        assert_eq!(system.rhs.len(), n, "{}", entity.type_name());
        assert!(system.lhs.iter().chain(system.rhs.iter()).all(|v| v.is_finite()));

        let lhs = entity.calculate_left_hand_side(&nodes, &info).unwrap();
        let rhs = entity.calculate_right_hand_side(&nodes, &info).unwrap();
        assert_eq!(lhs, system.lhs, "{}", entity.type_name());
        assert_eq!(rhs, system.rhs, "{}", entity.type_name());

        let mass = entity.calculate_mass_matrix(&nodes, &info).unwrap();
        let damping = entity.calculate_damping_matrix(&nodes, &info).unwrap();
        assert_eq!(mass.shape(), (n, n), "{}", entity.type_name());
        assert_eq!(damping.shape(), (n, n), "{}", entity.type_name());
    }
}

#[test]
fn test_check_is_repeatable() {
    let mesh = universal_mesh();
    let info = ProcessInfo::default();
    for entity in all_entities(&mesh) {
        let nodes = mesh.resolve(entity.geometry().node_ids()).unwrap();
        let before = entity.clone();
        for _ in 0..3 {
            assert!(entity.check(&nodes, &info).is_ok(), "{}", entity.type_name());
        }
        assert_eq!(entity.base().data, before.base().data);
        assert_eq!(entity.base().flags, before.base().flags);
    }
}

#[test]
fn test_equation_ids_dofs_and_values_are_aligned() {
    let mut mesh = universal_mesh();
    let entities = all_entities(&mesh);
    DofNumbering::assign(&mut mesh, &entities).unwrap();

    for entity in &entities {
        let nodes = mesh.resolve(entity.geometry().node_ids()).unwrap();
        let ids = entity.equation_id_vector(&nodes).unwrap();
        let dofs = entity.dof_list(&nodes).unwrap();
        let values = entity.values_vector(&nodes, 0).unwrap();
        assert_eq!(ids.len(), entity.local_size(), "{}", entity.type_name());
        assert_eq!(dofs.len(), ids.len());
        assert_eq!(values.len(), ids.len());

        for (i, dof) in dofs.iter().enumerate() {
            let node = mesh.node(dof.node_id).unwrap();
            assert_eq!(node.equation_id(dof.variable).unwrap(), ids[i]);
            assert_eq!(node.solution_step_value(dof.variable, 0).unwrap(), values[i]);
        }
    }
}

#[test]
fn test_kutta_wall_rows_follow_the_split() {
    let mut mesh = universal_mesh();
    let entities = all_entities(&mesh);
    DofNumbering::assign(&mut mesh, &entities).unwrap();

    let wall = entities
        .iter()
        .find(|e| e.type_name() == "PotentialWallCondition2D2N")
        .unwrap();
    let nodes = mesh.resolve(wall.geometry().node_ids()).unwrap();
    let dofs = wall.dof_list(&nodes).unwrap();
    assert_eq!(dofs[0].variable, VELOCITY_POTENTIAL);
    assert_eq!(dofs[1].variable, AUXILIARY_VELOCITY_POTENTIAL);

    let values = wall.values_vector(&nodes, 0).unwrap();
    assert_eq!(values[0], 0.0);
    assert_eq!(values[1], 2.0);
}
