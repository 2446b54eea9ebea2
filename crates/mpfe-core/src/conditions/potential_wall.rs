//! Wall condition of the incompressible potential-flow formulation.
//!
//! The condition contributes the free-stream flux through the wall,
//! `RHS_i = -(v∞ · An) / N`, with `An = (Δy, -Δx)` the length-scaled
//! normal of the line. There is no stiffness contribution. Its DOFs follow
//! the Kutta split on `DISTANCE`.

use super::check_wall_geometry;
use crate::dof::DofLayout;
use crate::elements::{check_entity_base, Entity, EntityBase, EntityKind, LocalSystem};
use crate::error::Result;
use crate::geometry::Geometry;
use crate::mesh::{Configuration, Node};
use crate::process_info::ProcessInfo;
use crate::properties::Properties;
use crate::variables;
use nalgebra::DMatrix;
use std::sync::Arc;

/// Kutta layout shared by the primal potential-flow entities
pub(crate) fn potential_layout() -> DofLayout {
    DofLayout::FieldSelection {
        discriminant: variables::DISTANCE,
        primary: variables::VELOCITY_POTENTIAL,
        auxiliary: variables::AUXILIARY_VELOCITY_POTENTIAL,
    }
}

#[derive(Debug, Clone)]
pub struct PotentialWallCondition2D2N {
    base: EntityBase,
    layout: DofLayout,
}

impl PotentialWallCondition2D2N {
    pub fn new(id: usize, geometry: Geometry, properties: Arc<Properties>) -> Result<Self> {
        Self::from_base(EntityBase::new(id, EntityKind::Condition, geometry, properties)?)
    }

    pub(crate) fn from_base(base: EntityBase) -> Result<Self> {
        check_wall_geometry("PotentialWallCondition2D2N", &base.geometry)?;
        Ok(Self {
            base,
            layout: potential_layout(),
        })
    }
}

impl Entity for PotentialWallCondition2D2N {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        "PotentialWallCondition2D2N"
    }

    fn dof_layout(&self) -> &DofLayout {
        &self.layout
    }

    fn calculate_local_system(&self, nodes: &[&Node], _process_info: &ProcessInfo) -> Result<LocalSystem> {
        let n = self.geometry().size();
        let free_stream = self.properties().get_vector3(variables::FREE_STREAM_VELOCITY)?;
        let normal = self.geometry().area_normal_2d(nodes, Configuration::Current)?;
        let flux = free_stream.dot(&normal) / n as f64;

        let mut system = LocalSystem::zeros(n);
        system.rhs.fill(-flux);
        Ok(system)
    }

    fn calculate_left_hand_side(&self, _nodes: &[&Node], _process_info: &ProcessInfo) -> Result<DMatrix<f64>> {
        let n = self.geometry().size();
        Ok(DMatrix::zeros(n, n))
    }

    fn check(&self, nodes: &[&Node], _process_info: &ProcessInfo) -> Result<()> {
        check_entity_base(self, nodes)?;
        self.properties().get_vector3(variables::FREE_STREAM_VELOCITY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dof::DofNumbering;
    use crate::error::FemError;
    use crate::geometry::GeometryKind;
    use crate::mesh::Mesh;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    fn wall_mesh(distances: [f64; 2]) -> Mesh {
        let mut mesh = Mesh::new();
        mesh.create_node(1, 0.0, 0.0, 0.0);
        mesh.create_node(2, 2.0, 0.0, 0.0);
        mesh.add_variables_with_dofs(&[
            variables::VELOCITY_POTENTIAL,
            variables::AUXILIARY_VELOCITY_POTENTIAL,
        ]);
        for (node, d) in mesh.nodes.values_mut().zip(distances) {
            node.set_solution_step_value(variables::DISTANCE, d);
        }
        mesh
    }

    fn condition() -> PotentialWallCondition2D2N {
        let props = Properties::new(1).with(
            variables::FREE_STREAM_VELOCITY,
            DVector::from_vec(vec![1.0, 3.0, 0.0]),
        );
        let geometry = Geometry::new(GeometryKind::Line2, vec![1, 2]).unwrap();
        PotentialWallCondition2D2N::new(1, geometry, Arc::new(props)).unwrap()
    }

    #[test]
    fn test_free_stream_flux() {
        let mesh = wall_mesh([1.0, 1.0]);
        let nodes = mesh.resolve(&[1, 2]).unwrap();
        let system = condition().calculate_local_system(&nodes, &ProcessInfo::default()).unwrap();

        // An = (0, -2), v∞·An = -6, split over 2 nodes
        assert_eq!(system.lhs, DMatrix::zeros(2, 2));
        assert_relative_eq!(system.rhs[0], 3.0);
        assert_relative_eq!(system.rhs[1], 3.0);
    }

    #[test]
    fn test_halves_match_local_system() {
        let mesh = wall_mesh([-1.0, 1.0]);
        let nodes = mesh.resolve(&[1, 2]).unwrap();
        let info = ProcessInfo::default();
        let condition = condition();

        let system = condition.calculate_local_system(&nodes, &info).unwrap();
        assert_eq!(condition.calculate_left_hand_side(&nodes, &info).unwrap(), system.lhs);
        assert_eq!(condition.calculate_right_hand_side(&nodes, &info).unwrap(), system.rhs);
    }

    #[test]
    fn test_kutta_split_is_index_aligned() {
        let mut mesh = wall_mesh([-0.5, 0.5]);
        let condition = condition();
        DofNumbering::assign(&mut mesh, [&condition]).unwrap();
        mesh.node_mut(1).unwrap().set_solution_step_value(variables::VELOCITY_POTENTIAL, 7.0);
        mesh.node_mut(2).unwrap().set_solution_step_value(variables::AUXILIARY_VELOCITY_POTENTIAL, 9.0);

        let nodes = mesh.resolve(&[1, 2]).unwrap();
        let dofs = condition.dof_list(&nodes).unwrap();
        let ids = condition.equation_id_vector(&nodes).unwrap();
        let values = condition.values_vector(&nodes, 0).unwrap();

        assert_eq!(dofs[0].variable, variables::VELOCITY_POTENTIAL);
        assert_eq!(dofs[1].variable, variables::AUXILIARY_VELOCITY_POTENTIAL);
        for (row, dof) in dofs.iter().enumerate() {
            assert_eq!(ids[row], nodes[row].equation_id(dof.variable).unwrap());
        }
        assert_eq!(values.as_slice(), &[7.0, 9.0]);
    }

    #[test]
    fn test_check_is_idempotent_and_requires_free_stream() {
        let mesh = wall_mesh([1.0, 1.0]);
        let nodes = mesh.resolve(&[1, 2]).unwrap();
        let info = ProcessInfo::default();
        let condition = condition();
        assert!(condition.check(&nodes, &info).is_ok());
        assert!(condition.check(&nodes, &info).is_ok());

        let geometry = Geometry::new(GeometryKind::Line2, vec![1, 2]).unwrap();
        let bare = PotentialWallCondition2D2N::new(2, geometry, Arc::new(Properties::new(1))).unwrap();
        assert!(matches!(
            bare.check(&nodes, &info),
            Err(FemError::MissingProperty { .. })
        ));
    }
}
