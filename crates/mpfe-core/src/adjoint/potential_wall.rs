//! Adjoint of the potential-flow wall condition.
//!
//! The wall condition has no stiffness and its load does not depend on the
//! potential, so every adjoint contribution is zero. The condition still
//! registers the adjoint DOFs with the same Kutta split as the primal.

use super::{check_adjoint_dofs, AdjointEntity, DesignVariable};
use crate::conditions::PotentialWallCondition2D2N;
use crate::dof::DofLayout;
use crate::elements::{check_entity_base, Entity, EntityBase, LocalSystem};
use crate::error::Result;
use crate::mesh::Node;
use crate::process_info::ProcessInfo;
use crate::variables;
use nalgebra::DMatrix;

/// Working space dimension of the 2D wall
const DIMENSION: usize = 2;

#[derive(Debug, Clone)]
pub struct AdjointPotentialWallCondition2D2N {
    base: EntityBase,
    primal: PotentialWallCondition2D2N,
    layout: DofLayout,
}

impl AdjointPotentialWallCondition2D2N {
    pub fn new(primal: PotentialWallCondition2D2N) -> Result<Self> {
        Ok(Self {
            base: primal.base().clone(),
            layout: primal.dof_layout().to_adjoint()?,
            primal,
        })
    }

    pub(crate) fn from_base(base: EntityBase) -> Result<Self> {
        Self::new(PotentialWallCondition2D2N::from_base(base)?)
    }

    pub fn primal(&self) -> &PotentialWallCondition2D2N {
        &self.primal
    }

    fn sync_primal(&mut self) {
        let base = self.primal.base_mut();
        base.data = self.base.data.clone();
        base.flags = self.base.flags;
    }
}

impl Entity for AdjointPotentialWallCondition2D2N {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        "AdjointPotentialWallCondition2D2N"
    }

    fn dof_layout(&self) -> &DofLayout {
        &self.layout
    }

    fn initialize(&mut self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()> {
        self.primal.initialize(nodes, process_info)
    }

    fn initialize_solution_step(&mut self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()> {
        self.sync_primal();
        self.primal.initialize_solution_step(nodes, process_info)
    }

    fn calculate_local_system(&self, _nodes: &[&Node], _process_info: &ProcessInfo) -> Result<LocalSystem> {
        Ok(LocalSystem::zeros(self.local_size()))
    }

    fn finalize_solution_step(&mut self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()> {
        self.primal.finalize_solution_step(nodes, process_info)
    }

    fn check(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()> {
        self.primal.check(nodes, process_info)?;
        check_entity_base(self, nodes)?;
        check_adjoint_dofs(
            nodes,
            &[
                variables::ADJOINT_VELOCITY_POTENTIAL,
                variables::ADJOINT_AUXILIARY_VELOCITY_POTENTIAL,
            ],
        )
    }
}

impl AdjointEntity for AdjointPotentialWallCondition2D2N {
    /// Zero `(dim·N × N)` block
    fn calculate_sensitivity_matrix(
        &self,
        _design: &DesignVariable,
        _nodes: &[&Node],
        _process_info: &ProcessInfo,
    ) -> Result<DMatrix<f64>> {
        let n = self.geometry().size();
        Ok(DMatrix::zeros(DIMENSION * n, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::DynamicEntity;
    use crate::error::FemError;
    use crate::mesh::Mesh;
    use crate::properties::Properties;
    use nalgebra::{DVector, Vector3};
    use std::sync::Arc;

    fn wall_mesh(distances: [f64; 2], with_adjoint: bool) -> Mesh {
        let mut mesh = Mesh::new();
        mesh.create_node(1, 0.0, 0.0, 0.0);
        mesh.create_node(2, 1.0, 0.5, 0.0);
        mesh.add_variables_with_dofs(&[
            variables::VELOCITY_POTENTIAL,
            variables::AUXILIARY_VELOCITY_POTENTIAL,
        ]);
        if with_adjoint {
            mesh.add_variables_with_dofs(&[
                variables::ADJOINT_VELOCITY_POTENTIAL,
                variables::ADJOINT_AUXILIARY_VELOCITY_POTENTIAL,
            ]);
        }
        for (node, d) in mesh.nodes.values_mut().zip(distances) {
            node.set_solution_step_value(variables::DISTANCE, d);
        }
        mesh
    }

    fn adjoint_wall() -> DynamicEntity {
        let props = Properties::new(1).with(variables::FREE_STREAM_VELOCITY, Vector3::new(1.0, 0.0, 0.0));
        DynamicEntity::create("AdjointPotentialWallCondition2D2N", 5, vec![1, 2], Arc::new(props)).unwrap()
    }

    #[test]
    fn test_zero_system_and_sensitivity() {
        let mesh = wall_mesh([1.0, 1.0], true);
        let nodes = mesh.resolve(&[1, 2]).unwrap();
        let info = ProcessInfo::default();
        let wall = adjoint_wall();

        let system = wall.calculate_local_system(&nodes, &info).unwrap();
        assert_eq!(system.lhs, DMatrix::zeros(2, 2));
        assert_eq!(system.rhs, DVector::zeros(2));

        let s = wall
            .calculate_sensitivity_matrix(&DesignVariable::Shape, &nodes, &info)
            .unwrap();
        assert_eq!(s.shape(), (4, 2));
        assert!(s.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_kutta_split_on_adjoint_fields() {
        let mesh = wall_mesh([0.2, -0.3], true);
        let nodes = mesh.resolve(&[1, 2]).unwrap();
        let dofs = adjoint_wall().dof_list(&nodes).unwrap();
        assert_eq!(dofs[0].variable, variables::ADJOINT_AUXILIARY_VELOCITY_POTENTIAL);
        assert_eq!(dofs[1].variable, variables::ADJOINT_VELOCITY_POTENTIAL);
    }

    #[test]
    fn test_check_requires_adjoint_variables() {
        let info = ProcessInfo::default();
        let wall = adjoint_wall();

        let good = wall_mesh([1.0, 1.0], true);
        let nodes = good.resolve(&[1, 2]).unwrap();
        assert!(wall.check(&nodes, &info).is_ok());

        let primal_only = wall_mesh([1.0, 1.0], false);
        let nodes = primal_only.resolve(&[1, 2]).unwrap();
        assert!(matches!(
            wall.check(&nodes, &info),
            Err(FemError::MissingNodalVariable { .. })
        ));
    }

    #[test]
    fn test_primal_wrapped_entities_are_not_adjoint() {
        let props = Arc::new(Properties::new(1));
        let primal = DynamicEntity::create("PotentialWallCondition2D2N", 1, vec![1, 2], props).unwrap();
        let mesh = wall_mesh([1.0, 1.0], true);
        let nodes = mesh.resolve(&[1, 2]).unwrap();
        assert!(matches!(
            primal.calculate_sensitivity_matrix(&DesignVariable::Shape, &nodes, &ProcessInfo::default()),
            Err(FemError::UnsupportedOperation(_))
        ));
    }
}
