//! Entity factory and dispatch enum
//!
//! Entities are created by registered name, the way meshes reference them,
//! and held as [`DynamicEntity`] so assembly can work on a homogeneous
//! collection without trait objects.

use super::{
    CrLinearBeamElement3D2N, Entity, EntityBase, EntityKind, EvmKElement, LocalSystem,
    SmallDisplacementElement, TotalLagrangianElement,
};
use crate::adjoint::{AdjointBehaviour, AdjointFiniteDifferencingElement, AdjointPotentialWallCondition2D2N};
use crate::conditions::{EvmEpsilonWallCondition2D2N, PotentialWallCondition2D2N};
use crate::dof::DofLayout;
use crate::error::{FemError, Result};
use crate::geometry::{Geometry, GeometryKind};
use crate::mesh::Node;
use crate::process_info::ProcessInfo;
use crate::properties::Properties;
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

/// Registered entity names with their geometry family and kind
const REGISTRY: &[(&str, GeometryKind, EntityKind)] = &[
    ("SmallDisplacementElement3D4N", GeometryKind::Tetrahedron4, EntityKind::Element),
    ("SmallDisplacementElement3D8N", GeometryKind::Hexahedron8, EntityKind::Element),
    ("TotalLagrangianElement3D4N", GeometryKind::Tetrahedron4, EntityKind::Element),
    ("TotalLagrangianElement3D8N", GeometryKind::Hexahedron8, EntityKind::Element),
    ("CrLinearBeamElement3D2N", GeometryKind::Line2, EntityKind::Element),
    ("EvmKElement2D3N", GeometryKind::Triangle3, EntityKind::Element),
    ("EvmKElement3D4N", GeometryKind::Tetrahedron4, EntityKind::Element),
    ("AdjointFiniteDifferenceCrBeamElement3D2N", GeometryKind::Line2, EntityKind::Element),
    ("PotentialWallCondition2D2N", GeometryKind::Line2, EntityKind::Condition),
    ("EvmEpsilonWallCondition2D2N", GeometryKind::Line2, EntityKind::Condition),
    ("AdjointPotentialWallCondition2D2N", GeometryKind::Line2, EntityKind::Condition),
];

/// Names accepted by [`DynamicEntity::create`]
pub fn registered_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _, _)| *name)
}

/// Dynamic entity wrapper that can hold any element or condition type
#[derive(Debug, Clone)]
pub enum DynamicEntity {
    SmallDisplacement(SmallDisplacementElement),
    TotalLagrangian(TotalLagrangianElement),
    CrBeam(CrLinearBeamElement3D2N),
    EvmK(EvmKElement),
    PotentialWall(PotentialWallCondition2D2N),
    EvmEpsilonWall(EvmEpsilonWallCondition2D2N),
    AdjointFiniteDifference(AdjointFiniteDifferencingElement),
    AdjointPotentialWall(AdjointPotentialWallCondition2D2N),
}

impl DynamicEntity {
    /// Create an entity from its registered name
    ///
    /// # Arguments
    /// * `name` - Registered entity name, e.g. `SmallDisplacementElement3D4N`
    /// * `id` - Entity id, must be greater than zero
    /// * `node_ids` - Connectivity, must match the arity of the geometry
    /// * `properties` - Shared properties
    pub fn create(name: &str, id: usize, node_ids: Vec<usize>, properties: Arc<Properties>) -> Result<Self> {
        let (_, kind, entity_kind) = REGISTRY
            .iter()
            .find(|(registered, _, _)| *registered == name)
            .ok_or_else(|| FemError::Configuration(format!("unknown entity type '{}'", name)))?;
        let geometry = Geometry::new(*kind, node_ids)?;
        let base = EntityBase::new(id, *entity_kind, geometry, properties)?;
        Self::from_base(name, base)
    }

    fn from_base(name: &str, base: EntityBase) -> Result<Self> {
        let entity = match name {
            "SmallDisplacementElement3D4N" | "SmallDisplacementElement3D8N" => {
                DynamicEntity::SmallDisplacement(SmallDisplacementElement::from_base(base)?)
            }
            "TotalLagrangianElement3D4N" | "TotalLagrangianElement3D8N" => {
                DynamicEntity::TotalLagrangian(TotalLagrangianElement::from_base(base)?)
            }
            "CrLinearBeamElement3D2N" => DynamicEntity::CrBeam(CrLinearBeamElement3D2N::from_base(base)?),
            "EvmKElement2D3N" | "EvmKElement3D4N" => DynamicEntity::EvmK(EvmKElement::from_base(base)?),
            "AdjointFiniteDifferenceCrBeamElement3D2N" => {
                let primal = DynamicEntity::CrBeam(CrLinearBeamElement3D2N::from_base(base)?);
                DynamicEntity::AdjointFiniteDifference(AdjointFiniteDifferencingElement::new(
                    primal,
                    AdjointBehaviour::CrBeam,
                )?)
            }
            "PotentialWallCondition2D2N" => {
                DynamicEntity::PotentialWall(PotentialWallCondition2D2N::from_base(base)?)
            }
            "EvmEpsilonWallCondition2D2N" => {
                DynamicEntity::EvmEpsilonWall(EvmEpsilonWallCondition2D2N::from_base(base)?)
            }
            "AdjointPotentialWallCondition2D2N" => {
                DynamicEntity::AdjointPotentialWall(AdjointPotentialWallCondition2D2N::from_base(base)?)
            }
            other => {
                return Err(FemError::Configuration(format!("unknown entity type '{}'", other)));
            }
        };
        Ok(entity)
    }

    /// New entity of the same type on other nodes.
    ///
    /// Data and flags are copied, the geometry is re-created and the
    /// properties are shared.
    pub fn clone_entity(&self, new_id: usize, node_ids: Vec<usize>) -> Result<Self> {
        match self {
            DynamicEntity::AdjointFiniteDifference(adjoint) => {
                let primal = adjoint.primal().clone_entity(new_id, node_ids)?;
                let mut clone = AdjointFiniteDifferencingElement::new(primal, adjoint.behaviour())?;
                clone.base_mut().data = adjoint.base().data.clone();
                clone.base_mut().flags = adjoint.base().flags;
                Ok(DynamicEntity::AdjointFiniteDifference(clone))
            }
            other => {
                let base = other.base().clone_with(new_id, node_ids)?;
                Self::from_base(other.type_name(), base)
            }
        }
    }

    fn as_entity(&self) -> &dyn Entity {
        match self {
            DynamicEntity::SmallDisplacement(e) => e,
            DynamicEntity::TotalLagrangian(e) => e,
            DynamicEntity::CrBeam(e) => e,
            DynamicEntity::EvmK(e) => e,
            DynamicEntity::PotentialWall(e) => e,
            DynamicEntity::EvmEpsilonWall(e) => e,
            DynamicEntity::AdjointFiniteDifference(e) => e,
            DynamicEntity::AdjointPotentialWall(e) => e,
        }
    }

    fn as_entity_mut(&mut self) -> &mut dyn Entity {
        match self {
            DynamicEntity::SmallDisplacement(e) => e,
            DynamicEntity::TotalLagrangian(e) => e,
            DynamicEntity::CrBeam(e) => e,
            DynamicEntity::EvmK(e) => e,
            DynamicEntity::PotentialWall(e) => e,
            DynamicEntity::EvmEpsilonWall(e) => e,
            DynamicEntity::AdjointFiniteDifference(e) => e,
            DynamicEntity::AdjointPotentialWall(e) => e,
        }
    }

    pub fn is_adjoint(&self) -> bool {
        matches!(
            self,
            DynamicEntity::AdjointFiniteDifference(_) | DynamicEntity::AdjointPotentialWall(_)
        )
    }
}

impl Entity for DynamicEntity {
    fn base(&self) -> &EntityBase {
        self.as_entity().base()
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        self.as_entity_mut().base_mut()
    }

    fn type_name(&self) -> &'static str {
        self.as_entity().type_name()
    }

    fn dof_layout(&self) -> &DofLayout {
        self.as_entity().dof_layout()
    }

    fn initialize(&mut self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()> {
        self.as_entity_mut().initialize(nodes, process_info)
    }

    fn initialize_solution_step(&mut self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()> {
        self.as_entity_mut().initialize_solution_step(nodes, process_info)
    }

    fn calculate_local_system(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<LocalSystem> {
        self.as_entity().calculate_local_system(nodes, process_info)
    }

    fn calculate_left_hand_side(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<DMatrix<f64>> {
        self.as_entity().calculate_left_hand_side(nodes, process_info)
    }

    fn calculate_right_hand_side(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<DVector<f64>> {
        self.as_entity().calculate_right_hand_side(nodes, process_info)
    }

    fn calculate_mass_matrix(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<DMatrix<f64>> {
        self.as_entity().calculate_mass_matrix(nodes, process_info)
    }

    fn calculate_damping_matrix(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<DMatrix<f64>> {
        self.as_entity().calculate_damping_matrix(nodes, process_info)
    }

    fn finalize_solution_step(&mut self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()> {
        self.as_entity_mut().finalize_solution_step(nodes, process_info)
    }

    fn check(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()> {
        self.as_entity().check(nodes, process_info)
    }

    fn calculate_on_integration_points(
        &self,
        variable: &str,
        nodes: &[&Node],
        process_info: &ProcessInfo,
    ) -> Result<Vec<DVector<f64>>> {
        self.as_entity()
            .calculate_on_integration_points(variable, nodes, process_info)
    }
}
