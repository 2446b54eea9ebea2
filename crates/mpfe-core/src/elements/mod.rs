//! Elements and conditions.
//!
//! Every mesh entity implements [`Entity`]. The trait provides the local
//! system contract shared by all kinds: LHS/RHS, mass and damping matrices,
//! DOF layout queries and the solve-step lifecycle. Concrete kinds are
//! gathered in the [`DynamicEntity`] enum, which is what assembly works on.
//!
//! Local systems are rebuilt on every call from the current node state.
//! `calculate_local_system` takes `&self`, so entities can be evaluated in
//! parallel; lifecycle calls that commit state take `&mut self`.

pub mod beam;
pub mod factory;
pub mod solid;
pub mod total_lagrangian;
pub mod transport;

pub use beam::CrLinearBeamElement3D2N;
pub use factory::DynamicEntity;
pub use solid::SmallDisplacementElement;
pub use total_lagrangian::TotalLagrangianElement;
pub use transport::EvmKElement;

use crate::dof::{DofHandle, DofLayout};
use crate::error::{FemError, Result};
use crate::geometry::Geometry;
use crate::mesh::{Configuration, Node};
use crate::process_info::ProcessInfo;
use crate::properties::Properties;
use crate::values::{DataContainer, Flags};
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

/// Element or condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Element,
    Condition,
}

/// State shared by every entity kind
#[derive(Debug, Clone)]
pub struct EntityBase {
    pub id: usize,
    pub kind: EntityKind,
    pub geometry: Geometry,
    pub properties: Arc<Properties>,
    pub data: DataContainer,
    pub flags: Flags,
}

impl EntityBase {
    pub fn new(id: usize, kind: EntityKind, geometry: Geometry, properties: Arc<Properties>) -> Result<Self> {
        if id == 0 {
            return Err(FemError::Validation(
                "entity ids must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            id,
            kind,
            geometry,
            properties,
            data: DataContainer::new(),
            flags: Flags::empty(),
        })
    }

    /// Copy of this base with a new id and geometry; data and flags are kept
    pub fn clone_with(&self, id: usize, node_ids: Vec<usize>) -> Result<Self> {
        let mut base = Self::new(id, self.kind, self.geometry.create(node_ids)?, self.properties.clone())?;
        base.data = self.data.clone();
        base.flags = self.flags;
        Ok(base)
    }
}

/// Local LHS matrix and RHS vector of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSystem {
    pub lhs: DMatrix<f64>,
    pub rhs: DVector<f64>,
}

impl LocalSystem {
    pub fn zeros(size: usize) -> Self {
        Self {
            lhs: DMatrix::zeros(size, size),
            rhs: DVector::zeros(size),
        }
    }

    pub fn size(&self) -> usize {
        self.rhs.len()
    }
}

/// Contribution builder of a mesh entity
pub trait Entity: Send + Sync {
    fn base(&self) -> &EntityBase;

    fn base_mut(&mut self) -> &mut EntityBase;

    /// Registered name of the entity kind
    fn type_name(&self) -> &'static str;

    fn dof_layout(&self) -> &DofLayout;

    fn id(&self) -> usize {
        self.base().id
    }

    fn geometry(&self) -> &Geometry {
        &self.base().geometry
    }

    fn properties(&self) -> &Arc<Properties> {
        &self.base().properties
    }

    fn local_size(&self) -> usize {
        self.dof_layout().local_size(self.geometry().size())
    }

    /// Global equation ids, index-aligned with the local rows
    fn equation_id_vector(&self, nodes: &[&Node]) -> Result<Vec<usize>> {
        self.dof_layout().equation_ids(nodes)
    }

    /// DOF handles, index-aligned with the local rows
    fn dof_list(&self, nodes: &[&Node]) -> Result<Vec<DofHandle>> {
        self.dof_layout().dof_list(nodes)
    }

    /// Nodal values of the local DOFs at solution step `step`
    fn values_vector(&self, nodes: &[&Node], step: usize) -> Result<DVector<f64>> {
        self.dof_layout().values(nodes, step)
    }

    fn initialize(&mut self, _nodes: &[&Node], _process_info: &ProcessInfo) -> Result<()> {
        Ok(())
    }

    fn initialize_solution_step(&mut self, _nodes: &[&Node], _process_info: &ProcessInfo) -> Result<()> {
        Ok(())
    }

    fn calculate_local_system(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<LocalSystem>;

    /// LHS half of [`Entity::calculate_local_system`]
    fn calculate_left_hand_side(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<DMatrix<f64>> {
        Ok(self.calculate_local_system(nodes, process_info)?.lhs)
    }

    /// RHS half of [`Entity::calculate_local_system`]
    fn calculate_right_hand_side(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<DVector<f64>> {
        Ok(self.calculate_local_system(nodes, process_info)?.rhs)
    }

    fn calculate_mass_matrix(&self, _nodes: &[&Node], _process_info: &ProcessInfo) -> Result<DMatrix<f64>> {
        let n = self.local_size();
        Ok(DMatrix::zeros(n, n))
    }

    fn calculate_damping_matrix(&self, _nodes: &[&Node], _process_info: &ProcessInfo) -> Result<DMatrix<f64>> {
        let n = self.local_size();
        Ok(DMatrix::zeros(n, n))
    }

    fn finalize_solution_step(&mut self, _nodes: &[&Node], _process_info: &ProcessInfo) -> Result<()> {
        Ok(())
    }

    /// Validate the entity before the first assembly. Must not mutate anything.
    fn check(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()>;

    /// Derived quantity at each integration point
    fn calculate_on_integration_points(
        &self,
        variable: &str,
        _nodes: &[&Node],
        _process_info: &ProcessInfo,
    ) -> Result<Vec<DVector<f64>>> {
        Err(FemError::UnsupportedOperation(format!(
            "{} does not compute {} on integration points",
            self.type_name(),
            variable
        )))
    }
}

/// Checks shared by every entity kind.
///
/// Verifies the id, that the resolved nodes match the geometry, that the
/// entity has a positive measure and that every node carries the layout
/// variables as solution-step values and DOFs.
pub fn check_entity_base<E: Entity + ?Sized>(entity: &E, nodes: &[&Node]) -> Result<()> {
    let geometry = entity.geometry();
    if entity.id() == 0 {
        return Err(FemError::Validation(format!(
            "{} has id 0",
            entity.type_name()
        )));
    }
    if nodes.len() != geometry.size() || nodes.iter().zip(geometry.node_ids()).any(|(n, id)| n.id != *id) {
        return Err(FemError::Validation(format!(
            "{} {}: nodes do not match the geometry connectivity",
            entity.type_name(),
            entity.id()
        )));
    }

    let measure = geometry.domain_size(nodes, Configuration::Initial)?;
    if measure <= 0.0 {
        return Err(FemError::Validation(format!(
            "{} {}: non-positive domain size {:e}",
            entity.type_name(),
            entity.id(),
            measure
        )));
    }

    let layout = entity.dof_layout();
    for node in nodes {
        if let DofLayout::FieldSelection { discriminant, .. } = layout {
            node.check_variable(discriminant)?;
        }
        for variable in layout.required_variables() {
            node.check_variable_and_dof(variable)?;
        }
    }
    Ok(())
}

/// Check that every node carries `variables` as solution-step values
pub fn check_nodal_variables(nodes: &[&Node], variables: &[&str]) -> Result<()> {
    for node in nodes {
        for variable in variables {
            node.check_variable(variable)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryKind;

    #[test]
    fn test_entity_base_rejects_zero_id() {
        let geometry = Geometry::new(GeometryKind::Line2, vec![1, 2]).unwrap();
        let props = Arc::new(Properties::new(1));
        assert!(EntityBase::new(0, EntityKind::Element, geometry.clone(), props.clone()).is_err());
        assert!(EntityBase::new(1, EntityKind::Condition, geometry, props).is_ok());
    }

    #[test]
    fn test_clone_with_keeps_data_and_flags() {
        let geometry = Geometry::new(GeometryKind::Line2, vec![1, 2]).unwrap();
        let mut base = EntityBase::new(3, EntityKind::Condition, geometry, Arc::new(Properties::new(1))).unwrap();
        base.data.set("TRACED_STRESS_TYPE", "FX");
        base.flags.set(Flags::SLIP, true);

        let clone = base.clone_with(9, vec![5, 6]).unwrap();
        assert_eq!(clone.id, 9);
        assert_eq!(clone.geometry.node_ids(), &[5, 6]);
        assert_eq!(clone.data, base.data);
        assert!(clone.flags.is(Flags::SLIP));
        assert!(Arc::ptr_eq(&clone.properties, &base.properties));

        assert!(base.clone_with(10, vec![5]).is_err());
    }

    #[test]
    fn test_local_system_zeros() {
        let system = LocalSystem::zeros(4);
        assert_eq!(system.lhs.shape(), (4, 4));
        assert_eq!(system.size(), 4);
        assert!(system.lhs.iter().all(|v| *v == 0.0));
    }
}
