//! Wall condition of the ε transport equation (EvmEpsilonWallCondition2D2N).
//!
//! The dissipation rate at the wall is imposed by the wall-function process,
//! so the condition only registers its DOFs and contributes zero blocks.

use super::check_wall_geometry;
use crate::dof::DofLayout;
use crate::elements::{check_entity_base, Entity, EntityBase, EntityKind, LocalSystem};
use crate::error::Result;
use crate::geometry::Geometry;
use crate::mesh::Node;
use crate::process_info::ProcessInfo;
use crate::properties::Properties;
use crate::variables;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EvmEpsilonWallCondition2D2N {
    base: EntityBase,
    layout: DofLayout,
}

impl EvmEpsilonWallCondition2D2N {
    pub fn new(id: usize, geometry: Geometry, properties: Arc<Properties>) -> Result<Self> {
        Self::from_base(EntityBase::new(id, EntityKind::Condition, geometry, properties)?)
    }

    pub(crate) fn from_base(base: EntityBase) -> Result<Self> {
        check_wall_geometry("EvmEpsilonWallCondition2D2N", &base.geometry)?;
        Ok(Self {
            base,
            layout: DofLayout::uniform(&[variables::TURBULENT_ENERGY_DISSIPATION_RATE]),
        })
    }
}

impl Entity for EvmEpsilonWallCondition2D2N {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        "EvmEpsilonWallCondition2D2N"
    }

    fn dof_layout(&self) -> &DofLayout {
        &self.layout
    }

    fn calculate_local_system(&self, _nodes: &[&Node], _process_info: &ProcessInfo) -> Result<LocalSystem> {
        Ok(LocalSystem::zeros(self.local_size()))
    }

    fn check(&self, nodes: &[&Node], _process_info: &ProcessInfo) -> Result<()> {
        check_entity_base(self, nodes)
    }
}
