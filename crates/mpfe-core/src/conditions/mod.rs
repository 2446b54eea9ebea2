//! Boundary conditions.
//!
//! Conditions implement the same [`Entity`](crate::elements::Entity)
//! contract as elements and are built with `EntityKind::Condition`.

pub mod potential_wall;
pub mod turbulence_wall;

pub use potential_wall::PotentialWallCondition2D2N;
pub use turbulence_wall::EvmEpsilonWallCondition2D2N;

use crate::error::{FemError, Result};
use crate::geometry::{Geometry, GeometryKind};

/// Wall conditions live on 2-node lines in the x-y plane
pub(crate) fn check_wall_geometry(type_name: &str, geometry: &Geometry) -> Result<()> {
    if geometry.kind() != GeometryKind::Line2 {
        return Err(FemError::Configuration(format!(
            "{} requires a Line2 geometry, got {}",
            type_name,
            geometry.kind().name()
        )));
    }
    Ok(())
}
