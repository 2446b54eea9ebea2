//! Adjoint entities for sensitivity analysis.
//!
//! An adjoint entity owns its primal counterpart and delegates to it. The
//! adjoint system matrix is the transposed primal tangent, and sensitivities
//! `∂R/∂s` of the primal residual with respect to a design variable `s` are
//! computed by forward finite differences on the primal.

pub mod finite_difference;
pub mod potential_wall;

pub use finite_difference::{AdjointBehaviour, AdjointFiniteDifferencingElement};
pub use potential_wall::AdjointPotentialWallCondition2D2N;

use crate::elements::{DynamicEntity, Entity};
use crate::error::{FemError, Result};
use crate::mesh::Node;
use crate::process_info::ProcessInfo;
use nalgebra::{DMatrix, DVector};
use std::fmt;
use std::str::FromStr;

/// Design variable of a sensitivity matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignVariable {
    /// Coordinates of every node, rows `3 a + k`
    Shape,
    /// Coordinates of one local node
    NodeShape(usize),
    /// Scalar value of the entity properties
    Property(String),
}

impl DesignVariable {
    pub fn is_shape(&self) -> bool {
        matches!(self, DesignVariable::Shape | DesignVariable::NodeShape(_))
    }

    /// Number of design components (rows of the sensitivity matrix)
    pub fn num_components(&self, num_nodes: usize) -> usize {
        match self {
            DesignVariable::Shape => 3 * num_nodes,
            DesignVariable::NodeShape(_) => 3,
            DesignVariable::Property(_) => 1,
        }
    }
}

impl fmt::Display for DesignVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesignVariable::Shape => write!(f, "SHAPE"),
            DesignVariable::NodeShape(i) => write!(f, "SHAPE[{}]", i),
            DesignVariable::Property(name) => write!(f, "{}", name),
        }
    }
}

/// Section quantity traced by a stress response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracedStressType {
    FX,
    FY,
    FZ,
    MX,
    MY,
    MZ,
}

impl TracedStressType {
    /// Integration point variable and component that hold the quantity
    pub fn source(&self) -> (&'static str, usize) {
        use crate::variables::{FORCE, MOMENT};
        match self {
            TracedStressType::FX => (FORCE, 0),
            TracedStressType::FY => (FORCE, 1),
            TracedStressType::FZ => (FORCE, 2),
            TracedStressType::MX => (MOMENT, 0),
            TracedStressType::MY => (MOMENT, 1),
            TracedStressType::MZ => (MOMENT, 2),
        }
    }
}

impl FromStr for TracedStressType {
    type Err = FemError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "FX" => Ok(TracedStressType::FX),
            "FY" => Ok(TracedStressType::FY),
            "FZ" => Ok(TracedStressType::FZ),
            "MX" => Ok(TracedStressType::MX),
            "MY" => Ok(TracedStressType::MY),
            "MZ" => Ok(TracedStressType::MZ),
            other => Err(FemError::Configuration(format!(
                "invalid traced stress type '{}', expected one of FX, FY, FZ, MX, MY, MZ",
                other
            ))),
        }
    }
}

/// Sensitivity interface of adjoint entities
pub trait AdjointEntity: Entity {
    /// `∂R/∂s`, one row per design component and one column per local DOF.
    /// The returned matrix is freshly allocated on every call.
    fn calculate_sensitivity_matrix(
        &self,
        design: &DesignVariable,
        nodes: &[&Node],
        process_info: &ProcessInfo,
    ) -> Result<DMatrix<f64>>;

    /// Derived response quantity; unknown variables give a zero 3-vector
    fn calculate(&self, _variable: &str, _nodes: &[&Node], _process_info: &ProcessInfo) -> Result<DVector<f64>> {
        Ok(DVector::zeros(3))
    }

    /// Scale applied to the raw finite-difference step
    fn perturbation_size_correction_factor(&self, _design: &DesignVariable, _nodes: &[&Node]) -> Result<f64> {
        Ok(1.0)
    }
}

/// Check that every node carries `variables` as solution-step values and DOFs
pub(crate) fn check_adjoint_dofs(nodes: &[&Node], variables: &[&str]) -> Result<()> {
    for node in nodes {
        for variable in variables {
            node.check_variable_and_dof(variable)?;
        }
    }
    Ok(())
}

impl DynamicEntity {
    /// The adjoint interface of this entity, if it has one
    pub fn as_adjoint(&self) -> Option<&dyn AdjointEntity> {
        match self {
            DynamicEntity::AdjointFiniteDifference(e) => Some(e),
            DynamicEntity::AdjointPotentialWall(e) => Some(e),
            _ => None,
        }
    }

    pub fn calculate_sensitivity_matrix(
        &self,
        design: &DesignVariable,
        nodes: &[&Node],
        process_info: &ProcessInfo,
    ) -> Result<DMatrix<f64>> {
        self.as_adjoint()
            .ok_or_else(|| {
                FemError::UnsupportedOperation(format!(
                    "{} is not an adjoint entity",
                    self.type_name()
                ))
            })?
            .calculate_sensitivity_matrix(design, nodes, process_info)
    }
}
