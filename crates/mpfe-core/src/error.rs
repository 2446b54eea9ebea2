//! Error taxonomy for the assembly core.
//!
//! Errors fall in four families (see [`ErrorCategory`]): configuration
//! problems found at setup, validation failures raised by `check`,
//! unsupported operations raised at the call site, and numerical edge
//! cases found during assembly. Nothing in the core retries.

use crate::constitutive::StressMeasure;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FemError>;

/// Error family, used by callers deciding whether to abort or flag an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Unsupported,
    Numerical,
}

#[derive(Error, Debug)]
pub enum FemError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("properties {properties_id}: missing required variable {variable}")]
    MissingProperty {
        properties_id: usize,
        variable: String,
    },

    #[error("properties {properties_id}: invalid value for {variable}: {reason}")]
    InvalidProperty {
        properties_id: usize,
        variable: String,
        reason: String,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("node {node_id}: missing solution step variable {variable}")]
    MissingNodalVariable { node_id: usize, variable: String },

    #[error("node {node_id}: missing degree of freedom {variable}")]
    MissingDof { node_id: usize, variable: String },

    #[error("node {node_id}: degree of freedom {variable} has no equation id")]
    UnassignedEquationId { node_id: usize, variable: String },

    #[error("node {0} not found")]
    NodeNotFound(usize),

    #[error("{law} does not implement the {measure:?} stress measure")]
    UnsupportedStressMeasure {
        law: &'static str,
        measure: StressMeasure,
    },

    #[error("no {domain} quadrature of order {order}")]
    UnsupportedIntegrationOrder { domain: &'static str, order: usize },

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("non-positive Jacobian determinant {determinant:e}")]
    NonPositiveJacobian { determinant: f64 },

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("numerical failure: {0}")]
    Numerical(String),

    #[error("entity {entity_id}: {source}")]
    Entity {
        entity_id: usize,
        #[source]
        source: Box<FemError>,
    },

    #[error(transparent)]
    Io(#[from] mpfe_io::IoError),
}

impl FemError {
    /// Innermost error, looking through entity context wrappers
    pub fn root_cause(&self) -> &FemError {
        match self {
            FemError::Entity { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Entity id attached to this error, if any
    pub fn entity_id(&self) -> Option<usize> {
        match self {
            FemError::Entity { entity_id, .. } => Some(*entity_id),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.root_cause() {
            FemError::Configuration(_)
            | FemError::MissingProperty { .. }
            | FemError::InvalidProperty { .. }
            | FemError::Io(_) => ErrorCategory::Configuration,
            FemError::Validation(_)
            | FemError::MissingNodalVariable { .. }
            | FemError::MissingDof { .. }
            | FemError::UnassignedEquationId { .. }
            | FemError::NodeNotFound(_) => ErrorCategory::Validation,
            FemError::UnsupportedStressMeasure { .. }
            | FemError::UnsupportedIntegrationOrder { .. }
            | FemError::UnsupportedOperation(_) => ErrorCategory::Unsupported,
            FemError::NonPositiveJacobian { .. }
            | FemError::DegenerateGeometry(_)
            | FemError::Numerical(_) => ErrorCategory::Numerical,
            // root_cause never returns a wrapper
            FemError::Entity { source, .. } => source.category(),
        }
    }
}

/// Attach entity context to errors
pub trait EntityContext<T> {
    fn for_entity(self, entity_id: usize) -> Result<T>;
}

impl<T> EntityContext<T> for Result<T> {
    fn for_entity(self, entity_id: usize) -> Result<T> {
        self.map_err(|err| match err {
            FemError::Entity { .. } => err,
            other => FemError::Entity {
                entity_id,
                source: Box::new(other),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_context_wraps_once() {
        let res: Result<()> = Err(FemError::NonPositiveJacobian { determinant: -1.0 });
        let err = res.for_entity(7).for_entity(9).unwrap_err();

        assert_eq!(err.entity_id(), Some(7));
        assert!(matches!(err.root_cause(), FemError::NonPositiveJacobian { .. }));
        assert_eq!(err.category(), ErrorCategory::Numerical);
        assert!(err.to_string().starts_with("entity 7:"));
    }

    #[test]
    fn categories() {
        let err = FemError::MissingProperty {
            properties_id: 3,
            variable: "YOUNG_MODULUS".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.to_string().contains("YOUNG_MODULUS"));

        let err = FemError::UnsupportedStressMeasure {
            law: "Euler3DLaw",
            measure: StressMeasure::PK2,
        };
        assert_eq!(err.category(), ErrorCategory::Unsupported);

        let err = FemError::MissingDof {
            node_id: 1,
            variable: "DISPLACEMENT_X".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Validation);
    }
}
