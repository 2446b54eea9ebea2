//! Fluid laws. Both work on the strain rate and only provide Cauchy stress.

use super::voigt::deviatoric_identity;
use super::{ConstitutiveLaw, ConstitutiveParameters, InternalVariables, LawFeatures, StrainMeasure};
use crate::error::{FemError, Result};
use crate::geometry::Geometry;
use crate::process_info::ProcessInfo;
use crate::properties::Properties;
use crate::variables;
use nalgebra::{Matrix6, Vector6};

fn fluid_features() -> LawFeatures {
    LawFeatures {
        strain_measures: vec![StrainMeasure::VelocityGradient],
        symmetric_tangent: true,
        finite_strain: false,
        strain_size: 6,
        dimension: 3,
    }
}

/// Inviscid fluid: no shear stress, zero tangent
#[derive(Debug, Clone, Copy, Default)]
pub struct Euler3DLaw;

impl ConstitutiveLaw for Euler3DLaw {
    fn name(&self) -> &'static str {
        "Euler3DLaw"
    }

    fn features(&self) -> LawFeatures {
        fluid_features()
    }

    fn calculate_material_response_cauchy(
        &self,
        parameters: &mut ConstitutiveParameters<'_>,
        _state: &InternalVariables,
    ) -> Result<()> {
        if parameters.compute_stress {
            parameters.stress = Vector6::zeros();
        }
        if parameters.compute_constitutive_tensor {
            parameters.constitutive_matrix = Matrix6::zeros();
        }
        Ok(())
    }

    fn check(
        &self,
        _properties: &Properties,
        _geometry: &Geometry,
        _process_info: &ProcessInfo,
    ) -> Result<()> {
        Ok(())
    }
}

/// Newtonian fluid `σ = 2μ dev(ε̇)`
#[derive(Debug, Clone, Copy, Default)]
pub struct Newtonian3DLaw;

impl Newtonian3DLaw {
    /// Dynamic viscosity, or density times kinematic viscosity
    pub fn effective_viscosity(properties: &Properties) -> Result<f64> {
        let mu = if properties.has(variables::DYNAMIC_VISCOSITY) {
            properties.get_f64(variables::DYNAMIC_VISCOSITY)?
        } else if properties.has(variables::KINEMATIC_VISCOSITY) {
            properties.get_f64(variables::DENSITY)? * properties.get_f64(variables::KINEMATIC_VISCOSITY)?
        } else {
            return Err(FemError::MissingProperty {
                properties_id: properties.id(),
                variable: variables::DYNAMIC_VISCOSITY.to_string(),
            });
        };
        if mu < 0.0 {
            return Err(FemError::InvalidProperty {
                properties_id: properties.id(),
                variable: variables::DYNAMIC_VISCOSITY.to_string(),
                reason: format!("viscosity {} is negative", mu),
            });
        }
        Ok(mu)
    }
}

impl ConstitutiveLaw for Newtonian3DLaw {
    fn name(&self) -> &'static str {
        "Newtonian3DLaw"
    }

    fn features(&self) -> LawFeatures {
        fluid_features()
    }

    fn calculate_material_response_cauchy(
        &self,
        parameters: &mut ConstitutiveParameters<'_>,
        _state: &InternalVariables,
    ) -> Result<()> {
        let mu = Self::effective_viscosity(parameters.properties)?;
        let c = deviatoric_identity() * (2.0 * mu);
        if parameters.compute_stress {
            parameters.stress = c * parameters.strain;
        }
        if parameters.compute_constitutive_tensor {
            parameters.constitutive_matrix = c;
        }
        Ok(())
    }

    fn check(
        &self,
        properties: &Properties,
        _geometry: &Geometry,
        _process_info: &ProcessInfo,
    ) -> Result<()> {
        Self::effective_viscosity(properties).map(|_| ())
    }
}
