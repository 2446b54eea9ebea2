//! Small-strain isotropic linear elasticity.

use super::voigt::isotropic_elasticity;
use super::{
    elastic_constants, ConstitutiveLaw, ConstitutiveParameters, InternalVariables, LawFeatures,
    StrainMeasure,
};
use crate::error::Result;
use crate::geometry::Geometry;
use crate::process_info::ProcessInfo;
use crate::properties::Properties;

/// Hooke's law in 3D.
///
/// Under the small-strain assumption the three stress measures coincide,
/// so PK2, Kirchhoff and Cauchy all return `D · ε`.
#[derive(Debug, Clone, Default)]
pub struct LinearElastic3DLaw;

impl LinearElastic3DLaw {
    pub fn new() -> Self {
        Self
    }

    fn linear_response(&self, parameters: &mut ConstitutiveParameters<'_>) -> Result<()> {
        let (young, poisson) = elastic_constants(parameters.properties)?;
        let d = isotropic_elasticity(young, poisson);
        if parameters.compute_stress {
            parameters.stress = d * parameters.strain;
        }
        if parameters.compute_constitutive_tensor {
            parameters.constitutive_matrix = d;
        }
        Ok(())
    }
}

impl ConstitutiveLaw for LinearElastic3DLaw {
    fn name(&self) -> &'static str {
        "LinearElastic3DLaw"
    }

    fn features(&self) -> LawFeatures {
        LawFeatures {
            strain_measures: vec![StrainMeasure::Infinitesimal],
            symmetric_tangent: true,
            finite_strain: false,
            strain_size: 6,
            dimension: 3,
        }
    }

    fn calculate_material_response_pk2(
        &self,
        parameters: &mut ConstitutiveParameters<'_>,
        _state: &InternalVariables,
    ) -> Result<()> {
        self.linear_response(parameters)
    }

    fn calculate_material_response_kirchhoff(
        &self,
        parameters: &mut ConstitutiveParameters<'_>,
        _state: &InternalVariables,
    ) -> Result<()> {
        self.linear_response(parameters)
    }

    fn calculate_material_response_cauchy(
        &self,
        parameters: &mut ConstitutiveParameters<'_>,
        _state: &InternalVariables,
    ) -> Result<()> {
        self.linear_response(parameters)
    }

    fn check(
        &self,
        properties: &Properties,
        _geometry: &Geometry,
        _process_info: &ProcessInfo,
    ) -> Result<()> {
        elastic_constants(properties).map(|_| ())
    }
}
