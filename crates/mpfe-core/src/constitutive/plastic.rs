//! Small-strain von Mises plasticity with isotropic hardening.
//!
//! Implicit radial return: the trial deviatoric stress is scaled back onto
//! the yield surface `q = σ_y(α)`, where the equivalent plastic strain
//! increment Δp solves `q_trial - 3GΔp - σ_y(Δp) = 0` by Newton iteration.
//! The returned tangent is the algorithmic (consistent) one:
//!
//! `D_ep = K m⊗m + 2Gβ I_dev - 2Gγ̄ n⊗n`
//!
//! with `β = 1 - 3GΔp/q_trial` and `γ̄ = 1/(1 + H'/3G) - (1 - β)`.

use super::hardening::HardeningLaw;
use super::voigt::{deviatoric_identity, isotropic_elasticity, lame_parameters, stress_norm, unit_vector};
use super::{
    elastic_constants, ConstitutiveLaw, ConstitutiveParameters, InternalVariables, LawFeatures,
    StrainMeasure, StressMeasure,
};
use crate::error::{FemError, Result};
use crate::geometry::Geometry;
use crate::process_info::ProcessInfo;
use crate::properties::Properties;
use crate::values::Value;
use crate::variables;
use nalgebra::{DVector, Matrix6, Vector6};

const MAX_ITERATIONS: usize = 50;
const RELATIVE_TOLERANCE: f64 = 1e-12;

#[derive(Debug)]
pub struct SmallStrainJ2Plasticity3DLaw {
    hardening: Box<dyn HardeningLaw>,
}

/// Converged state of one return mapping
#[derive(Debug, Clone)]
struct ReturnMapping {
    stress: Vector6<f64>,
    tangent: Matrix6<f64>,
    delta_p: f64,
    yield_stress: f64,
    /// Unit deviatoric flow direction (stress-type Voigt)
    flow: Vector6<f64>,
}

impl SmallStrainJ2Plasticity3DLaw {
    pub fn new(hardening: Box<dyn HardeningLaw>) -> Self {
        Self { hardening }
    }

    pub fn hardening_law(&self) -> &dyn HardeningLaw {
        self.hardening.as_ref()
    }

    fn return_mapping(
        &self,
        parameters: &ConstitutiveParameters<'_>,
        state: &InternalVariables,
    ) -> Result<ReturnMapping> {
        let properties = parameters.properties;
        let (young, poisson) = elastic_constants(properties)?;
        let (lambda, mu) = lame_parameters(young, poisson);
        let bulk = lambda + 2.0 * mu / 3.0;
        let d = isotropic_elasticity(young, poisson);

        let elastic_strain = parameters.strain - state.plastic_strain;
        let trial = d * elastic_strain;
        let pressure = (trial[0] + trial[1] + trial[2]) / 3.0;
        let deviator = trial - unit_vector() * pressure;
        let deviator_norm = stress_norm(&deviator);
        let q_trial = (1.5_f64).sqrt() * deviator_norm;

        let yield_stress = state.hardening;
        let tolerance = RELATIVE_TOLERANCE * yield_stress.abs().max(1.0);
        if q_trial - yield_stress <= tolerance {
            return Ok(ReturnMapping {
                stress: trial,
                tangent: d,
                delta_p: 0.0,
                yield_stress,
                flow: Vector6::zeros(),
            });
        }

        let mut delta_p = 0.0;
        let mut converged = false;
        for _ in 0..MAX_ITERATIONS {
            let sigma_y = self
                .hardening
                .calculate_hardening(properties, delta_p, yield_stress)?;
            let residual = q_trial - 3.0 * mu * delta_p - sigma_y;
            if residual.abs() <= tolerance {
                converged = true;
                break;
            }
            let slope = self
                .hardening
                .calculate_delta_hardening(properties, delta_p, yield_stress)?;
            let derivative = -3.0 * mu - slope;
            if derivative.abs() < f64::EPSILON {
                return Err(FemError::Numerical(
                    "J2 return mapping: singular consistency derivative".to_string(),
                ));
            }
            delta_p -= residual / derivative;
        }
        if !converged {
            return Err(FemError::Numerical(format!(
                "J2 return mapping did not converge in {} iterations",
                MAX_ITERATIONS
            )));
        }

        let flow = deviator / deviator_norm;
        let beta = 1.0 - 3.0 * mu * delta_p / q_trial;
        let stress = unit_vector() * pressure + deviator * beta;

        let h = self
            .hardening
            .calculate_delta_hardening(properties, delta_p, yield_stress)?;
        let gamma_bar = 1.0 / (1.0 + h / (3.0 * mu)) - (1.0 - beta);
        let m = unit_vector();
        let tangent = m * m.transpose() * bulk + deviatoric_identity() * (2.0 * mu * beta)
            - flow * flow.transpose() * (2.0 * mu * gamma_bar);

        Ok(ReturnMapping {
            stress,
            tangent,
            delta_p,
            yield_stress: self
                .hardening
                .calculate_hardening(properties, delta_p, yield_stress)?,
            flow,
        })
    }

    fn small_strain_response(
        &self,
        parameters: &mut ConstitutiveParameters<'_>,
        state: &InternalVariables,
    ) -> Result<()> {
        let result = self.return_mapping(parameters, state)?;
        if parameters.compute_stress {
            parameters.stress = result.stress;
        }
        if parameters.compute_constitutive_tensor {
            parameters.constitutive_matrix = result.tangent;
        }
        Ok(())
    }
}

impl ConstitutiveLaw for SmallStrainJ2Plasticity3DLaw {
    fn name(&self) -> &'static str {
        "SmallStrainJ2Plasticity3DLaw"
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

    fn initialize_material(
        &self,
        properties: &Properties,
        _geometry: &Geometry,
        _shape_values: &DVector<f64>,
    ) -> Result<InternalVariables> {
        Ok(InternalVariables {
            hardening: properties.get_f64_above(variables::YIELD_STRESS, 0.0)?,
            ..InternalVariables::default()
        })
    }

    fn calculate_material_response_pk2(
        &self,
        parameters: &mut ConstitutiveParameters<'_>,
        state: &InternalVariables,
    ) -> Result<()> {
        self.small_strain_response(parameters, state)
    }

    fn calculate_material_response_kirchhoff(
        &self,
        parameters: &mut ConstitutiveParameters<'_>,
        state: &InternalVariables,
    ) -> Result<()> {
        self.small_strain_response(parameters, state)
    }

    fn calculate_material_response_cauchy(
        &self,
        parameters: &mut ConstitutiveParameters<'_>,
        state: &InternalVariables,
    ) -> Result<()> {
        self.small_strain_response(parameters, state)
    }

    fn finalize_material_response(
        &self,
        _measure: StressMeasure,
        parameters: &mut ConstitutiveParameters<'_>,
        state: &mut InternalVariables,
    ) -> Result<()> {
        let result = self.return_mapping(parameters, state)?;
        if result.delta_p > 0.0 {
            // Δε_p = Δp √(3/2) n, stored with engineering shear
            let mut increment = result.flow * ((1.5_f64).sqrt() * result.delta_p);
            for i in 3..6 {
                increment[i] *= 2.0;
            }
            state.plastic_strain += increment;
            state.accumulated_plastic_strain += result.delta_p;
            state.hardening = result.yield_stress;
        }
        parameters.stress = result.stress;
        parameters.constitutive_matrix = result.tangent;
        Ok(())
    }

    fn has(&self, variable: &str) -> bool {
        matches!(
            variable,
            variables::EQUIVALENT_PLASTIC_STRAIN | variables::PLASTIC_STRAIN_VECTOR | variables::YIELD_STRESS
        )
    }

    fn get_value(&self, variable: &str, state: &InternalVariables) -> Option<Value> {
        match variable {
            variables::EQUIVALENT_PLASTIC_STRAIN => Some(Value::Double(state.accumulated_plastic_strain)),
            variables::PLASTIC_STRAIN_VECTOR => Some(Value::Vector(DVector::from_column_slice(
                state.plastic_strain.as_slice(),
            ))),
            variables::YIELD_STRESS => Some(Value::Double(state.hardening)),
            _ => None,
        }
    }

    fn set_value(&self, variable: &str, value: &Value, state: &mut InternalVariables) -> Result<()> {
        match (variable, value.as_f64()) {
            (variables::EQUIVALENT_PLASTIC_STRAIN, Some(v)) => {
                state.accumulated_plastic_strain = v;
                Ok(())
            }
            (variables::YIELD_STRESS, Some(v)) => {
                state.hardening = v;
                Ok(())
            }
            _ => Err(FemError::UnsupportedOperation(format!(
                "{} cannot set {}",
                self.name(),
                variable
            ))),
        }
    }

    fn check(
        &self,
        properties: &Properties,
        _geometry: &Geometry,
        _process_info: &ProcessInfo,
    ) -> Result<()> {
        elastic_constants(properties)?;
        properties.get_f64_above(variables::YIELD_STRESS, 0.0)?;
        self.hardening.check(properties)
    }
}
