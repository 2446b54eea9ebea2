//! Large-strain hyperelasticity.
//!
//! [`LargeStrain3DLaw`] wraps a strain-energy model that returns the second
//! Piola-Kirchhoff stress and material tangent from the right Cauchy-Green
//! tensor. The spatial measures are obtained by push-forward:
//!
//! - Kirchhoff: `τ = F S Fᵀ`, `c_abcd = F_ai F_bj F_ck F_dl C_ijkl`
//! - Cauchy: `σ = τ / J`, tangent `c / J`

use super::voigt::{
    fourth_order_to_voigt, isotropic_elasticity, lame_parameters, push_forward_tangent,
    strain_tensor_to_vector, stress_tensor_to_vector,
};
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
use nalgebra::{Matrix3, Matrix6};
use std::fmt;

/// Strain-energy model in the reference configuration
pub trait HyperelasticModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// PK2 stress tensor and material tangent (Voigt) from `C = FᵀF` and `J`
    fn pk2_response(
        &self,
        lambda: f64,
        mu: f64,
        right_cauchy_green: &Matrix3<f64>,
        determinant_f: f64,
    ) -> Result<(Matrix3<f64>, Matrix6<f64>)>;
}

/// Compressible neo-Hookean model
/// `W = μ/2 (tr C - 3) - μ ln J + λ/2 (ln J)²`
#[derive(Debug, Clone, Copy, Default)]
pub struct NeoHookean;

impl HyperelasticModel for NeoHookean {
    fn name(&self) -> &'static str {
        "NeoHookean"
    }

    fn pk2_response(
        &self,
        lambda: f64,
        mu: f64,
        right_cauchy_green: &Matrix3<f64>,
        determinant_f: f64,
    ) -> Result<(Matrix3<f64>, Matrix6<f64>)> {
        let c_inv = right_cauchy_green.try_inverse().ok_or_else(|| {
            FemError::Numerical("right Cauchy-Green tensor is singular".to_string())
        })?;
        let ln_j = determinant_f.ln();

        let stress = (Matrix3::identity() - c_inv) * mu + c_inv * (lambda * ln_j);
        let factor = mu - lambda * ln_j;
        let tangent = fourth_order_to_voigt(|i, j, k, l| {
            lambda * c_inv[(i, j)] * c_inv[(k, l)]
                + factor * (c_inv[(i, k)] * c_inv[(j, l)] + c_inv[(i, l)] * c_inv[(j, k)])
        });
        Ok((stress, tangent))
    }
}

/// Saint Venant-Kirchhoff model `S = λ tr(E) I + 2μ E`
#[derive(Debug, Clone, Copy, Default)]
pub struct SaintVenantKirchhoff;

impl HyperelasticModel for SaintVenantKirchhoff {
    fn name(&self) -> &'static str {
        "SaintVenantKirchhoff"
    }

    fn pk2_response(
        &self,
        lambda: f64,
        mu: f64,
        right_cauchy_green: &Matrix3<f64>,
        _determinant_f: f64,
    ) -> Result<(Matrix3<f64>, Matrix6<f64>)> {
        let e = (right_cauchy_green - Matrix3::identity()) * 0.5;
        let stress = Matrix3::identity() * (lambda * e.trace()) + e * (2.0 * mu);
        let tangent = fourth_order_to_voigt(|i, j, k, l| {
            let delta = |a: usize, b: usize| if a == b { 1.0 } else { 0.0 };
            lambda * delta(i, j) * delta(k, l) + mu * (delta(i, k) * delta(j, l) + delta(i, l) * delta(j, k))
        });
        Ok((stress, tangent))
    }
}

/// Finite-strain hyperelastic law
#[derive(Debug)]
pub struct LargeStrain3DLaw {
    model: Box<dyn HyperelasticModel>,
}

/// PK2 response plus the kinematic quantities needed for push-forward
struct MaterialResponse {
    stress: Matrix3<f64>,
    tangent: Matrix6<f64>,
    f: Matrix3<f64>,
    j: f64,
}

impl LargeStrain3DLaw {
    pub fn new(model: Box<dyn HyperelasticModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &dyn HyperelasticModel {
        self.model.as_ref()
    }

    fn material_response(&self, parameters: &mut ConstitutiveParameters<'_>) -> Result<MaterialResponse> {
        let f = parameters.deformation_gradient;
        let j = f.determinant();
        if j <= 0.0 {
            return Err(FemError::Numerical(format!(
                "{}: non-positive deformation determinant {:e}",
                self.name(),
                j
            )));
        }
        parameters.determinant_f = j;

        let c = f.transpose() * f;
        parameters.strain = strain_tensor_to_vector(&((c - Matrix3::identity()) * 0.5));

        let (young, poisson) = elastic_constants(parameters.properties)?;
        let (lambda, mu) = lame_parameters(young, poisson);
        let (stress, tangent) = self.model.pk2_response(lambda, mu, &c, j)?;
        Ok(MaterialResponse {
            stress,
            tangent,
            f,
            j,
        })
    }

    fn store(
        parameters: &mut ConstitutiveParameters<'_>,
        stress: &Matrix3<f64>,
        tangent: Matrix6<f64>,
    ) {
        if parameters.compute_stress {
            parameters.stress = stress_tensor_to_vector(stress);
        }
        if parameters.compute_constitutive_tensor {
            parameters.constitutive_matrix = tangent;
        }
    }
}

impl ConstitutiveLaw for LargeStrain3DLaw {
    fn name(&self) -> &'static str {
        "LargeStrain3DLaw"
    }

    fn features(&self) -> LawFeatures {
        LawFeatures {
            strain_measures: vec![StrainMeasure::GreenLagrange, StrainMeasure::DeformationGradient],
            symmetric_tangent: true,
            finite_strain: true,
            strain_size: 6,
            dimension: 3,
        }
    }

    fn calculate_material_response_pk2(
        &self,
        parameters: &mut ConstitutiveParameters<'_>,
        _state: &InternalVariables,
    ) -> Result<()> {
        let response = self.material_response(parameters)?;
        Self::store(parameters, &response.stress, response.tangent);
        Ok(())
    }

    fn calculate_material_response_kirchhoff(
        &self,
        parameters: &mut ConstitutiveParameters<'_>,
        _state: &InternalVariables,
    ) -> Result<()> {
        let r = self.material_response(parameters)?;
        let tau = r.f * r.stress * r.f.transpose();
        let tangent = if parameters.compute_constitutive_tensor {
            push_forward_tangent(&r.tangent, &r.f)
        } else {
            Matrix6::zeros()
        };
        Self::store(parameters, &tau, tangent);
        Ok(())
    }

    fn calculate_material_response_cauchy(
        &self,
        parameters: &mut ConstitutiveParameters<'_>,
        _state: &InternalVariables,
    ) -> Result<()> {
        let r = self.material_response(parameters)?;
        let sigma = r.f * r.stress * r.f.transpose() / r.j;
        let tangent = if parameters.compute_constitutive_tensor {
            push_forward_tangent(&r.tangent, &r.f) / r.j
        } else {
            Matrix6::zeros()
        };
        Self::store(parameters, &sigma, tangent);
        Ok(())
    }

    fn finalize_material_response(
        &self,
        measure: StressMeasure,
        parameters: &mut ConstitutiveParameters<'_>,
        state: &mut InternalVariables,
    ) -> Result<()> {
        self.calculate_material_response(measure, parameters, state)?;
        let f = parameters.deformation_gradient;
        state.determinant_f = parameters.determinant_f;
        state.inverse_deformation_gradient = f.try_inverse().ok_or_else(|| {
            FemError::Numerical("deformation gradient is not invertible".to_string())
        })?;
        Ok(())
    }

    fn has(&self, variable: &str) -> bool {
        variable == variables::DETERMINANT_F
    }

    fn get_value(&self, variable: &str, state: &InternalVariables) -> Option<Value> {
        (variable == variables::DETERMINANT_F).then(|| Value::Double(state.determinant_f))
    }

    fn check(
        &self,
        properties: &Properties,
        _geometry: &Geometry,
        _process_info: &ProcessInfo,
    ) -> Result<()> {
        let (young, poisson) = elastic_constants(properties)?;
        // Reference tangent must be positive definite
        let d = isotropic_elasticity(young, poisson);
        if d.cholesky().is_none() {
            return Err(FemError::InvalidProperty {
                properties_id: properties.id(),
                variable: variables::POISSON_RATIO.to_string(),
                reason: "elasticity tensor is not positive definite".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constitutive::voigt::{stress_vector_to_tensor, VOIGT_PAIRS};
    use approx::assert_relative_eq;

    fn rubber() -> Properties {
        Properties::new(1)
            .with("YOUNG_MODULUS", 1000.0)
            .with("POISSON_RATIO", 0.35)
    }

    fn sample_f() -> Matrix3<f64> {
        Matrix3::new(1.10, 0.05, 0.00, 0.02, 0.95, 0.03, 0.00, 0.04, 1.02)
    }

    fn response(law: &LargeStrain3DLaw, measure: StressMeasure, f: Matrix3<f64>) -> (Matrix3<f64>, Matrix6<f64>) {
        let props = rubber();
        let mut params = ConstitutiveParameters::new(&props).with_deformation_gradient(f);
        law.calculate_material_response(measure, &mut params, &InternalVariables::default())
            .unwrap();
        (stress_vector_to_tensor(&params.stress), params.constitutive_matrix)
    }

    #[test]
    fn test_reference_state_is_stress_free() {
        for law in [
            LargeStrain3DLaw::new(Box::new(NeoHookean)),
            LargeStrain3DLaw::new(Box::new(SaintVenantKirchhoff)),
        ] {
            let (s, tangent) = response(&law, StressMeasure::PK2, Matrix3::identity());
            assert_relative_eq!(s, Matrix3::zeros(), epsilon = 1e-12);
            assert_relative_eq!(tangent, isotropic_elasticity(1000.0, 0.35), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_stress_measures_are_consistent() {
        let law = LargeStrain3DLaw::new(Box::new(NeoHookean));
        let f = sample_f();
        let j = f.determinant();

        let (s, c_material) = response(&law, StressMeasure::PK2, f);
        let (tau, c_kirchhoff) = response(&law, StressMeasure::Kirchhoff, f);
        let (sigma, c_cauchy) = response(&law, StressMeasure::Cauchy, f);

        assert_relative_eq!(tau, f * s * f.transpose(), epsilon = 1e-10);
        assert_relative_eq!(sigma, tau / j, epsilon = 1e-10);
        assert_relative_eq!(c_kirchhoff, push_forward_tangent(&c_material, &f), epsilon = 1e-8);
        assert_relative_eq!(c_cauchy, c_kirchhoff / j, epsilon = 1e-8);
    }

    #[test]
    fn test_neo_hookean_tangent_matches_finite_difference() {
        let model = NeoHookean;
        let (lambda, mu) = lame_parameters(1000.0, 0.35);
        let f = sample_f();
        let c = f.transpose() * f;
        let (_, tangent) = model.pk2_response(lambda, mu, &c, c.determinant().sqrt()).unwrap();

        // dS/dE_kl with a symmetric perturbation of E (= C/2)
        let h = 1e-7;
        for (col, (k, l)) in VOIGT_PAIRS.iter().copied().enumerate() {
            let mut dc = Matrix3::zeros();
            dc[(k, l)] = 2.0 * h;
            dc[(l, k)] = 2.0 * h;
            let cp = c + dc;
            let cm = c - dc;
            let (sp, _) = model.pk2_response(lambda, mu, &cp, cp.determinant().sqrt()).unwrap();
            let (sm, _) = model.pk2_response(lambda, mu, &cm, cm.determinant().sqrt()).unwrap();
            // ΔE_kl = h, engineering strain change is h (normal) or 2h (shear)
            let engineering = if k == l { h } else { 2.0 * h };
            let numeric = stress_tensor_to_vector(&((sp - sm) / (2.0 * engineering)));
            for row in 0..6 {
                assert_relative_eq!(numeric[row], tangent[(row, col)], epsilon = 1e-3, max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn test_inverted_element_is_numerical_error() {
        let law = LargeStrain3DLaw::new(Box::new(NeoHookean));
        let props = rubber();
        let mut f = Matrix3::identity();
        f[(2, 2)] = -1.0;
        let mut params = ConstitutiveParameters::new(&props).with_deformation_gradient(f);
        let err = law
            .calculate_material_response(StressMeasure::Cauchy, &mut params, &InternalVariables::default())
            .unwrap_err();
        assert!(matches!(err, FemError::Numerical(_)));
    }

    #[test]
    fn test_finalize_stores_kinematics() {
        let law = LargeStrain3DLaw::new(Box::new(NeoHookean));
        let props = rubber();
        let f = sample_f();
        let mut params = ConstitutiveParameters::new(&props).with_deformation_gradient(f);
        let mut state = InternalVariables::default();
        law.finalize_material_response(StressMeasure::PK2, &mut params, &mut state)
            .unwrap();

        assert_relative_eq!(state.determinant_f, f.determinant(), epsilon = 1e-14);
        assert_relative_eq!(state.inverse_deformation_gradient * f, Matrix3::identity(), epsilon = 1e-12);
        assert_eq!(
            law.get_value("DETERMINANT_F", &state).and_then(|v| v.as_f64()),
            Some(state.determinant_f)
        );
    }
}
