//! Scalar hardening functions.
//!
//! A hardening law updates a scalar hardening variable (yield stress for
//! metals, preconsolidation pressure for soils) from an internal variable
//! increment. Laws are pure functions of their inputs.

use crate::error::{FemError, Result};
use crate::properties::Properties;
use crate::variables;
use std::fmt;

pub trait HardeningLaw: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Updated hardening variable after an increment `alpha` from `previous`
    fn calculate_hardening(&self, properties: &Properties, alpha: f64, previous: f64) -> Result<f64>;

    /// Derivative of the updated hardening variable with respect to `alpha`
    fn calculate_delta_hardening(
        &self,
        properties: &Properties,
        alpha: f64,
        previous: f64,
    ) -> Result<f64>;

    fn check(&self, properties: &Properties) -> Result<()>;
}

/// `previous + H · alpha`
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearIsotropicHardening;

impl LinearIsotropicHardening {
    fn modulus(properties: &Properties) -> Result<f64> {
        properties.get_f64_or(variables::ISOTROPIC_HARDENING_MODULUS, 0.0)
    }
}

impl HardeningLaw for LinearIsotropicHardening {
    fn name(&self) -> &'static str {
        "LinearIsotropicHardening"
    }

    fn calculate_hardening(&self, properties: &Properties, alpha: f64, previous: f64) -> Result<f64> {
        Ok(previous + Self::modulus(properties)? * alpha)
    }

    fn calculate_delta_hardening(
        &self,
        properties: &Properties,
        _alpha: f64,
        _previous: f64,
    ) -> Result<f64> {
        Self::modulus(properties)
    }

    fn check(&self, properties: &Properties) -> Result<()> {
        let h = Self::modulus(properties)?;
        if h.is_finite() {
            Ok(())
        } else {
            Err(FemError::InvalidProperty {
                properties_id: properties.id(),
                variable: variables::ISOTROPIC_HARDENING_MODULUS.to_string(),
                reason: "must be finite".to_string(),
            })
        }
    }
}

/// Bounding-surface (Cam-clay type) hardening of the preconsolidation pressure:
/// `p_c = previous · exp(-alpha / (λ - κ))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundingSurfaceHardening;

impl BoundingSurfaceHardening {
    /// λ − κ, required to be positive
    fn slope_difference(properties: &Properties) -> Result<f64> {
        let lambda = properties.get_f64(variables::NORMAL_COMPRESSION_SLOPE)?;
        let kappa = properties.get_f64(variables::SWELLING_SLOPE)?;
        if lambda > kappa {
            Ok(lambda - kappa)
        } else {
            Err(FemError::InvalidProperty {
                properties_id: properties.id(),
                variable: variables::NORMAL_COMPRESSION_SLOPE.to_string(),
                reason: format!(
                    "normal compression slope {} must exceed swelling slope {}",
                    lambda, kappa
                ),
            })
        }
    }
}

impl HardeningLaw for BoundingSurfaceHardening {
    fn name(&self) -> &'static str {
        "BoundingSurfaceHardening"
    }

    fn calculate_hardening(&self, properties: &Properties, alpha: f64, previous: f64) -> Result<f64> {
        let denominator = Self::slope_difference(properties)?;
        Ok(previous * (-alpha / denominator).exp())
    }

    fn calculate_delta_hardening(
        &self,
        properties: &Properties,
        alpha: f64,
        previous: f64,
    ) -> Result<f64> {
        let denominator = Self::slope_difference(properties)?;
        Ok(-previous / denominator * (-alpha / denominator).exp())
    }

    fn check(&self, properties: &Properties) -> Result<()> {
        Self::slope_difference(properties).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_hardening() {
        let props = Properties::new(1).with("ISOTROPIC_HARDENING_MODULUS", 1000.0);
        let law = LinearIsotropicHardening;
        assert_relative_eq!(law.calculate_hardening(&props, 0.01, 250.0).unwrap(), 260.0);
        assert_eq!(law.calculate_delta_hardening(&props, 0.01, 250.0).unwrap(), 1000.0);

        // Perfect plasticity without a modulus
        let perfect = Properties::new(2);
        assert_eq!(law.calculate_hardening(&perfect, 0.5, 250.0).unwrap(), 250.0);
    }

    #[test]
    fn test_bounding_surface_formula() {
        let props = Properties::new(1)
            .with("NORMAL_COMPRESSION_SLOPE", 0.2)
            .with("SWELLING_SLOPE", 0.05);
        let law = BoundingSurfaceHardening;

        let pc = law.calculate_hardening(&props, -0.03, 100.0).unwrap();
        assert_relative_eq!(pc, 100.0 * (0.03_f64 / 0.15).exp(), max_relative = 1e-14);

        // Zero increment leaves the state unchanged
        assert_eq!(law.calculate_hardening(&props, 0.0, 100.0).unwrap(), 100.0);

        // Derivative against a central difference
        let h = 1e-7;
        let numeric = (law.calculate_hardening(&props, 0.01 + h, 100.0).unwrap()
            - law.calculate_hardening(&props, 0.01 - h, 100.0).unwrap())
            / (2.0 * h);
        let analytic = law.calculate_delta_hardening(&props, 0.01, 100.0).unwrap();
        assert_relative_eq!(numeric, analytic, max_relative = 1e-6);
    }

    #[test]
    fn test_bounding_surface_requires_ordered_slopes() {
        let props = Properties::new(5)
            .with("NORMAL_COMPRESSION_SLOPE", 0.05)
            .with("SWELLING_SLOPE", 0.05);
        let law = BoundingSurfaceHardening;
        assert!(matches!(
            law.check(&props),
            Err(FemError::InvalidProperty { properties_id: 5, .. })
        ));
        assert!(law.calculate_hardening(&props, 0.1, 1.0).is_err());
    }
}
