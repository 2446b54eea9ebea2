//! Constitutive laws.
//!
//! A law maps a strain or deformation measure to a stress measure and its
//! tangent. Laws are stateless evaluators shared through the properties
//! (`Arc<dyn ConstitutiveLaw>`); history lives in [`InternalVariables`],
//! one per integration point, owned by the entity through
//! [`IntegrationPointStates`]. Responses read the committed state and
//! `finalize_material_response` writes the converged state back.
//!
//! Available laws:
//! - [`LinearElastic3DLaw`]: small-strain isotropic elasticity
//! - [`SmallStrainJ2Plasticity3DLaw`]: von Mises plasticity with a pluggable [`HardeningLaw`]
//! - [`LargeStrain3DLaw`]: hyperelasticity wrapping a [`HyperelasticModel`]
//! - [`Euler3DLaw`]: inviscid (null-shear) fluid
//! - [`Newtonian3DLaw`]: viscous Newtonian fluid

pub mod elastic;
pub mod fluid;
pub mod hardening;
pub mod hyperelastic;
pub mod plastic;
pub mod voigt;

pub use elastic::LinearElastic3DLaw;
pub use fluid::{Euler3DLaw, Newtonian3DLaw};
pub use hardening::{BoundingSurfaceHardening, HardeningLaw, LinearIsotropicHardening};
pub use hyperelastic::{HyperelasticModel, LargeStrain3DLaw, NeoHookean, SaintVenantKirchhoff};
pub use plastic::SmallStrainJ2Plasticity3DLaw;

use crate::error::{FemError, Result};
use crate::geometry::Geometry;
use crate::process_info::ProcessInfo;
use crate::properties::Properties;
use crate::values::Value;
use crate::variables;
use nalgebra::{DVector, Matrix3, Matrix6, Vector6};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StressMeasure {
    PK2,
    Kirchhoff,
    Cauchy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrainMeasure {
    Infinitesimal,
    GreenLagrange,
    DeformationGradient,
    VelocityGradient,
}

/// Capabilities reported by a law, checked by entities before use
#[derive(Debug, Clone, PartialEq)]
pub struct LawFeatures {
    pub strain_measures: Vec<StrainMeasure>,
    pub symmetric_tangent: bool,
    pub finite_strain: bool,
    pub strain_size: usize,
    pub dimension: usize,
}

impl LawFeatures {
    pub fn supports(&self, measure: StrainMeasure) -> bool {
        self.strain_measures.contains(&measure)
    }

    /// Fail unless the law fits an entity with the given requirements
    pub fn require(
        &self,
        law: &str,
        measure: StrainMeasure,
        strain_size: usize,
        dimension: usize,
    ) -> Result<()> {
        if !self.supports(measure) {
            return Err(FemError::Configuration(format!(
                "{} does not provide the {:?} strain measure",
                law, measure
            )));
        }
        if self.strain_size != strain_size || self.dimension != dimension {
            return Err(FemError::Configuration(format!(
                "{} has strain size {} in {}D, entity requires {} in {}D",
                law, self.strain_size, self.dimension, strain_size, dimension
            )));
        }
        Ok(())
    }
}

/// Input/output block of a material response call
#[derive(Debug, Clone)]
pub struct ConstitutiveParameters<'a> {
    pub properties: &'a Properties,
    /// Strain (or strain rate) in Voigt notation with engineering shear
    pub strain: Vector6<f64>,
    pub deformation_gradient: Matrix3<f64>,
    pub determinant_f: f64,
    pub stress: Vector6<f64>,
    pub constitutive_matrix: Matrix6<f64>,
    pub compute_stress: bool,
    pub compute_constitutive_tensor: bool,
}

impl<'a> ConstitutiveParameters<'a> {
    pub fn new(properties: &'a Properties) -> Self {
        Self {
            properties,
            strain: Vector6::zeros(),
            deformation_gradient: Matrix3::identity(),
            determinant_f: 1.0,
            stress: Vector6::zeros(),
            constitutive_matrix: Matrix6::zeros(),
            compute_stress: true,
            compute_constitutive_tensor: true,
        }
    }

    pub fn with_strain(mut self, strain: Vector6<f64>) -> Self {
        self.strain = strain;
        self
    }

    pub fn with_deformation_gradient(mut self, f: Matrix3<f64>) -> Self {
        self.determinant_f = f.determinant();
        self.deformation_gradient = f;
        self
    }
}

/// History variables of one integration point
#[derive(Debug, Clone, PartialEq)]
pub struct InternalVariables {
    pub plastic_strain: Vector6<f64>,
    pub accumulated_plastic_strain: f64,
    /// Current value of the hardening variable (yield stress or p_c)
    pub hardening: f64,
    pub determinant_f: f64,
    pub inverse_deformation_gradient: Matrix3<f64>,
}

impl Default for InternalVariables {
    fn default() -> Self {
        Self {
            plastic_strain: Vector6::zeros(),
            accumulated_plastic_strain: 0.0,
            hardening: 0.0,
            determinant_f: 1.0,
            inverse_deformation_gradient: Matrix3::identity(),
        }
    }
}

/// Per-integration-point state arena of one entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrationPointStates {
    states: Vec<InternalVariables>,
}

impl IntegrationPointStates {
    /// Run `initialize_material` for every integration point
    pub fn initialize(
        &mut self,
        law: &dyn ConstitutiveLaw,
        properties: &Properties,
        geometry: &Geometry,
        shape_values: &[DVector<f64>],
    ) -> Result<()> {
        self.states = shape_values
            .iter()
            .map(|n| law.initialize_material(properties, geometry, n))
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        !self.states.is_empty()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, point: usize) -> Result<&InternalVariables> {
        self.states.get(point).ok_or_else(|| not_initialized(point))
    }

    pub fn get_mut(&mut self, point: usize) -> Result<&mut InternalVariables> {
        self.states.get_mut(point).ok_or_else(|| not_initialized(point))
    }
}

fn not_initialized(point: usize) -> FemError {
    FemError::Validation(format!(
        "material state of integration point {} is not initialized",
        point
    ))
}

/// Strain-to-stress evaluator
pub trait ConstitutiveLaw: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn features(&self) -> LawFeatures;

    fn strain_size(&self) -> usize {
        self.features().strain_size
    }

    fn working_space_dimension(&self) -> usize {
        self.features().dimension
    }

    /// Initial history of one integration point
    fn initialize_material(
        &self,
        _properties: &Properties,
        _geometry: &Geometry,
        _shape_values: &DVector<f64>,
    ) -> Result<InternalVariables> {
        Ok(InternalVariables::default())
    }

    fn calculate_material_response(
        &self,
        measure: StressMeasure,
        parameters: &mut ConstitutiveParameters<'_>,
        state: &InternalVariables,
    ) -> Result<()> {
        match measure {
            StressMeasure::PK2 => self.calculate_material_response_pk2(parameters, state),
            StressMeasure::Kirchhoff => self.calculate_material_response_kirchhoff(parameters, state),
            StressMeasure::Cauchy => self.calculate_material_response_cauchy(parameters, state),
        }
    }

    fn calculate_material_response_pk2(
        &self,
        _parameters: &mut ConstitutiveParameters<'_>,
        _state: &InternalVariables,
    ) -> Result<()> {
        Err(FemError::UnsupportedStressMeasure {
            law: self.name(),
            measure: StressMeasure::PK2,
        })
    }

    fn calculate_material_response_kirchhoff(
        &self,
        _parameters: &mut ConstitutiveParameters<'_>,
        _state: &InternalVariables,
    ) -> Result<()> {
        Err(FemError::UnsupportedStressMeasure {
            law: self.name(),
            measure: StressMeasure::Kirchhoff,
        })
    }

    fn calculate_material_response_cauchy(
        &self,
        _parameters: &mut ConstitutiveParameters<'_>,
        _state: &InternalVariables,
    ) -> Result<()> {
        Err(FemError::UnsupportedStressMeasure {
            law: self.name(),
            measure: StressMeasure::Cauchy,
        })
    }

    /// Commit the converged state of one integration point
    fn finalize_material_response(
        &self,
        _measure: StressMeasure,
        _parameters: &mut ConstitutiveParameters<'_>,
        _state: &mut InternalVariables,
    ) -> Result<()> {
        Ok(())
    }

    fn has(&self, _variable: &str) -> bool {
        false
    }

    fn get_value(&self, _variable: &str, _state: &InternalVariables) -> Option<Value> {
        None
    }

    fn set_value(&self, variable: &str, _value: &Value, _state: &mut InternalVariables) -> Result<()> {
        Err(FemError::UnsupportedOperation(format!(
            "{} cannot set {}",
            self.name(),
            variable
        )))
    }

    /// Validate material parameters; called once at setup
    fn check(
        &self,
        properties: &Properties,
        geometry: &Geometry,
        process_info: &ProcessInfo,
    ) -> Result<()>;
}

/// Young's modulus and Poisson's ratio with admissibility checks
pub(crate) fn elastic_constants(properties: &Properties) -> Result<(f64, f64)> {
    let young = properties.get_f64_above(variables::YOUNG_MODULUS, 0.0)?;
    let poisson = properties.get_f64(variables::POISSON_RATIO)?;
    if !(poisson > -1.0 && poisson < 0.5) {
        return Err(FemError::InvalidProperty {
            properties_id: properties.id(),
            variable: variables::POISSON_RATIO.to_string(),
            reason: format!("{} is outside (-1, 0.5)", poisson),
        });
    }
    Ok((young, poisson))
}

fn string_parameter<'a>(parameters: &'a Map<String, JsonValue>, key: &str) -> Result<Option<&'a str>> {
    match parameters.get(key) {
        None => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(FemError::Configuration(format!(
            "constitutive law parameter {} must be a string, got {}",
            key, other
        ))),
    }
}

/// Build a law by registered name.
///
/// Module-qualified names (`Application.LawName`) are accepted with a
/// warning. Extra selector keys are law parameters:
/// `hardening` (`linear` | `bounding_surface`) for the J2 law and
/// `model` (`neo_hookean` | `saint_venant_kirchhoff`) for the large strain law.
pub fn create_constitutive_law(
    name: &str,
    parameters: &Map<String, JsonValue>,
) -> Result<Arc<dyn ConstitutiveLaw>> {
    let trimmed = variables::trim_component_name(name);
    if trimmed != name {
        tracing::warn!(
            "constitutive law name {} is module-qualified, using {}",
            name,
            trimmed
        );
    }

    let law: Arc<dyn ConstitutiveLaw> = match trimmed {
        "LinearElastic3DLaw" => Arc::new(LinearElastic3DLaw::new()),
        "SmallStrainJ2Plasticity3DLaw" => {
            let hardening: Box<dyn HardeningLaw> = match string_parameter(parameters, "hardening")? {
                None | Some("linear") => Box::new(LinearIsotropicHardening),
                Some("bounding_surface") => Box::new(BoundingSurfaceHardening),
                Some(other) => {
                    return Err(FemError::Configuration(format!(
                        "unknown hardening law {}",
                        other
                    )));
                }
            };
            Arc::new(SmallStrainJ2Plasticity3DLaw::new(hardening))
        }
        "LargeStrain3DLaw" | "HyperElastic3DLaw" => {
            let model: Box<dyn HyperelasticModel> = match string_parameter(parameters, "model")? {
                None | Some("neo_hookean") => Box::new(NeoHookean),
                Some("saint_venant_kirchhoff") => Box::new(SaintVenantKirchhoff),
                Some(other) => {
                    return Err(FemError::Configuration(format!(
                        "unknown hyperelastic model {}",
                        other
                    )));
                }
            };
            Arc::new(LargeStrain3DLaw::new(model))
        }
        "Euler3DLaw" => Arc::new(Euler3DLaw),
        "Newtonian3DLaw" => Arc::new(Newtonian3DLaw),
        other => {
            return Err(FemError::Configuration(format!(
                "unknown constitutive law {}",
                other
            )));
        }
    };
    Ok(law)
}
