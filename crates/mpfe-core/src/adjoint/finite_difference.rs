//! Finite-difference adjoint element.
//!
//! Wraps any primal element. Lifecycle calls are forwarded after copying the
//! adjoint's data and flags to the primal. The few places where element
//! families differ are selected by [`AdjointBehaviour`].

use super::{check_adjoint_dofs, AdjointEntity, DesignVariable, TracedStressType};
use crate::dof::DofLayout;
use crate::elements::{check_entity_base, DynamicEntity, Entity, EntityBase, LocalSystem};
use crate::error::{FemError, Result};
use crate::mesh::{Configuration, Node};
use crate::process_info::ProcessInfo;
use crate::values::Value;
use crate::variables;
use nalgebra::{DMatrix, DVector, Vector3};
use std::sync::Arc;

/// Element family specific overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjointBehaviour {
    Generic,
    /// Beam: length-scaled shape steps and traced section quantities
    CrBeam,
}

#[derive(Debug, Clone)]
pub struct AdjointFiniteDifferencingElement {
    base: EntityBase,
    primal: Box<DynamicEntity>,
    behaviour: AdjointBehaviour,
    layout: DofLayout,
}

impl AdjointFiniteDifferencingElement {
    pub fn new(primal: DynamicEntity, behaviour: AdjointBehaviour) -> Result<Self> {
        if primal.is_adjoint() {
            return Err(FemError::Configuration(format!(
                "cannot wrap the adjoint entity {}",
                primal.type_name()
            )));
        }
        if behaviour == AdjointBehaviour::CrBeam && !matches!(primal, DynamicEntity::CrBeam(_)) {
            return Err(FemError::Configuration(format!(
                "beam adjoint behaviour requires a CrLinearBeamElement3D2N primal, got {}",
                primal.type_name()
            )));
        }
        Ok(Self {
            base: primal.base().clone(),
            layout: primal.dof_layout().to_adjoint()?,
            primal: Box::new(primal),
            behaviour,
        })
    }

    pub fn primal(&self) -> &DynamicEntity {
        &self.primal
    }

    pub fn behaviour(&self) -> AdjointBehaviour {
        self.behaviour
    }

    fn sync_primal(&mut self) {
        let base = self.primal.base_mut();
        base.data = self.base.data.clone();
        base.flags = self.base.flags;
    }

    /// Raw step scaled by the correction factor when adaptive steps are on
    pub fn perturbation_size(
        &self,
        design: &DesignVariable,
        nodes: &[&Node],
        process_info: &ProcessInfo,
    ) -> Result<f64> {
        let mut h = process_info.perturbation_size;
        if process_info.adapt_perturbation_size {
            h *= self.perturbation_size_correction_factor(design, nodes)?;
        }
        if !(h > 0.0 && h.is_finite()) {
            return Err(FemError::Configuration(format!(
                "perturbation size must be positive, got {}",
                h
            )));
        }
        Ok(h)
    }

    /// Difference quotient of the primal residual after moving local node `a`
    /// by `h` along axis `k`
    fn shape_derivative(
        &self,
        nodes: &[&Node],
        a: usize,
        k: usize,
        h: f64,
        baseline: &DVector<f64>,
        process_info: &ProcessInfo,
    ) -> Result<DVector<f64>> {
        let mut moved = nodes[a].clone();
        let mut delta = Vector3::zeros();
        delta[k] = h;
        moved.translate(delta);

        let perturbed: Vec<&Node> = nodes
            .iter()
            .enumerate()
            .map(|(b, node)| if b == a { &moved } else { *node })
            .collect();
        let rhs = self.primal.calculate_right_hand_side(&perturbed, process_info)?;
        Ok((rhs - baseline) / h)
    }

    /// Difference quotient of the primal residual after scaling the step `h`
    /// by the magnitude of the property value
    fn property_derivative(
        &self,
        name: &str,
        nodes: &[&Node],
        h: f64,
        baseline: &DVector<f64>,
        process_info: &ProcessInfo,
    ) -> Result<DVector<f64>> {
        let mut properties = self.primal.properties().as_ref().clone();
        let value = properties.get_f64(name)?;
        let perturbed_value = value + h * value.abs().max(1.0);
        let step = perturbed_value - value;
        if step == 0.0 {
            return Err(FemError::Numerical(format!(
                "{} {}: perturbation {} does not change {} = {}",
                self.type_name(),
                self.id(),
                h,
                name,
                value
            )));
        }
        properties.set(name, perturbed_value);

        let mut perturbed = (*self.primal).clone();
        perturbed.base_mut().properties = Arc::new(properties);
        let rhs = perturbed.calculate_right_hand_side(nodes, process_info)?;
        Ok((rhs - baseline) / step)
    }

    /// Traced section quantity at the Gauss points or extrapolated to the nodes
    fn traced_stress(&self, variable: &str, nodes: &[&Node], process_info: &ProcessInfo) -> Result<DVector<f64>> {
        let traced: TracedStressType = self
            .base
            .data
            .get(variables::TRACED_STRESS_TYPE)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                FemError::Configuration(format!(
                    "{} {}: {} requires TRACED_STRESS_TYPE in the entity data",
                    self.type_name(),
                    self.id(),
                    variable
                ))
            })?
            .parse()?;

        let (source, component) = traced.source();
        let values: Vec<f64> = self
            .primal
            .calculate_on_integration_points(source, nodes, process_info)?
            .iter()
            .map(|v| v[component])
            .collect();
        if values.len() != 3 {
            return Err(FemError::Numerical(format!(
                "expected 3 section points, got {}",
                values.len()
            )));
        }

        if variable == variables::STRESS_ON_GP {
            Ok(DVector::from_vec(values))
        } else {
            Ok(DVector::from_vec(vec![
                2.0 * values[0] - values[1],
                2.0 * values[2] - values[1],
            ]))
        }
    }

    fn check_beam(&self, nodes: &[&Node]) -> Result<()> {
        let geometry = self.geometry();
        if geometry.working_space_dimension() != 3 || geometry.size() != 2 {
            return Err(FemError::Validation(format!(
                "{} {}: the beam adjoint works only in 3D with 2 nodes",
                self.type_name(),
                self.id()
            )));
        }

        let mut required: Vec<&str> = Vec::with_capacity(12);
        required.extend_from_slice(&variables::DISPLACEMENT);
        required.extend_from_slice(&variables::ROTATION);
        required.extend_from_slice(&variables::ADJOINT_DISPLACEMENT);
        required.extend_from_slice(&variables::ADJOINT_ROTATION);
        check_adjoint_dofs(nodes, &required)?;

        let properties = self.properties();
        properties.get_f64_above(variables::CROSS_AREA, f64::EPSILON)?;
        properties.get_f64_above(variables::YOUNG_MODULUS, f64::EPSILON)?;
        for name in [
            variables::DENSITY,
            variables::POISSON_RATIO,
            variables::TORSIONAL_INERTIA,
            variables::I22,
            variables::I33,
        ] {
            properties.get_f64(name)?;
        }
        Ok(())
    }
}

impl Entity for AdjointFiniteDifferencingElement {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        match self.behaviour {
            AdjointBehaviour::CrBeam => "AdjointFiniteDifferenceCrBeamElement3D2N",
            AdjointBehaviour::Generic => "AdjointFiniteDifferencingElement",
        }
    }

    fn dof_layout(&self) -> &DofLayout {
        &self.layout
    }

    fn initialize(&mut self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()> {
        self.sync_primal();
        self.primal.initialize(nodes, process_info)
    }

    fn initialize_solution_step(&mut self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()> {
        self.sync_primal();
        self.primal.initialize_solution_step(nodes, process_info)
    }

    /// Transposed primal tangent; the adjoint load comes from the response
    fn calculate_local_system(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<LocalSystem> {
        let lhs = self.primal.calculate_left_hand_side(nodes, process_info)?.transpose();
        let rhs = DVector::zeros(lhs.nrows());
        Ok(LocalSystem { lhs, rhs })
    }

    fn calculate_left_hand_side(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<DMatrix<f64>> {
        Ok(self.primal.calculate_left_hand_side(nodes, process_info)?.transpose())
    }

    fn calculate_right_hand_side(&self, _nodes: &[&Node], _process_info: &ProcessInfo) -> Result<DVector<f64>> {
        Ok(DVector::zeros(self.local_size()))
    }

    fn calculate_mass_matrix(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<DMatrix<f64>> {
        self.primal.calculate_mass_matrix(nodes, process_info)
    }

    fn calculate_damping_matrix(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<DMatrix<f64>> {
        self.primal.calculate_damping_matrix(nodes, process_info)
    }

    fn finalize_solution_step(&mut self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()> {
        self.sync_primal();
        self.primal.finalize_solution_step(nodes, process_info)
    }

    fn check(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()> {
        self.primal.check(nodes, process_info)?;
        check_entity_base(self, nodes)?;
        if self.behaviour == AdjointBehaviour::CrBeam {
            self.check_beam(nodes)?;
        }
        Ok(())
    }

    fn calculate_on_integration_points(
        &self,
        variable: &str,
        nodes: &[&Node],
        process_info: &ProcessInfo,
    ) -> Result<Vec<DVector<f64>>> {
        self.primal
            .calculate_on_integration_points(variable, nodes, process_info)
    }
}

impl AdjointEntity for AdjointFiniteDifferencingElement {
    fn calculate_sensitivity_matrix(
        &self,
        design: &DesignVariable,
        nodes: &[&Node],
        process_info: &ProcessInfo,
    ) -> Result<DMatrix<f64>> {
        let num_nodes = self.geometry().size();
        let mut output = DMatrix::zeros(design.num_components(num_nodes), self.local_size());
        let h = self.perturbation_size(design, nodes, process_info)?;
        let baseline = self.primal.calculate_right_hand_side(nodes, process_info)?;

        match design {
            DesignVariable::Shape => {
                for a in 0..num_nodes {
                    for k in 0..3 {
                        let row = self.shape_derivative(nodes, a, k, h, &baseline, process_info)?;
                        output.set_row(3 * a + k, &row.transpose());
                    }
                }
            }
            DesignVariable::NodeShape(a) => {
                if *a >= num_nodes {
                    return Err(FemError::Validation(format!(
                        "{} {}: node index {} out of range for {} nodes",
                        self.type_name(),
                        self.id(),
                        a,
                        num_nodes
                    )));
                }
                for k in 0..3 {
                    let row = self.shape_derivative(nodes, *a, k, h, &baseline, process_info)?;
                    output.set_row(k, &row.transpose());
                }
            }
            DesignVariable::Property(name) => {
                let row = self.property_derivative(name, nodes, h, &baseline, process_info)?;
                output.set_row(0, &row.transpose());
            }
        }

        tracing::debug!(
            entity = self.id(),
            design = %design,
            step = h,
            "computed finite-difference sensitivity"
        );
        Ok(output)
    }

    fn calculate(&self, variable: &str, nodes: &[&Node], process_info: &ProcessInfo) -> Result<DVector<f64>> {
        let traced = variable == variables::STRESS_ON_GP || variable == variables::STRESS_ON_NODE;
        match (self.behaviour, traced) {
            (AdjointBehaviour::CrBeam, true) => self.traced_stress(variable, nodes, process_info),
            (AdjointBehaviour::Generic, true) => Err(FemError::UnsupportedOperation(format!(
                "{} does not trace {}",
                self.type_name(),
                variable
            ))),
            (_, false) => Ok(DVector::zeros(3)),
        }
    }

    /// Initial length for shape design variables of beams, 1 otherwise
    fn perturbation_size_correction_factor(&self, design: &DesignVariable, nodes: &[&Node]) -> Result<f64> {
        match self.behaviour {
            AdjointBehaviour::CrBeam if design.is_shape() => self
                .geometry()
                .characteristic_length(nodes, Configuration::Initial),
            _ => Ok(1.0),
        }
    }
}
