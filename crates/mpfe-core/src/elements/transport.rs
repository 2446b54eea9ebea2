//! Turbulent kinetic energy transport of the k-ε model (EvmKElement2D3N / 3D4N).
//!
//! Stabilised convection-diffusion-reaction equation for `k`:
//!
//! `u·∇k - ∇·(Γ ∇k) + s k = f`
//!
//! with `Γ = ν + ν_t/σ_k`, `s = 2/3 ∇·u + C_μ k/ν_t` and `f = ν_t P`,
//! `P = (∇u + ∇uᵀ) : ∇u`. Streamline upwinding (SUPG) adds
//! `τ (u·∇w)` weighted residual terms with
//! `τ = [(2|u|/h)² + (4Γ/h²)² + s²]^(-1/2)`.

use super::{check_entity_base, check_nodal_variables, Entity, EntityBase, EntityKind, LocalSystem};
use crate::dof::DofLayout;
use crate::error::{FemError, Result};
use crate::geometry::{Geometry, GeometryKind, PointData};
use crate::mesh::{Configuration, Node};
use crate::process_info::ProcessInfo;
use crate::properties::Properties;
use crate::variables;
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use std::sync::Arc;

const INTEGRATION_ORDER: usize = 2;

/// Interpolated quantities at one integration point
#[derive(Debug, Clone)]
struct PointState {
    velocity: Vector3<f64>,
    velocity_gradient: Matrix3<f64>,
    kinematic_viscosity: f64,
    turbulent_viscosity: f64,
    kinetic_energy: f64,
}

#[derive(Debug, Clone)]
pub struct EvmKElement {
    base: EntityBase,
    layout: DofLayout,
}

impl EvmKElement {
    pub fn new(id: usize, geometry: Geometry, properties: Arc<Properties>) -> Result<Self> {
        Self::from_base(EntityBase::new(id, EntityKind::Element, geometry, properties)?)
    }

    pub(crate) fn from_base(base: EntityBase) -> Result<Self> {
        match base.geometry.kind() {
            GeometryKind::Triangle3 | GeometryKind::Tetrahedron4 => Ok(Self {
                base,
                layout: DofLayout::uniform(&[variables::TURBULENT_KINETIC_ENERGY]),
            }),
            other => Err(FemError::Configuration(format!(
                "EvmKElement requires a Triangle3 or Tetrahedron4 geometry, got {}",
                other.name()
            ))),
        }
    }

    /// Number of velocity components (2 for triangles, 3 for tetrahedra)
    pub fn dimension(&self) -> usize {
        self.geometry().local_dimension()
    }

    fn nodal_inputs(&self) -> Vec<&'static str> {
        let mut inputs: Vec<&'static str> = variables::VELOCITY[..self.dimension()].to_vec();
        inputs.push(variables::KINEMATIC_VISCOSITY);
        inputs.push(variables::TURBULENT_VISCOSITY);
        inputs
    }

    fn point_state(&self, nodes: &[&Node], point: &PointData) -> Result<PointState> {
        let dim = self.dimension();
        let mut state = PointState {
            velocity: Vector3::zeros(),
            velocity_gradient: Matrix3::zeros(),
            kinematic_viscosity: 0.0,
            turbulent_viscosity: 0.0,
            kinetic_energy: 0.0,
        };
        for (a, node) in nodes.iter().enumerate() {
            let na = point.shape_values[a];
            for i in 0..dim {
                let ui = node.solution_step_value(variables::VELOCITY[i], 0)?;
                state.velocity[i] += na * ui;
                for j in 0..dim {
                    state.velocity_gradient[(i, j)] += ui * point.gradients[(a, j)];
                }
            }
            state.kinematic_viscosity += na * node.solution_step_value(variables::KINEMATIC_VISCOSITY, 0)?;
            state.turbulent_viscosity += na * node.solution_step_value(variables::TURBULENT_VISCOSITY, 0)?;
            state.kinetic_energy += na * node.solution_step_value(variables::TURBULENT_KINETIC_ENERGY, 0)?;
        }
        Ok(state)
    }

    /// Effective diffusivity, reaction and source at a point
    fn coefficients(&self, state: &PointState) -> Result<(f64, f64, f64)> {
        let properties = self.properties();
        let sigma_k = properties.get_f64_above(variables::TURBULENT_KINETIC_ENERGY_SIGMA, 0.0)?;
        let c_mu = properties.get_f64(variables::TURBULENCE_RANS_C_MU)?;

        let nu_t = state.turbulent_viscosity.max(f64::EPSILON);
        let gamma = state.kinematic_viscosity + state.turbulent_viscosity / sigma_k;
        let divergence = state.velocity_gradient.trace();
        let reaction = 2.0 / 3.0 * divergence + c_mu * state.kinetic_energy / nu_t;

        let g = &state.velocity_gradient;
        let production = (g + g.transpose()).component_mul(g).sum();
        let source = state.turbulent_viscosity * production;
        Ok((gamma, reaction, source))
    }

    /// Velocity (steady) LHS and source vector
    fn velocity_contribution(&self, nodes: &[&Node]) -> Result<(DMatrix<f64>, DVector<f64>)> {
        let n = self.geometry().size();
        let h = self.geometry().characteristic_length(nodes, Configuration::Current)?;
        let mut lhs = DMatrix::zeros(n, n);
        let mut rhs = DVector::zeros(n);

        for point in self
            .geometry()
            .integration_data(nodes, INTEGRATION_ORDER, Configuration::Current)?
        {
            let state = self.point_state(nodes, &point)?;
            let (gamma, reaction, source) = self.coefficients(&state)?;
            let speed = state.velocity.norm();
            let tau = 1.0
                / ((2.0 * speed / h).powi(2) + (4.0 * gamma / (h * h)).powi(2) + reaction * reaction).sqrt();

            // u·∇N_a
            let convection: Vec<f64> = (0..n)
                .map(|a| (0..3).map(|i| state.velocity[i] * point.gradients[(a, i)]).sum())
                .collect();

            for a in 0..n {
                let na = point.shape_values[a];
                let test = na + tau * convection[a];
                for b in 0..n {
                    let nb = point.shape_values[b];
                    let diffusion: f64 = (0..3)
                        .map(|i| point.gradients[(a, i)] * point.gradients[(b, i)])
                        .sum();
                    lhs[(a, b)] += (test * (convection[b] + reaction * nb) + gamma * diffusion) * point.weight;
                }
                rhs[a] += test * source * point.weight;
            }
        }
        Ok((lhs, rhs))
    }
}

impl Entity for EvmKElement {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        match self.geometry().kind() {
            GeometryKind::Tetrahedron4 => "EvmKElement3D4N",
            _ => "EvmKElement2D3N",
        }
    }

    fn dof_layout(&self) -> &DofLayout {
        &self.layout
    }

    fn calculate_local_system(&self, nodes: &[&Node], _process_info: &ProcessInfo) -> Result<LocalSystem> {
        let (lhs, source) = self.velocity_contribution(nodes)?;
        let k = self.values_vector(nodes, 0)?;
        let rhs = source - &lhs * k;
        Ok(LocalSystem { lhs, rhs })
    }

    fn calculate_damping_matrix(&self, nodes: &[&Node], _process_info: &ProcessInfo) -> Result<DMatrix<f64>> {
        Ok(self.velocity_contribution(nodes)?.0)
    }

    /// Consistent mass `∫ N_a N_b dΩ`
    fn calculate_mass_matrix(&self, nodes: &[&Node], _process_info: &ProcessInfo) -> Result<DMatrix<f64>> {
        let n = self.geometry().size();
        let mut m = DMatrix::zeros(n, n);
        for point in self
            .geometry()
            .integration_data(nodes, INTEGRATION_ORDER, Configuration::Current)?
        {
            m += &point.shape_values * point.shape_values.transpose() * point.weight;
        }
        Ok(m)
    }

    fn check(&self, nodes: &[&Node], _process_info: &ProcessInfo) -> Result<()> {
        check_entity_base(self, nodes)?;
        check_nodal_variables(nodes, &self.nodal_inputs())?;
        let properties = self.properties();
        properties.get_f64_above(variables::TURBULENT_KINETIC_ENERGY_SIGMA, 0.0)?;
        properties.get_f64(variables::TURBULENCE_RANS_C_MU)?;
        Ok(())
    }
}
