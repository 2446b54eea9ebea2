//! Total Lagrangian finite strain solid.
//!
//! Kinematics are referred to the initial configuration:
//! `F = I + ∇₀u`, `E = ½(FᵀF - I)`. The law returns PK2 stress `S` and the
//! material tangent, and the element assembles
//!
//! - material stiffness `Bᵀ D B`
//! - geometric stiffness `∇₀N_a · S ∇₀N_b` on the diagonal 3×3 blocks
//! - residual `∫ Nᵀ ρ₀ g dV₀ - ∫ Bᵀ S dV₀`

use super::solid::{
    add_body_force, body_force, check_solid_geometry, check_solid_law, consistent_mass_matrix,
    integration_point_law_values, to_dmatrix, voigt_dvector,
};
use super::{check_entity_base, Entity, EntityBase, EntityKind, LocalSystem};
use crate::constitutive::{
    voigt::stress_vector_to_tensor, ConstitutiveParameters, IntegrationPointStates, StrainMeasure,
    StressMeasure,
};
use crate::dof::DofLayout;
use crate::error::Result;
use crate::geometry::{Geometry, GeometryKind, PointData};
use crate::mesh::{Configuration, Node};
use crate::process_info::ProcessInfo;
use crate::properties::Properties;
use crate::variables;
use nalgebra::{DMatrix, DVector, Matrix3};
use std::sync::Arc;

/// TotalLagrangianElement3D4N / TotalLagrangianElement3D8N
#[derive(Debug, Clone)]
pub struct TotalLagrangianElement {
    base: EntityBase,
    layout: DofLayout,
    states: IntegrationPointStates,
}

impl TotalLagrangianElement {
    pub fn new(id: usize, geometry: Geometry, properties: Arc<Properties>) -> Result<Self> {
        Self::from_base(EntityBase::new(id, EntityKind::Element, geometry, properties)?)
    }

    pub(crate) fn from_base(base: EntityBase) -> Result<Self> {
        check_solid_geometry(&base.geometry)?;
        Ok(Self {
            base,
            layout: DofLayout::uniform(&variables::DISPLACEMENT),
            states: IntegrationPointStates::default(),
        })
    }

    fn integration_data(&self, nodes: &[&Node]) -> Result<Vec<PointData>> {
        let geometry = self.geometry();
        geometry.integration_data(nodes, geometry.kind().default_integration_order(), Configuration::Initial)
    }
}

/// `F_ij = δ_ij + Σ_a u_a,i ∂N_a/∂X_j`
pub fn deformation_gradient(gradients: &DMatrix<f64>, displacements: &DVector<f64>) -> Matrix3<f64> {
    let mut f = Matrix3::identity();
    for a in 0..gradients.nrows() {
        for i in 0..3 {
            for j in 0..3 {
                f[(i, j)] += displacements[3 * a + i] * gradients[(a, j)];
            }
        }
    }
    f
}

/// Green-Lagrange B matrix (6 × 3n, engineering shear)
pub fn nonlinear_strain_matrix(gradients: &DMatrix<f64>, f: &Matrix3<f64>) -> DMatrix<f64> {
    let n = gradients.nrows();
    let mut b = DMatrix::zeros(6, 3 * n);
    for a in 0..n {
        let d = [gradients[(a, 0)], gradients[(a, 1)], gradients[(a, 2)]];
        for k in 0..3 {
            let c = 3 * a + k;
            b[(0, c)] = f[(k, 0)] * d[0];
            b[(1, c)] = f[(k, 1)] * d[1];
            b[(2, c)] = f[(k, 2)] * d[2];
            b[(3, c)] = f[(k, 0)] * d[1] + f[(k, 1)] * d[0];
            b[(4, c)] = f[(k, 1)] * d[2] + f[(k, 2)] * d[1];
            b[(5, c)] = f[(k, 0)] * d[2] + f[(k, 2)] * d[0];
        }
    }
    b
}

impl Entity for TotalLagrangianElement {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        match self.geometry().kind() {
            GeometryKind::Hexahedron8 => "TotalLagrangianElement3D8N",
            _ => "TotalLagrangianElement3D4N",
        }
    }

    fn dof_layout(&self) -> &DofLayout {
        &self.layout
    }

    fn initialize(&mut self, nodes: &[&Node], _process_info: &ProcessInfo) -> Result<()> {
        let shape_values: Vec<DVector<f64>> = self
            .integration_data(nodes)?
            .into_iter()
            .map(|p| p.shape_values)
            .collect();
        let properties = self.base.properties.clone();
        let law = properties.require_law()?;
        self.states
            .initialize(law.as_ref(), &properties, &self.base.geometry, &shape_values)
    }

    fn calculate_local_system(&self, nodes: &[&Node], _process_info: &ProcessInfo) -> Result<LocalSystem> {
        let properties = self.properties().as_ref();
        let law = properties.require_law()?;
        let n_nodes = self.geometry().size();
        let displacements = self.values_vector(nodes, 0)?;
        let body = body_force(properties)?;
        let mut system = LocalSystem::zeros(self.local_size());

        for (g, point) in self.integration_data(nodes)?.iter().enumerate() {
            let f = deformation_gradient(&point.gradients, &displacements);
            let mut parameters = ConstitutiveParameters::new(properties).with_deformation_gradient(f);
            law.calculate_material_response(StressMeasure::PK2, &mut parameters, self.states.get(g)?)?;

            let b = nonlinear_strain_matrix(&point.gradients, &f);
            let bt = b.transpose();
            system.lhs += &bt * to_dmatrix(&parameters.constitutive_matrix) * &b * point.weight;

            let s = stress_vector_to_tensor(&parameters.stress);
            for a in 0..n_nodes {
                for c in 0..n_nodes {
                    let mut kg = 0.0;
                    for i in 0..3 {
                        for j in 0..3 {
                            kg += point.gradients[(a, i)] * s[(i, j)] * point.gradients[(c, j)];
                        }
                    }
                    for k in 0..3 {
                        system.lhs[(3 * a + k, 3 * c + k)] += kg * point.weight;
                    }
                }
            }

            system.rhs -= &bt * voigt_dvector(&parameters.stress) * point.weight;
            if let Some((density, gravity)) = body {
                add_body_force(&mut system.rhs, &point.shape_values, density, &gravity, point.weight);
            }
        }
        Ok(system)
    }

    fn calculate_mass_matrix(&self, nodes: &[&Node], _process_info: &ProcessInfo) -> Result<DMatrix<f64>> {
        let density = self.properties().get_f64_above(variables::DENSITY, 0.0)?;
        consistent_mass_matrix(self.geometry(), nodes, density, Configuration::Initial)
    }

    fn finalize_solution_step(&mut self, nodes: &[&Node], _process_info: &ProcessInfo) -> Result<()> {
        let properties = self.base.properties.clone();
        let law = properties.require_law()?;
        let displacements = self.values_vector(nodes, 0)?;
        for (g, point) in self.integration_data(nodes)?.iter().enumerate() {
            let f = deformation_gradient(&point.gradients, &displacements);
            let mut parameters = ConstitutiveParameters::new(&properties).with_deformation_gradient(f);
            law.finalize_material_response(StressMeasure::PK2, &mut parameters, self.states.get_mut(g)?)?;
        }
        Ok(())
    }

    fn check(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()> {
        check_entity_base(self, nodes)?;
        check_solid_law(self, StrainMeasure::GreenLagrange, process_info)?;
        body_force(self.properties()).map(|_| ())
    }

    fn calculate_on_integration_points(
        &self,
        variable: &str,
        nodes: &[&Node],
        _process_info: &ProcessInfo,
    ) -> Result<Vec<DVector<f64>>> {
        integration_point_law_values(self, &self.states, variable, self.integration_data(nodes)?.len())
    }
}
