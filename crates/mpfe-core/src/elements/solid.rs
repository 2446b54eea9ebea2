//! Small displacement solid elements (linear tetrahedron and trilinear brick).
//!
//! Integration loop per point:
//! - strain `ε = B u` from the current displacements
//! - Cauchy response of the law at the committed integration point state
//! - `K += Bᵀ D B w`, `f += Nᵀ ρ g w - Bᵀ σ w`
//!
//! The body force term is only assembled when the properties carry
//! `VOLUME_ACCELERATION`.

use super::{check_entity_base, Entity, EntityBase, EntityKind, LocalSystem};
use crate::constitutive::{
    ConstitutiveLaw, ConstitutiveParameters, IntegrationPointStates, StrainMeasure, StressMeasure,
};
use crate::dof::DofLayout;
use crate::error::{FemError, Result};
use crate::geometry::{Geometry, GeometryKind, PointData};
use crate::mesh::{Configuration, Node};
use crate::process_info::ProcessInfo;
use crate::properties::Properties;
use crate::values::Value;
use crate::variables;
use nalgebra::{DMatrix, DVector, Vector3};
use std::sync::Arc;

/// SmallDisplacementElement3D4N / SmallDisplacementElement3D8N
#[derive(Debug, Clone)]
pub struct SmallDisplacementElement {
    base: EntityBase,
    layout: DofLayout,
    states: IntegrationPointStates,
}

impl SmallDisplacementElement {
    pub fn new(id: usize, geometry: Geometry, properties: Arc<Properties>) -> Result<Self> {
        check_solid_geometry(&geometry)?;
        Ok(Self {
            base: EntityBase::new(id, EntityKind::Element, geometry, properties)?,
            layout: DofLayout::uniform(&variables::DISPLACEMENT),
            states: IntegrationPointStates::default(),
        })
    }

    pub(crate) fn from_base(base: EntityBase) -> Result<Self> {
        check_solid_geometry(&base.geometry)?;
        Ok(Self {
            base,
            layout: DofLayout::uniform(&variables::DISPLACEMENT),
            states: IntegrationPointStates::default(),
        })
    }

    pub fn integration_states(&self) -> &IntegrationPointStates {
        &self.states
    }

    fn integration_data(&self, nodes: &[&Node]) -> Result<Vec<PointData>> {
        let geometry = self.geometry();
        geometry.integration_data(nodes, geometry.kind().default_integration_order(), Configuration::Initial)
    }

    /// Run `f(point, law response)` for every integration point, in table order
    fn for_each_point<F>(&self, nodes: &[&Node], mut f: F) -> Result<()>
    where
        F: FnMut(usize, &PointData, &DMatrix<f64>, &ConstitutiveParameters<'_>) -> Result<()>,
    {
        let properties = self.properties().as_ref();
        let law = properties.require_law()?;
        let displacements = self.values_vector(nodes, 0)?;

        for (g, point) in self.integration_data(nodes)?.iter().enumerate() {
            let b = strain_displacement_matrix(&point.gradients);
            let strain = &b * &displacements;
            let mut parameters = ConstitutiveParameters::new(properties).with_strain(voigt_vector(&strain));
            law.calculate_material_response(StressMeasure::Cauchy, &mut parameters, self.states.get(g)?)?;
            f(g, point, &b, &parameters)?;
        }
        Ok(())
    }
}

impl Entity for SmallDisplacementElement {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        match self.geometry().kind() {
            GeometryKind::Hexahedron8 => "SmallDisplacementElement3D8N",
            _ => "SmallDisplacementElement3D4N",
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
        let n = self.local_size();
        let mut system = LocalSystem::zeros(n);
        let body_force = body_force(self.properties())?;

        self.for_each_point(nodes, |_, point, b, parameters| {
            let bt = b.transpose();
            system.lhs += &bt * to_dmatrix(&parameters.constitutive_matrix) * b * point.weight;
            system.rhs -= &bt * voigt_dvector(&parameters.stress) * point.weight;
            if let Some((density, g)) = body_force {
                add_body_force(&mut system.rhs, &point.shape_values, density, &g, point.weight);
            }
            Ok(())
        })?;
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
            let strain = strain_displacement_matrix(&point.gradients) * &displacements;
            let mut parameters = ConstitutiveParameters::new(&properties).with_strain(voigt_vector(&strain));
            law.finalize_material_response(StressMeasure::Cauchy, &mut parameters, self.states.get_mut(g)?)?;
        }
        Ok(())
    }

    fn check(&self, nodes: &[&Node], process_info: &ProcessInfo) -> Result<()> {
        check_entity_base(self, nodes)?;
        check_solid_law(self, StrainMeasure::Infinitesimal, process_info)?;
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

pub(crate) fn check_solid_geometry(geometry: &Geometry) -> Result<()> {
    match geometry.kind() {
        GeometryKind::Tetrahedron4 | GeometryKind::Hexahedron8 => Ok(()),
        other => Err(FemError::Configuration(format!(
            "solid elements require a Tetrahedron4 or Hexahedron8 geometry, got {}",
            other.name()
        ))),
    }
}

/// Law presence, features and material parameters of a solid
pub(crate) fn check_solid_law<E: Entity + ?Sized>(
    entity: &E,
    measure: StrainMeasure,
    process_info: &ProcessInfo,
) -> Result<()> {
    let properties = entity.properties();
    let law = properties.require_law()?;
    law.features().require(law.name(), measure, 6, entity.geometry().working_space_dimension())?;
    law.check(properties, entity.geometry(), process_info)
}

/// Small strain B matrix (6 × 3n, engineering shear) from global gradients
pub fn strain_displacement_matrix(gradients: &DMatrix<f64>) -> DMatrix<f64> {
    let n = gradients.nrows();
    let mut b = DMatrix::zeros(6, 3 * n);
    for a in 0..n {
        let (dx, dy, dz) = (gradients[(a, 0)], gradients[(a, 1)], gradients[(a, 2)]);
        let c = 3 * a;
        b[(0, c)] = dx;
        b[(1, c + 1)] = dy;
        b[(2, c + 2)] = dz;
        b[(3, c)] = dy;
        b[(3, c + 1)] = dx;
        b[(4, c + 1)] = dz;
        b[(4, c + 2)] = dy;
        b[(5, c)] = dz;
        b[(5, c + 2)] = dx;
    }
    b
}

/// Density and gravity when the properties define a volume acceleration
pub(crate) fn body_force(properties: &Properties) -> Result<Option<(f64, Vector3<f64>)>> {
    if !properties.has(variables::VOLUME_ACCELERATION) {
        return Ok(None);
    }
    let g = properties.get_vector3(variables::VOLUME_ACCELERATION)?;
    let density = properties.get_f64(variables::DENSITY)?;
    Ok(Some((density, g)))
}

pub(crate) fn add_body_force(
    rhs: &mut DVector<f64>,
    shape_values: &DVector<f64>,
    density: f64,
    g: &Vector3<f64>,
    weight: f64,
) {
    for (a, na) in shape_values.iter().enumerate() {
        for i in 0..3 {
            rhs[3 * a + i] += na * density * g[i] * weight;
        }
    }
}

/// Consistent mass `ρ ∫ N_a N_b dV` on each displacement component
pub(crate) fn consistent_mass_matrix(
    geometry: &Geometry,
    nodes: &[&Node],
    density: f64,
    configuration: Configuration,
) -> Result<DMatrix<f64>> {
    let n = geometry.size();
    let mut m = DMatrix::zeros(3 * n, 3 * n);
    // Order 2 integrates N_a N_b exactly on the linear families
    for point in geometry.integration_data(nodes, 2, configuration)? {
        for a in 0..n {
            for b in 0..n {
                let mab = density * point.shape_values[a] * point.shape_values[b] * point.weight;
                for i in 0..3 {
                    m[(3 * a + i, 3 * b + i)] += mab;
                }
            }
        }
    }
    Ok(m)
}

/// Values the law exposes through `get_value`, one vector per point
pub(crate) fn integration_point_law_values<E: Entity + ?Sized>(
    entity: &E,
    states: &IntegrationPointStates,
    variable: &str,
    num_points: usize,
) -> Result<Vec<DVector<f64>>> {
    let law: &Arc<dyn ConstitutiveLaw> = entity.properties().require_law()?;
    if !law.has(variable) {
        return Err(FemError::UnsupportedOperation(format!(
            "{} does not provide {}",
            law.name(),
            variable
        )));
    }
    (0..num_points)
        .map(|g| {
            let value = law.get_value(variable, states.get(g)?);
            match value {
                Some(Value::Double(v)) => Ok(DVector::from_element(1, v)),
                Some(Value::Vector(v)) => Ok(v),
                _ => Err(FemError::UnsupportedOperation(format!(
                    "{} is not a scalar or vector quantity",
                    variable
                ))),
            }
        })
        .collect()
}

pub(crate) fn voigt_vector(v: &DVector<f64>) -> nalgebra::Vector6<f64> {
    nalgebra::Vector6::from_iterator(v.iter().copied())
}

pub(crate) fn voigt_dvector(v: &nalgebra::Vector6<f64>) -> DVector<f64> {
    DVector::from_column_slice(v.as_slice())
}

pub(crate) fn to_dmatrix(m: &nalgebra::Matrix6<f64>) -> DMatrix<f64> {
    DMatrix::from_column_slice(6, 6, m.as_slice())
}
