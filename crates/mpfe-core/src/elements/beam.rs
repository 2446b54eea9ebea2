//! Linear 3D Euler-Bernoulli beam (CrLinearBeamElement3D2N).
//!
//! Each node carries 6 DOFs (ux, uy, uz, θx, θy, θz). The local frame has
//! its x-axis from node 1 to node 2; the local stiffness combines axial,
//! torsional and two bending contributions and is rotated to the global
//! frame with `K = Tᵀ K_local T`. Section properties are read from the
//! element properties:
//!
//! - `CROSS_AREA`, `YOUNG_MODULUS`, `POISSON_RATIO`
//! - `I22` (bending in the local x-z plane), `I33` (bending in the local x-y plane)
//! - `TORSIONAL_INERTIA`, `DENSITY` (mass matrix only)

use super::{check_entity_base, Entity, EntityBase, EntityKind, LocalSystem};
use crate::dof::DofLayout;
use crate::error::{FemError, Result};
use crate::geometry::{Geometry, GeometryKind};
use crate::mesh::{Configuration, Node};
use crate::process_info::ProcessInfo;
use crate::properties::Properties;
use crate::quadrature::gauss_legendre;
use crate::variables;
use nalgebra::{DMatrix, DVector, Matrix3, SMatrix, Vector3};
use std::sync::Arc;

/// Number of points at which section forces are reported
pub const SECTION_POINTS: usize = 3;

/// Section data read from the properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamSection {
    pub area: f64,
    pub young: f64,
    pub shear: f64,
    pub i22: f64,
    pub i33: f64,
    pub torsion: f64,
}

impl BeamSection {
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let young = properties.get_f64_above(variables::YOUNG_MODULUS, f64::EPSILON)?;
        let poisson = properties.get_f64(variables::POISSON_RATIO)?;
        Ok(Self {
            area: properties.get_f64_above(variables::CROSS_AREA, f64::EPSILON)?,
            young,
            shear: young / (2.0 * (1.0 + poisson)),
            i22: properties.get_f64(variables::I22)?,
            i33: properties.get_f64(variables::I33)?,
            torsion: properties.get_f64(variables::TORSIONAL_INERTIA)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CrLinearBeamElement3D2N {
    base: EntityBase,
    layout: DofLayout,
}

impl CrLinearBeamElement3D2N {
    pub fn new(id: usize, geometry: Geometry, properties: Arc<Properties>) -> Result<Self> {
        Self::from_base(EntityBase::new(id, EntityKind::Element, geometry, properties)?)
    }

    pub(crate) fn from_base(base: EntityBase) -> Result<Self> {
        if base.geometry.kind() != GeometryKind::Line2 {
            return Err(FemError::Configuration(format!(
                "CrLinearBeamElement3D2N requires a Line2 geometry, got {}",
                base.geometry.kind().name()
            )));
        }
        Ok(Self {
            base,
            layout: beam_layout(),
        })
    }

    /// Element length in the initial configuration
    pub fn length(&self, nodes: &[&Node]) -> Result<f64> {
        self.geometry().characteristic_length(nodes, Configuration::Initial)
    }

    /// Rotation matrix whose rows are the local axes
    pub fn rotation_matrix(&self, nodes: &[&Node]) -> Result<Matrix3<f64>> {
        let length = self.length(nodes)?;
        let ex = (nodes[1].initial_position() - nodes[0].initial_position()) / length;
        let reference = if ex.x.abs() < 0.9 {
            Vector3::new(1.0, 0.0, 0.0)
        } else {
            Vector3::new(0.0, 1.0, 0.0)
        };
        let ez = ex.cross(&reference).normalize();
        let ey = ez.cross(&ex);
        Ok(Matrix3::from_rows(&[ex.transpose(), ey.transpose(), ez.transpose()]))
    }

    /// 12×12 block-diagonal transformation global → local
    pub fn transformation_matrix(&self, nodes: &[&Node]) -> Result<DMatrix<f64>> {
        let r = self.rotation_matrix(nodes)?;
        let mut t = DMatrix::zeros(12, 12);
        for block in 0..4 {
            let offset = 3 * block;
            t.view_mut((offset, offset), (3, 3)).copy_from(&r);
        }
        Ok(t)
    }

    /// Local stiffness matrix
    pub fn local_stiffness(&self, length: f64) -> Result<SMatrix<f64, 12, 12>> {
        let section = BeamSection::from_properties(self.properties())?;
        let (e, g, a, j, l) = (section.young, section.shear, section.area, section.torsion, length);
        let mut k = SMatrix::<f64, 12, 12>::zeros();

        let k_axial = e * a / l;
        k[(0, 0)] = k_axial;
        k[(0, 6)] = -k_axial;
        k[(6, 0)] = -k_axial;
        k[(6, 6)] = k_axial;

        let k_torsion = g * j / l;
        k[(3, 3)] = k_torsion;
        k[(3, 9)] = -k_torsion;
        k[(9, 3)] = -k_torsion;
        k[(9, 9)] = k_torsion;

        // Bending in the local x-y plane: v and θz (DOFs 1, 5, 7, 11)
        let ei = e * section.i33;
        let (k1, k2, k3, k4) = (12.0 * ei / l.powi(3), 6.0 * ei / l.powi(2), 4.0 * ei / l, 2.0 * ei / l);
        let xy = [1, 5, 7, 11];
        let block_xy = [
            [k1, k2, -k1, k2],
            [k2, k3, -k2, k4],
            [-k1, -k2, k1, -k2],
            [k2, k4, -k2, k3],
        ];

        // Bending in the local x-z plane: w and θy (DOFs 2, 4, 8, 10)
        let ei = e * section.i22;
        let (k1, k2, k3, k4) = (12.0 * ei / l.powi(3), 6.0 * ei / l.powi(2), 4.0 * ei / l, 2.0 * ei / l);
        let xz = [2, 4, 8, 10];
        let block_xz = [
            [k1, -k2, -k1, -k2],
            [-k2, k3, k2, k4],
            [-k1, k2, k1, k2],
            [-k2, k4, k2, k3],
        ];

        for r in 0..4 {
            for c in 0..4 {
                k[(xy[r], xy[c])] = block_xy[r][c];
                k[(xz[r], xz[c])] = block_xz[r][c];
            }
        }
        Ok(k)
    }

    fn global_stiffness(&self, nodes: &[&Node]) -> Result<DMatrix<f64>> {
        let length = self.length(nodes)?;
        let k_local = self.local_stiffness(length)?;
        let t = self.transformation_matrix(nodes)?;
        Ok(t.transpose() * DMatrix::from_column_slice(12, 12, k_local.as_slice()) * t)
    }

    /// End forces in the local frame, `K_local T u`
    pub fn local_end_forces(&self, nodes: &[&Node]) -> Result<DVector<f64>> {
        let length = self.length(nodes)?;
        let k_local = self.local_stiffness(length)?;
        let t = self.transformation_matrix(nodes)?;
        let u = self.values_vector(nodes, 0)?;
        Ok(DMatrix::from_column_slice(12, 12, k_local.as_slice()) * (t * u))
    }

    /// Local section forces `[N, Vy, Vz, Mx, My, Mz]` at the 3 Gauss points.
    ///
    /// Internal forces are linearly interpolated between the negated end
    /// forces of node 1 and the end forces of node 2.
    pub fn section_forces(&self, nodes: &[&Node]) -> Result<Vec<[f64; 6]>> {
        let f = self.local_end_forces(nodes)?;
        let points = gauss_legendre(SECTION_POINTS)?;
        Ok(points
            .iter()
            .map(|&(xi, _)| {
                let s = 0.5 * (1.0 + xi);
                let mut section = [0.0; 6];
                for (c, value) in section.iter_mut().enumerate() {
                    *value = (1.0 - s) * (-f[c]) + s * f[6 + c];
                }
                section
            })
            .collect())
    }
}

pub(crate) fn beam_layout() -> DofLayout {
    let mut vars = variables::DISPLACEMENT.to_vec();
    vars.extend_from_slice(&variables::ROTATION);
    DofLayout::Uniform(vars)
}

impl Entity for CrLinearBeamElement3D2N {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        "CrLinearBeamElement3D2N"
    }

    fn dof_layout(&self) -> &DofLayout {
        &self.layout
    }

    fn calculate_local_system(&self, nodes: &[&Node], _process_info: &ProcessInfo) -> Result<LocalSystem> {
        let lhs = self.global_stiffness(nodes)?;
        let u = self.values_vector(nodes, 0)?;
        let rhs = -(&lhs * u);
        Ok(LocalSystem { lhs, rhs })
    }

    /// Lumped mass: half the translational mass per node and the section
    /// rotary inertia `ρ L/2 (I22 + I33, I22, I33)` about the local axes
    fn calculate_mass_matrix(&self, nodes: &[&Node], _process_info: &ProcessInfo) -> Result<DMatrix<f64>> {
        let properties = self.properties();
        let density = properties.get_f64_above(variables::DENSITY, 0.0)?;
        let section = BeamSection::from_properties(properties)?;
        let length = self.length(nodes)?;
        let r = self.rotation_matrix(nodes)?;

        let half_mass = 0.5 * density * section.area * length;
        let local_rotary = Matrix3::from_diagonal(&Vector3::new(
            section.i22 + section.i33,
            section.i22,
            section.i33,
        )) * (0.5 * density * length);
        let rotary = r.transpose() * local_rotary * r;

        let mut m = DMatrix::zeros(12, 12);
        for node in 0..2 {
            let offset = 6 * node;
            for i in 0..3 {
                m[(offset + i, offset + i)] = half_mass;
            }
            m.view_mut((offset + 3, offset + 3), (3, 3)).copy_from(&rotary);
        }
        Ok(m)
    }

    fn check(&self, nodes: &[&Node], _process_info: &ProcessInfo) -> Result<()> {
        check_entity_base(self, nodes)?;
        BeamSection::from_properties(self.properties()).map(|_| ())
    }

    /// `FORCE` and `MOMENT`: local section vectors at the 3 Gauss points
    fn calculate_on_integration_points(
        &self,
        variable: &str,
        nodes: &[&Node],
        _process_info: &ProcessInfo,
    ) -> Result<Vec<DVector<f64>>> {
        let offset = match variable {
            variables::FORCE => 0,
            variables::MOMENT => 3,
            other => {
                return Err(FemError::UnsupportedOperation(format!(
                    "{} does not compute {} on integration points",
                    self.type_name(),
                    other
                )));
            }
        };
        Ok(self
            .section_forces(nodes)?
            .iter()
            .map(|s| DVector::from_column_slice(&s[offset..offset + 3]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use approx::assert_relative_eq;

    fn beam_properties() -> Arc<Properties> {
        Arc::new(
            Properties::new(1)
                .with("CROSS_AREA", 0.01)
                .with("YOUNG_MODULUS", 200e9)
                .with("POISSON_RATIO", 0.3)
                .with("I22", 2e-6)
                .with("I33", 1e-6)
                .with("TORSIONAL_INERTIA", 3e-6)
                .with("DENSITY", 7850.0),
        )
    }

    fn beam_mesh(end: [f64; 3]) -> Mesh {
        let mut mesh = Mesh::new();
        mesh.create_node(1, 0.0, 0.0, 0.0);
        mesh.create_node(2, end[0], end[1], end[2]);
        mesh.add_variables_with_dofs(&variables::DISPLACEMENT);
        mesh.add_variables_with_dofs(&variables::ROTATION);
        mesh
    }

    fn beam() -> CrLinearBeamElement3D2N {
        let geometry = Geometry::new(GeometryKind::Line2, vec![1, 2]).unwrap();
        CrLinearBeamElement3D2N::new(1, geometry, beam_properties()).unwrap()
    }

    #[test]
    fn test_axial_stiffness() {
        let mesh = beam_mesh([2.0, 0.0, 0.0]);
        let nodes = mesh.resolve(&[1, 2]).unwrap();
        let k = beam().calculate_left_hand_side(&nodes, &ProcessInfo::default()).unwrap();
        let expected = 200e9 * 0.01 / 2.0;
        assert_relative_eq!(k[(0, 0)], expected, max_relative = 1e-12);
        assert_relative_eq!(k[(0, 6)], -expected, max_relative = 1e-12);
    }

    #[test]
    fn test_cantilever_tip_deflection() {
        // K u = f restricted to the free end recovers P L³ / (3 E I)
        let mesh = beam_mesh([1.0, 0.0, 0.0]);
        let nodes = mesh.resolve(&[1, 2]).unwrap();
        let k = beam().calculate_left_hand_side(&nodes, &ProcessInfo::default()).unwrap();
        let free = k.view((6, 6), (6, 6)).into_owned();
        let mut f = DVector::zeros(6);
        f[1] = 1000.0;
        let u = free.lu().solve(&f).unwrap();
        assert_relative_eq!(u[1], 1000.0 / (3.0 * 200e9 * 1e-6), max_relative = 1e-9);
    }

    #[test]
    fn test_rotated_stiffness_is_symmetric_and_rigid() {
        let mesh = beam_mesh([1.0, 2.0, 3.0]);
        let nodes = mesh.resolve(&[1, 2]).unwrap();
        let k = beam().calculate_left_hand_side(&nodes, &ProcessInfo::default()).unwrap();
        assert_relative_eq!(k, k.transpose(), epsilon = 1e-3);

        let mut translation = DVector::zeros(12);
        for node in 0..2 {
            translation[6 * node] = 1.0;
            translation[6 * node + 1] = -2.0;
            translation[6 * node + 2] = 0.5;
        }
        assert!((&k * translation).norm() < 1e-3);
    }

    #[test]
    fn test_section_forces_of_axial_stretch() {
        let mut mesh = beam_mesh([1.0, 0.0, 0.0]);
        mesh.node_mut(2).unwrap().set_solution_step_value("DISPLACEMENT_X", 1e-4);
        let nodes = mesh.resolve(&[1, 2]).unwrap();
        let element = beam();

        let forces = element
            .calculate_on_integration_points("FORCE", &nodes, &ProcessInfo::default())
            .unwrap();
        assert_eq!(forces.len(), 3);
        for force in &forces {
            assert_relative_eq!(force[0], 200e9 * 0.01 * 1e-4, max_relative = 1e-12);
            assert!(force[1].abs() < 1e-6);
        }

        let system = element.calculate_local_system(&nodes, &ProcessInfo::default()).unwrap();
        assert_relative_eq!(system.rhs[6], -200e9 * 0.01 * 1e-4, max_relative = 1e-12);
        assert!(element
            .calculate_on_integration_points("STRESS_ON_GP", &nodes, &ProcessInfo::default())
            .is_err());
    }

    #[test]
    fn test_lumped_mass() {
        let mesh = beam_mesh([0.0, 0.0, 2.0]);
        let nodes = mesh.resolve(&[1, 2]).unwrap();
        let m = beam().calculate_mass_matrix(&nodes, &ProcessInfo::default()).unwrap();
        let total: f64 = [0, 6].iter().map(|&i| m[(i, i)]).sum();
        assert_relative_eq!(total, 7850.0 * 0.01 * 2.0, max_relative = 1e-12);
        assert_relative_eq!(m, m.transpose(), epsilon = 1e-12);
    }

    #[test]
    fn test_check_requires_section() {
        let mesh = beam_mesh([1.0, 0.0, 0.0]);
        let nodes = mesh.resolve(&[1, 2]).unwrap();
        let geometry = Geometry::new(GeometryKind::Line2, vec![1, 2]).unwrap();
        let props = Arc::new(Properties::new(4).with("YOUNG_MODULUS", 1.0));
        let element = CrLinearBeamElement3D2N::new(1, geometry, props).unwrap();
        assert!(matches!(
            element.check(&nodes, &ProcessInfo::default()),
            Err(FemError::MissingProperty { properties_id: 4, .. })
        ));
        assert!(beam().check(&nodes, &ProcessInfo::default()).is_ok());
    }
}
