//! Geometry families: shape functions, Jacobians and measures.
//!
//! Supported families:
//! - Line2: 2-node line, ξ ∈ [-1, 1]
//! - Triangle3: 3-node triangle on the unit simplex
//! - Quadrilateral4: 4-node bilinear quad, (ξ, η) ∈ [-1, 1]²
//! - Tetrahedron4: 4-node linear tetrahedron on the unit simplex
//! - Hexahedron8: 8-node trilinear brick, (ξ, η, ζ) ∈ [-1, 1]³
//!
//! Node coordinates always live in 3D. For lines and surfaces the Jacobian
//! is 3×1 or 3×2 and its "determinant" is the manifold measure (length of
//! the tangent, area of the tangent parallelogram). Global gradients are
//! computed with the pseudo-inverse `J (JᵀJ)⁻¹`, which reduces to `J⁻ᵀ`
//! for solid cells.
//!
//! Solid cells and surfaces lying in the x-y plane use the signed
//! determinant, so inverted cells are rejected. Zero thresholds are relative
//! to the extent of the nodes.

use crate::error::{FemError, Result};
use crate::mesh::{Configuration, Node};
use crate::quadrature::{self, IntegrationPoint, ReferenceDomain};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

/// Measures below this fraction of `extent^dim` are treated as zero
const RELATIVE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Line2,
    Triangle3,
    Quadrilateral4,
    Tetrahedron4,
    Hexahedron8,
}

impl GeometryKind {
    pub fn num_nodes(&self) -> usize {
        match self {
            GeometryKind::Line2 => 2,
            GeometryKind::Triangle3 => 3,
            GeometryKind::Quadrilateral4 | GeometryKind::Tetrahedron4 => 4,
            GeometryKind::Hexahedron8 => 8,
        }
    }

    pub fn domain(&self) -> ReferenceDomain {
        match self {
            GeometryKind::Line2 => ReferenceDomain::Line,
            GeometryKind::Triangle3 => ReferenceDomain::Triangle,
            GeometryKind::Quadrilateral4 => ReferenceDomain::Quadrilateral,
            GeometryKind::Tetrahedron4 => ReferenceDomain::Tetrahedron,
            GeometryKind::Hexahedron8 => ReferenceDomain::Hexahedron,
        }
    }

    pub fn local_dimension(&self) -> usize {
        self.domain().dimension()
    }

    /// Order integrating the mass-type terms of the family exactly
    pub fn default_integration_order(&self) -> usize {
        match self {
            GeometryKind::Line2 | GeometryKind::Quadrilateral4 | GeometryKind::Hexahedron8 => 2,
            GeometryKind::Triangle3 | GeometryKind::Tetrahedron4 => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GeometryKind::Line2 => "Line2",
            GeometryKind::Triangle3 => "Triangle3",
            GeometryKind::Quadrilateral4 => "Quadrilateral4",
            GeometryKind::Tetrahedron4 => "Tetrahedron4",
            GeometryKind::Hexahedron8 => "Hexahedron8",
        }
    }

    /// Shape function values at a local point
    pub fn shape_values(&self, local: &[f64; 3]) -> DVector<f64> {
        let [xi, eta, zeta] = *local;
        match self {
            GeometryKind::Line2 => DVector::from_vec(vec![0.5 * (1.0 - xi), 0.5 * (1.0 + xi)]),
            GeometryKind::Triangle3 => DVector::from_vec(vec![1.0 - xi - eta, xi, eta]),
            GeometryKind::Quadrilateral4 => DVector::from_vec(vec![
                0.25 * (1.0 - xi) * (1.0 - eta),
                0.25 * (1.0 + xi) * (1.0 - eta),
                0.25 * (1.0 + xi) * (1.0 + eta),
                0.25 * (1.0 - xi) * (1.0 + eta),
            ]),
            GeometryKind::Tetrahedron4 => {
                DVector::from_vec(vec![1.0 - xi - eta - zeta, xi, eta, zeta])
            }
            GeometryKind::Hexahedron8 => DVector::from_iterator(
                8,
                HEX_CORNERS
                    .iter()
                    .map(|c| (1.0 + c[0] * xi) * (1.0 + c[1] * eta) * (1.0 + c[2] * zeta) / 8.0),
            ),
        }
    }

    /// Local derivatives dN/dξ (rows: nodes, columns: local directions)
    pub fn local_gradients(&self, local: &[f64; 3]) -> DMatrix<f64> {
        let [xi, eta, zeta] = *local;
        match self {
            GeometryKind::Line2 => DMatrix::from_row_slice(2, 1, &[-0.5, 0.5]),
            GeometryKind::Triangle3 => {
                DMatrix::from_row_slice(3, 2, &[-1.0, -1.0, 1.0, 0.0, 0.0, 1.0])
            }
            GeometryKind::Quadrilateral4 => DMatrix::from_row_slice(
                4,
                2,
                &[
                    -0.25 * (1.0 - eta),
                    -0.25 * (1.0 - xi),
                    0.25 * (1.0 - eta),
                    -0.25 * (1.0 + xi),
                    0.25 * (1.0 + eta),
                    0.25 * (1.0 + xi),
                    -0.25 * (1.0 + eta),
                    0.25 * (1.0 - xi),
                ],
            ),
            GeometryKind::Tetrahedron4 => DMatrix::from_row_slice(
                4,
                3,
                &[
                    -1.0, -1.0, -1.0, //
                    1.0, 0.0, 0.0, //
                    0.0, 1.0, 0.0, //
                    0.0, 0.0, 1.0,
                ],
            ),
            GeometryKind::Hexahedron8 => {
                let mut d = DMatrix::zeros(8, 3);
                for (a, c) in HEX_CORNERS.iter().enumerate() {
                    d[(a, 0)] = c[0] * (1.0 + c[1] * eta) * (1.0 + c[2] * zeta) / 8.0;
                    d[(a, 1)] = c[1] * (1.0 + c[0] * xi) * (1.0 + c[2] * zeta) / 8.0;
                    d[(a, 2)] = c[2] * (1.0 + c[0] * xi) * (1.0 + c[1] * eta) / 8.0;
                }
                d
            }
        }
    }

    /// Local coordinates of the nodes
    pub fn node_local_coordinates(&self) -> Vec<[f64; 3]> {
        match self {
            GeometryKind::Line2 => vec![[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            GeometryKind::Triangle3 => vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            GeometryKind::Quadrilateral4 => vec![
                [-1.0, -1.0, 0.0],
                [1.0, -1.0, 0.0],
                [1.0, 1.0, 0.0],
                [-1.0, 1.0, 0.0],
            ],
            GeometryKind::Tetrahedron4 => vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            GeometryKind::Hexahedron8 => HEX_CORNERS.to_vec(),
        }
    }
}

/// Corner signs of the trilinear brick (bottom face first, counter-clockwise)
const HEX_CORNERS: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

/// Shape data at one integration point
#[derive(Debug, Clone)]
pub struct PointData {
    pub point: IntegrationPoint,
    /// Jacobian determinant (or manifold measure)
    pub det_j: f64,
    /// Quadrature weight times `det_j`
    pub weight: f64,
    pub shape_values: DVector<f64>,
    /// Global gradients dN/dx (rows: nodes, columns: x, y, z)
    pub gradients: DMatrix<f64>,
}

/// Geometry of an entity: a family and its ordered node ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    kind: GeometryKind,
    node_ids: Vec<usize>,
}

impl Geometry {
    pub fn new(kind: GeometryKind, node_ids: Vec<usize>) -> Result<Self> {
        if node_ids.len() != kind.num_nodes() {
            return Err(FemError::Validation(format!(
                "{} geometry requires {} nodes, got {}",
                kind.name(),
                kind.num_nodes(),
                node_ids.len()
            )));
        }
        Ok(Self { kind, node_ids })
    }

    /// New geometry of the same family on other nodes
    pub fn create(&self, node_ids: Vec<usize>) -> Result<Self> {
        Self::new(self.kind, node_ids)
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    pub fn node_ids(&self) -> &[usize] {
        &self.node_ids
    }

    pub fn size(&self) -> usize {
        self.node_ids.len()
    }

    pub fn working_space_dimension(&self) -> usize {
        3
    }

    pub fn local_dimension(&self) -> usize {
        self.kind.local_dimension()
    }

    fn check_nodes(&self, nodes: &[&Node]) -> Result<()> {
        if nodes.len() != self.node_ids.len() {
            return Err(FemError::Validation(format!(
                "{} geometry expects {} nodes, received {}",
                self.kind.name(),
                self.node_ids.len(),
                nodes.len()
            )));
        }
        Ok(())
    }

    /// Jacobian dx/dξ (3 × local dimension)
    pub fn jacobian(
        &self,
        nodes: &[&Node],
        local: &[f64; 3],
        configuration: Configuration,
    ) -> Result<DMatrix<f64>> {
        self.check_nodes(nodes)?;
        let dn = self.kind.local_gradients(local);
        let mut j = DMatrix::zeros(3, self.local_dimension());
        for (a, node) in nodes.iter().enumerate() {
            let x = node.coordinates(configuration);
            for k in 0..self.local_dimension() {
                for i in 0..3 {
                    j[(i, k)] += x[i] * dn[(a, k)];
                }
            }
        }
        Ok(j)
    }

    /// Shape data at every integration point of the given order
    pub fn integration_data(
        &self,
        nodes: &[&Node],
        order: usize,
        configuration: Configuration,
    ) -> Result<Vec<PointData>> {
        let points = quadrature::integration_points(self.kind.domain(), order)?;
        points
            .into_iter()
            .map(|point| self.point_data(nodes, point, configuration))
            .collect()
    }

    /// Shape data at a single integration point
    pub fn point_data(
        &self,
        nodes: &[&Node],
        point: IntegrationPoint,
        configuration: Configuration,
    ) -> Result<PointData> {
        let j = self.jacobian(nodes, &point.coordinates, configuration)?;
        let extent = node_extent(nodes, configuration);
        let tolerance = RELATIVE_TOLERANCE * extent.powi(self.local_dimension() as i32);

        let det_j = match self.local_dimension() {
            3 => signed_determinant(&j, tolerance)?,
            2 if j.row(2).amax() <= RELATIVE_TOLERANCE * extent => signed_determinant(&j, tolerance)?,
            _ => {
                let measure = jacobian_determinant(&j);
                if measure <= tolerance {
                    return Err(FemError::DegenerateGeometry(format!(
                        "{} has zero measure (|J| = {:e})",
                        self.kind.name(),
                        measure
                    )));
                }
                measure
            }
        };

        let jtj = j.transpose() * &j;
        let jtj_inv = jtj.try_inverse().ok_or_else(|| {
            FemError::DegenerateGeometry(format!("{} metric is singular", self.kind.name()))
        })?;
        let dn_de = self.kind.local_gradients(&point.coordinates);
        let gradients = dn_de * jtj_inv * j.transpose();

        Ok(PointData {
            point,
            det_j,
            weight: point.weight * det_j,
            shape_values: self.kind.shape_values(&point.coordinates),
            gradients,
        })
    }

    /// Length, area or volume
    pub fn domain_size(&self, nodes: &[&Node], configuration: Configuration) -> Result<f64> {
        let data = self.integration_data(nodes, self.kind.default_integration_order(), configuration)?;
        Ok(data.iter().map(|d| d.weight).sum())
    }

    /// Distance between the first and last node (lines) or domain_size^(1/d)
    pub fn characteristic_length(
        &self,
        nodes: &[&Node],
        configuration: Configuration,
    ) -> Result<f64> {
        match self.kind {
            GeometryKind::Line2 => {
                self.check_nodes(nodes)?;
                let length = (nodes[1].coordinates(configuration)
                    - nodes[0].coordinates(configuration))
                .norm();
                if length <= 0.0 {
                    return Err(FemError::DegenerateGeometry("zero length line".to_string()));
                }
                Ok(length)
            }
            _ => {
                let size = self.domain_size(nodes, configuration)?;
                Ok(size.powf(1.0 / self.local_dimension() as f64))
            }
        }
    }

    /// Unit outward normal of a 2D line (x-y plane), scaled by its length
    pub fn area_normal_2d(&self, nodes: &[&Node], configuration: Configuration) -> Result<Vector3<f64>> {
        if self.kind != GeometryKind::Line2 {
            return Err(FemError::UnsupportedOperation(format!(
                "area normal is only defined for Line2, not {}",
                self.kind.name()
            )));
        }
        self.check_nodes(nodes)?;
        let p0 = nodes[0].coordinates(configuration);
        let p1 = nodes[1].coordinates(configuration);
        Ok(Vector3::new(p1.y - p0.y, -(p1.x - p0.x), 0.0))
    }
}

/// Diagonal of the bounding box of the nodes
fn node_extent(nodes: &[&Node], configuration: Configuration) -> f64 {
    let mut lower = Vector3::repeat(f64::INFINITY);
    let mut upper = Vector3::repeat(f64::NEG_INFINITY);
    for node in nodes {
        let x = node.coordinates(configuration);
        lower = lower.inf(&x);
        upper = upper.sup(&x);
    }
    if nodes.is_empty() {
        return 0.0;
    }
    (upper - lower).norm()
}

/// Signed determinant of a solid Jacobian, or of the x-y block of a planar one
fn signed_determinant(j: &DMatrix<f64>, tolerance: f64) -> Result<f64> {
    let det_j = if j.ncols() == 2 {
        j[(0, 0)] * j[(1, 1)] - j[(0, 1)] * j[(1, 0)]
    } else {
        jacobian_determinant(j)
    };
    if det_j <= tolerance {
        return Err(FemError::NonPositiveJacobian { determinant: det_j });
    }
    Ok(det_j)
}

/// Determinant (square) or manifold measure (rectangular) of a Jacobian
pub fn jacobian_determinant(j: &DMatrix<f64>) -> f64 {
    match j.ncols() {
        1 => j.column(0).norm(),
        2 => {
            let a = Vector3::new(j[(0, 0)], j[(1, 0)], j[(2, 0)]);
            let b = Vector3::new(j[(0, 1)], j[(1, 1)], j[(2, 1)]);
            a.cross(&b).norm()
        }
        _ => {
            let m = Matrix3::from_iterator(j.iter().copied());
            m.determinant()
        }
    }
}
