//! Quadrature tables for the reference domains.
//!
//! Line rules are Gauss-Legendre of orders 1..=10 on [-1, 1] (order n has n
//! points and integrates polynomials of degree 2n-1 exactly). Quadrilateral
//! and hexahedron rules are tensor products of the line rule with the first
//! local coordinate varying fastest. Triangles and tetrahedra use their own
//! tables on the unit simplex.
//!
//! For every table the weights sum to the measure of the reference domain.

use crate::error::{FemError, Result};

/// Highest available Gauss-Legendre order on the line
pub const MAX_LINE_ORDER: usize = 10;

/// Highest available order on triangles and tetrahedra
pub const MAX_SIMPLEX_ORDER: usize = 3;

/// Reference domain of a geometry family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceDomain {
    /// [-1, 1]
    Line,
    /// Unit triangle (0,0)-(1,0)-(0,1)
    Triangle,
    /// [-1, 1]²
    Quadrilateral,
    /// Unit tetrahedron
    Tetrahedron,
    /// [-1, 1]³
    Hexahedron,
}

impl ReferenceDomain {
    /// Length, area or volume of the reference domain
    pub fn measure(&self) -> f64 {
        match self {
            ReferenceDomain::Line => 2.0,
            ReferenceDomain::Triangle => 0.5,
            ReferenceDomain::Quadrilateral => 4.0,
            ReferenceDomain::Tetrahedron => 1.0 / 6.0,
            ReferenceDomain::Hexahedron => 8.0,
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            ReferenceDomain::Line => 1,
            ReferenceDomain::Triangle | ReferenceDomain::Quadrilateral => 2,
            ReferenceDomain::Tetrahedron | ReferenceDomain::Hexahedron => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReferenceDomain::Line => "line",
            ReferenceDomain::Triangle => "triangle",
            ReferenceDomain::Quadrilateral => "quadrilateral",
            ReferenceDomain::Tetrahedron => "tetrahedron",
            ReferenceDomain::Hexahedron => "hexahedron",
        }
    }

    pub fn max_order(&self) -> usize {
        match self {
            ReferenceDomain::Line | ReferenceDomain::Quadrilateral | ReferenceDomain::Hexahedron => {
                MAX_LINE_ORDER
            }
            ReferenceDomain::Triangle | ReferenceDomain::Tetrahedron => MAX_SIMPLEX_ORDER,
        }
    }
}

/// Integration point: local coordinates (unused components are zero) and weight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationPoint {
    pub coordinates: [f64; 3],
    pub weight: f64,
}

impl IntegrationPoint {
    pub const fn new(xi: f64, eta: f64, zeta: f64, weight: f64) -> Self {
        Self {
            coordinates: [xi, eta, zeta],
            weight,
        }
    }
}

const GAUSS_1: [(f64, f64); 1] = [(0.0, 2.0)];

const GAUSS_2: [(f64, f64); 2] = [(-0.5773502691896257, 1.0), (0.5773502691896257, 1.0)];

const GAUSS_3: [(f64, f64); 3] = [
    (-0.7745966692414834, 0.5555555555555556),
    (0.0, 0.8888888888888888),
    (0.7745966692414834, 0.5555555555555556),
];

const GAUSS_4: [(f64, f64); 4] = [
    (-0.8611363115940526, 0.3478548451374538),
    (-0.3399810435848563, 0.6521451548625461),
    (0.3399810435848563, 0.6521451548625461),
    (0.8611363115940526, 0.3478548451374538),
];

const GAUSS_5: [(f64, f64); 5] = [
    (-0.9061798459386640, 0.2369268850561891),
    (-0.5384693101056831, 0.4786286704993665),
    (0.0, 0.5688888888888889),
    (0.5384693101056831, 0.4786286704993665),
    (0.9061798459386640, 0.2369268850561891),
];

const GAUSS_6: [(f64, f64); 6] = [
    (-0.9324695142031521, 0.1713244923791704),
    (-0.6612093864662645, 0.3607615730481386),
    (-0.2386191860831969, 0.4679139345726910),
    (0.2386191860831969, 0.4679139345726910),
    (0.6612093864662645, 0.3607615730481386),
    (0.9324695142031521, 0.1713244923791704),
];

const GAUSS_7: [(f64, f64); 7] = [
    (-0.9491079123427585, 0.1294849661688697),
    (-0.7415311855993945, 0.2797053914892766),
    (-0.4058451513773972, 0.3818300505051189),
    (0.0, 0.4179591836734694),
    (0.4058451513773972, 0.3818300505051189),
    (0.7415311855993945, 0.2797053914892766),
    (0.9491079123427585, 0.1294849661688697),
];

const GAUSS_8: [(f64, f64); 8] = [
    (-0.9602898564975363, 0.1012285362903763),
    (-0.7966664774136267, 0.2223810344533745),
    (-0.5255324099163290, 0.3137066458778873),
    (-0.1834346424956498, 0.3626837833783620),
    (0.1834346424956498, 0.3626837833783620),
    (0.5255324099163290, 0.3137066458778873),
    (0.7966664774136267, 0.2223810344533745),
    (0.9602898564975363, 0.1012285362903763),
];

const GAUSS_9: [(f64, f64); 9] = [
    (-0.9681602395076261, 0.0812743883615744),
    (-0.8360311073266358, 0.1806481606948574),
    (-0.6133714327005904, 0.2606106964029354),
    (-0.3242534234038089, 0.3123470770400029),
    (0.0, 0.3302393550012598),
    (0.3242534234038089, 0.3123470770400029),
    (0.6133714327005904, 0.2606106964029354),
    (0.8360311073266358, 0.1806481606948574),
    (0.9681602395076261, 0.0812743883615744),
];

const GAUSS_10: [(f64, f64); 10] = [
    (-0.9739065285171717, 0.0666713443086881),
    (-0.8650633666889845, 0.1494513491505806),
    (-0.6794095682990244, 0.2190863625159820),
    (-0.4333953941292472, 0.2692667193099963),
    (-0.1488743389816312, 0.2955242247147529),
    (0.1488743389816312, 0.2955242247147529),
    (0.4333953941292472, 0.2692667193099963),
    (0.6794095682990244, 0.2190863625159820),
    (0.8650633666889845, 0.1494513491505806),
    (0.9739065285171717, 0.0666713443086881),
];

const TRIANGLE_1: [IntegrationPoint; 1] = [IntegrationPoint::new(1.0 / 3.0, 1.0 / 3.0, 0.0, 0.5)];

const TRIANGLE_2: [IntegrationPoint; 3] = [
    IntegrationPoint::new(1.0 / 6.0, 1.0 / 6.0, 0.0, 1.0 / 6.0),
    IntegrationPoint::new(2.0 / 3.0, 1.0 / 6.0, 0.0, 1.0 / 6.0),
    IntegrationPoint::new(1.0 / 6.0, 2.0 / 3.0, 0.0, 1.0 / 6.0),
];

// Six point rule, exact for degree 4
const TRIANGLE_3: [IntegrationPoint; 6] = [
    IntegrationPoint::new(0.445948490915965, 0.445948490915965, 0.0, 0.1116907948390057),
    IntegrationPoint::new(0.108103018168070, 0.445948490915965, 0.0, 0.1116907948390057),
    IntegrationPoint::new(0.445948490915965, 0.108103018168070, 0.0, 0.1116907948390057),
    IntegrationPoint::new(0.091576213509771, 0.091576213509771, 0.0, 0.0549758718276609),
    IntegrationPoint::new(0.816847572980459, 0.091576213509771, 0.0, 0.0549758718276609),
    IntegrationPoint::new(0.091576213509771, 0.816847572980459, 0.0, 0.0549758718276609),
];

const TETRAHEDRON_1: [IntegrationPoint; 1] =
    [IntegrationPoint::new(0.25, 0.25, 0.25, 1.0 / 6.0)];

const TETRAHEDRON_2: [IntegrationPoint; 4] = [
    IntegrationPoint::new(0.5854101966249685, 0.1381966011250105, 0.1381966011250105, 1.0 / 24.0),
    IntegrationPoint::new(0.1381966011250105, 0.5854101966249685, 0.1381966011250105, 1.0 / 24.0),
    IntegrationPoint::new(0.1381966011250105, 0.1381966011250105, 0.5854101966249685, 1.0 / 24.0),
    IntegrationPoint::new(0.1381966011250105, 0.1381966011250105, 0.1381966011250105, 1.0 / 24.0),
];

const TETRAHEDRON_3: [IntegrationPoint; 5] = [
    IntegrationPoint::new(0.25, 0.25, 0.25, -2.0 / 15.0),
    IntegrationPoint::new(1.0 / 6.0, 1.0 / 6.0, 1.0 / 6.0, 0.075),
    IntegrationPoint::new(0.5, 1.0 / 6.0, 1.0 / 6.0, 0.075),
    IntegrationPoint::new(1.0 / 6.0, 0.5, 1.0 / 6.0, 0.075),
    IntegrationPoint::new(1.0 / 6.0, 1.0 / 6.0, 0.5, 0.075),
];

/// Gauss-Legendre (abscissa, weight) table on [-1, 1]
pub fn gauss_legendre(order: usize) -> Result<&'static [(f64, f64)]> {
    let table: &'static [(f64, f64)] = match order {
        1 => &GAUSS_1,
        2 => &GAUSS_2,
        3 => &GAUSS_3,
        4 => &GAUSS_4,
        5 => &GAUSS_5,
        6 => &GAUSS_6,
        7 => &GAUSS_7,
        8 => &GAUSS_8,
        9 => &GAUSS_9,
        10 => &GAUSS_10,
        _ => {
            return Err(FemError::UnsupportedIntegrationOrder {
                domain: ReferenceDomain::Line.name(),
                order,
            });
        }
    };
    Ok(table)
}

/// Integration points of `domain` for the given order, in table order
pub fn integration_points(domain: ReferenceDomain, order: usize) -> Result<Vec<IntegrationPoint>> {
    let unsupported = || FemError::UnsupportedIntegrationOrder {
        domain: domain.name(),
        order,
    };

    match domain {
        ReferenceDomain::Line => Ok(gauss_legendre(order)?
            .iter()
            .map(|&(x, w)| IntegrationPoint::new(x, 0.0, 0.0, w))
            .collect()),
        ReferenceDomain::Quadrilateral => {
            let line = gauss_legendre(order).map_err(|_| unsupported())?;
            let mut points = Vec::with_capacity(line.len() * line.len());
            for &(y, wy) in line {
                for &(x, wx) in line {
                    points.push(IntegrationPoint::new(x, y, 0.0, wx * wy));
                }
            }
            Ok(points)
        }
        ReferenceDomain::Hexahedron => {
            let line = gauss_legendre(order).map_err(|_| unsupported())?;
            let mut points = Vec::with_capacity(line.len().pow(3));
            for &(z, wz) in line {
                for &(y, wy) in line {
                    for &(x, wx) in line {
                        points.push(IntegrationPoint::new(x, y, z, wx * wy * wz));
                    }
                }
            }
            Ok(points)
        }
        ReferenceDomain::Triangle => match order {
            1 => Ok(TRIANGLE_1.to_vec()),
            2 => Ok(TRIANGLE_2.to_vec()),
            3 => Ok(TRIANGLE_3.to_vec()),
            _ => Err(unsupported()),
        },
        ReferenceDomain::Tetrahedron => match order {
            1 => Ok(TETRAHEDRON_1.to_vec()),
            2 => Ok(TETRAHEDRON_2.to_vec()),
            3 => Ok(TETRAHEDRON_3.to_vec()),
            _ => Err(unsupported()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const ALL_DOMAINS: [ReferenceDomain; 5] = [
        ReferenceDomain::Line,
        ReferenceDomain::Triangle,
        ReferenceDomain::Quadrilateral,
        ReferenceDomain::Tetrahedron,
        ReferenceDomain::Hexahedron,
    ];

    #[test]
    fn weights_sum_to_reference_measure() {
        for domain in ALL_DOMAINS {
            for order in 1..=domain.max_order() {
                let points = integration_points(domain, order).unwrap();
                let sum: f64 = points.iter().map(|p| p.weight).sum();
                assert_abs_diff_eq!(sum, domain.measure(), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn order_two_line_weights_sum_to_two() {
        let points = gauss_legendre(2).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points.iter().map(|p| p.1).sum::<f64>(), 2.0);
    }

    #[test]
    fn line_rules_are_symmetric() {
        for order in 1..=MAX_LINE_ORDER {
            let table = gauss_legendre(order).unwrap();
            assert_eq!(table.len(), order);
            for i in 0..order {
                let (x, w) = table[i];
                let (xm, wm) = table[order - 1 - i];
                assert_abs_diff_eq!(x, -xm, epsilon = 1e-15);
                assert_abs_diff_eq!(w, wm, epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn line_rule_integrates_polynomials_exactly() {
        // ∫_{-1}^{1} x^(2n-2) dx = 2 / (2n-1)
        for order in 1..=MAX_LINE_ORDER {
            let degree = 2 * order - 2;
            let integral: f64 = gauss_legendre(order)
                .unwrap()
                .iter()
                .map(|&(x, w)| w * x.powi(degree as i32))
                .sum();
            assert_abs_diff_eq!(integral, 2.0 / (degree as f64 + 1.0), epsilon = 1e-12);
        }
    }

    #[test]
    fn simplex_rules_integrate_linear_fields() {
        // ∫ x over unit triangle = 1/6, over unit tetrahedron = 1/24
        for order in 1..=MAX_SIMPLEX_ORDER {
            let tri: f64 = integration_points(ReferenceDomain::Triangle, order)
                .unwrap()
                .iter()
                .map(|p| p.weight * p.coordinates[0])
                .sum();
            assert_abs_diff_eq!(tri, 1.0 / 6.0, epsilon = 1e-12);

            let tet: f64 = integration_points(ReferenceDomain::Tetrahedron, order)
                .unwrap()
                .iter()
                .map(|p| p.weight * p.coordinates[2])
                .sum();
            assert_abs_diff_eq!(tet, 1.0 / 24.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn tensor_product_point_counts() {
        assert_eq!(integration_points(ReferenceDomain::Quadrilateral, 3).unwrap().len(), 9);
        assert_eq!(integration_points(ReferenceDomain::Hexahedron, 2).unwrap().len(), 8);
    }

    #[test]
    fn unsupported_orders() {
        assert!(matches!(
            gauss_legendre(0),
            Err(FemError::UnsupportedIntegrationOrder { order: 0, .. })
        ));
        assert!(gauss_legendre(11).is_err());
        assert!(matches!(
            integration_points(ReferenceDomain::Tetrahedron, 4),
            Err(FemError::UnsupportedIntegrationOrder {
                domain: "tetrahedron",
                order: 4
            })
        ));
        assert!(matches!(
            integration_points(ReferenceDomain::Hexahedron, 11),
            Err(FemError::UnsupportedIntegrationOrder {
                domain: "hexahedron",
                ..
            })
        ));
    }
}
