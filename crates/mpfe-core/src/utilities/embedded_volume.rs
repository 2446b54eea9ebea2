//! Volume of the region where a nodal `DISTANCE` field is negative.
//!
//! Each linear tetrahedron is cut by the zero level of its distance field.
//! Cut points on an edge `(i, j)` are placed with weights proportional to
//! the absolute distance of the opposite end.

use crate::elements::Entity;
use crate::error::{EntityContext, FemError, Result};
use crate::geometry::GeometryKind;
use crate::mesh::{Configuration, Mesh, Node};
use crate::variables::DISTANCE;
use nalgebra::Vector3;

/// Negative-distance volume of one tetrahedron
pub fn negative_distance_volume(nodes: &[&Node]) -> Result<f64> {
    if nodes.len() != 4 {
        return Err(FemError::Validation(format!(
            "embedded volume requires a 4-node tetrahedron, got {} nodes",
            nodes.len()
        )));
    }
    let mut x = [Vector3::zeros(); 4];
    let mut d = [0.0; 4];
    for (a, node) in nodes.iter().enumerate() {
        x[a] = node.coordinates(Configuration::Current);
        d[a] = node.solution_step_value(DISTANCE, 0)?;
    }

    let negatives: Vec<usize> = (0..4).filter(|&a| d[a] < 0.0).collect();
    let volume = match negatives.as_slice() {
        [] => 0.0,
        [tip] => pyramid_volume(*tip, &x, &d),
        [j, k] => prism_volume(*j, *k, &x, &d),
        [_, _, _] => {
            let positive = (0..4).find(|a| d[*a] >= 0.0).unwrap_or(0);
            tetrahedron_volume(&x[0], &x[1], &x[2], &x[3]) - pyramid_volume(positive, &x, &d)
        }
        _ => tetrahedron_volume(&x[0], &x[1], &x[2], &x[3]),
    };
    Ok(volume)
}

/// Sum of [`negative_distance_volume`] over tetrahedral entities
pub fn embedded_negative_volume<E: Entity>(mesh: &Mesh, entities: &[E]) -> Result<f64> {
    let mut total = 0.0;
    for entity in entities {
        let geometry = entity.geometry();
        if geometry.kind() != GeometryKind::Tetrahedron4 {
            return Err(FemError::UnsupportedOperation(format!(
                "embedded volume is only defined on Tetrahedron4, not {}",
                geometry.kind().name()
            )))
            .for_entity(entity.id());
        }
        let nodes = mesh.resolve(geometry.node_ids())?;
        total += negative_distance_volume(&nodes).for_entity(entity.id())?;
    }
    Ok(total)
}

fn tetrahedron_volume(a: &Vector3<f64>, b: &Vector3<f64>, c: &Vector3<f64>, d: &Vector3<f64>) -> f64 {
    (b - a).dot(&(c - a).cross(&(d - a))).abs() / 6.0
}

/// Point on edge `(i, j)` where the distance changes sign
fn cut_point(i: usize, j: usize, x: &[Vector3<f64>; 4], d: &[f64; 4]) -> Vector3<f64> {
    let (di, dj) = (d[i].abs(), d[j].abs());
    let sum = di + dj;
    if sum <= f64::EPSILON {
        return (x[i] + x[j]) * 0.5;
    }
    (x[i] * dj + x[j] * di) / sum
}

/// Tetrahedron between node `tip` and the cut points on its three edges
fn pyramid_volume(tip: usize, x: &[Vector3<f64>; 4], d: &[f64; 4]) -> f64 {
    let cuts: Vec<Vector3<f64>> = (0..4)
        .filter(|&i| i != tip)
        .map(|i| cut_point(i, tip, x, d))
        .collect();
    tetrahedron_volume(&x[tip], &cuts[0], &cuts[1], &cuts[2])
}

/// Wedge with triangles `(j, c0, c2)` and `(k, c1, c3)`, where `c0, c1`
/// and `c2, c3` are the cuts on the edges from the two positive nodes
fn prism_volume(j: usize, k: usize, x: &[Vector3<f64>; 4], d: &[f64; 4]) -> f64 {
    let mut c = Vec::with_capacity(4);
    for i in (0..4).filter(|&i| i != j && i != k) {
        c.push(cut_point(i, j, x, d));
        c.push(cut_point(i, k, x, d));
    }
    tetrahedron_volume(&x[j], &c[0], &c[2], &c[3])
        + tetrahedron_volume(&x[j], &c[0], &c[1], &c[3])
        + tetrahedron_volume(&x[j], &x[k], &c[1], &c[3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::DynamicEntity;
    use crate::properties::Properties;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn tetrahedron(distances: [f64; 4]) -> Mesh {
        let mut mesh = Mesh::new();
        for (id, x, y, z) in [
            (1, 0.0, 0.0, 0.0),
            (2, 1.0, 0.0, 0.0),
            (3, 0.0, 1.0, 0.0),
            (4, 0.0, 0.0, 1.0),
        ] {
            mesh.create_node(id, x, y, z);
        }
        for (node, d) in mesh.nodes.values_mut().zip(distances) {
            node.set_solution_step_value(DISTANCE, d);
        }
        mesh
    }

    fn volume(distances: [f64; 4]) -> f64 {
        let mesh = tetrahedron(distances);
        negative_distance_volume(&mesh.resolve(&[1, 2, 3, 4]).unwrap()).unwrap()
    }

    #[test]
    fn test_trivial_cases() {
        assert_eq!(volume([1.0, 1.0, 2.0, 0.5]), 0.0);
        assert_relative_eq!(volume([-1.0, -1.0, -2.0, -0.5]), 1.0 / 6.0, epsilon = 1e-14);
    }

    #[test]
    fn test_single_negative_node_is_a_corner_tetrahedron() {
        // cut at the midpoint of the three edges from the origin
        assert_relative_eq!(volume([-1.0, 1.0, 1.0, 1.0]), 1.0 / 48.0, epsilon = 1e-14);
    }

    #[test]
    fn test_complementary_fields_sum_to_total() {
        let total = 1.0 / 6.0;
        for d in [
            [-1.0, 0.5, 2.0, 0.3],
            [-1.0, -0.2, 2.0, 0.3],
            [0.7, -0.2, -2.0, 0.3],
            [-0.4, -0.2, -2.0, 0.3],
            [0.1, -3.0, 0.2, -0.6],
        ] {
            let flipped = d.map(|v| -v);
            assert_relative_eq!(volume(d) + volume(flipped), total, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_planar_cut_matches_analytic_slab() {
        // d = x - 1/2 cuts off the slab x < 1/2 of volume 1/6 - 1/48
        let v = volume([-0.5, 0.5, -0.5, -0.5]);
        assert_relative_eq!(v, 1.0 / 6.0 - 1.0 / 48.0, epsilon = 1e-14);
        // d = x + y - 1/2: two negative nodes, the wedge x + y < 1/2
        let v = volume([-0.5, 0.5, 0.5, -0.5]);
        assert_relative_eq!(v, 1.0 / 12.0, epsilon = 1e-14);
    }

    #[test]
    fn test_mesh_sum_and_non_tetrahedra() {
        let mesh = tetrahedron([-1.0, -1.0, -1.0, -1.0]);
        let props = Arc::new(Properties::new(1));
        let tets = vec![
            DynamicEntity::create("SmallDisplacementElement3D4N", 1, vec![1, 2, 3, 4], props.clone()).unwrap(),
        ];
        assert_relative_eq!(embedded_negative_volume(&mesh, &tets).unwrap(), 1.0 / 6.0, epsilon = 1e-14);

        let wall = vec![DynamicEntity::create("PotentialWallCondition2D2N", 7, vec![1, 2], props).unwrap()];
        let err = embedded_negative_volume(&mesh, &wall).unwrap_err();
        assert_eq!(err.entity_id(), Some(7));
    }

    #[test]
    fn test_wrong_node_count() {
        let mesh = tetrahedron([1.0; 4]);
        let nodes = mesh.resolve(&[1, 2, 3]).unwrap();
        assert!(matches!(negative_distance_volume(&nodes), Err(FemError::Validation(_))));
    }
}
