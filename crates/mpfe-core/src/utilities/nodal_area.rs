//! Lumped nodal area (length, area or volume) of a set of entities.

use crate::elements::Entity;
use crate::error::{EntityContext, Result};
use crate::mesh::{Configuration, Mesh};
use crate::variables::NODAL_AREA;
use rayon::prelude::*;

/// Reset `NODAL_AREA` on every node of `entities`, then accumulate
/// `Σ_gp N_i · w · detJ` from each entity.
pub fn calculate_nodal_area<E: Entity>(mesh: &mut Mesh, entities: &[E]) -> Result<()> {
    let view: &Mesh = mesh;
    let contributions = entities
        .par_iter()
        .map(|entity| local_areas(view, entity).for_entity(entity.id()))
        .collect::<Result<Vec<_>>>()?;

    for entity in entities {
        for id in entity.geometry().node_ids() {
            mesh.node_mut(*id)?.set_solution_step_value(NODAL_AREA, 0.0);
        }
    }
    for (id, area) in contributions.into_iter().flatten() {
        let node = mesh.node_mut(id)?;
        let current = node.solution_step_value(NODAL_AREA, 0)?;
        node.set_solution_step_value(NODAL_AREA, current + area);
    }

    tracing::debug!(entities = entities.len(), "nodal area computed");
    Ok(())
}

fn local_areas<E: Entity>(mesh: &Mesh, entity: &E) -> Result<Vec<(usize, f64)>> {
    let geometry = entity.geometry();
    let nodes = mesh.resolve(geometry.node_ids())?;
    let data = geometry.integration_data(
        &nodes,
        geometry.kind().default_integration_order(),
        Configuration::Current,
    )?;
    let mut local = vec![0.0; geometry.size()];
    for point in &data {
        for (a, area) in local.iter_mut().enumerate() {
            *area += point.shape_values[a] * point.weight;
        }
    }
    Ok(geometry.node_ids().iter().copied().zip(local).collect())
}
