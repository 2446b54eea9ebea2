//! DOF layouts and equation-id resolution.
//!
//! A [`DofLayout`] describes which nodal variables an entity contributes
//! to, in local row order. The layout is the only place where the local
//! DOF order is decided: equation ids, DOF handles and nodal values are
//! all derived from [`DofLayout::selected_variables`], so the three stay
//! index-aligned for every branch outcome (including the Kutta split).

use crate::elements::Entity;
use crate::error::{EntityContext, FemError, Result};
use crate::mesh::{Mesh, Node};
use crate::variables;
use nalgebra::DVector;
use std::collections::BTreeSet;

/// Field chosen for a node by the discontinuity predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTag {
    Primary,
    Auxiliary,
}

/// Kutta split predicate.
///
/// If any node has a negative discriminant the entity is split: nodes with
/// a negative value use the primary field, the others the auxiliary field.
/// Otherwise every node uses the primary field.
pub fn compute_field_selection(nodes: &[&Node], discriminant: &str) -> Result<Vec<FieldTag>> {
    let values = nodes
        .iter()
        .map(|node| node.solution_step_value(discriminant, 0))
        .collect::<Result<Vec<f64>>>()?;

    let split = values.iter().any(|&d| d < 0.0);
    Ok(values
        .iter()
        .map(|&d| {
            if !split || d < 0.0 {
                FieldTag::Primary
            } else {
                FieldTag::Auxiliary
            }
        })
        .collect())
}

/// (node, variable) handle of one local DOF
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DofHandle {
    pub node_id: usize,
    pub variable: &'static str,
}

/// Local DOF layout strategy of an entity
#[derive(Debug, Clone, PartialEq)]
pub enum DofLayout {
    /// Same variables on every node, node-major
    Uniform(Vec<&'static str>),
    /// One variable per node chosen by [`compute_field_selection`]
    FieldSelection {
        discriminant: &'static str,
        primary: &'static str,
        auxiliary: &'static str,
    },
}

impl DofLayout {
    pub fn uniform(variables: &[&'static str]) -> Self {
        DofLayout::Uniform(variables.to_vec())
    }

    pub fn dofs_per_node(&self) -> usize {
        match self {
            DofLayout::Uniform(vars) => vars.len(),
            DofLayout::FieldSelection { .. } => 1,
        }
    }

    pub fn local_size(&self, num_nodes: usize) -> usize {
        self.dofs_per_node() * num_nodes
    }

    /// Variables that must exist on every node for this layout
    pub fn required_variables(&self) -> Vec<&'static str> {
        match self {
            DofLayout::Uniform(vars) => vars.clone(),
            DofLayout::FieldSelection {
                primary, auxiliary, ..
            } => vec![*primary, *auxiliary],
        }
    }

    /// (local node index, variable) for every local row, in row order
    pub fn selected_variables(&self, nodes: &[&Node]) -> Result<Vec<(usize, &'static str)>> {
        match self {
            DofLayout::Uniform(vars) => Ok((0..nodes.len())
                .flat_map(|a| vars.iter().map(move |v| (a, *v)))
                .collect()),
            DofLayout::FieldSelection {
                discriminant,
                primary,
                auxiliary,
            } => {
                let tags = compute_field_selection(nodes, discriminant)?;
                Ok(tags
                    .into_iter()
                    .enumerate()
                    .map(|(a, tag)| match tag {
                        FieldTag::Primary => (a, *primary),
                        FieldTag::Auxiliary => (a, *auxiliary),
                    })
                    .collect())
            }
        }
    }

    pub fn equation_ids(&self, nodes: &[&Node]) -> Result<Vec<usize>> {
        self.selected_variables(nodes)?
            .into_iter()
            .map(|(a, var)| nodes[a].equation_id(var))
            .collect()
    }

    pub fn dof_list(&self, nodes: &[&Node]) -> Result<Vec<DofHandle>> {
        self.selected_variables(nodes)?
            .into_iter()
            .map(|(a, var)| {
                nodes[a].dof(var)?;
                Ok(DofHandle {
                    node_id: nodes[a].id,
                    variable: var,
                })
            })
            .collect()
    }

    /// Nodal values of the selected variables at solution step `step`
    pub fn values(&self, nodes: &[&Node], step: usize) -> Result<DVector<f64>> {
        let selected = self.selected_variables(nodes)?;
        let mut values = DVector::zeros(selected.len());
        for (row, (a, var)) in selected.into_iter().enumerate() {
            values[row] = nodes[a].solution_step_value(var, step)?;
        }
        Ok(values)
    }

    /// Same layout on the adjoint variables
    pub fn to_adjoint(&self) -> Result<DofLayout> {
        let adjoint = |v: &'static str| {
            variables::adjoint_of(v).ok_or_else(|| {
                FemError::UnsupportedOperation(format!("{} has no adjoint variable", v))
            })
        };
        match self {
            DofLayout::Uniform(vars) => Ok(DofLayout::Uniform(
                vars.iter().map(|v| adjoint(*v)).collect::<Result<Vec<_>>>()?,
            )),
            DofLayout::FieldSelection {
                discriminant,
                primary,
                auxiliary,
            } => Ok(DofLayout::FieldSelection {
                discriminant: *discriminant,
                primary: adjoint(*primary)?,
                auxiliary: adjoint(*auxiliary)?,
            }),
        }
    }
}

/// Global equation numbering
pub struct DofNumbering;

impl DofNumbering {
    /// Number every DOF used by `entities` with dense ids `0..n`.
    ///
    /// All previous ids are cleared first, so each DOF receives exactly one
    /// id per call. DOFs are ordered by (node id, variable name) which makes
    /// the numbering independent of entity order. Returns `n`.
    pub fn assign<'a, E>(mesh: &mut Mesh, entities: impl IntoIterator<Item = &'a E>) -> Result<usize>
    where
        E: Entity + 'a,
    {
        let mut handles = BTreeSet::new();
        for entity in entities {
            let nodes = mesh.resolve(entity.geometry().node_ids())?;
            let list = entity.dof_list(&nodes).for_entity(entity.id())?;
            handles.extend(list);
        }

        mesh.reset_equation_ids();
        for (equation_id, handle) in handles.iter().enumerate() {
            mesh.node_mut(handle.node_id)?
                .dof_mut(handle.variable)?
                .equation_id = Some(equation_id);
        }

        tracing::debug!(equations = handles.len(), "assigned equation ids");
        Ok(handles.len())
    }
}
