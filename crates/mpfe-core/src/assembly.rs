//! Global scatter-assembly.
//!
//! Local systems are computed in parallel with rayon, then added into the
//! global system through a [`ScatterTarget`]. The scatter discipline is
//! chosen with [`AssemblyStrategy`]:
//!
//! | strategy    | scatter                                   | reproducible |
//! |-------------|-------------------------------------------|--------------|
//! | `Ordered`   | serial, in entity order                   | bit-for-bit  |
//! | `RowLocked` | parallel, one lock per global row         | to tolerance |
//! | `Colored`   | parallel within conflict-free colour sets | bit-for-bit  |
//!
//! Every entity is checked before anything is computed; the first failing
//! entity aborts the pass.

use crate::elements::Entity;
use crate::error::{EntityContext, FemError, Result};
use crate::mesh::Mesh;
use crate::process_info::ProcessInfo;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// Scatter discipline of the global assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyStrategy {
    #[default]
    Ordered,
    RowLocked,
    Colored,
}

/// Assembly configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyOptions {
    pub strategy: AssemblyStrategy,
    /// Build the global matrix; when false only the RHS is assembled
    pub compute_lhs: bool,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            strategy: AssemblyStrategy::Ordered,
            compute_lhs: true,
        }
    }
}

impl AssemblyOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| FemError::Configuration(format!("invalid assembly options: {}", e)))
    }
}

/// Sparse system target accepting scatter-add of local blocks.
///
/// `scatter` takes `&self` so several threads may scatter at once; the
/// target is responsible for synchronising rows.
pub trait ScatterTarget: Sync {
    fn scatter(&self, ids: &[usize], lhs: Option<&DMatrix<f64>>, rhs: &DVector<f64>) -> Result<()>;
}

#[derive(Debug, Default)]
struct Row {
    entries: BTreeMap<usize, f64>,
    rhs: f64,
}

/// Global system with one lock per row
#[derive(Debug)]
pub struct RowLockedSystem {
    rows: Vec<Mutex<Row>>,
}

impl RowLockedSystem {
    pub fn new(num_equations: usize) -> Self {
        Self {
            rows: (0..num_equations).map(|_| Mutex::new(Row::default())).collect(),
        }
    }

    pub fn num_equations(&self) -> usize {
        self.rows.len()
    }

    /// Freeze the accumulated rows into CSR form
    pub fn into_system(self) -> Result<AssembledSystem> {
        let n = self.rows.len();
        let mut coo = CooMatrix::new(n, n);
        let mut rhs = Vec::with_capacity(n);
        for (i, row) in self.rows.into_iter().enumerate() {
            let row = row.into_inner().map_err(|_| poisoned(i))?;
            for (j, value) in row.entries {
                coo.push(i, j, value);
            }
            rhs.push(row.rhs);
        }
        Ok(AssembledSystem {
            lhs: CsrMatrix::from(&coo),
            rhs,
        })
    }
}

fn poisoned(row: usize) -> FemError {
    FemError::Numerical(format!("lock of global row {} was poisoned", row))
}

impl ScatterTarget for RowLockedSystem {
    fn scatter(&self, ids: &[usize], lhs: Option<&DMatrix<f64>>, rhs: &DVector<f64>) -> Result<()> {
        if rhs.len() != ids.len() || lhs.is_some_and(|m| m.shape() != (ids.len(), ids.len())) {
            return Err(FemError::Validation(format!(
                "local system size does not match {} equation ids",
                ids.len()
            )));
        }
        if let Some(&bad) = ids.iter().find(|&&id| id >= self.rows.len()) {
            return Err(FemError::Validation(format!(
                "equation id {} out of range for {} equations",
                bad,
                self.rows.len()
            )));
        }

        for (i, &gi) in ids.iter().enumerate() {
            let mut row = self.rows[gi].lock().map_err(|_| poisoned(gi))?;
            if let Some(lhs) = lhs {
                for (j, &gj) in ids.iter().enumerate() {
                    *row.entries.entry(gj).or_insert(0.0) += lhs[(i, j)];
                }
            }
            row.rhs += rhs[i];
        }
        Ok(())
    }
}

/// Assembled global system
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSystem {
    pub lhs: CsrMatrix<f64>,
    pub rhs: Vec<f64>,
}

impl AssembledSystem {
    pub fn num_equations(&self) -> usize {
        self.rhs.len()
    }

    pub fn lhs_dense(&self) -> DMatrix<f64> {
        let n = self.num_equations();
        let mut dense = DMatrix::zeros(n, n);
        for (i, j, v) in self.lhs.triplet_iter() {
            dense[(i, j)] += *v;
        }
        dense
    }
}

/// Local block of one entity with its equation ids
struct LocalContribution {
    ids: Vec<usize>,
    lhs: Option<DMatrix<f64>>,
    rhs: DVector<f64>,
}

/// Greedy colouring of entities so that no two entities of one colour share
/// an equation id. Returns entity indices per colour, both in ascending order.
pub fn color_entities(id_sets: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut colors: Vec<Vec<usize>> = Vec::new();
    let mut used: Vec<HashSet<usize>> = Vec::new();
    for (index, ids) in id_sets.iter().enumerate() {
        let color = used
            .iter()
            .position(|taken| ids.iter().all(|id| !taken.contains(id)));
        let color = match color {
            Some(c) => c,
            None => {
                colors.push(Vec::new());
                used.push(HashSet::new());
                colors.len() - 1
            }
        };
        colors[color].push(index);
        used[color].extend(ids.iter().copied());
    }
    colors
}

/// Global assembler
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    options: AssemblyOptions,
}

impl Assembler {
    pub fn new(options: AssemblyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    /// Check every entity in order; the first failure is returned with the entity id
    pub fn check_all<E: Entity>(mesh: &Mesh, entities: &[E], process_info: &ProcessInfo) -> Result<()> {
        for entity in entities {
            let nodes = mesh.resolve(entity.geometry().node_ids()).for_entity(entity.id())?;
            entity.check(&nodes, process_info).for_entity(entity.id())?;
        }
        tracing::debug!(entities = entities.len(), "checked entities");
        Ok(())
    }

    /// Check, compute and scatter every entity into a system of
    /// `num_equations` equations (as returned by `DofNumbering::assign`)
    pub fn assemble<E: Entity>(
        &self,
        mesh: &Mesh,
        entities: &[E],
        num_equations: usize,
        process_info: &ProcessInfo,
    ) -> Result<AssembledSystem> {
        Self::check_all(mesh, entities, process_info)?;

        let contributions = self.local_contributions(mesh, entities, process_info)?;
        let target = RowLockedSystem::new(num_equations);
        tracing::debug!(
            entities = entities.len(),
            equations = num_equations,
            strategy = ?self.options.strategy,
            "scattering local systems"
        );
        self.scatter(&target, &contributions)?;
        target.into_system()
    }

    fn local_contributions<E: Entity>(
        &self,
        mesh: &Mesh,
        entities: &[E],
        process_info: &ProcessInfo,
    ) -> Result<Vec<LocalContribution>> {
        let compute_lhs = self.options.compute_lhs;
        entities
            .par_iter()
            .map(|entity| {
                let local = || -> Result<LocalContribution> {
                    let nodes = mesh.resolve(entity.geometry().node_ids())?;
                    let ids = entity.equation_id_vector(&nodes)?;
                    if compute_lhs {
                        let system = entity.calculate_local_system(&nodes, process_info)?;
                        Ok(LocalContribution {
                            ids,
                            lhs: Some(system.lhs),
                            rhs: system.rhs,
                        })
                    } else {
                        Ok(LocalContribution {
                            ids,
                            lhs: None,
                            rhs: entity.calculate_right_hand_side(&nodes, process_info)?,
                        })
                    }
                };
                local().for_entity(entity.id())
            })
            .collect()
    }

    /// Scatter already computed local systems into `target`
    fn scatter<T: ScatterTarget>(&self, target: &T, contributions: &[LocalContribution]) -> Result<()> {
        let scatter_one = |c: &LocalContribution| target.scatter(&c.ids, c.lhs.as_ref(), &c.rhs);
        match self.options.strategy {
            AssemblyStrategy::Ordered => contributions.iter().try_for_each(scatter_one),
            AssemblyStrategy::RowLocked => contributions.par_iter().try_for_each(scatter_one),
            AssemblyStrategy::Colored => {
                let id_sets: Vec<Vec<usize>> = contributions.iter().map(|c| c.ids.clone()).collect();
                let colors = color_entities(&id_sets);
                tracing::debug!(colors = colors.len(), "coloured entities");
                for color in &colors {
                    color
                        .par_iter()
                        .try_for_each(|&index| scatter_one(&contributions[index]))?;
                }
                Ok(())
            }
        }
    }
}
