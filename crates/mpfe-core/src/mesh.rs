//! Nodes, degrees of freedom and the node store.
//!
//! Nodes are owned by the [`Mesh`] and referenced by id from entity
//! geometries. Assembly only ever sees `&Mesh`; solution-step updates,
//! DOF numbering and nodal utilities take `&mut Mesh`, which keeps the
//! update phase strictly separated from the (parallel) assembly reads.

use crate::error::{FemError, Result};
use nalgebra::Vector3;
use std::collections::BTreeMap;

/// Number of stored solution steps (current + previous)
pub const BUFFER_SIZE: usize = 2;

/// Configuration in which coordinates are taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Configuration {
    Initial,
    Current,
}

/// Degree of freedom of a node
#[derive(Debug, Clone, PartialEq)]
pub struct Dof {
    pub variable: String,
    pub equation_id: Option<usize>,
    pub fixed: bool,
}

/// Mesh node with coordinates, historical values and DOFs
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: usize,
    initial: Vector3<f64>,
    current: Vector3<f64>,
    history: BTreeMap<String, [f64; BUFFER_SIZE]>,
    dofs: BTreeMap<String, Dof>,
}

impl Node {
    /// Create a node at the given position (initial = current)
    pub fn new(id: usize, x: f64, y: f64, z: f64) -> Self {
        let position = Vector3::new(x, y, z);
        Self {
            id,
            initial: position,
            current: position,
            history: BTreeMap::new(),
            dofs: BTreeMap::new(),
        }
    }

    pub fn coordinates(&self, configuration: Configuration) -> Vector3<f64> {
        match configuration {
            Configuration::Initial => self.initial,
            Configuration::Current => self.current,
        }
    }

    pub fn initial_position(&self) -> Vector3<f64> {
        self.initial
    }

    pub fn position(&self) -> Vector3<f64> {
        self.current
    }

    pub fn set_position(&mut self, position: Vector3<f64>) {
        self.current = position;
    }

    /// Translate both reference and current coordinates
    pub fn translate(&mut self, delta: Vector3<f64>) {
        self.initial += delta;
        self.current += delta;
    }

    pub fn add_solution_step_variable(&mut self, variable: &str) {
        self.history
            .entry(variable.to_string())
            .or_insert([0.0; BUFFER_SIZE]);
    }

    pub fn has_solution_step_value(&self, variable: &str) -> bool {
        self.history.contains_key(variable)
    }

    /// Historical value; `step` 0 is the current step, 1 the previous one
    pub fn solution_step_value(&self, variable: &str, step: usize) -> Result<f64> {
        let buffer = self
            .history
            .get(variable)
            .ok_or_else(|| FemError::MissingNodalVariable {
                node_id: self.id,
                variable: variable.to_string(),
            })?;
        buffer.get(step).copied().ok_or_else(|| {
            FemError::Validation(format!(
                "node {}: step index {} exceeds buffer size {}",
                self.id, step, BUFFER_SIZE
            ))
        })
    }

    /// Set the current-step value, registering the variable if needed
    pub fn set_solution_step_value(&mut self, variable: &str, value: f64) {
        self.history
            .entry(variable.to_string())
            .or_insert([0.0; BUFFER_SIZE])[0] = value;
    }

    /// Shift every buffer by one step (current is kept as previous)
    pub fn advance_solution_step(&mut self) {
        for buffer in self.history.values_mut() {
            for i in (1..BUFFER_SIZE).rev() {
                buffer[i] = buffer[i - 1];
            }
        }
    }

    pub fn add_dof(&mut self, variable: &str) {
        self.dofs.entry(variable.to_string()).or_insert_with(|| Dof {
            variable: variable.to_string(),
            equation_id: None,
            fixed: false,
        });
    }

    pub fn has_dof(&self, variable: &str) -> bool {
        self.dofs.contains_key(variable)
    }

    pub fn dof(&self, variable: &str) -> Result<&Dof> {
        self.dofs.get(variable).ok_or_else(|| FemError::MissingDof {
            node_id: self.id,
            variable: variable.to_string(),
        })
    }

    pub fn dof_mut(&mut self, variable: &str) -> Result<&mut Dof> {
        let id = self.id;
        self.dofs.get_mut(variable).ok_or_else(|| FemError::MissingDof {
            node_id: id,
            variable: variable.to_string(),
        })
    }

    pub fn fix(&mut self, variable: &str) -> Result<()> {
        self.dof_mut(variable)?.fixed = true;
        Ok(())
    }

    pub fn equation_id(&self, variable: &str) -> Result<usize> {
        self.dof(variable)?
            .equation_id
            .ok_or_else(|| FemError::UnassignedEquationId {
                node_id: self.id,
                variable: variable.to_string(),
            })
    }

    pub(crate) fn reset_equation_ids(&mut self) {
        for dof in self.dofs.values_mut() {
            dof.equation_id = None;
        }
    }

    /// Register a variable both as historical value and as DOF
    pub fn add_variable_with_dof(&mut self, variable: &str) {
        self.add_solution_step_variable(variable);
        self.add_dof(variable);
    }

    /// Check that `variable` is present as historical value and as DOF
    pub fn check_variable_and_dof(&self, variable: &str) -> Result<()> {
        if !self.has_solution_step_value(variable) {
            return Err(FemError::MissingNodalVariable {
                node_id: self.id,
                variable: variable.to_string(),
            });
        }
        self.dof(variable).map(|_| ())
    }

    pub fn check_variable(&self, variable: &str) -> Result<()> {
        if self.has_solution_step_value(variable) {
            Ok(())
        } else {
            Err(FemError::MissingNodalVariable {
                node_id: self.id,
                variable: variable.to_string(),
            })
        }
    }
}

/// Node store
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub nodes: BTreeMap<usize, Node>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    /// Create and insert a node, returning its id
    pub fn create_node(&mut self, id: usize, x: f64, y: f64, z: f64) -> usize {
        self.add_node(Node::new(id, x, y, z));
        id
    }

    pub fn node(&self, id: usize) -> Result<&Node> {
        self.nodes.get(&id).ok_or(FemError::NodeNotFound(id))
    }

    pub fn node_mut(&mut self, id: usize) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(FemError::NodeNotFound(id))
    }

    /// Resolve node ids to references, in the given order
    pub fn resolve(&self, ids: &[usize]) -> Result<Vec<&Node>> {
        ids.iter().map(|&id| self.node(id)).collect()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Register variables (historical + DOF) on every node
    pub fn add_variables_with_dofs(&mut self, variables: &[&str]) {
        for node in self.nodes.values_mut() {
            for variable in variables {
                node.add_variable_with_dof(variable);
            }
        }
    }

    /// Register historical variables on every node
    pub fn add_solution_step_variables(&mut self, variables: &[&str]) {
        for node in self.nodes.values_mut() {
            for variable in variables {
                node.add_solution_step_variable(variable);
            }
        }
    }

    pub fn reset_equation_ids(&mut self) {
        for node in self.nodes.values_mut() {
            node.reset_equation_ids();
        }
    }

    pub fn advance_solution_step(&mut self) {
        for node in self.nodes.values_mut() {
            node.advance_solution_step();
        }
    }
}
