//! Element and condition contribution core of a multiphysics finite element
//! framework.
//!
//! Entities (elements and conditions) compute local systems from their
//! geometry, nodal data and shared properties. The assembler scatters those
//! local systems into a global sparse system, serially or in parallel.
//! Adjoint wrappers turn primal entities into sensitivity-analysis entities.

pub mod adjoint;
pub mod assembly;
pub mod conditions;
pub mod constitutive;
pub mod dof;
pub mod elements;
pub mod error;
pub mod geometry;
pub mod materials;
pub mod mesh;
pub mod process_info;
pub mod properties;
pub mod quadrature;
pub mod table;
pub mod utilities;
pub mod values;
pub mod variables;

pub use adjoint::{
    AdjointBehaviour, AdjointEntity, AdjointFiniteDifferencingElement,
    AdjointPotentialWallCondition2D2N, DesignVariable, TracedStressType,
};
pub use assembly::{
    AssembledSystem, Assembler, AssemblyOptions, AssemblyStrategy, RowLockedSystem, ScatterTarget,
    color_entities,
};
pub use conditions::{EvmEpsilonWallCondition2D2N, PotentialWallCondition2D2N};
pub use constitutive::{
    ConstitutiveLaw, ConstitutiveParameters, StrainMeasure, StressMeasure, create_constitutive_law,
};
pub use dof::{DofLayout, DofNumbering, FieldTag};
pub use elements::{
    CrLinearBeamElement3D2N, DynamicEntity, EvmKElement, Entity, EntityBase, EntityKind,
    LocalSystem, SmallDisplacementElement, TotalLagrangianElement,
};
pub use error::{EntityContext, ErrorCategory, FemError, Result};
pub use geometry::{Geometry, GeometryKind, PointData};
pub use materials::{PropertyAssignment, read_materials, read_materials_file, read_materials_str};
pub use mesh::{Configuration, Mesh, Node};
pub use process_info::ProcessInfo;
pub use properties::Properties;
pub use table::Table;
pub use utilities::{calculate_nodal_area, embedded_negative_volume, negative_distance_volume};
pub use values::Value;
