//! I/O layer for the mpfe assembly core.
//!
//! Currently provides the serde data model of the materials document
//! (`properties[]` / `Material` / `Variables` / `Tables` / `sub_properties`)
//! and helpers to read it from strings and files.

pub mod error;
pub mod materials;

pub use error::{IoError, Result};
pub use materials::{
    LawSelector, MaterialBlock, MaterialValue, MaterialsDocument, PropertyBlock, SubPropertyBlock,
    TableBlock, parse_materials, read_materials_file,
};
