//! Mesh utilities built on the entity and geometry layers.

pub mod embedded_volume;
pub mod nodal_area;

pub use embedded_volume::{embedded_negative_volume, negative_distance_volume};
pub use nodal_area::calculate_nodal_area;
