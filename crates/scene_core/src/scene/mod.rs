//! Spatial organisation of entities
//!
//! Entities placed in a world live in a [`Map`]: a grid of regions, each
//! holding one folder per [`Category`](crate::ecs::Category).

pub mod bounds;
pub mod map;

pub use bounds::Aabb;
pub use map::{FolderId, Map};
