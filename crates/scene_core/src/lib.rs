//! # Scene Core
//!
//! Runtime scene graph: pooled entities with optional hierarchy and
//! transformation facets, typed component pools, dirty-flag propagation with
//! change notification, and a frame update that settles world matrices
//! parents-first before placing entities in a region map.
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_core::prelude::*;
//!
//! fn main() -> Result<(), SceneError> {
//!     let mut world = World::new();
//!
//!     let root = world.create_entity(&EntityDescriptor::node(Category::Actor), None)?;
//!     let child = world.create_entity(&EntityDescriptor::node(Category::Actor), None)?;
//!     if let Some(local) = world.entities_mut().transformation_mut(child) {
//!         local.position = Vec3::new(1.0, 0.0, 0.0);
//!     }
//!
//!     world.entities_mut().attach(root, child)?;
//!     world.entities_mut().mark_entity_as_dirty(root, DirtyFlags::CREATE | DirtyFlags::ADD)?;
//!     world.tick(1.0 / 60.0)?;
//!
//!     let position = world.entities().entity(child).map(|e| e.world_position);
//!     assert!(position.is_some_and(|p| (p - Vec3::new(1.0, 0.0, 0.0)).norm() < 1e-5));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod events;
pub mod foundation;
pub mod scene;

pub use error::{SceneError, SceneResult};

/// Common imports for scene users
pub mod prelude {
    pub use crate::{
        config::{Config, MapConfig, SceneConfig},
        ecs::{
            components::{CameraComponent, LightComponent, LightFactory, MeshComponent},
            Category, Component, ComponentDirtyFlags, ComponentHandle, DirtyFlags, Entity,
            EntityDescriptor, EntityHandle, EntityId, FacetFlags, FrameStats, Layer, World,
        },
        events::DelegateHandle,
        foundation::math::{Handedness, Mat4, Quat, Transform, Vec3},
        scene::Aabb,
        SceneError, SceneResult,
    };
}
