//! Entity and component stores
//!
//! Entities are pooled scene objects with optional hierarchy and
//! transformation facets; components are typed payloads pooled per type and
//! hosted by at most one entity. Both are owned by a [`World`].

pub mod component;
pub mod component_manager;
pub mod components;
pub mod entity;
pub mod entity_manager;
pub mod hierarchy;
pub mod transformation;
pub mod world;

#[cfg(test)]
mod tests;

pub use component::{
    Component, ComponentDirtyFlags, ComponentEntry, ComponentHandle, ComponentHeader, ComponentId,
    ComponentTypeId,
};
pub use component_manager::ComponentManager;
pub use entity::{
    Category, DetailSlot, DirtyFlags, Entity, EntityDescriptor, EntityHandle, EntityId,
    FacetFlags, Layer,
};
pub use entity_manager::{AabbFollowHook, CategoryHook, EntityManager, FrameStats};
pub use hierarchy::{HierarchyFacet, HierarchyHandle};
pub use transformation::{TransformationFacet, TransformationHandle};
pub use world::World;
