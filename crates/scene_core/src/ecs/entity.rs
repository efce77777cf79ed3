//! Entity implementation
//!
//! An [`Entity`] is the addressable object placed in a map. It is owned by
//! the entity pool of an [`EntityManager`](super::EntityManager) and refers
//! to its facets, its components and its map folder through handles only.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::component::ComponentHandle;
use super::hierarchy::HierarchyHandle;
use super::transformation::TransformationHandle;
use crate::foundation::math::Vec3;
use crate::scene::{Aabb, FolderId};

slotmap::new_key_type! {
    /// Generational handle to an entity slot
    pub struct EntityHandle;

    /// Handle to a category-specific detail facet owned by an outside store
    pub struct DetailFacetKey;
}

/// Numeric entity identifier, unique within a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Sentinel for "no id"
    pub const INVALID: Self = Self(u64::MAX);

    /// Whether this is a usable id
    pub const fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            f.write_str("#invalid")
        }
    }
}

bitflags! {
    /// Pending changes drained by the frame update
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u8 {
        /// Entity was just created
        const CREATE = 0x01;
        /// Insert into the map
        const ADD = 0x02;
        /// Transform changed; recompute and reposition
        const MOVE = 0x04;
        /// Remove from the map
        const REMOVE = 0x08;
        /// Free after removal
        const DESTROY = 0x10;
        /// A detail facet changed
        const DETAIL = 0x20;
    }
}

bitflags! {
    /// Optional facets requested at creation
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FacetFlags: u8 {
        /// Parent/child links
        const HIERARCHY = 0x01;
        /// Local SRT and world matrix
        const TRANSFORMATION = 0x02;
    }
}

bitflags! {
    /// Culling layers; the empty set is the default layer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Layer: u8 {
        /// Augmented reality content
        const AR = 0x01;
        /// Transparent effects
        const TRANSPARENT_FX = 0x02;
        /// Skipped by ray casts
        const IGNORE_RAYCAST = 0x04;
        /// Water surfaces
        const WATER = 0x08;
        /// User interface
        const UI = 0x10;
    }
}

impl Layer {
    /// Default layer
    pub const DEFAULT: Self = Self::empty();
}

/// Entity category; selects the map folder and the update hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    /// Meshes, cameras and other placed objects
    #[default]
    Actor,
    /// Light sources
    Light,
    /// Particle and effect emitters
    Fx,
    /// Objects owned by platform plugins
    Plugin,
}

impl Category {
    /// Number of categories
    pub const COUNT: usize = 4;

    /// All categories in folder order
    pub const ALL: [Self; Self::COUNT] = [Self::Actor, Self::Light, Self::Fx, Self::Plugin];

    /// Dense index for per-category tables
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Detail facet slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailSlot {
    /// Gameplay data
    Data = 0,
    /// Renderer-side object
    Graphic = 1,
    /// Script instance
    Script = 2,
}

/// Number of detail facet slots per entity
pub const DETAIL_SLOT_COUNT: usize = 3;

/// What to create
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Category of the new entity
    pub category: Category,
    /// Sub-kind within the category
    pub kind: u8,
    /// Facets to allocate
    pub facets: FacetFlags,
}

impl EntityDescriptor {
    /// Descriptor with both hierarchy and transformation facets
    pub fn node(category: Category) -> Self {
        Self {
            category,
            kind: 0,
            facets: FacetFlags::HIERARCHY | FacetFlags::TRANSFORMATION,
        }
    }

    /// Descriptor without facets; placed by its world position only
    pub fn flat(category: Category) -> Self {
        Self {
            category,
            kind: 0,
            facets: FacetFlags::empty(),
        }
    }

    /// Set the sub-kind
    #[must_use]
    pub fn with_kind(mut self, kind: u8) -> Self {
        self.kind = kind;
        self
    }
}

/// Addressable scene object
#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) handle: EntityHandle,
    pub(crate) id: EntityId,
    pub(crate) dirty: DirtyFlags,
    pub(crate) category: Category,
    pub(crate) kind: u8,
    pub(crate) hierarchy: Option<HierarchyHandle>,
    pub(crate) transformation: Option<TransformationHandle>,
    pub(crate) components: Vec<ComponentHandle>,

    // Map folder membership
    pub(crate) folder: Option<FolderId>,
    pub(crate) next: Option<EntityHandle>,
    pub(crate) previous: Option<EntityHandle>,

    /// Display name
    pub name: String,
    /// Culling layer
    pub layer: Layer,
    /// Whether the entity moves at runtime
    pub is_dynamic: bool,
    /// Whether editor picking may select it
    pub is_selectable: bool,
    /// Inactive entities disable their components
    pub is_active: bool,
    /// World-space bounds, refreshed by the category hook
    pub world_aabb: Aabb,
    /// World-space position; the source of truth for entities without a
    /// hierarchy facet, otherwise a cache of the world matrix translation
    pub world_position: Vec3,
    /// Category-specific facets owned by outside stores
    pub detail_facets: [Option<DetailFacetKey>; DETAIL_SLOT_COUNT],
}

impl Entity {
    pub(crate) fn new(handle: EntityHandle, id: EntityId, descriptor: &EntityDescriptor) -> Self {
        Self {
            handle,
            id,
            dirty: DirtyFlags::empty(),
            category: descriptor.category,
            kind: descriptor.kind,
            hierarchy: None,
            transformation: None,
            components: Vec::new(),
            folder: None,
            next: None,
            previous: None,
            name: String::new(),
            layer: Layer::DEFAULT,
            is_dynamic: false,
            is_selectable: true,
            is_active: true,
            world_aabb: Aabb::default(),
            world_position: Vec3::zeros(),
            detail_facets: [None; DETAIL_SLOT_COUNT],
        }
    }

    /// Pool handle
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    /// Unique id
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Flags pending for the next update
    pub fn dirty_flags(&self) -> DirtyFlags {
        self.dirty
    }

    /// Category
    pub fn category(&self) -> Category {
        self.category
    }

    /// Sub-kind within the category
    pub fn kind(&self) -> u8 {
        self.kind
    }

    /// Facets this entity was created with
    pub fn facets(&self) -> FacetFlags {
        let mut facets = FacetFlags::empty();
        facets.set(FacetFlags::HIERARCHY, self.hierarchy.is_some());
        facets.set(FacetFlags::TRANSFORMATION, self.transformation.is_some());
        facets
    }

    /// Hierarchy facet handle
    pub fn hierarchy(&self) -> Option<HierarchyHandle> {
        self.hierarchy
    }

    /// Transformation facet handle
    pub fn transformation(&self) -> Option<TransformationHandle> {
        self.transformation
    }

    /// Attached components
    pub fn components(&self) -> &[ComponentHandle] {
        &self.components
    }

    /// Map folder the entity is linked into, if any
    pub fn folder(&self) -> Option<FolderId> {
        self.folder
    }

    /// Whether the entity is currently placed in the map
    pub fn is_in_map(&self) -> bool {
        self.folder.is_some()
    }

    /// Detail facet in `slot`
    pub fn detail_facet(&self, slot: DetailSlot) -> Option<DetailFacetKey> {
        self.detail_facets[slot as usize]
    }

    /// Store a detail facet handle in `slot`
    pub fn set_detail_facet(&mut self, slot: DetailSlot, facet: Option<DetailFacetKey>) {
        self.detail_facets[slot as usize] = facet;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_values_are_stable() {
        assert_eq!(DirtyFlags::CREATE.bits(), 0x01);
        assert_eq!(DirtyFlags::DESTROY.bits(), 0x10);
        assert_eq!(FacetFlags::TRANSFORMATION.bits(), 0x02);
        assert_eq!(Layer::UI.bits(), 16);
        assert!(Layer::DEFAULT.is_empty());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(EntityId(42).to_string(), "#42");
        assert_eq!(EntityId::INVALID.to_string(), "#invalid");
        assert!(!EntityId::INVALID.is_valid());
    }

    #[test]
    fn test_detail_facet_slots_are_independent() {
        let mut store = slotmap::SlotMap::<DetailFacetKey, &str>::with_key();
        let data = store.insert("stats");
        let script = store.insert("ai");
        let mut entity = Entity::new(
            EntityHandle::default(),
            EntityId(1),
            &EntityDescriptor::flat(Category::Actor),
        );
        assert!(entity.detail_facets.iter().all(Option::is_none));

        entity.set_detail_facet(DetailSlot::Data, Some(data));
        entity.set_detail_facet(DetailSlot::Script, Some(script));
        assert_eq!(entity.detail_facet(DetailSlot::Data), Some(data));
        assert_eq!(entity.detail_facet(DetailSlot::Graphic), None);
        assert_eq!(entity.detail_facet(DetailSlot::Script), Some(script));
        assert_eq!(store[entity.detail_facet(DetailSlot::Script).unwrap()], "ai");

        entity.set_detail_facet(DetailSlot::Data, None);
        assert_eq!(entity.detail_facet(DetailSlot::Data), None);
        assert_eq!(entity.detail_facet(DetailSlot::Script), Some(script));
        assert_eq!(entity.detail_facets.len(), DETAIL_SLOT_COUNT);
    }

    #[test]
    fn test_category_indices_are_dense() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }
}
