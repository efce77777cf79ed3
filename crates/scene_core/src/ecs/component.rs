//! Component trait and bookkeeping
//!
//! Every pooled component is stored as a [`ComponentEntry`]: the user payload
//! plus a [`ComponentHeader`] carrying its runtime type, dirty flags, active
//! flag and host entity back-reference.

use std::fmt;
use std::ops::{Deref, DerefMut};

use bitflags::bitflags;

use super::entity::EntityHandle;
use super::entity_manager::EntityManager;

/// Marker trait for components
pub trait Component: 'static + Send + Sync {}

/// Dense runtime type index, assigned when a component type is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub(crate) u32);

impl ComponentTypeId {
    /// Position in the registration table
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Numeric component identifier, unique within a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

slotmap::new_key_type! {
    /// Slot in a per-type component pool
    pub struct ComponentKey;

    /// Handle to a component-side facet (e.g. a renderer shadow object)
    pub struct ComponentFacetKey;
}

/// Type-tagged handle to any pooled component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentHandle {
    /// Pool the component lives in
    pub type_id: ComponentTypeId,
    /// Slot within that pool
    pub key: ComponentKey,
}

bitflags! {
    /// Pending component changes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComponentDirtyFlags: u8 {
        /// Component was just allocated
        const CREATE = 0x01;
        /// Settings changed
        const INFO = 0x02;
        /// Component is about to be released
        const DESTROY = 0x04;
    }
}

/// Facet slots per component
pub const MAX_COMPONENT_FACETS: usize = 4;

/// Type-independent component state
#[derive(Debug, Clone)]
pub struct ComponentHeader {
    pub(crate) handle: ComponentHandle,
    pub(crate) id: ComponentId,
    pub(crate) type_name: &'static str,
    pub(crate) dirty: ComponentDirtyFlags,
    pub(crate) host: Option<EntityHandle>,

    /// Disabled components are skipped by consumers
    pub is_active: bool,

    /// Consumer-side facets indexed by a small category number
    pub facets: [Option<ComponentFacetKey>; MAX_COMPONENT_FACETS],
}

impl ComponentHeader {
    pub(crate) fn new(handle: ComponentHandle, id: ComponentId, type_name: &'static str) -> Self {
        Self {
            handle,
            id,
            type_name,
            dirty: ComponentDirtyFlags::empty(),
            host: None,
            is_active: true,
            facets: [None; MAX_COMPONENT_FACETS],
        }
    }

    /// Pool handle
    pub fn handle(&self) -> ComponentHandle {
        self.handle
    }

    /// Unique id
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Runtime type
    pub fn type_id(&self) -> ComponentTypeId {
        self.handle.type_id
    }

    /// Rust type name of the payload
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Flags being published; only non-empty inside a dirty notification
    pub fn dirty_flags(&self) -> ComponentDirtyFlags {
        self.dirty
    }

    /// Host entity
    pub fn host(&self) -> Option<EntityHandle> {
        self.host
    }

    /// Active, hosted, and the host entity exists and is active
    pub fn is_active_and_usable(&self, entities: &EntityManager) -> bool {
        self.is_active
            && self
                .host
                .and_then(|host| entities.entity(host))
                .is_some_and(|entity| entity.is_active)
    }
}

/// Pooled component: header plus payload
#[derive(Debug, Clone)]
pub struct ComponentEntry<T> {
    /// Bookkeeping
    pub header: ComponentHeader,
    /// User payload
    pub data: T,
}

impl<T> Deref for ComponentEntry<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for ComponentEntry<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}
