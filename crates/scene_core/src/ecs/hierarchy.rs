//! Hierarchy facet
//!
//! Parent, first-child and next-sibling links forming an intrusive n-ary tree
//! over entity handles. Tree algorithms live in the
//! [`EntityManager`](super::EntityManager); the facet is plain data.

use super::entity::EntityHandle;

slotmap::new_key_type! {
    /// Handle to a hierarchy facet slot
    pub struct HierarchyHandle;
}

/// Parent/child links of one entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyFacet {
    pub(crate) parent: Option<EntityHandle>,
    pub(crate) first_child: Option<EntityHandle>,
    pub(crate) sibling: Option<EntityHandle>,
    pub(crate) time_stamp: Option<u64>,
}

impl HierarchyFacet {
    /// Parent entity
    pub fn parent(&self) -> Option<EntityHandle> {
        self.parent
    }

    /// Head of the child list
    pub fn first_child(&self) -> Option<EntityHandle> {
        self.first_child
    }

    /// Next entity in the parent's child list
    pub fn sibling(&self) -> Option<EntityHandle> {
        self.sibling
    }

    /// Frame whose world matrix is cached, if any
    pub fn time_stamp(&self) -> Option<u64> {
        self.time_stamp
    }

    /// Whether the world matrix was computed during `frame`
    pub fn is_current(&self, frame: u64) -> bool {
        self.time_stamp == Some(frame)
    }

    /// Whether the entity has no parent
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub(crate) fn stamp(&mut self, frame: u64) {
        self.time_stamp = Some(frame);
    }

    pub(crate) fn invalidate(&mut self) {
        self.time_stamp = None;
    }
}
