//! Entity manager
//!
//! Owns the entity, hierarchy and transformation pools, the per-frame dirty
//! queue and the map. Mutations only flag entities; the map and world
//! matrices catch up in [`EntityManager::update`], which runs once per frame.
//!
//! World matrices follow the `T * R * S` convention: a child's world matrix is
//! `parent_world * child_local`. Hierarchy and child-list walks are iterative
//! and fail with [`SceneError::CycleDetected`] instead of looping.

use std::collections::{HashMap, HashSet};

use super::component::ComponentHandle;
use super::entity::{
    Category, DirtyFlags, Entity, EntityDescriptor, EntityHandle, EntityId, FacetFlags,
};
use super::hierarchy::{HierarchyFacet, HierarchyHandle};
use super::transformation::{TransformationFacet, TransformationHandle};
use crate::config::SceneConfig;
use crate::error::{SceneError, SceneResult};
use crate::events::{Delegate, DelegateHandle};
use crate::foundation::math::{compose_srt, translation_of, Handedness, Mat4, Transform, Vec3};
use crate::foundation::pool::Pool;
use crate::scene::{Aabb, Map};

/// Per-category post-processing run after an entity's world matrix is settled
pub trait CategoryHook {
    /// Called once per drained queue entry with the entity's current world matrix
    fn on_entity_updated(&mut self, entity: &mut Entity, world: &Mat4);
}

/// Keeps the world AABB centered on the world position
#[derive(Debug, Default, Clone, Copy)]
pub struct AabbFollowHook;

impl CategoryHook for AabbFollowHook {
    fn on_entity_updated(&mut self, entity: &mut Entity, world: &Mat4) {
        entity.world_aabb = entity.world_aabb.recentered(translation_of(world));
    }
}

/// Counters for one [`EntityManager::update`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number the update ran for
    pub frame: u64,
    /// Queue entries that referred to a live entity
    pub processed: usize,
    /// World matrices composed, ancestors included
    pub recomputed: usize,
    /// Entries whose world matrix was already current
    pub skipped: usize,
    /// Entities inserted into the map
    pub added: usize,
    /// Entities moved to another map folder
    pub relinked: usize,
    /// Entities taken out of the map
    pub removed: usize,
    /// Entities freed
    pub destroyed: usize,
}

/// Entity store, hierarchy operations and frame update driver
pub struct EntityManager {
    entities: Pool<EntityHandle, Entity>,
    hierarchies: Pool<HierarchyHandle, HierarchyFacet>,
    transformations: Pool<TransformationHandle, TransformationFacet>,
    entity_by_id: HashMap<EntityId, EntityHandle>,
    next_id: u64,
    dirty_queue: Vec<EntityHandle>,
    dirty_delegate: Delegate<Entity>,
    hooks: [Option<Box<dyn CategoryHook>>; Category::COUNT],
    map: Map,
    handedness: Handedness,
    composition_count: u64,
    released_components: Vec<ComponentHandle>,
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new(&SceneConfig::default())
    }
}

impl EntityManager {
    /// Create an empty manager with pools sized from `config`
    pub fn new(config: &SceneConfig) -> Self {
        log::info!(
            "Creating entity manager: {} entities, {} hierarchy facets, {} transformation facets",
            config.entity_capacity,
            config.hierarchy_capacity,
            config.transformation_capacity
        );

        if let Err(err) = config.validate() {
            log::error!("Entity manager built from an invalid configuration: {err}");
        }

        let mut hooks: [Option<Box<dyn CategoryHook>>; Category::COUNT] =
            std::array::from_fn(|_| None);
        hooks[Category::Actor.index()] = Some(Box::new(AabbFollowHook));
        hooks[Category::Light.index()] = Some(Box::new(AabbFollowHook));

        Self {
            entities: Pool::new("entities", config.entity_capacity),
            hierarchies: Pool::new("hierarchy facets", config.hierarchy_capacity),
            transformations: Pool::new("transformation facets", config.transformation_capacity),
            entity_by_id: HashMap::new(),
            next_id: 0,
            dirty_queue: Vec::new(),
            dirty_delegate: Delegate::new(),
            hooks,
            map: Map::new(&config.map),
            handedness: config.handedness,
            composition_count: 0,
            released_components: Vec::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Creation and lookup
    // ---------------------------------------------------------------------

    /// Allocate an entity and the facets `descriptor` asks for
    ///
    /// Without an explicit `id` (or with [`EntityId::INVALID`]) the next free
    /// id is used. An explicit id advances the counter past it. Once the
    /// counter reaches [`EntityId::INVALID`], automatic ids fail with
    /// [`SceneError::IdSpaceExhausted`]. The new entity has no dirty flags;
    /// mark it `CREATE | ADD` to place it.
    pub fn create_entity(
        &mut self,
        descriptor: &EntityDescriptor,
        id: Option<EntityId>,
    ) -> SceneResult<EntityHandle> {
        let id = match id.filter(|id| id.is_valid()) {
            Some(id) if self.entity_by_id.contains_key(&id) => {
                return Err(SceneError::DuplicateEntityId(id));
            }
            Some(id) => id,
            None => EntityId(self.next_id),
        };
        let next_id = id
            .0
            .checked_add(1)
            .filter(|_| id.is_valid())
            .ok_or(SceneError::IdSpaceExhausted)?;

        let handle = self
            .entities
            .allocate_with(|handle| Entity::new(handle, id, descriptor))?;

        let (hierarchy, transformation) = match self.allocate_facets(handle, descriptor.facets) {
            Ok(facets) => facets,
            Err(err) => {
                self.entities.free(handle);
                return Err(err);
            }
        };

        if let Some(entity) = self.entities.get_mut(handle) {
            entity.hierarchy = hierarchy;
            entity.transformation = transformation;
        }

        self.next_id = self.next_id.max(next_id);
        self.entity_by_id.insert(id, handle);

        log::debug!(
            "Created entity {id} ({:?}, kind {}, facets {:?})",
            descriptor.category,
            descriptor.kind,
            descriptor.facets
        );
        Ok(handle)
    }

    fn allocate_facets(
        &mut self,
        owner: EntityHandle,
        facets: FacetFlags,
    ) -> SceneResult<(Option<HierarchyHandle>, Option<TransformationHandle>)> {
        let hierarchy = if facets.contains(FacetFlags::HIERARCHY) {
            Some(self.hierarchies.allocate_default()?)
        } else {
            None
        };

        let transformation = if facets.contains(FacetFlags::TRANSFORMATION) {
            match self.transformations.allocate(TransformationFacet::new(owner)) {
                Ok(handle) => Some(handle),
                Err(err) => {
                    if let Some(hierarchy) = hierarchy {
                        self.hierarchies.free(hierarchy);
                    }
                    return Err(err.into());
                }
            }
        } else {
            None
        };

        Ok((hierarchy, transformation))
    }

    /// Release an entity, its facets and its map slot
    ///
    /// Runs from the deferred destroy path of [`EntityManager::update`]. The
    /// entity is detached from its parent, and its children become roots that
    /// keep their world pose. Attached components are handed back through
    /// [`EntityManager::take_released_components`].
    pub(crate) fn free_entity(&mut self, handle: EntityHandle) -> SceneResult<Entity> {
        let entity = self.entity(handle).ok_or(SceneError::StaleEntity(handle))?;
        let (id, in_map, hierarchy) = (entity.id, entity.is_in_map(), entity.hierarchy);

        if in_map {
            self.map.remove_entity(&mut self.entities, handle);
        }

        if hierarchy.is_some() {
            for child in self.children(handle)? {
                let world = self.evaluate_world_matrix(child)?;
                self.unlink_from_parent(child)?;
                self.set_local_from_world(child, &world);
            }
            self.unlink_from_parent(handle)?;
        }

        let mut entity = self
            .entities
            .free(handle)
            .ok_or(SceneError::StaleEntity(handle))?;

        if let Some(hierarchy) = entity.hierarchy.take() {
            self.hierarchies.free(hierarchy);
        }
        if let Some(transformation) = entity.transformation.take() {
            self.transformations.free(transformation);
        }
        self.entity_by_id.remove(&id);
        self.released_components.append(&mut entity.components);

        log::debug!("Freed entity {id}");
        Ok(entity)
    }

    /// Borrow an entity
    pub fn entity(&self, handle: EntityHandle) -> Option<&Entity> {
        self.entities.get(handle)
    }

    /// Mutably borrow an entity
    pub fn entity_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        self.entities.get_mut(handle)
    }

    /// Resolve an entity by its numeric id
    pub fn entity_by_id(&self, id: EntityId) -> Option<EntityHandle> {
        self.entity_by_id.get(&id).copied()
    }

    /// Whether `handle` refers to a live entity
    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.entities.contains(handle)
    }

    /// Every live entity, in pool order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().map(|(_, entity)| entity)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entity is live
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity pool capacity
    pub fn capacity(&self) -> usize {
        self.entities.capacity()
    }

    /// Hierarchy facet of an entity
    pub fn hierarchy(&self, handle: EntityHandle) -> Option<&HierarchyFacet> {
        self.entity(handle)
            .and_then(|entity| entity.hierarchy)
            .and_then(|facet| self.hierarchies.get(facet))
    }

    /// Transformation facet of an entity
    pub fn transformation(&self, handle: EntityHandle) -> Option<&TransformationFacet> {
        self.entity(handle)
            .and_then(|entity| entity.transformation)
            .and_then(|facet| self.transformations.get(facet))
    }

    /// Mutable transformation facet; mark the entity `MOVE` after editing
    pub fn transformation_mut(&mut self, handle: EntityHandle) -> Option<&mut TransformationFacet> {
        let facet = self.entity(handle).and_then(|entity| entity.transformation)?;
        self.transformations.get_mut(facet)
    }

    /// Parent of an entity
    pub fn parent(&self, handle: EntityHandle) -> Option<EntityHandle> {
        self.hierarchy(handle).and_then(HierarchyFacet::parent)
    }

    /// Children of an entity, in sibling order
    pub fn children(&self, handle: EntityHandle) -> SceneResult<Vec<EntityHandle>> {
        let mut children = Vec::new();
        let mut current = self.hierarchy(handle).and_then(HierarchyFacet::first_child);

        while let Some(child) = current {
            if children.len() > self.entities.len() {
                return Err(SceneError::CycleDetected(self.id_of(handle)));
            }
            children.push(child);
            current = self.hierarchy(child).and_then(HierarchyFacet::sibling);
        }

        Ok(children)
    }

    /// World matrix as of the last update
    ///
    /// Entities without a transformation facet report a translation to their
    /// world position.
    pub fn world_matrix(&self, handle: EntityHandle) -> Option<Mat4> {
        self.entity(handle).map(|entity| self.world_of(entity))
    }

    /// Euler angle convention of this manager
    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Set an entity's local rotation from Euler angles in the configured convention
    pub fn set_euler_angles(&mut self, handle: EntityHandle, euler: Vec3) -> SceneResult<()> {
        let handedness = self.handedness;
        let id = self.id_of(handle);
        self.transformation_mut(handle)
            .ok_or(SceneError::MissingFacet { id, facet: "transformation" })?
            .set_euler_angles(euler, handedness);
        Ok(())
    }

    /// Local rotation of an entity as Euler angles in the configured convention
    pub fn euler_angles(&self, handle: EntityHandle) -> Option<Vec3> {
        self.transformation(handle)
            .map(|facet| facet.euler_angles(self.handedness))
    }

    /// Number of world matrix compositions performed so far
    pub fn composition_count(&self) -> u64 {
        self.composition_count
    }

    /// Entities waiting for the next update, in marking order
    pub fn dirty_queue(&self) -> &[EntityHandle] {
        &self.dirty_queue
    }

    // ---------------------------------------------------------------------
    // Dirty propagation
    // ---------------------------------------------------------------------

    /// Flag an entity and all of its descendants
    ///
    /// Each entity reached gets `flags` added, is appended to the dirty queue
    /// and is published to every dirty entity handler, parents before
    /// children.
    pub fn mark_entity_as_dirty(&mut self, handle: EntityHandle, flags: DirtyFlags) -> SceneResult<()> {
        if !self.entities.contains(handle) {
            return Err(SceneError::StaleEntity(handle));
        }

        let mut stack = vec![handle];
        let mut visited = HashSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                return Err(SceneError::CycleDetected(self.id_of(current)));
            }

            let Some(entity) = self.entities.get_mut(current) else {
                continue;
            };
            entity.dirty |= flags;
            self.dirty_queue.push(current);
            self.dirty_delegate.notify(entity);

            let children = self.children(current)?;
            stack.extend(children.into_iter().rev());
        }

        Ok(())
    }

    /// Listen for entities being marked dirty
    pub fn register_dirty_entity_handler<F>(&mut self, handler: F) -> DelegateHandle
    where
        F: FnMut(&Entity) + 'static,
    {
        let handle = self.dirty_delegate.register(handler);
        log::debug!("Registered dirty entity handler {}", handle.raw());
        handle
    }

    /// Stop listening; returns `false` for an unknown handle
    pub fn unregister_dirty_entity_handler(&mut self, handle: DelegateHandle) -> bool {
        let removed = self.dirty_delegate.unregister(handle);
        if !removed {
            log::warn!("Dirty entity handler {} was not registered", handle.raw());
        }
        removed
    }

    /// Replace the hook run for `category`, returning the previous one
    pub fn set_category_hook(
        &mut self,
        category: Category,
        hook: Option<Box<dyn CategoryHook>>,
    ) -> Option<Box<dyn CategoryHook>> {
        std::mem::replace(&mut self.hooks[category.index()], hook)
    }

    // ---------------------------------------------------------------------
    // Frame update
    // ---------------------------------------------------------------------

    /// Drain the dirty queue for `frame`
    ///
    /// For each queued entity, in order: settle its world matrix (ancestors
    /// first, each at most once per frame), run the category hook, apply the
    /// map flags and clear the flags. Entities flagged `DESTROY` are freed.
    /// An error on one entity does not stop the drain; the first error is
    /// returned after the queue is empty.
    pub fn update(&mut self, frame: u64) -> SceneResult<FrameStats> {
        let queue = std::mem::take(&mut self.dirty_queue);
        let compositions_before = self.composition_count;
        let mut stats = FrameStats {
            frame,
            ..FrameStats::default()
        };
        let mut first_error = None;

        for handle in queue {
            let Some(flags) = self.entity(handle).map(|entity| entity.dirty) else {
                log::trace!("Skipping freed entity {handle:?} in dirty queue");
                continue;
            };
            stats.processed += 1;

            match self.update_entity(handle, frame) {
                Ok(true) => {}
                Ok(false) => stats.skipped += 1,
                Err(err) => {
                    log::error!("Failed to update entity {}: {err}", self.id_of(handle));
                    first_error.get_or_insert(err);
                }
            }

            self.run_category_hook(handle);

            if let Err(err) = self.apply_map_flags(handle, flags, &mut stats) {
                log::error!("Failed to apply {flags:?} to entity {}: {err}", self.id_of(handle));
                first_error.get_or_insert(err);
            }
        }

        stats.recomputed = usize::try_from(self.composition_count - compositions_before)
            .unwrap_or(usize::MAX);

        log::trace!("Frame {frame} update: {stats:?}");

        match first_error {
            Some(err) => Err(err),
            None => Ok(stats),
        }
    }

    /// Settle one entity's world matrix for `frame`
    ///
    /// Ancestors whose matrix is stale are composed first, top-down. Returns
    /// `false` when the entity's matrix was already current for `frame`.
    pub fn update_entity(&mut self, handle: EntityHandle, frame: u64) -> SceneResult<bool> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut parent_world = Mat4::identity();
        let mut current = handle;

        loop {
            let entity = self.entity(current).ok_or(SceneError::StaleEntity(current))?;
            if !visited.insert(current) {
                return Err(SceneError::CycleDetected(entity.id));
            }

            let is_current = entity
                .hierarchy
                .and_then(|facet| self.hierarchies.get(facet))
                .is_some_and(|facet| facet.is_current(frame));
            if is_current {
                parent_world = self.world_of(entity);
                break;
            }

            chain.push(current);
            match self.composing_parent(entity) {
                Some(parent) => current = parent,
                None => break,
            }
        }

        if chain.is_empty() {
            return Ok(false);
        }

        for &link in chain.iter().rev() {
            let local = self
                .entity(link)
                .map(|entity| self.local_matrix(entity))
                .ok_or(SceneError::StaleEntity(link))?;
            let world = parent_world * local;
            self.store_world(link, world, frame);
            parent_world = world;
        }

        Ok(true)
    }

    fn store_world(&mut self, handle: EntityHandle, world: Mat4, frame: u64) {
        let Some(entity) = self.entities.get_mut(handle) else {
            return;
        };
        entity.world_position = translation_of(&world);

        if let Some(facet) = entity.transformation.and_then(|t| self.transformations.get_mut(t)) {
            facet.set_world_matrix(world);
        }
        if let Some(facet) = entity.hierarchy.and_then(|h| self.hierarchies.get_mut(h)) {
            facet.stamp(frame);
        }
        self.composition_count += 1;
    }

    fn run_category_hook(&mut self, handle: EntityHandle) {
        let Some(entity) = self.entities.get(handle) else {
            return;
        };
        let world = self.world_of(entity);
        let category = entity.category;

        if let (Some(hook), Some(entity)) = (
            self.hooks[category.index()].as_mut(),
            self.entities.get_mut(handle),
        ) {
            hook.on_entity_updated(entity, &world);
        }
    }

    fn apply_map_flags(
        &mut self,
        handle: EntityHandle,
        flags: DirtyFlags,
        stats: &mut FrameStats,
    ) -> SceneResult<()> {
        let in_map = self.entity(handle).is_some_and(Entity::is_in_map);

        if flags.intersects(DirtyFlags::REMOVE | DirtyFlags::DESTROY) {
            if self.map.remove_entity(&mut self.entities, handle) {
                stats.removed += 1;
            }
            if flags.contains(DirtyFlags::DESTROY) {
                self.free_entity(handle)?;
                stats.destroyed += 1;
                return Ok(());
            }
        } else if flags.contains(DirtyFlags::ADD) && !in_map {
            if self.map.add_entity(&mut self.entities, handle) {
                stats.added += 1;
            }
        } else if flags.contains(DirtyFlags::MOVE)
            && in_map
            && self.map.move_entity(&mut self.entities, handle)
        {
            stats.relinked += 1;
        }

        if let Some(entity) = self.entities.get_mut(handle) {
            entity.dirty = DirtyFlags::empty();
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Hierarchy
    // ---------------------------------------------------------------------

    /// Make `child` the first child of `parent`, keeping its world pose
    ///
    /// Both entities need a hierarchy facet and the child a transformation
    /// facet. The child's local transform becomes
    /// `inverse(parent_world) * child_world`, where both world matrices are
    /// evaluated from the current local transforms. The child is marked
    /// `MOVE`.
    ///
    /// The pose is kept exactly only while the ancestors' scale is uniform.
    /// Non-uniform scale under a rotation yields a shear that a local
    /// position/rotation/scale cannot hold, so the child's world matrix may
    /// drift.
    pub fn attach(&mut self, parent: EntityHandle, child: EntityHandle) -> SceneResult<()> {
        let parent_id = self.entity(parent).ok_or(SceneError::StaleEntity(parent))?.id;
        let child_id = self.entity(child).ok_or(SceneError::StaleEntity(child))?.id;

        if parent == child {
            return Err(SceneError::SelfAttach(child_id));
        }

        let parent_facet = self.require_hierarchy(parent)?;
        let child_facet = self.require_hierarchy(child)?;
        if self.transformation(child).is_none() {
            return Err(SceneError::MissingFacet {
                id: child_id,
                facet: "transformation",
            });
        }

        let mut visited = HashSet::new();
        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current == child {
                return Err(SceneError::HierarchyCycle {
                    parent: parent_id,
                    child: child_id,
                });
            }
            if !visited.insert(current) {
                return Err(SceneError::CycleDetected(self.id_of(current)));
            }
            ancestor = self.parent(current);
        }

        if self.parent(child) == Some(parent) {
            return Ok(());
        }

        let child_world = self.evaluate_world_matrix(child)?;
        let parent_world = self.evaluate_world_matrix(parent)?;

        self.unlink_from_parent(child)?;

        if let Some([parent_hierarchy, child_hierarchy]) =
            self.hierarchies.get_disjoint_mut([parent_facet, child_facet])
        {
            child_hierarchy.parent = Some(parent);
            child_hierarchy.sibling = parent_hierarchy.first_child.replace(child);
        }

        let local = match parent_world.try_inverse() {
            Some(inverse) => inverse * child_world,
            None => {
                log::warn!("Parent {parent_id} has a singular world matrix; keeping child world as local");
                child_world
            }
        };
        self.set_local_from_world(child, &local);

        log::debug!("Attached {child_id} to {parent_id}");
        self.mark_entity_as_dirty(child, DirtyFlags::MOVE)
    }

    /// Unlink `child` from its parent, keeping its world pose
    ///
    /// The child's local transform becomes its evaluated world transform and
    /// the child is marked `MOVE`. Detaching a root does nothing. As with
    /// [`attach`](Self::attach), a sheared world matrix cannot be kept.
    pub fn detach(&mut self, child: EntityHandle) -> SceneResult<()> {
        let child_id = self.entity(child).ok_or(SceneError::StaleEntity(child))?.id;
        self.require_hierarchy(child)?;

        if self.parent(child).is_none() {
            log::warn!("Entity {child_id} has no parent to detach from");
            return Ok(());
        }

        let world = self.evaluate_world_matrix(child)?;
        self.unlink_from_parent(child)?;
        self.set_local_from_world(child, &world);

        log::debug!("Detached {child_id}");
        self.mark_entity_as_dirty(child, DirtyFlags::MOVE)
    }

    /// Compose the world matrix from current local transforms, ignoring the cache
    pub fn evaluate_world_matrix(&self, handle: EntityHandle) -> SceneResult<Mat4> {
        let mut world = Mat4::identity();
        let mut visited = HashSet::new();
        let mut current = Some(handle);

        while let Some(link) = current {
            let entity = self.entity(link).ok_or(SceneError::StaleEntity(link))?;
            if !visited.insert(link) {
                return Err(SceneError::CycleDetected(entity.id));
            }
            world = self.local_matrix(entity) * world;
            current = self.composing_parent(entity);
        }

        Ok(world)
    }

    fn unlink_from_parent(&mut self, child: EntityHandle) -> SceneResult<()> {
        let Some(parent) = self.parent(child) else {
            return Ok(());
        };
        let next = self.hierarchy(child).and_then(HierarchyFacet::sibling);

        if self.hierarchy(parent).and_then(HierarchyFacet::first_child) == Some(child) {
            if let Some(facet) = self.hierarchy_mut(parent) {
                facet.first_child = next;
            }
        } else {
            let mut steps = 0;
            let mut previous = self.hierarchy(parent).and_then(HierarchyFacet::first_child);
            while let Some(current) = previous {
                steps += 1;
                if steps > self.entities.len() {
                    return Err(SceneError::CycleDetected(self.id_of(parent)));
                }
                let sibling = self.hierarchy(current).and_then(HierarchyFacet::sibling);
                if sibling == Some(child) {
                    if let Some(facet) = self.hierarchy_mut(current) {
                        facet.sibling = next;
                    }
                    break;
                }
                previous = sibling;
            }
        }

        if let Some(facet) = self.hierarchy_mut(child) {
            facet.parent = None;
            facet.sibling = None;
        }
        Ok(())
    }

    fn set_local_from_world(&mut self, handle: EntityHandle, matrix: &Mat4) {
        let local = Transform::from_matrix(matrix);
        if let Some(facet) = self.transformation_mut(handle) {
            facet.set_local_transform(&local);
        }
        if let Some(facet) = self.hierarchy_mut(handle) {
            facet.invalidate();
        }
    }

    fn require_hierarchy(&self, handle: EntityHandle) -> SceneResult<HierarchyHandle> {
        self.entity(handle)
            .and_then(|entity| entity.hierarchy)
            .ok_or_else(|| SceneError::MissingFacet {
                id: self.id_of(handle),
                facet: "hierarchy",
            })
    }

    pub(crate) fn hierarchy_mut(&mut self, handle: EntityHandle) -> Option<&mut HierarchyFacet> {
        let facet = self.entity(handle).and_then(|entity| entity.hierarchy)?;
        self.hierarchies.get_mut(facet)
    }

    /// Parent used for world composition: only entities with both a
    /// transformation facet and a parent inherit a parent's matrix
    fn composing_parent(&self, entity: &Entity) -> Option<EntityHandle> {
        entity.transformation?;
        entity
            .hierarchy
            .and_then(|facet| self.hierarchies.get(facet))
            .and_then(HierarchyFacet::parent)
    }

    /// Matrix an entity contributes on top of its parent's world matrix
    fn local_matrix(&self, entity: &Entity) -> Mat4 {
        match entity.transformation.and_then(|t| self.transformations.get(t)) {
            Some(facet) if entity.hierarchy.is_some() => facet.local_matrix(),
            Some(facet) => compose_srt(&entity.world_position, &facet.rotation, &facet.scale),
            None => Mat4::new_translation(&entity.world_position),
        }
    }

    fn world_of(&self, entity: &Entity) -> Mat4 {
        entity
            .transformation
            .and_then(|t| self.transformations.get(t))
            .map_or_else(
                || Mat4::new_translation(&entity.world_position),
                |facet| *facet.world_matrix(),
            )
    }

    fn id_of(&self, handle: EntityHandle) -> EntityId {
        self.entity(handle).map_or(EntityId::INVALID, Entity::id)
    }

    // ---------------------------------------------------------------------
    // Map
    // ---------------------------------------------------------------------

    /// Region map
    pub fn map(&self) -> &Map {
        &self.map
    }

    /// Placed entities of `category`
    pub fn map_entities(&self, category: Category) -> impl Iterator<Item = &Entity> {
        self.map.entities(&self.entities, category)
    }

    /// Placed entities of `category` whose bounds intersect `bounds`
    pub fn entities_in_aabb(&self, category: Category, bounds: Aabb) -> impl Iterator<Item = &Entity> {
        self.map.entities_in_aabb(&self.entities, category, bounds)
    }

    /// Placed entities of `category` within `radius` of `center`
    pub fn entities_in_radius(
        &self,
        category: Category,
        center: Vec3,
        radius: f32,
    ) -> impl Iterator<Item = &Entity> {
        self.map.entities_in_radius(&self.entities, category, center, radius)
    }

    // ---------------------------------------------------------------------
    // Housekeeping
    // ---------------------------------------------------------------------

    /// Components whose host entity was freed since the last call
    pub(crate) fn take_released_components(&mut self) -> Vec<ComponentHandle> {
        std::mem::take(&mut self.released_components)
    }

    /// Free every entity and facet without notifying handlers
    ///
    /// Ids keep counting up from where they were.
    pub fn clear(&mut self) {
        self.map.clear(&mut self.entities);
        for (_, entity) in self.entities.iter_mut() {
            self.released_components.append(&mut entity.components);
        }
        self.entities.clear();
        self.hierarchies.clear();
        self.transformations.clear();
        self.entity_by_id.clear();
        self.dirty_queue.clear();
        log::debug!("Cleared all entities");
    }
}

impl std::fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityManager")
            .field("entities", &self.entities)
            .field("hierarchies", &self.hierarchies)
            .field("transformations", &self.transformations)
            .field("next_id", &self.next_id)
            .field("dirty_queue", &self.dirty_queue.len())
            .field("dirty_handlers", &self.dirty_delegate.len())
            .field("map_entities", &self.map.entity_count())
            .finish_non_exhaustive()
    }
}
