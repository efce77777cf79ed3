//! Component manager
//!
//! Owns one fixed-capacity pool per registered component type. Types are
//! registered explicitly with [`ComponentManager::register`] or implicitly on
//! first allocation; either way a type gets one dense [`ComponentTypeId`] for
//! the lifetime of the manager.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use super::component::{
    Component, ComponentDirtyFlags, ComponentEntry, ComponentHandle, ComponentHeader, ComponentId,
    ComponentKey, ComponentTypeId,
};
use super::entity::EntityHandle;
use crate::config::SceneConfig;
use crate::error::{SceneError, SceneResult};
use crate::events::{Delegate, DelegateHandle};
use crate::foundation::pool::Pool;

type TypedPool<T> = Pool<ComponentKey, ComponentEntry<T>>;

/// Operations the manager needs on a pool without knowing its payload type
trait ErasedPool {
    fn header(&self, key: ComponentKey) -> Option<&ComponentHeader>;
    fn header_mut(&mut self, key: ComponentKey) -> Option<&mut ComponentHeader>;
    fn headers_mut(&mut self) -> Box<dyn Iterator<Item = &mut ComponentHeader> + '_>;
    fn release(&mut self, key: ComponentKey) -> bool;
    fn len(&self) -> usize;
    fn capacity(&self) -> usize;
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedPool for TypedPool<T> {
    fn header(&self, key: ComponentKey) -> Option<&ComponentHeader> {
        self.get(key).map(|entry| &entry.header)
    }

    fn header_mut(&mut self, key: ComponentKey) -> Option<&mut ComponentHeader> {
        self.get_mut(key).map(|entry| &mut entry.header)
    }

    fn headers_mut(&mut self) -> Box<dyn Iterator<Item = &mut ComponentHeader> + '_> {
        Box::new(self.iter_mut().map(|(_, entry)| &mut entry.header))
    }

    fn release(&mut self, key: ComponentKey) -> bool {
        self.free(key).is_some()
    }

    fn len(&self) -> usize {
        Pool::len(self)
    }

    fn capacity(&self) -> usize {
        Pool::capacity(self)
    }

    fn clear(&mut self) {
        Pool::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct ComponentType {
    name: &'static str,
    pool: Box<dyn ErasedPool>,
}

/// Per-type component pools, id lookup and change notification
pub struct ComponentManager {
    config: SceneConfig,
    types: Vec<ComponentType>,
    type_ids: HashMap<TypeId, ComponentTypeId>,
    by_id: HashMap<ComponentId, ComponentHandle>,
    next_id: u64,
    dirty_delegate: Delegate<ComponentHeader>,
}

impl Default for ComponentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentManager {
    /// Manager sized with the default configuration
    pub fn new() -> Self {
        Self::from_config(&SceneConfig::default())
    }

    /// Manager taking per-type pool sizes from `config`
    pub fn from_config(config: &SceneConfig) -> Self {
        Self {
            config: config.clone(),
            types: Vec::new(),
            type_ids: HashMap::new(),
            by_id: HashMap::new(),
            next_id: 0,
            dirty_delegate: Delegate::new(),
        }
    }

    /// Register `T` with a pool of `capacity` slots
    ///
    /// Registering an already known type returns its existing id and keeps
    /// the original pool.
    pub fn register<T: Component>(&mut self, capacity: usize) -> ComponentTypeId {
        if let Some(&existing) = self.type_ids.get(&TypeId::of::<T>()) {
            return existing;
        }

        let name = type_name::<T>();
        let type_id = ComponentTypeId(self.types.len() as u32);
        let pool: TypedPool<T> = Pool::new(name, capacity);

        self.types.push(ComponentType {
            name,
            pool: Box::new(pool),
        });
        self.type_ids.insert(TypeId::of::<T>(), type_id);

        log::info!("Registered component type {name} as {type_id:?} (capacity {capacity})");
        type_id
    }

    /// Runtime id of `T`, if registered
    pub fn type_id_of<T: Component>(&self) -> Option<ComponentTypeId> {
        self.type_ids.get(&TypeId::of::<T>()).copied()
    }

    /// Rust type name registered under `type_id`
    pub fn type_name(&self, type_id: ComponentTypeId) -> Option<&'static str> {
        self.types.get(type_id.index()).map(|ty| ty.name)
    }

    /// Allocate a default-constructed `T`
    pub fn allocate<T: Component + Default>(&mut self) -> SceneResult<ComponentHandle> {
        self.insert(T::default())
    }

    /// Move `data` into a new slot of `T`'s pool
    pub fn insert<T: Component>(&mut self, data: T) -> SceneResult<ComponentHandle> {
        let type_id = self.ensure_registered::<T>();
        let id = ComponentId(self.next_id);
        let name = type_name::<T>();

        let pool = self
            .types
            .get_mut(type_id.index())
            .and_then(|ty| ty.pool.as_any_mut().downcast_mut::<TypedPool<T>>())
            .ok_or(SceneError::UnregisteredComponentType(name))?;

        let key = pool.allocate_with(|key| ComponentEntry {
            header: ComponentHeader::new(ComponentHandle { type_id, key }, id, name),
            data,
        })?;

        self.next_id += 1;
        let handle = ComponentHandle { type_id, key };
        self.by_id.insert(id, handle);

        log::debug!("Allocated component {id} of type {name}");
        Ok(handle)
    }

    /// Publish `DESTROY` for the component, then release its slot
    ///
    /// Returns the entity that was hosting it. The host's component list is
    /// left alone; outside the crate go through `World::deallocate_component`.
    pub(crate) fn deallocate(&mut self, handle: ComponentHandle) -> SceneResult<Option<EntityHandle>> {
        self.mark_component_as_dirty(handle, ComponentDirtyFlags::DESTROY)?;

        let ty = self
            .types
            .get_mut(handle.type_id.index())
            .ok_or(SceneError::StaleComponent(handle))?;
        let header = ty
            .pool
            .header(handle.key)
            .ok_or(SceneError::StaleComponent(handle))?;
        let (id, host) = (header.id, header.host);

        ty.pool.release(handle.key);
        self.by_id.remove(&id);

        log::debug!("Deallocated component {id} of type {}", ty.name);
        Ok(host)
    }

    /// Typed access
    pub fn get<T: Component>(&self, handle: ComponentHandle) -> SceneResult<&ComponentEntry<T>> {
        self.checked_type::<T>(handle.type_id)?;
        self.typed_pool::<T>()
            .and_then(|pool| pool.get(handle.key))
            .ok_or(SceneError::StaleComponent(handle))
    }

    /// Typed mutable access
    pub fn get_mut<T: Component>(
        &mut self,
        handle: ComponentHandle,
    ) -> SceneResult<&mut ComponentEntry<T>> {
        self.checked_type::<T>(handle.type_id)?;
        self.typed_pool_mut::<T>()
            .and_then(|pool| pool.get_mut(handle.key))
            .ok_or(SceneError::StaleComponent(handle))
    }

    /// Type-independent state of any component
    pub fn header(&self, handle: ComponentHandle) -> Option<&ComponentHeader> {
        self.types
            .get(handle.type_id.index())
            .and_then(|ty| ty.pool.header(handle.key))
    }

    /// Mutable type-independent state of any component
    pub fn header_mut(&mut self, handle: ComponentHandle) -> Option<&mut ComponentHeader> {
        self.types
            .get_mut(handle.type_id.index())
            .and_then(|ty| ty.pool.header_mut(handle.key))
    }

    /// Whether `handle` refers to a live component
    pub fn contains(&self, handle: ComponentHandle) -> bool {
        self.header(handle).is_some()
    }

    /// Resolve a component by its numeric id
    pub fn component_by_id(&self, id: ComponentId) -> Option<ComponentHandle> {
        self.by_id.get(&id).copied()
    }

    /// Every live component of type `T`, in pool order
    ///
    /// Empty when `T` was never registered.
    pub fn components<T: Component>(&self) -> impl Iterator<Item = &ComponentEntry<T>> {
        self.typed_pool::<T>()
            .into_iter()
            .flat_map(|pool| pool.iter().map(|(_, entry)| entry))
    }

    /// Mutable iteration over every live component of type `T`
    pub fn components_mut<T: Component>(&mut self) -> impl Iterator<Item = &mut ComponentEntry<T>> {
        self.typed_pool_mut::<T>()
            .into_iter()
            .flat_map(|pool| pool.iter_mut().map(|(_, entry)| entry))
    }

    /// Set `flags`, notify listeners, then clear the flags again
    pub fn mark_component_as_dirty(
        &mut self,
        handle: ComponentHandle,
        flags: ComponentDirtyFlags,
    ) -> SceneResult<()> {
        let header = self
            .types
            .get_mut(handle.type_id.index())
            .and_then(|ty| ty.pool.header_mut(handle.key))
            .ok_or(SceneError::StaleComponent(handle))?;

        header.dirty = flags;
        self.dirty_delegate.notify(header);
        header.dirty = ComponentDirtyFlags::empty();
        Ok(())
    }

    /// Listen for component changes
    pub fn register_dirty_component_handler<F>(&mut self, handler: F) -> DelegateHandle
    where
        F: FnMut(&ComponentHeader) + 'static,
    {
        let handle = self.dirty_delegate.register(handler);
        log::debug!("Registered dirty component handler {}", handle.raw());
        handle
    }

    /// Stop listening; returns `false` for an unknown handle
    pub fn unregister_dirty_component_handler(&mut self, handle: DelegateHandle) -> bool {
        let removed = self.dirty_delegate.unregister(handle);
        if !removed {
            log::warn!("Dirty component handler {} was not registered", handle.raw());
        }
        removed
    }

    /// Live components across all types
    pub fn len(&self) -> usize {
        self.types.iter().map(|ty| ty.pool.len()).sum()
    }

    /// Whether no component is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live components and pool capacity of one type
    pub fn usage(&self, type_id: ComponentTypeId) -> Option<(usize, usize)> {
        self.types
            .get(type_id.index())
            .map(|ty| (ty.pool.len(), ty.pool.capacity()))
    }

    /// Publish `DESTROY` for every component and release them all
    ///
    /// Registered types keep their ids.
    pub fn clear(&mut self) {
        for ty in &mut self.types {
            for header in ty.pool.headers_mut() {
                header.dirty = ComponentDirtyFlags::DESTROY;
                self.dirty_delegate.notify(header);
                header.dirty = ComponentDirtyFlags::empty();
            }
            ty.pool.clear();
        }
        self.by_id.clear();
        log::debug!("Cleared all components");
    }

    pub(crate) fn set_host(
        &mut self,
        handle: ComponentHandle,
        host: Option<EntityHandle>,
    ) -> SceneResult<()> {
        let header = self
            .header_mut(handle)
            .ok_or(SceneError::StaleComponent(handle))?;
        header.host = host;
        Ok(())
    }

    fn ensure_registered<T: Component>(&mut self) -> ComponentTypeId {
        match self.type_id_of::<T>() {
            Some(type_id) => type_id,
            None => {
                let capacity = self.config.component_capacity(type_name::<T>());
                self.register::<T>(capacity)
            }
        }
    }

    fn checked_type<T: Component>(&self, found: ComponentTypeId) -> SceneResult<()> {
        let expected = self
            .type_id_of::<T>()
            .ok_or(SceneError::UnregisteredComponentType(type_name::<T>()))?;

        if expected == found {
            Ok(())
        } else {
            Err(SceneError::ComponentTypeMismatch {
                expected: type_name::<T>(),
                found: self.type_name(found).unwrap_or("<unregistered>"),
            })
        }
    }

    fn typed_pool<T: Component>(&self) -> Option<&TypedPool<T>> {
        let type_id = self.type_id_of::<T>()?;
        self.types
            .get(type_id.index())
            .and_then(|ty| ty.pool.as_any().downcast_ref::<TypedPool<T>>())
    }

    fn typed_pool_mut<T: Component>(&mut self) -> Option<&mut TypedPool<T>> {
        let type_id = self.type_id_of::<T>()?;
        self.types
            .get_mut(type_id.index())
            .and_then(|ty| ty.pool.as_any_mut().downcast_mut::<TypedPool<T>>())
    }
}

impl std::fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentManager")
            .field("types", &self.types.iter().map(|ty| ty.name).collect::<Vec<_>>())
            .field("components", &self.by_id.len())
            .field("dirty_handlers", &self.dirty_delegate.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    #[derive(Debug, Default)]
    struct Tag;
    impl Component for Tag {}

    #[test]
    fn test_type_id_is_assigned_once() {
        let mut manager = ComponentManager::new();
        assert_eq!(manager.type_id_of::<Health>(), None);

        let first = manager.allocate::<Health>().unwrap();
        let second = manager.allocate::<Health>().unwrap();
        let tag = manager.allocate::<Tag>().unwrap();

        assert_eq!(first.type_id, second.type_id);
        assert_eq!(manager.type_id_of::<Health>(), Some(first.type_id));
        assert_ne!(tag.type_id, first.type_id);
        assert_eq!(manager.register::<Health>(1), first.type_id);
    }

    #[test]
    fn test_typed_access_checks_type() {
        let mut manager = ComponentManager::new();
        let health = manager.insert(Health(10)).unwrap();

        assert_eq!(manager.get::<Health>(health).unwrap().data, Health(10));
        manager.get_mut::<Health>(health).unwrap().0 = 5;
        assert_eq!(manager.get::<Health>(health).unwrap().0, 5);

        assert!(matches!(
            manager.get::<Tag>(health),
            Err(SceneError::UnregisteredComponentType(_))
        ));

        manager.register::<Tag>(4);
        assert!(matches!(
            manager.get::<Tag>(health),
            Err(SceneError::ComponentTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_components_lists_live_set() {
        let mut manager = ComponentManager::new();
        assert_eq!(manager.components::<Health>().count(), 0);

        let a = manager.insert(Health(1)).unwrap();
        manager.insert(Health(2)).unwrap();
        manager.insert(Health(3)).unwrap();

        manager.deallocate(a).unwrap();

        let mut values: Vec<u32> = manager.components::<Health>().map(|c| c.0).collect();
        values.sort_unstable();
        assert_eq!(values, vec![2, 3]);
        assert!(matches!(manager.get::<Health>(a), Err(SceneError::StaleComponent(_))));
    }

    #[test]
    fn test_dirty_flags_are_published_then_cleared() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut manager = ComponentManager::new();

        let sink = Rc::clone(&seen);
        manager.register_dirty_component_handler(move |header| {
            sink.borrow_mut().push((header.id(), header.dirty_flags()));
        });

        let handle = manager.allocate::<Health>().unwrap();
        let id = manager.header(handle).unwrap().id();

        manager.mark_component_as_dirty(handle, ComponentDirtyFlags::INFO).unwrap();
        assert!(manager.header(handle).unwrap().dirty_flags().is_empty());

        manager.deallocate(handle).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![(id, ComponentDirtyFlags::INFO), (id, ComponentDirtyFlags::DESTROY)]
        );
        assert_eq!(manager.component_by_id(id), None);
    }

    #[test]
    fn test_lookup_by_id() {
        let mut manager = ComponentManager::new();
        let handle = manager.allocate::<Tag>().unwrap();
        let id = manager.header(handle).unwrap().id();

        assert_eq!(manager.component_by_id(id), Some(handle));
    }

    #[test]
    fn test_clear_notifies_every_component() {
        let destroyed = Rc::new(RefCell::new(0));
        let mut manager = ComponentManager::new();

        let counter = Rc::clone(&destroyed);
        manager.register_dirty_component_handler(move |header| {
            if header.dirty_flags().contains(ComponentDirtyFlags::DESTROY) {
                *counter.borrow_mut() += 1;
            }
        });

        manager.allocate::<Tag>().unwrap();
        manager.allocate::<Health>().unwrap();
        manager.allocate::<Health>().unwrap();
        manager.clear();

        assert_eq!(*destroyed.borrow(), 3);
        assert!(manager.is_empty());
        assert!(manager.type_id_of::<Health>().is_some());
    }
}
