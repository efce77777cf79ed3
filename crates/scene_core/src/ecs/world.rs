//! Scene world
//!
//! The [`World`] is the context object handed to every subsystem: it owns the
//! entity manager, the component manager and the frame clock of one running
//! map. Independent worlds can coexist in the same process.

use super::component::{Component, ComponentEntry, ComponentHandle};
use super::component_manager::ComponentManager;
use super::entity::{EntityDescriptor, EntityHandle, EntityId};
use super::entity_manager::{EntityManager, FrameStats};
use crate::config::SceneConfig;
use crate::error::{SceneError, SceneResult};
use crate::foundation::time::FrameClock;

/// Entities, components and frame clock of one map
#[derive(Debug)]
pub struct World {
    config: SceneConfig,
    entities: EntityManager,
    components: ComponentManager,
    clock: FrameClock,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// World with the default configuration
    pub fn new() -> Self {
        let config = SceneConfig::default();
        Self {
            entities: EntityManager::new(&config),
            components: ComponentManager::from_config(&config),
            clock: FrameClock::new(),
            config,
        }
    }

    /// World sized from a validated configuration
    pub fn with_config(config: SceneConfig) -> SceneResult<Self> {
        config.validate()?;
        log::info!("Creating world ({:?} handedness)", config.handedness);
        Ok(Self {
            entities: EntityManager::new(&config),
            components: ComponentManager::from_config(&config),
            clock: FrameClock::new(),
            config,
        })
    }

    /// Configuration the world was built with
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Entity store
    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    /// Mutable entity store
    pub fn entities_mut(&mut self) -> &mut EntityManager {
        &mut self.entities
    }

    /// Component store
    pub fn components(&self) -> &ComponentManager {
        &self.components
    }

    /// Mutable component store
    pub fn components_mut(&mut self) -> &mut ComponentManager {
        &mut self.components
    }

    /// Frame clock
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Shorthand for [`EntityManager::create_entity`]
    pub fn create_entity(
        &mut self,
        descriptor: &EntityDescriptor,
        id: Option<EntityId>,
    ) -> SceneResult<EntityHandle> {
        self.entities.create_entity(descriptor, id)
    }

    /// Advance one frame and drain the dirty queue
    ///
    /// Components hosted by entities destroyed during the update lose their
    /// host but stay allocated.
    pub fn tick(&mut self, delta_time: f32) -> SceneResult<FrameStats> {
        let frame = self.clock.advance(delta_time);
        let result = self.entities.update(frame);

        for component in self.entities.take_released_components() {
            if self.components.set_host(component, None).is_err() {
                log::trace!("Released component {component:?} was already freed");
            }
        }

        result
    }

    // ---------------------------------------------------------------------
    // Components on entities
    // ---------------------------------------------------------------------

    /// Host `component` on `entity`
    pub fn attach_component(
        &mut self,
        entity: EntityHandle,
        component: ComponentHandle,
    ) -> SceneResult<()> {
        let header = self
            .components
            .header(component)
            .ok_or(SceneError::StaleComponent(component))?;
        if header.host().is_some() {
            return Err(SceneError::ComponentAlreadyAttached(header.id()));
        }

        let host = self
            .entities
            .entity_mut(entity)
            .ok_or(SceneError::StaleEntity(entity))?;
        host.components.push(component);
        self.components.set_host(component, Some(entity))?;

        log::debug!("Attached component {component:?} to entity {entity:?}");
        Ok(())
    }

    /// Remove `component` from `entity`; the component stays allocated
    pub fn detach_component(
        &mut self,
        entity: EntityHandle,
        component: ComponentHandle,
    ) -> SceneResult<()> {
        let header = self
            .components
            .header(component)
            .ok_or(SceneError::StaleComponent(component))?;
        if header.host() != Some(entity) {
            return Err(SceneError::ComponentNotAttached(header.id()));
        }

        if let Some(host) = self.entities.entity_mut(entity) {
            host.components.retain(|&attached| attached != component);
        }
        self.components.set_host(component, None)?;

        log::debug!("Detached component {component:?} from entity {entity:?}");
        Ok(())
    }

    /// Deallocate a component, detaching it from its host first
    pub fn deallocate_component(&mut self, component: ComponentHandle) -> SceneResult<()> {
        if let Some(host) = self.components.deallocate(component)? {
            if let Some(entity) = self.entities.entity_mut(host) {
                entity.components.retain(|&attached| attached != component);
            }
        }
        Ok(())
    }

    /// First component of type `T` hosted by `entity`
    pub fn component_of<T: Component>(&self, entity: EntityHandle) -> Option<&ComponentEntry<T>> {
        let type_id = self.components.type_id_of::<T>()?;
        self.entities
            .entity(entity)?
            .components()
            .iter()
            .filter(|handle| handle.type_id == type_id)
            .find_map(|&handle| self.components.get::<T>(handle).ok())
    }

    /// Whether a component is active and hosted by a live, active entity
    pub fn is_active_and_usable(&self, component: ComponentHandle) -> bool {
        self.components
            .header(component)
            .is_some_and(|header| header.is_active_and_usable(&self.entities))
    }

    /// Components of type `T` that pass [`World::is_active_and_usable`]
    pub fn active_components<T: Component>(&self) -> impl Iterator<Item = &ComponentEntry<T>> {
        self.components
            .components::<T>()
            .filter(|entry| entry.header.is_active_and_usable(&self.entities))
    }
}
