//! Scene error types

use crate::config::ConfigError;
use crate::ecs::component::{ComponentHandle, ComponentId};
use crate::ecs::entity::{EntityHandle, EntityId};
use crate::foundation::pool::PoolError;

/// Errors raised by the entity and component stores
#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    /// A fixed pool ran out of slots
    #[error("pool '{pool}' exhausted (capacity {capacity})")]
    PoolExhausted {
        /// Pool name
        pool: &'static str,
        /// Configured capacity
        capacity: usize,
    },

    /// Entity handle refers to a freed slot
    #[error("stale entity handle {0:?}")]
    StaleEntity(EntityHandle),

    /// Component handle refers to a freed slot
    #[error("stale component handle {0:?}")]
    StaleComponent(ComponentHandle),

    /// Explicit ID already used by a live entity
    #[error("entity id {0} is already in use")]
    DuplicateEntityId(EntityId),

    /// Automatic ids ran into the reserved invalid id
    #[error("entity id space is exhausted")]
    IdSpaceExhausted,

    /// Operation needs a facet the entity was created without
    #[error("entity {id} has no {facet} facet")]
    MissingFacet {
        /// Entity id
        id: EntityId,
        /// Facet name
        facet: &'static str,
    },

    /// Entity attached to itself
    #[error("entity {0} cannot be attached to itself")]
    SelfAttach(EntityId),

    /// Attach would make a child an ancestor of its parent
    #[error("attaching {child} under {parent} would create a cycle")]
    HierarchyCycle {
        /// Requested parent
        parent: EntityId,
        /// Requested child
        child: EntityId,
    },

    /// A cycle was found while walking the hierarchy
    #[error("hierarchy cycle detected at entity {0}")]
    CycleDetected(EntityId),

    /// Typed access with the wrong component type
    #[error("component type mismatch: expected {expected}, found {found}")]
    ComponentTypeMismatch {
        /// Requested type
        expected: &'static str,
        /// Stored type
        found: &'static str,
    },

    /// Typed access on a type that has no pool
    #[error("component type {0} is not registered")]
    UnregisteredComponentType(&'static str),

    /// Component already has a host entity
    #[error("component {0} is already attached to an entity")]
    ComponentAlreadyAttached(ComponentId),

    /// Component is not hosted by the given entity
    #[error("component {0} is not attached to this entity")]
    ComponentNotAttached(ComponentId),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<PoolError> for SceneError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Exhausted { pool, capacity } => Self::PoolExhausted { pool, capacity },
        }
    }
}

/// Result alias for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
