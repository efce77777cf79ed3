//! Scenario tests for the entity and component stores

mod dirty_propagation;
mod lifecycle;

use crate::ecs::{Category, EntityDescriptor, EntityHandle, EntityManager};
use crate::foundation::logging;
use crate::foundation::math::{Quat, Vec3};

const EPSILON: f32 = 1e-4;

/// Hierarchy + transformation entity with the given local SRT
fn spawn_node(
    entities: &mut EntityManager,
    position: Vec3,
    rotation: Quat,
    scale: f32,
) -> EntityHandle {
    logging::init_for_tests();
    let handle = entities
        .create_entity(&EntityDescriptor::node(Category::Actor), None)
        .unwrap();
    let local = entities.transformation_mut(handle).unwrap();
    local.position = position;
    local.rotation = rotation;
    local.scale = Vec3::new(scale, scale, scale);
    handle
}

fn spawn_at(entities: &mut EntityManager, position: Vec3) -> EntityHandle {
    spawn_node(entities, position, Quat::identity(), 1.0)
}
