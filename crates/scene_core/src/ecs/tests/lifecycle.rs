//! Entity creation, ids, pools and deferred destruction

use std::collections::HashSet;

use approx::assert_relative_eq;

use super::{spawn_at, EPSILON};
use crate::config::SceneConfig;
use crate::ecs::{Category, DirtyFlags, EntityDescriptor, EntityId, EntityManager, FacetFlags};
use crate::error::SceneError;
use crate::foundation::math::Vec3;
use crate::scene::Aabb;

#[test]
fn test_ids_are_unique_and_follow_explicit_ids() {
    let mut entities = EntityManager::default();
    let descriptor = EntityDescriptor::flat(Category::Actor);

    let first = entities.create_entity(&descriptor, None).unwrap();
    let explicit = entities.create_entity(&descriptor, Some(EntityId(41))).unwrap();
    let next = entities.create_entity(&descriptor, None).unwrap();
    let invalid = entities.create_entity(&descriptor, Some(EntityId::INVALID)).unwrap();
    let lower = entities.create_entity(&descriptor, Some(EntityId(7))).unwrap();
    let after_lower = entities.create_entity(&descriptor, None).unwrap();

    let id = |handle| entities.entity(handle).unwrap().id();
    assert_eq!(id(first), EntityId(0));
    assert_eq!(id(explicit), EntityId(41));
    assert_eq!(id(next), EntityId(42));
    assert_eq!(id(invalid), EntityId(43));
    assert_eq!(id(lower), EntityId(7));
    assert_eq!(id(after_lower), EntityId(44));

    let ids: HashSet<EntityId> = entities.entities().map(|e| e.id()).collect();
    assert_eq!(ids.len(), entities.len());
    assert_eq!(entities.entity_by_id(EntityId(41)), Some(explicit));
}

#[test]
fn test_duplicate_explicit_id_is_rejected() {
    let mut entities = EntityManager::default();
    let descriptor = EntityDescriptor::flat(Category::Light);

    entities.create_entity(&descriptor, Some(EntityId(5))).unwrap();
    assert!(matches!(
        entities.create_entity(&descriptor, Some(EntityId(5))),
        Err(SceneError::DuplicateEntityId(EntityId(5)))
    ));
    assert_eq!(entities.len(), 1);
}

#[test]
fn test_id_counter_stops_before_the_invalid_id() {
    let mut entities = EntityManager::default();
    let descriptor = EntityDescriptor::flat(Category::Actor);

    let last = entities
        .create_entity(&descriptor, Some(EntityId(u64::MAX - 1)))
        .unwrap();
    assert_eq!(entities.entity(last).unwrap().id(), EntityId(u64::MAX - 1));

    assert!(matches!(
        entities.create_entity(&descriptor, None),
        Err(SceneError::IdSpaceExhausted)
    ));
    assert_eq!(entities.len(), 1);
    assert_eq!(entities.entity_by_id(EntityId::INVALID), None);

    // Explicit ids below the counter are still available
    let explicit = entities.create_entity(&descriptor, Some(EntityId(3))).unwrap();
    assert_eq!(entities.entity_by_id(EntityId(3)), Some(explicit));
    assert_eq!(entities.len(), 2);
}

#[test]
fn test_new_entity_has_requested_facets_and_clean_flags() {
    let mut entities = EntityManager::default();

    let node = entities
        .create_entity(&EntityDescriptor::node(Category::Light).with_kind(2), None)
        .unwrap();
    let flat = entities
        .create_entity(&EntityDescriptor::flat(Category::Fx), None)
        .unwrap();

    let entity = entities.entity(node).unwrap();
    assert_eq!(entity.facets(), FacetFlags::HIERARCHY | FacetFlags::TRANSFORMATION);
    assert_eq!(entity.kind(), 2);
    assert_eq!(entity.category(), Category::Light);
    assert!(entity.dirty_flags().is_empty());
    assert!(entity.is_active);
    assert!(entities.hierarchy(node).unwrap().is_root());
    assert_eq!(entities.transformation(node).unwrap().owner(), node);

    assert!(entities.entity(flat).unwrap().facets().is_empty());
    assert!(entities.hierarchy(flat).is_none());
    assert!(entities.dirty_queue().is_empty());
}

#[test]
fn test_pool_exhaustion_is_an_error() {
    let config = SceneConfig {
        entity_capacity: 3,
        hierarchy_capacity: 3,
        transformation_capacity: 1,
        ..SceneConfig::default()
    };
    let mut entities = EntityManager::new(&config);

    entities.create_entity(&EntityDescriptor::node(Category::Actor), None).unwrap();

    // No transformation facet left: the entity and its hierarchy facet are rolled back
    assert!(matches!(
        entities.create_entity(&EntityDescriptor::node(Category::Actor), None),
        Err(SceneError::PoolExhausted { pool: "transformation facets", capacity: 1 })
    ));
    assert_eq!(entities.len(), 1);

    entities.create_entity(&EntityDescriptor::flat(Category::Actor), None).unwrap();
    entities.create_entity(&EntityDescriptor::flat(Category::Actor), None).unwrap();
    assert!(matches!(
        entities.create_entity(&EntityDescriptor::flat(Category::Actor), None),
        Err(SceneError::PoolExhausted { pool: "entities", capacity: 3 })
    ));
}

#[test]
fn test_destroy_is_deferred_to_update() {
    let mut entities = EntityManager::default();

    let parent = spawn_at(&mut entities, Vec3::zeros());
    let child = spawn_at(&mut entities, Vec3::zeros());
    entities.attach(parent, child).unwrap();
    entities.mark_entity_as_dirty(parent, DirtyFlags::ADD).unwrap();
    entities.update(1).unwrap();
    let parent_id = entities.entity(parent).unwrap().id();

    entities
        .mark_entity_as_dirty(parent, DirtyFlags::REMOVE | DirtyFlags::DESTROY)
        .unwrap();
    assert!(entities.contains(parent));
    assert!(entities.contains(child));

    let stats = entities.update(2).unwrap();

    assert_eq!(stats.destroyed, 2);
    assert_eq!(stats.removed, 2);
    assert!(!entities.contains(parent));
    assert!(!entities.contains(child));
    assert_eq!(entities.entity_by_id(parent_id), None);
    assert_eq!(entities.map().entity_count(), 0);
    assert!(entities.is_empty());
}

#[test]
fn test_destroyed_child_leaves_parent_consistent() {
    let mut entities = EntityManager::default();

    let parent = spawn_at(&mut entities, Vec3::zeros());
    let kept = spawn_at(&mut entities, Vec3::zeros());
    let doomed = spawn_at(&mut entities, Vec3::zeros());
    entities.attach(parent, kept).unwrap();
    entities.attach(parent, doomed).unwrap();
    entities.update(1).unwrap();

    entities.mark_entity_as_dirty(doomed, DirtyFlags::DESTROY).unwrap();
    entities.update(2).unwrap();

    assert_eq!(entities.children(parent).unwrap(), vec![kept]);
    assert!(!entities.contains(doomed));
}

#[test]
fn test_freed_parent_releases_children_in_place() {
    let mut entities = EntityManager::default();

    let parent = spawn_at(&mut entities, Vec3::new(4.0, 0.0, 0.0));
    let child = spawn_at(&mut entities, Vec3::new(5.0, 1.0, 0.0));
    entities.attach(parent, child).unwrap();
    entities.update(1).unwrap();

    entities.free_entity(parent).unwrap();

    assert!(entities.parent(child).is_none());
    assert_relative_eq!(
        entities.transformation(child).unwrap().position,
        Vec3::new(5.0, 1.0, 0.0),
        epsilon = EPSILON
    );
}

#[test]
fn test_map_follows_add_move_remove() {
    let mut entities = EntityManager::default();
    let node = spawn_at(&mut entities, Vec3::new(1.0, 1.0, 0.0));

    entities.mark_entity_as_dirty(node, DirtyFlags::CREATE | DirtyFlags::ADD).unwrap();
    let stats = entities.update(1).unwrap();
    assert_eq!(stats.added, 1);
    let first_region = entities.entity(node).unwrap().folder().unwrap().region;
    assert_eq!(entities.map_entities(Category::Actor).count(), 1);

    // Same region: no relink
    entities.transformation_mut(node).unwrap().position = Vec3::new(2.0, 2.0, 0.0);
    entities.mark_entity_as_dirty(node, DirtyFlags::MOVE).unwrap();
    assert_eq!(entities.update(2).unwrap().relinked, 0);

    entities.transformation_mut(node).unwrap().position = Vec3::new(200.0, 2.0, 0.0);
    entities.mark_entity_as_dirty(node, DirtyFlags::MOVE).unwrap();
    assert_eq!(entities.update(3).unwrap().relinked, 1);
    assert_ne!(entities.entity(node).unwrap().folder().unwrap().region, first_region);
    assert_relative_eq!(
        entities.entity(node).unwrap().world_aabb.center(),
        Vec3::new(200.0, 2.0, 0.0),
        epsilon = EPSILON
    );
    assert_eq!(
        entities
            .entities_in_radius(Category::Actor, Vec3::new(199.0, 2.0, 0.0), 2.0)
            .count(),
        1
    );

    entities.mark_entity_as_dirty(node, DirtyFlags::REMOVE).unwrap();
    assert_eq!(entities.update(4).unwrap().removed, 1);
    assert!(entities.contains(node));
    assert!(!entities.entity(node).unwrap().is_in_map());
    assert_eq!(entities.map_entities(Category::Actor).count(), 0);
}

#[test]
fn test_map_without_regions_places_nothing() {
    let mut config = SceneConfig::default();
    config.map.regions_x = 0;
    assert!(config.validate().is_err());
    let mut entities = EntityManager::new(&config);

    let node = spawn_at(&mut entities, Vec3::new(1.0, 1.0, 0.0));
    entities.mark_entity_as_dirty(node, DirtyFlags::CREATE | DirtyFlags::ADD).unwrap();
    let stats = entities.update(1).unwrap();

    assert_eq!(stats.added, 0);
    assert_eq!(entities.map().entity_count(), 0);
    assert!(!entities.entity(node).unwrap().is_in_map());
}

#[test]
fn test_entity_outside_the_grid_is_found_by_spatial_queries() {
    let mut entities = EntityManager::default();
    let outside = entities
        .create_entity(&EntityDescriptor::flat(Category::Actor), None)
        .unwrap();
    entities.entity_mut(outside).unwrap().world_position = Vec3::new(-100.0, -100.0, 0.0);
    entities.mark_entity_as_dirty(outside, DirtyFlags::ADD).unwrap();
    entities.update(1).unwrap();
    assert!(entities.entity(outside).unwrap().is_in_map());

    let center = Vec3::new(-100.0, -100.0, 0.0);
    assert_eq!(entities.entities_in_radius(Category::Actor, center, 5.0).count(), 1);
    let bounds = Aabb::from_center_extents(center, Vec3::new(2.0, 2.0, 2.0));
    assert_eq!(entities.entities_in_aabb(Category::Actor, bounds).count(), 1);
}
