//! Dirty flag fan-out and entity change notification

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::spawn_at;
use crate::ecs::{DirtyFlags, EntityHandle, EntityId, EntityManager};
use crate::foundation::math::Vec3;

/// root
/// ├── a
/// │   ├── a1
/// │   └── a2
/// │       └── a2x
/// └── b
fn build_tree(entities: &mut EntityManager) -> Vec<EntityHandle> {
    let handles: Vec<_> = (0..6).map(|_| spawn_at(entities, Vec3::zeros())).collect();
    let (root, a, a1, a2, a2x, b) = (handles[0], handles[1], handles[2], handles[3], handles[4], handles[5]);

    entities.attach(root, b).unwrap();
    entities.attach(root, a).unwrap();
    entities.attach(a, a2).unwrap();
    entities.attach(a, a1).unwrap();
    entities.attach(a2, a2x).unwrap();

    // Attaching queues MOVE on each child; start from a clean slate
    entities.update(1).unwrap();
    handles
}

#[test]
fn test_marking_root_reaches_every_descendant_once() {
    let mut entities = EntityManager::default();
    let handles = build_tree(&mut entities);

    let calls: Rc<RefCell<HashMap<EntityId, usize>>> = Rc::default();
    let sink = Rc::clone(&calls);
    entities.register_dirty_entity_handler(move |entity| {
        assert!(entity.dirty_flags().contains(DirtyFlags::MOVE));
        *sink.borrow_mut().entry(entity.id()).or_default() += 1;
    });

    entities.mark_entity_as_dirty(handles[0], DirtyFlags::MOVE).unwrap();

    assert_eq!(entities.dirty_queue().len(), handles.len());
    for &handle in &handles {
        assert!(entities.dirty_queue().contains(&handle));
        let entity = entities.entity(handle).unwrap();
        assert!(entity.dirty_flags().contains(DirtyFlags::MOVE));
        assert_eq!(calls.borrow().get(&entity.id()), Some(&1));
    }
}

#[test]
fn test_parents_are_notified_before_children() {
    let mut entities = EntityManager::default();
    let handles = build_tree(&mut entities);

    let order = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&order);
    entities.register_dirty_entity_handler(move |entity| sink.borrow_mut().push(entity.handle()));

    entities.mark_entity_as_dirty(handles[0], DirtyFlags::MOVE).unwrap();

    let order = order.borrow();
    let position = |handle: EntityHandle| order.iter().position(|&h| h == handle).unwrap();
    for &child in &handles[1..] {
        let parent = entities.parent(child).unwrap();
        assert!(position(parent) < position(child));
    }
    assert_eq!(*order, entities.dirty_queue());
}

#[test]
fn test_marking_a_leaf_does_not_touch_ancestors() {
    let mut entities = EntityManager::default();
    let handles = build_tree(&mut entities);

    entities.mark_entity_as_dirty(handles[4], DirtyFlags::MOVE).unwrap();

    assert_eq!(entities.dirty_queue(), &[handles[4]]);
    assert!(entities.entity(handles[3]).unwrap().dirty_flags().is_empty());
}

#[test]
fn test_flags_accumulate_until_the_update_clears_them() {
    let mut entities = EntityManager::default();
    let node = spawn_at(&mut entities, Vec3::zeros());

    entities.mark_entity_as_dirty(node, DirtyFlags::CREATE | DirtyFlags::ADD).unwrap();
    entities.mark_entity_as_dirty(node, DirtyFlags::MOVE).unwrap();

    assert_eq!(
        entities.entity(node).unwrap().dirty_flags(),
        DirtyFlags::CREATE | DirtyFlags::ADD | DirtyFlags::MOVE
    );
    assert_eq!(entities.dirty_queue().len(), 2);

    let stats = entities.update(1).unwrap();
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.added, 1);
    assert!(entities.entity(node).unwrap().dirty_flags().is_empty());
    assert!(entities.dirty_queue().is_empty());
}

#[test]
fn test_unregistered_handler_is_not_called() {
    let mut entities = EntityManager::default();
    let node = spawn_at(&mut entities, Vec3::zeros());

    let calls = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&calls);
    let handle = entities.register_dirty_entity_handler(move |_| *sink.borrow_mut() += 1);

    entities.mark_entity_as_dirty(node, DirtyFlags::MOVE).unwrap();
    assert!(entities.unregister_dirty_entity_handler(handle));
    entities.mark_entity_as_dirty(node, DirtyFlags::MOVE).unwrap();

    assert_eq!(*calls.borrow(), 1);
    assert!(!entities.unregister_dirty_entity_handler(handle));
}
