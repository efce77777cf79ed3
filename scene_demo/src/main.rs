//! Scene demo
//!
//! Builds a small fleet (a ship carrying two turrets and a camera boom, plus a
//! sun) and flies it across the map for a few seconds of simulated frames,
//! logging world placement and update statistics along the way.
//!
//! Usage: `scene_demo [config.toml|config.ron]`

use std::cell::Cell;
use std::rc::Rc;

use scene_core::foundation::logging;
use scene_core::foundation::math::utils::deg_to_rad;
use scene_core::prelude::*;

const FRAMES: u64 = 120;
const DELTA_TIME: f32 = 1.0 / 60.0;
const SHIP_SPEED: f32 = 12.0;
const TURN_RATE_DEGREES: f32 = 30.0;

struct Fleet {
    ship: EntityHandle,
    turrets: [EntityHandle; 2],
    boom: EntityHandle,
    camera: ComponentHandle,
}

fn spawn_node(world: &mut World, category: Category, position: Vec3) -> SceneResult<EntityHandle> {
    let handle = world.create_entity(&EntityDescriptor::node(category), None)?;
    if let Some(local) = world.entities_mut().transformation_mut(handle) {
        local.position = position;
    }
    Ok(handle)
}

fn build_fleet(world: &mut World) -> SceneResult<Fleet> {
    let ship = spawn_node(world, Category::Actor, Vec3::new(16.0, 16.0, 0.0))?;
    let left = spawn_node(world, Category::Actor, Vec3::new(14.0, 16.0, 0.5))?;
    let right = spawn_node(world, Category::Actor, Vec3::new(18.0, 16.0, 0.5))?;
    let boom = spawn_node(world, Category::Actor, Vec3::new(16.0, 8.0, 4.0))?;

    let entities = world.entities_mut();
    entities.attach(ship, left)?;
    entities.attach(ship, right)?;
    entities.attach(ship, boom)?;

    let hull = world
        .components_mut()
        .insert(MeshComponent::new("models/ship.obj", "hull"))?;
    world.attach_component(ship, hull)?;
    for turret in [left, right] {
        let mesh = world
            .components_mut()
            .insert(MeshComponent::new("models/turret.obj", "gunmetal"))?;
        world.attach_component(turret, mesh)?;
    }

    let camera = world
        .components_mut()
        .insert(CameraComponent::perspective(60.0, 0.1, 500.0))?;
    world.attach_component(boom, camera)?;

    let headlight = world
        .components_mut()
        .insert(LightFactory::spot(Vec3::new(1.0, 0.95, 0.8), 4.0, 40.0, 15.0, 25.0))?;
    world.attach_component(ship, headlight)?;

    let sun = world.create_entity(&EntityDescriptor::flat(Category::Light), None)?;
    if let Some(entity) = world.entities_mut().entity_mut(sun) {
        entity.name = "sun".into();
        entity.world_position = Vec3::new(128.0, 128.0, 200.0);
    }
    let sunlight = world
        .components_mut()
        .insert(LightFactory::directional(Vec3::new(1.0, 1.0, 0.9), 1.0))?;
    world.attach_component(sun, sunlight)?;

    let entities = world.entities_mut();
    entities.mark_entity_as_dirty(ship, DirtyFlags::CREATE | DirtyFlags::ADD)?;
    entities.mark_entity_as_dirty(sun, DirtyFlags::CREATE | DirtyFlags::ADD)?;

    Ok(Fleet {
        ship,
        turrets: [left, right],
        boom,
        camera,
    })
}

fn log_fleet(world: &World, fleet: &Fleet, stats: &FrameStats) {
    let entities = world.entities();
    if let Some(ship) = entities.entity(fleet.ship) {
        let region = ship.folder().map(|folder| folder.region);
        log::info!(
            "Frame {}: ship at {:?} in region {:?} ({} processed, {} recomputed, {} relinked)",
            stats.frame,
            ship.world_position,
            region,
            stats.processed,
            stats.recomputed,
            stats.relinked
        );
    }

    for turret in fleet.turrets {
        if let Some(entity) = entities.entity(turret) {
            log::info!("  turret {} at {:?}", entity.id(), entity.world_position);
        }
    }

    let view = entities
        .world_matrix(fleet.boom)
        .and_then(|world_matrix| CameraComponent::view_matrix(&world_matrix));
    let usable = world.is_active_and_usable(fleet.camera);
    if let (Some(view), true) = (view, usable) {
        let eye = view.try_inverse().map(|m| Vec3::new(m.m14, m.m24, m.m34));
        log::info!("  camera eye {eye:?}");
    }
}

fn run(config: SceneConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut world = World::with_config(config)?;
    let fleet = build_fleet(&mut world)?;

    let destroyed = Rc::new(Cell::new(0_usize));
    let sink = Rc::clone(&destroyed);
    world.components_mut().register_dirty_component_handler(move |header| {
        if header.dirty_flags().contains(ComponentDirtyFlags::DESTROY) {
            sink.set(sink.get() + 1);
        }
    });

    let mut heading = 0.0_f32;
    for frame in 1..=FRAMES {
        heading += TURN_RATE_DEGREES * DELTA_TIME;

        let entities = world.entities_mut();
        entities.set_euler_angles(fleet.ship, Vec3::new(0.0, 0.0, deg_to_rad(heading)))?;
        if let Some(local) = entities.transformation_mut(fleet.ship) {
            let forward = local.rotation * Vec3::new(0.0, 1.0, 0.0);
            local.position += forward * SHIP_SPEED * DELTA_TIME;
        }
        entities.mark_entity_as_dirty(fleet.ship, DirtyFlags::MOVE)?;

        if frame == FRAMES / 2 {
            log::info!("Scrapping the right turret");
            entities.mark_entity_as_dirty(fleet.turrets[1], DirtyFlags::REMOVE | DirtyFlags::DESTROY)?;
        }

        let stats = world.tick(DELTA_TIME)?;
        if frame % 30 == 0 {
            log_fleet(&world, &fleet, &stats);
        }
    }

    // Released components have no host any more; free them
    let orphans: Vec<ComponentHandle> = world
        .components()
        .components::<MeshComponent>()
        .filter(|entry| entry.header.host().is_none())
        .map(|entry| entry.header.handle())
        .collect();
    for orphan in orphans {
        world.deallocate_component(orphan)?;
    }

    log::info!(
        "Done after {} frames ({:.1} fps simulated): {} entities, {} components, {} components destroyed, {} compositions",
        world.clock().frame(),
        world.clock().average_fps(),
        world.entities().len(),
        world.components().len(),
        destroyed.get(),
        world.entities().composition_count()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init("info");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading scene configuration from {path}");
            SceneConfig::load_from_file(&path)?
        }
        None => SceneConfig::default(),
    };

    match run(config) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::error!("Scene demo failed: {e}");
            Err(e)
        }
    }
}
