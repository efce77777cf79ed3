//! Region map
//!
//! The map is a grid of regions over world X/Y. Each region keeps one folder
//! per entity category; a folder is an intrusive doubly-linked list threaded
//! through the entities' `next`/`previous` handles. Folder membership only
//! changes during the frame update.

use crate::config::MapConfig;
use crate::ecs::entity::{Category, Entity, EntityHandle};
use crate::foundation::math::Vec3;
use crate::foundation::pool::Pool;

use super::bounds::Aabb;

/// Address of one folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FolderId {
    /// Region index (row-major, X fastest)
    pub region: usize,
    /// Category of the folder within the region
    pub category: Category,
}

#[derive(Debug, Clone, Copy, Default)]
struct Folder {
    head: Option<EntityHandle>,
    len: usize,
}

#[derive(Debug, Clone)]
struct Region {
    aabb: Aabb,
    folders: [Folder; Category::COUNT],
}

/// Grid of regions holding placed entities
#[derive(Debug, Clone)]
pub struct Map {
    config: MapConfig,
    regions: Vec<Region>,
    entity_count: usize,
}

impl Map {
    /// Build an empty map with the given layout
    pub fn new(config: &MapConfig) -> Self {
        let mut regions = Vec::with_capacity(config.region_count());

        // Positions outside the grid clamp into the border regions, so those
        // regions are open towards the outside.
        let span = |cell: usize, cells: usize, meters: f32| {
            let min = if cell == 0 { f32::MIN } else { cell as f32 * meters };
            let max = if cell + 1 == cells { f32::MAX } else { (cell + 1) as f32 * meters };
            (min, max)
        };

        for y in 0..config.regions_y {
            for x in 0..config.regions_x {
                let (min_x, max_x) = span(x, config.regions_x, config.meters_x);
                let (min_y, max_y) = span(y, config.regions_y, config.meters_y);
                let min = Vec3::new(min_x, min_y, f32::MIN);
                let max = Vec3::new(max_x, max_y, f32::MAX);
                regions.push(Region {
                    aabb: Aabb::new(min, max),
                    folders: [Folder::default(); Category::COUNT],
                });
            }
        }

        log::info!(
            "Created map with {}x{} regions of {}x{} m",
            config.regions_x,
            config.regions_y,
            config.meters_x,
            config.meters_y
        );

        Self {
            config: config.clone(),
            regions,
            entity_count: 0,
        }
    }

    /// Layout of this map
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Number of regions
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Bounds of a region
    pub fn region_bounds(&self, region: usize) -> Option<Aabb> {
        self.regions.get(region).map(|r| r.aabb)
    }

    /// Number of entities placed in the map
    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    /// Number of entities in one folder
    pub fn folder_len(&self, folder: FolderId) -> usize {
        self.regions
            .get(folder.region)
            .map_or(0, |r| r.folders[folder.category.index()].len)
    }

    /// Region containing `position`; positions outside the grid clamp to the border
    pub fn region_at(&self, position: &Vec3) -> usize {
        let x = grid_cell(position.x / self.config.meters_x, self.config.regions_x);
        let y = grid_cell(position.y / self.config.meters_y, self.config.regions_y);
        y * self.config.regions_x + x
    }

    /// Folder an entity belongs in given its current world position
    pub fn folder_for(&self, entity: &Entity) -> FolderId {
        FolderId {
            region: self.region_at(&entity.world_position),
            category: entity.category(),
        }
    }

    /// Entities of `category` in one folder, most recently added first
    pub fn folder<'a>(
        &self,
        entities: &'a Pool<EntityHandle, Entity>,
        folder: FolderId,
    ) -> FolderIter<'a> {
        let head = self
            .regions
            .get(folder.region)
            .and_then(|r| r.folders[folder.category.index()].head);
        FolderIter {
            entities,
            current: head,
        }
    }

    /// Every placed entity of `category`
    pub fn entities<'a>(
        &'a self,
        entities: &'a Pool<EntityHandle, Entity>,
        category: Category,
    ) -> impl Iterator<Item = &'a Entity> + 'a {
        (0..self.regions.len())
            .flat_map(move |region| self.folder(entities, FolderId { region, category }))
    }

    /// Placed entities of `category` whose bounds intersect `bounds`
    pub fn entities_in_aabb<'a>(
        &'a self,
        entities: &'a Pool<EntityHandle, Entity>,
        category: Category,
        bounds: Aabb,
    ) -> impl Iterator<Item = &'a Entity> + 'a {
        self.regions
            .iter()
            .enumerate()
            .filter(move |(_, region)| region.aabb.intersects(&bounds))
            .flat_map(move |(region, _)| self.folder(entities, FolderId { region, category }))
            .filter(move |entity| entity.world_aabb.intersects(&bounds))
    }

    /// Placed entities of `category` whose position lies within `radius` of `center`
    pub fn entities_in_radius<'a>(
        &'a self,
        entities: &'a Pool<EntityHandle, Entity>,
        category: Category,
        center: Vec3,
        radius: f32,
    ) -> impl Iterator<Item = &'a Entity> + 'a {
        let radius_squared = radius * radius;
        self.regions
            .iter()
            .enumerate()
            .filter(move |(_, region)| {
                region.aabb.distance_squared_to_point(center) <= radius_squared
            })
            .flat_map(move |(region, _)| self.folder(entities, FolderId { region, category }))
            .filter(move |entity| {
                (entity.world_position - center).magnitude_squared() <= radius_squared
            })
    }

    /// Link `handle` at the front of the folder matching its position
    pub(crate) fn add_entity(
        &mut self,
        entities: &mut Pool<EntityHandle, Entity>,
        handle: EntityHandle,
    ) -> bool {
        let Some(entity) = entities.get(handle) else {
            return false;
        };
        if entity.folder.is_some() {
            return false;
        }
        let target = self.folder_for(entity);
        if !self.link(entities, handle, target) {
            log::warn!("Map has no region {} for {handle:?}", target.region);
            return false;
        }
        self.entity_count += 1;
        log::trace!("Map add {handle:?} to {target:?}");
        true
    }

    /// Relink `handle` if its position now maps to a different folder
    pub(crate) fn move_entity(
        &mut self,
        entities: &mut Pool<EntityHandle, Entity>,
        handle: EntityHandle,
    ) -> bool {
        let Some(entity) = entities.get(handle) else {
            return false;
        };
        let Some(current) = entity.folder else {
            return false;
        };
        let target = self.folder_for(entity);
        if target == current {
            return false;
        }
        self.unlink(entities, handle);
        self.link(entities, handle, target);
        log::trace!("Map move {handle:?} from {current:?} to {target:?}");
        true
    }

    /// Unlink `handle` from its folder
    pub(crate) fn remove_entity(
        &mut self,
        entities: &mut Pool<EntityHandle, Entity>,
        handle: EntityHandle,
    ) -> bool {
        if !entities.get(handle).is_some_and(|entity| entity.folder.is_some()) {
            return false;
        }
        self.unlink(entities, handle);
        self.entity_count -= 1;
        log::trace!("Map remove {handle:?}");
        true
    }

    /// Empty every folder, unlinking all entities
    pub(crate) fn clear(&mut self, entities: &mut Pool<EntityHandle, Entity>) {
        for (_, entity) in entities.iter_mut() {
            entity.folder = None;
            entity.next = None;
            entity.previous = None;
        }
        for region in &mut self.regions {
            region.folders = [Folder::default(); Category::COUNT];
        }
        self.entity_count = 0;
    }

    fn link(
        &mut self,
        entities: &mut Pool<EntityHandle, Entity>,
        handle: EntityHandle,
        target: FolderId,
    ) -> bool {
        let Some(folder) = self
            .regions
            .get_mut(target.region)
            .map(|r| &mut r.folders[target.category.index()])
        else {
            return false;
        };

        let old_head = folder.head.replace(handle);
        folder.len += 1;

        if let Some(next) = old_head.and_then(|h| entities.get_mut(h)) {
            next.previous = Some(handle);
        }
        if let Some(entity) = entities.get_mut(handle) {
            entity.folder = Some(target);
            entity.previous = None;
            entity.next = old_head;
        }
        true
    }

    fn unlink(&mut self, entities: &mut Pool<EntityHandle, Entity>, handle: EntityHandle) {
        let Some(entity) = entities.get_mut(handle) else {
            return;
        };
        let (Some(current), previous, next) =
            (entity.folder.take(), entity.previous.take(), entity.next.take())
        else {
            return;
        };

        match previous.and_then(|h| entities.get_mut(h)) {
            Some(prev) => prev.next = next,
            None => {
                if let Some(region) = self.regions.get_mut(current.region) {
                    region.folders[current.category.index()].head = next;
                }
            }
        }
        if let Some(following) = next.and_then(|h| entities.get_mut(h)) {
            following.previous = previous;
        }
        if let Some(region) = self.regions.get_mut(current.region) {
            let folder = &mut region.folders[current.category.index()];
            folder.len = folder.len.saturating_sub(1);
        }
    }
}

/// Walks one folder's intrusive list
pub struct FolderIter<'a> {
    entities: &'a Pool<EntityHandle, Entity>,
    current: Option<EntityHandle>,
}

impl<'a> Iterator for FolderIter<'a> {
    type Item = &'a Entity;

    fn next(&mut self) -> Option<Self::Item> {
        let entity = self.entities.get(self.current?)?;
        self.current = entity.next;
        Some(entity)
    }
}

fn grid_cell(coordinate: f32, cells: usize) -> usize {
    if coordinate.is_nan() || coordinate <= 0.0 {
        0
    } else {
        (coordinate.floor() as usize).min(cells.saturating_sub(1))
    }
}
