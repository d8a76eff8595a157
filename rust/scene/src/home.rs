// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The home scene: floor-plan entities and the geometry derived from them
//!
//! Entities are mirrored in slot maps. Mutations mark the entities whose
//! geometry depends on them as dirty; [`HomeScene::update`] rebuilds every
//! dirty entity, independently and in parallel, then writes the results to
//! the scene graph one after the other.
//!
//! Opening silhouettes either load before the wall is built
//! ([`CutoutPolicy::Wait`]) or arrive later through [`CutoutRequest`]
//! tickets ([`CutoutPolicy::Defer`]). A ticket carries the wall revision it
//! was issued for; results for removed entities or outdated revisions are
//! dropped.

use home3d_geometry::polygon::{bounds_overlap, contour_bounds};
use home3d_geometry::{
    build_room_faces, build_wall_geometry, Area, CutoutState, Level, ModelRef, Opening, Projection, Room, RoomCutouts,
    Staircase, SubMeshCollection, Wall, WallGeometry, WallGeometryOptions, WallOpening, WallSide,
};
use nalgebra::{Matrix4, Vector2, Vector3};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::arena::SceneGraph;
use crate::config::{CutoutPolicy, SceneConfig};
use crate::error::{Error, Result};
use crate::keys::{opening_id, opening_key, EntityKey, LevelKey, NodeKey, OpeningKey, RoomKey, StaircaseKey, WallKey};
use crate::materials::MaterialTable;
use crate::silhouette::{ModelLoader, SilhouetteCache, SilhouetteService};

/// Staircases reaching this close to the ceiling cut through it
const STAIRCASE_REACH_TOLERANCE: f64 = 1e-3;

#[derive(Debug)]
struct LevelEntry {
    level: Level,
    node: NodeKey,
}

#[derive(Debug)]
struct WallEntry {
    wall: Wall,
    level: Option<LevelKey>,
    /// Bumped whenever the wall or an opening crossing it changes
    revision: u64,
    node: Option<NodeKey>,
}

#[derive(Debug)]
struct OpeningEntry {
    opening: Opening,
    level: Option<LevelKey>,
}

#[derive(Debug)]
struct RoomEntry {
    room: Room,
    level: Option<LevelKey>,
    node: Option<NodeKey>,
}

#[derive(Debug)]
struct StaircaseEntry {
    staircase: Staircase,
    level: Option<LevelKey>,
}

/// A wall waiting for the front silhouette of one of its openings
#[derive(Debug, Clone, PartialEq)]
pub struct CutoutRequest {
    pub wall: WallKey,
    pub opening: OpeningKey,
    /// Wall revision the request was issued for
    pub revision: u64,
    pub model: ModelRef,
}

impl CutoutRequest {
    /// Load the silhouette this request waits for
    pub async fn resolve(self, service: &SilhouetteService) -> CutoutResult {
        let cutout = service.front_cutout(&self.model).await;
        CutoutResult { request: self, cutout }
    }
}

/// A loaded silhouette, ready for [`HomeScene::apply_cutout`]
#[derive(Debug, Clone)]
pub struct CutoutResult {
    pub request: CutoutRequest,
    pub cutout: Arc<Area>,
}

/// Counts of one update pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    pub walls: usize,
    pub rooms: usize,
    /// Entities left without geometry
    pub failed: Vec<EntityKey>,
}

enum Derived<T> {
    Built(T),
    Rejected(String),
    Panicked,
}

/// Run `derive`, turning a panic into [`Derived::Panicked`]
fn contained<T, F>(derive: F) -> Derived<T>
where
    F: FnOnce() -> std::result::Result<T, String>,
{
    match catch_unwind(AssertUnwindSafe(derive)) {
        Ok(Ok(value)) => Derived::Built(value),
        Ok(Err(reason)) => Derived::Rejected(reason),
        Err(_) => Derived::Panicked,
    }
}

/// Floor-plan entities with their derived scene graph
#[derive(Debug)]
pub struct HomeScene {
    config: SceneConfig,
    silhouettes: Arc<SilhouetteService>,
    levels: SlotMap<LevelKey, LevelEntry>,
    walls: SlotMap<WallKey, WallEntry>,
    openings: SlotMap<OpeningKey, OpeningEntry>,
    rooms: SlotMap<RoomKey, RoomEntry>,
    staircases: SlotMap<StaircaseKey, StaircaseEntry>,
    front_cutouts: FxHashMap<OpeningKey, Arc<Area>>,
    stair_cutouts: FxHashMap<StaircaseKey, Area>,
    dirty: FxHashSet<EntityKey>,
    pending: Vec<CutoutRequest>,
    requested: FxHashSet<(WallKey, OpeningKey, u64)>,
    graph: SceneGraph,
    materials: MaterialTable,
}

impl HomeScene {
    pub fn new(config: SceneConfig, loader: Arc<dyn ModelLoader>) -> Self {
        let cache = Arc::new(SilhouetteCache::new(config.silhouette_cache_capacity));
        let service = Arc::new(SilhouetteService::new(loader, cache));
        Self::with_service(config, service)
    }

    /// Scene sharing an existing silhouette service
    pub fn with_service(config: SceneConfig, silhouettes: Arc<SilhouetteService>) -> Self {
        Self {
            config,
            silhouettes,
            levels: SlotMap::with_key(),
            walls: SlotMap::with_key(),
            openings: SlotMap::with_key(),
            rooms: SlotMap::with_key(),
            staircases: SlotMap::with_key(),
            front_cutouts: FxHashMap::default(),
            stair_cutouts: FxHashMap::default(),
            dirty: FxHashSet::default(),
            pending: Vec::new(),
            requested: FxHashSet::default(),
            graph: SceneGraph::new(),
            materials: MaterialTable::new(),
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn silhouettes(&self) -> &Arc<SilhouetteService> {
        &self.silhouettes
    }

    // =========================================================================
    // Levels
    // =========================================================================

    pub fn add_level(&mut self, level: Level) -> Result<LevelKey> {
        let node = self.graph.add_transformed_group(self.graph.root(), "level", level_transform(&level))?;
        Ok(self.levels.insert(LevelEntry { level, node }))
    }

    /// Move or resize a level; its walls and rooms are rebuilt
    pub fn update_level(&mut self, key: LevelKey, level: Level) -> Result<()> {
        let entry = self.levels.get_mut(key).ok_or(Error::LevelNotFound(key))?;
        entry.level = level;
        let node = entry.node;
        self.graph.set_transform(node, level_transform(&level))?;

        let walls: Vec<WallKey> = self.walls.iter().filter(|(_, w)| w.level == Some(key)).map(|(k, _)| k).collect();
        for wall in walls {
            self.touch_wall(wall);
        }
        let rooms: Vec<RoomKey> = self.rooms.iter().filter(|(_, r)| r.level == Some(key)).map(|(k, _)| k).collect();
        self.dirty.extend(rooms.into_iter().map(EntityKey::Room));
        Ok(())
    }

    pub fn level(&self, key: LevelKey) -> Option<&Level> {
        self.levels.get(key).map(|e| &e.level)
    }

    // =========================================================================
    // Walls
    // =========================================================================

    pub fn add_wall(&mut self, wall: Wall, level: Option<LevelKey>) -> Result<WallKey> {
        self.check_level(level)?;
        let key = self.walls.insert(WallEntry {
            wall,
            level,
            revision: 0,
            node: None,
        });
        self.dirty.insert(EntityKey::Wall(key));
        Ok(key)
    }

    pub fn update_wall(&mut self, key: WallKey, wall: Wall) -> Result<()> {
        let entry = self.walls.get_mut(key).ok_or(Error::WallNotFound(key))?;
        entry.wall = wall;
        self.touch_wall(key);
        Ok(())
    }

    pub fn remove_wall(&mut self, key: WallKey) -> Result<Wall> {
        let entry = self.walls.remove(key).ok_or(Error::WallNotFound(key))?;
        if let Some(node) = entry.node {
            self.graph.remove_subtree(node)?;
        }
        self.dirty.remove(&EntityKey::Wall(key));
        self.pending.retain(|r| r.wall != key);
        self.requested.retain(|(wall, _, _)| *wall != key);
        Ok(entry.wall)
    }

    pub fn wall(&self, key: WallKey) -> Option<&Wall> {
        self.walls.get(key).map(|e| &e.wall)
    }

    /// Scene node holding the wall's geometry, if it has any
    pub fn wall_node(&self, key: WallKey) -> Option<NodeKey> {
        self.walls.get(key).and_then(|e| e.node)
    }

    pub fn wall_revision(&self, key: WallKey) -> Option<u64> {
        self.walls.get(key).map(|e| e.revision)
    }

    // =========================================================================
    // Openings
    // =========================================================================

    pub fn add_opening(&mut self, opening: Opening, level: Option<LevelKey>) -> Result<OpeningKey> {
        self.check_level(level)?;
        for wall in self.walls_near(&opening, level) {
            self.touch_wall(wall);
        }
        Ok(self.openings.insert(OpeningEntry { opening, level }))
    }

    pub fn update_opening(&mut self, key: OpeningKey, opening: Opening) -> Result<()> {
        let entry = self.openings.get(key).ok_or(Error::OpeningNotFound(key))?;
        let level = entry.level;
        let mut walls = self.walls_near(&entry.opening, level);
        walls.extend(self.walls_near(&opening, level));
        for wall in walls {
            self.touch_wall(wall);
        }
        if let Some(entry) = self.openings.get_mut(key) {
            entry.opening = opening;
        }
        self.front_cutouts.remove(&key);
        Ok(())
    }

    pub fn remove_opening(&mut self, key: OpeningKey) -> Result<Opening> {
        let entry = self.openings.remove(key).ok_or(Error::OpeningNotFound(key))?;
        for wall in self.walls_near(&entry.opening, entry.level) {
            self.touch_wall(wall);
        }
        self.front_cutouts.remove(&key);
        self.pending.retain(|r| r.opening != key);
        Ok(entry.opening)
    }

    pub fn opening(&self, key: OpeningKey) -> Option<&Opening> {
        self.openings.get(key).map(|e| &e.opening)
    }

    // =========================================================================
    // Rooms and staircases
    // =========================================================================

    pub fn add_room(&mut self, room: Room, level: Option<LevelKey>) -> Result<RoomKey> {
        self.check_level(level)?;
        let key = self.rooms.insert(RoomEntry { room, level, node: None });
        self.dirty.insert(EntityKey::Room(key));
        Ok(key)
    }

    pub fn update_room(&mut self, key: RoomKey, room: Room) -> Result<()> {
        let entry = self.rooms.get_mut(key).ok_or(Error::RoomNotFound(key))?;
        entry.room = room;
        self.dirty.insert(EntityKey::Room(key));
        Ok(())
    }

    pub fn remove_room(&mut self, key: RoomKey) -> Result<Room> {
        let entry = self.rooms.remove(key).ok_or(Error::RoomNotFound(key))?;
        if let Some(node) = entry.node {
            self.graph.remove_subtree(node)?;
        }
        self.dirty.remove(&EntityKey::Room(key));
        Ok(entry.room)
    }

    pub fn room(&self, key: RoomKey) -> Option<&Room> {
        self.rooms.get(key).map(|e| &e.room)
    }

    pub fn room_node(&self, key: RoomKey) -> Option<NodeKey> {
        self.rooms.get(key).and_then(|e| e.node)
    }

    pub fn add_staircase(&mut self, staircase: Staircase, level: Option<LevelKey>) -> Result<StaircaseKey> {
        self.check_level(level)?;
        let key = self.staircases.insert(StaircaseEntry { staircase, level });
        self.touch_rooms_around(level);
        Ok(key)
    }

    pub fn update_staircase(&mut self, key: StaircaseKey, staircase: Staircase) -> Result<()> {
        let entry = self.staircases.get_mut(key).ok_or(Error::StaircaseNotFound(key))?;
        entry.staircase = staircase;
        let level = entry.level;
        self.stair_cutouts.remove(&key);
        self.touch_rooms_around(level);
        Ok(())
    }

    pub fn remove_staircase(&mut self, key: StaircaseKey) -> Result<Staircase> {
        let entry = self.staircases.remove(key).ok_or(Error::StaircaseNotFound(key))?;
        self.stair_cutouts.remove(&key);
        self.touch_rooms_around(entry.level);
        Ok(entry.staircase)
    }

    // =========================================================================
    // Updates
    // =========================================================================

    /// Entities waiting for [`update`](Self::update)
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Rebuild every wall and room
    pub fn update_all(&mut self) -> UpdateReport {
        let walls: Vec<EntityKey> = self.walls.keys().map(EntityKey::Wall).collect();
        let rooms: Vec<EntityKey> = self.rooms.keys().map(EntityKey::Room).collect();
        self.dirty.extend(walls);
        self.dirty.extend(rooms);
        self.update()
    }

    /// Rebuild the geometry of every dirty entity
    pub fn update(&mut self) -> UpdateReport {
        let mut walls = Vec::new();
        let mut rooms = Vec::new();
        for key in self.dirty.drain() {
            match key {
                EntityKey::Wall(k) => walls.push(k),
                EntityKey::Room(k) => rooms.push(k),
                EntityKey::Opening(_) | EntityKey::Staircase(_) => {}
            }
        }
        walls.retain(|&k| self.walls.contains_key(k));
        rooms.retain(|&k| self.rooms.contains_key(k));

        if self.config.cutout_policy == CutoutPolicy::Wait {
            self.load_front_cutouts(&walls);
        }
        if !rooms.is_empty() {
            self.load_stair_cutouts();
        }

        let wall_results = self.derive_walls(&walls);
        let room_results = self.derive_rooms(&rooms);

        let mut report = UpdateReport::default();
        for (key, outcome) in wall_results {
            if self.apply_wall(key, outcome) {
                report.walls += 1;
            } else {
                report.failed.push(EntityKey::Wall(key));
            }
        }
        for (key, outcome) in room_results {
            if self.apply_room(key, outcome) {
                report.rooms += 1;
            } else {
                report.failed.push(EntityKey::Room(key));
            }
        }
        tracing::debug!(
            walls = report.walls,
            rooms = report.rooms,
            failed = report.failed.len(),
            pending = self.pending.len(),
            "Scene update done"
        );
        report
    }

    /// Requests queued by deferred wall updates since the last call
    pub fn take_pending(&mut self) -> Vec<CutoutRequest> {
        std::mem::take(&mut self.pending)
    }

    /// Hand a loaded silhouette back to its wall
    ///
    /// Returns `false`, leaving the scene untouched, when the wall or the
    /// opening is gone or the wall changed since the request was issued.
    pub fn apply_cutout(&mut self, result: CutoutResult) -> bool {
        let request = &result.request;
        self.requested
            .remove(&(request.wall, request.opening, request.revision));
        let Some(entry) = self.walls.get(request.wall) else {
            tracing::debug!(wall = ?request.wall, "Discarding cut-out for removed wall");
            return false;
        };
        if entry.revision != request.revision || !self.openings.contains_key(request.opening) {
            tracing::debug!(
                wall = ?request.wall,
                opening = ?request.opening,
                revision = request.revision,
                current = entry.revision,
                "Discarding stale cut-out"
            );
            return false;
        }

        self.front_cutouts.insert(request.opening, Arc::clone(&result.cutout));
        let wall = request.wall;
        for (key, outcome) in self.derive_walls(&[wall]) {
            self.apply_wall(key, outcome);
        }
        true
    }

    // =========================================================================
    // Derivation
    // =========================================================================

    fn wall_options(&self) -> WallGeometryOptions {
        WallGeometryOptions {
            flatness: self.config.flatness,
            subpart_size: self.config.subpart_size,
            crease_angle: self.config.crease_angle_degrees,
            texture: None,
        }
    }

    fn cutout_state(&self, key: OpeningKey, opening: &Opening) -> CutoutState {
        if let Some(shape) = &opening.cut_out_shape {
            return CutoutState::Ready(Arc::new(shape.clone()));
        }
        let Some(model) = &opening.model else {
            return CutoutState::Rectangular;
        };
        if let Some(area) = self.front_cutouts.get(&key) {
            return CutoutState::Ready(Arc::clone(area));
        }
        match self.silhouettes.cached(model, Projection::Front) {
            Some(area) => CutoutState::Ready(area),
            None => CutoutState::Pending,
        }
    }

    /// Load, blocking, the silhouettes the given walls still miss
    fn load_front_cutouts(&mut self, walls: &[WallKey]) {
        let mut needed: Vec<(OpeningKey, ModelRef)> = Vec::new();
        let mut seen = FxHashSet::default();
        for &wall in walls {
            for key in self.openings_near_wall(wall) {
                if self.front_cutouts.contains_key(&key) || !seen.insert(key) {
                    continue;
                }
                let opening = &self.openings[key].opening;
                if let (None, Some(model)) = (&opening.cut_out_shape, &opening.model) {
                    needed.push((key, model.clone()));
                }
            }
        }
        if needed.is_empty() {
            return;
        }

        let service = Arc::clone(&self.silhouettes);
        let load = |(key, model): &(OpeningKey, ModelRef)| (*key, service.front_cutout_blocking(model));
        let loaded: Vec<(OpeningKey, Arc<Area>)> = if self.config.parallel_updates {
            needed.par_iter().map(load).collect()
        } else {
            needed.iter().map(load).collect()
        };
        self.front_cutouts.extend(loaded);
    }

    /// Plan cut-outs of staircases not computed yet
    fn load_stair_cutouts(&mut self) {
        let missing: Vec<StaircaseKey> = self
            .staircases
            .keys()
            .filter(|k| !self.stair_cutouts.contains_key(k))
            .collect();
        for key in missing {
            let staircase = &self.staircases[key].staircase;
            let cut = match (&staircase.cut_out_shape, &staircase.model) {
                (None, Some(model)) => {
                    let silhouette = self.silhouettes.top_footprint_blocking(model);
                    staircase.cut_out(Some(silhouette.as_ref()))
                }
                _ => staircase.cut_out(None),
            };
            self.stair_cutouts.insert(key, cut);
        }
    }

    fn derive_walls(&self, keys: &[WallKey]) -> Vec<(WallKey, Derived<WallGeometry>)> {
        let options = self.wall_options();
        let derive = |&key: &WallKey| {
            let entry = &self.walls[key];
            let openings: Vec<WallOpening<'_>> = self
                .openings_near_wall(key)
                .into_iter()
                .map(|k| {
                    let opening = &self.openings[k].opening;
                    WallOpening {
                        id: opening_id(k),
                        opening,
                        cutout: self.cutout_state(k, opening),
                    }
                })
                .collect();
            let outcome = contained(|| build_wall_geometry(&entry.wall, &openings, &options).map_err(|e| e.to_string()));
            (key, outcome)
        };
        if self.config.parallel_updates && keys.len() > 1 {
            keys.par_iter().map(derive).collect()
        } else {
            keys.iter().map(derive).collect()
        }
    }

    fn derive_rooms(&self, keys: &[RoomKey]) -> Vec<(RoomKey, Derived<SubMeshCollection>)> {
        let flatness = self.config.flatness;
        let derive = |&key: &RoomKey| {
            let entry = &self.rooms[key];
            let level = self.level_or_default(entry.level);
            let cutouts = self.room_cutouts(entry.level);
            let outcome = contained(|| Ok(build_room_faces(&entry.room, &level, &cutouts, flatness)));
            (key, outcome)
        };
        if self.config.parallel_updates && keys.len() > 1 {
            keys.par_iter().map(derive).collect()
        } else {
            keys.iter().map(derive).collect()
        }
    }

    /// Staircases on `level` cut its ceilings; those coming up from the level
    /// below cut its floors
    fn room_cutouts(&self, level: Option<LevelKey>) -> RoomCutouts {
        let reaching = |on: Option<LevelKey>| -> Vec<Area> {
            let height = self.level_or_default(on).height;
            self.staircases
                .iter()
                .filter(|(_, s)| s.level == on && s.staircase.top() >= height - STAIRCASE_REACH_TOLERANCE)
                .filter_map(|(k, _)| self.stair_cutouts.get(&k).cloned())
                .collect()
        };
        RoomCutouts {
            floor: self.level_below(level).map(|below| reaching(Some(below))).unwrap_or_default(),
            ceiling: reaching(level),
        }
    }

    // =========================================================================
    // Applying results
    // =========================================================================

    fn apply_wall(&mut self, key: WallKey, outcome: Derived<WallGeometry>) -> bool {
        let Some(entry) = self.walls.get_mut(key) else {
            return false;
        };
        let old = entry.node.take();
        let level = entry.level;
        let revision = entry.revision;
        if let Some(old) = old {
            if let Err(e) = self.graph.remove_subtree(old) {
                tracing::warn!(wall = ?key, error = %e, "Stale wall node");
            }
        }

        let geometry = match outcome {
            Derived::Built(geometry) => geometry,
            Derived::Rejected(reason) => {
                tracing::warn!(wall = ?key, error = %reason, "Wall geometry rejected");
                return false;
            }
            Derived::Panicked => {
                tracing::error!(wall = ?key, "Wall geometry derivation panicked");
                return false;
            }
        };

        let parts = geometry.parts.len();
        let node = match self.attach_parts("wall", level, geometry.parts) {
            Ok(node) => node,
            Err(e) => {
                tracing::error!(wall = ?key, error = %e, "Could not attach wall geometry");
                return false;
            }
        };
        if let Some(entry) = self.walls.get_mut(key) {
            entry.node = Some(node);
        }

        for id in geometry.pending_cutouts {
            let opening = opening_key(id);
            let Some(model) = self.openings.get(opening).and_then(|o| o.opening.model.clone()) else {
                continue;
            };
            if self.requested.insert((key, opening, revision)) {
                self.pending.push(CutoutRequest {
                    wall: key,
                    opening,
                    revision,
                    model,
                });
            }
        }
        tracing::debug!(wall = ?key, parts, revision, "Rebuilt wall geometry");
        true
    }

    fn apply_room(&mut self, key: RoomKey, outcome: Derived<SubMeshCollection>) -> bool {
        let Some(entry) = self.rooms.get_mut(key) else {
            return false;
        };
        let old = entry.node.take();
        let level = entry.level;
        if let Some(old) = old {
            if let Err(e) = self.graph.remove_subtree(old) {
                tracing::warn!(room = ?key, error = %e, "Stale room node");
            }
        }

        let parts = match outcome {
            Derived::Built(parts) => parts,
            Derived::Rejected(reason) => {
                tracing::warn!(room = ?key, error = %reason, "Room geometry rejected");
                return false;
            }
            Derived::Panicked => {
                tracing::error!(room = ?key, "Room geometry derivation panicked");
                return false;
            }
        };
        match self.attach_parts("room", level, parts) {
            Ok(node) => {
                if let Some(entry) = self.rooms.get_mut(key) {
                    entry.node = Some(node);
                }
                tracing::debug!(room = ?key, "Rebuilt room geometry");
                true
            }
            Err(e) => {
                tracing::error!(room = ?key, error = %e, "Could not attach room geometry");
                false
            }
        }
    }

    /// Group of leaves, one per sub-mesh, under the level's node
    fn attach_parts(&mut self, name: &str, level: Option<LevelKey>, parts: SubMeshCollection) -> Result<NodeKey> {
        let parent = level
            .and_then(|l| self.levels.get(l))
            .map_or(self.graph.root(), |e| e.node);
        let node = self.graph.add_group(parent, name)?;
        for sub in parts.sub_meshes {
            let material = self.materials.for_surface(sub.surface);
            self.graph.add_leaf(node, sub.mesh, material, Some(sub.surface))?;
        }
        Ok(node)
    }

    // =========================================================================
    // Neighbourhoods
    // =========================================================================

    fn check_level(&self, level: Option<LevelKey>) -> Result<()> {
        match level {
            Some(key) if !self.levels.contains_key(key) => Err(Error::LevelNotFound(key)),
            _ => Ok(()),
        }
    }

    fn level_or_default(&self, level: Option<LevelKey>) -> Level {
        level
            .and_then(|k| self.levels.get(k))
            .map_or_else(Level::default, |e| e.level)
    }

    /// Highest level under `level`
    fn level_below(&self, level: Option<LevelKey>) -> Option<LevelKey> {
        let elevation = self.levels.get(level?)?.level.elevation;
        self.levels
            .iter()
            .filter(|(_, e)| e.level.elevation < elevation)
            .max_by(|(_, a), (_, b)| a.level.elevation.total_cmp(&b.level.elevation))
            .map(|(k, _)| k)
    }

    fn touch_wall(&mut self, key: WallKey) {
        if let Some(entry) = self.walls.get_mut(key) {
            entry.revision += 1;
            self.dirty.insert(EntityKey::Wall(key));
        }
    }

    /// Rooms whose ceiling or floor a staircase on `level` may cut
    fn touch_rooms_around(&mut self, level: Option<LevelKey>) {
        let above: Option<LevelKey> = level.and_then(|l| {
            self.levels
                .keys()
                .find(|&candidate| self.level_below(Some(candidate)) == Some(l))
        });
        let rooms: Vec<RoomKey> = self
            .rooms
            .iter()
            .filter(|(_, r)| r.level == level || (above.is_some() && r.level == above))
            .map(|(k, _)| k)
            .collect();
        self.dirty.extend(rooms.into_iter().map(EntityKey::Room));
    }

    fn walls_near(&self, opening: &Opening, level: Option<LevelKey>) -> Vec<WallKey> {
        self.walls
            .iter()
            .filter(|(_, w)| w.level == level && opening_reaches(&w.wall, opening))
            .map(|(k, _)| k)
            .collect()
    }

    fn openings_near_wall(&self, key: WallKey) -> Vec<OpeningKey> {
        let Some(entry) = self.walls.get(key) else {
            return Vec::new();
        };
        self.openings
            .iter()
            .filter(|(_, o)| o.level == entry.level && opening_reaches(&entry.wall, &o.opening))
            .map(|(k, _)| k)
            .collect()
    }
}

fn level_transform(level: &Level) -> Matrix4<f64> {
    Matrix4::new_translation(&Vector3::new(0.0, 0.0, level.elevation))
}

/// Whether the bounds of what `opening` carves meet the bounds of `wall`,
/// baseboards included
fn opening_reaches(wall: &Wall, opening: &Opening) -> bool {
    let margin = [WallSide::Left, WallSide::Right]
        .into_iter()
        .filter_map(|side| wall.baseboard(side))
        .map(|b| b.thickness)
        .fold(0.0, f64::max);
    let Some((wall_min, wall_max)) = contour_bounds(&wall.points()) else {
        return false;
    };
    let grow = Vector2::new(margin, margin);
    let Some((min, max)) = opening
        .footprint_with_depth(opening.depth + 2.0 * wall.thickness)
        .bounds()
    else {
        return false;
    };
    bounds_overlap(&(wall_min - grow), &(wall_max + grow), &min, &max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use home3d_geometry::{Mesh, Surface};

    struct NoModels;

    impl ModelLoader for NoModels {
        fn load(&self, model: &ModelRef) -> BoxFuture<'static, Result<Arc<Mesh>>> {
            let err = Error::ModelLoad {
                uri: model.uri.clone(),
                reason: "no models in unit tests".into(),
            };
            futures::future::ready(Err(err)).boxed()
        }
    }

    fn scene_without_models() -> HomeScene {
        HomeScene::new(SceneConfig::default(), Arc::new(NoModels))
    }

    fn wall() -> Wall {
        Wall::new(0.0, 0.0, 400.0, 0.0, 20.0, 250.0)
    }

    #[test]
    fn walls_rebuild_when_dirty() {
        let mut scene = scene_without_models();
        let key = scene.add_wall(wall(), None).unwrap();
        assert_eq!(scene.dirty_count(), 1);
        let report = scene.update();
        assert_eq!(report.walls, 1);
        assert!(scene.wall_node(key).is_some());
        assert_eq!(scene.update(), UpdateReport::default());
    }

    #[test]
    fn opening_touches_only_nearby_walls() {
        let mut scene = scene_without_models();
        let near = scene.add_wall(wall(), None).unwrap();
        let far = scene.add_wall(Wall::new(0.0, 500.0, 400.0, 500.0, 20.0, 250.0), None).unwrap();
        scene.update();

        scene
            .add_opening(Opening::new(200.0, 0.0, 0.0, 100.0, 20.0, 100.0, 100.0), None)
            .unwrap();
        assert_eq!(scene.wall_revision(near), Some(1));
        assert_eq!(scene.wall_revision(far), Some(0));
        assert_eq!(scene.update().walls, 1);
    }

    #[test]
    fn invalid_wall_renders_nothing() {
        let mut scene = scene_without_models();
        let key = scene.add_wall(Wall::new(5.0, 5.0, 5.0, 5.0, 20.0, 250.0), None).unwrap();
        let report = scene.update();
        assert_eq!(report.failed, vec![EntityKey::Wall(key)]);
        assert!(scene.wall_node(key).is_none());
    }

    #[test]
    fn removing_wall_clears_its_nodes() {
        let mut scene = scene_without_models();
        let key = scene.add_wall(wall(), None).unwrap();
        scene.update();
        let nodes = scene.graph().node_count();
        assert!(nodes > 1);
        scene.remove_wall(key).unwrap();
        assert_eq!(scene.graph().node_count(), 1);
        assert!(matches!(scene.remove_wall(key), Err(Error::WallNotFound(_))));
    }

    #[test]
    fn unknown_level_is_rejected() {
        let mut scene = scene_without_models();
        let level = scene.add_level(Level::default()).unwrap();
        // A key this scene never issued
        let mut other = scene_without_models();
        other.add_level(Level::default()).unwrap();
        let foreign = other.add_level(Level::default()).unwrap();
        assert!(scene.add_wall(wall(), Some(level)).is_ok());
        assert!(matches!(scene.add_wall(wall(), Some(foreign)), Err(Error::LevelNotFound(_))));
    }

    #[test]
    fn failed_model_load_carves_plain_rectangle() {
        let mut scene = scene_without_models();
        let key = scene.add_wall(wall(), None).unwrap();
        let opening = Opening::new(200.0, 0.0, 0.0, 100.0, 20.0, 100.0, 100.0)
            .with_model(ModelRef::new("window.obj"));
        scene.add_opening(opening, None).unwrap();
        let report = scene.update();
        assert_eq!(report.walls, 1);
        assert!(scene.take_pending().is_empty());

        let node = scene.wall_node(key).unwrap();
        let surfaces: Vec<Surface> = scene
            .graph()
            .children(node)
            .iter()
            .filter_map(|&c| match scene.graph().node(c) {
                Some(crate::arena::SceneNode::Leaf { surface, .. }) => *surface,
                _ => None,
            })
            .collect();
        assert!(surfaces.contains(&Surface::OpeningEdge(WallSide::Left)));
        assert!(!surfaces.iter().any(|s| matches!(s, Surface::OpeningSurround { .. })));
    }
}
