// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for arena-based storage.
//!
//! Floor-plan entities and scene nodes are stored in `slotmap::SlotMap`s.
//! Keys are generational: a key to a removed entity never resolves to the
//! entity that later reuses its slot, which is what makes late silhouette
//! results safe to discard.

use home3d_geometry::OpeningId;
use slotmap::{new_key_type, Key, KeyData};

new_key_type! {
    /// Key for a level (storey).
    pub struct LevelKey;

    /// Key for a wall.
    pub struct WallKey;

    /// Key for a door or window.
    pub struct OpeningKey;

    /// Key for a room.
    pub struct RoomKey;

    /// Key for a staircase.
    pub struct StaircaseKey;

    /// Key for a mesh stored in the mesh arena.
    pub struct MeshKey;

    /// Key for a scene graph node.
    pub struct NodeKey;
}

/// A key that can reference any floor-plan entity with derived geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Wall(WallKey),
    Opening(OpeningKey),
    Room(RoomKey),
    Staircase(StaircaseKey),
}

impl EntityKey {
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityKey::Wall(_) => EntityType::Wall,
            EntityKey::Opening(_) => EntityType::Opening,
            EntityKey::Room(_) => EntityType::Room,
            EntityKey::Staircase(_) => EntityType::Staircase,
        }
    }
}

/// Discriminant for entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    Wall = 0,
    Opening = 1,
    Room = 2,
    Staircase = 3,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Wall => "Wall",
            EntityType::Opening => "Opening",
            EntityType::Room => "Room",
            EntityType::Staircase => "Staircase",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<WallKey> for EntityKey {
    fn from(k: WallKey) -> Self {
        EntityKey::Wall(k)
    }
}

impl From<OpeningKey> for EntityKey {
    fn from(k: OpeningKey) -> Self {
        EntityKey::Opening(k)
    }
}

impl From<RoomKey> for EntityKey {
    fn from(k: RoomKey) -> Self {
        EntityKey::Room(k)
    }
}

impl From<StaircaseKey> for EntityKey {
    fn from(k: StaircaseKey) -> Self {
        EntityKey::Staircase(k)
    }
}

/// Geometry-level id of an opening, stable for the life of its key
#[inline]
pub fn opening_id(key: OpeningKey) -> OpeningId {
    OpeningId(key.data().as_ffi())
}

/// Opening key an id was made from
#[inline]
pub fn opening_key(id: OpeningId) -> OpeningKey {
    OpeningKey::from(KeyData::from_ffi(id.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn entity_type_names() {
        assert_eq!(EntityType::Wall.as_str(), "Wall");
        assert_eq!(EntityType::Opening.to_string(), "Opening");
        assert!(EntityType::Wall < EntityType::Staircase);
    }

    #[test]
    fn opening_ids_round_trip() {
        let mut map: SlotMap<OpeningKey, ()> = SlotMap::with_key();
        let a = map.insert(());
        let b = map.insert(());
        assert_ne!(opening_id(a), opening_id(b));
        assert_eq!(opening_key(opening_id(b)), b);
    }

    #[test]
    fn reused_slot_gets_new_id() {
        let mut map: SlotMap<OpeningKey, ()> = SlotMap::with_key();
        let a = map.insert(());
        map.remove(a);
        let b = map.insert(());
        assert_ne!(opening_id(a), opening_id(b));
        assert!(map.get(opening_key(opening_id(a))).is_none());
    }

    #[test]
    fn entity_key_discrimination() {
        let mut walls: SlotMap<WallKey, ()> = SlotMap::with_key();
        let key: EntityKey = walls.insert(()).into();
        assert_eq!(key.entity_type(), EntityType::Wall);
    }
}
