// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Materials
//!
//! Plain colour materials are pure values and shared process-wide; every
//! scene keeps its own table of the materials its nodes use.

use home3d_geometry::Surface;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock, RwLock};

/// Index of a material in a scene's [`MaterialTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Linear RGBA in `[0, 1]`
    pub color: [f32; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
}

impl Material {
    /// Opaque or translucent colour from packed `0xRRGGBBAA`
    pub fn from_rgba(rgba: u32) -> Self {
        let channel = |shift: u32| ((rgba >> shift) & 0xff) as f32 / 255.0;
        Self {
            name: format!("color-{:08x}", rgba),
            color: [channel(24), channel(16), channel(8), channel(0)],
            texture: None,
        }
    }
}

fn color_cache() -> &'static RwLock<FxHashMap<u32, Arc<Material>>> {
    static CACHE: OnceLock<RwLock<FxHashMap<u32, Arc<Material>>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(FxHashMap::default()))
}

/// Shared colour material for `rgba`
pub fn color_material(rgba: u32) -> Arc<Material> {
    if let Ok(cache) = color_cache().read() {
        if let Some(material) = cache.get(&rgba) {
            return Arc::clone(material);
        }
    }
    let material = Arc::new(Material::from_rgba(rgba));
    match color_cache().write() {
        Ok(mut cache) => Arc::clone(cache.entry(rgba).or_insert(material)),
        // A poisoned cache only loses sharing
        Err(_) => material,
    }
}

/// Default colour of each kind of surface, `0xRRGGBBAA`
pub fn surface_color(surface: Surface) -> u32 {
    match surface {
        Surface::WallSide(_) | Surface::OpeningSurround { .. } => 0xf2f2f2ff,
        Surface::WallTop | Surface::WallBottom | Surface::OpeningEdge(_) => 0xd9d9d9ff,
        Surface::Baseboard(_) => 0xffffffff,
        Surface::RoomFloor => 0xc8b496ff,
        Surface::RoomCeiling => 0xfafafaff,
    }
}

/// Materials used by one scene
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    materials: Vec<Arc<Material>>,
    by_name: FxHashMap<String, MaterialId>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `material`, adding it if no material with its name exists yet
    pub fn get_or_insert(&mut self, material: Arc<Material>) -> MaterialId {
        if let Some(&id) = self.by_name.get(&material.name) {
            return id;
        }
        let id = MaterialId(self.materials.len() as u32);
        self.by_name.insert(material.name.clone(), id);
        self.materials.push(material);
        id
    }

    pub fn color(&mut self, rgba: u32) -> MaterialId {
        self.get_or_insert(color_material(rgba))
    }

    pub fn for_surface(&mut self, surface: Surface) -> MaterialId {
        self.color(surface_color(surface))
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize).map(|m| m.as_ref())
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, m)| (MaterialId(i as u32), m.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use home3d_geometry::WallSide;

    #[test]
    fn colour_materials_are_shared() {
        let a = color_material(0x11223344);
        let b = color_material(0x11223344);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name, "color-11223344");
        assert!((a.color[0] - 0x11 as f32 / 255.0).abs() < 1e-6);
        assert!((a.color[3] - 0x44 as f32 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn table_deduplicates_by_name() {
        let mut table = MaterialTable::new();
        let wall = table.for_surface(Surface::WallSide(WallSide::Left));
        let other_side = table.for_surface(Surface::WallSide(WallSide::Right));
        let floor = table.for_surface(Surface::RoomFloor);
        assert_eq!(wall, other_side);
        assert_ne!(wall, floor);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(floor).map(|m| m.name.as_str()), Some("color-c8b496ff"));
    }

    #[test]
    fn textured_material_keeps_its_name() {
        let mut table = MaterialTable::new();
        let brick = Arc::new(Material {
            name: "brick".into(),
            color: [1.0; 4],
            texture: Some("textures/brick.png".into()),
        });
        let id = table.get_or_insert(Arc::clone(&brick));
        assert_eq!(table.get_or_insert(brick), id);
        assert_eq!(table.iter().count(), 1);
    }
}
