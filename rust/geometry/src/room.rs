// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rooms, levels and staircases
//!
//! Room floors face up at the level's floor, ceilings face down at the
//! level's height. Staircases cut holes in the floor they stand on and in
//! the ceiling of the level below their top.

use crate::area::Area;
use crate::elevation::ElevationFunction;
use crate::face::build_horizontal_face;
use crate::mesh::{SubMeshCollection, Surface};
use crate::opening::ModelRef;
use crate::polygon::{compute_signed_area, rotated_rectangle};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// A storey of the home
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    /// Elevation of the floor top above the ground
    pub elevation: f64,
    /// Height from the floor top to the ceiling
    pub height: f64,
    #[serde(default)]
    pub floor_thickness: f64,
}

impl Level {
    pub fn new(elevation: f64, height: f64, floor_thickness: f64) -> Self {
        Self {
            elevation,
            height,
            floor_thickness,
        }
    }

    /// Elevation of the ceiling above the ground
    #[inline]
    pub fn ceiling_elevation(&self) -> f64 {
        self.elevation + self.height
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::new(0.0, 250.0, 12.0)
    }
}

/// A room outline as drawn in the floor plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(default)]
    pub name: Option<String>,
    pub points: Vec<[f64; 2]>,
    #[serde(default = "default_true")]
    pub floor_visible: bool,
    #[serde(default = "default_true")]
    pub ceiling_visible: bool,
}

impl Room {
    pub fn new(points: &[Point2<f64>]) -> Self {
        Self {
            name: None,
            points: points.iter().map(|p| [p.x, p.y]).collect(),
            floor_visible: true,
            ceiling_visible: true,
        }
    }

    pub fn polygon(&self) -> Vec<Point2<f64>> {
        self.points.iter().map(|p| Point2::new(p[0], p[1])).collect()
    }

    /// Outline drawn clockwise in the plan
    pub fn is_clockwise(&self) -> bool {
        compute_signed_area(&self.polygon()) < 0.0
    }

    /// Surface enclosed by the outline, self-intersections resolved
    pub fn area(&self) -> Area {
        Area::from_polygon(&self.polygon())
    }
}

/// A staircase: a piece of furniture that cuts floors and ceilings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staircase {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub width: f64,
    pub depth: f64,
    pub height: f64,
    #[serde(default)]
    pub elevation: f64,
    #[serde(default)]
    pub model: Option<ModelRef>,
    /// Top silhouette in normalized `[-0.5, 0.5]²` space; replaces the
    /// silhouette of `model` when set
    #[serde(default)]
    pub cut_out_shape: Option<Area>,
}

impl Staircase {
    pub fn new(x: f64, y: f64, angle: f64, width: f64, depth: f64, height: f64) -> Self {
        Self {
            x,
            y,
            angle,
            width,
            depth,
            height,
            elevation: 0.0,
            model: None,
            cut_out_shape: None,
        }
    }

    /// Bounding rectangle of the staircase in the plan
    pub fn footprint(&self) -> Area {
        Area::from_polygon(&rotated_rectangle(self.x, self.y, self.width, self.depth, self.angle))
    }

    /// Floor cut-out: `silhouette` scaled into the footprint, or the whole
    /// footprint without one
    pub fn cut_out(&self, silhouette: Option<&Area>) -> Area {
        let Some(silhouette) = silhouette.or(self.cut_out_shape.as_ref()) else {
            return self.footprint();
        };
        let (sin, cos) = self.angle.sin_cos();
        silhouette.map_points(|p| {
            let lx = p.x * self.width;
            let ly = p.y * self.depth;
            Point2::new(self.x + lx * cos - ly * sin, self.y + lx * sin + ly * cos)
        })
    }

    /// Elevation of the staircase top above its level's floor
    #[inline]
    pub fn top(&self) -> f64 {
        self.elevation + self.height
    }
}

/// Areas removed from a room's floor and ceiling
#[derive(Debug, Clone, Default)]
pub struct RoomCutouts {
    pub floor: Vec<Area>,
    pub ceiling: Vec<Area>,
}

fn subtract_all(area: Area, cutouts: &[Area]) -> Area {
    cutouts.iter().fold(area, |acc, c| acc.subtract(c))
}

/// Floor and ceiling faces of `room`, relative to the level's floor
pub fn build_room_faces(room: &Room, level: &Level, cutouts: &RoomCutouts, flatness: f64) -> SubMeshCollection {
    let mut parts = SubMeshCollection::new();
    let area = room.area();
    if area.is_empty() {
        return parts;
    }

    if room.floor_visible {
        let floor = subtract_all(area.clone(), &cutouts.floor);
        parts.add_opt(
            Surface::RoomFloor,
            build_horizontal_face(&floor, ElevationFunction::flat(0.0).into(), true, flatness),
        );
    }
    if room.ceiling_visible && level.height > 0.0 {
        let ceiling = subtract_all(area, &cutouts.ceiling);
        parts.add_opt(
            Surface::RoomCeiling,
            build_horizontal_face(&ceiling, ElevationFunction::flat(level.height).into(), false, flatness),
        );
    }
    parts
}
