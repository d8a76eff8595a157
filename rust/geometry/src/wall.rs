// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall model and footprints
//!
//! A wall runs from its start point to its end point along a straight line
//! or, when `arc_extent` is set, along a circular arc. Its footprint is the
//! band of `thickness` centered on that line. Heights are measured from the
//! wall bottom; a different `height_at_end` gives a sloped (trapezoidal)
//! top.

use crate::area::Area;
use crate::elevation::{ElevationFunction, WallFrame, ARC_STEP};
use crate::error::{Error, Result};
use crate::polygon::EPSILON_2D;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Distance under which a point counts as lying on the wall's nominal line
pub const WALL_LINE_EPSILON: f64 = 1e-3;

/// Arc extents below this are treated as straight walls
const MIN_ARC_EXTENT: f64 = 1e-6;

/// Side of a wall, looking from its start to its end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WallSide {
    Left,
    Right,
}

impl WallSide {
    pub const BOTH: [WallSide; 2] = [WallSide::Left, WallSide::Right];

    /// +1 for the left side, -1 for the right side
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            WallSide::Left => 1.0,
            WallSide::Right => -1.0,
        }
    }
}

/// Skirting strip running along the bottom of one wall side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseboard {
    pub thickness: f64,
    pub height: f64,
}

/// A wall as stored in the floor plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub x_start: f64,
    pub y_start: f64,
    pub x_end: f64,
    pub y_end: f64,
    pub thickness: f64,
    /// Height at the start point
    pub height: f64,
    /// Height at the end point, if different from `height`
    #[serde(default)]
    pub height_at_end: Option<f64>,
    /// Signed sweep of a curved wall in radians (positive turns left)
    #[serde(default)]
    pub arc_extent: Option<f64>,
    #[serde(default)]
    pub left_baseboard: Option<Baseboard>,
    #[serde(default)]
    pub right_baseboard: Option<Baseboard>,
}

/// Circle a curved wall follows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallArc {
    pub center: Point2<f64>,
    pub radius: f64,
    pub start_angle: f64,
    pub extent: f64,
}

impl Wall {
    pub fn new(x_start: f64, y_start: f64, x_end: f64, y_end: f64, thickness: f64, height: f64) -> Self {
        Self {
            x_start,
            y_start,
            x_end,
            y_end,
            thickness,
            height,
            height_at_end: None,
            arc_extent: None,
            left_baseboard: None,
            right_baseboard: None,
        }
    }

    pub fn with_height_at_end(mut self, height_at_end: f64) -> Self {
        self.height_at_end = Some(height_at_end);
        self
    }

    pub fn with_arc_extent(mut self, extent: f64) -> Self {
        self.arc_extent = Some(extent);
        self
    }

    pub fn with_baseboard(mut self, side: WallSide, baseboard: Baseboard) -> Self {
        match side {
            WallSide::Left => self.left_baseboard = Some(baseboard),
            WallSide::Right => self.right_baseboard = Some(baseboard),
        }
        self
    }

    #[inline]
    pub fn start(&self) -> Point2<f64> {
        Point2::new(self.x_start, self.y_start)
    }

    #[inline]
    pub fn end(&self) -> Point2<f64> {
        Point2::new(self.x_end, self.y_end)
    }

    /// Straight distance between start and end
    pub fn length(&self) -> f64 {
        (self.end() - self.start()).norm()
    }

    /// Direction angle from start to end
    pub fn angle(&self) -> f64 {
        (self.y_end - self.y_start).atan2(self.x_end - self.x_start)
    }

    pub fn height_at_end(&self) -> f64 {
        self.height_at_end.unwrap_or(self.height)
    }

    /// Whether the top is sloped
    pub fn is_trapezoidal(&self) -> bool {
        self.height_at_end.is_some_and(|h| h != self.height)
    }

    pub fn baseboard(&self, side: WallSide) -> Option<&Baseboard> {
        match side {
            WallSide::Left => self.left_baseboard.as_ref(),
            WallSide::Right => self.right_baseboard.as_ref(),
        }
    }

    /// Reject walls no footprint can be built for
    pub fn validate(&self) -> Result<()> {
        let coords = [self.x_start, self.y_start, self.x_end, self.y_end, self.thickness, self.height];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(Error::InvalidWall("non-finite coordinate".to_string()));
        }
        if self.length() < EPSILON_2D {
            return Err(Error::InvalidWall("start and end points coincide".to_string()));
        }
        if self.thickness <= 0.0 {
            return Err(Error::InvalidWall(format!("thickness {} is not positive", self.thickness)));
        }
        if self.height < 0.0 || self.height_at_end() < 0.0 {
            return Err(Error::InvalidWall("negative height".to_string()));
        }
        Ok(())
    }

    /// Circle followed by a curved wall, `None` for straight walls
    pub fn arc(&self) -> Option<WallArc> {
        let extent = self.arc_extent.filter(|e| e.abs() > MIN_ARC_EXTENT)?;
        let length = self.length();
        if length < EPSILON_2D {
            return None;
        }
        let start = self.start();
        let end = self.end();
        let mid = Point2::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0);
        let left = Vector2::new(start.y - end.y, end.x - start.x) / length;
        let center = mid + left * (length / (2.0 * (extent / 2.0).tan()));
        let radius = (start - center).norm();
        let start_angle = (start.y - center.y).atan2(start.x - center.x);
        Some(WallArc {
            center,
            radius,
            start_angle,
            extent,
        })
    }

    /// Frame in which the wall top elevation is linear
    pub fn frame(&self) -> WallFrame {
        match self.arc() {
            Some(arc) => WallFrame::Arc {
                center: arc.center,
                start_angle: arc.start_angle,
                extent: arc.extent,
            },
            None => WallFrame::straight(self.angle()),
        }
    }

    /// Elevation of the wall top above the wall bottom
    pub fn top_elevation(&self) -> ElevationFunction {
        let frame = self.frame();
        if !self.is_trapezoidal() {
            return ElevationFunction::flat(self.height);
        }
        let (start, end) = match self.arc() {
            Some(arc) => (arc.start_angle, arc.start_angle + arc.extent),
            None => (frame.abscissa(&self.start()), frame.abscissa(&self.end())),
        };
        ElevationFunction::between(frame, start, self.height, end, self.height_at_end())
    }

    /// Points of the line running parallel to the wall line at signed
    /// `offset` (positive to the left), from start to end
    pub fn offset_line(&self, offset: f64) -> Vec<Point2<f64>> {
        match self.arc() {
            Some(arc) => {
                let radius = arc.radius - arc.extent.signum() * offset;
                let steps = (arc.extent.abs() / ARC_STEP).ceil().max(1.0) as usize;
                (0..=steps)
                    .map(|i| {
                        let angle = arc.start_angle + arc.extent * i as f64 / steps as f64;
                        Point2::new(
                            arc.center.x + radius * angle.cos(),
                            arc.center.y + radius * angle.sin(),
                        )
                    })
                    .collect()
            }
            None => {
                let length = self.length();
                if length < EPSILON_2D {
                    return vec![self.start(), self.end()];
                }
                let left = Vector2::new(self.y_start - self.y_end, self.x_end - self.x_start) / length;
                vec![self.start() + left * offset, self.end() + left * offset]
            }
        }
    }

    /// Full footprint, counter-clockwise
    pub fn points(&self) -> Vec<Point2<f64>> {
        let half = self.thickness / 2.0;
        strip(self.offset_line(-half), self.offset_line(half))
    }

    /// Half footprint between the wall line and the given side, counter-clockwise
    pub fn side_points(&self, side: WallSide) -> Vec<Point2<f64>> {
        let half = self.thickness / 2.0;
        match side {
            WallSide::Left => strip(self.offset_line(0.0), self.offset_line(half)),
            WallSide::Right => strip(self.offset_line(-half), self.offset_line(0.0)),
        }
    }

    /// Footprint of the baseboard on `side`, if any, counter-clockwise
    pub fn baseboard_points(&self, side: WallSide) -> Option<Vec<Point2<f64>>> {
        let baseboard = self.baseboard(side)?;
        if baseboard.thickness <= 0.0 || baseboard.height <= 0.0 {
            return None;
        }
        let half = self.thickness / 2.0;
        let points = match side {
            WallSide::Left => strip(self.offset_line(half), self.offset_line(half + baseboard.thickness)),
            WallSide::Right => strip(
                self.offset_line(-half - baseboard.thickness),
                self.offset_line(-half),
            ),
        };
        Some(points)
    }

    pub fn footprint(&self) -> Area {
        Area::from_polygon(&self.points())
    }

    pub fn side_footprint(&self, side: WallSide) -> Area {
        Area::from_polygon(&self.side_points(side))
    }

    /// Distance from `p` to the nominal wall line (infinite line or full circle)
    pub fn distance_to_wall_line(&self, p: &Point2<f64>) -> f64 {
        match self.arc() {
            Some(arc) => ((p - arc.center).norm() - arc.radius).abs(),
            None => {
                let length = self.length();
                if length < EPSILON_2D {
                    return (p - self.start()).norm();
                }
                let d = self.end() - self.start();
                (d.x * (p.y - self.y_start) - d.y * (p.x - self.x_start)).abs() / length
            }
        }
    }

    #[inline]
    pub fn is_on_wall_line(&self, p: &Point2<f64>) -> bool {
        self.distance_to_wall_line(p) < WALL_LINE_EPSILON
    }

    /// Point from which texture abscissas are measured on `side`
    pub fn texture_origin(&self, side: WallSide) -> Point2<f64> {
        let half = self.thickness / 2.0;
        self.offset_line(side.sign() * half)[0]
    }

    /// Whether a direction at `angle` runs along this wall (straight walls only)
    pub fn is_parallel_to(&self, angle: f64) -> bool {
        self.arc().is_none() && (angle - self.angle()).sin().abs() < 1e-3
    }
}

/// Closed strip from `inner` (walked forward) to `outer` (walked backward)
fn strip(inner: Vec<Point2<f64>>, outer: Vec<Point2<f64>>) -> Vec<Point2<f64>> {
    let mut points = inner;
    points.extend(outer.into_iter().rev());
    points
}
