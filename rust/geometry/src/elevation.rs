// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Linear elevation along a wall
//!
//! The top of a wall is a linear function of a wall-local abscissa: the
//! projection on the wall direction for straight walls, the unwrapped polar
//! angle around the arc center for curved walls.

use crate::area::Area;
use crate::polygon::EPSILON_2D;
use nalgebra::Point2;
use std::f64::consts::{PI, TAU};

/// Angular step used when sampling arcs into polygons
pub const ARC_STEP: f64 = PI / 36.0;

/// Wall-local coordinate frame used to evaluate elevations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WallFrame {
    /// Abscissa is `cos * x + sin * y`
    Straight { cos: f64, sin: f64 },
    /// Abscissa is the polar angle around `center`, unwrapped into the
    /// turn centered on the middle of the arc
    Arc {
        center: Point2<f64>,
        start_angle: f64,
        extent: f64,
    },
}

impl WallFrame {
    /// Straight frame along `angle`
    pub fn straight(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        WallFrame::Straight { cos, sin }
    }

    /// Wall-local abscissa of `p`
    pub fn abscissa(&self, p: &Point2<f64>) -> f64 {
        match *self {
            WallFrame::Straight { cos, sin } => cos * p.x + sin * p.y,
            WallFrame::Arc {
                center,
                start_angle,
                extent,
            } => unwrap_angle((p.y - center.y).atan2(p.x - center.x), start_angle, extent),
        }
    }
}

/// Bring `angle` into the turn centered on the middle of the arc that
/// starts at `start` and sweeps `extent`
///
/// Points a few ULPs outside either end of the arc stay next to that end
/// instead of jumping a full turn.
pub fn unwrap_angle(mut angle: f64, start: f64, extent: f64) -> f64 {
    let (lo, hi) = arc_window(start, extent);
    while angle < lo {
        angle += TAU;
    }
    while angle >= hi {
        angle -= TAU;
    }
    angle
}

/// Half-open turn `[mid - PI, mid + PI)` around the middle of an arc
fn arc_window(start: f64, extent: f64) -> (f64, f64) {
    let mid = start + extent / 2.0;
    (mid - PI, mid + PI)
}

/// `elevation(p) = alpha * abscissa(p) + beta`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationFunction {
    pub alpha: f64,
    pub beta: f64,
    pub frame: WallFrame,
}

impl ElevationFunction {
    /// Constant elevation
    pub fn flat(elevation: f64) -> Self {
        Self {
            alpha: 0.0,
            beta: elevation,
            frame: WallFrame::Straight { cos: 1.0, sin: 0.0 },
        }
    }

    /// Elevation running linearly from `start_elevation` at abscissa
    /// `start` to `end_elevation` at abscissa `end`
    pub fn between(frame: WallFrame, start: f64, start_elevation: f64, end: f64, end_elevation: f64) -> Self {
        let span = end - start;
        let alpha = if span.abs() > EPSILON_2D {
            (end_elevation - start_elevation) / span
        } else {
            0.0
        };
        Self {
            alpha,
            beta: start_elevation - alpha * start,
            frame,
        }
    }

    #[inline]
    pub fn at(&self, p: &Point2<f64>) -> f64 {
        self.alpha * self.frame.abscissa(p) + self.beta
    }

    pub fn is_flat(&self) -> bool {
        self.alpha == 0.0
    }

    /// Region where the elevation is strictly above `z`, covering at least
    /// the box `bounds`
    pub fn region_above(&self, z: f64, bounds: (Point2<f64>, Point2<f64>)) -> Area {
        let (min, max) = bounds;
        // Margin keeps the region boundary off the clipped shapes' edges
        let margin = 1.0 + (max.x - min.x).max(max.y - min.y);
        let min = Point2::new(min.x - margin, min.y - margin);
        let max = Point2::new(max.x + margin, max.y + margin);

        if self.alpha == 0.0 {
            return if self.beta > z {
                Area::rectangle(min, max)
            } else {
                Area::new()
            };
        }

        let threshold = (z - self.beta) / self.alpha;
        match self.frame {
            WallFrame::Straight { cos, sin } => {
                let corners = [min, Point2::new(max.x, min.y), max, Point2::new(min.x, max.y)];
                let local: Vec<Point2<f64>> = corners
                    .iter()
                    .map(|p| Point2::new(cos * p.x + sin * p.y, -sin * p.x + cos * p.y))
                    .collect();
                let (mut lo, mut hi) = local
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
                let (y_lo, y_hi) = local
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
                if self.alpha > 0.0 {
                    lo = lo.max(threshold);
                } else {
                    hi = hi.min(threshold);
                }
                Area::rectangle(Point2::new(lo, y_lo), Point2::new(hi, y_hi))
                    .map_points(|p| Point2::new(cos * p.x - sin * p.y, sin * p.x + cos * p.y))
            }
            WallFrame::Arc {
                center,
                start_angle,
                extent,
            } => {
                let (window_lo, window_hi) = arc_window(start_angle, extent);
                let (lo, hi) = if self.alpha > 0.0 {
                    (threshold.max(window_lo), window_hi)
                } else {
                    (window_lo, threshold.min(window_hi))
                };
                if hi - lo <= EPSILON_2D {
                    return Area::new();
                }
                if hi - lo >= TAU - EPSILON_2D {
                    return Area::rectangle(min, max);
                }
                let radius = [min, max, Point2::new(max.x, min.y), Point2::new(min.x, max.y)]
                    .iter()
                    .map(|p| (p - center).norm())
                    .fold(0.0, f64::max)
                    * 2.0;
                Area::from_polygon(&wedge(center, radius, lo, hi))
            }
        }
    }
}

/// Circular sector from angle `lo` to `hi`, sampled every [`ARC_STEP`]
fn wedge(center: Point2<f64>, radius: f64, lo: f64, hi: f64) -> Vec<Point2<f64>> {
    let steps = ((hi - lo) / ARC_STEP).ceil().max(1.0) as usize;
    // Chords cut inside the circle; push samples out so the wedge covers it
    let r = radius / (ARC_STEP / 2.0).cos();
    let mut points = Vec::with_capacity(steps + 2);
    points.push(center);
    for i in 0..=steps {
        let angle = lo + (hi - lo) * i as f64 / steps as f64;
        points.push(Point2::new(center.x + r * angle.cos(), center.y + r * angle.sin()));
    }
    points
}
