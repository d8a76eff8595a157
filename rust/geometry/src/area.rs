// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar areas with holes and their boolean operations
//!
//! An [`Area`] is a set of disjoint [`Island`]s. Each island has one
//! counter-clockwise outer contour and any number of clockwise holes.
//! Boolean operations go through `i_overlay` and renormalize the winding of
//! everything they return, so the orientation convention always holds.

use crate::path::{collect_contours, FlatSegment, Path2D, PathSource, WindingRule};
use crate::polygon::{
    bounds_overlap, compute_signed_area, ensure_ccw, ensure_cw, is_valid_contour,
    point_in_contour,
};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// One connected region: an outer boundary and the holes inside it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Island {
    /// Outer boundary, counter-clockwise
    pub outer: Vec<Point2<f64>>,
    /// Holes, clockwise
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Island {
    /// Net area (outer minus holes)
    pub fn area(&self) -> f64 {
        compute_signed_area(&self.outer) + self.holes.iter().map(|h| compute_signed_area(h)).sum::<f64>()
    }

    pub fn contains_point(&self, p: &Point2<f64>) -> bool {
        point_in_contour(p, &self.outer) && !self.holes.iter().any(|h| point_in_contour(p, h))
    }
}

/// A planar region with holes, possibly made of several disjoint islands
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "AreaRepr", into = "AreaRepr")]
pub struct Area {
    islands: Vec<Island>,
}

impl Area {
    /// Empty area
    pub fn new() -> Self {
        Self::default()
    }

    /// Axis-aligned rectangle; empty if it has no extent
    pub fn rectangle(min: Point2<f64>, max: Point2<f64>) -> Self {
        if max.x - min.x <= 0.0 || max.y - min.y <= 0.0 {
            return Self::new();
        }
        Self {
            islands: vec![Island {
                outer: vec![
                    min,
                    Point2::new(max.x, min.y),
                    max,
                    Point2::new(min.x, max.y),
                ],
                holes: Vec::new(),
            }],
        }
    }

    /// Area enclosed by a single polygon, in any orientation
    ///
    /// Self-intersecting polygons are resolved with the non-zero rule.
    /// Degenerate polygons give an empty area.
    pub fn from_polygon(points: &[Point2<f64>]) -> Self {
        if !is_valid_contour(points) {
            return Self::new();
        }
        Self::from_contours(&[points.to_vec()], WindingRule::NonZero)
    }

    /// Area enclosed by a set of contours under a winding rule
    pub fn from_contours(contours: &[Vec<Point2<f64>>], rule: WindingRule) -> Self {
        let subject: Vec<Vec<[f64; 2]>> = contours
            .iter()
            .filter(|c| is_valid_contour(c))
            .map(|c| contour_to_path(c))
            .collect();
        if subject.is_empty() {
            return Self::new();
        }
        let clip: Vec<Vec<[f64; 2]>> = Vec::new();
        let result = subject.overlay(&clip, OverlayRule::Union, fill_rule(rule));
        Self::from_shapes(result)
    }

    /// Area enclosed by a path, curves flattened at `flatness`
    pub fn from_path(path: &Path2D, flatness: f64) -> Self {
        let contours = collect_contours(path, flatness);
        Self::from_contours(&contours, path.winding_rule())
    }

    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    /// Whether the area is one island without holes
    pub fn is_simple(&self) -> bool {
        self.islands.len() == 1 && self.islands[0].holes.is_empty()
    }

    /// Net surface of the area
    pub fn area(&self) -> f64 {
        self.islands.iter().map(Island::area).sum()
    }

    /// Bounding box (min, max) of all outer contours
    pub fn bounds(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let mut points = self.islands.iter().flat_map(|i| i.outer.iter());
        let first = *points.next()?;
        let (min, max) = points.fold((first, first), |(mut min, mut max), p| {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            (min, max)
        });
        Some((min, max))
    }

    pub fn contains_point(&self, p: &Point2<f64>) -> bool {
        self.islands.iter().any(|i| i.contains_point(p))
    }

    /// Union of both areas
    pub fn union(&self, other: &Area) -> Area {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        self.overlay(other, OverlayRule::Union)
    }

    /// Part of this area also covered by `other`
    pub fn intersect(&self, other: &Area) -> Area {
        if self.is_empty() || other.is_empty() || !self.bounds_overlap(other) {
            return Area::new();
        }
        self.overlay(other, OverlayRule::Intersect)
    }

    /// Part of this area not covered by `other`
    pub fn subtract(&self, other: &Area) -> Area {
        if self.is_empty() {
            return Area::new();
        }
        if other.is_empty() || !self.bounds_overlap(other) {
            return self.clone();
        }
        self.overlay(other, OverlayRule::Difference)
    }

    /// Whether both areas cover the same region, up to `tolerance` of
    /// surface in their symmetric difference
    pub fn equals_approx(&self, other: &Area, tolerance: f64) -> bool {
        self.subtract(other).area().abs() <= tolerance && other.subtract(self).area().abs() <= tolerance
    }

    /// Area with every point mapped through `f`
    ///
    /// Orientation is restored afterwards, so mirroring maps are allowed.
    pub fn map_points<F>(&self, f: F) -> Area
    where
        F: Fn(Point2<f64>) -> Point2<f64>,
    {
        let islands = self
            .islands
            .iter()
            .map(|island| {
                let outer: Vec<_> = island.outer.iter().map(|p| f(*p)).collect();
                let holes = island
                    .holes
                    .iter()
                    .map(|h| ensure_cw(&h.iter().map(|p| f(*p)).collect::<Vec<_>>()))
                    .collect();
                Island {
                    outer: ensure_ccw(&outer),
                    holes,
                }
            })
            .filter(|island| is_valid_contour(&island.outer))
            .collect();
        Area { islands }
    }

    fn bounds_overlap(&self, other: &Area) -> bool {
        match (self.bounds(), other.bounds()) {
            (Some((a_min, a_max)), Some((b_min, b_max))) => bounds_overlap(&a_min, &a_max, &b_min, &b_max),
            _ => false,
        }
    }

    fn to_paths(&self) -> Vec<Vec<[f64; 2]>> {
        let mut paths = Vec::new();
        for island in &self.islands {
            paths.push(contour_to_path(&island.outer));
            for hole in &island.holes {
                paths.push(contour_to_path(hole));
            }
        }
        paths
    }

    fn overlay(&self, other: &Area, rule: OverlayRule) -> Area {
        let subject = self.to_paths();
        let clip = other.to_paths();
        // Islands never overlap each other, so even-odd is exact here
        let result = subject.overlay(&clip, rule, FillRule::EvenOdd);
        Self::from_shapes(result)
    }

    /// Convert i_overlay shapes (outer contour first, then holes) to islands
    fn from_shapes(shapes: Vec<Vec<Vec<[f64; 2]>>>) -> Area {
        let mut islands = Vec::with_capacity(shapes.len());
        for shape in shapes {
            let mut contours = shape.into_iter().map(|c| path_to_contour(&c));
            let Some(outer) = contours.next() else {
                continue;
            };
            if !is_valid_contour(&outer) {
                continue;
            }
            let holes = contours
                .filter(|h| is_valid_contour(h))
                .map(|h| ensure_cw(&h))
                .collect();
            islands.push(Island {
                outer: ensure_ccw(&outer),
                holes,
            });
        }
        Area { islands }
    }
}

impl PathSource for Area {
    fn path_iter(&self, _flatness: f64) -> Box<dyn Iterator<Item = FlatSegment> + '_> {
        // Areas are stored flattened
        Box::new(
            self.islands
                .iter()
                .flat_map(|island| std::iter::once(&island.outer).chain(island.holes.iter()))
                .flat_map(|contour| {
                    contour
                        .iter()
                        .enumerate()
                        .map(|(i, p)| {
                            if i == 0 {
                                FlatSegment::MoveTo(*p)
                            } else {
                                FlatSegment::LineTo(*p)
                            }
                        })
                        .chain(std::iter::once(FlatSegment::Close))
                }),
        )
    }
}

fn fill_rule(rule: WindingRule) -> FillRule {
    match rule {
        WindingRule::NonZero => FillRule::NonZero,
        WindingRule::EvenOdd => FillRule::EvenOdd,
    }
}

fn contour_to_path(contour: &[Point2<f64>]) -> Vec<[f64; 2]> {
    contour.iter().map(|p| [p.x, p.y]).collect()
}

fn path_to_contour(path: &[[f64; 2]]) -> Vec<Point2<f64>> {
    path.iter().map(|p| Point2::new(p[0], p[1])).collect()
}

/// Serialized form: plain coordinate arrays per island
#[derive(Serialize, Deserialize)]
struct AreaRepr {
    islands: Vec<IslandRepr>,
}

#[derive(Serialize, Deserialize)]
struct IslandRepr {
    outer: Vec<[f64; 2]>,
    #[serde(default)]
    holes: Vec<Vec<[f64; 2]>>,
}

impl From<Area> for AreaRepr {
    fn from(area: Area) -> Self {
        AreaRepr {
            islands: area
                .islands
                .iter()
                .map(|i| IslandRepr {
                    outer: contour_to_path(&i.outer),
                    holes: i.holes.iter().map(|h| contour_to_path(h)).collect(),
                })
                .collect(),
        }
    }
}

impl From<AreaRepr> for Area {
    fn from(repr: AreaRepr) -> Self {
        let contours: Vec<Vec<Point2<f64>>> = repr
            .islands
            .iter()
            .flat_map(|i| std::iter::once(&i.outer).chain(i.holes.iter()))
            .map(|c| path_to_contour(c))
            .collect();
        Area::from_contours(&contours, WindingRule::EvenOdd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Area {
        Area::rectangle(Point2::new(x0, y0), Point2::new(x1, y1))
    }

    #[test]
    fn test_rectangle() {
        let a = rect(0.0, 0.0, 4.0, 2.0);
        assert!(a.is_simple());
        assert_relative_eq!(a.area(), 8.0);
        assert!(rect(0.0, 0.0, 0.0, 2.0).is_empty());
    }

    #[test]
    fn test_from_polygon_normalizes_orientation() {
        let cw = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 3.0),
            Point2::new(3.0, 3.0),
            Point2::new(3.0, 0.0),
        ];
        let a = Area::from_polygon(&cw);
        assert_eq!(a.islands().len(), 1);
        assert!(compute_signed_area(&a.islands()[0].outer) > 0.0);
        assert_relative_eq!(a.area(), 9.0, epsilon = 1e-9);
    }

    #[test]
    fn test_subtract_creates_hole() {
        let outer = rect(0.0, 0.0, 10.0, 10.0);
        let inner = rect(3.0, 3.0, 7.0, 7.0);
        let result = outer.subtract(&inner);

        assert_eq!(result.islands().len(), 1);
        assert_eq!(result.islands()[0].holes.len(), 1);
        assert!(compute_signed_area(&result.islands()[0].holes[0]) < 0.0);
        assert_relative_eq!(result.area(), 84.0, epsilon = 1e-6);
        assert!(!result.contains_point(&Point2::new(5.0, 5.0)));
        assert!(result.contains_point(&Point2::new(1.0, 1.0)));
    }

    #[test]
    fn test_union_of_disjoint_rectangles_keeps_islands() {
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(5.0, 0.0, 6.0, 1.0);
        let u = a.union(&b);
        assert_eq!(u.islands().len(), 2);
        assert_relative_eq!(u.area(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_intersect() {
        let a = rect(0.0, 0.0, 4.0, 4.0);
        let b = rect(2.0, 2.0, 6.0, 6.0);
        assert_relative_eq!(a.intersect(&b).area(), 4.0, epsilon = 1e-9);
        assert!(a.intersect(&rect(10.0, 10.0, 11.0, 11.0)).is_empty());
    }

    #[test]
    fn test_empty_operands() {
        let a = rect(0.0, 0.0, 4.0, 4.0);
        let empty = Area::new();
        assert_eq!(a.union(&empty), a);
        assert_eq!(empty.union(&a), a);
        assert!(a.intersect(&empty).is_empty());
        assert_eq!(a.subtract(&empty), a);
        assert!(empty.subtract(&a).is_empty());
    }

    #[test]
    fn test_subtract_everything() {
        let a = rect(1.0, 1.0, 2.0, 2.0);
        assert!(a.subtract(&rect(0.0, 0.0, 3.0, 3.0)).is_empty());
    }

    #[test]
    fn test_from_path_with_curve() {
        let mut path = Path2D::new();
        path.circle(Point2::new(0.0, 0.0), 1.0);
        let a = Area::from_path(&path, 1e-3);
        assert_relative_eq!(a.area(), std::f64::consts::PI, max_relative = 1e-2);
    }

    #[test]
    fn test_path_iter_walks_outer_then_holes() {
        let a = rect(0.0, 0.0, 10.0, 10.0).subtract(&rect(3.0, 3.0, 7.0, 7.0));
        let moves = a
            .path_iter(0.1)
            .filter(|s| matches!(s, FlatSegment::MoveTo(_)))
            .count();
        let closes = a.path_iter(0.1).filter(|s| *s == FlatSegment::Close).count();
        assert_eq!(moves, 2);
        assert_eq!(closes, 2);
    }

    #[test]
    fn test_map_points_mirror_keeps_orientation() {
        let a = rect(0.0, 0.0, 2.0, 1.0);
        let mirrored = a.map_points(|p| Point2::new(-p.x, p.y));
        assert!(compute_signed_area(&mirrored.islands()[0].outer) > 0.0);
        assert_relative_eq!(mirrored.area(), 2.0);
    }

    #[test]
    fn test_serde_round_trip_preserves_region() {
        let a = rect(0.0, 0.0, 10.0, 10.0).subtract(&rect(3.0, 3.0, 7.0, 7.0));
        let json = serde_json::to_string(&a).unwrap();
        let back: Area = serde_json::from_str(&json).unwrap();
        assert!(a.equals_approx(&back, 1e-6));
    }
}
