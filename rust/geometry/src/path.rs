// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D paths with curved segments and flatness-driven iteration
//!
//! [`Path2D`] stores line, quadratic and cubic segments. Consumers never see
//! curves: they walk a [`PathSource`], which yields [`FlatSegment`]s where
//! every curve has been replaced by line segments that stay within the
//! requested flatness of the true curve.

use nalgebra::Point2;
use std::collections::VecDeque;
use std::f64::consts::FRAC_PI_2;

/// Maximum recursive subdivision depth when flattening a curve
pub const MAX_FLATTEN_DEPTH: u32 = 10;

/// Default flatness used when callers have no better value (model units)
pub const DEFAULT_FLATNESS: f64 = 0.5;

/// Rule deciding which points lie inside a self-overlapping path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindingRule {
    #[default]
    NonZero,
    EvenOdd,
}

/// A path segment, possibly curved
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(Point2<f64>),
    LineTo(Point2<f64>),
    /// Quadratic Bézier: control point, end point
    QuadTo(Point2<f64>, Point2<f64>),
    /// Cubic Bézier: first control, second control, end point
    CubicTo(Point2<f64>, Point2<f64>, Point2<f64>),
    Close,
}

/// A segment of a flattened path
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlatSegment {
    MoveTo(Point2<f64>),
    LineTo(Point2<f64>),
    Close,
}

/// Anything that can be walked as a flattened outline
pub trait PathSource {
    /// Iterate the outline, replacing curves by line segments whose distance
    /// to the curve does not exceed `flatness`
    fn path_iter(&self, flatness: f64) -> Box<dyn Iterator<Item = FlatSegment> + '_>;
}

/// A 2D path made of straight and curved segments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path2D {
    segments: Vec<PathSegment>,
    winding_rule: WindingRule,
    current: Option<Point2<f64>>,
}

impl Path2D {
    /// Create an empty path with the non-zero winding rule
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty path with the given winding rule
    pub fn with_winding_rule(winding_rule: WindingRule) -> Self {
        Self {
            winding_rule,
            ..Self::default()
        }
    }

    /// Closed polygonal path through `points`
    pub fn from_polygon(points: &[Point2<f64>]) -> Self {
        let mut path = Self::new();
        if let Some((first, rest)) = points.split_first() {
            path.move_to(*first);
            for p in rest {
                path.line_to(*p);
            }
            path.close();
        }
        path
    }

    pub fn winding_rule(&self) -> WindingRule {
        self.winding_rule
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn move_to(&mut self, p: Point2<f64>) -> &mut Self {
        self.segments.push(PathSegment::MoveTo(p));
        self.current = Some(p);
        self
    }

    /// Line to `p`; starts a new subpath at `p` when the path has no pen position
    pub fn line_to(&mut self, p: Point2<f64>) -> &mut Self {
        if self.current.is_none() {
            return self.move_to(p);
        }
        self.segments.push(PathSegment::LineTo(p));
        self.current = Some(p);
        self
    }

    pub fn quad_to(&mut self, ctrl: Point2<f64>, end: Point2<f64>) -> &mut Self {
        if self.current.is_none() {
            return self.move_to(end);
        }
        self.segments.push(PathSegment::QuadTo(ctrl, end));
        self.current = Some(end);
        self
    }

    pub fn cubic_to(&mut self, c1: Point2<f64>, c2: Point2<f64>, end: Point2<f64>) -> &mut Self {
        if self.current.is_none() {
            return self.move_to(end);
        }
        self.segments.push(PathSegment::CubicTo(c1, c2, end));
        self.current = Some(end);
        self
    }

    /// Close the current subpath
    pub fn close(&mut self) -> &mut Self {
        if self.current.is_some() {
            self.segments.push(PathSegment::Close);
            // Pen returns to the subpath start
            self.current = self.segments.iter().rev().find_map(|s| match s {
                PathSegment::MoveTo(p) => Some(*p),
                _ => None,
            });
        }
        self
    }

    /// Circular arc around `center`, starting at `start_angle` and sweeping
    /// `extent` radians (counter-clockwise when positive)
    ///
    /// The arc is connected to the current point with a line, or starts a
    /// new subpath when there is none. It is stored as cubic Béziers of at
    /// most a quarter turn each.
    pub fn arc(&mut self, center: Point2<f64>, radius: f64, start_angle: f64, extent: f64) -> &mut Self {
        let start = point_on_circle(center, radius, start_angle);
        match self.current {
            Some(current) if current != start => {
                self.line_to(start);
            }
            Some(_) => {}
            None => {
                self.move_to(start);
            }
        }
        if extent == 0.0 || radius <= 0.0 {
            return self;
        }

        let pieces = (extent.abs() / FRAC_PI_2).ceil().max(1.0) as usize;
        let step = extent / pieces as f64;
        // Control distance for a circular arc of `step` radians
        let k = 4.0 / 3.0 * (step / 4.0).tan() * radius;
        let mut angle = start_angle;
        for _ in 0..pieces {
            let next = angle + step;
            let (s0, c0) = angle.sin_cos();
            let (s1, c1) = next.sin_cos();
            let p0 = point_on_circle(center, radius, angle);
            let p1 = point_on_circle(center, radius, next);
            let ctrl1 = Point2::new(p0.x - k * s0, p0.y + k * c0);
            let ctrl2 = Point2::new(p1.x + k * s1, p1.y - k * c1);
            self.cubic_to(ctrl1, ctrl2, p1);
            angle = next;
        }
        self
    }

    /// Closed circle subpath
    pub fn circle(&mut self, center: Point2<f64>, radius: f64) -> &mut Self {
        self.current = None;
        self.arc(center, radius, 0.0, 2.0 * std::f64::consts::PI);
        self.close()
    }

    /// Lazily flatten the path at `flatness`
    pub fn flatten(&self, flatness: f64) -> Flatten<'_> {
        Flatten {
            segments: self.segments.iter(),
            flatness,
            current: Point2::origin(),
            subpath_start: Point2::origin(),
            pending: VecDeque::new(),
        }
    }
}

impl PathSource for Path2D {
    fn path_iter(&self, flatness: f64) -> Box<dyn Iterator<Item = FlatSegment> + '_> {
        Box::new(self.flatten(flatness))
    }
}

#[inline]
fn point_on_circle(center: Point2<f64>, radius: f64, angle: f64) -> Point2<f64> {
    let (sin, cos) = angle.sin_cos();
    Point2::new(center.x + radius * cos, center.y + radius * sin)
}

/// Iterator over the flattened segments of a [`Path2D`]
///
/// Curves are subdivided only when the iterator reaches them.
pub struct Flatten<'a> {
    segments: std::slice::Iter<'a, PathSegment>,
    flatness: f64,
    current: Point2<f64>,
    subpath_start: Point2<f64>,
    pending: VecDeque<Point2<f64>>,
}

impl Iterator for Flatten<'_> {
    type Item = FlatSegment;

    fn next(&mut self) -> Option<FlatSegment> {
        if let Some(p) = self.pending.pop_front() {
            return Some(FlatSegment::LineTo(p));
        }

        match *self.segments.next()? {
            PathSegment::MoveTo(p) => {
                self.current = p;
                self.subpath_start = p;
                Some(FlatSegment::MoveTo(p))
            }
            PathSegment::LineTo(p) => {
                self.current = p;
                Some(FlatSegment::LineTo(p))
            }
            PathSegment::QuadTo(ctrl, end) => {
                flatten_quad(self.current, ctrl, end, self.flatness, 0, &mut self.pending);
                self.current = end;
                self.pending.pop_front().map(FlatSegment::LineTo)
            }
            PathSegment::CubicTo(c1, c2, end) => {
                flatten_cubic(self.current, c1, c2, end, self.flatness, 0, &mut self.pending);
                self.current = end;
                self.pending.pop_front().map(FlatSegment::LineTo)
            }
            PathSegment::Close => {
                self.current = self.subpath_start;
                Some(FlatSegment::Close)
            }
        }
    }
}

/// Distance from `p` to the infinite line through `a` and `b`
fn distance_to_chord(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let ab = b - a;
    let len = ab.norm();
    if len < 1e-12 {
        return (p - a).norm();
    }
    (ab.x * (p.y - a.y) - ab.y * (p.x - a.x)).abs() / len
}

#[inline]
fn midpoint(a: Point2<f64>, b: Point2<f64>) -> Point2<f64> {
    Point2::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5)
}

fn flatten_quad(
    p0: Point2<f64>,
    ctrl: Point2<f64>,
    p1: Point2<f64>,
    flatness: f64,
    depth: u32,
    out: &mut VecDeque<Point2<f64>>,
) {
    if depth >= MAX_FLATTEN_DEPTH || distance_to_chord(ctrl, p0, p1) <= flatness {
        out.push_back(p1);
        return;
    }
    let a = midpoint(p0, ctrl);
    let b = midpoint(ctrl, p1);
    let mid = midpoint(a, b);
    flatten_quad(p0, a, mid, flatness, depth + 1, out);
    flatten_quad(mid, b, p1, flatness, depth + 1, out);
}

fn flatten_cubic(
    p0: Point2<f64>,
    c1: Point2<f64>,
    c2: Point2<f64>,
    p1: Point2<f64>,
    flatness: f64,
    depth: u32,
    out: &mut VecDeque<Point2<f64>>,
) {
    let deviation = distance_to_chord(c1, p0, p1).max(distance_to_chord(c2, p0, p1));
    if depth >= MAX_FLATTEN_DEPTH || deviation <= flatness {
        out.push_back(p1);
        return;
    }
    // de Casteljau split at t = 0.5
    let ab = midpoint(p0, c1);
    let bc = midpoint(c1, c2);
    let cd = midpoint(c2, p1);
    let abc = midpoint(ab, bc);
    let bcd = midpoint(bc, cd);
    let mid = midpoint(abc, bcd);
    flatten_cubic(p0, ab, abc, mid, flatness, depth + 1, out);
    flatten_cubic(mid, bcd, cd, p1, flatness, depth + 1, out);
}

/// Split a flattened outline into closed contours
///
/// Consecutive duplicate points are dropped, as is a final point equal to
/// the contour's first point. Contours are returned as walked; orientation
/// and degeneracy are left to the caller.
pub fn collect_contours<S: PathSource + ?Sized>(source: &S, flatness: f64) -> Vec<Vec<Point2<f64>>> {
    fn finish(contour: &mut Vec<Point2<f64>>, out: &mut Vec<Vec<Point2<f64>>>) {
        if contour.len() > 1 && contour.first() == contour.last() {
            contour.pop();
        }
        if !contour.is_empty() {
            out.push(std::mem::take(contour));
        }
    }

    let mut contours = Vec::new();
    let mut current: Vec<Point2<f64>> = Vec::new();

    for segment in source.path_iter(flatness) {
        match segment {
            FlatSegment::MoveTo(p) => {
                finish(&mut current, &mut contours);
                current.push(p);
            }
            FlatSegment::LineTo(p) => {
                if current.last() != Some(&p) {
                    current.push(p);
                }
            }
            FlatSegment::Close => finish(&mut current, &mut contours),
        }
    }
    finish(&mut current, &mut contours);

    contours
}
