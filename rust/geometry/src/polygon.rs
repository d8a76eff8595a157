// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Simple polygon (contour) utilities
//!
//! A contour is an implicitly closed `[Point2<f64>]`. The orientation
//! convention used everywhere in this crate is the signed-area one:
//! positive area = counter-clockwise = outer boundary, negative area =
//! clockwise = hole.

use nalgebra::Point2;

/// Epsilon for floating point comparisons in 2D operations
pub const EPSILON_2D: f64 = 1e-9;

/// Minimum area threshold - contours smaller than this are considered degenerate
pub const MIN_AREA_THRESHOLD: f64 = 1e-10;

/// Distance under which a point is considered to lie on a contour edge
pub const ON_EDGE_TOLERANCE: f64 = 1e-6;

/// Compute the signed area of a 2D contour
/// Positive = counter-clockwise, Negative = clockwise
pub fn compute_signed_area(contour: &[Point2<f64>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = contour.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += contour[i].x * contour[j].y;
        area -= contour[j].x * contour[i].y;
    }

    area * 0.5
}

/// Returns `true` if the contour is clockwise (a hole, by convention)
#[inline]
pub fn is_clockwise(contour: &[Point2<f64>]) -> bool {
    compute_signed_area(contour) < 0.0
}

/// Check if a contour is valid (has area, not degenerate)
pub fn is_valid_contour(contour: &[Point2<f64>]) -> bool {
    contour.len() >= 3 && compute_signed_area(contour).abs() > MIN_AREA_THRESHOLD
}

/// Ensure contour has counter-clockwise winding (positive area)
pub fn ensure_ccw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if compute_signed_area(contour) < 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Ensure contour has clockwise winding (for holes)
pub fn ensure_cw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if compute_signed_area(contour) > 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Check if a point is inside a contour using ray casting
///
/// Points exactly on the boundary may be classified either way; use
/// [`point_on_contour`] first when that matters.
pub fn point_in_contour(point: &Point2<f64>, contour: &[Point2<f64>]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = contour.len();

    let mut j = n - 1;
    for i in 0..n {
        let pi = &contour[i];
        let pj = &contour[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Distance from `point` to the segment `[a, b]`
pub fn distance_to_segment(point: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < EPSILON_2D * EPSILON_2D {
        return (point - a).norm();
    }
    let t = ((point - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (point - (a + ab * t)).norm()
}

/// Check if a point lies on one of the contour edges (within `tolerance`)
pub fn point_on_contour(point: &Point2<f64>, contour: &[Point2<f64>], tolerance: f64) -> bool {
    let n = contour.len();
    (0..n).any(|i| distance_to_segment(point, &contour[i], &contour[(i + 1) % n]) <= tolerance)
}

/// Check if contour `inner` lies inside contour `outer`
///
/// Nested contours produced by boolean operations never cross, so the test
/// only needs one vertex of `inner` that is not on `outer`'s boundary.
/// Contours whose vertices all touch `outer` fall back to the centroid of
/// their first triangle.
pub fn contour_inside_contour(inner: &[Point2<f64>], outer: &[Point2<f64>]) -> bool {
    if let Some(p) = inner
        .iter()
        .find(|p| !point_on_contour(p, outer, ON_EDGE_TOLERANCE))
    {
        return point_in_contour(p, outer);
    }
    if inner.len() >= 3 {
        let centroid = Point2::new(
            (inner[0].x + inner[1].x + inner[2].x) / 3.0,
            (inner[0].y + inner[1].y + inner[2].y) / 3.0,
        );
        return point_in_contour(&centroid, outer);
    }
    false
}

/// Compute bounding box of a contour
pub fn contour_bounds(contour: &[Point2<f64>]) -> Option<(Point2<f64>, Point2<f64>)> {
    if contour.is_empty() {
        return None;
    }

    let mut min = contour[0];
    let mut max = contour[0];

    for p in contour.iter().skip(1) {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }

    Some((min, max))
}

/// Check if two bounding boxes overlap
pub fn bounds_overlap(
    a_min: &Point2<f64>,
    a_max: &Point2<f64>,
    b_min: &Point2<f64>,
    b_max: &Point2<f64>,
) -> bool {
    a_min.x <= b_max.x && a_max.x >= b_min.x && a_min.y <= b_max.y && a_max.y >= b_min.y
}

/// Rotated rectangle centred on (`x`, `y`), `width` along the rotated X axis
/// and `depth` along the rotated Y axis, counter-clockwise
pub fn rotated_rectangle(x: f64, y: f64, width: f64, depth: f64, angle: f64) -> Vec<Point2<f64>> {
    let (sin, cos) = angle.sin_cos();
    let half_w = width / 2.0;
    let half_d = depth / 2.0;
    [(-half_w, -half_d), (half_w, -half_d), (half_w, half_d), (-half_w, half_d)]
        .iter()
        .map(|&(lx, ly)| Point2::new(x + lx * cos - ly * sin, y + lx * sin + ly * cos))
        .collect()
}
