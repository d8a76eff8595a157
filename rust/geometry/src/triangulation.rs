// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Wrapper around earcutr for boundary loops. Loops coming out of the
//! extractor may contain zero-width seams; earcut copes with those the same
//! way it copes with its own hole bridges.

use crate::polygon::compute_signed_area;
use crate::{Error, Point2, Result};

/// Check if a polygon is convex (all cross products have same sign)
#[inline]
fn is_convex(points: &[Point2<f64>]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let n = points.len();
    let mut sign = 0i8;

    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];

        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);

        if cross.abs() > 1e-10 {
            let current_sign = if cross > 0.0 { 1i8 } else { -1i8 };
            if sign == 0 {
                sign = current_sign;
            } else if sign != current_sign {
                return false;
            }
        }
    }

    true
}

/// Simple fan triangulation for convex polygons
#[inline]
fn fan_triangulate(n: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity((n - 2) * 3);
    for i in 1..n - 1 {
        indices.push(0);
        indices.push(i);
        indices.push(i + 1);
    }
    indices
}

/// Triangulate a simple polygon (no holes)
/// Returns triangle indices into the input points
#[inline]
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    let n = points.len();

    if n < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points to triangulate".to_string(),
        ));
    }

    if n == 3 {
        return Ok(vec![0, 1, 2]);
    }

    if n <= 8 && is_convex(points) {
        return Ok(fan_triangulate(n));
    }

    let mut vertices = Vec::with_capacity(n * 2);
    for p in points {
        vertices.push(p.x);
        vertices.push(p.y);
    }

    earcutr::earcut(&vertices, &[], 2).map_err(|e| Error::TriangulationError(format!("{:?}", e)))
}

/// Triangulate a boundary loop into triangles wound like the loop itself
///
/// Triangles of zero area (seam slivers) are dropped.
pub fn triangulate_loop(points: &[Point2<f64>]) -> Result<Vec<[usize; 3]>> {
    let indices = triangulate_polygon(points)?;
    let ccw = compute_signed_area(points) >= 0.0;

    let triangles = indices
        .chunks_exact(3)
        .filter_map(|t| {
            let area = compute_signed_area(&[points[t[0]], points[t[1]], points[t[2]]]);
            if area.abs() < 1e-12 {
                None
            } else if (area > 0.0) == ccw {
                Some([t[0], t[1], t[2]])
            } else {
                Some([t[0], t[2], t[1]])
            }
        })
        .collect();
    Ok(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangulate_square() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];

        let indices = triangulate_polygon(&points).unwrap();

        // Square should be split into 2 triangles = 6 indices
        assert_eq!(indices.len(), 6);
    }

    #[test]
    fn test_triangulate_triangle() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 1.0),
        ];

        let indices = triangulate_polygon(&points).unwrap();
        assert_eq!(indices.len(), 3);
    }

    #[test]
    fn test_triangulate_insufficient_points() {
        let points = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];

        let result = triangulate_polygon(&points);
        assert!(result.is_err());
    }

    #[test]
    fn test_triangulate_concave() {
        // L shape
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        let triangles = triangulate_loop(&points).unwrap();
        assert_eq!(triangles.len(), 4);
        let total: f64 = triangles
            .iter()
            .map(|t| compute_signed_area(&[points[t[0]], points[t[1]], points[t[2]]]))
            .sum();
        assert!((total - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_triangulate_bridged_loop() {
        // Atrium loop: outer 0..10, hole 4..6, bridged at (0,0)-(4,4)
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(4.0, 6.0),
            Point2::new(6.0, 6.0),
            Point2::new(6.0, 4.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let triangles = triangulate_loop(&points).unwrap();
        let total: f64 = triangles
            .iter()
            .map(|t| compute_signed_area(&[points[t[0]], points[t[1]], points[t[2]]]))
            .sum();
        assert!((total - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_triangulate_loop_keeps_clockwise_winding() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 0.0),
        ];
        for t in triangulate_loop(&points).unwrap() {
            assert!(compute_signed_area(&[points[t[0]], points[t[1]], points[t[2]]]) < 0.0);
        }
    }
}
