// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary-loop extraction
//!
//! Turns an outline made of outer contours and holes into a list of simple
//! closed loops without holes. Each hole is threaded into the outer loop
//! that contains it through a zero-width seam between the closest pair of
//! points, so the result can be triangulated or extruded directly.
//!
//! The closest-pair bridge is a heuristic: for strongly concave outer loops
//! the seam may cross another part of the loop. Net area is always
//! preserved.

use crate::path::{collect_contours, PathSource};
use crate::polygon::{compute_signed_area, contour_inside_contour, is_clockwise, MIN_AREA_THRESHOLD};
use nalgebra::Point2;

/// Extract hole-free boundary loops from `source`
///
/// Outer loops are counter-clockwise, or clockwise when `reversed` is set.
/// Holes that lie outside every outer loop are dropped. Degenerate input
/// gives an empty list.
pub fn extract_loops<S: PathSource + ?Sized>(
    source: &S,
    flatness: f64,
    reversed: bool,
) -> Vec<Vec<Point2<f64>>> {
    let mut outers = Vec::new();
    let mut holes = Vec::new();

    for contour in collect_contours(source, flatness) {
        if contour.len() <= 2 {
            tracing::trace!(points = contour.len(), "Dropping degenerate subpath");
            continue;
        }
        if compute_signed_area(&contour).abs() < MIN_AREA_THRESHOLD {
            tracing::trace!(points = contour.len(), "Dropping zero-area subpath");
            continue;
        }
        if is_clockwise(&contour) {
            holes.push(contour);
        } else {
            outers.push(contour);
        }
    }

    let mut loops = if holes.is_empty() {
        outers
    } else {
        merge_holes(outers, holes)
    };

    if reversed {
        for l in &mut loops {
            l.reverse();
        }
    }
    loops
}

/// Thread every hole into the innermost outer loop containing it
fn merge_holes(outers: Vec<Vec<Point2<f64>>>, holes: Vec<Vec<Point2<f64>>>) -> Vec<Vec<Point2<f64>>> {
    let mut remaining: Vec<Option<Vec<Point2<f64>>>> = holes.into_iter().map(Some).collect();
    let mut loops = Vec::with_capacity(outers.len());

    for index in processing_order(&outers) {
        let outer = &outers[index];
        let mut contained: Vec<Vec<Point2<f64>>> = remaining
            .iter_mut()
            .filter_map(|slot| {
                if slot.as_ref().is_some_and(|hole| contour_inside_contour(hole, outer)) {
                    slot.take()
                } else {
                    None
                }
            })
            .collect();

        let mut current = outer.clone();
        while !contained.is_empty() {
            let (hole_index, i, j) = closest_pair(&current, &contained);
            let hole = contained.remove(hole_index);
            current = splice(&current, i, &hole, j);
        }
        loops.push(current);
    }

    let dropped = remaining.iter().filter(|slot| slot.is_some()).count();
    if dropped > 0 {
        tracing::trace!(dropped, "Dropping holes outside every outer loop");
    }

    loops
}

/// Outer loops ordered deepest first, so that a loop lying in the hole of
/// another island claims its own holes before the enclosing loop does
fn processing_order(outers: &[Vec<Point2<f64>>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..outers.len()).collect();
    if outers.len() > 1 {
        let depths: Vec<usize> = (0..outers.len())
            .map(|i| {
                (0..outers.len())
                    .filter(|&j| j != i && contour_inside_contour(&outers[i], &outers[j]))
                    .count()
            })
            .collect();
        // Stable: equal depths keep their input order
        order.sort_by(|a, b| depths[*b].cmp(&depths[*a]));
    }
    order
}

/// Closest (hole index, loop point index, hole point index)
///
/// Ties keep the first pair found.
fn closest_pair(current: &[Point2<f64>], holes: &[Vec<Point2<f64>>]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut best_distance = f64::INFINITY;
    for (h, hole) in holes.iter().enumerate() {
        for (i, p) in current.iter().enumerate() {
            for (j, q) in hole.iter().enumerate() {
                let distance = (p - q).norm_squared();
                if distance < best_distance {
                    best_distance = distance;
                    best = (h, i, j);
                }
            }
        }
    }
    best
}

/// Insert `hole` into `current` through the bridge `current[i]` - `hole[j]`
///
/// Both bridge points appear twice, once on each side of the seam.
fn splice(current: &[Point2<f64>], i: usize, hole: &[Point2<f64>], j: usize) -> Vec<Point2<f64>> {
    let mut merged = Vec::with_capacity(current.len() + hole.len() + 2);
    merged.extend_from_slice(&current[..=i]);
    merged.extend_from_slice(&hole[j..]);
    merged.extend_from_slice(&hole[..=j]);
    merged.extend_from_slice(&current[i..]);
    // A hole touching the loop gives a zero-length bridge
    merged.dedup();
    if merged.len() > 1 && merged.first() == merged.last() {
        merged.pop();
    }
    merged
}
