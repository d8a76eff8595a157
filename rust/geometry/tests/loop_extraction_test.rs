// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary loop extraction on realistic plan areas

use approx::assert_relative_eq;
use home3d_geometry::polygon::compute_signed_area;
use home3d_geometry::{extract_loops, Area, Path2D, Point2, WindingRule};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Area {
    Area::rectangle(Point2::new(x0, y0), Point2::new(x1, y1))
}

fn loops_area(loops: &[Vec<Point2<f64>>]) -> f64 {
    loops.iter().map(|l| compute_signed_area(l)).sum()
}

fn assert_well_formed(l: &[Point2<f64>]) {
    assert!(l.len() >= 3);
    for i in 0..l.len() - 1 {
        assert!(l[i] != l[i + 1], "consecutive duplicate at {}", i);
    }
    assert!(l[0] != l[l.len() - 1], "loop repeats its first point");
}

#[test]
fn rectangle_gives_single_loop() {
    let loops = extract_loops(&rect(0.0, 0.0, 4.0, 3.0), 0.5, false);
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].len(), 4);
    assert_relative_eq!(compute_signed_area(&loops[0]), 12.0, epsilon = 1e-9);
}

#[test]
fn atrium_is_bridged_into_one_loop() {
    let area = rect(0.0, 0.0, 10.0, 10.0).subtract(&rect(4.0, 4.0, 6.0, 6.0));
    let loops = extract_loops(&area, 0.5, false);
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].len(), 10);
    assert_well_formed(&loops[0]);
    assert_relative_eq!(loops_area(&loops), 96.0, epsilon = 1e-9);
}

#[test]
fn area_is_preserved_across_islands_and_holes() {
    // Two rooms, one with two pillars, plus an island inside a courtyard
    let area = rect(0.0, 0.0, 20.0, 10.0)
        .subtract(&rect(2.0, 2.0, 4.0, 4.0))
        .subtract(&rect(12.0, 2.0, 14.0, 4.0))
        .union(&rect(30.0, 0.0, 50.0, 20.0).subtract(&rect(35.0, 5.0, 45.0, 15.0)))
        .union(&rect(38.0, 8.0, 42.0, 12.0));
    let expected = area.area();
    let loops = extract_loops(&area, 0.5, false);
    assert_eq!(loops.len(), 3);
    for l in &loops {
        assert_well_formed(l);
        assert!(compute_signed_area(l) > 0.0);
    }
    assert_relative_eq!(loops_area(&loops), expected, epsilon = 1e-6);
}

#[test]
fn hole_free_islands_round_trip_to_single_regions() {
    let area = rect(0.0, 0.0, 5.0, 5.0).union(&rect(10.0, 0.0, 15.0, 5.0));
    for l in extract_loops(&area, 0.5, false) {
        let back = Area::from_polygon(&l);
        assert_eq!(back.islands().len(), 1);
        assert!(back.is_simple());
        assert_relative_eq!(back.area(), compute_signed_area(&l), epsilon = 1e-9);
    }
}

#[test]
fn reversed_loops_mirror_forward_loops() {
    let mut path = Path2D::new();
    path.circle(Point2::new(0.0, 0.0), 10.0);
    let area = Area::from_path(&path, 0.05).subtract(&rect(-2.0, -2.0, 2.0, 2.0));

    let forward = extract_loops(&area, 0.05, false);
    let backward = extract_loops(&area, 0.05, true);
    assert_eq!(forward.len(), backward.len());
    for (f, b) in forward.iter().zip(&backward) {
        let mut reversed = f.clone();
        reversed.reverse();
        assert_eq!(&reversed, b);
        assert!(compute_signed_area(b) < 0.0);
    }
}

#[test]
fn curved_area_respects_flatness() {
    let mut path = Path2D::new();
    path.circle(Point2::new(0.0, 0.0), 100.0);
    let area = Area::from_path(&path, 0.01);
    let loops = extract_loops(&area, 0.01, false);
    assert_eq!(loops.len(), 1);
    assert!(loops[0].len() > 32);
    let exact = std::f64::consts::PI * 100.0 * 100.0;
    assert!((compute_signed_area(&loops[0]) - exact).abs() / exact < 1e-3);
}

#[test]
fn empty_area_gives_no_loops() {
    assert!(extract_loops(&Area::new(), 0.5, false).is_empty());
    assert!(extract_loops(&rect(0.0, 0.0, 0.0, 5.0), 0.5, false).is_empty());
}

#[test]
fn even_odd_path_leaves_a_courtyard() {
    // Both squares run counter-clockwise; only the winding rule makes a hole
    let mut path = Path2D::with_winding_rule(WindingRule::EvenOdd);
    path.move_to(Point2::new(0.0, 0.0))
        .line_to(Point2::new(10.0, 0.0))
        .line_to(Point2::new(10.0, 10.0))
        .line_to(Point2::new(0.0, 10.0))
        .close();
    path.move_to(Point2::new(4.0, 4.0))
        .line_to(Point2::new(6.0, 4.0))
        .line_to(Point2::new(6.0, 6.0))
        .line_to(Point2::new(4.0, 6.0))
        .close();

    let area = Area::from_path(&path, 0.5);
    assert_relative_eq!(area.area(), 96.0, epsilon = 1e-9);
    let loops = extract_loops(&area, 0.5, false);
    assert_eq!(loops.len(), 1);
    assert_relative_eq!(loops_area(&loops), 96.0, epsilon = 1e-9);
}
