// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Walls carved by doors and windows, end to end

use approx::assert_relative_eq;
use home3d_geometry::{
    build_wall_geometry, resolve_openings, BandKind, CutoutState, Opening, OpeningId, Point2, Surface,
    VerticalSpan, Wall, WallGeometryOptions, WallOpening, WallSide,
};

fn wall() -> Wall {
    Wall::new(0.0, 0.0, 500.0, 0.0, 20.0, 250.0)
}

fn openings(list: &[Opening]) -> Vec<WallOpening<'_>> {
    list.iter()
        .enumerate()
        .map(|(i, opening)| WallOpening {
            id: OpeningId(i as u64),
            opening,
            cutout: CutoutState::Rectangular,
        })
        .collect()
}

fn cuts(wall: &Wall, list: &[Opening]) -> Vec<home3d_geometry::OpeningCut> {
    list.iter()
        .enumerate()
        .map(|(i, o)| o.cut(OpeningId(i as u64), wall.thickness))
        .collect()
}

#[test]
fn partition_covers_footprint_without_overlap() {
    let wall = wall();
    // Overlapping windows plus a door
    let list = [
        Opening::new(150.0, 0.0, 0.0, 100.0, 20.0, 100.0, 90.0),
        Opening::new(210.0, 0.0, 0.0, 100.0, 20.0, 60.0, 120.0),
        Opening::new(400.0, 0.0, 0.0, 90.0, 20.0, 210.0, 0.0),
    ];
    let footprint = wall.side_footprint(WallSide::Left);
    let resolved = resolve_openings(&footprint, &cuts(&wall, &list), &VerticalSpan::new(0.0, wall.top_elevation()));

    let rebuilt = resolved.wall_face.union(&resolved.covered());
    assert!(rebuilt.equals_approx(&footprint, 1e-3));

    for (i, a) in resolved.regions.iter().enumerate() {
        assert!(a.area.intersect(&resolved.wall_face).area() < 1e-6);
        for b in &resolved.regions[i + 1..] {
            assert!(a.area.intersect(&b.area).area() < 1e-6);
        }
    }
    // The overlap of both windows is its own region
    assert!(resolved.regions.iter().any(|r| r.openings.len() == 2));
}

#[test]
fn stacked_windows_leave_three_bands() {
    let wall = wall();
    let list = [
        Opening::new(250.0, 0.0, 0.0, 80.0, 20.0, 50.0, 50.0),
        Opening::new(250.0, 0.0, 0.0, 80.0, 20.0, 50.0, 150.0),
    ];
    let resolved = resolve_openings(
        &wall.side_footprint(WallSide::Right),
        &cuts(&wall, &list),
        &VerticalSpan::new(0.0, wall.top_elevation()),
    );
    assert_eq!(resolved.regions.len(), 1);
    let kinds: Vec<_> = resolved.bands.iter().map(|b| (b.kind, b.bottom, b.cap)).collect();
    assert_eq!(
        kinds,
        vec![
            (BandKind::Below, 0.0, Some(50.0)),
            (BandKind::Between, 100.0, Some(150.0)),
            (BandKind::Above, 200.0, None),
        ]
    );
}

#[test]
fn touching_windows_leave_no_gap_band() {
    let wall = wall();
    let list = [
        Opening::new(250.0, 0.0, 0.0, 80.0, 20.0, 100.0, 50.0),
        Opening::new(250.0, 0.0, 0.0, 80.0, 20.0, 50.0, 150.0),
    ];
    let resolved = resolve_openings(
        &wall.side_footprint(WallSide::Right),
        &cuts(&wall, &list),
        &VerticalSpan::new(0.0, wall.top_elevation()),
    );
    assert_eq!(resolved.bands.len(), 2);
    assert!(resolved.bands.iter().all(|b| b.kind != BandKind::Between));
}

#[test]
fn door_covering_wall_leaves_nothing() {
    let wall = wall();
    let list = [Opening::new(250.0, 0.0, 0.0, 600.0, 20.0, 300.0, 0.0)];
    let resolved = resolve_openings(
        &wall.side_footprint(WallSide::Left),
        &cuts(&wall, &list),
        &VerticalSpan::new(0.0, wall.top_elevation()),
    );
    assert!(resolved.wall_face.is_empty());
    assert!(resolved.bands.is_empty());

    let geometry = build_wall_geometry(&wall, &openings(&list), &WallGeometryOptions::default()).unwrap();
    assert!(geometry.parts.surface(Surface::WallSide(WallSide::Left)).next().is_none());
    assert!(geometry.parts.surface(Surface::WallSide(WallSide::Right)).next().is_none());
}

#[test]
fn opening_beside_wall_is_ignored() {
    let wall = wall();
    let list = [Opening::new(250.0, 200.0, 0.0, 100.0, 20.0, 100.0, 100.0)];
    let carved = build_wall_geometry(&wall, &openings(&list), &WallGeometryOptions::default()).unwrap();
    let plain = build_wall_geometry(&wall, &[], &WallGeometryOptions::default()).unwrap();
    assert_eq!(carved.parts.len(), plain.parts.len());
    assert!(carved.parts.surface(Surface::OpeningEdge(WallSide::Left)).next().is_none());
}

#[test]
fn wall_geometry_is_idempotent() {
    let wall = wall().with_height_at_end(300.0);
    let list = [
        Opening::new(150.0, 0.0, 0.0, 100.0, 20.0, 100.0, 90.0),
        Opening::new(400.0, 0.0, 0.0, 90.0, 20.0, 210.0, 0.0),
    ];
    let options = WallGeometryOptions {
        subpart_size: 50.0,
        ..WallGeometryOptions::default()
    };
    let first = build_wall_geometry(&wall, &openings(&list), &options).unwrap();
    let second = build_wall_geometry(&wall, &openings(&list), &options).unwrap();
    assert_eq!(first.parts.len(), second.parts.len());
    for (a, b) in first.parts.iter().zip(second.parts.iter()) {
        assert_eq!(a.surface, b.surface);
        assert_eq!(a.mesh, b.mesh);
    }
}

#[test]
fn trapezoidal_wall_slopes_linearly() {
    let wall = wall().with_height_at_end(300.0);
    let top = wall.top_elevation();
    assert_relative_eq!(top.at(&Point2::new(250.0, 0.0)), 275.0, epsilon = 1e-9);
    assert_relative_eq!(top.at(&Point2::new(0.0, 10.0)), 250.0, epsilon = 1e-9);
    assert_relative_eq!(top.at(&Point2::new(500.0, -10.0)), 300.0, epsilon = 1e-9);

    let geometry = build_wall_geometry(&wall, &[], &WallGeometryOptions::default()).unwrap();
    let side = geometry.parts.surface(Surface::WallSide(WallSide::Left)).next().unwrap();
    let (_, max) = side.bounds();
    assert_relative_eq!(max.z, 300.0, epsilon = 1e-3);
    let top_face = geometry.parts.surface(Surface::WallTop).next().unwrap();
    assert!((0..top_face.vertex_count()).all(|i| top_face.normal(i).z > 0.99));
}

#[test]
fn window_under_sloped_top_is_clipped() {
    // Top at x=450 is 295, window runs up to 320
    let wall = wall().with_height_at_end(300.0);
    let list = [Opening::new(450.0, 0.0, 0.0, 60.0, 20.0, 120.0, 200.0)];
    let geometry = build_wall_geometry(&wall, &openings(&list), &WallGeometryOptions::default()).unwrap();
    let side = geometry.parts.surface(Surface::WallSide(WallSide::Left)).next().unwrap();
    // No vertex of the window column rises above the sill
    for i in 0..side.vertex_count() {
        let p = side.position(i);
        if p.x > 420.0 + 1e-3 && p.x < 480.0 - 1e-3 {
            assert!(p.z <= 200.0 + 1e-3);
        }
    }
}

#[test]
fn curved_wall_builds_smooth_sides() {
    let wall = Wall::new(0.0, 0.0, 400.0, 0.0, 20.0, 250.0).with_arc_extent(std::f64::consts::FRAC_PI_2);
    let list = [Opening::new(200.0, -82.8, 0.0, 80.0, 20.0, 100.0, 100.0)];
    let geometry = build_wall_geometry(&wall, &openings(&list), &WallGeometryOptions::default()).unwrap();
    for side in WallSide::BOTH {
        let mesh = geometry.parts.surface(Surface::WallSide(side)).next().unwrap();
        assert!(mesh.triangle_count() > 50);
    }
}

#[test]
fn sloped_curved_wall_stays_under_its_highest_end() {
    for (x_end, y_end) in [(-70.0, 33.0), (100.0, 0.0), (0.0, 100.0)] {
        let wall = Wall::new(0.0, 0.0, x_end, y_end, 10.0, 200.0)
            .with_arc_extent(std::f64::consts::PI)
            .with_height_at_end(300.0);
        let geometry = build_wall_geometry(&wall, &[], &WallGeometryOptions::default()).unwrap();
        let max_z = geometry
            .parts
            .iter()
            .map(|part| part.mesh.bounds().1.z as f64)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_relative_eq!(max_z, 300.0, epsilon = 1e-3);

        let top = wall.top_elevation();
        assert_relative_eq!(top.at(&wall.start()), 200.0, epsilon = 1e-6);
        assert_relative_eq!(top.at(&wall.end()), 300.0, epsilon = 1e-6);
    }
}
