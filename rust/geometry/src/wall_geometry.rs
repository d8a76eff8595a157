// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Complete geometry of one wall
//!
//! For each side: resolve the openings crossing its half footprint, sweep
//! the vertical faces of the free face and of every band, then close the
//! volume with top, bottom, sill and lintel faces. Baseboards and opening
//! surrounds are built as separate sub-meshes.

use crate::area::Area;
use crate::elevation::ElevationFunction;
use crate::face::{build_horizontal_face, EdgeFilter, FaceBandBuilder, FaceTop, TextureMapping};
use crate::mesh::{Mesh, SubMeshCollection, Surface, DEFAULT_CREASE_ANGLE};
use crate::opening::{resolve_openings, BandKind, Opening, OpeningId, ResolvedOpenings, VerticalSpan};
use crate::path::DEFAULT_FLATNESS;
use crate::surround::{build_surround, SurroundContext};
use crate::wall::{Wall, WallSide};
use crate::Result;
use std::sync::Arc;

/// Front silhouette availability for one opening
#[derive(Debug, Clone)]
pub enum CutoutState {
    /// No model, or its silhouette could not be computed: the opening is
    /// carved as a plain rectangle
    Rectangular,
    /// Normalized front silhouette ready to use
    Ready(Arc<Area>),
    /// Silhouette still loading; surrounds come later
    Pending,
}

/// An opening crossing a wall, with its silhouette state
#[derive(Debug, Clone)]
pub struct WallOpening<'a> {
    pub id: OpeningId,
    pub opening: &'a Opening,
    pub cutout: CutoutState,
}

/// Texture settings of wall sides
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WallTexture {
    pub mirror_left_side: bool,
    pub size: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallGeometryOptions {
    pub flatness: f64,
    /// Maximum size of generated quads, `0` disables subdivision
    pub subpart_size: f64,
    /// Crease angle in degrees for curved walls
    pub crease_angle: f64,
    pub texture: Option<WallTexture>,
}

impl Default for WallGeometryOptions {
    fn default() -> Self {
        Self {
            flatness: DEFAULT_FLATNESS,
            subpart_size: 0.0,
            crease_angle: DEFAULT_CREASE_ANGLE,
            texture: None,
        }
    }
}

/// Sub-meshes of a wall, plus the openings whose surrounds wait for a
/// silhouette
#[derive(Debug, Clone, Default)]
pub struct WallGeometry {
    pub parts: SubMeshCollection,
    pub pending_cutouts: Vec<OpeningId>,
}

/// Build every part of `wall` carved by `openings`
///
/// Openings that do not reach the wall are ignored; a wall entirely
/// covered by openings yields no side faces.
pub fn build_wall_geometry(
    wall: &Wall,
    openings: &[WallOpening<'_>],
    options: &WallGeometryOptions,
) -> Result<WallGeometry> {
    wall.validate()?;

    let top = wall.top_elevation();
    let span = VerticalSpan::new(0.0, top);
    let cuts: Vec<_> = openings.iter().map(|o| o.opening.cut(o.id, wall.thickness)).collect();

    let mut geometry = WallGeometry::default();
    for o in openings {
        if matches!(o.cutout, CutoutState::Pending) && !geometry.pending_cutouts.contains(&o.id) {
            geometry.pending_cutouts.push(o.id);
        }
    }

    for side in WallSide::BOTH {
        let resolved = resolve_openings(&wall.side_footprint(side), &cuts, &span);
        let builder = side_builder(wall, side, options);

        let parts = &mut geometry.parts;
        parts.add_opt(
            Surface::WallSide(side),
            vertical_faces(&builder, &resolved, FaceTop::from(top), options.flatness),
        );
        let horizontal = horizontal_faces(&resolved, FaceTop::from(top), options.flatness);
        parts.add_opt(Surface::WallTop, horizontal.top);
        parts.add_opt(Surface::WallBottom, horizontal.bottom);
        parts.add_opt(Surface::OpeningEdge(side), horizontal.edges);

        for baseboard in build_baseboard(wall, side, &cuts, top, options) {
            parts.add(Surface::Baseboard(side), baseboard);
        }

        let context = SurroundContext {
            wall,
            side,
            top,
            flatness: options.flatness,
        };
        for o in openings {
            let CutoutState::Ready(cutout) = &o.cutout else {
                continue;
            };
            if !resolved.regions.iter().any(|r| r.openings.contains(&o.id)) {
                continue;
            }
            parts.add_opt(
                Surface::OpeningSurround { opening: o.id, side },
                build_surround(o.opening, cutout, &context),
            );
        }
    }

    tracing::trace!(
        parts = geometry.parts.len(),
        pending = geometry.pending_cutouts.len(),
        "Built wall geometry"
    );
    Ok(geometry)
}

/// Vertical faces of the free face and of every band
fn vertical_faces(builder: &FaceBandBuilder<'_>, resolved: &ResolvedOpenings, top: FaceTop, flatness: f64) -> Option<Mesh> {
    let mut mesh = builder
        .build_area(&resolved.wall_face, 0.0, top, flatness)
        .unwrap_or_default();
    for band in &resolved.bands {
        if let Some(part) = builder.build_band(band, flatness) {
            mesh.merge(&part);
        }
    }
    (!mesh.is_empty()).then_some(mesh)
}

struct HorizontalFaces {
    top: Option<Mesh>,
    bottom: Option<Mesh>,
    /// Sills and lintels
    edges: Option<Mesh>,
}

/// Faces closing a carved face set from above, below and inside its openings
fn horizontal_faces(resolved: &ResolvedOpenings, top: FaceTop, flatness: f64) -> HorizontalFaces {
    let mut top_area = resolved.wall_face.clone();
    let mut bottom_area = resolved.wall_face.clone();
    let mut edges = Mesh::new();

    for band in &resolved.bands {
        match band.kind {
            BandKind::Above => top_area = top_area.union(&band.area),
            BandKind::Below => {
                bottom_area = bottom_area.union(&band.area);
                if let Some(sill) = build_horizontal_face(&band.area, FaceTop::new(band.top, band.cap), true, flatness) {
                    edges.merge(&sill);
                }
            }
            BandKind::Between => {
                if let Some(sill) = build_horizontal_face(&band.area, FaceTop::new(band.top, band.cap), true, flatness) {
                    edges.merge(&sill);
                }
            }
        }
        if band.kind != BandKind::Below {
            let lintel = build_horizontal_face(&band.area, ElevationFunction::flat(band.bottom).into(), false, flatness);
            if let Some(lintel) = lintel {
                edges.merge(&lintel);
            }
        }
    }

    HorizontalFaces {
        top: build_horizontal_face(&top_area, top, true, flatness),
        bottom: build_horizontal_face(&bottom_area, ElevationFunction::flat(0.0).into(), false, flatness),
        edges: (!edges.is_empty()).then_some(edges),
    }
}

/// Vertical face builder for `side`, subdivided and textured per `options`
fn side_builder<'a>(wall: &'a Wall, side: WallSide, options: &WallGeometryOptions) -> FaceBandBuilder<'a> {
    let builder = FaceBandBuilder::new(wall)
        .with_subpart_size(options.subpart_size)
        .with_crease_angle(options.crease_angle);
    match options.texture {
        Some(texture) => builder.with_texture(TextureMapping {
            mirror_left_side: texture.mirror_left_side,
            size: texture.size,
            ..TextureMapping::for_wall(wall, side)
        }),
        None => builder,
    }
}

/// Baseboard on `side`, carved by the same openings as the wall
///
/// Vertical faces come first; the untextured top and opening edges follow
/// as a separate mesh so that merging them keeps the side UVs.
fn build_baseboard(
    wall: &Wall,
    side: WallSide,
    cuts: &[crate::opening::OpeningCut],
    top: ElevationFunction,
    options: &WallGeometryOptions,
) -> Vec<Mesh> {
    let (Some(baseboard), Some(points)) = (wall.baseboard(side), wall.baseboard_points(side)) else {
        return Vec::new();
    };
    let footprint = Area::from_polygon(&points);
    let span = VerticalSpan::capped(0.0, top, baseboard.height);
    let resolved = resolve_openings(&footprint, cuts, &span);

    let builder = side_builder(wall, side, options).with_edge_filter(EdgeFilter::AllEdges);
    let face_top = FaceTop::new(top, Some(baseboard.height));
    let Some(vertical) = vertical_faces(&builder, &resolved, face_top, options.flatness) else {
        return Vec::new();
    };

    let mut flat = Mesh::new();
    let horizontal = horizontal_faces(&resolved, face_top, options.flatness);
    for part in [horizontal.top, horizontal.edges].into_iter().flatten() {
        flat.merge(&part);
    }
    vec![vertical, flat]
}
