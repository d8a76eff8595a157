// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vertical and horizontal face builders
//!
//! Vertical faces are swept from the edges of boundary loops between a flat
//! bottom and a (possibly sloped) top. Horizontal faces triangulate the
//! loops themselves at a given height.

use crate::area::Area;
use crate::elevation::{unwrap_angle, ElevationFunction};
use crate::loops::extract_loops;
use crate::mesh::{calculate_normals, Mesh, DEFAULT_CREASE_ANGLE};
use crate::opening::WallFaceBand;
use crate::triangulation::triangulate_loop;
use crate::wall::{Wall, WallArc, WallSide};
use nalgebra::{Point2, Point3, Vector3};
use rustc_hash::FxHashSet;

/// Which loop edges produce vertical faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeFilter {
    /// Skip edges lying on the wall's nominal line (internal cuts)
    SkipWallLine,
    /// Emit every edge (baseboards)
    AllEdges,
}

/// How vertex normals are produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalMode {
    /// One normal per quad, hard edges everywhere
    Flat,
    /// Normals averaged across edges meeting under `crease_angle` degrees
    Smooth { crease_angle: f64 },
}

/// Texture placement on a wall side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureMapping {
    /// Point from which U is measured
    pub origin: Point2<f64>,
    pub side: WallSide,
    /// Negate U on the left side so patterns read the same from both sides
    pub mirror_left_side: bool,
    /// Texture (width, height); coordinates stay in model units when unset
    pub size: Option<(f64, f64)>,
}

impl TextureMapping {
    pub fn for_wall(wall: &Wall, side: WallSide) -> Self {
        Self {
            origin: wall.texture_origin(side),
            side,
            mirror_left_side: false,
            size: None,
        }
    }
}

/// Top of a vertical face: a top line, optionally capped by a flat height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceTop {
    pub line: ElevationFunction,
    pub cap: Option<f64>,
}

impl FaceTop {
    pub fn new(line: ElevationFunction, cap: Option<f64>) -> Self {
        Self { line, cap }
    }

    #[inline]
    pub fn at(&self, p: &Point2<f64>) -> f64 {
        let top = self.line.at(p);
        self.cap.map_or(top, |cap| cap.min(top))
    }
}

impl From<ElevationFunction> for FaceTop {
    fn from(line: ElevationFunction) -> Self {
        Self { line, cap: None }
    }
}

/// Builds the vertical faces of one wall side
#[derive(Debug, Clone)]
pub struct FaceBandBuilder<'a> {
    wall: &'a Wall,
    arc: Option<WallArc>,
    filter: EdgeFilter,
    subpart_size: f64,
    texture: Option<TextureMapping>,
    normals: NormalMode,
}

impl<'a> FaceBandBuilder<'a> {
    /// Builder with hard normals for straight walls and smoothed normals
    /// for curved ones, no subdivision and no texture coordinates
    pub fn new(wall: &'a Wall) -> Self {
        let arc = wall.arc();
        let normals = if arc.is_some() {
            NormalMode::Smooth {
                crease_angle: DEFAULT_CREASE_ANGLE,
            }
        } else {
            NormalMode::Flat
        };
        Self {
            wall,
            arc,
            filter: EdgeFilter::SkipWallLine,
            subpart_size: 0.0,
            texture: None,
            normals,
        }
    }

    pub fn with_edge_filter(mut self, filter: EdgeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_subpart_size(mut self, subpart_size: f64) -> Self {
        self.subpart_size = subpart_size.max(0.0);
        self
    }

    pub fn with_texture(mut self, texture: TextureMapping) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Crease angle used on curved walls
    pub fn with_crease_angle(mut self, degrees: f64) -> Self {
        if self.arc.is_some() {
            self.normals = NormalMode::Smooth { crease_angle: degrees };
        }
        self
    }

    /// Vertical faces along the edges of one counter-clockwise loop
    ///
    /// Returns `None` when no edge survives the filters.
    pub fn build_loop(&self, points: &[Point2<f64>], bottom: f64, top: FaceTop) -> Option<Mesh> {
        let mut mesh = Mesh::new();
        self.emit_loop(&mut mesh, points, bottom, &top);
        self.finish(mesh)
    }

    /// Vertical faces of every loop of `area`
    pub fn build_area(&self, area: &Area, bottom: f64, top: FaceTop, flatness: f64) -> Option<Mesh> {
        let mut mesh = Mesh::new();
        for l in extract_loops(area, flatness, false) {
            self.emit_loop(&mut mesh, &l, bottom, &top);
        }
        self.finish(mesh)
    }

    /// Vertical faces of a band left by openings
    pub fn build_band(&self, band: &WallFaceBand, flatness: f64) -> Option<Mesh> {
        self.build_area(&band.area, band.bottom, FaceTop::new(band.top, band.cap), flatness)
    }

    fn finish(&self, mut mesh: Mesh) -> Option<Mesh> {
        if mesh.indices.is_empty() {
            return None;
        }
        if let NormalMode::Smooth { crease_angle } = self.normals {
            mesh.smooth_normals(crease_angle);
        }
        Some(mesh)
    }

    fn emit_loop(&self, mesh: &mut Mesh, points: &[Point2<f64>], bottom: f64, top: &FaceTop) {
        let n = points.len();
        if n < 3 {
            return;
        }
        let edge_key = |a: &Point2<f64>, b: &Point2<f64>| (a.x.to_bits(), a.y.to_bits(), b.x.to_bits(), b.y.to_bits());
        let edges: FxHashSet<_> = (0..n).map(|i| edge_key(&points[i], &points[(i + 1) % n])).collect();

        for i in 0..n {
            let p = points[i];
            let q = points[(i + 1) % n];
            if p == q {
                continue;
            }
            // Zero-width seam left by hole bridging
            if edges.contains(&edge_key(&q, &p)) {
                continue;
            }
            if self.filter == EdgeFilter::SkipWallLine && self.wall.is_on_wall_line(&p) && self.wall.is_on_wall_line(&q) {
                continue;
            }
            self.emit_edge(mesh, p, q, bottom, top);
        }
    }

    fn emit_edge(&self, mesh: &mut Mesh, p: Point2<f64>, q: Point2<f64>, bottom: f64, top: &FaceTop) {
        let d = q - p;
        let length = d.norm();
        if length < 1e-9 {
            return;
        }
        // Loops are counter-clockwise: the outside is on the right
        let normal = Vector3::new(d.y / length, -d.x / length, 0.0);

        let segments = if self.subpart_size > 0.0 {
            (length / self.subpart_size).ceil().max(1.0) as usize
        } else {
            1
        };
        for s in 0..segments {
            let a = p + d * (s as f64 / segments as f64);
            let b = p + d * ((s + 1) as f64 / segments as f64);
            let top_a = top.at(&a).max(bottom);
            let top_b = top.at(&b).max(bottom);
            if top_a - bottom < 1e-9 && top_b - bottom < 1e-9 {
                continue;
            }

            let mut z = bottom;
            if self.subpart_size > 0.0 {
                let lowest_top = top_a.min(top_b);
                while z + self.subpart_size < lowest_top {
                    let next = z + self.subpart_size;
                    self.emit_quad(mesh, a, b, (z, z), (next, next), normal);
                    z = next;
                }
            }
            self.emit_quad(mesh, a, b, (z, z), (top_a, top_b), normal);
        }
    }

    /// Quad from `a` to `b` between the given (a, b) bottom and top heights
    fn emit_quad(
        &self,
        mesh: &mut Mesh,
        a: Point2<f64>,
        b: Point2<f64>,
        bottom: (f64, f64),
        top: (f64, f64),
        normal: Vector3<f64>,
    ) {
        let corners = [
            Point3::new(a.x, a.y, bottom.0),
            Point3::new(b.x, b.y, bottom.1),
            Point3::new(b.x, b.y, top.1),
            Point3::new(a.x, a.y, top.0),
        ];
        let mut indices = [0u32; 4];
        for (slot, corner) in indices.iter_mut().zip(corners.iter()) {
            *slot = match self.texture {
                Some(texture) => mesh.add_textured_vertex(*corner, normal, self.texture_coordinates(&texture, corner)),
                None => mesh.add_vertex(*corner, normal),
            };
        }
        let [i0, i1, i2, i3] = indices;
        if top.0 > bottom.0 {
            mesh.add_triangle(i0, i1, i3);
        }
        if top.1 > bottom.1 {
            mesh.add_triangle(i1, i2, i3);
        }
    }

    fn texture_coordinates(&self, texture: &TextureMapping, corner: &Point3<f64>) -> Point2<f64> {
        let p = Point2::new(corner.x, corner.y);
        let mut u = match self.arc {
            Some(arc) => arc_abscissa(&arc, &texture.origin, &p),
            None => (p - texture.origin).norm(),
        };
        if texture.mirror_left_side && texture.side == WallSide::Left {
            u = -u;
        }
        let mut v = corner.z;
        if let Some((width, height)) = texture.size {
            if width > 0.0 {
                u /= width;
            }
            if height > 0.0 {
                v /= height;
            }
        }
        Point2::new(u, v)
    }
}

/// Signed arc length from `origin` to `p` around the wall arc, measured on
/// the circle through `origin`; negative along arcs with a negative extent
fn arc_abscissa(arc: &WallArc, origin: &Point2<f64>, p: &Point2<f64>) -> f64 {
    let reference = (origin.y - arc.center.y).atan2(origin.x - arc.center.x);
    let radius = (origin - arc.center).norm();
    let angle = unwrap_angle((p.y - arc.center.y).atan2(p.x - arc.center.x), reference, arc.extent);
    (angle - reference) * radius
}

/// Horizontal face over `area` at the height given by `height`
///
/// Faces looking down use reversed loops so their triangles wind
/// clockwise seen from above. Texture coordinates are plan coordinates.
pub fn build_horizontal_face(area: &Area, height: FaceTop, facing_up: bool, flatness: f64) -> Option<Mesh> {
    let mut mesh = Mesh::new();
    let hint = if facing_up { Vector3::z() } else { -Vector3::z() };

    for l in extract_loops(area, flatness, !facing_up) {
        let triangles = match triangulate_loop(&l) {
            Ok(triangles) => triangles,
            Err(e) => {
                tracing::trace!(error = %e, "Skipping untriangulable loop");
                continue;
            }
        };
        if triangles.is_empty() {
            continue;
        }
        let base = mesh.vertex_count() as u32;
        for p in &l {
            mesh.add_textured_vertex(Point3::new(p.x, p.y, height.at(p)), hint, *p);
        }
        for t in triangles {
            mesh.add_triangle(base + t[0] as u32, base + t[1] as u32, base + t[2] as u32);
        }
    }

    if mesh.indices.is_empty() {
        return None;
    }
    if height.line.is_flat() {
        return Some(mesh);
    }
    // Sloped faces take their normals from the triangles
    calculate_normals(&mut mesh);
    Some(mesh)
}
