// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry filling the gap between a carved opening and its model
//!
//! The wall builder carves the whole opening rectangle. When the model of
//! the door or window does not fill that rectangle (arched windows, round
//! portholes), the residual is patched on the wall face and joined to the
//! wall's mid-thickness plane with jambs.
//!
//! All work happens in the opening's front frame: `s` runs along the
//! opening width from its center, `z` is the elevation.

use crate::area::Area;
use crate::elevation::ElevationFunction;
use crate::loops::extract_loops;
use crate::mesh::Mesh;
use crate::opening::Opening;
use crate::polygon::compute_signed_area;
use crate::triangulation::triangulate_loop;
use crate::wall::{Wall, WallSide};
use nalgebra::{Point2, Point3, Vector2, Vector3};

/// Tolerance for classifying residual edges against the opening rectangle
/// and the wall top line
const SURROUND_EPSILON: f64 = 1e-4;

/// Wall side a surround is built for
#[derive(Debug, Clone, Copy)]
pub struct SurroundContext<'a> {
    pub wall: &'a Wall,
    pub side: WallSide,
    pub top: ElevationFunction,
    pub flatness: f64,
}

/// Opening front frame placed in the world
struct FrontFrame {
    center: Point2<f64>,
    width_axis: Vector2<f64>,
    depth_axis: Vector2<f64>,
    /// Depth coordinate of the wall face plane
    face: f64,
    /// Depth coordinate of the wall mid-thickness plane
    mid: f64,
}

impl FrontFrame {
    fn world(&self, s: f64, z: f64, depth: f64) -> Point3<f64> {
        let p = self.center + self.width_axis * s + self.depth_axis * depth;
        Point3::new(p.x, p.y, z)
    }

    fn world_direction(&self, s: f64, z: f64, depth: f64) -> Vector3<f64> {
        let d = self.width_axis * s + self.depth_axis * depth;
        Vector3::new(d.x, d.y, z)
    }

    /// Plan point of the front frame abscissa `s` on the face plane
    fn plan(&self, s: f64) -> Point2<f64> {
        self.center + self.width_axis * s + self.depth_axis * self.face
    }
}

/// Patch, jambs and sloping tops around `opening` on one wall side
///
/// `front_cutout` is the model's front silhouette in normalized
/// `[-0.5, 0.5]²` space. Returns `None` when the silhouette covers the
/// whole opening, or when the opening does not run along a straight wall.
pub fn build_surround(opening: &Opening, front_cutout: &Area, ctx: &SurroundContext) -> Option<Mesh> {
    if !ctx.wall.is_parallel_to(opening.angle) || opening.width <= 0.0 || opening.height <= 0.0 {
        return None;
    }

    let (sin, cos) = opening.angle.sin_cos();
    let width_axis = Vector2::new(cos, sin);
    let depth_axis = Vector2::new(-sin, cos);
    let center = opening.center();
    let side_line = ctx.wall.offset_line(ctx.side.sign() * ctx.wall.thickness / 2.0);
    let frame = FrontFrame {
        center,
        width_axis,
        depth_axis,
        face: (side_line[0] - center).dot(&depth_axis),
        mid: (ctx.wall.start() - center).dot(&depth_axis),
    };
    if (frame.face - frame.mid).abs() < SURROUND_EPSILON {
        return None;
    }

    let half = opening.width / 2.0;
    let bottom = opening.elevation;
    let top_at = |s: f64| ctx.top.at(&frame.plan(s));

    // Opening rectangle kept under the wall top
    let rect = Area::rectangle(Point2::new(-half, bottom), Point2::new(half, opening.top()));
    let reach = half + 1.0;
    let floor = bottom - 1.0;
    let under_top = Area::from_polygon(&[
        Point2::new(-reach, floor),
        Point2::new(reach, floor),
        Point2::new(reach, top_at(reach)),
        Point2::new(-reach, top_at(-reach)),
    ]);
    let clipped = rect.intersect(&under_top);
    if clipped.is_empty() {
        return None;
    }

    let cutout = front_cutout.map_points(|p| Point2::new(p.x * opening.width, bottom + (p.y + 0.5) * opening.height));
    let residual = clipped.subtract(&cutout);
    if residual.area() < SURROUND_EPSILON {
        return None;
    }

    let outward = (frame.face - frame.mid).signum();
    let mut mesh = Mesh::new();

    // Front patch on the wall face plane
    let face_normal = frame.world_direction(0.0, 0.0, outward);
    for l in extract_loops(&residual, ctx.flatness, false) {
        let Ok(triangles) = triangulate_loop(&l) else {
            continue;
        };
        let base = mesh.vertex_count() as u32;
        for p in &l {
            mesh.add_vertex(frame.world(p.x, p.y, frame.face), face_normal);
        }
        for t in triangles {
            push_oriented_triangle(&mut mesh, [base + t[0] as u32, base + t[1] as u32, base + t[2] as u32], &face_normal);
        }
    }

    // Jambs and sloping tops from the raw contours: no splice seams there
    let on_rect_side = |p: &Point2<f64>, q: &Point2<f64>| {
        let same = |a: f64, b: f64, v: f64| (a - v).abs() < SURROUND_EPSILON && (b - v).abs() < SURROUND_EPSILON;
        same(p.x, q.x, -half) || same(p.x, q.x, half) || same(p.y, q.y, bottom) || same(p.y, q.y, opening.top())
    };
    let on_top_line = |p: &Point2<f64>| (p.y - top_at(p.x)).abs() < SURROUND_EPSILON;
    let slope = (top_at(1.0) - top_at(-1.0)) / 2.0;

    for island in residual.islands() {
        for contour in std::iter::once(&island.outer).chain(island.holes.iter()) {
            let n = contour.len();
            if n < 3 || compute_signed_area(contour).abs() < SURROUND_EPSILON * SURROUND_EPSILON {
                continue;
            }
            for i in 0..n {
                let p = contour[i];
                let q = contour[(i + 1) % n];
                let d = q - p;
                if d.norm() < SURROUND_EPSILON {
                    continue;
                }
                let normal = if on_top_line(&p) && on_top_line(&q) {
                    // Sloping top: faces up, perpendicular to the top line
                    frame.world_direction(-slope, 1.0, 0.0)
                } else if on_rect_side(&p, &q) {
                    continue;
                } else {
                    // Residual lies on the left of every contour edge
                    frame.world_direction(d.y, -d.x, 0.0)
                };
                let normal = normal.try_normalize(1e-12).unwrap_or(face_normal);
                let corners = [
                    frame.world(p.x, p.y, frame.face),
                    frame.world(q.x, q.y, frame.face),
                    frame.world(q.x, q.y, frame.mid),
                    frame.world(p.x, p.y, frame.mid),
                ];
                let indices: Vec<u32> = corners.iter().map(|c| mesh.add_vertex(*c, normal)).collect();
                push_oriented_triangle(&mut mesh, [indices[0], indices[1], indices[2]], &normal);
                push_oriented_triangle(&mut mesh, [indices[0], indices[2], indices[3]], &normal);
            }
        }
    }

    if mesh.indices.is_empty() {
        None
    } else {
        Some(mesh)
    }
}

/// Add a triangle wound so that its geometric normal agrees with `hint`
fn push_oriented_triangle(mesh: &mut Mesh, t: [u32; 3], hint: &Vector3<f64>) {
    let a = mesh.position(t[0] as usize);
    let geometric = (mesh.position(t[1] as usize) - a).cross(&(mesh.position(t[2] as usize) - a));
    if geometric.dot(hint) >= 0.0 {
        mesh.add_triangle(t[0], t[1], t[2]);
    } else {
        mesh.add_triangle(t[0], t[2], t[1]);
    }
}
