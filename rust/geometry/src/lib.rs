// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home3D Geometry
//!
//! Derives renderable meshes from floor-plan entities: walls carved by
//! doors and windows, room floors and ceilings, and the surrounds filling
//! the gap between an opening and its model. Uses i_overlay for planar
//! boolean operations, earcutr for triangulation and nalgebra for math.
//!
//! Everything here is synchronous and pure: the same inputs always give
//! the same meshes.

pub mod area;
pub mod elevation;
pub mod error;
pub mod face;
pub mod loops;
pub mod mesh;
pub mod opening;
pub mod path;
pub mod polygon;
pub mod room;
pub mod silhouette;
pub mod surround;
pub mod triangulation;
pub mod wall;
pub mod wall_geometry;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector2, Vector3};

pub use area::{Area, Island};
pub use elevation::{ElevationFunction, WallFrame};
pub use error::{Error, Result};
pub use face::{build_horizontal_face, EdgeFilter, FaceBandBuilder, FaceTop, NormalMode, TextureMapping};
pub use loops::extract_loops;
pub use mesh::{calculate_normals, Mesh, SubMesh, SubMeshCollection, Surface};
pub use opening::{
    resolve_openings, BandKind, ModelRef, Opening, OpeningCut, OpeningId, OpeningRegion, ResolvedOpenings,
    VerticalSpan, WallFaceBand,
};
pub use path::{FlatSegment, Path2D, PathSegment, PathSource, WindingRule, DEFAULT_FLATNESS};
pub use room::{build_room_faces, Level, Room, RoomCutouts, Staircase};
pub use silhouette::{normalized_silhouette, project_silhouette, Projection};
pub use surround::{build_surround, SurroundContext};
pub use triangulation::{triangulate_loop, triangulate_polygon};
pub use wall::{Baseboard, Wall, WallSide};
pub use wall_geometry::{build_wall_geometry, CutoutState, WallGeometry, WallGeometryOptions, WallOpening, WallTexture};
