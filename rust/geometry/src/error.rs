// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry derivation
///
/// Degenerate input (empty areas, collapsed loops, fully covered walls) is
/// not an error: builders return `None` or empty collections for it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    #[error("Invalid polygon: {0}")]
    InvalidPolygon(String),

    #[error("Invalid wall: {0}")]
    InvalidWall(String),

    #[error("Empty mesh: {0}")]
    EmptyMesh(String),
}
