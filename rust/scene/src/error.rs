// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for scene operations.

use crate::keys::{LevelKey, NodeKey, OpeningKey, RoomKey, StaircaseKey, WallKey};

/// Result type alias for scene operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during scene operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("wall not found: {0:?}")]
    WallNotFound(WallKey),

    #[error("opening not found: {0:?}")]
    OpeningNotFound(OpeningKey),

    #[error("room not found: {0:?}")]
    RoomNotFound(RoomKey),

    #[error("staircase not found: {0:?}")]
    StaircaseNotFound(StaircaseKey),

    #[error("level not found: {0:?}")]
    LevelNotFound(LevelKey),

    /// A scene node was removed or never existed.
    #[error("scene node not found: {0:?}")]
    NodeNotFound(NodeKey),

    /// Geometry derivation rejected its input.
    #[error("geometry error: {0}")]
    Geometry(#[from] home3d_geometry::Error),

    /// A model could not be loaded.
    #[error("model load failed for {uri}: {reason}")]
    ModelLoad { uri: String, reason: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
