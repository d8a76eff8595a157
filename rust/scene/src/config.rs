// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene configuration loaded from environment variables.

use home3d_geometry::mesh::DEFAULT_CREASE_ANGLE;
use home3d_geometry::DEFAULT_FLATNESS;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What a wall update does with openings whose silhouette is not loaded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutoutPolicy {
    /// Load the model before building the wall.
    #[default]
    Wait,
    /// Build the wall now and queue a request for the surrounds.
    Defer,
}

impl FromStr for CutoutPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wait" => Ok(CutoutPolicy::Wait),
            "defer" => Ok(CutoutPolicy::Defer),
            other => Err(format!("unknown cutout policy '{}'", other)),
        }
    }
}

/// Scene configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Maximum distance between a curve and its flattened polyline.
    pub flatness: f64,
    /// Maximum size of wall quads; `0` disables subdivision.
    pub subpart_size: f64,
    pub cutout_policy: CutoutPolicy,
    /// Maximum number of cached silhouettes; `0` for no limit.
    pub silhouette_cache_capacity: usize,
    /// Derive entities on the rayon pool.
    pub parallel_updates: bool,
    /// Crease angle in degrees for curved walls.
    pub crease_angle_degrees: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            flatness: DEFAULT_FLATNESS,
            subpart_size: 0.0,
            cutout_policy: CutoutPolicy::Wait,
            silhouette_cache_capacity: 256,
            parallel_updates: true,
            crease_angle_degrees: DEFAULT_CREASE_ANGLE,
        }
    }
}

impl SceneConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            flatness: parse_var(&lookup, "HOME3D_FLATNESS")
                .filter(|f: &f64| *f > 0.0)
                .unwrap_or(defaults.flatness),
            subpart_size: parse_var(&lookup, "HOME3D_SUBPART_SIZE")
                .filter(|s: &f64| *s >= 0.0)
                .unwrap_or(defaults.subpart_size),
            cutout_policy: parse_var(&lookup, "HOME3D_CUTOUT_POLICY").unwrap_or(defaults.cutout_policy),
            silhouette_cache_capacity: parse_var(&lookup, "HOME3D_SILHOUETTE_CACHE")
                .unwrap_or(defaults.silhouette_cache_capacity),
            parallel_updates: parse_var(&lookup, "HOME3D_PARALLEL").unwrap_or(defaults.parallel_updates),
            crease_angle_degrees: parse_var(&lookup, "HOME3D_CREASE_ANGLE")
                .unwrap_or(defaults.crease_angle_degrees),
        }
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name).and_then(|v| v.trim().parse().ok())
}
