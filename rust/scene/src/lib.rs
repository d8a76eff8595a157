// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home3D Scene
//!
//! Keeps floor-plan entities in slot maps and the meshes derived from them
//! in an arena-backed scene graph. Entity changes mark dependent walls and
//! rooms dirty; an update pass rebuilds them in parallel.
//!
//! ```
//! use std::sync::Arc;
//! use futures::future::BoxFuture;
//! use futures::FutureExt;
//! use home3d_geometry::{Mesh, ModelRef, Wall};
//! use home3d_scene::{Error, HomeScene, ModelLoader, Result, SceneConfig};
//!
//! struct NoModels;
//!
//! impl ModelLoader for NoModels {
//!     fn load(&self, model: &ModelRef) -> BoxFuture<'static, Result<Arc<Mesh>>> {
//!         let err = Error::ModelLoad { uri: model.uri.clone(), reason: "offline".into() };
//!         futures::future::ready(Err(err)).boxed()
//!     }
//! }
//!
//! let mut scene = HomeScene::new(SceneConfig::default(), Arc::new(NoModels));
//! let wall = scene.add_wall(Wall::new(0.0, 0.0, 300.0, 0.0, 15.0, 250.0), None).unwrap();
//! assert_eq!(scene.update().walls, 1);
//! assert!(scene.wall_node(wall).is_some());
//! ```

pub mod arena;
pub mod config;
pub mod error;
pub mod export;
pub mod home;
pub mod keys;
pub mod materials;
pub mod silhouette;
pub mod traversal;

pub use arena::{MeshArena, SceneGraph, SceneNode};
pub use config::{CutoutPolicy, SceneConfig};
pub use error::{Error, Result};
pub use export::{export_triangles, to_json, ExportDocument, ExportTriangle, ExportedMaterial};
pub use home::{CutoutRequest, CutoutResult, HomeScene, UpdateReport};
pub use keys::{EntityKey, EntityType, LevelKey, MeshKey, NodeKey, OpeningKey, RoomKey, StaircaseKey, WallKey};
pub use materials::{color_material, Material, MaterialId, MaterialTable};
pub use silhouette::{full_cutout, ModelKey, ModelLoader, SilhouetteCache, SilhouetteKey, SilhouetteService};
pub use traversal::{DrawItem, SceneVisitor};
