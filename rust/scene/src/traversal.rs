// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Depth-first traversal of the scene graph.
//!
//! Node kinds are dispatched by pattern matching; visitors receive every
//! drawable node with its accumulated world transform.

use nalgebra::Matrix4;
use std::sync::Arc;

use crate::arena::{SceneGraph, SceneNode};
use crate::keys::NodeKey;
use crate::materials::MaterialId;
use home3d_geometry::{Mesh, Surface};

/// A drawable node reached during traversal.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    pub node: NodeKey,
    pub mesh: &'a Arc<Mesh>,
    pub material: MaterialId,
    pub surface: Option<Surface>,
    /// Product of every transform from the root down to this node
    pub world: &'a Matrix4<f64>,
}

/// Callbacks for [`SceneGraph::walk`].
pub trait SceneVisitor {
    /// Called before a group's children; return `false` to skip them.
    fn enter_group(&mut self, _key: NodeKey, _name: &str) -> bool {
        true
    }

    fn leave_group(&mut self, _key: NodeKey, _name: &str) {}

    /// Called for every leaf and instance whose mesh is still stored.
    fn visit(&mut self, item: DrawItem<'_>);
}

impl SceneGraph {
    /// Walk the whole graph depth first, children in insertion order.
    pub fn walk<V: SceneVisitor>(&self, visitor: &mut V) {
        self.walk_from(self.root(), &Matrix4::identity(), visitor);
    }

    /// Walk the subtree under `key` as if `parent_world` were its parent's
    /// world transform.
    pub fn walk_from<V: SceneVisitor>(&self, key: NodeKey, parent_world: &Matrix4<f64>, visitor: &mut V) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        match node {
            SceneNode::Group {
                name,
                transform,
                children,
            } => {
                if !visitor.enter_group(key, name) {
                    return;
                }
                let world = parent_world * transform;
                for &child in children {
                    self.walk_from(child, &world, visitor);
                }
                visitor.leave_group(key, name);
            }
            SceneNode::Instance {
                mesh,
                transform,
                material,
            } => {
                if let Some(mesh) = self.meshes.get(*mesh) {
                    let world = parent_world * transform;
                    visitor.visit(DrawItem {
                        node: key,
                        mesh,
                        material: *material,
                        surface: None,
                        world: &world,
                    });
                }
            }
            SceneNode::Leaf {
                mesh,
                material,
                surface,
            } => {
                if let Some(mesh) = self.meshes.get(*mesh) {
                    visitor.visit(DrawItem {
                        node: key,
                        mesh,
                        material: *material,
                        surface: *surface,
                        world: parent_world,
                    });
                }
            }
        }
    }

    /// World transform of `key`'s parent chain, `None` for unknown nodes.
    pub fn world_transform(&self, key: NodeKey) -> Option<Matrix4<f64>> {
        let mut world = self.local_transform(key)?;
        let mut current = key;
        while let Some(parent) = self.parent(current) {
            world = self.local_transform(parent)? * world;
            current = parent;
        }
        Some(world)
    }

    fn local_transform(&self, key: NodeKey) -> Option<Matrix4<f64>> {
        match self.nodes.get(key)? {
            SceneNode::Group { transform, .. } | SceneNode::Instance { transform, .. } => Some(*transform),
            SceneNode::Leaf { .. } => Some(Matrix4::identity()),
        }
    }
}
