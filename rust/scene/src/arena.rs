// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for meshes and scene nodes.
//!
//! Meshes are immutable once stored and shared through `Arc`, so one
//! template (a door model, say) can back any number of instance nodes.
//! Nodes live in a slot map with a parent index for upward traversal.

use nalgebra::Matrix4;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::keys::{MeshKey, NodeKey};
use crate::materials::MaterialId;
use home3d_geometry::{Mesh, Surface};

/// Immutable meshes addressed by key.
#[derive(Debug, Default)]
pub struct MeshArena {
    meshes: SlotMap<MeshKey, Arc<Mesh>>,
}

impl MeshArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mesh: Arc<Mesh>) -> MeshKey {
        self.meshes.insert(mesh)
    }

    pub fn get(&self, key: MeshKey) -> Option<&Arc<Mesh>> {
        self.meshes.get(key)
    }

    pub fn remove(&mut self, key: MeshKey) -> Option<Arc<Mesh>> {
        self.meshes.remove(key)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

/// A node of the scene graph.
#[derive(Debug, Clone)]
pub enum SceneNode {
    /// Transformed container of other nodes.
    Group {
        name: String,
        transform: Matrix4<f64>,
        children: Vec<NodeKey>,
    },
    /// Placement of a shared mesh; the mesh outlives the node.
    Instance {
        mesh: MeshKey,
        transform: Matrix4<f64>,
        material: MaterialId,
    },
    /// Mesh owned by this node, removed with it.
    Leaf {
        mesh: MeshKey,
        material: MaterialId,
        surface: Option<Surface>,
    },
}

/// Tree of groups, instances and leaves over a mesh arena.
///
/// # Example
///
/// ```
/// use home3d_scene::{SceneGraph, MaterialId};
/// use home3d_geometry::Mesh;
///
/// let mut graph = SceneGraph::new();
/// let group = graph.add_group(graph.root(), "level").unwrap();
/// graph.add_leaf(group, Mesh::new(), MaterialId(0), None).unwrap();
/// assert_eq!(graph.node_count(), 3);
/// ```
#[derive(Debug)]
pub struct SceneGraph {
    pub(crate) meshes: MeshArena,
    pub(crate) nodes: SlotMap<NodeKey, SceneNode>,
    pub(crate) parents: FxHashMap<NodeKey, NodeKey>,
    root: NodeKey,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::Group {
            name: "root".to_string(),
            transform: Matrix4::identity(),
            children: Vec::new(),
        });
        Self {
            meshes: MeshArena::new(),
            nodes,
            parents: FxHashMap::default(),
            root,
        }
    }

    #[inline]
    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn meshes(&self) -> &MeshArena {
        &self.meshes
    }

    /// Store a shared mesh for instance nodes.
    pub fn add_mesh(&mut self, mesh: Arc<Mesh>) -> MeshKey {
        self.meshes.insert(mesh)
    }

    pub fn add_group(&mut self, parent: NodeKey, name: impl Into<String>) -> Result<NodeKey> {
        self.add_transformed_group(parent, name, Matrix4::identity())
    }

    pub fn add_transformed_group(
        &mut self,
        parent: NodeKey,
        name: impl Into<String>,
        transform: Matrix4<f64>,
    ) -> Result<NodeKey> {
        self.attach(
            parent,
            SceneNode::Group {
                name: name.into(),
                transform,
                children: Vec::new(),
            },
        )
    }

    /// Add a node owning `mesh`.
    pub fn add_leaf(
        &mut self,
        parent: NodeKey,
        mesh: Mesh,
        material: MaterialId,
        surface: Option<Surface>,
    ) -> Result<NodeKey> {
        self.check_group(parent)?;
        let mesh = self.meshes.insert(Arc::new(mesh));
        self.attach(
            parent,
            SceneNode::Leaf {
                mesh,
                material,
                surface,
            },
        )
    }

    /// Place the shared mesh `mesh` under `parent`.
    pub fn add_instance(
        &mut self,
        parent: NodeKey,
        mesh: MeshKey,
        transform: Matrix4<f64>,
        material: MaterialId,
    ) -> Result<NodeKey> {
        self.attach(
            parent,
            SceneNode::Instance {
                mesh,
                transform,
                material,
            },
        )
    }

    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.parents.get(&key).copied()
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        match self.nodes.get(key) {
            Some(SceneNode::Group { children, .. }) => children,
            _ => &[],
        }
    }

    pub fn set_transform(&mut self, key: NodeKey, new_transform: Matrix4<f64>) -> Result<()> {
        match self.nodes.get_mut(key) {
            Some(SceneNode::Group { transform, .. }) | Some(SceneNode::Instance { transform, .. }) => {
                *transform = new_transform;
                Ok(())
            }
            _ => Err(Error::NodeNotFound(key)),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Remove `key` and everything under it, with the meshes its leaves own.
    ///
    /// The root itself is never removed; removing it clears its children.
    pub fn remove_subtree(&mut self, key: NodeKey) -> Result<()> {
        if !self.nodes.contains_key(key) {
            return Err(Error::NodeNotFound(key));
        }
        if key == self.root {
            let children = self.children(key).to_vec();
            for child in children {
                self.remove_subtree(child)?;
            }
            return Ok(());
        }

        if let Some(parent) = self.parents.remove(&key) {
            if let Some(SceneNode::Group { children, .. }) = self.nodes.get_mut(parent) {
                children.retain(|&c| c != key);
            }
        }
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            self.parents.remove(&current);
            match self.nodes.remove(current) {
                Some(SceneNode::Group { children, .. }) => stack.extend(children),
                Some(SceneNode::Leaf { mesh, .. }) => {
                    self.meshes.remove(mesh);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_group(&self, key: NodeKey) -> Result<()> {
        match self.nodes.get(key) {
            Some(SceneNode::Group { .. }) => Ok(()),
            _ => Err(Error::NodeNotFound(key)),
        }
    }

    fn attach(&mut self, parent: NodeKey, node: SceneNode) -> Result<NodeKey> {
        self.check_group(parent)?;
        let key = self.nodes.insert(node);
        if let Some(SceneNode::Group { children, .. }) = self.nodes.get_mut(parent) {
            children.push(key);
        }
        self.parents.insert(key, parent);
        Ok(key)
    }
}
