// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model silhouettes, loaded asynchronously and cached
//!
//! Projecting a model is expensive, so silhouettes are memoized per model
//! content and rotation. Entries are immutable `Arc<Area>`s shared by every
//! scene using the same service.

use futures::future::BoxFuture;
use home3d_geometry::{normalized_silhouette, Area, Matrix3, Mesh, ModelRef, Point2, Projection};
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::Result;

/// Hash of a model's geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelKey(pub u64);

impl ModelKey {
    /// Hash of the mesh positions and indices
    /// Uses FxHasher for speed - we don't need cryptographic hashing
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let mut hasher = FxHasher::default();

        // Hash vertex count and index count first for fast rejection
        mesh.positions.len().hash(&mut hasher);
        mesh.indices.len().hash(&mut hasher);

        // Convert f32 to bits for reliable hashing
        for pos in &mesh.positions {
            pos.to_bits().hash(&mut hasher);
        }
        for idx in &mesh.indices {
            idx.hash(&mut hasher);
        }

        ModelKey(hasher.finish())
    }
}

/// Cache key: model content, model rotation and projection plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SilhouetteKey {
    pub model: ModelKey,
    rotation: [u64; 9],
    pub projection: Projection,
}

impl SilhouetteKey {
    pub fn new(model: ModelKey, rotation: &[[f64; 3]; 3], projection: Projection) -> Self {
        let mut bits = [0u64; 9];
        for (i, row) in rotation.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                // -0.0 and 0.0 are the same rotation
                bits[i * 3 + j] = (v + 0.0).to_bits();
            }
        }
        Self {
            model,
            rotation: bits,
            projection,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    area: Arc<Area>,
    last_used: AtomicU64,
}

/// Bounded least-recently-used silhouette cache
///
/// Lookups only take the read lock; recency is tracked with atomics.
#[derive(Debug)]
pub struct SilhouetteCache {
    entries: RwLock<FxHashMap<SilhouetteKey, CacheEntry>>,
    clock: AtomicU64,
    /// `0` means unbounded
    capacity: usize,
}

impl SilhouetteCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            clock: AtomicU64::new(0),
            capacity,
        }
    }

    pub fn get(&self, key: &SilhouetteKey) -> Option<Arc<Area>> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;
        entry.last_used.store(self.tick(), Ordering::Relaxed);
        Some(Arc::clone(&entry.area))
    }

    pub fn insert(&self, key: SilhouetteKey, area: Arc<Area>) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        entries.insert(
            key,
            CacheEntry {
                area,
                last_used: AtomicU64::new(self.tick()),
            },
        );
        while self.capacity > 0 && entries.len() > self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used.load(Ordering::Relaxed))
                .map(|(k, _)| *k);
            match oldest {
                Some(k) => {
                    entries.remove(&k);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }
}

/// Source of model meshes
///
/// Implementations may load from disk or network; the returned future must
/// not borrow the loader.
pub trait ModelLoader: Send + Sync {
    fn load(&self, model: &ModelRef) -> BoxFuture<'static, Result<Arc<Mesh>>>;
}

/// The whole normalized square: an opening carved as a plain rectangle
pub fn full_cutout() -> Area {
    Area::rectangle(Point2::new(-0.5, -0.5), Point2::new(0.5, 0.5))
}

/// Loads models and turns them into cached silhouettes
pub struct SilhouetteService {
    loader: Arc<dyn ModelLoader>,
    cache: Arc<SilhouetteCache>,
    /// Content keys of models loaded before, by URI
    known: RwLock<FxHashMap<String, ModelKey>>,
}

impl std::fmt::Debug for SilhouetteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SilhouetteService")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl SilhouetteService {
    pub fn new(loader: Arc<dyn ModelLoader>, cache: Arc<SilhouetteCache>) -> Self {
        Self {
            loader,
            cache,
            known: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn cache(&self) -> &Arc<SilhouetteCache> {
        &self.cache
    }

    /// Silhouette already computed for `model`, without loading anything
    pub fn cached(&self, model: &ModelRef, projection: Projection) -> Option<Arc<Area>> {
        let content = *self.known.read().ok()?.get(&model.uri)?;
        self.cache.get(&SilhouetteKey::new(content, &model.rotation, projection))
    }

    /// Normalized silhouette of `model`
    ///
    /// A model that fails to load, or that is flat in the projection plane,
    /// gives the full square.
    pub async fn silhouette(&self, model: &ModelRef, projection: Projection) -> Arc<Area> {
        if let Some(area) = self.cached(model, projection) {
            tracing::debug!(uri = %model.uri, ?projection, "Silhouette cache hit");
            return area;
        }

        let mesh = match self.loader.load(model).await {
            Ok(mesh) => mesh,
            Err(e) => {
                tracing::warn!(uri = %model.uri, error = %e, "Model load failed, using full cut-out");
                return Arc::new(full_cutout());
            }
        };

        let content = ModelKey::from_mesh(&mesh);
        if let Ok(mut known) = self.known.write() {
            known.insert(model.uri.clone(), content);
        }
        let key = SilhouetteKey::new(content, &model.rotation, projection);
        if let Some(area) = self.cache.get(&key) {
            return area;
        }

        let r = &model.rotation;
        let rotation = Matrix3::new(
            r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2],
        );
        let area = Arc::new(normalized_silhouette(&mesh, &rotation, projection).unwrap_or_else(full_cutout));
        self.cache.insert(key, Arc::clone(&area));
        tracing::debug!(uri = %model.uri, ?projection, islands = area.islands().len(), "Computed silhouette");
        area
    }

    /// Front silhouette of a door or window model
    pub async fn front_cutout(&self, model: &ModelRef) -> Arc<Area> {
        self.silhouette(model, Projection::Front).await
    }

    /// [`front_cutout`](Self::front_cutout), blocking the calling thread
    pub fn front_cutout_blocking(&self, model: &ModelRef) -> Arc<Area> {
        futures::executor::block_on(self.front_cutout(model))
    }

    /// Top silhouette of a staircase model, blocking the calling thread
    pub fn top_footprint_blocking(&self, model: &ModelRef) -> Arc<Area> {
        futures::executor::block_on(self.silhouette(model, Projection::Top))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use futures::FutureExt;
    use home3d_geometry::{Point3, Vector3};
    use std::sync::atomic::AtomicUsize;

    /// Unit square panel with a triangular notch in its top; the middle
    /// triangle is degenerate
    fn notched_panel() -> Mesh {
        let mut mesh = Mesh::new();
        let n = -Vector3::y();
        let p = |x: f64, z: f64| Point3::new(x, 0.0, z);
        let v: Vec<u32> = [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.5, 0.5), p(0.0, 1.0)]
            .into_iter()
            .map(|q| mesh.add_vertex(q, n))
            .collect();
        mesh.add_triangle(v[0], v[1], v[2]);
        mesh.add_triangle(v[0], v[2], v[3]);
        mesh.add_triangle(v[0], v[3], v[4]);
        mesh
    }

    struct CountingLoader {
        calls: AtomicUsize,
    }

    impl ModelLoader for CountingLoader {
        fn load(&self, model: &ModelRef) -> BoxFuture<'static, Result<Arc<Mesh>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if model.uri == "panel.obj" {
                Ok(Arc::new(notched_panel()))
            } else {
                Err(Error::ModelLoad {
                    uri: model.uri.clone(),
                    reason: "not found".into(),
                })
            };
            futures::future::ready(result).boxed()
        }
    }

    fn service(capacity: usize) -> (Arc<CountingLoader>, SilhouetteService) {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
        });
        let service = SilhouetteService::new(loader.clone(), Arc::new(SilhouetteCache::new(capacity)));
        (loader, service)
    }

    #[test]
    fn model_key_follows_content() {
        let a = ModelKey::from_mesh(&notched_panel());
        let b = ModelKey::from_mesh(&notched_panel());
        assert_eq!(a, b);
        let mut moved = notched_panel();
        moved.positions[0] += 1.0;
        assert_ne!(a, ModelKey::from_mesh(&moved));
    }

    #[test]
    fn silhouettes_are_cached() {
        let (loader, service) = service(8);
        let model = ModelRef::new("panel.obj");
        let first = service.front_cutout_blocking(&model);
        let second = service.front_cutout_blocking(&model);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        // Notch removes a quarter of the square
        assert!((first.area() - 0.75).abs() < 1e-6);
        assert!(!first.contains_point(&Point2::new(0.0, 0.4)));
    }

    #[test]
    fn failed_load_gives_full_square() {
        let (_, service) = service(8);
        let area = service.front_cutout_blocking(&ModelRef::new("missing.obj"));
        assert!(area.equals_approx(&full_cutout(), 1e-9));
        assert!(service.cache().is_empty());
    }

    #[test]
    fn rotation_is_part_of_the_key() {
        let (loader, service) = service(8);
        let model = ModelRef::new("panel.obj");
        let mut turned = model.clone();
        turned.rotation = [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]];
        service.front_cutout_blocking(&model);
        service.front_cutout_blocking(&turned);
        assert_eq!(service.cache().len(), 2);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
        assert!(service.cached(&turned, Projection::Front).is_some());
        assert!(service.cached(&turned, Projection::Top).is_none());
    }

    #[test]
    fn cache_evicts_least_recently_used() {
        let cache = SilhouetteCache::new(2);
        let key = |i: u64| SilhouetteKey::new(ModelKey(i), &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]], Projection::Front);
        cache.insert(key(1), Arc::new(full_cutout()));
        cache.insert(key(2), Arc::new(full_cutout()));
        assert!(cache.get(&key(1)).is_some());
        cache.insert(key(3), Arc::new(full_cutout()));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(2)).is_none());
    }

    #[test]
    fn unbounded_cache_keeps_everything() {
        let cache = SilhouetteCache::new(0);
        for i in 0..100 {
            cache.insert(
                SilhouetteKey::new(ModelKey(i), &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]], Projection::Top),
                Arc::new(Area::new()),
            );
        }
        assert_eq!(cache.len(), 100);
    }

    #[tokio::test]
    async fn async_lookup_matches_blocking() {
        let (_, service) = service(8);
        let model = ModelRef::new("panel.obj");
        let area = service.front_cutout(&model).await;
        assert!(Arc::ptr_eq(&area, &service.front_cutout(&model).await));
    }
}
