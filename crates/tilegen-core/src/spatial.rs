//! Box-overlap queries against placed volumes.
//!
//! Volumes live on named layers ("Tile", "Door", ...). Queries only see
//! volumes on the requested layer. Filtering out the querying tile and its
//! parent is the caller's job, since seam contact with a parent is expected.

use crate::geometry::Aabb;
use hecs::Entity;

/// Overlap queries used during placement and connector resolution.
pub trait SpatialIndex {
    /// Register `volume` for `owner` on `layer`.
    fn insert(&mut self, owner: Entity, volume: Aabb, layer: &str);

    /// Drop every volume owned by `owner`. Returns how many were removed.
    fn remove(&mut self, owner: Entity) -> usize;

    /// Owners of all volumes on `layer` that overlap `volume`.
    fn overlap_box(&self, volume: &Aabb, layer: &str) -> Vec<Entity>;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct IndexEntry {
    owner: Entity,
    volume: Aabb,
    layer: String,
}

/// Linear-scan index. Levels hold at most a few hundred volumes, so a flat
/// list beats a tree here.
#[derive(Debug, Clone)]
pub struct LinearIndex {
    entries: Vec<IndexEntry>,
    tolerance: f32,
}

impl LinearIndex {
    pub fn new() -> Self {
        Self::with_tolerance(0.01)
    }

    /// Boxes must interpenetrate deeper than `tolerance` to count as a hit.
    pub fn with_tolerance(tolerance: f32) -> Self {
        Self {
            entries: Vec::new(),
            tolerance: tolerance.max(0.0),
        }
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Volumes registered on `layer`, in insertion order.
    pub fn volumes_on(&self, layer: &str) -> impl Iterator<Item = (Entity, &Aabb)> + '_ {
        let layer = layer.to_string();
        self.entries
            .iter()
            .filter(move |e| e.layer == layer)
            .map(|e| (e.owner, &e.volume))
    }
}

impl Default for LinearIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex for LinearIndex {
    fn insert(&mut self, owner: Entity, volume: Aabb, layer: &str) {
        self.entries.push(IndexEntry {
            owner,
            volume,
            layer: layer.to_string(),
        });
    }

    fn remove(&mut self, owner: Entity) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.owner != owner);
        before - self.entries.len()
    }

    fn overlap_box(&self, volume: &Aabb, layer: &str) -> Vec<Entity> {
        self.entries
            .iter()
            .filter(|e| e.layer == layer && e.volume.overlaps(volume, self.tolerance))
            .map(|e| e.owner)
            .collect()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
