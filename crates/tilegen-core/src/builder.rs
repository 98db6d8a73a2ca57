//! Branch building - chains tiles off a start tile with backtracking.
//!
//! Each slot of a branch gets up to `max_attempts_per_tile` placement
//! attempts. When a slot runs out of attempts the last committed tile is
//! removed and its slot is tried again from its parent, so a dead end at
//! depth N backs up to depth N-1. The branch-level failure counter bounds how
//! often that can happen.

use hecs::Entity;
use log::{debug, trace, warn};

use crate::catalog::{TileCatalog, TileType};
use crate::config::GenerationConfig;
use crate::geometry::{Aabb, Pose};
use crate::graph::TileGraph;
use crate::random::RandomSource;
use crate::selection::select_template;
use crate::spatial::SpatialIndex;

/// An ordered chain of tiles grown from `source`.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub label: String,
    /// Tile the branch was rooted from
    pub source: Entity,
    pub tiles: Vec<Entity>,
    /// Flood depth of `source` when the branch was spawned
    pub depth: u32,
    /// Tiles asked for (not counting `source`)
    pub requested: usize,
    /// Slot exhaustions hit while building
    pub failures: u32,
    /// Stopped early on the failure cap or a protected root
    pub truncated: bool,
}

impl Branch {
    pub fn new(source: Entity) -> Self {
        Self {
            label: String::new(),
            source,
            tiles: Vec::new(),
            depth: 0,
            requested: 0,
            failures: 0,
            truncated: false,
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn last(&self) -> Option<Entity> {
        self.tiles.last().copied()
    }
}

/// Places tiles into the graph one slot at a time.
pub struct BranchBuilder<'a, S: SpatialIndex + ?Sized, R: RandomSource + ?Sized> {
    catalog: &'a TileCatalog,
    config: &'a GenerationConfig,
    graph: &'a mut TileGraph,
    spatial: &'a mut S,
    rng: &'a mut R,
    /// Every tile committed by this builder, in commit order
    placed: Vec<Entity>,
}

impl<'a, S: SpatialIndex + ?Sized, R: RandomSource + ?Sized> BranchBuilder<'a, S, R> {
    pub fn new(
        catalog: &'a TileCatalog,
        config: &'a GenerationConfig,
        graph: &'a mut TileGraph,
        spatial: &'a mut S,
        rng: &'a mut R,
    ) -> Self {
        Self {
            catalog,
            config,
            graph,
            spatial,
            rng,
            placed: Vec::new(),
        }
    }

    pub fn graph(&self) -> &TileGraph {
        self.graph
    }

    pub fn config(&self) -> &GenerationConfig {
        self.config
    }

    pub fn rng(&mut self) -> &mut R {
        self.rng
    }

    /// Committed tiles, including ones later removed by backtracking.
    pub fn placed(&self) -> &[Entity] {
        &self.placed
    }

    pub fn into_placed(self) -> Vec<Entity> {
        self.placed
    }

    /// Place the first tile of a level at `pose`, drawn from the start-type
    /// pool. No connection is attempted.
    pub fn spawn_root(&mut self, pose: Pose) -> Option<Entity> {
        let start_type = self.config.start_tile_type;
        let pool = self.catalog.indices_of_types(&[start_type]);
        if pool.is_empty() {
            warn!("No {} templates in catalog; cannot place root", start_type.name());
            return None;
        }

        for attempt in 0..self.config.max_attempts_per_tile {
            let Some(index) = select_template(self.catalog, &pool, self.config.selection, self.rng)
            else {
                trace!("Root attempt {}: selection yielded nothing", attempt);
                continue;
            };
            let tile = self.graph.instantiate(index, &self.catalog.tiles[index]);
            let committed = self
                .graph
                .place(tile, pose)
                .and_then(|_| self.graph.compute_collision_volume(tile));
            match committed {
                Ok(volume) => {
                    self.commit(tile, volume);
                    debug!("Starting tile: {}", self.catalog.tiles[index].id);
                    return Some(tile);
                }
                Err(e) => {
                    warn!("Root attempt {} failed: {}", attempt, e);
                    self.discard(tile, None, attempt);
                }
            }
        }
        None
    }

    /// Grow up to `length` tiles from `start`. The last slot is forced to
    /// `ending` when given (and not `Default`). With `can_delete_root` false
    /// the branch stops instead of backtracking into `start`.
    pub fn build_branch(
        &mut self,
        length: usize,
        start: Entity,
        ending: Option<TileType>,
        can_delete_root: bool,
    ) -> Branch {
        let mut branch = Branch::new(start);
        branch.requested = length;
        let ending = ending.filter(|t| *t != TileType::Default);

        while branch.len() < length {
            let slot = branch.len();
            let from = branch.last().unwrap_or(branch.source);

            let allowed = match ending {
                Some(t) if slot + 1 == length => vec![t],
                _ => self.allowed_after(from),
            };

            if let Some(tile) = self.spawn_and_connect(from, &allowed) {
                debug!("Placement {} committed", slot);
                branch.tiles.push(tile);
                continue;
            }

            if branch.is_empty() && !can_delete_root {
                debug!("Source tile is protected; stopping at slot {}", slot);
                branch.truncated = true;
                break;
            }

            branch.failures += 1;
            if branch.failures > self.config.max_failure_count {
                debug!(
                    "Failure cap reached ({}) at slot {}; truncating branch",
                    branch.failures, slot
                );
                branch.truncated = true;
                break;
            }

            match branch.tiles.pop() {
                Some(last) => {
                    debug!("Backtracking: deleting tile at slot {}", slot - 1);
                    self.destroy_placed(last);
                }
                None => match self.respawn_root(branch.source) {
                    Some(root) => {
                        debug!("Re-rolled branch root after failure {}", branch.failures);
                        branch.source = root;
                    }
                    None => {
                        branch.truncated = true;
                        break;
                    }
                },
            }
        }
        branch
    }

    /// One slot: up to `max_attempts_per_tile` tries at attaching a tile of
    /// an allowed type to `from`. Every failed try is rolled back.
    pub fn spawn_and_connect(&mut self, from: Entity, allowed: &[TileType]) -> Option<Entity> {
        if self.graph.unconnected_connectors(from).is_empty() {
            trace!("Tile {:?} has no free connectors", from);
            return None;
        }
        let pool = self.catalog.indices_of_types(allowed);
        if pool.is_empty() {
            trace!("No templates match {:?}", allowed);
            return None;
        }

        for attempt in 0..self.config.max_attempts_per_tile {
            let Some(index) = select_template(self.catalog, &pool, self.config.selection, self.rng)
            else {
                trace!("Attempt {}: selection yielded nothing", attempt);
                continue;
            };
            let tile = self.graph.instantiate(index, &self.catalog.tiles[index]);

            let from_connector = self.graph.random_unconnected_connector(from, self.rng);
            let to_connector = self.graph.random_unconnected_connector(tile, self.rng);

            let mut linked = None;
            if let (Some(a), Some(b)) = (from_connector, to_connector) {
                if self.graph.connect(from, a, tile, b).is_ok() {
                    linked = Some(a);
                    if let Ok(volume) = self.graph.compute_collision_volume(tile) {
                        if !self.collides(tile, from, &volume) {
                            self.commit(tile, volume);
                            return Some(tile);
                        }
                    }
                }
            }

            trace!(
                "Attempt {}: failed to place {}",
                attempt,
                self.catalog.tiles[index].id
            );
            self.discard(tile, linked, attempt);
        }
        None
    }

    /// Roll back an uncommitted tile. Returns false when the graph refused.
    fn discard(&mut self, tile: Entity, linked: Option<Entity>, attempt: u32) -> bool {
        match self.graph.disconnect_and_destroy(tile, linked) {
            Ok(()) => true,
            Err(e) => {
                warn!("Rollback of attempt {} failed: {}", attempt, e);
                false
            }
        }
    }

    fn allowed_after(&self, tile: Entity) -> Vec<TileType> {
        self.graph
            .tile(tile)
            .map(|t| t.connects_to.clone())
            .unwrap_or_default()
    }

    /// Hits on the tile layer other than the tile itself and its parent.
    fn collides(&self, tile: Entity, parent: Entity, volume: &Aabb) -> bool {
        self.spatial
            .overlap_box(volume, &self.config.tile_layer)
            .into_iter()
            .any(|hit| hit != tile && hit != parent)
    }

    fn commit(&mut self, tile: Entity, volume: Aabb) {
        self.spatial.insert(tile, volume, &self.config.tile_layer);
        self.placed.push(tile);
    }

    fn destroy_placed(&mut self, tile: Entity) {
        let parent_connector = self.graph.tile(tile).ok().and_then(|t| t.parent_connector);
        self.spatial.remove(tile);
        if let Err(e) = self.graph.disconnect_and_destroy(tile, parent_connector) {
            warn!("Could not remove tile {:?}: {}", tile, e);
        }
    }

    fn respawn_root(&mut self, root: Entity) -> Option<Entity> {
        let pose = self.graph.tile(root).map(|t| t.pose).unwrap_or(Pose::IDENTITY);
        self.destroy_placed(root);
        self.spawn_root(pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;
    use crate::random::SeededRandom;
    use crate::spatial::LinearIndex;
    use crate::testing::corridor_catalog;

    fn config() -> GenerationConfig {
        GenerationConfig {
            max_attempts_per_tile: 3,
            max_failure_count: 2,
            ..Default::default()
        }
    }

    /// Park a room so its volume covers `center`, as if placed earlier.
    fn block(graph: &mut TileGraph, spatial: &mut LinearIndex, catalog: &TileCatalog, center: Vec3) {
        let room = catalog.indices_of_types(&[TileType::Room])[0];
        let tile = graph.instantiate(room, &catalog.tiles[room]);
        graph.place(tile, Pose::new(center, 0.0)).unwrap();
        let volume = graph.compute_collision_volume(tile).unwrap();
        spatial.insert(tile, volume, "Tile");
    }

    #[test]
    fn test_straight_path_with_forced_ending() {
        let catalog = corridor_catalog();
        let config = config();
        let mut graph = TileGraph::new();
        let mut spatial = LinearIndex::new();
        let mut rng = SeededRandom::from_seed(11);
        let mut builder = BranchBuilder::new(&catalog, &config, &mut graph, &mut spatial, &mut rng);

        let root = builder.spawn_root(Pose::IDENTITY).unwrap();
        let branch = builder.build_branch(2, root, Some(TileType::Room), true);

        assert_eq!(branch.len(), 2);
        assert!(!branch.truncated);
        assert_eq!(branch.source, root);
        let graph = builder.graph();
        assert_eq!(graph.tile(branch.tiles[0]).unwrap().tile_type, TileType::Hall);
        assert_eq!(graph.tile(branch.tiles[1]).unwrap().tile_type, TileType::Room);
        assert_eq!(graph.tile(branch.tiles[1]).unwrap().parent, Some(branch.tiles[0]));
    }

    #[test]
    fn test_zero_length_branch_is_empty() {
        let catalog = corridor_catalog();
        let config = config();
        let mut graph = TileGraph::new();
        let mut spatial = LinearIndex::new();
        let mut rng = SeededRandom::from_seed(1);
        let mut builder = BranchBuilder::new(&catalog, &config, &mut graph, &mut spatial, &mut rng);

        let root = builder.spawn_root(Pose::IDENTITY).unwrap();
        let branch = builder.build_branch(0, root, Some(TileType::Room), true);
        assert!(branch.is_empty());
        assert!(!branch.truncated);
    }

    #[test]
    fn test_protected_root_stops_branch() {
        let catalog = corridor_catalog();
        let config = config();
        let mut graph = TileGraph::new();
        let mut spatial = LinearIndex::new();
        block(&mut graph, &mut spatial, &catalog, Vec3::new(0.0, 0.0, 12.0));
        let mut rng = SeededRandom::from_seed(5);
        let mut builder = BranchBuilder::new(&catalog, &config, &mut graph, &mut spatial, &mut rng);

        let root = builder.spawn_root(Pose::IDENTITY).unwrap();
        let branch = builder.build_branch(4, root, None, false);

        assert!(branch.is_empty());
        assert!(branch.truncated);
        assert_eq!(branch.source, root);
        assert!(builder.graph().contains(root));
        assert_eq!(builder.graph().tile_count(), 2);
    }

    #[test]
    fn test_deletable_root_is_rerolled() {
        let catalog = corridor_catalog();
        let config = config();
        let mut graph = TileGraph::new();
        let mut spatial = LinearIndex::new();
        block(&mut graph, &mut spatial, &catalog, Vec3::new(0.0, 0.0, 12.0));
        let mut rng = SeededRandom::from_seed(5);
        let mut builder = BranchBuilder::new(&catalog, &config, &mut graph, &mut spatial, &mut rng);

        let root = builder.spawn_root(Pose::IDENTITY).unwrap();
        let branch = builder.build_branch(4, root, None, true);

        assert!(branch.truncated);
        assert_eq!(branch.failures, config.max_failure_count + 1);
        assert_ne!(branch.source, root);
        assert!(!builder.graph().contains(root));
        assert!(builder.graph().contains(branch.source));
        // obstacle + the surviving root
        assert_eq!(builder.graph().tile_count(), 2);
    }

    #[test]
    fn test_dead_end_backtracks_then_truncates() {
        let catalog = corridor_catalog();
        let config = config();
        let mut graph = TileGraph::new();
        let mut spatial = LinearIndex::new();
        // cap reaches z=4, the first hall z=4..20; anything beyond is blocked
        block(&mut graph, &mut spatial, &catalog, Vec3::new(0.0, 0.0, 28.0));
        let mut rng = SeededRandom::from_seed(9);
        let mut builder = BranchBuilder::new(&catalog, &config, &mut graph, &mut spatial, &mut rng);

        let root = builder.spawn_root(Pose::IDENTITY).unwrap();
        let branch = builder.build_branch(3, root, None, false);

        assert!(branch.truncated);
        assert_eq!(branch.len(), 1);
        assert_eq!(branch.failures, config.max_failure_count + 1);
        // one hall survives; every backtracked hall was removed
        assert_eq!(builder.graph().tile_count(), 3);
        assert!(builder.placed().len() > branch.len() + 1);
        let hall = builder.graph().tile(branch.tiles[0]).unwrap();
        assert_eq!(hall.parent, Some(root));
    }

    #[test]
    fn test_start_without_free_sockets_fails_immediately() {
        let catalog = corridor_catalog();
        let config = config();
        let mut graph = TileGraph::new();
        let mut spatial = LinearIndex::new();
        let mut rng = SeededRandom::from_seed(2);
        let mut builder = BranchBuilder::new(&catalog, &config, &mut graph, &mut spatial, &mut rng);

        let root = builder.spawn_root(Pose::IDENTITY).unwrap();
        let first = builder.build_branch(1, root, None, false);
        assert_eq!(first.len(), 1);

        // the cap's only socket is now taken
        let second = builder.build_branch(3, root, None, false);
        assert!(second.is_empty());
        assert!(second.truncated);
        assert_eq!(second.failures, 0);
    }

    #[test]
    fn test_missing_start_type_has_no_root() {
        let catalog = corridor_catalog();
        let config = GenerationConfig {
            start_tile_type: TileType::Default,
            ..config()
        };
        let mut graph = TileGraph::new();
        let mut spatial = LinearIndex::new();
        let mut rng = SeededRandom::from_seed(2);
        let mut builder = BranchBuilder::new(&catalog, &config, &mut graph, &mut spatial, &mut rng);

        assert!(builder.spawn_root(Pose::IDENTITY).is_none());
        assert!(builder.graph().is_empty());
    }

    #[test]
    fn test_discard_reports_refused_rollback() {
        let catalog = corridor_catalog();
        let config = config();
        let mut graph = TileGraph::new();
        let hall = catalog.indices_of_types(&[TileType::Hall])[0];
        let tile = graph.instantiate(hall, &catalog.tiles[hall]);
        let mut spatial = LinearIndex::new();
        let mut rng = SeededRandom::from_seed(1);
        let mut builder = BranchBuilder::new(&catalog, &config, &mut graph, &mut spatial, &mut rng);

        assert!(builder.discard(tile, None, 0));
        assert!(builder.graph().is_empty());
        // A second rollback of the same tile is refused, not silently dropped.
        assert!(!builder.discard(tile, None, 1));
    }
}
