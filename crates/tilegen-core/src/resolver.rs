//! Socket decoration.
//!
//! After all branches are built every socket gets resolved once: free
//! sockets are capped with a blocker, connected ones may get a door or a
//! doorway. A door-layer volume is registered for each door so the peer
//! socket of the same connection is left alone.

use hecs::Entity;
use log::{debug, warn};

use crate::builder::Branch;
use crate::catalog::{DecorationCatalog, DecorationTemplate};
use crate::components::{Connector, Decoration, DecorationKind};
use crate::config::GenerationConfig;
use crate::geometry::{Aabb, Vec3};
use crate::graph::TileGraph;
use crate::random::RandomSource;
use crate::spatial::SpatialIndex;

/// Counts from one resolver pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub blockers: usize,
    pub doors: usize,
    pub doorways: usize,
    /// Connected sockets whose door slot was already taken
    pub skipped: usize,
    /// Connected sockets left bare by the doorway roll
    pub open: usize,
    /// Every decoration entity spawned, in spawn order
    pub spawned: Vec<Entity>,
}

impl ResolveStats {
    pub fn decorations(&self) -> usize {
        self.blockers + self.doors + self.doorways
    }
}

/// Footprint box probed on the door layer for a connector.
pub fn door_check_box(connector: &Connector) -> Aabb {
    let half = connector.width * 0.5;
    Aabb::from_center(
        connector.world.position + Vec3::new(0.0, 0.5, 0.0),
        Vec3::new(half, 1.0, half),
    )
}

pub struct ConnectorResolver<'a, S: SpatialIndex + ?Sized, R: RandomSource + ?Sized> {
    decorations: &'a DecorationCatalog,
    config: &'a GenerationConfig,
    graph: &'a mut TileGraph,
    spatial: &'a mut S,
    rng: &'a mut R,
}

impl<'a, S: SpatialIndex + ?Sized, R: RandomSource + ?Sized> ConnectorResolver<'a, S, R> {
    pub fn new(
        decorations: &'a DecorationCatalog,
        config: &'a GenerationConfig,
        graph: &'a mut TileGraph,
        spatial: &'a mut S,
        rng: &'a mut R,
    ) -> Self {
        Self {
            decorations,
            config,
            graph,
            spatial,
            rng,
        }
    }

    /// Resolve every socket of every tile in `branches`, in branch, tile and
    /// socket order.
    pub fn resolve(&mut self, branches: &[Branch]) -> ResolveStats {
        let mut stats = ResolveStats::default();
        if self.decorations.blockers.is_empty() {
            warn!("No connector blockers configured; skipping connector resolution");
            return stats;
        }

        for branch in branches {
            for &tile in &branch.tiles {
                let connectors = self.graph.connectors_of(tile);
                for connector in connectors {
                    let Ok(conn) = self.graph.connector(connector).map(|c| (*c).clone()) else {
                        continue;
                    };
                    if conn.is_connected() {
                        self.resolve_connected(connector, &conn, &mut stats);
                    } else {
                        let index = self.rng.pick(self.decorations.blockers.len());
                        let entity = self.spawn(DecorationKind::Blocker, index, connector, &conn);
                        stats.blockers += 1;
                        stats.spawned.push(entity);
                    }
                }
            }
        }

        debug!(
            "Resolved connectors: {} blockers, {} doors, {} doorways, {} skipped",
            stats.blockers, stats.doors, stats.doorways, stats.skipped
        );
        stats
    }

    fn resolve_connected(&mut self, connector: Entity, conn: &Connector, stats: &mut ResolveStats) {
        let probe = door_check_box(conn);
        if !self.spatial.overlap_box(&probe, &self.config.door_layer).is_empty() {
            stats.skipped += 1;
            return;
        }

        let has_doors = !self.decorations.doors.is_empty();
        let has_doorways = !self.decorations.doorways.is_empty();
        if self.config.doorway_chance <= 0.0 || (!has_doors && !has_doorways) {
            stats.open += 1;
            return;
        }
        if self.rng.value() >= self.config.doorway_chance {
            stats.open += 1;
            return;
        }

        let kind = if has_doorways {
            if self.rng.value() < self.config.doorway_having_door_chance && has_doors {
                DecorationKind::Door
            } else {
                DecorationKind::Doorway
            }
        } else {
            DecorationKind::Door
        };
        let index = match kind {
            DecorationKind::Door => self.rng.pick(self.decorations.doors.len()),
            _ => self.rng.pick(self.decorations.doorways.len()),
        };

        let entity = self.spawn(kind, index, connector, conn);
        self.spatial.insert(entity, probe, &self.config.door_layer);
        match kind {
            DecorationKind::Door => stats.doors += 1,
            _ => stats.doorways += 1,
        }
        stats.spawned.push(entity);
    }

    fn template(&self, kind: DecorationKind, index: usize) -> Option<&DecorationTemplate> {
        match kind {
            DecorationKind::Blocker => self.decorations.blockers.get(index),
            DecorationKind::Door => self.decorations.doors.get(index),
            DecorationKind::Doorway => self.decorations.doorways.get(index),
        }
    }

    fn spawn(&mut self, kind: DecorationKind, index: usize, connector: Entity, conn: &Connector) -> Entity {
        let pose = match self.template(kind, index) {
            Some(t) => conn.world.compose(&t.local_pose()),
            None => conn.world,
        };
        self.graph.spawn_decoration(Decoration {
            kind,
            template: index,
            connector,
            pose,
            width: conn.width,
            height: conn.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BranchBuilder;
    use crate::catalog::TileType;
    use crate::geometry::Pose;
    use crate::random::{ScriptedRandom, SeededRandom};
    use crate::spatial::LinearIndex;
    use crate::testing::corridor_catalog;

    /// Cap -> hall -> room, built with the given config.
    fn corridor(config: &GenerationConfig, graph: &mut TileGraph, spatial: &mut LinearIndex) -> Vec<Branch> {
        let catalog = corridor_catalog();
        let mut rng = SeededRandom::from_seed(4);
        let mut builder = BranchBuilder::new(&catalog, config, graph, spatial, &mut rng);
        let root = builder.spawn_root(Pose::IDENTITY).unwrap();
        let mut main = builder.build_branch(2, root, Some(TileType::Room), true);
        main.tiles.insert(0, root);
        vec![main]
    }

    #[test]
    fn test_free_sockets_get_blockers() {
        let config = GenerationConfig {
            doorway_chance: 0.0,
            ..Default::default()
        };
        let mut graph = TileGraph::new();
        let mut spatial = LinearIndex::new();
        let branches = corridor(&config, &mut graph, &mut spatial);
        let decorations = corridor_catalog().decorations;
        let mut rng = SeededRandom::from_seed(1);

        let stats = ConnectorResolver::new(&decorations, &config, &mut graph, &mut spatial, &mut rng)
            .resolve(&branches);

        // the room has three free sides
        assert_eq!(stats.blockers, 3);
        assert_eq!(stats.doors + stats.doorways, 0);
        assert_eq!(stats.open, 4);
        assert_eq!(graph.decoration_count(), 3);
        for e in &stats.spawned {
            let deco = graph.decoration(*e).unwrap();
            assert_eq!(deco.kind, DecorationKind::Blocker);
            assert!(!graph.connector(deco.connector).unwrap().is_connected());
            assert_eq!(deco.width, 8.0);
        }
    }

    #[test]
    fn test_one_door_per_connection() {
        let config = GenerationConfig {
            doorway_chance: 1.0,
            doorway_having_door_chance: 1.0,
            ..Default::default()
        };
        let mut graph = TileGraph::new();
        let mut spatial = LinearIndex::new();
        let branches = corridor(&config, &mut graph, &mut spatial);
        let decorations = corridor_catalog().decorations;
        let mut rng = ScriptedRandom::constant(0.0);

        let stats = ConnectorResolver::new(&decorations, &config, &mut graph, &mut spatial, &mut rng)
            .resolve(&branches);

        // two connections, each seen from both sides
        assert_eq!(stats.doors, 2);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.blockers, 3);
        assert_eq!(spatial.volumes_on("Door").count(), 2);
    }

    #[test]
    fn test_doorway_offset_applied() {
        let config = GenerationConfig {
            doorway_chance: 1.0,
            doorway_having_door_chance: 0.0,
            ..Default::default()
        };
        let mut graph = TileGraph::new();
        let mut spatial = LinearIndex::new();
        let branches = corridor(&config, &mut graph, &mut spatial);
        let decorations = corridor_catalog().decorations;
        let mut rng = ScriptedRandom::constant(0.5);

        let stats = ConnectorResolver::new(&decorations, &config, &mut graph, &mut spatial, &mut rng)
            .resolve(&branches);

        assert_eq!(stats.doorways, 2);
        for e in &stats.spawned {
            let deco = graph.decoration(*e).unwrap();
            if deco.kind == DecorationKind::Doorway {
                let socket = graph.connector(deco.connector).unwrap().world;
                let expected = socket.transform_point(Vec3::new(0.0, 0.0, 0.1));
                assert!(deco.pose.position.distance(&expected) < 1e-4);
            }
        }
    }

    #[test]
    fn test_door_falls_back_to_doorway() {
        let config = GenerationConfig {
            doorway_chance: 1.0,
            doorway_having_door_chance: 1.0,
            ..Default::default()
        };
        let mut graph = TileGraph::new();
        let mut spatial = LinearIndex::new();
        let branches = corridor(&config, &mut graph, &mut spatial);
        let mut decorations = corridor_catalog().decorations;
        decorations.doors.clear();
        let mut rng = SeededRandom::from_seed(6);

        let stats = ConnectorResolver::new(&decorations, &config, &mut graph, &mut spatial, &mut rng)
            .resolve(&branches);
        assert_eq!(stats.doors, 0);
        assert_eq!(stats.doorways, 2);
    }

    #[test]
    fn test_door_used_when_no_doorways() {
        let config = GenerationConfig {
            doorway_chance: 1.0,
            doorway_having_door_chance: 0.0,
            ..Default::default()
        };
        let mut graph = TileGraph::new();
        let mut spatial = LinearIndex::new();
        let branches = corridor(&config, &mut graph, &mut spatial);
        let mut decorations = corridor_catalog().decorations;
        decorations.doorways.clear();
        let mut rng = SeededRandom::from_seed(6);

        let stats = ConnectorResolver::new(&decorations, &config, &mut graph, &mut spatial, &mut rng)
            .resolve(&branches);
        assert_eq!(stats.doors, 2);
        assert_eq!(stats.doorways, 0);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.open, 0);
    }

    #[test]
    fn test_no_door_templates_leaves_connections_open() {
        let config = GenerationConfig {
            doorway_chance: 1.0,
            doorway_having_door_chance: 1.0,
            ..Default::default()
        };
        let mut graph = TileGraph::new();
        let mut spatial = LinearIndex::new();
        let branches = corridor(&config, &mut graph, &mut spatial);
        let mut decorations = corridor_catalog().decorations;
        decorations.doors.clear();
        decorations.doorways.clear();
        let mut rng = SeededRandom::from_seed(6);

        let stats = ConnectorResolver::new(&decorations, &config, &mut graph, &mut spatial, &mut rng)
            .resolve(&branches);
        assert_eq!(stats.doors + stats.doorways, 0);
        assert_eq!(stats.open, 4);
        assert_eq!(stats.blockers, 3);
        assert_eq!(spatial.volumes_on("Door").count(), 0);
    }

    #[test]
    fn test_missing_blockers_skip_pass() {
        let config = GenerationConfig::default();
        let mut graph = TileGraph::new();
        let mut spatial = LinearIndex::new();
        let branches = corridor(&config, &mut graph, &mut spatial);
        let mut decorations = corridor_catalog().decorations;
        decorations.blockers.clear();
        let mut rng = ScriptedRandom::constant(0.0);

        let stats = ConnectorResolver::new(&decorations, &config, &mut graph, &mut spatial, &mut rng)
            .resolve(&branches);
        assert_eq!(stats, ResolveStats::default());
        assert_eq!(rng.draws(), 0);
        assert_eq!(graph.decoration_count(), 0);
    }
}
