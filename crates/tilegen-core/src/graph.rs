//! Tile graph - the arena owning every placed tile, connector and decoration.
//!
//! Connectivity lives on the connectors: a connected connector holds a
//! [`Link`] to its peer, and the peer holds the mirror link. Tile parent
//! references are set when a child is connected and cleared on rollback.

use hecs::{Entity, Ref, World};

use crate::catalog::TileTemplate;
use crate::components::{CollisionVolume, Connector, Decoration, Link, Tile};
use crate::error::GraphError;
use crate::geometry::{Aabb, Pose};
use crate::random::RandomSource;

/// Arena of placed tiles addressed by stable entity handles.
pub struct TileGraph {
    world: World,
}

impl TileGraph {
    pub fn new() -> Self {
        Self {
            world: World::new(),
        }
    }

    /// Read-only access for queries and exporters.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    pub fn is_empty(&self) -> bool {
        self.world.len() == 0
    }

    pub fn tile(&self, tile: Entity) -> Result<Ref<'_, Tile>, GraphError> {
        self.world
            .get::<&Tile>(tile)
            .map_err(|_| GraphError::NoSuchTile(tile))
    }

    pub fn connector(&self, connector: Entity) -> Result<Ref<'_, Connector>, GraphError> {
        self.world
            .get::<&Connector>(connector)
            .map_err(|_| GraphError::NoSuchConnector(connector))
    }

    pub fn decoration(&self, decoration: Entity) -> Option<Decoration> {
        self.world
            .get::<&Decoration>(decoration)
            .ok()
            .map(|d| (*d).clone())
    }

    /// Connector handles of `tile` in socket order (empty if the tile is gone).
    pub fn connectors_of(&self, tile: Entity) -> Vec<Entity> {
        self.tile(tile)
            .map(|t| t.connectors.clone())
            .unwrap_or_default()
    }

    pub fn unconnected_connectors(&self, tile: Entity) -> Vec<Entity> {
        self.connectors_of(tile)
            .into_iter()
            .filter(|c| {
                self.world
                    .get::<&Connector>(*c)
                    .map(|conn| !conn.is_connected())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Uniform pick among the tile's free sockets. No draw is taken when the
    /// tile has none.
    pub fn random_unconnected_connector<R: RandomSource + ?Sized>(
        &self,
        tile: Entity,
        rng: &mut R,
    ) -> Option<Entity> {
        let free = self.unconnected_connectors(tile);
        if free.is_empty() {
            return None;
        }
        Some(free[rng.pick(free.len())])
    }

    pub fn collision_volume(&self, tile: Entity) -> Option<Aabb> {
        self.world.get::<&CollisionVolume>(tile).ok().map(|v| v.0)
    }

    pub fn tile_count(&self) -> usize {
        self.world.query::<&Tile>().iter().count()
    }

    pub fn connector_count(&self) -> usize {
        self.world.query::<&Connector>().iter().count()
    }

    pub fn decoration_count(&self) -> usize {
        self.world.query::<&Decoration>().iter().count()
    }

    /// Spawn an unplaced tile plus one connector per template socket.
    pub fn instantiate(&mut self, template_index: usize, template: &TileTemplate) -> Entity {
        let tile = self.world.spawn((Tile {
            template: template_index,
            tile_type: template.tile_type,
            connects_to: template.connects_to.clone(),
            pose: Pose::IDENTITY,
            bounds: template.bounds,
            connectors: Vec::new(),
            parent: None,
            parent_connector: None,
        },));

        let connectors: Vec<Entity> = template
            .sockets
            .iter()
            .enumerate()
            .map(|(index, socket)| {
                self.world.spawn((Connector {
                    tile,
                    index,
                    local: socket.pose,
                    world: socket.pose,
                    width: socket.width,
                    height: socket.height,
                    link: None,
                },))
            })
            .collect();

        if let Ok(mut t) = self.world.get::<&mut Tile>(tile) {
            t.connectors = connectors;
        }
        tile
    }

    /// Move a tile and carry its connectors along.
    pub fn place(&mut self, tile: Entity, pose: Pose) -> Result<(), GraphError> {
        let connectors = {
            let mut t = self
                .world
                .get::<&mut Tile>(tile)
                .map_err(|_| GraphError::NoSuchTile(tile))?;
            t.pose = pose;
            t.connectors.clone()
        };
        for c in connectors {
            if let Ok(mut conn) = self.world.get::<&mut Connector>(c) {
                conn.world = pose.compose(&conn.local);
            }
        }
        Ok(())
    }

    /// Link `connector_b` on `tile_b` to `connector_a` on `tile_a`, make
    /// `tile_a` the parent of `tile_b`, and move `tile_b` so the two sockets
    /// face each other. Nothing changes if the link is rejected.
    pub fn connect(
        &mut self,
        tile_a: Entity,
        connector_a: Entity,
        tile_b: Entity,
        connector_b: Entity,
    ) -> Result<(), GraphError> {
        let target = self.check_free(tile_a, connector_a)?.world.turned_around();
        let local_b = self.check_free(tile_b, connector_b)?.local;
        if tile_a == tile_b {
            return Err(GraphError::ForeignConnector {
                tile: tile_b,
                connector: connector_a,
            });
        }

        if let Ok(mut a) = self.world.get::<&mut Connector>(connector_a) {
            a.link = Some(Link {
                connector: connector_b,
                tile: tile_b,
            });
        }
        if let Ok(mut b) = self.world.get::<&mut Connector>(connector_b) {
            b.link = Some(Link {
                connector: connector_a,
                tile: tile_a,
            });
        }
        if let Ok(mut t) = self.world.get::<&mut Tile>(tile_b) {
            t.parent = Some(tile_a);
            t.parent_connector = Some(connector_a);
        }

        self.place(tile_b, Pose::align_child(&local_b, &target))
    }

    fn check_free(&self, tile: Entity, connector: Entity) -> Result<Connector, GraphError> {
        if self.world.get::<&Tile>(tile).is_err() {
            return Err(GraphError::NoSuchTile(tile));
        }
        let conn = self.connector(connector)?;
        if conn.tile != tile {
            return Err(GraphError::ForeignConnector { tile, connector });
        }
        if conn.is_connected() {
            return Err(GraphError::ConnectorBusy(connector));
        }
        Ok((*conn).clone())
    }

    /// Store the tile's world-space volume and return it.
    pub fn compute_collision_volume(&mut self, tile: Entity) -> Result<Aabb, GraphError> {
        let volume = {
            let t = self.tile(tile)?;
            t.bounds.transformed(&t.pose)
        };
        self.world
            .insert_one(tile, CollisionVolume(volume))
            .map_err(|_| GraphError::NoSuchTile(tile))?;
        Ok(volume)
    }

    /// Rollback primitive: unlink `tile` from `connector_on_parent` (and from
    /// anything else still linked to it) and despawn the tile, its connectors
    /// and their decorations.
    pub fn disconnect_and_destroy(
        &mut self,
        tile: Entity,
        connector_on_parent: Option<Entity>,
    ) -> Result<(), GraphError> {
        if let Some(c) = connector_on_parent {
            if let Ok(mut conn) = self.world.get::<&mut Connector>(c) {
                conn.link = None;
            }
        }

        let connectors = self.tile(tile)?.connectors.clone();

        let mut links = Vec::new();
        for c in &connectors {
            if let Ok(conn) = self.world.get::<&Connector>(*c) {
                if let Some(link) = conn.link {
                    links.push(link);
                }
            }
        }
        for link in links {
            if let Ok(mut peer) = self.world.get::<&mut Connector>(link.connector) {
                if peer.peer_tile() == Some(tile) {
                    peer.link = None;
                }
            }
            if let Ok(mut other) = self.world.get::<&mut Tile>(link.tile) {
                if other.parent == Some(tile) {
                    other.parent = None;
                    other.parent_connector = None;
                }
            }
        }

        let decorations: Vec<Entity> = self
            .world
            .query::<&Decoration>()
            .iter()
            .filter(|(_, d)| connectors.contains(&d.connector))
            .map(|(e, _)| e)
            .collect();
        for e in decorations.into_iter().chain(connectors) {
            let _ = self.world.despawn(e);
        }
        self.world
            .despawn(tile)
            .map_err(|_| GraphError::NoSuchTile(tile))
    }

    pub fn spawn_decoration(&mut self, decoration: Decoration) -> Entity {
        self.world.spawn((decoration,))
    }

    /// Despawn everything.
    pub fn clear(&mut self) {
        self.world.clear();
    }
}

impl Default for TileGraph {
    fn default() -> Self {
        Self::new()
    }
}
