//! ECS components stored in the tile graph.
//!
//! Tiles, connectors and decorations are separate entities. They refer to
//! each other by [`Entity`] handle, so removing a tile invalidates its
//! handles instead of leaving dangling references.

use crate::catalog::TileType;
use crate::geometry::{Aabb, Pose};
use hecs::Entity;
use serde::{Deserialize, Serialize};

/// A placed tile instance.
#[derive(Debug, Clone)]
pub struct Tile {
    /// Index into the catalog's template list
    pub template: usize,
    pub tile_type: TileType,
    pub connects_to: Vec<TileType>,
    /// World pose; identity until placed
    pub pose: Pose,
    /// Local collision bounds copied from the template
    pub bounds: Aabb,
    /// Owned sockets, in template order
    pub connectors: Vec<Entity>,
    /// None only for the level root
    pub parent: Option<Entity>,
    /// Connector on the parent tile this tile hangs from
    pub parent_connector: Option<Entity>,
}

impl Tile {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// The far side of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub connector: Entity,
    pub tile: Entity,
}

/// A socket on a tile.
#[derive(Debug, Clone)]
pub struct Connector {
    pub tile: Entity,
    /// Position in the owning tile's socket list
    pub index: usize,
    pub local: Pose,
    /// World pose; kept in sync with the owning tile
    pub world: Pose,
    pub width: f32,
    pub height: f32,
    pub link: Option<Link>,
}

impl Connector {
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn peer(&self) -> Option<Entity> {
        self.link.map(|l| l.connector)
    }

    pub fn peer_tile(&self) -> Option<Entity> {
        self.link.map(|l| l.tile)
    }
}

/// World-space collision volume, attached once a tile has been placed.
#[derive(Debug, Clone, Copy)]
pub struct CollisionVolume(pub Aabb);

/// What a decoration marks on its connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecorationKind {
    Blocker,
    Door,
    Doorway,
}

/// Blocker, door or doorway parented to a connector.
#[derive(Debug, Clone)]
pub struct Decoration {
    pub kind: DecorationKind,
    /// Index into the matching decoration list
    pub template: usize,
    pub connector: Entity,
    pub pose: Pose,
    /// Footprint of the connector it covers
    pub width: f32,
    pub height: f32,
}
