//! Tile and decoration catalogs.
//!
//! A [`TileCatalog`] is the immutable input to generation: an ordered list of
//! [`TileTemplate`]s plus the blocker/door/doorway decoration lists. Catalog
//! order matters, both for the legacy cumulative selection scan and for
//! deterministic replay.

use crate::geometry::{Aabb, Pose, Vec3};
use serde::{Deserialize, Serialize};

/// Kind of tile a template produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileType {
    /// Used as "no type" when forcing an ending tile
    #[default]
    Default,
    Cap,
    Hall,
    Room,
}

impl TileType {
    pub const ALL: [TileType; 4] = [
        TileType::Default,
        TileType::Cap,
        TileType::Hall,
        TileType::Room,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TileType::Default => "Default",
            TileType::Cap => "Cap",
            TileType::Hall => "Hall",
            TileType::Room => "Room",
        }
    }
}

fn default_weight() -> f32 {
    1.0
}

fn default_connects_to() -> Vec<TileType> {
    TileType::ALL.to_vec()
}

fn default_socket_width() -> f32 {
    8.0
}

fn default_socket_height() -> f32 {
    8.0
}

/// One attachment point in a template's local space.
///
/// The pose faces outwards: a tile attached here is placed in front of the
/// socket, along `pose.forward()`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocketLayout {
    pub pose: Pose,
    #[serde(default = "default_socket_width")]
    pub width: f32,
    #[serde(default = "default_socket_height")]
    pub height: f32,
}

impl SocketLayout {
    pub fn new(position: Vec3, yaw: f32) -> Self {
        Self {
            pose: Pose::new(position, yaw),
            width: default_socket_width(),
            height: default_socket_height(),
        }
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Catalog entry describing a placeable tile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TileTemplate {
    /// Reference name, carried into snapshots
    pub id: String,
    pub tile_type: TileType,
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Types that may be attached after this tile
    #[serde(default = "default_connects_to")]
    pub connects_to: Vec<TileType>,
    /// Local-space collision bounds
    pub bounds: Aabb,
    #[serde(default)]
    pub sockets: Vec<SocketLayout>,
}

impl TileTemplate {
    pub fn new(id: impl Into<String>, tile_type: TileType, bounds: Aabb) -> Self {
        Self {
            id: id.into(),
            tile_type,
            weight: default_weight(),
            connects_to: default_connects_to(),
            bounds,
            sockets: Vec::new(),
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight.max(0.0);
        self
    }

    pub fn connecting_to(mut self, types: &[TileType]) -> Self {
        self.connects_to = types.to_vec();
        self
    }

    pub fn with_socket(mut self, socket: SocketLayout) -> Self {
        self.sockets.push(socket);
        self
    }

    pub fn can_connect_to(&self, tile_type: TileType) -> bool {
        self.connects_to.contains(&tile_type)
    }
}

/// A blocker, door or doorway prefab with its offset from the socket.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DecorationTemplate {
    pub prefab: String,
    #[serde(default)]
    pub local_position_offset: Vec3,
    #[serde(default)]
    pub local_yaw_offset: f32,
}

impl DecorationTemplate {
    pub fn new(prefab: impl Into<String>) -> Self {
        Self {
            prefab: prefab.into(),
            ..Default::default()
        }
    }

    pub fn with_offset(mut self, position: Vec3, yaw: f32) -> Self {
        self.local_position_offset = position;
        self.local_yaw_offset = yaw;
        self
    }

    /// Offset as a pose local to the socket.
    pub fn local_pose(&self) -> Pose {
        Pose::new(self.local_position_offset, self.local_yaw_offset)
    }
}

/// The three decoration lists used when resolving sockets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DecorationCatalog {
    #[serde(default)]
    pub blockers: Vec<DecorationTemplate>,
    #[serde(default)]
    pub doors: Vec<DecorationTemplate>,
    #[serde(default)]
    pub doorways: Vec<DecorationTemplate>,
}

/// Immutable set of tile templates and decorations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TileCatalog {
    pub tiles: Vec<TileTemplate>,
    #[serde(default)]
    pub decorations: DecorationCatalog,
}

impl TileCatalog {
    pub fn new(tiles: Vec<TileTemplate>) -> Self {
        Self {
            tiles,
            decorations: DecorationCatalog::default(),
        }
    }

    pub fn with_decorations(mut self, decorations: DecorationCatalog) -> Self {
        self.decorations = decorations;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn get(&self, index: usize) -> Option<&TileTemplate> {
        self.tiles.get(index)
    }

    /// Indices of templates whose type is in `types`, in catalog order.
    pub fn indices_of_types(&self, types: &[TileType]) -> Vec<usize> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| types.contains(&t.tile_type))
            .map(|(i, _)| i)
            .collect()
    }
}
