//! Small catalogs shared by unit tests.

use crate::catalog::{
    DecorationCatalog, DecorationTemplate, SocketLayout, TileCatalog, TileTemplate, TileType,
};
use crate::geometry::{Aabb, Vec3};

/// 8x8 cap with one socket facing +Z.
pub fn cap() -> TileTemplate {
    TileTemplate::new(
        "cap",
        TileType::Cap,
        Aabb::new(Vec3::new(-4.0, 0.0, -4.0), Vec3::new(4.0, 4.0, 4.0)),
    )
    .connecting_to(&[TileType::Hall])
    .with_socket(SocketLayout::new(Vec3::new(0.0, 0.0, 4.0), 0.0))
}

/// 8x16 straight hall, sockets at both ends.
pub fn hall() -> TileTemplate {
    TileTemplate::new(
        "hall",
        TileType::Hall,
        Aabb::new(Vec3::new(-4.0, 0.0, -8.0), Vec3::new(4.0, 4.0, 8.0)),
    )
    .connecting_to(&[TileType::Hall, TileType::Room])
    .with_socket(SocketLayout::new(Vec3::new(0.0, 0.0, 8.0), 0.0))
    .with_socket(SocketLayout::new(Vec3::new(0.0, 0.0, -8.0), 180.0))
}

/// 16x16 room with a socket on every side.
pub fn room() -> TileTemplate {
    TileTemplate::new(
        "room",
        TileType::Room,
        Aabb::new(Vec3::new(-8.0, 0.0, -8.0), Vec3::new(8.0, 4.0, 8.0)),
    )
    .connecting_to(&[TileType::Hall])
    .with_socket(SocketLayout::new(Vec3::new(0.0, 0.0, 8.0), 0.0))
    .with_socket(SocketLayout::new(Vec3::new(8.0, 0.0, 0.0), 90.0))
    .with_socket(SocketLayout::new(Vec3::new(0.0, 0.0, -8.0), 180.0))
    .with_socket(SocketLayout::new(Vec3::new(-8.0, 0.0, 0.0), 270.0))
}

pub fn decorations() -> DecorationCatalog {
    DecorationCatalog {
        blockers: vec![DecorationTemplate::new("wall")],
        doors: vec![DecorationTemplate::new("door")],
        doorways: vec![DecorationTemplate::new("arch").with_offset(Vec3::new(0.0, 0.0, 0.1), 0.0)],
    }
}

/// Cap -> Hall, Hall -> Hall/Room, Room -> Hall.
pub fn corridor_catalog() -> TileCatalog {
    TileCatalog::new(vec![cap(), hall(), room()]).with_decorations(decorations())
}
