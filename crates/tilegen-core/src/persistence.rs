//! Level snapshots and save/load.
//!
//! A [`LevelSnapshot`] is a handle-free copy of a generated level: tiles are
//! numbered in branch order and every reference becomes an index. Snapshots
//! compare equal for identical builds, and are written with bincode behind a
//! version number.

use hecs::Entity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};

use crate::builder::Branch;
use crate::catalog::{TileCatalog, TileType};
use crate::components::{Decoration, DecorationKind};
use crate::error::SnapshotError;
use crate::geometry::Pose;
use crate::graph::TileGraph;

/// Version number for snapshot format (increment when format changes)
const SNAPSHOT_VERSION: u32 = 1;

/// The far end of a connection, by tile and socket index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketRef {
    pub tile: usize,
    pub socket: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorRecord {
    pub pose: Pose,
    pub link: Option<SocketRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    /// Template id from the catalog
    pub template: String,
    pub tile_type: TileType,
    pub pose: Pose,
    pub parent: Option<usize>,
    pub branch: usize,
    pub connectors: Vec<ConnectorRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecorationRecord {
    pub kind: DecorationKind,
    pub prefab: String,
    pub socket: SocketRef,
    pub pose: Pose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRecord {
    pub label: String,
    pub source: Option<usize>,
    pub tiles: Vec<usize>,
    pub depth: u32,
    pub truncated: bool,
}

/// Serializable copy of a generated level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub tiles: Vec<TileRecord>,
    pub decorations: Vec<DecorationRecord>,
    pub branches: Vec<BranchRecord>,
}

impl LevelSnapshot {
    pub fn capture(catalog: &TileCatalog, graph: &TileGraph, branches: &[Branch]) -> Self {
        let mut order: Vec<(Entity, usize)> = Vec::new();
        for (b, branch) in branches.iter().enumerate() {
            for &tile in &branch.tiles {
                if graph.contains(tile) {
                    order.push((tile, b));
                }
            }
        }
        let index: HashMap<Entity, usize> =
            order.iter().enumerate().map(|(i, (e, _))| (*e, i)).collect();

        let mut sockets: HashMap<Entity, SocketRef> = HashMap::new();
        for (i, (tile, _)) in order.iter().enumerate() {
            for (s, c) in graph.connectors_of(*tile).into_iter().enumerate() {
                sockets.insert(c, SocketRef { tile: i, socket: s });
            }
        }

        let mut tiles = Vec::with_capacity(order.len());
        for (tile, branch) in &order {
            let Ok(t) = graph.tile(*tile) else { continue };
            let connectors = t
                .connectors
                .iter()
                .filter_map(|c| graph.connector(*c).ok())
                .map(|c| ConnectorRecord {
                    pose: c.world,
                    link: c.peer().and_then(|p| sockets.get(&p).copied()),
                })
                .collect();
            tiles.push(TileRecord {
                template: catalog
                    .get(t.template)
                    .map(|tpl| tpl.id.clone())
                    .unwrap_or_default(),
                tile_type: t.tile_type,
                pose: t.pose,
                parent: t.parent.and_then(|p| index.get(&p).copied()),
                branch: *branch,
                connectors,
            });
        }

        let mut decorations: Vec<DecorationRecord> = graph
            .world()
            .query::<&Decoration>()
            .iter()
            .filter_map(|(_, d)| {
                let socket = *sockets.get(&d.connector)?;
                Some(DecorationRecord {
                    kind: d.kind,
                    prefab: prefab_name(catalog, d),
                    socket,
                    pose: d.pose,
                })
            })
            .collect();
        decorations.sort_by_key(|d| (d.socket.tile, d.socket.socket));

        let branches = branches
            .iter()
            .map(|b| BranchRecord {
                label: b.label.clone(),
                source: index.get(&b.source).copied(),
                tiles: b.tiles.iter().filter_map(|t| index.get(t).copied()).collect(),
                depth: b.depth,
                truncated: b.truncated,
            })
            .collect();

        Self {
            tiles,
            decorations,
            branches,
        }
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}

fn prefab_name(catalog: &TileCatalog, decoration: &Decoration) -> String {
    let list = match decoration.kind {
        DecorationKind::Blocker => &catalog.decorations.blockers,
        DecorationKind::Door => &catalog.decorations.doors,
        DecorationKind::Doorway => &catalog.decorations.doorways,
    };
    list.get(decoration.template)
        .map(|t| t.prefab.clone())
        .unwrap_or_default()
}

/// On-disk wrapper
#[derive(Serialize, Deserialize)]
struct SaveData {
    version: u32,
    snapshot: LevelSnapshot,
}

/// Save a snapshot to a writer
pub fn save_level<W: Write>(writer: W, snapshot: &LevelSnapshot) -> Result<(), SnapshotError> {
    let save_data = SaveData {
        version: SNAPSHOT_VERSION,
        snapshot: snapshot.clone(),
    };
    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Load a snapshot from a reader
pub fn load_snapshot<R: Read>(reader: R) -> Result<LevelSnapshot, SnapshotError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::VersionMismatch {
            expected: SNAPSHOT_VERSION,
            found: save_data.version,
        });
    }
    Ok(save_data.snapshot)
}
