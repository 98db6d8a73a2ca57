//! Error types for generation, graph mutation and snapshots.

use crate::catalog::TileType;
use crate::config::ConfigError;
use hecs::Entity;
use thiserror::Error;

/// Errors that stop a level build before it starts.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("tile catalog is empty")]
    EmptyCatalog,
    #[error("invalid generation config: {0:?}")]
    InvalidConfig(Vec<ConfigError>),
    #[error("no {} tile could be placed as the level root", .0.name())]
    NoStartTile(TileType),
    #[error("level already built; clear it before building again")]
    AlreadyBuilt,
}

/// Rejected graph mutations. Placement treats these as a failed attempt.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("tile {0:?} is not in the graph")]
    NoSuchTile(Entity),
    #[error("connector {0:?} is not in the graph")]
    NoSuchConnector(Entity),
    #[error("connector {0:?} is already connected")]
    ConnectorBusy(Entity),
    #[error("connector {connector:?} does not belong to tile {tile:?}")]
    ForeignConnector { tile: Entity, connector: Entity },
}

/// Errors that can occur during snapshot save/load
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Encode(#[from] bincode::Error),
    #[error("Snapshot version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}
