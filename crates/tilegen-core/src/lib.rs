//! TileGen Core - socket-based procedural level generation.
//!
//! Levels are grown from a catalog of tile templates. Each tile exposes
//! sockets; new tiles are attached socket to socket, rejected when they
//! collide with what is already placed, and rolled back when a branch runs
//! into a dead end. Once the main path and side branches are built, every
//! socket is decorated with a blocker, door or doorway.
//!
//! Placed tiles, connectors and decorations live in a `hecs` world owned by
//! [`graph::TileGraph`], so every reference between them is a stable entity
//! handle.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`branching`] | Side-branch flood fill under a level-wide budget |
//! | [`builder`] | Branch building with attempt-bounded backtracking |
//! | [`catalog`] | Tile templates, socket layouts, decoration lists |
//! | [`components`] | ECS components: tiles, connectors, decorations |
//! | [`config`] | Generation parameters and validation |
//! | [`error`] | Generation, graph and snapshot errors |
//! | [`geometry`] | Vectors, yaw-only poses, axis-aligned boxes |
//! | [`graph`] | Tile graph arena: instantiate, connect, destroy |
//! | [`level`] | Full pipeline and teardown |
//! | [`persistence`] | Handle-free snapshots, bincode save/load |
//! | [`random`] | Injectable random source, seeded and scripted |
//! | [`resolver`] | Blockers, doors and doorways for every socket |
//! | [`selection`] | Template selection policies |
//! | [`spatial`] | Layered box-overlap index |
//! | [`validation`] | Invariant checks over a built level |
//!
//! # Example
//!
//! ```rust,no_run
//! use tilegen_core::prelude::*;
//!
//! # fn catalog() -> TileCatalog { TileCatalog::default() }
//! let mut level = LevelGenerator::new(catalog(), GenerationConfig::default())?;
//! let stats = level.build_level(&mut SeededRandom::from_seed(7))?;
//! println!("{} tiles", stats.tiles);
//!
//! level.clear_level();
//! # Ok::<(), GenerationError>(())
//! ```

pub mod branching;
pub mod builder;
pub mod catalog;
pub mod components;
pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod level;
pub mod persistence;
pub mod random;
pub mod resolver;
pub mod selection;
pub mod spatial;
pub mod validation;

#[cfg(test)]
mod testing;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::builder::Branch;
    pub use crate::catalog::{
        DecorationCatalog, DecorationTemplate, SocketLayout, TileCatalog, TileTemplate, TileType,
    };
    pub use crate::components::*;
    pub use crate::config::GenerationConfig;
    pub use crate::error::{GenerationError, GraphError, SnapshotError};
    pub use crate::geometry::{Aabb, Pose, Vec3};
    pub use crate::graph::TileGraph;
    pub use crate::level::{LevelGenerator, LevelStats};
    pub use crate::random::{RandomSource, SeededRandom};
    pub use crate::selection::SelectionPolicy;
    pub use crate::spatial::{LinearIndex, SpatialIndex};
}
