//! Generation parameters.
//!
//! [`GenerationConfig`] is passed by value into the generator and never
//! mutated afterwards. Every field has a default, so partial JSON configs
//! deserialize cleanly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::TileType;
use crate::selection::SelectionPolicy;

/// Configuration for level generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Type of the root tile
    pub start_tile_type: TileType,
    /// Tiles on the main path, root included
    pub main_path_length: u32,
    pub max_attempts_per_tile: u32,
    /// Slot exhaustions tolerated per branch before it is truncated
    pub max_failure_count: u32,
    /// Forced type of the last main-path tile; `Default` forces nothing
    pub main_path_ending_type: TileType,

    /// Chance for each free socket to sprout a side branch
    pub branching_chance: f32,
    /// Upper bound on side branches for the whole level
    pub virtual_branching_cap: u32,
    pub branch_min_length: u32,
    pub branch_max_length: u32,

    pub doorway_chance: f32,
    pub doorway_having_door_chance: f32,
    pub tile_layer: String,
    pub door_layer: String,

    /// Keep an ordered list of committed tiles for batching
    pub cache_mesh_components: bool,
    pub selection: SelectionPolicy,
    /// Interpenetration depth below which two volumes count as touching
    pub seam_tolerance: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            start_tile_type: TileType::Cap,
            main_path_length: 10,
            max_attempts_per_tile: 100,
            max_failure_count: 100,
            main_path_ending_type: TileType::Cap,
            branching_chance: 0.5,
            virtual_branching_cap: 20,
            branch_min_length: 1,
            branch_max_length: 10,
            doorway_chance: 0.5,
            doorway_having_door_chance: 0.5,
            tile_layer: "Tile".to_string(),
            door_layer: "Door".to_string(),
            cache_mesh_components: true,
            selection: SelectionPolicy::Uniform,
            seam_tolerance: 0.01,
        }
    }
}

impl GenerationConfig {
    /// Forced ending type, if any.
    pub fn main_path_ending(&self) -> Option<TileType> {
        match self.main_path_ending_type {
            TileType::Default => None,
            t => Some(t),
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("main path needs at least the root tile")]
    EmptyMainPath,
    #[error("at least one placement attempt per tile is required")]
    NoAttempts,
    #[error("{name} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f32 },
    #[error("branch length range is inverted: {min} > {max}")]
    BranchLengthRange { min: u32, max: u32 },
    #[error("tile and door layers must differ (both {0:?})")]
    SharedLayer(String),
    #[error("seam tolerance must be non-negative, got {0}")]
    NegativeTolerance(f32),
}

/// Validate a generation configuration, returning all errors found.
pub fn validate_config(config: &GenerationConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if config.main_path_length == 0 {
        errors.push(ConfigError::EmptyMainPath);
    }
    if config.max_attempts_per_tile == 0 {
        errors.push(ConfigError::NoAttempts);
    }

    for (name, value) in [
        ("branching_chance", config.branching_chance),
        ("doorway_chance", config.doorway_chance),
        ("doorway_having_door_chance", config.doorway_having_door_chance),
    ] {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ConfigError::ProbabilityOutOfRange { name, value });
        }
    }

    if config.branch_min_length > config.branch_max_length {
        errors.push(ConfigError::BranchLengthRange {
            min: config.branch_min_length,
            max: config.branch_max_length,
        });
    }
    if config.tile_layer == config.door_layer {
        errors.push(ConfigError::SharedLayer(config.tile_layer.clone()));
    }
    if config.seam_tolerance < 0.0 {
        errors.push(ConfigError::NegativeTolerance(config.seam_tolerance));
    }

    errors
}
