//! Level orchestration - root, main path, side branches, decorations.
//!
//! [`LevelGenerator`] owns the catalog, config, tile graph and spatial index
//! for one level. A build runs the whole pipeline against an injected random
//! source; `clear_level` tears everything down so it can run again.

use hecs::Entity;
use log::{debug, info};

use crate::branching::BranchingExpander;
use crate::builder::{Branch, BranchBuilder};
use crate::catalog::TileCatalog;
use crate::config::{validate_config, GenerationConfig};
use crate::error::GenerationError;
use crate::geometry::Pose;
use crate::graph::TileGraph;
use crate::persistence::LevelSnapshot;
use crate::random::RandomSource;
use crate::resolver::{ConnectorResolver, ResolveStats};
use crate::spatial::{LinearIndex, SpatialIndex};

/// Summary of the last build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelStats {
    /// Tiles alive in the finished level
    pub tiles: usize,
    pub main_path_length: usize,
    pub side_branches: usize,
    /// Side branches that came out empty
    pub empty_branches: usize,
    /// Branches cut short by the failure cap or a protected root
    pub truncated_branches: usize,
    /// Commits made during the build, including ones later backtracked
    pub placements: usize,
    pub resolve: ResolveStats,
}

pub struct LevelGenerator<S: SpatialIndex = LinearIndex> {
    catalog: TileCatalog,
    config: GenerationConfig,
    graph: TileGraph,
    spatial: S,
    branches: Vec<Branch>,
    mesh_cache: Vec<Entity>,
    stats: LevelStats,
    built: bool,
}

impl LevelGenerator<LinearIndex> {
    /// Generator backed by a linear-scan index using the config's seam
    /// tolerance.
    pub fn new(catalog: TileCatalog, config: GenerationConfig) -> Result<Self, GenerationError> {
        let spatial = LinearIndex::with_tolerance(config.seam_tolerance);
        Self::with_spatial_index(catalog, config, spatial)
    }
}

impl<S: SpatialIndex> LevelGenerator<S> {
    pub fn with_spatial_index(
        catalog: TileCatalog,
        config: GenerationConfig,
        spatial: S,
    ) -> Result<Self, GenerationError> {
        if catalog.is_empty() {
            return Err(GenerationError::EmptyCatalog);
        }
        let errors = validate_config(&config);
        if !errors.is_empty() {
            return Err(GenerationError::InvalidConfig(errors));
        }
        Ok(Self {
            catalog,
            config,
            graph: TileGraph::new(),
            spatial,
            branches: Vec::new(),
            mesh_cache: Vec::new(),
            stats: LevelStats::default(),
            built: false,
        })
    }

    /// Run the full pipeline. Fails with `AlreadyBuilt` until the previous
    /// level has been cleared.
    pub fn build_level<R: RandomSource + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<&LevelStats, GenerationError> {
        if self.built {
            return Err(GenerationError::AlreadyBuilt);
        }
        info!(
            "Building level: {} templates, main path {}, branch cap {}",
            self.catalog.len(),
            self.config.main_path_length,
            self.config.virtual_branching_cap
        );

        let (branches, placed) = {
            let mut builder = BranchBuilder::new(
                &self.catalog,
                &self.config,
                &mut self.graph,
                &mut self.spatial,
                rng,
            );

            let root = builder
                .spawn_root(Pose::IDENTITY)
                .ok_or(GenerationError::NoStartTile(self.config.start_tile_type))?;

            let length = self.config.main_path_length.saturating_sub(1) as usize;
            let mut main = builder.build_branch(length, root, self.config.main_path_ending(), true);
            // A re-rolled root replaces the first one as the branch source.
            main.tiles.insert(0, main.source);
            main.requested = length + 1;
            main.label = "Main".to_string();
            info!("Main path: {}/{} tiles", main.len(), main.requested);

            let mut branches = vec![main];
            if self.config.virtual_branching_cap > 0 {
                let source = branches[0].source;
                let side = BranchingExpander::new(&mut builder).expand(source);
                info!("Spawned {} side branches", side.len());
                branches.extend(side);
            }
            (branches, builder.into_placed())
        };

        let resolve = ConnectorResolver::new(
            &self.catalog.decorations,
            &self.config,
            &mut self.graph,
            &mut self.spatial,
            rng,
        )
        .resolve(&branches);

        self.mesh_cache = if self.config.cache_mesh_components {
            placed
                .iter()
                .copied()
                .filter(|t| self.graph.contains(*t))
                .collect()
        } else {
            Vec::new()
        };

        self.stats = LevelStats {
            tiles: self.graph.tile_count(),
            main_path_length: branches[0].len(),
            side_branches: branches.len() - 1,
            empty_branches: branches[1..].iter().filter(|b| b.is_empty()).count(),
            truncated_branches: branches.iter().filter(|b| b.truncated).count(),
            placements: placed.len(),
            resolve,
        };
        self.branches = branches;
        self.built = true;

        info!(
            "Level built: {} tiles, {} side branches, {} decorations",
            self.stats.tiles,
            self.stats.side_branches,
            self.stats.resolve.decorations()
        );
        Ok(&self.stats)
    }

    /// Despawn everything and reset bookkeeping. Safe to call repeatedly.
    pub fn clear_level(&mut self) {
        if self.built {
            debug!("Clearing level with {} tiles", self.graph.tile_count());
        }
        self.graph.clear();
        self.spatial.clear();
        self.branches.clear();
        self.mesh_cache.clear();
        self.stats = LevelStats::default();
        self.built = false;
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn graph(&self) -> &TileGraph {
        &self.graph
    }

    pub fn spatial_index(&self) -> &S {
        &self.spatial
    }

    pub fn catalog(&self) -> &TileCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Main branch first, then side branches in spawn order.
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn main_branch(&self) -> Option<&Branch> {
        self.branches.first()
    }

    pub fn side_branches(&self) -> &[Branch] {
        self.branches.get(1..).unwrap_or_default()
    }

    pub fn root(&self) -> Option<Entity> {
        self.main_branch().and_then(|b| b.tiles.first().copied())
    }

    /// Committed tiles in placement order; empty when caching is off.
    pub fn mesh_cache(&self) -> &[Entity] {
        &self.mesh_cache
    }

    pub fn decorations(&self) -> &[Entity] {
        &self.stats.resolve.spawned
    }

    pub fn stats(&self) -> &LevelStats {
        &self.stats
    }

    pub fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot::capture(&self.catalog, &self.graph, &self.branches)
    }
}
