//! Side-branch expansion.
//!
//! Flood-fills the built graph from the root and rolls a branch off every
//! free socket it passes, until the level-wide branch budget is spent.

use hecs::Entity;
use log::debug;

use crate::builder::{Branch, BranchBuilder};
use crate::random::RandomSource;
use crate::spatial::SpatialIndex;

/// A tile waiting to be visited, with the connector it was reached through.
#[derive(Debug, Clone, Copy)]
struct Frame {
    tile: Entity,
    source: Option<Entity>,
    depth: u32,
}

pub struct BranchingExpander<'b, 'a, S: SpatialIndex + ?Sized, R: RandomSource + ?Sized> {
    builder: &'b mut BranchBuilder<'a, S, R>,
    spawned: u32,
}

impl<'b, 'a, S: SpatialIndex + ?Sized, R: RandomSource + ?Sized> BranchingExpander<'b, 'a, S, R> {
    pub fn new(builder: &'b mut BranchBuilder<'a, S, R>) -> Self {
        Self {
            builder,
            spawned: 0,
        }
    }

    /// Side branches spawned so far, counting empty ones.
    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Commit number of `tile`, stable across rebuilds with the same seed.
    fn tile_number(&self, tile: Entity) -> usize {
        self.builder
            .placed()
            .iter()
            .position(|t| *t == tile)
            .unwrap_or(usize::MAX)
    }

    fn budget_spent(&self) -> bool {
        self.spawned >= self.builder.config().virtual_branching_cap
    }

    /// Walk the graph from `root` and return the branches spawned, in spawn
    /// order. Peers are visited depth first in socket order.
    pub fn expand(&mut self, root: Entity) -> Vec<Branch> {
        let chance = self.builder.config().branching_chance;
        let min = self.builder.config().branch_min_length as i32;
        let max = self.builder.config().branch_max_length as i32;

        let mut branches = Vec::new();
        let mut stack = vec![Frame {
            tile: root,
            source: None,
            depth: 0,
        }];

        while let Some(frame) = stack.pop() {
            if self.budget_spent() {
                break;
            }
            let mut children = Vec::new();
            let connectors = self.builder.graph().connectors_of(frame.tile);

            for connector in connectors {
                if self.budget_spent() {
                    break;
                }
                // Live read: a branch spawned from this tile may have taken it.
                let link = match self.builder.graph().connector(connector) {
                    Ok(c) => c.link,
                    Err(_) => continue,
                };
                match link {
                    Some(link) if frame.source == Some(link.connector) => {}
                    Some(link) => children.push(Frame {
                        tile: link.tile,
                        source: Some(connector),
                        depth: frame.depth,
                    }),
                    None => {
                        if self.builder.rng().value() >= chance {
                            continue;
                        }
                        let length = self.builder.rng().range_inclusive(min, max).max(0) as usize;
                        let number = self.tile_number(frame.tile);
                        let mut branch = self.builder.build_branch(length, frame.tile, None, false);
                        self.spawned += 1;
                        branch.label = format!("From Tile {}", number);
                        branch.depth = frame.depth;
                        debug!(
                            "Side branch {} from tile {} at depth {}: {}/{} tiles",
                            self.spawned,
                            number,
                            frame.depth,
                            branch.len(),
                            length
                        );
                        branches.push(branch);
                    }
                }
            }

            stack.extend(children.into_iter().rev());
        }
        branches
    }
}
