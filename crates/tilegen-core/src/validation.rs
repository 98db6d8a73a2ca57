//! Invariant checks for generated levels.
//!
//! Pure functions over the tile graph and branch lists that return
//! validation errors. Used by tests and the simtest harness.

use std::collections::{HashMap, HashSet};

use hecs::Entity;

use crate::builder::Branch;
use crate::components::{CollisionVolume, Connector, Decoration, DecorationKind, Tile};
use crate::config::GenerationConfig;
use crate::graph::TileGraph;
use crate::level::LevelGenerator;
use crate::spatial::SpatialIndex;

/// A level validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub category: &'static str,
    pub severity: Severity,
    pub message: String,
}

/// Error severity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Severity {
    Error,
    Warning,
}

fn error(category: &'static str, message: String) -> ValidationError {
    ValidationError {
        category,
        severity: Severity::Error,
        message,
    }
}

// ── Connectivity ────────────────────────────────────────────────────────

/// Every link must be mirrored by its peer.
pub fn check_connector_symmetry(graph: &TileGraph) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (entity, conn) in graph.world().query::<&Connector>().iter() {
        let Some(link) = conn.link else { continue };
        let mirrored = graph
            .connector(link.connector)
            .map(|peer| peer.peer() == Some(entity) && peer.peer_tile() == Some(conn.tile))
            .unwrap_or(false);
        if !mirrored {
            errors.push(error(
                "connectivity",
                format!("Connector {:?} links to {:?} but is not linked back", entity, link.connector),
            ));
        }
        if graph.tile(link.tile).map(|t| t.connectors.contains(&link.connector)) != Ok(true) {
            errors.push(error(
                "connectivity",
                format!("Connector {:?} names the wrong peer tile {:?}", entity, link.tile),
            ));
        }
    }
    errors
}

/// Exactly one root; every other tile hangs from a live, linked parent.
pub fn check_parent_links(graph: &TileGraph) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut roots = 0;
    for (entity, tile) in graph.world().query::<&Tile>().iter() {
        let (Some(parent), Some(parent_connector)) = (tile.parent, tile.parent_connector) else {
            roots += 1;
            continue;
        };
        let linked = graph
            .connector(parent_connector)
            .map(|c| c.tile == parent && c.peer_tile() == Some(entity))
            .unwrap_or(false);
        if !linked {
            errors.push(error(
                "hierarchy",
                format!("Tile {:?} is not linked to its parent {:?}", entity, parent),
            ));
        }
    }
    if roots != 1 && !graph.is_empty() {
        errors.push(error("hierarchy", format!("Expected one root tile, found {}", roots)));
    }
    errors
}

// ── Geometry ────────────────────────────────────────────────────────────

/// No two tiles may interpenetrate, except a tile and its parent.
pub fn check_tile_overlaps(graph: &TileGraph, tolerance: f32) -> Vec<ValidationError> {
    let mut volumes: Vec<(Entity, Option<Entity>, CollisionVolume)> = Vec::new();
    for (entity, (tile, volume)) in graph.world().query::<(&Tile, &CollisionVolume)>().iter() {
        volumes.push((entity, tile.parent, *volume));
    }

    let mut errors = Vec::new();
    for (i, (a, parent_a, va)) in volumes.iter().enumerate() {
        for (b, parent_b, vb) in &volumes[i + 1..] {
            if *parent_a == Some(*b) || *parent_b == Some(*a) {
                continue;
            }
            if va.0.overlaps(&vb.0, tolerance) {
                errors.push(error(
                    "geometry",
                    format!("Tiles {:?} and {:?} overlap", a, b),
                ));
            }
        }
    }
    errors
}

// ── Branches ────────────────────────────────────────────────────────────

/// Each live tile sits in exactly one branch list, and no list holds a
/// destroyed tile.
pub fn check_branch_membership(graph: &TileGraph, branches: &[Branch]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen: HashMap<Entity, usize> = HashMap::new();
    for (b, branch) in branches.iter().enumerate() {
        for tile in &branch.tiles {
            if !graph.contains(*tile) {
                errors.push(error(
                    "branches",
                    format!("Branch {:?} holds destroyed tile {:?}", branch.label, tile),
                ));
            }
            if let Some(other) = seen.insert(*tile, b) {
                errors.push(error(
                    "branches",
                    format!("Tile {:?} is in branches {} and {}", tile, other, b),
                ));
            }
        }
    }
    for (entity, _) in graph.world().query::<&Tile>().iter() {
        if !seen.contains_key(&entity) {
            errors.push(error("branches", format!("Tile {:?} belongs to no branch", entity)));
        }
    }
    errors
}

/// Branch lengths and the side-branch budget.
pub fn check_branch_bounds(branches: &[Branch], config: &GenerationConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let Some(main) = branches.first() else {
        return errors;
    };
    if main.len() > config.main_path_length as usize {
        errors.push(error(
            "branches",
            format!("Main path has {} tiles, limit {}", main.len(), config.main_path_length),
        ));
    }
    let sides = &branches[1..];
    if sides.len() > config.virtual_branching_cap as usize {
        errors.push(error(
            "branches",
            format!("{} side branches exceed cap {}", sides.len(), config.virtual_branching_cap),
        ));
    }
    for branch in sides {
        if branch.len() > config.branch_max_length as usize {
            errors.push(error(
                "branches",
                format!("{} has {} tiles, limit {}", branch.label, branch.len(), config.branch_max_length),
            ));
        }
        if branch.truncated {
            errors.push(ValidationError {
                category: "branches",
                severity: Severity::Warning,
                message: format!("{} was truncated at {} tiles", branch.label, branch.len()),
            });
        }
    }
    errors
}

// ── Decorations ─────────────────────────────────────────────────────────

/// Free sockets carry exactly one blocker; connected sockets carry none and
/// at most one door or doorway per connection.
pub fn check_decorations(graph: &TileGraph) -> Vec<ValidationError> {
    let mut per_connector: HashMap<Entity, Vec<DecorationKind>> = HashMap::new();
    for (_, deco) in graph.world().query::<&Decoration>().iter() {
        per_connector.entry(deco.connector).or_default().push(deco.kind);
    }

    let mut errors = Vec::new();
    let mut doored: HashSet<Entity> = HashSet::new();
    for (entity, conn) in graph.world().query::<&Connector>().iter() {
        let kinds = per_connector.get(&entity).map(Vec::as_slice).unwrap_or(&[]);
        let blockers = kinds.iter().filter(|k| **k == DecorationKind::Blocker).count();
        let doors = kinds.len() - blockers;
        match conn.peer() {
            None if blockers != 1 => errors.push(error(
                "decorations",
                format!("Free connector {:?} has {} blockers", entity, blockers),
            )),
            Some(_) if blockers > 0 => errors.push(error(
                "decorations",
                format!("Connected connector {:?} is blocked", entity),
            )),
            Some(peer) if doors > 0 => {
                if doors > 1 || doored.contains(&peer) {
                    errors.push(error(
                        "decorations",
                        format!("Connection at {:?} has more than one door", entity),
                    ));
                }
                doored.insert(entity);
            }
            _ => {}
        }
    }
    errors
}

/// Run every check against a built level.
pub fn validate_level<S: SpatialIndex>(level: &LevelGenerator<S>) -> Vec<ValidationError> {
    let graph = level.graph();
    let mut errors = Vec::new();
    errors.extend(check_connector_symmetry(graph));
    errors.extend(check_parent_links(graph));
    errors.extend(check_tile_overlaps(graph, level.config().seam_tolerance));
    errors.extend(check_branch_membership(graph, level.branches()));
    errors.extend(check_branch_bounds(level.branches(), level.config()));
    if !level.catalog().decorations.blockers.is_empty() {
        errors.extend(check_decorations(graph));
    }
    errors
}

/// Only the errors, without warnings.
pub fn hard_errors(errors: &[ValidationError]) -> Vec<&ValidationError> {
    errors
        .iter()
        .filter(|e| e.severity == Severity::Error)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TileType;
    use crate::geometry::{Pose, Vec3};
    use crate::random::SeededRandom;
    use crate::testing::{corridor_catalog, hall};

    #[test]
    fn test_generated_level_is_clean() {
        let config = GenerationConfig {
            main_path_length: 6,
            main_path_ending_type: TileType::Room,
            ..Default::default()
        };
        let mut level = LevelGenerator::new(corridor_catalog(), config).unwrap();
        level.build_level(&mut SeededRandom::from_seed(21)).unwrap();

        let errors = validate_level(&level);
        assert!(hard_errors(&errors).is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn test_overlap_detected() {
        let mut graph = TileGraph::new();
        let a = graph.instantiate(0, &hall());
        let b = graph.instantiate(0, &hall());
        graph.place(b, Pose::new(Vec3::new(2.0, 0.0, 0.0), 0.0)).unwrap();
        graph.compute_collision_volume(a).unwrap();
        graph.compute_collision_volume(b).unwrap();

        let errors = check_tile_overlaps(&graph, 0.01);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].category, "geometry");
    }

    #[test]
    fn test_parent_overlap_allowed() {
        let mut graph = TileGraph::new();
        let a = graph.instantiate(0, &hall());
        let b = graph.instantiate(0, &hall());
        let ca = graph.connectors_of(a)[0];
        let cb = graph.connectors_of(b)[1];
        graph.connect(a, ca, b, cb).unwrap();
        graph.compute_collision_volume(a).unwrap();
        graph.compute_collision_volume(b).unwrap();

        assert!(check_tile_overlaps(&graph, 0.01).is_empty());
        assert!(check_connector_symmetry(&graph).is_empty());
        assert!(check_parent_links(&graph).is_empty());
    }

    #[test]
    fn test_orphan_tile_detected() {
        let mut graph = TileGraph::new();
        let a = graph.instantiate(0, &hall());
        graph.instantiate(0, &hall());

        let mut branch = Branch::new(a);
        branch.tiles.push(a);
        let errors = check_branch_membership(&graph, &[branch]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("no branch"));

        // two roots
        assert_eq!(check_parent_links(&graph).len(), 1);
    }
}
