//! TileGen Headless Generation Harness
//!
//! Loads the JSON tile catalog and generation config from `data/`, builds
//! levels over a range of seeds and checks them against the level
//! invariants. Runs entirely in-process with no engine or renderer.
//!
//! Usage:
//!   cargo run -p tilegen-simtest
//!   cargo run -p tilegen-simtest -- --verbose --seeds 200
//!   cargo run -p tilegen-simtest -- --export level.json
//!
//! Set `RUST_LOG=tilegen_core=debug` to see placement decisions.

use std::fs::File;
use std::io::BufWriter;

use log::{debug, error};
use tilegen_core::catalog::{TileCatalog, TileType};
use tilegen_core::config::{validate_config, GenerationConfig};
use tilegen_core::level::LevelGenerator;
use tilegen_core::persistence::{load_snapshot, save_level};
use tilegen_core::random::SeededRandom;
use tilegen_core::validation::{hard_errors, validate_level, Severity};

// ── Input data ──────────────────────────────────────────────────────────
const CATALOG_JSON: &str = include_str!("../../../data/tile_catalog.json");
const CONFIG_JSON: &str = include_str!("../../../data/generation_config.json");

const DEFAULT_SEEDS: u64 = 100;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

struct Args {
    verbose: bool,
    seeds: u64,
    export: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let value_after = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };
    let seeds = match value_after("--seeds") {
        Some(s) => s
            .parse()
            .map_err(|e| format!("--seeds expects a number, got {:?}: {}", s, e))?,
        None if args.iter().any(|a| a == "--seeds") => {
            return Err("--seeds expects a number".into())
        }
        None => DEFAULT_SEEDS,
    };
    Ok(Args {
        verbose: args.iter().any(|a| a == "--verbose"),
        seeds,
        export: value_after("--export"),
    })
}

fn main() {
    env_logger::init();
    let argv: Vec<String> = std::env::args().collect();
    let args = match parse_args(&argv) {
        Ok(a) => a,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };
    println!("=== TileGen Generation Harness ===\n");

    let mut results = Vec::new();

    // 1. Catalog
    let catalog = match load_catalog(&mut results) {
        Some(c) => c,
        None => return finish(results, args.verbose),
    };

    // 2. Config
    let config = match load_config(&mut results) {
        Some(c) => c,
        None => return finish(results, args.verbose),
    };

    // 3. Seed sweep
    results.extend(sweep_seeds(&catalog, &config, args.seeds, args.verbose));

    // 4. Determinism
    results.extend(check_determinism(&catalog, &config));

    // 5. Snapshot persistence
    results.extend(check_snapshot_roundtrip(&catalog, &config));

    // 6. Optional export
    if let Some(path) = &args.export {
        results.push(export_snapshot(&catalog, &config, path));
    }

    finish(results, args.verbose);
}

fn finish(results: Vec<TestResult>, verbose: bool) {
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Catalog ──────────────────────────────────────────────────────────

fn load_catalog(results: &mut Vec<TestResult>) -> Option<TileCatalog> {
    println!("--- Tile Catalog ---");
    let catalog: TileCatalog = match serde_json::from_str(CATALOG_JSON) {
        Ok(c) => c,
        Err(e) => {
            results.push(TestResult {
                name: "catalog_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return None;
        }
    };

    results.push(TestResult {
        name: "catalog_not_empty".into(),
        passed: !catalog.is_empty(),
        detail: format!("{} tile templates loaded", catalog.len()),
    });

    // Every placeable type has at least one template
    let missing: Vec<&str> = [TileType::Cap, TileType::Hall, TileType::Room]
        .iter()
        .filter(|t| catalog.indices_of_types(&[**t]).is_empty())
        .map(|t| t.name())
        .collect();
    results.push(TestResult {
        name: "catalog_covers_types".into(),
        passed: missing.is_empty(),
        detail: if missing.is_empty() {
            "Cap, Hall and Room templates present".into()
        } else {
            format!("no templates for: {}", missing.join(", "))
        },
    });

    let socketless: Vec<&str> = catalog
        .tiles
        .iter()
        .filter(|t| t.sockets.is_empty())
        .map(|t| t.id.as_str())
        .collect();
    results.push(TestResult {
        name: "catalog_sockets".into(),
        passed: socketless.is_empty(),
        detail: if socketless.is_empty() {
            "every template has at least one socket".into()
        } else {
            format!("templates without sockets: {}", socketless.join(", "))
        },
    });

    let degenerate: Vec<&str> = catalog
        .tiles
        .iter()
        .filter(|t| t.bounds.width() <= 0.0 || t.bounds.depth() <= 0.0 || t.bounds.height() <= 0.0)
        .map(|t| t.id.as_str())
        .collect();
    results.push(TestResult {
        name: "catalog_bounds".into(),
        passed: degenerate.is_empty(),
        detail: if degenerate.is_empty() {
            "all bounds have positive volume".into()
        } else {
            format!("degenerate bounds: {}", degenerate.join(", "))
        },
    });

    let decorations = &catalog.decorations;
    results.push(TestResult {
        name: "catalog_blockers".into(),
        passed: !decorations.blockers.is_empty(),
        detail: format!(
            "{} blockers, {} doors, {} doorways",
            decorations.blockers.len(),
            decorations.doors.len(),
            decorations.doorways.len()
        ),
    });

    Some(catalog)
}

// ── 2. Config ───────────────────────────────────────────────────────────

fn load_config(results: &mut Vec<TestResult>) -> Option<GenerationConfig> {
    println!("--- Generation Config ---");
    let config: GenerationConfig = match serde_json::from_str(CONFIG_JSON) {
        Ok(c) => c,
        Err(e) => {
            results.push(TestResult {
                name: "config_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return None;
        }
    };

    let errors = validate_config(&config);
    results.push(TestResult {
        name: "config_valid".into(),
        passed: errors.is_empty(),
        detail: if errors.is_empty() {
            format!(
                "main path {}, branch cap {}, {:?} selection",
                config.main_path_length, config.virtual_branching_cap, config.selection
            )
        } else {
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        },
    });

    if errors.is_empty() {
        Some(config)
    } else {
        None
    }
}

// ── 3. Seed sweep ───────────────────────────────────────────────────────

fn sweep_seeds(
    catalog: &TileCatalog,
    config: &GenerationConfig,
    seeds: u64,
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Seed Sweep ({} seeds) ---", seeds);
    let mut results = Vec::new();

    let mut level = match LevelGenerator::new(catalog.clone(), config.clone()) {
        Ok(l) => l,
        Err(e) => {
            results.push(TestResult {
                name: "generator_new".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };

    let mut build_failures = Vec::new();
    let mut invalid = Vec::new();
    let mut warnings = 0usize;
    let mut short_main = 0usize;
    let mut tiles = 0usize;
    let mut side_branches = 0usize;
    let mut decorations = 0usize;

    for seed in 0..seeds {
        level.clear_level();
        let stats = match level.build_level(&mut SeededRandom::from_seed(seed)) {
            Ok(s) => s.clone(),
            Err(e) => {
                build_failures.push(format!("seed {}: {}", seed, e));
                continue;
            }
        };
        tiles += stats.tiles;
        side_branches += stats.side_branches;
        decorations += stats.resolve.decorations();
        if stats.main_path_length < config.main_path_length as usize {
            short_main += 1;
        }

        let errors = validate_level(&level);
        warnings += errors.iter().filter(|e| e.severity == Severity::Warning).count();
        let hard = hard_errors(&errors);
        if let Some(first) = hard.first() {
            invalid.push(format!("seed {}: [{}] {}", seed, first.category, first.message));
        }
        if verbose {
            println!(
                "  seed {}: {} tiles, {} side branches, {} decorations",
                seed,
                stats.tiles,
                stats.side_branches,
                stats.resolve.decorations()
            );
        }
    }

    results.push(TestResult {
        name: "sweep_builds".into(),
        passed: build_failures.is_empty(),
        detail: if build_failures.is_empty() {
            format!("{} levels built", seeds)
        } else {
            build_failures.join("; ")
        },
    });

    results.push(TestResult {
        name: "sweep_invariants".into(),
        passed: invalid.is_empty(),
        detail: if invalid.is_empty() {
            format!("no invariant violations ({} warnings)", warnings)
        } else {
            format!("{} invalid levels, first: {}", invalid.len(), invalid[0])
        },
    });

    let built = (seeds as usize - build_failures.len()).max(1);
    results.push(TestResult {
        name: "sweep_main_path".into(),
        passed: short_main * 10 <= built,
        detail: format!(
            "{} of {} main paths cut short",
            short_main, built
        ),
    });

    results.push(TestResult {
        name: "sweep_averages".into(),
        passed: tiles > 0,
        detail: format!(
            "avg {:.1} tiles, {:.1} side branches, {:.1} decorations per level",
            tiles as f64 / built as f64,
            side_branches as f64 / built as f64,
            decorations as f64 / built as f64
        ),
    });

    results
}

// ── 4. Determinism ──────────────────────────────────────────────────────

fn check_determinism(catalog: &TileCatalog, config: &GenerationConfig) -> Vec<TestResult> {
    println!("--- Determinism ---");
    let mut results = Vec::new();
    let seed = 4242;

    let build = || -> Option<LevelGenerator> {
        let mut level = LevelGenerator::new(catalog.clone(), config.clone()).ok()?;
        level.build_level(&mut SeededRandom::from_seed(seed)).ok()?;
        Some(level)
    };

    let (Some(a), Some(mut b)) = (build(), build()) else {
        results.push(TestResult {
            name: "determinism_build".into(),
            passed: false,
            detail: "level failed to build".into(),
        });
        return results;
    };

    let first = a.snapshot();
    results.push(TestResult {
        name: "determinism_same_seed".into(),
        passed: first == b.snapshot(),
        detail: format!("{} tiles, identical across generators", first.tile_count()),
    });

    b.clear_level();
    b.clear_level();
    let cleared = b.graph().is_empty() && b.branches().is_empty() && b.mesh_cache().is_empty();
    let rebuilt = b
        .build_level(&mut SeededRandom::from_seed(seed))
        .is_ok()
        && b.snapshot() == first;
    results.push(TestResult {
        name: "determinism_clear_rebuild".into(),
        passed: cleared && rebuilt,
        detail: format!("cleared: {}, rebuilt identically: {}", cleared, rebuilt),
    });

    results
}

// ── 5. Snapshot persistence ─────────────────────────────────────────────

fn check_snapshot_roundtrip(catalog: &TileCatalog, config: &GenerationConfig) -> Vec<TestResult> {
    println!("--- Snapshot ---");
    let mut results = Vec::new();

    let mut level = match LevelGenerator::new(catalog.clone(), config.clone()) {
        Ok(l) => l,
        Err(e) => {
            results.push(TestResult {
                name: "snapshot_build".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };
    if let Err(e) = level.build_level(&mut SeededRandom::from_seed(7)) {
        results.push(TestResult {
            name: "snapshot_build".into(),
            passed: false,
            detail: e.to_string(),
        });
        return results;
    }
    let snapshot = level.snapshot();

    let mut buffer = Vec::new();
    let outcome = save_level(&mut buffer, &snapshot).and_then(|_| load_snapshot(&buffer[..]));
    results.push(match outcome {
        Ok(loaded) => TestResult {
            name: "snapshot_roundtrip".into(),
            passed: loaded == snapshot,
            detail: format!("{} bytes, {} tiles", buffer.len(), loaded.tile_count()),
        },
        Err(e) => TestResult {
            name: "snapshot_roundtrip".into(),
            passed: false,
            detail: e.to_string(),
        },
    });

    results
}

// ── 6. Export ───────────────────────────────────────────────────────────

fn export_snapshot(catalog: &TileCatalog, config: &GenerationConfig, path: &str) -> TestResult {
    debug!("Exporting seed 0 snapshot to {}", path);
    let result = (|| -> Result<usize, Box<dyn std::error::Error>> {
        let mut level = LevelGenerator::new(catalog.clone(), config.clone())?;
        level.build_level(&mut SeededRandom::from_seed(0))?;
        let snapshot = level.snapshot();
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &snapshot)?;
        Ok(snapshot.tile_count())
    })();

    match result {
        Ok(tiles) => TestResult {
            name: "export_json".into(),
            passed: true,
            detail: format!("seed 0 ({} tiles) written to {}", tiles, path),
        },
        Err(e) => TestResult {
            name: "export_json".into(),
            passed: false,
            detail: format!("export to {} failed: {}", path, e),
        },
    }
}
