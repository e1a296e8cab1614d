//! Aberred hierarchy stress driver.
//!
//! Builds a random forest of 2D entities, then runs update cycles while
//! continuously moving, reparenting, and despawning entities. Useful for
//! profiling the hierarchy systems and for shaking out invariant violations.
//!
//! # Cycle
//!
//! 1. Apply random mutations (local transform edits, reparents, despawns)
//! 2. Run one hierarchy update cycle
//! 3. Log per-cycle statistics
//!
//! After the last cycle the hierarchy is validated, and an optional JSON
//! report with per-cycle statistics and timings is written.
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --roots 1000 --depth 5 --cycles 600 --report report.json
//! ```

use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use aberredhierarchy::components::localtransform2d::LocalTransform2D;
use aberredhierarchy::components::parent::ParentRef;
use aberredhierarchy::hierarchy::{remove_parent, set_parent};
use aberredhierarchy::pipeline::HierarchyPipeline;
use aberredhierarchy::resources::hierarchyconfig::HierarchyConfig;
use aberredhierarchy::resources::hierarchystats::HierarchyStats;
use aberredhierarchy::systems::validate::find_violations;
use bevy_ecs::prelude::*;
use clap::Parser;
use glam::Vec2;
use log::{error, info, warn};
use serde::Serialize;

/// Aberred hierarchy stress driver
#[derive(Parser)]
#[command(version, about = "Stress test for 2D hierarchy maintenance and transform propagation")]
struct Cli {
    /// Hierarchy configuration file.
    #[arg(long, value_name = "PATH", default_value = "./hierarchy.ini")]
    config: PathBuf,

    /// Number of root entities.
    #[arg(long, default_value_t = 64)]
    roots: usize,

    /// Levels below each root.
    #[arg(long, default_value_t = 4)]
    depth: usize,

    /// Children per node.
    #[arg(long, default_value_t = 3)]
    fanout: usize,

    /// Update cycles to run.
    #[arg(long, default_value_t = 120)]
    cycles: u64,

    /// Fraction of entities mutated per cycle.
    #[arg(long, default_value_t = 0.01)]
    mutation_rate: f32,

    /// Random seed, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Write per-cycle statistics as JSON to this path.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
}

#[derive(Serialize)]
struct CycleReport {
    micros: u128,
    mutations: MutationCounts,
    stats: HierarchyStats,
}

#[derive(Serialize, Default, Clone, Copy)]
struct MutationCounts {
    moved: usize,
    reparented: usize,
    rejected: usize,
    unparented: usize,
    despawned: usize,
}

#[derive(Serialize)]
struct Report {
    entities: usize,
    violations: Vec<String>,
    cycles: Vec<CycleReport>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = HierarchyConfig::with_path(&cli.config);
    if let Err(e) = config.load_from_file() {
        warn!("Config file not found or invalid, using defaults: {}", e);
    }

    let mut rng = match cli.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };

    let mut world = World::new();
    world.insert_resource(config);

    let spawned = spawn_forest(&mut world, &mut rng, cli.roots, cli.depth, cli.fanout);
    info!(
        "Spawned {} entities ({} roots, depth {}, fanout {})",
        spawned, cli.roots, cli.depth, cli.fanout
    );

    let mut pipeline = HierarchyPipeline::new();
    let start = Instant::now();
    pipeline.run(&mut world);
    info!("Initial cycle took {:?}", start.elapsed());

    let mut cycles = Vec::with_capacity(cli.cycles as usize);
    for _ in 0..cli.cycles {
        let mutations = mutate(&mut world, &mut rng, cli.mutation_rate);

        let start = Instant::now();
        pipeline.run(&mut world);
        let micros = start.elapsed().as_micros();

        let stats = *world.resource::<HierarchyStats>();
        if stats.cycle % 60 == 0 {
            info!(
                "cycle {}: {}us, +{} -{} children, {} orphaned, {} transforms written",
                stats.cycle,
                micros,
                stats.additions,
                stats.removals,
                stats.orphaned,
                stats.transforms_written()
            );
        }
        cycles.push(CycleReport {
            micros,
            mutations,
            stats,
        });
    }

    let violations: Vec<String> = find_violations(&mut world)
        .iter()
        .map(|v| v.to_string())
        .collect();
    if violations.is_empty() {
        info!("Hierarchy consistent after {} cycles", cli.cycles);
    } else {
        for violation in &violations {
            error!("{}", violation);
        }
    }

    if let Some(path) = cli.report {
        let entities = world.query::<&LocalTransform2D>().iter(&world).count();
        let report = Report {
            entities,
            violations,
            cycles,
        };
        let written = File::create(&path)
            .map_err(|e| e.to_string())
            .and_then(|file| serde_json::to_writer_pretty(file, &report).map_err(|e| e.to_string()));
        match written {
            Ok(()) => info!("Report written to {}", path.display()),
            Err(e) => {
                eprintln!("Error writing report: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn random_local(rng: &mut fastrand::Rng) -> LocalTransform2D {
    LocalTransform2D::from_position_rotation_scale(
        Vec2::new(rng.f32() * 200.0 - 100.0, rng.f32() * 200.0 - 100.0),
        rng.f32() * std::f32::consts::TAU,
        Vec2::splat(0.5 + rng.f32()),
    )
}

/// Spawn `roots` trees of the given depth and fanout. Returns the entity count.
fn spawn_forest(
    world: &mut World,
    rng: &mut fastrand::Rng,
    roots: usize,
    depth: usize,
    fanout: usize,
) -> usize {
    let mut level: Vec<Entity> = (0..roots)
        .map(|_| world.spawn(random_local(rng)).id())
        .collect();
    let mut count = level.len();
    for _ in 0..depth {
        let mut next = Vec::with_capacity(level.len() * fanout);
        for &parent in &level {
            for _ in 0..fanout {
                next.push(world.spawn((random_local(rng), ParentRef(parent))).id());
            }
        }
        count += next.len();
        level = next;
    }
    count
}

/// Apply a random batch of authoring edits.
fn mutate(world: &mut World, rng: &mut fastrand::Rng, rate: f32) -> MutationCounts {
    let mut counts = MutationCounts::default();
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, With<LocalTransform2D>>()
        .iter(world)
        .collect();
    if entities.is_empty() {
        return counts;
    }

    let edits = ((entities.len() as f32 * rate).ceil() as usize).max(1);
    for _ in 0..edits {
        let target = entities[rng.usize(..entities.len())];
        if world.get_entity(target).is_err() {
            continue;
        }
        match rng.u32(..100) {
            0..70 => {
                if let Some(mut local) = world.get_mut::<LocalTransform2D>(target) {
                    *local = local
                        .translate(Vec2::new(rng.f32() - 0.5, rng.f32() - 0.5))
                        .rotate(rng.f32() * 0.1);
                    counts.moved += 1;
                }
            }
            70..88 => {
                let parent = entities[rng.usize(..entities.len())];
                match set_parent(world, target, parent) {
                    Ok(()) => counts.reparented += 1,
                    Err(_) => counts.rejected += 1,
                }
            }
            88..95 => {
                if remove_parent(world, target).is_ok() {
                    counts.unparented += 1;
                }
            }
            _ => {
                world.despawn(target);
                world.spawn(random_local(rng));
                counts.despawned += 1;
            }
        }
    }
    counts
}
