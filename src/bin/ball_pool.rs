//! Ball Pool - headless physics demo
//!
//! Builds one of the demo scenes, runs the fixed-timestep loop for a number of
//! simulated seconds and logs per-second statistics.
//!
//! ```text
//! RUST_LOG=info cargo run --release --bin ball_pool -- --scene ball-pool --seconds 10
//! RUST_LOG=debug cargo run --bin ball_pool -- --config physics.json --dims 6
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use glam::Vec3;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sat_impulse_engine::physics::{PhysicsConfig, PhysicsWorld, StepStats};
use sat_impulse_engine::scenes::{self, BallPoolConfig, ClothConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scene {
    /// Lattice of balls dropped into a closed arena
    BallPool,
    /// A few cube towers with projectiles fired at them
    CubeTower,
    /// Pinned cloth of distance constraints
    Cloth,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless rigid-body physics demo")]
struct Args {
    /// Scene to build
    #[arg(long, value_enum, default_value_t = Scene::BallPool)]
    scene: Scene,

    /// Optional JSON physics configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 10.0)]
    seconds: f32,

    /// Balls per lattice edge (ball-pool scene)
    #[arg(long, default_value_t = 8)]
    dims: usize,

    /// Fixed solver shuffle seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

/// `RUST_LOG` directives when set and parseable, `info` otherwise.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PhysicsConfig::from_json_file(path)
            .with_context(|| format!("loading physics config from {}", path.display()))?,
        None => PhysicsConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.solver.order = sat_impulse_engine::physics::SolverOrder::Shuffled { seed: Some(seed) };
    }
    config.excluded_tag_pairs.extend(scenes::arena_exclusions());
    config.excluded_tag_pairs.extend(scenes::cloth_exclusions());

    let mut world = PhysicsWorld::new(config)?;
    build_scene(&mut world, &args)?;
    info!(scene = ?args.scene, bodies = world.body_count(), constraints = world.constraint_count(), "Scene built");

    let timestep = world.config().timestep;
    let frames = (args.seconds / timestep).ceil() as u64;
    let frames_per_report = (1.0 / timestep).round().max(1.0) as u64;

    let started = Instant::now();
    let mut window = StatsWindow::default();
    for frame in 1..=frames {
        let report = world.step(timestep);
        window.add(world.stats(), report.substeps);

        if frame % frames_per_report == 0 {
            window.log(frame as f32 * timestep);
            window = StatsWindow::default();
        }
    }

    info!(
        simulated = args.seconds,
        wall_clock_ms = started.elapsed().as_millis() as u64,
        substeps = world.total_substeps(),
        "Simulation finished"
    );
    Ok(())
}

fn build_scene(world: &mut PhysicsWorld, args: &Args) -> Result<()> {
    match args.scene {
        Scene::BallPool => {
            let config = BallPoolConfig {
                dims: args.dims,
                ..BallPoolConfig::default()
            };
            scenes::ball_pool(world, &config);
        }
        Scene::CubeTower => {
            scenes::walled_arena(world, &scenes::ArenaConfig::default());
            for x in [-6.0, 0.0, 6.0] {
                scenes::cube_tower(world, Vec3::new(x, 0.0, 0.0), 8, 0.5);
            }
            for x in [-6.0, 0.0, 6.0] {
                scenes::spawn_projectile(world, Vec3::new(x, 3.0, 15.0), Vec3::NEG_Z, 30.0, 0.5);
            }
        }
        Scene::Cloth => {
            scenes::walled_arena(world, &scenes::ArenaConfig::default());
            scenes::constraint_cloth(world, &ClothConfig::default()).context("building cloth")?;
        }
    }
    Ok(())
}

/// Per-second aggregate of [`StepStats`].
#[derive(Debug, Default)]
struct StatsWindow {
    substeps: u32,
    pairs: usize,
    manifolds: usize,
    contacts: usize,
    broadphase: Duration,
    narrowphase: Duration,
    solver: Duration,
    integration: Duration,
}

impl StatsWindow {
    fn add(&mut self, stats: &StepStats, substeps: u32) {
        if substeps == 0 {
            return;
        }
        self.substeps += substeps;
        self.pairs += stats.candidate_pairs;
        self.manifolds += stats.manifolds;
        self.contacts += stats.contacts;
        self.broadphase += stats.broadphase_time;
        self.narrowphase += stats.narrowphase_time;
        self.solver += stats.solver_time;
        self.integration += stats.integration_time;
    }

    fn log(&self, simulated: f32) {
        let n = self.substeps.max(1) as usize;
        info!(
            t = simulated,
            substeps = self.substeps,
            avg_pairs = self.pairs / n,
            avg_manifolds = self.manifolds / n,
            avg_contacts = self.contacts / n,
            broadphase_ms = self.broadphase.as_secs_f64() * 1e3,
            narrowphase_ms = self.narrowphase.as_secs_f64() * 1e3,
            solver_ms = self.solver.as_secs_f64() * 1e3,
            integration_ms = self.integration.as_secs_f64() * 1e3,
            "Physics stats"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_log_filter_honours_rust_log() {
        assert_eq!(log_filter(Some("debug".into())).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(Some(String::new())).max_level_hint(), Some(LevelFilter::INFO));
    }
}
