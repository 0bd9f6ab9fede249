//! Simulation configuration
//!
//! Global parameters for a [`PhysicsWorld`](super::world::PhysicsWorld).
//! Everything here is plain data that round-trips through JSON so scenes can
//! ship their tuning alongside their content.
//!
//! # Example
//!
//! ```ignore
//! use sat_impulse_engine::physics::config::{PhysicsConfig, BroadphaseMode};
//!
//! let config = PhysicsConfig {
//!     broadphase: BroadphaseMode::SphereSphere,
//!     ..PhysicsConfig::default()
//! };
//! let json = config.to_json_string()?;
//! let back = PhysicsConfig::from_json_str(&json)?;
//! ```

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::error::{PhysicsError, PhysicsResult};

/// Default fixed simulation increment (seconds).
pub const DEFAULT_TIMESTEP: f32 = 1.0 / 60.0;

/// Default cap on fixed sub-steps executed per `update()` call.
pub const DEFAULT_MAX_SUBSTEPS: u32 = 5;

/// Default number of sequential-impulse sweeps per sub-step.
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 10;

/// Default octree cell capacity before subdivision.
pub const DEFAULT_OCTREE_CAPACITY: usize = 5;

/// How the broadphase proposes candidate pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BroadphaseMode {
    /// Every pair of shaped bodies is a candidate (comparison baseline).
    BruteForce,
    /// Every pair whose bounding spheres overlap (comparison baseline).
    SphereSphere,
    /// Loose octree culling.
    #[default]
    Octree,
}

/// Order in which manifolds and constraints are swept by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverOrder {
    /// Shuffle every sub-step. `seed: None` seeds from OS entropy.
    Shuffled {
        /// Optional fixed seed for reproducible runs
        seed: Option<u64>,
    },
    /// Keep insertion order (fully reproducible).
    Fixed,
}

impl Default for SolverOrder {
    fn default() -> Self {
        SolverOrder::Shuffled { seed: None }
    }
}

/// Sequential-impulse solver tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Gauss-Seidel sweeps per sub-step
    pub iterations: u32,
    /// Fraction of positional error corrected per step (Baumgarte beta)
    pub baumgarte_scalar: f32,
    /// Penetration allowed before positional correction kicks in (meters)
    pub baumgarte_slop: f32,
    /// Sweep ordering policy
    pub order: SolverOrder,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_SOLVER_ITERATIONS,
            baumgarte_scalar: 0.1,
            baumgarte_slop: 0.001,
            order: SolverOrder::default(),
        }
    }
}

/// Bounds and subdivision policy of the root octree cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Minimum corner of the root cell
    pub origin: Vec3,
    /// Size of the root cell along each axis
    pub extent: Vec3,
    /// Residents a leaf may hold before it subdivides
    pub capacity: usize,
    /// Deepest level a cell may subdivide to (root is depth 0)
    pub max_depth: u32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            origin: Vec3::splat(-50.0),
            extent: Vec3::splat(100.0),
            capacity: DEFAULT_OCTREE_CAPACITY,
            max_depth: 8,
        }
    }
}

/// Which debug primitives the world emits from `debug_draw()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugDrawFlags {
    /// Contact points and normals of this step's manifolds
    pub manifolds: bool,
    /// Persistent constraint links
    pub constraints: bool,
    /// Wireframes of every collision shape
    pub collision_volumes: bool,
    /// Resolution normal of every colliding pair
    pub collision_normals: bool,
    /// Octree cell boundaries
    pub octree: bool,
}

impl DebugDrawFlags {
    /// Everything on.
    pub fn all() -> Self {
        Self {
            manifolds: true,
            constraints: true,
            collision_volumes: true,
            collision_normals: true,
            octree: true,
        }
    }
}

/// Configuration for a physics world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Fixed simulation increment (seconds)
    pub timestep: f32,
    /// Maximum fixed sub-steps per `update()` call
    pub max_substeps: u32,
    /// Gravity acceleration vector (m/s²)
    pub gravity: Vec3,
    /// Velocity multiplier applied every sub-step (1.0 = no damping)
    pub damping: f32,
    /// Solver tuning
    pub solver: SolverConfig,
    /// Broadphase strategy
    pub broadphase: BroadphaseMode,
    /// Octree bounds and policy (used when `broadphase` is `Octree`)
    pub octree: OctreeConfig,
    /// Tag pairs that never collide, e.g. `("spawn", "invisible_wall")`
    pub excluded_tag_pairs: Vec<(String, String)>,
    /// Debug primitives to emit
    pub debug_draw: DebugDrawFlags,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            timestep: DEFAULT_TIMESTEP,
            max_substeps: DEFAULT_MAX_SUBSTEPS,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            damping: 0.999,
            solver: SolverConfig::default(),
            broadphase: BroadphaseMode::default(),
            octree: OctreeConfig::default(),
            excluded_tag_pairs: Vec::new(),
            debug_draw: DebugDrawFlags::default(),
        }
    }
}

impl PhysicsConfig {
    /// Zero gravity, no damping, fixed solver order. Handy for analytic tests.
    pub fn vacuum() -> Self {
        Self {
            gravity: Vec3::ZERO,
            damping: 1.0,
            solver: SolverConfig {
                order: SolverOrder::Fixed,
                ..SolverConfig::default()
            },
            ..Self::default()
        }
    }

    /// Parses and validates a configuration from JSON text.
    pub fn from_json_str(json: &str) -> PhysicsResult<Self> {
        let config: PhysicsConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn from_json_file(path: &Path) -> PhysicsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json_string(&self) -> PhysicsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks every field is inside its usable range.
    pub fn validate(&self) -> PhysicsResult<()> {
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "timestep must be positive and finite, got {}",
                self.timestep
            )));
        }
        if self.max_substeps == 0 {
            return Err(PhysicsError::InvalidConfig(
                "max_substeps must be at least 1".to_string(),
            ));
        }
        check_damping(self.damping)?;
        if self.solver.iterations == 0 {
            return Err(PhysicsError::InvalidConfig(
                "solver.iterations must be at least 1".to_string(),
            ));
        }
        if self.octree.capacity == 0 {
            return Err(PhysicsError::InvalidConfig(
                "octree.capacity must be at least 1".to_string(),
            ));
        }
        if self.octree.extent.min_element() <= 0.0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "octree.extent must be positive on every axis, got {}",
                self.octree.extent
            )));
        }
        Ok(())
    }
}

/// Damping multiplies velocity every sub-step and must lie in (0, 1].
pub(crate) fn check_damping(damping: f32) -> PhysicsResult<()> {
    if !(damping > 0.0 && damping <= 1.0) {
        return Err(PhysicsError::InvalidConfig(format!(
            "damping must be in (0, 1], got {damping}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PhysicsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_substeps, 5);
        assert_eq!(config.solver.iterations, 10);
        assert_eq!(config.octree.capacity, 5);
        assert!((config.timestep - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_json_round_trip_preserves_fields() {
        let config = PhysicsConfig {
            broadphase: BroadphaseMode::SphereSphere,
            excluded_tag_pairs: vec![("spawn".into(), "wall".into())],
            solver: SolverConfig {
                order: SolverOrder::Shuffled { seed: Some(7) },
                ..SolverConfig::default()
            },
            ..PhysicsConfig::default()
        };
        let json = config.to_json_string().unwrap();
        let back = PhysicsConfig::from_json_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = PhysicsConfig::from_json_str(r#"{ "max_substeps": 3 }"#).unwrap();
        assert_eq!(config.max_substeps, 3);
        assert_eq!(config.broadphase, BroadphaseMode::Octree);
        assert_eq!(config.gravity, Vec3::new(0.0, -9.81, 0.0));
    }

    #[test]
    fn test_rejects_zero_timestep() {
        let result = PhysicsConfig::from_json_str(r#"{ "timestep": 0.0 }"#);
        assert!(matches!(result, Err(PhysicsError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_json() {
        let result = PhysicsConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(PhysicsError::Json(_))));
    }

    #[test]
    fn test_rejects_degenerate_octree() {
        let mut config = PhysicsConfig::default();
        config.octree.extent = Vec3::new(10.0, 0.0, 10.0);
        assert!(config.validate().is_err());
        config.octree.extent = Vec3::splat(10.0);
        config.octree.capacity = 0;
        assert!(config.validate().is_err());
    }
}
