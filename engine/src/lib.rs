//! SAT Impulse Engine Library
//!
//! A real-time rigid-body physics core. Bodies are culled by a loose octree,
//! tested with the separating axis theorem, given clipped contact manifolds
//! and resolved by a sequential-impulse solver inside a fixed-timestep loop.
//!
//! Rendering is out of scope: the world emits poses through per-body update
//! callbacks and debug geometry through [`physics::DebugDrawList`].
//!
//! # Modules
//!
//! - [`physics`] - Bodies, shapes, detection, solver and the world loop
//! - [`scenes`] - Ready-made demo scenes (ball pool, towers, cloth, arena)
//!
//! # Example
//!
//! ```ignore
//! use sat_impulse_engine::physics::{PhysicsConfig, PhysicsWorld};
//! use sat_impulse_engine::scenes;
//!
//! let mut world = PhysicsWorld::new(PhysicsConfig::default())?;
//! scenes::ball_pool(&mut world, &scenes::BallPoolConfig::default());
//!
//! for _ in 0..600 {
//!     let report = world.step(1.0 / 60.0);
//!     if report.fell_behind {
//!         // Simulation is slower than real time
//!     }
//! }
//! ```

pub mod physics;
pub mod scenes;

// Re-export the world entry points at crate level for convenience
pub use physics::{PhysicsConfig, PhysicsError, PhysicsResult, PhysicsWorld, RigidBody};
