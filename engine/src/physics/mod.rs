//! Rigid-body physics core
//!
//! A discrete-time rigid-body simulation: octree broadphase, SAT narrowphase,
//! clipped contact manifolds and a sequential-impulse solver, driven by a
//! fixed-timestep world loop.
//!
//! # Unit System
//!
//! **1 unit = 1 meter** (SI units throughout)
//!
//! - Distances in meters
//! - Velocities in m/s
//! - Accelerations in m/s²
//! - Mass in kg (bodies store inverse mass; 0 = static)
//!
//! # Submodules
//!
//! - [`types`] - glam re-exports, [`Pose`], body/constraint handles
//! - [`error`] - [`PhysicsError`]
//! - [`config`] - [`PhysicsConfig`] and nested tuning structs (JSON loadable)
//! - [`geometry`] - planes, polygon clipping, closest-point queries
//! - [`shape`] - [`CollisionShape`] (sphere, cuboid)
//! - [`body`] - [`RigidBody`] and its integrator
//! - [`octree`] - loose octree spatial index
//! - [`broadphase`] - candidate pair generation
//! - [`sat`] - separating axis narrowphase
//! - [`manifold`] - contact generation and contact solving
//! - [`constraint`] - shared solver trait, [`DistanceConstraint`]
//! - [`raycast`] - ray picking
//! - [`debug_draw`] - renderer-agnostic debug primitives
//! - [`world`] - [`PhysicsWorld`] orchestration

pub mod body;
pub mod broadphase;
pub mod config;
pub mod constraint;
pub mod debug_draw;
pub mod error;
pub mod geometry;
pub mod manifold;
pub mod octree;
pub mod raycast;
pub mod sat;
pub mod shape;
pub mod types;
pub mod world;

// Re-export commonly used types at the physics module level
pub use body::{BodySet, IntegrationParams, RigidBody};
pub use broadphase::CollisionPair;
pub use config::{BroadphaseMode, DebugDrawFlags, OctreeConfig, PhysicsConfig, SolverConfig, SolverOrder};
pub use constraint::{Constraint, DistanceConstraint};
pub use debug_draw::{DebugDrawList, DebugVertex};
pub use error::{PhysicsError, PhysicsResult};
pub use manifold::{ContactPoint, Manifold};
pub use octree::Octree;
pub use raycast::RayHit;
pub use sat::CollisionData;
pub use shape::CollisionShape;
pub use types::{BodyHandle, ConstraintHandle, Mat3, Pose, Quat, Vec3};
pub use world::{PhysicsWorld, StepStats, UpdateReport, WorldCommand};
