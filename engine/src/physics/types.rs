//! Physics type re-exports and shared handles
//!
//! This module provides the core mathematical types used throughout
//! the physics system, re-exported from the glam library, plus the
//! arena handles used to address bodies and constraints.

pub use glam::{Mat3, Quat, Vec3};

use slotmap::new_key_type;

new_key_type! {
    /// Stable handle to a [`RigidBody`](super::body::RigidBody) owned by the world.
    ///
    /// Removing a body invalidates its handle; stale handles simply fail lookups.
    pub struct BodyHandle;

    /// Stable handle to a persistent constraint owned by the world.
    pub struct ConstraintHandle;
}

/// World-space placement of a body: where it is and how it is rotated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Centre of mass in world space (meters)
    pub position: Vec3,
    /// Unit orientation quaternion
    pub orientation: Quat,
}

impl Pose {
    /// Creates a pose from a position and orientation.
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Transforms a body-local point into world space.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * local
    }

    /// Transforms a world-space point into body-local space.
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.orientation.inverse() * (world - self.position)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}
