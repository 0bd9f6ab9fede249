//! Rigid bodies and their integrator
//!
//! A [`RigidBody`] holds kinematic state (pose, velocities), dynamic properties
//! (inverse mass and inertia, restitution, friction) and the optional collision
//! shape used by detection.
//!
//! # Integration
//!
//! Semi-implicit Euler split in two halves so the solver can run between them:
//! - [`RigidBody::integrate_velocity`]: gravity, accumulated force/torque, damping
//! - [`RigidBody::integrate_position`]: velocity -> position, angular velocity
//!   -> orientation through the quaternion derivative, then renormalise
//!
//! # Example
//!
//! ```ignore
//! use sat_impulse_engine::physics::body::RigidBody;
//! use glam::Vec3;
//!
//! let ball = RigidBody::sphere(Vec3::new(0.0, 10.0, 0.0), 0.5, 1.0)
//!     .with_restitution(0.8)
//!     .with_tag("ball");
//! ```

use glam::{Mat3, Quat, Vec3};
use slotmap::SlotMap;

use super::shape::CollisionShape;
use super::types::{BodyHandle, Pose};

/// Arena of all bodies owned by a world.
pub type BodySet = SlotMap<BodyHandle, RigidBody>;

/// Invoked after every position integration with the body's new pose.
pub type UpdateCallback = Box<dyn FnMut(BodyHandle, &Pose) + Send>;

/// Invoked once per colliding pair as `(this, other)`; `false` vetoes the manifold.
pub type CollisionCallback = Box<dyn FnMut(BodyHandle, BodyHandle) -> bool + Send>;

/// World-wide parameters the integrator needs.
///
/// Passed explicitly instead of reading a global world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationParams {
    /// Gravity acceleration (m/s²)
    pub gravity: Vec3,
    /// Velocity multiplier applied per integration (1.0 = none)
    pub damping: f32,
}

impl Default for IntegrationParams {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            damping: 0.999,
        }
    }
}

/// A simulated rigid body.
pub struct RigidBody {
    position: Vec3,
    orientation: Quat,
    /// Linear velocity (m/s)
    pub linear_velocity: Vec3,
    /// Angular velocity (rad/s, world space)
    pub angular_velocity: Vec3,
    /// Force accumulated for the next velocity integration (N)
    pub force: Vec3,
    /// Torque accumulated for the next velocity integration (N·m)
    pub torque: Vec3,
    inverse_mass: f32,
    inverse_inertia: Mat3,
    shape: Option<CollisionShape>,
    /// Coefficient of restitution (0 = inelastic, 1 = elastic)
    pub restitution: f32,
    /// Coulomb friction coefficient
    pub friction: f32,
    /// Optional label used by collision exclusion rules
    pub tag: Option<String>,
    on_update: Option<UpdateCallback>,
    on_collision: Option<CollisionCallback>,
}

impl std::fmt::Debug for RigidBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigidBody")
            .field("position", &self.position)
            .field("orientation", &self.orientation)
            .field("linear_velocity", &self.linear_velocity)
            .field("angular_velocity", &self.angular_velocity)
            .field("inverse_mass", &self.inverse_mass)
            .field("shape", &self.shape)
            .field("tag", &self.tag)
            .field("has_update_callback", &self.on_update.is_some())
            .field("has_collision_callback", &self.on_collision.is_some())
            .finish()
    }
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            inverse_mass: 0.0,
            inverse_inertia: Mat3::ZERO,
            shape: None,
            restitution: 0.5,
            friction: 0.5,
            tag: None,
            on_update: None,
            on_collision: None,
        }
    }
}

impl RigidBody {
    /// Creates a shapeless body. It integrates but never collides.
    pub fn new(position: Vec3, inverse_mass: f32) -> Self {
        let mut body = Self {
            position,
            ..Self::default()
        };
        body.set_inverse_mass(inverse_mass);
        body
    }

    /// Creates a body with the given shape and inverse mass (0 = static).
    pub fn with_shape(position: Vec3, shape: CollisionShape, inverse_mass: f32) -> Self {
        let mut body = Self {
            position,
            shape: Some(shape),
            ..Self::default()
        };
        body.set_inverse_mass(inverse_mass);
        body
    }

    /// Creates a sphere body.
    pub fn sphere(position: Vec3, radius: f32, inverse_mass: f32) -> Self {
        Self::with_shape(position, CollisionShape::sphere(radius), inverse_mass)
    }

    /// Creates a cuboid body.
    pub fn cuboid(position: Vec3, half_extents: Vec3, inverse_mass: f32) -> Self {
        Self::with_shape(position, CollisionShape::cuboid(half_extents), inverse_mass)
    }

    /// Builder: sets the restitution coefficient.
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Builder: sets the friction coefficient.
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Builder: sets the collision tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Builder: sets the initial orientation.
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation.normalize();
        self
    }

    /// Builder: sets the initial linear velocity.
    pub fn with_linear_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    /// Registers the pose-update listener (e.g. a render transform).
    pub fn set_update_callback(&mut self, callback: impl FnMut(BodyHandle, &Pose) + Send + 'static) {
        self.on_update = Some(Box::new(callback));
    }

    /// Registers the per-pair collision veto callback.
    pub fn set_collision_callback(
        &mut self,
        callback: impl FnMut(BodyHandle, BodyHandle) -> bool + Send + 'static,
    ) {
        self.on_collision = Some(Box::new(callback));
    }

    /// Asks this body whether it accepts a collision with `other`.
    ///
    /// Bodies without a callback always accept.
    pub fn fire_collision_event(&mut self, this: BodyHandle, other: BodyHandle) -> bool {
        match self.on_collision.as_mut() {
            Some(callback) => callback(this, other),
            None => true,
        }
    }

    /// Current world position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Current orientation.
    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Current pose.
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.orientation)
    }

    /// Teleports the body (external control, e.g. dragging).
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Overrides the orientation; the value is renormalised.
    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation.normalize();
    }

    /// Inverse mass; zero means static.
    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    /// True if the body has infinite mass.
    pub fn is_static(&self) -> bool {
        self.inverse_mass <= 0.0
    }

    /// Sets the inverse mass (clamped to >= 0) and rebuilds the inverse inertia.
    pub fn set_inverse_mass(&mut self, inverse_mass: f32) {
        self.inverse_mass = inverse_mass.max(0.0);
        self.rebuild_inverse_inertia();
    }

    /// Recomputes the body-local inverse inertia from the shape and inverse mass.
    ///
    /// Shapeless dynamic bodies are treated as unit spheres.
    pub fn rebuild_inverse_inertia(&mut self) {
        let shape = self.shape.unwrap_or(CollisionShape::sphere(1.0));
        self.inverse_inertia = shape.inverse_inertia(self.inverse_mass);
    }

    /// Body-local inverse inertia tensor.
    pub fn inverse_inertia(&self) -> Mat3 {
        self.inverse_inertia
    }

    /// Inverse inertia rotated into world space: `R · I⁻¹ · Rᵀ`.
    pub fn inverse_inertia_world(&self) -> Mat3 {
        let rotation = Mat3::from_quat(self.orientation);
        rotation * self.inverse_inertia * rotation.transpose()
    }

    /// Collision shape, if any.
    pub fn shape(&self) -> Option<&CollisionShape> {
        self.shape.as_ref()
    }

    /// Replaces the shape and rebuilds the inverse inertia.
    pub fn set_shape(&mut self, shape: Option<CollisionShape>) {
        self.shape = shape;
        self.rebuild_inverse_inertia();
    }

    /// Bounding radius for cheap distance tests (0 without a shape).
    pub fn bounding_radius(&self) -> f32 {
        self.shape.map_or(0.0, |s| s.bounding_radius())
    }

    /// Velocity of the material point at world offset `r` from the centre.
    pub fn velocity_at(&self, r: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(r)
    }

    /// Applies an impulse at world offset `r` from the centre of mass.
    pub fn apply_impulse(&mut self, impulse: Vec3, r: Vec3) {
        self.linear_velocity += impulse * self.inverse_mass;
        self.angular_velocity += self.inverse_inertia_world() * r.cross(impulse);
    }

    /// Adds to the force accumulated for the next step.
    pub fn add_force(&mut self, force: Vec3) {
        self.force += force;
    }

    /// Adds to the torque accumulated for the next step.
    pub fn add_torque(&mut self, torque: Vec3) {
        self.torque += torque;
    }

    /// First integration half: forces and gravity into velocities.
    pub fn integrate_velocity(&mut self, params: &IntegrationParams, dt: f32) {
        if self.inverse_mass > 0.0 {
            self.linear_velocity += params.gravity * dt;
        }
        self.linear_velocity += self.force * self.inverse_mass * dt;
        self.linear_velocity *= params.damping;

        self.angular_velocity += self.inverse_inertia_world() * self.torque * dt;
        self.angular_velocity *= params.damping;
    }

    /// Second integration half: velocities into pose, then notify the listener.
    pub fn integrate_position(&mut self, handle: BodyHandle, dt: f32) {
        self.position += self.linear_velocity * dt;

        // q' = q + ½ (ω, 0) q dt
        let half_spin = self.angular_velocity * (dt * 0.5);
        let spin = Quat::from_xyzw(half_spin.x, half_spin.y, half_spin.z, 0.0) * self.orientation;
        self.orientation = (self.orientation + spin).normalize();

        let pose = self.pose();
        if let Some(callback) = self.on_update.as_mut() {
            callback(handle, &pose);
        }
    }

    /// Clears accumulated force and torque.
    pub fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_static_body_ignores_gravity() {
        let mut body = RigidBody::sphere(Vec3::new(0.0, 5.0, 0.0), 1.0, 0.0);
        let params = IntegrationParams::default();
        for _ in 0..120 {
            body.integrate_velocity(&params, DT);
            body.integrate_position(BodyHandle::default(), DT);
        }
        assert_eq!(body.position(), Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(body.linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_constant_force_matches_semi_implicit_euler() {
        let params = IntegrationParams {
            gravity: Vec3::ZERO,
            damping: 1.0,
        };
        let inv_mass = 0.5;
        let force = Vec3::new(4.0, 0.0, -2.0);
        let v0 = Vec3::new(1.0, 2.0, 0.0);
        let mut body = RigidBody::sphere(Vec3::ZERO, 1.0, inv_mass).with_linear_velocity(v0);
        body.add_force(force);

        let steps = 30;
        for _ in 0..steps {
            body.integrate_velocity(&params, DT);
            body.integrate_position(BodyHandle::default(), DT);
        }

        let a = force * inv_mass;
        let n = steps as f32;
        let expected_v = v0 + a * DT * n;
        // x_n = x0 + Σ_{k=1..n} (v0 + a k dt) dt
        let expected_x = v0 * DT * n + a * DT * DT * n * (n + 1.0) * 0.5;
        assert!((body.linear_velocity - expected_v).length() < 1e-4);
        assert!((body.position() - expected_x).length() < 1e-4, "got {:?}", body.position());
    }

    #[test]
    fn test_orientation_stays_normalised_while_spinning() {
        let mut body = RigidBody::cuboid(Vec3::ZERO, Vec3::ONE, 1.0);
        body.angular_velocity = Vec3::new(3.0, -7.0, 11.0);
        for _ in 0..500 {
            body.integrate_position(BodyHandle::default(), DT);
        }
        assert!((body.orientation().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_set_inverse_mass_rebuilds_inertia() {
        let mut body = RigidBody::cuboid(Vec3::ZERO, Vec3::ONE, 1.0);
        assert_ne!(body.inverse_inertia(), Mat3::ZERO);
        body.set_inverse_mass(0.0);
        assert_eq!(body.inverse_inertia(), Mat3::ZERO);
        body.set_inverse_mass(-3.0);
        assert_eq!(body.inverse_mass(), 0.0);
    }

    #[test]
    fn test_update_callback_fires_once_per_integration() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut body = RigidBody::sphere(Vec3::ZERO, 1.0, 1.0).with_linear_velocity(Vec3::X);
        body.set_update_callback(move |_, pose| sink.lock().unwrap().push(pose.position));

        body.integrate_position(BodyHandle::default(), 1.0);
        body.integrate_position(BodyHandle::default(), 1.0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_collision_event_defaults_to_accept() {
        let mut body = RigidBody::sphere(Vec3::ZERO, 1.0, 1.0);
        assert!(body.fire_collision_event(BodyHandle::default(), BodyHandle::default()));
        body.set_collision_callback(|_, _| false);
        assert!(!body.fire_collision_event(BodyHandle::default(), BodyHandle::default()));
    }

    #[test]
    fn test_apply_impulse_off_centre_spins() {
        let mut body = RigidBody::sphere(Vec3::ZERO, 1.0, 1.0);
        body.apply_impulse(Vec3::Z, Vec3::X);
        assert_eq!(body.linear_velocity, Vec3::Z);
        // r × J = X × Z = -Y
        assert!(body.angular_velocity.y < 0.0);
    }
}
