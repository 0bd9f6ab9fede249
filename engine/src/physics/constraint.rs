//! Solver constraints
//!
//! Contact manifolds and persistent joints share one capability, the
//! [`Constraint`] trait: precompute step-local terms once, then apply one
//! Gauss-Seidel relaxation impulse per solver iteration.
//!
//! Constraints address their bodies by [`BodyHandle`]. A handle that no longer
//! resolves makes the constraint inert instead of dangling.

use glam::Vec3;

use super::body::{BodySet, RigidBody};
use super::config::SolverConfig;
use super::debug_draw::{CONSTRAINT_COLOR, DebugDrawList};
use super::error::{PhysicsError, PhysicsResult};
use super::types::BodyHandle;

/// Shared solving capability of manifolds and persistent constraints.
pub trait Constraint: Send {
    /// The two bodies this constraint couples.
    fn bodies(&self) -> (BodyHandle, BodyHandle);

    /// Precomputes effective masses and bias terms for this sub-step.
    fn pre_solver_step(&mut self, bodies: &BodySet, dt: f32, solver: &SolverConfig);

    /// Applies one relaxation impulse using the latest velocities.
    fn apply_impulse(&mut self, bodies: &mut BodySet);

    /// Emits debug primitives. Default draws nothing.
    fn debug_draw(&self, _bodies: &BodySet, _out: &mut DebugDrawList) {}
}

/// Scalar effective mass along `axis` for impulses applied at lever arms
/// `r_a` and `r_b`.
///
/// Returns the denominator `1/m_eff`; zero when both bodies are immovable.
pub fn inverse_effective_mass(
    a: &RigidBody,
    r_a: Vec3,
    b: &RigidBody,
    r_b: Vec3,
    axis: Vec3,
) -> f32 {
    let angular_a = (a.inverse_inertia_world() * r_a.cross(axis)).cross(r_a);
    let angular_b = (b.inverse_inertia_world() * r_b.cross(axis)).cross(r_b);
    a.inverse_mass() + b.inverse_mass() + axis.dot(angular_a + angular_b)
}

/// Relative velocity of the anchor on B with respect to the anchor on A.
pub fn relative_velocity(a: &RigidBody, r_a: Vec3, b: &RigidBody, r_b: Vec3) -> Vec3 {
    b.velocity_at(r_b) - a.velocity_at(r_a)
}

/// Applies `impulse` to B at `r_b` and its opposite to A at `r_a`.
pub fn apply_pair_impulse(a: &mut RigidBody, r_a: Vec3, b: &mut RigidBody, r_b: Vec3, impulse: Vec3) {
    a.apply_impulse(-impulse, r_a);
    b.apply_impulse(impulse, r_b);
}

/// Keeps two anchor points at a fixed distance (a rigid rod).
///
/// Anchors are stored in body-local space; the rest length is the anchor
/// distance at creation unless overridden.
#[derive(Debug, Clone)]
pub struct DistanceConstraint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    local_anchor_a: Vec3,
    local_anchor_b: Vec3,
    rest_length: f32,

    // Step-local solver state
    r_a: Vec3,
    r_b: Vec3,
    axis: Vec3,
    inverse_mass_sum: f32,
    bias: f32,
    accumulated_impulse: f32,
}

impl DistanceConstraint {
    /// Links `anchor_a` on body `a` to `anchor_b` on body `b` (world space).
    ///
    /// # Errors
    ///
    /// [`PhysicsError::UnknownBody`] if either handle is not in `bodies`.
    pub fn new(
        a: BodyHandle,
        b: BodyHandle,
        anchor_a: Vec3,
        anchor_b: Vec3,
        bodies: &BodySet,
    ) -> PhysicsResult<Self> {
        let body_a = bodies.get(a).ok_or(PhysicsError::UnknownBody(a))?;
        let body_b = bodies.get(b).ok_or(PhysicsError::UnknownBody(b))?;

        Ok(Self {
            body_a: a,
            body_b: b,
            local_anchor_a: body_a.pose().to_local(anchor_a),
            local_anchor_b: body_b.pose().to_local(anchor_b),
            rest_length: (anchor_b - anchor_a).length(),
            r_a: Vec3::ZERO,
            r_b: Vec3::ZERO,
            axis: Vec3::ZERO,
            inverse_mass_sum: 0.0,
            bias: 0.0,
            accumulated_impulse: 0.0,
        })
    }

    /// Links the two body centres.
    pub fn between_centres(a: BodyHandle, b: BodyHandle, bodies: &BodySet) -> PhysicsResult<Self> {
        let pa = bodies.get(a).ok_or(PhysicsError::UnknownBody(a))?.position();
        let pb = bodies.get(b).ok_or(PhysicsError::UnknownBody(b))?.position();
        Self::new(a, b, pa, pb, bodies)
    }

    /// Builder: overrides the rest length.
    pub fn with_rest_length(mut self, rest_length: f32) -> Self {
        self.rest_length = rest_length.max(0.0);
        self
    }

    /// Target anchor distance.
    pub fn rest_length(&self) -> f32 {
        self.rest_length
    }

    /// World-space anchors, if both bodies still exist.
    pub fn world_anchors(&self, bodies: &BodySet) -> Option<(Vec3, Vec3)> {
        let a = bodies.get(self.body_a)?;
        let b = bodies.get(self.body_b)?;
        Some((
            a.pose().to_world(self.local_anchor_a),
            b.pose().to_world(self.local_anchor_b),
        ))
    }

    /// Current anchor distance, if both bodies still exist.
    pub fn current_length(&self, bodies: &BodySet) -> Option<f32> {
        self.world_anchors(bodies).map(|(a, b)| (b - a).length())
    }

    /// Target separation speed from the last `pre_solver_step` minus the
    /// current one. `None` while the constraint is inert.
    pub fn velocity_error(&self, bodies: &BodySet) -> Option<f32> {
        if self.inverse_mass_sum <= 0.0 {
            return None;
        }
        let a = bodies.get(self.body_a)?;
        let b = bodies.get(self.body_b)?;
        Some(self.bias - relative_velocity(a, self.r_a, b, self.r_b).dot(self.axis))
    }
}

impl Constraint for DistanceConstraint {
    fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.body_a, self.body_b)
    }

    fn pre_solver_step(&mut self, bodies: &BodySet, dt: f32, solver: &SolverConfig) {
        self.accumulated_impulse = 0.0;
        self.inverse_mass_sum = 0.0;

        let (Some(a), Some(b)) = (bodies.get(self.body_a), bodies.get(self.body_b)) else {
            return;
        };

        let anchor_a = a.pose().to_world(self.local_anchor_a);
        let anchor_b = b.pose().to_world(self.local_anchor_b);
        let delta = anchor_b - anchor_a;
        let length = delta.length();

        self.axis = delta.normalize_or_zero();
        if self.axis == Vec3::ZERO {
            return;
        }
        self.r_a = anchor_a - a.position();
        self.r_b = anchor_b - b.position();
        self.inverse_mass_sum = inverse_effective_mass(a, self.r_a, b, self.r_b, self.axis);

        // Baumgarte: drive the separation speed towards closing the length error
        self.bias = -(solver.baumgarte_scalar / dt) * (length - self.rest_length);
    }

    fn apply_impulse(&mut self, bodies: &mut BodySet) {
        if self.inverse_mass_sum <= 0.0 {
            return;
        }
        let Some([a, b]) = bodies.get_disjoint_mut([self.body_a, self.body_b]) else {
            return;
        };

        let velocity = relative_velocity(a, self.r_a, b, self.r_b).dot(self.axis);
        let lambda = (self.bias - velocity) / self.inverse_mass_sum;
        self.accumulated_impulse += lambda;

        apply_pair_impulse(a, self.r_a, b, self.r_b, self.axis * lambda);
    }

    fn debug_draw(&self, bodies: &BodySet, out: &mut DebugDrawList) {
        if let Some((anchor_a, anchor_b)) = self.world_anchors(bodies) {
            out.line(anchor_a, anchor_b, CONSTRAINT_COLOR);
            out.point(anchor_a, 0.05, CONSTRAINT_COLOR);
            out.point(anchor_b, 0.05, CONSTRAINT_COLOR);
        }
    }
}
