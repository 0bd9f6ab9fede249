//! Contact manifolds
//!
//! A [`Manifold`] is the set of contact points between two colliding bodies
//! for one step. It is built from the SAT result by clipping the incident face
//! against the reference face, then solved like any other [`Constraint`].
//!
//! # Contact generation
//!
//! 1. Fetch each shape's face towards the other along the resolution normal.
//! 2. A single-point face (sphere) yields exactly one contact.
//! 3. Otherwise the face more parallel to the normal is the reference; the
//!    other (incident) face is clipped against the reference side planes, then
//!    against the reference plane itself, discarding points in front of it.
//! 4. Each surviving point with negative depth becomes a contact.
//!
//! # Solving
//!
//! Per contact, sequential impulses along the normal (clamped to push only)
//! plus Coulomb friction on two tangent directions. Positional drift is
//! corrected with a Baumgarte velocity bias.

use glam::Vec3;
use smallvec::SmallVec;

use super::body::{BodySet, RigidBody};
use super::config::SolverConfig;
use super::constraint::{Constraint, apply_pair_impulse, inverse_effective_mass, relative_velocity};
use super::debug_draw::{DebugDrawList, MANIFOLD_COLOR};
use super::geometry::{ClipMode, Plane, clip_polygon, closest_point_on_polygon};
use super::sat::CollisionData;
use super::types::BodyHandle;

/// Contact list; inline capacity covers a fully clipped box face.
pub type ContactList = SmallVec<[ContactPoint; 8]>;

/// A single point of contact between two bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// World-space point on body A's surface
    pub point_on_a: Vec3,
    /// World-space point on body B's surface
    pub point_on_b: Vec3,
    /// Unit contact normal, from A towards B
    pub normal: Vec3,
    /// Signed depth along `normal` (negative = overlapping)
    pub penetration: f32,

    r_a: Vec3,
    r_b: Vec3,
    tangents: [Vec3; 2],
    normal_mass: f32,
    tangent_mass: [f32; 2],
    bias: f32,
    accumulated_normal: f32,
    accumulated_tangent: [f32; 2],
}

impl ContactPoint {
    /// Creates a contact with cleared solver state.
    pub fn new(point_on_a: Vec3, point_on_b: Vec3, normal: Vec3, penetration: f32) -> Self {
        Self {
            point_on_a,
            point_on_b,
            normal,
            penetration,
            r_a: Vec3::ZERO,
            r_b: Vec3::ZERO,
            tangents: [Vec3::ZERO; 2],
            normal_mass: 0.0,
            tangent_mass: [0.0; 2],
            bias: 0.0,
            accumulated_normal: 0.0,
            accumulated_tangent: [0.0; 2],
        }
    }

    /// Total normal impulse applied this step.
    pub fn accumulated_normal_impulse(&self) -> f32 {
        self.accumulated_normal
    }
}

/// Contact manifold between two bodies for a single step.
#[derive(Debug, Clone)]
pub struct Manifold {
    body_a: BodyHandle,
    body_b: BodyHandle,
    contacts: ContactList,
    friction: f32,
    restitution: f32,
}

impl Manifold {
    /// Generates contacts for a colliding pair.
    ///
    /// Returns `None` when either body has no shape, the pair is not
    /// interpenetrating, or clipping leaves no contact.
    pub fn build(
        handle_a: BodyHandle,
        a: &RigidBody,
        handle_b: BodyHandle,
        b: &RigidBody,
        collision: &CollisionData,
    ) -> Option<Self> {
        if collision.penetration >= 0.0 {
            return None;
        }
        let contacts = generate_contacts(a, b, collision)?;
        if contacts.is_empty() {
            return None;
        }
        Some(Self {
            body_a: handle_a,
            body_b: handle_b,
            contacts,
            friction: (a.friction * b.friction).sqrt(),
            restitution: a.restitution * b.restitution,
        })
    }

    /// Contact points.
    pub fn contacts(&self) -> &[ContactPoint] {
        &self.contacts
    }

    /// Combined friction coefficient.
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Combined restitution coefficient.
    pub fn restitution(&self) -> f32 {
        self.restitution
    }
}

fn generate_contacts(a: &RigidBody, b: &RigidBody, collision: &CollisionData) -> Option<ContactList> {
    let shape_a = a.shape()?;
    let shape_b = b.shape()?;
    let normal = collision.normal;
    let depth = collision.penetration;

    let face_a = shape_a.reference_face(&a.pose(), normal);
    let face_b = shape_b.reference_face(&b.pose(), -normal);

    let mut contacts = ContactList::new();
    if face_a.polygon.is_empty() || face_b.polygon.is_empty() {
        return Some(contacts);
    }
    if face_a.polygon.len() == 1 {
        let p = face_a.polygon[0];
        contacts.push(ContactPoint::new(p, p + normal * depth, normal, depth));
        return Some(contacts);
    }
    if face_b.polygon.len() == 1 {
        let p = face_b.polygon[0];
        contacts.push(ContactPoint::new(p - normal * depth, p, normal, depth));
        return Some(contacts);
    }

    // The face more parallel to the normal is the reference
    let flipped = normal.dot(face_a.normal).abs() < normal.dot(face_b.normal).abs();
    let (reference, incident) = if flipped {
        (&face_b, &face_a)
    } else {
        (&face_a, &face_b)
    };

    let clipped = clip_polygon(&incident.polygon, &reference.adjacent_planes, ClipMode::Clip);
    let reference_plane = Plane::from_point_normal(reference.polygon[0], -reference.normal);
    let clipped = clip_polygon(&clipped, &[reference_plane], ClipMode::Discard);

    for point in clipped {
        let on_reference = closest_point_on_polygon(point, &reference.polygon);
        let mut penetration = (point - on_reference).dot(normal);
        if flipped {
            penetration = -penetration;
        }
        if penetration >= 0.0 {
            continue;
        }
        let contact = if flipped {
            // Incident point belongs to A; B's face lies back along -normal
            ContactPoint::new(point, point + normal * penetration, normal, penetration)
        } else {
            // Incident point belongs to B; A's face lies ahead along +normal
            ContactPoint::new(point - normal * penetration, point, normal, penetration)
        };
        contacts.push(contact);
    }
    Some(contacts)
}

impl Constraint for Manifold {
    fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.body_a, self.body_b)
    }

    fn pre_solver_step(&mut self, bodies: &BodySet, dt: f32, solver: &SolverConfig) {
        let (Some(a), Some(b)) = (bodies.get(self.body_a), bodies.get(self.body_b)) else {
            self.contacts.clear();
            return;
        };
        let contact_count = self.contacts.len() as f32;

        for contact in &mut self.contacts {
            contact.accumulated_normal = 0.0;
            contact.accumulated_tangent = [0.0; 2];
            contact.r_a = contact.point_on_a - a.position();
            contact.r_b = contact.point_on_b - b.position();

            let n = contact.normal;
            let inv_mass = inverse_effective_mass(a, contact.r_a, b, contact.r_b, n);
            contact.normal_mass = if inv_mass > 0.0 { 1.0 / inv_mass } else { 0.0 };

            let (t1, t2) = n.any_orthonormal_pair();
            contact.tangents = [t1, t2];
            for (mass, tangent) in contact.tangent_mass.iter_mut().zip(contact.tangents) {
                let inv = inverse_effective_mass(a, contact.r_a, b, contact.r_b, tangent);
                *mass = if inv > 0.0 { 1.0 / inv } else { 0.0 };
            }

            let baumgarte = (solver.baumgarte_scalar / dt)
                * (-(contact.penetration + solver.baumgarte_slop)).max(0.0);

            let approach = relative_velocity(a, contact.r_a, b, contact.r_b).dot(n);
            let bounce = (-self.restitution * approach).max(0.0) / contact_count;

            contact.bias = baumgarte + bounce;
        }
    }

    fn apply_impulse(&mut self, bodies: &mut BodySet) {
        if self.contacts.is_empty() {
            return;
        }
        let Some([a, b]) = bodies.get_disjoint_mut([self.body_a, self.body_b]) else {
            return;
        };

        for contact in &mut self.contacts {
            if contact.normal_mass <= 0.0 {
                continue;
            }
            let n = contact.normal;

            let vn = relative_velocity(a, contact.r_a, b, contact.r_b).dot(n);
            let lambda = (contact.bias - vn) * contact.normal_mass;
            let previous = contact.accumulated_normal;
            contact.accumulated_normal = (previous + lambda).max(0.0);
            let applied = contact.accumulated_normal - previous;
            apply_pair_impulse(a, contact.r_a, b, contact.r_b, n * applied);

            let max_friction = self.friction * contact.accumulated_normal;
            for i in 0..2 {
                let tangent = contact.tangents[i];
                let vt = relative_velocity(a, contact.r_a, b, contact.r_b).dot(tangent);
                let lambda = -vt * contact.tangent_mass[i];
                let previous = contact.accumulated_tangent[i];
                contact.accumulated_tangent[i] =
                    (previous + lambda).clamp(-max_friction, max_friction);
                let applied = contact.accumulated_tangent[i] - previous;
                apply_pair_impulse(a, contact.r_a, b, contact.r_b, tangent * applied);
            }
        }
    }

    fn debug_draw(&self, _bodies: &BodySet, out: &mut DebugDrawList) {
        for contact in &self.contacts {
            out.point(contact.point_on_a, 0.05, MANIFOLD_COLOR);
            out.point(contact.point_on_b, 0.05, MANIFOLD_COLOR);
            out.line(contact.point_on_a, contact.point_on_b, MANIFOLD_COLOR);
        }
        // Fan across the contact patch
        if let Some((first, rest)) = self.contacts.split_first() {
            for pair in rest.windows(2) {
                out.triangle(first.point_on_b, pair[0].point_on_b, pair[1].point_on_b, MANIFOLD_COLOR);
            }
        }
    }
}
