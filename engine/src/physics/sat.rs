//! Separating Axis Theorem narrowphase
//!
//! Two convex shapes are disjoint iff some axis separates their projections.
//! The detector tests:
//!
//! 1. every candidate axis each shape proposes against the other
//!    ([`CollisionShape::collision_axes`]),
//! 2. the normalised cross product of every axis from A with every axis from B
//!    (edge-edge separation for polyhedra),
//!
//! after dropping near-zero axes and near-duplicates (parallel or antiparallel).
//!
//! The first separating axis ends the test. Otherwise the axis with the
//! *shallowest* penetration wins: it is the direction the pair is cheapest to
//! push apart along.
//!
//! # Conventions
//!
//! - `normal` points from A towards B
//! - `penetration` is signed; negative means interpenetrating, zero is touching

use glam::Vec3;
use smallvec::SmallVec;

use super::shape::CollisionShape;
use super::types::Pose;

/// Threshold for discarding degenerate and duplicate axes.
pub const AXIS_EPSILON: f32 = 1e-6;

/// Deduplicated, normalised candidate axes for one pair.
pub type CandidateAxes = SmallVec<[Vec3; 16]>;

/// Resolution data for a colliding pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionData {
    /// Unit resolution normal, from A towards B
    pub normal: Vec3,
    /// Signed overlap along `normal` (<= 0 when colliding)
    pub penetration: f32,
    /// A representative point on the separating plane
    pub point_on_plane: Vec3,
}

/// One side of a narrowphase test: the shape and where it is.
#[derive(Debug, Clone, Copy)]
pub struct ShapeInstance<'a> {
    /// Collision geometry
    pub shape: &'a CollisionShape,
    /// World pose of the owning body
    pub pose: Pose,
}

impl<'a> ShapeInstance<'a> {
    /// Pairs a shape with a pose.
    pub fn new(shape: &'a CollisionShape, pose: Pose) -> Self {
        Self { shape, pose }
    }
}

/// Adds `axis` to `axes` unless it is degenerate or already present.
pub fn push_unique_axis(axes: &mut CandidateAxes, axis: Vec3) {
    if axis.length_squared() < AXIS_EPSILON {
        return;
    }
    let axis = axis.normalize();
    if axes
        .iter()
        .any(|kept| kept.dot(axis).abs() >= 1.0 - AXIS_EPSILON)
    {
        return;
    }
    axes.push(axis);
}

/// Collects the deduplicated candidate axes for a pair.
pub fn candidate_axes(a: &ShapeInstance<'_>, b: &ShapeInstance<'_>) -> CandidateAxes {
    let axes_a = a.shape.collision_axes(&a.pose, b.shape, &b.pose);
    let axes_b = b.shape.collision_axes(&b.pose, a.shape, &a.pose);

    let mut axes = CandidateAxes::new();
    for &axis in axes_a.iter().chain(axes_b.iter()) {
        push_unique_axis(&mut axes, axis);
    }
    for &axis_a in &axes_a {
        for &axis_b in &axes_b {
            push_unique_axis(&mut axes, axis_a.cross(axis_b));
        }
    }
    axes
}

/// Projects both shapes onto `axis` and tests interval overlap in both orders.
///
/// Returns `None` when the axis separates the shapes.
pub fn check_axis(axis: Vec3, a: &ShapeInstance<'_>, b: &ShapeInstance<'_>) -> Option<CollisionData> {
    let (min_a, max_a) = a.shape.min_max_on_axis(&a.pose, axis);
    let (min_b, max_b) = b.shape.min_max_on_axis(&b.pose, axis);

    let a_lo = axis.dot(min_a);
    let a_hi = axis.dot(max_a);
    let b_lo = axis.dot(min_b);
    let b_hi = axis.dot(max_b);

    // A then B along the axis
    if a_lo <= b_lo && a_hi >= b_lo {
        let penetration = b_lo - a_hi;
        return Some(CollisionData {
            normal: axis,
            penetration,
            point_on_plane: max_a + axis * penetration,
        });
    }

    // B then A along the axis
    if b_lo <= a_lo && b_hi >= a_lo {
        let normal = -axis;
        let penetration = a_lo - b_hi;
        return Some(CollisionData {
            normal,
            penetration,
            point_on_plane: min_a + normal * penetration,
        });
    }

    None
}

/// Runs the full SAT test for a pair.
///
/// Returns the shallowest-penetration axis, or `None` if any axis separates
/// the shapes. When every candidate degenerates (concentric spheres) the pair
/// is tested along world up instead.
pub fn detect(a: &ShapeInstance<'_>, b: &ShapeInstance<'_>) -> Option<CollisionData> {
    let mut axes = candidate_axes(a, b);
    if axes.is_empty() {
        axes.push(Vec3::Y);
    }

    let mut best: Option<CollisionData> = None;
    for axis in axes {
        let current = check_axis(axis, a, b)?;
        if best.is_none_or(|kept| current.penetration >= kept.penetration) {
            best = Some(current);
        }
    }
    best
}
