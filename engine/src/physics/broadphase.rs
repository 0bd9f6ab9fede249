//! Broadphase: candidate pair generation
//!
//! Three strategies produce the same kind of output, a list of
//! [`CollisionPair`]s whose bounding spheres touch:
//!
//! - [`BroadphaseMode::BruteForce`]: every shaped pair, no distance test
//! - [`BroadphaseMode::SphereSphere`]: every shaped pair, bounding-sphere test
//! - [`BroadphaseMode::Octree`]: loose-octree culling (see [`super::octree`])
//!
//! The first two are comparison baselines for the octree.

use super::body::{BodySet, RigidBody};
use super::config::BroadphaseMode;
use super::octree::Octree;
use super::types::BodyHandle;

/// Ephemeral candidate pair, rebuilt every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionPair {
    /// First body
    pub a: BodyHandle,
    /// Second body
    pub b: BodyHandle,
}

impl CollisionPair {
    /// Creates a pair.
    pub fn new(a: BodyHandle, b: BodyHandle) -> Self {
        Self { a, b }
    }
}

/// True if both bodies have shapes and their bounding spheres touch.
pub fn bounding_spheres_overlap(a: &RigidBody, b: &RigidBody) -> bool {
    let (Some(shape_a), Some(shape_b)) = (a.shape(), b.shape()) else {
        return false;
    };
    let reach = shape_a.bounding_radius() + shape_b.bounding_radius();
    (a.position() - b.position()).length_squared() <= reach * reach
}

/// Fills `out` with candidate pairs using the given strategy.
///
/// `out` is cleared first so callers can reuse the allocation across steps.
pub fn find_pairs(
    mode: BroadphaseMode,
    bodies: &BodySet,
    octree: &Octree,
    out: &mut Vec<CollisionPair>,
) {
    out.clear();
    match mode {
        BroadphaseMode::BruteForce => all_pairs(bodies, out, |a, b| {
            a.shape().is_some() && b.shape().is_some()
        }),
        BroadphaseMode::SphereSphere => all_pairs(bodies, out, bounding_spheres_overlap),
        BroadphaseMode::Octree => octree.cull_pairs(bodies, out),
    }
}

fn all_pairs(
    bodies: &BodySet,
    out: &mut Vec<CollisionPair>,
    accept: impl Fn(&RigidBody, &RigidBody) -> bool,
) {
    let entries: Vec<(BodyHandle, &RigidBody)> = bodies.iter().collect();
    for (i, &(ha, a)) in entries.iter().enumerate() {
        for &(hb, b) in &entries[i + 1..] {
            if accept(a, b) {
                out.push(CollisionPair::new(ha, hb));
            }
        }
    }
}
