//! Ray casting against collision shapes
//!
//! Used for picking bodies (e.g. to start an interactive drag). Cuboids are
//! tested with the slab method in the cuboid's local frame; spheres are
//! solved analytically.
//!
//! # Example
//!
//! ```ignore
//! if let Some(hit) = world.ray_cast(camera_pos, look_dir, 100.0) {
//!     world.begin_drag(hit.body)?;
//! }
//! ```

use glam::Vec3;

use super::body::BodySet;
use super::shape::CollisionShape;
use super::types::{BodyHandle, Pose};

// =============================================================================
// RayHit
// =============================================================================

/// Information about a ray-body intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The body that was hit
    pub body: BodyHandle,
    /// World-space position where the ray entered the shape
    pub position: Vec3,
    /// Surface normal at the hit point (normalized)
    pub normal: Vec3,
    /// Distance from ray origin to hit point
    pub distance: f32,
}

// =============================================================================
// Primitive intersection tests
// =============================================================================

/// Ray-AABB intersection using the slab method.
///
/// # Arguments
/// * `ray_origin` - Starting point of the ray
/// * `ray_dir` - Direction of the ray (should be normalized)
/// * `aabb_min` - Minimum corner of the AABB
/// * `aabb_max` - Maximum corner of the AABB
///
/// # Returns
/// Distance along the ray to the nearest intersection, or `None`.
/// A ray starting inside the box reports the exit distance.
pub fn ray_aabb_intersect(ray_origin: Vec3, ray_dir: Vec3, aabb_min: Vec3, aabb_max: Vec3) -> Option<f32> {
    let inv = |d: f32| if d.abs() > 1e-10 { 1.0 / d } else { f32::MAX * d.signum() };
    let inv_dir = Vec3::new(inv(ray_dir.x), inv(ray_dir.y), inv(ray_dir.z));

    let t1 = (aabb_min - ray_origin) * inv_dir;
    let t2 = (aabb_max - ray_origin) * inv_dir;

    let t_min = t1.min(t2).max_element();
    let t_max = t1.max(t2).min_element();

    if t_max >= t_min && t_max >= 0.0 {
        Some(if t_min >= 0.0 { t_min } else { t_max })
    } else {
        None
    }
}

/// Outward face normal of an AABB at a point on its surface.
pub fn aabb_surface_normal(point: Vec3, aabb_min: Vec3, aabb_max: Vec3) -> Vec3 {
    let center = (aabb_min + aabb_max) * 0.5;
    let half_extents = (aabb_max - aabb_min) * 0.5;
    let normalized = (point - center) / half_extents;
    let abs = normalized.abs();

    if abs.x >= abs.y && abs.x >= abs.z {
        Vec3::new(normalized.x.signum(), 0.0, 0.0)
    } else if abs.y >= abs.z {
        Vec3::new(0.0, normalized.y.signum(), 0.0)
    } else {
        Vec3::new(0.0, 0.0, normalized.z.signum())
    }
}

/// Ray-sphere intersection; returns the entry distance (exit if starting inside).
pub fn ray_sphere_intersect(ray_origin: Vec3, ray_dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray_origin - center;
    let b = oc.dot(ray_dir);
    let c = oc.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let near = -b - root;
    let far = -b + root;
    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        Some(far)
    } else {
        None
    }
}

/// Casts a ray against one posed shape. Returns `(distance, point, normal)`.
pub fn ray_shape_intersect(
    ray_origin: Vec3,
    ray_dir: Vec3,
    shape: &CollisionShape,
    pose: &Pose,
) -> Option<(f32, Vec3, Vec3)> {
    match *shape {
        CollisionShape::Sphere { radius } => {
            let t = ray_sphere_intersect(ray_origin, ray_dir, pose.position, radius)?;
            let point = ray_origin + ray_dir * t;
            Some((t, point, (point - pose.position).normalize_or_zero()))
        }
        CollisionShape::Cuboid { half_extents } => {
            // Rotation preserves length, so t is the same in both frames
            let local_origin = pose.to_local(ray_origin);
            let local_dir = pose.orientation.inverse() * ray_dir;
            let t = ray_aabb_intersect(local_origin, local_dir, -half_extents, half_extents)?;
            let local_point = local_origin + local_dir * t;
            let local_normal = aabb_surface_normal(local_point, -half_extents, half_extents);
            Some((t, pose.to_world(local_point), pose.orientation * local_normal))
        }
    }
}

// =============================================================================
// World query
// =============================================================================

/// Finds the closest shaped body hit by the ray within `max_distance`.
pub fn ray_cast(bodies: &BodySet, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
    let direction = direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        return None;
    }

    let mut best: Option<RayHit> = None;
    for (handle, body) in bodies {
        let Some(shape) = body.shape() else {
            continue;
        };
        let Some((distance, position, normal)) = ray_shape_intersect(origin, direction, shape, &body.pose())
        else {
            continue;
        };
        if distance > max_distance || best.is_some_and(|b| b.distance <= distance) {
            continue;
        }
        best = Some(RayHit {
            body: handle,
            position,
            normal,
            distance,
        });
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body::RigidBody;
    use glam::Quat;

    #[test]
    fn test_ray_aabb_hit_and_miss() {
        let t = ray_aabb_intersect(Vec3::new(-5.0, 0.0, 0.0), Vec3::X, Vec3::splat(-1.0), Vec3::ONE);
        assert!((t.unwrap() - 4.0).abs() < 1e-5);
        assert!(ray_aabb_intersect(Vec3::new(-5.0, 3.0, 0.0), Vec3::X, Vec3::splat(-1.0), Vec3::ONE).is_none());
    }

    #[test]
    fn test_ray_sphere_from_inside_reports_exit() {
        let t = ray_sphere_intersect(Vec3::ZERO, Vec3::Y, Vec3::ZERO, 2.0).unwrap();
        assert!((t - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_rotated_cuboid_normal() {
        let shape = CollisionShape::cuboid(Vec3::ONE);
        let pose = Pose::new(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::FRAC_PI_4));
        let (t, _, normal) = ray_shape_intersect(Vec3::new(-5.0, 0.0, 0.0), Vec3::X, &shape, &pose).unwrap();
        // Corner faces the ray: distance is 5 - sqrt(2)
        assert!((t - (5.0 - 2f32.sqrt())).abs() < 1e-4);
        assert!(normal.x < 0.0);
    }

    #[test]
    fn test_ray_cast_picks_closest_body() {
        let mut bodies = BodySet::with_key();
        let far = bodies.insert(RigidBody::sphere(Vec3::new(10.0, 0.0, 0.0), 1.0, 1.0));
        let near = bodies.insert(RigidBody::cuboid(Vec3::new(4.0, 0.0, 0.0), Vec3::ONE, 1.0));
        bodies.insert(RigidBody::new(Vec3::new(2.0, 0.0, 0.0), 1.0));

        let hit = ray_cast(&bodies, Vec3::ZERO, Vec3::X, 100.0).unwrap();
        assert_eq!(hit.body, near);
        assert!((hit.distance - 3.0).abs() < 1e-5);
        assert!((hit.normal - Vec3::NEG_X).length() < 1e-5);

        let hit = ray_cast(&bodies, Vec3::new(20.0, 0.0, 0.0), Vec3::NEG_X, 100.0).unwrap();
        assert_eq!(hit.body, far);
        assert!(ray_cast(&bodies, Vec3::ZERO, Vec3::X, 2.5).is_none());
    }
}
