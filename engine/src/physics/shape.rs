//! Collision shapes
//!
//! The shape set is closed ([`CollisionShape::Sphere`], [`CollisionShape::Cuboid`])
//! so the per-axis SAT loops dispatch with a `match` instead of a vtable.
//! Every query takes the owning body's [`Pose`]; shapes are defined in body-local
//! space centred on the centre of mass.

use glam::{Mat3, Vec3};
use smallvec::{SmallVec, smallvec};

use super::debug_draw::{Color, DebugDrawList};
use super::error::{PhysicsError, PhysicsResult};
use super::geometry::{Plane, Polygon};
use super::types::Pose;

/// Candidate separating axes contributed by one shape.
pub type AxisList = SmallVec<[Vec3; 3]>;

/// The face of a shape that best faces a direction, used for clipping.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceFace {
    /// World-space face vertices in cyclic order (a single point for spheres)
    pub polygon: Polygon,
    /// Outward world-space normal of the face
    pub normal: Vec3,
    /// Side planes bounding the face, kept side pointing into the shape
    pub adjacent_planes: SmallVec<[Plane; 4]>,
}

/// Convex collision geometry attached to a rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionShape {
    /// Ball of the given radius.
    Sphere {
        /// Radius (meters)
        radius: f32,
    },
    /// Box with the given half-extents along its local axes.
    Cuboid {
        /// Half-size along local X, Y and Z (meters)
        half_extents: Vec3,
    },
}

// Cyclic vertex order of a cuboid face, as (u, v) signs on the two in-plane axes.
const FACE_WINDING: [(f32, f32); 4] = [(1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)];

const LOCAL_AXES: [Vec3; 3] = [Vec3::X, Vec3::Y, Vec3::Z];

impl CollisionShape {
    /// Creates a sphere shape.
    pub fn sphere(radius: f32) -> Self {
        CollisionShape::Sphere { radius }
    }

    /// Creates a cuboid shape from half-extents.
    pub fn cuboid(half_extents: Vec3) -> Self {
        CollisionShape::Cuboid { half_extents }
    }

    /// Checks every dimension is positive and finite.
    pub fn validate(&self) -> PhysicsResult<()> {
        match *self {
            CollisionShape::Sphere { radius } if !(radius.is_finite() && radius > 0.0) => Err(
                PhysicsError::InvalidShape(format!("sphere radius must be positive, got {radius}")),
            ),
            CollisionShape::Cuboid { half_extents }
                if !(half_extents.is_finite() && half_extents.min_element() > 0.0) =>
            {
                Err(PhysicsError::InvalidShape(format!(
                    "cuboid half-extents must be positive, got {half_extents}"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Radius of the bounding sphere around the body centre.
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            CollisionShape::Sphere { radius } => radius,
            CollisionShape::Cuboid { half_extents } => half_extents.length(),
        }
    }

    /// Body-local inverse inertia tensor for the given inverse mass.
    ///
    /// Zero inverse mass yields the zero tensor (immovable). So does a shape
    /// that fails [`validate`](Self::validate), which would otherwise divide by zero.
    pub fn inverse_inertia(&self, inverse_mass: f32) -> Mat3 {
        if inverse_mass <= 0.0 || self.validate().is_err() {
            return Mat3::ZERO;
        }
        match *self {
            CollisionShape::Sphere { radius } => {
                // I = 2/5 m r²
                let i = 5.0 * inverse_mass / (2.0 * radius * radius);
                Mat3::from_diagonal(Vec3::splat(i))
            }
            CollisionShape::Cuboid { half_extents: h } => {
                // I_xx = m/12 (w² + d²) with full widths = m/3 (hy² + hz²)
                let sq = h * h;
                Mat3::from_diagonal(Vec3::new(
                    3.0 * inverse_mass / (sq.y + sq.z),
                    3.0 * inverse_mass / (sq.x + sq.z),
                    3.0 * inverse_mass / (sq.x + sq.y),
                ))
            }
        }
    }

    /// Point on this shape's surface (or interior) closest to `point`.
    pub fn closest_point(&self, pose: &Pose, point: Vec3) -> Vec3 {
        match *self {
            CollisionShape::Sphere { radius } => {
                let dir = (point - pose.position).normalize_or_zero();
                pose.position + dir * radius
            }
            CollisionShape::Cuboid { half_extents } => {
                let local = pose.to_local(point).clamp(-half_extents, half_extents);
                pose.to_world(local)
            }
        }
    }

    /// Candidate separating axes this shape contributes against `other`.
    ///
    /// Axes are not normalised or deduplicated here; the detector does that.
    pub fn collision_axes(
        &self,
        pose: &Pose,
        other: &CollisionShape,
        other_pose: &Pose,
    ) -> AxisList {
        match *self {
            CollisionShape::Sphere { .. } => {
                let closest = other.closest_point(other_pose, pose.position);
                smallvec![
                    pose.position - closest,
                    other_pose.position - pose.position,
                ]
            }
            CollisionShape::Cuboid { .. } => LOCAL_AXES
                .iter()
                .map(|axis| pose.orientation * *axis)
                .collect(),
        }
    }

    /// Vertices with minimum and maximum projection onto `axis`.
    pub fn min_max_on_axis(&self, pose: &Pose, axis: Vec3) -> (Vec3, Vec3) {
        match *self {
            CollisionShape::Sphere { radius } => {
                let offset = axis * radius;
                (pose.position - offset, pose.position + offset)
            }
            CollisionShape::Cuboid { half_extents } => {
                let mut min_vertex = pose.position;
                let mut max_vertex = pose.position;
                let mut min_proj = f32::MAX;
                let mut max_proj = f32::MIN;
                for corner in cuboid_corners(pose, half_extents) {
                    let proj = corner.dot(axis);
                    if proj < min_proj {
                        min_proj = proj;
                        min_vertex = corner;
                    }
                    if proj > max_proj {
                        max_proj = proj;
                        max_vertex = corner;
                    }
                }
                (min_vertex, max_vertex)
            }
        }
    }

    /// The face whose outward normal best matches `direction`.
    ///
    /// Spheres degenerate to the single surface point along `direction`.
    pub fn reference_face(&self, pose: &Pose, direction: Vec3) -> ReferenceFace {
        match *self {
            CollisionShape::Sphere { radius } => ReferenceFace {
                polygon: smallvec![pose.position + direction * radius],
                normal: direction,
                adjacent_planes: SmallVec::new(),
            },
            CollisionShape::Cuboid { half_extents } => {
                cuboid_reference_face(pose, half_extents, direction)
            }
        }
    }

    /// Appends a wireframe of this shape to `out`.
    pub fn debug_draw(&self, pose: &Pose, color: Color, out: &mut DebugDrawList) {
        match *self {
            CollisionShape::Sphere { radius } => {
                const SEGMENTS: usize = 16;
                for axis in LOCAL_AXES {
                    let (u, v) = axis.any_orthonormal_pair();
                    let mut prev = pose.to_world(u * radius);
                    for i in 1..=SEGMENTS {
                        let angle = i as f32 / SEGMENTS as f32 * std::f32::consts::TAU;
                        let local = (u * angle.cos() + v * angle.sin()) * radius;
                        let next = pose.to_world(local);
                        out.line(prev, next, color);
                        prev = next;
                    }
                }
            }
            CollisionShape::Cuboid { half_extents } => {
                let c = cuboid_corners(pose, half_extents);
                // Corner index bits: x = 4, y = 2, z = 1
                for (a, b) in [
                    (0, 1), (2, 3), (4, 5), (6, 7),
                    (0, 2), (1, 3), (4, 6), (5, 7),
                    (0, 4), (1, 5), (2, 6), (3, 7),
                ] {
                    out.line(c[a], c[b], color);
                }
            }
        }
    }
}

fn cuboid_corners(pose: &Pose, h: Vec3) -> [Vec3; 8] {
    let mut corners = [Vec3::ZERO; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let sign = Vec3::new(
            if i & 4 != 0 { 1.0 } else { -1.0 },
            if i & 2 != 0 { 1.0 } else { -1.0 },
            if i & 1 != 0 { 1.0 } else { -1.0 },
        );
        *corner = pose.to_world(sign * h);
    }
    corners
}

fn cuboid_reference_face(pose: &Pose, half_extents: Vec3, direction: Vec3) -> ReferenceFace {
    let local_dir = pose.orientation.inverse() * direction;
    let abs = local_dir.abs();

    // Dominant local axis picks the face
    let axis = if abs.x >= abs.y && abs.x >= abs.z {
        0
    } else if abs.y >= abs.z {
        1
    } else {
        2
    };
    let sign = if local_dir[axis] >= 0.0 { 1.0 } else { -1.0 };
    let u_axis = (axis + 1) % 3;
    let v_axis = (axis + 2) % 3;

    let local_normal = LOCAL_AXES[axis] * sign;
    let face_centre = local_normal * half_extents[axis];
    let u = LOCAL_AXES[u_axis] * half_extents[u_axis];
    let v = LOCAL_AXES[v_axis] * half_extents[v_axis];

    let polygon: Polygon = FACE_WINDING
        .iter()
        .map(|&(su, sv)| pose.to_world(face_centre + u * su + v * sv))
        .collect();

    let mut adjacent_planes = SmallVec::new();
    for side_axis in [u_axis, v_axis] {
        for side_sign in [1.0, -1.0] {
            let outward = pose.orientation * (LOCAL_AXES[side_axis] * side_sign);
            let point = pose.position + outward * half_extents[side_axis];
            adjacent_planes.push(Plane::from_point_normal(point, -outward));
        }
    }

    ReferenceFace {
        polygon,
        normal: pose.orientation * local_normal,
        adjacent_planes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn pose_at(position: Vec3) -> Pose {
        Pose::new(position, Quat::IDENTITY)
    }

    #[test]
    fn test_degenerate_shapes_are_rejected() {
        assert!(CollisionShape::sphere(0.5).validate().is_ok());
        assert!(CollisionShape::cuboid(Vec3::ONE).validate().is_ok());
        for shape in [
            CollisionShape::sphere(0.0),
            CollisionShape::sphere(-1.0),
            CollisionShape::cuboid(Vec3::new(1.0, 0.0, 1.0)),
            CollisionShape::cuboid(Vec3::new(1.0, f32::INFINITY, 1.0)),
        ] {
            assert!(matches!(shape.validate(), Err(PhysicsError::InvalidShape(_))));
            assert_eq!(shape.inverse_inertia(1.0), Mat3::ZERO);
        }
        // Two zero extents would zero the X denominator
        let flat = CollisionShape::cuboid(Vec3::new(1.0, 0.0, 0.0)).inverse_inertia(1.0);
        assert!(flat.is_finite());
    }

    #[test]
    fn test_bounding_radius() {
        assert_eq!(CollisionShape::sphere(2.0).bounding_radius(), 2.0);
        let r = CollisionShape::cuboid(Vec3::new(1.0, 2.0, 2.0)).bounding_radius();
        assert!((r - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_static_inverse_inertia_is_zero() {
        let shape = CollisionShape::cuboid(Vec3::ONE);
        assert_eq!(shape.inverse_inertia(0.0), Mat3::ZERO);
    }

    #[test]
    fn test_sphere_inverse_inertia() {
        // m = 2, r = 1 -> I = 0.8 -> inv = 1.25
        let inv = CollisionShape::sphere(1.0).inverse_inertia(0.5);
        assert!((inv.x_axis.x - 1.25).abs() < 1e-6);
        assert!((inv.y_axis.y - 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_cuboid_inverse_inertia_unit_cube() {
        // m = 1, 2x2x2 cube -> I = 1/12 * (4 + 4) = 2/3 -> inv = 1.5
        let inv = CollisionShape::cuboid(Vec3::ONE).inverse_inertia(1.0);
        assert!((inv.z_axis.z - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_cuboid_min_max_on_axis() {
        let shape = CollisionShape::cuboid(Vec3::new(1.0, 2.0, 3.0));
        let (min, max) = shape.min_max_on_axis(&pose_at(Vec3::new(10.0, 0.0, 0.0)), Vec3::Y);
        assert!((min.y + 2.0).abs() < 1e-6);
        assert!((max.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_sphere_reference_face_is_single_point() {
        let face = CollisionShape::sphere(0.5).reference_face(&pose_at(Vec3::ZERO), Vec3::NEG_Y);
        assert_eq!(face.polygon.len(), 1);
        assert!((face.polygon[0] - Vec3::new(0.0, -0.5, 0.0)).length() < 1e-6);
        assert!(face.adjacent_planes.is_empty());
    }

    #[test]
    fn test_cuboid_reference_face_top() {
        let shape = CollisionShape::cuboid(Vec3::ONE);
        let face = shape.reference_face(&pose_at(Vec3::ZERO), Vec3::new(0.1, 1.0, 0.0));
        assert_eq!(face.polygon.len(), 4);
        assert!((face.normal - Vec3::Y).length() < 1e-6);
        for p in &face.polygon {
            assert!((p.y - 1.0).abs() < 1e-6);
        }
        assert_eq!(face.adjacent_planes.len(), 4);
        // Face centre is kept by every side plane; a point past each plane is not
        let centre = Vec3::new(0.0, 1.0, 0.0);
        for plane in &face.adjacent_planes {
            assert!(plane.contains(centre));
            assert!(!plane.contains(centre - plane.normal * 5.0));
        }
    }

    #[test]
    fn test_cuboid_closest_point_clamps() {
        let shape = CollisionShape::cuboid(Vec3::ONE);
        let p = shape.closest_point(&pose_at(Vec3::ZERO), Vec3::new(0.5, 5.0, -3.0));
        assert!((p - Vec3::new(0.5, 1.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn test_rotated_cuboid_axes_follow_orientation() {
        let shape = CollisionShape::cuboid(Vec3::ONE);
        let pose = Pose::new(Vec3::ZERO, Quat::from_rotation_z(std::f32::consts::FRAC_PI_4));
        let other = CollisionShape::sphere(1.0);
        let axes = shape.collision_axes(&pose, &other, &pose_at(Vec3::X * 5.0));
        assert_eq!(axes.len(), 3);
        let expected = pose.orientation * Vec3::X;
        assert!((axes[0] - expected).length() < 1e-6);
    }
}
