//! Geometry helpers for contact generation
//!
//! Planes, Sutherland–Hodgman polygon clipping and closest-point queries.
//!
//! # Plane convention
//!
//! A [`Plane`] keeps the half-space where `normal · p + distance >= 0`.
//! Clip planes are therefore built with their normal pointing *into* the
//! region whose points should survive.

use glam::Vec3;
use smallvec::SmallVec;

/// Polygon vertex list. Inline capacity covers a quad clipped by four planes.
pub type Polygon = SmallVec<[Vec3; 8]>;

const EPSILON: f32 = 1e-6;

/// An infinite plane `normal · p + distance = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal pointing into the kept half-space
    pub normal: Vec3,
    /// Signed offset from the origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Creates a plane from a normal and offset.
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Creates the plane through `point` whose kept side is along `normal`.
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Signed distance of `point`; non-negative on the kept side.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// True if `point` lies on the kept side (or on the plane).
    pub fn contains(&self, point: Vec3) -> bool {
        self.signed_distance(point) >= -EPSILON
    }

    /// Intersection of segment `start..end` with the plane.
    ///
    /// Callers guarantee the endpoints straddle the plane.
    pub fn segment_intersection(&self, start: Vec3, end: Vec3) -> Vec3 {
        let ab = end - start;
        let denom = self.normal.dot(ab);
        if denom.abs() < EPSILON {
            return start;
        }
        let t = (-self.signed_distance(start) / denom).clamp(0.0, 1.0);
        start + ab * t
    }

    /// Orthogonal projection of `point` onto the plane.
    pub fn project(&self, point: Vec3) -> Vec3 {
        point - self.normal * self.signed_distance(point)
    }
}

/// How a clip plane treats vertices outside its kept half-space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipMode {
    /// Classic Sutherland–Hodgman: outside runs are replaced by edge crossings.
    Clip,
    /// Outside vertices are dropped without inserting crossings.
    Discard,
}

/// Sutherland–Hodgman clipping of `polygon` against every plane in turn.
///
/// Returns the clipped polygon; empty when nothing survives.
pub fn clip_polygon(polygon: &[Vec3], planes: &[Plane], mode: ClipMode) -> Polygon {
    let mut current: Polygon = polygon.iter().copied().collect();
    let mut next = Polygon::new();

    for plane in planes {
        if current.is_empty() {
            break;
        }
        next.clear();

        match mode {
            ClipMode::Discard => {
                next.extend(current.iter().copied().filter(|p| plane.contains(*p)));
            }
            ClipMode::Clip => {
                let mut start = current[current.len() - 1];
                for &end in &current {
                    let start_in = plane.contains(start);
                    let end_in = plane.contains(end);
                    match (start_in, end_in) {
                        (true, true) => next.push(end),
                        (true, false) => next.push(plane.segment_intersection(start, end)),
                        (false, true) => {
                            next.push(plane.segment_intersection(start, end));
                            next.push(end);
                        }
                        (false, false) => {}
                    }
                    start = end;
                }
            }
        }

        std::mem::swap(&mut current, &mut next);
    }

    current
}

/// Closest point to `point` on segment `a..b`.
pub fn closest_point_on_segment(point: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < EPSILON {
        return a;
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest point to `point` on a planar convex polygon (interior included).
///
/// Single-vertex polygons return that vertex; two-vertex polygons are
/// treated as a segment.
pub fn closest_point_on_polygon(point: Vec3, polygon: &[Vec3]) -> Vec3 {
    match polygon.len() {
        0 => point,
        1 => polygon[0],
        2 => closest_point_on_segment(point, polygon[0], polygon[1]),
        n => {
            let normal = (polygon[1] - polygon[0])
                .cross(polygon[2] - polygon[0])
                .normalize_or_zero();
            if normal == Vec3::ZERO {
                return closest_on_edges(point, polygon);
            }

            let plane = Plane::from_point_normal(polygon[0], normal);
            let projected = plane.project(point);

            // Inside iff on the same side of every edge
            let mut sign = 0.0f32;
            for i in 0..n {
                let a = polygon[i];
                let b = polygon[(i + 1) % n];
                let side = (b - a).cross(projected - a).dot(normal);
                if side.abs() < EPSILON {
                    continue;
                }
                if sign == 0.0 {
                    sign = side.signum();
                } else if side.signum() != sign {
                    return closest_on_edges(point, polygon);
                }
            }
            projected
        }
    }
}

fn closest_on_edges(point: Vec3, polygon: &[Vec3]) -> Vec3 {
    let n = polygon.len();
    let mut best = polygon[0];
    let mut best_dist = f32::MAX;
    for i in 0..n {
        let candidate = closest_point_on_segment(point, polygon[i], polygon[(i + 1) % n]);
        let dist = (candidate - point).length_squared();
        if dist < best_dist {
            best_dist = dist;
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> [Vec3; 4] {
        [
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(-1.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_plane_signed_distance() {
        let plane = Plane::from_point_normal(Vec3::new(0.0, 2.0, 0.0), Vec3::Y);
        assert!((plane.signed_distance(Vec3::new(5.0, 3.0, 1.0)) - 1.0).abs() < 1e-6);
        assert!(plane.contains(Vec3::new(0.0, 2.0, 0.0)));
        assert!(!plane.contains(Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_clip_square_against_half_space() {
        // Keep x <= 0.5
        let plane = Plane::from_point_normal(Vec3::new(0.5, 0.0, 0.0), Vec3::NEG_X);
        let clipped = clip_polygon(&unit_square(), &[plane], ClipMode::Clip);
        assert_eq!(clipped.len(), 4);
        for p in &clipped {
            assert!(p.x <= 0.5 + 1e-5, "vertex {:?} escaped the plane", p);
        }
        assert!(clipped.iter().any(|p| (p.x - 0.5).abs() < 1e-5));
    }

    #[test]
    fn test_clip_fully_outside_is_empty() {
        let plane = Plane::from_point_normal(Vec3::new(5.0, 0.0, 0.0), Vec3::X);
        let clipped = clip_polygon(&unit_square(), &[plane], ClipMode::Clip);
        assert!(clipped.is_empty());
    }

    #[test]
    fn test_discard_mode_drops_without_crossings() {
        let plane = Plane::from_point_normal(Vec3::ZERO, Vec3::X);
        let clipped = clip_polygon(&unit_square(), &[plane], ClipMode::Discard);
        assert_eq!(clipped.len(), 2);
        assert!(clipped.iter().all(|p| p.x > 0.0));
    }

    #[test]
    fn test_closest_point_inside_polygon_projects() {
        let p = closest_point_on_polygon(Vec3::new(0.25, 3.0, -0.5), &unit_square());
        assert!((p - Vec3::new(0.25, 0.0, -0.5)).length() < 1e-5);
    }

    #[test]
    fn test_closest_point_outside_polygon_hits_edge() {
        let p = closest_point_on_polygon(Vec3::new(3.0, 1.0, 0.0), &unit_square());
        assert!((p - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_closest_point_single_vertex() {
        let p = closest_point_on_polygon(Vec3::ONE, &[Vec3::X]);
        assert_eq!(p, Vec3::X);
    }
}
