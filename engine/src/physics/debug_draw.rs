//! Debug-draw primitive stream
//!
//! The physics core renders nothing. It fills a [`DebugDrawList`] with points,
//! lines and triangles that an external renderer consumes. [`DebugVertex`] is
//! `Pod` so the flattened line list can be uploaded to a vertex buffer as-is.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// RGBA color, components in 0..1.
pub type Color = Vec4;

/// Contact points and manifold normals.
pub const MANIFOLD_COLOR: Color = Vec4::new(0.5, 1.0, 0.5, 1.0);
/// Persistent constraint links.
pub const CONSTRAINT_COLOR: Color = Vec4::new(1.0, 0.8, 0.2, 1.0);
/// Collision shape wireframes.
pub const VOLUME_COLOR: Color = Vec4::new(0.3, 0.6, 1.0, 1.0);
/// Resolution normals from the narrowphase.
pub const NORMAL_COLOR: Color = Vec4::new(0.0, 0.0, 1.0, 1.0);
/// Octree cell boundaries.
pub const OCTREE_COLOR: Color = Vec4::new(1.0, 0.3, 1.0, 1.0);

/// A single point marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugPoint {
    /// World position
    pub position: Vec3,
    /// Marker radius (meters)
    pub size: f32,
    /// Color
    pub color: Color,
}

/// A line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    /// Start point
    pub start: Vec3,
    /// End point
    pub end: Vec3,
    /// Color
    pub color: Color,
}

/// A filled triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugTriangle {
    /// Corners in counter-clockwise order
    pub vertices: [Vec3; 3],
    /// Color
    pub color: Color,
}

/// GPU-compatible line-list vertex.
///
/// Layout (28 bytes): position `vec3<f32>` at 0, color `vec4<f32>` at 12.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DebugVertex {
    /// World position
    pub position: [f32; 3],
    /// RGBA color
    pub color: [f32; 4],
}

static_assertions::assert_eq_size!(DebugVertex, [u8; 28]);

impl DebugVertex {
    fn new(position: Vec3, color: Color) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
        }
    }
}

/// Accumulated debug primitives for one frame.
#[derive(Debug, Clone, Default)]
pub struct DebugDrawList {
    /// Point markers
    pub points: Vec<DebugPoint>,
    /// Line segments
    pub lines: Vec<DebugLine>,
    /// Triangles
    pub triangles: Vec<DebugTriangle>,
}

impl DebugDrawList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every primitive, keeping allocations.
    pub fn clear(&mut self) {
        self.points.clear();
        self.lines.clear();
        self.triangles.clear();
    }

    /// True if nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.lines.is_empty() && self.triangles.is_empty()
    }

    /// Emits a point marker.
    pub fn point(&mut self, position: Vec3, size: f32, color: Color) {
        self.points.push(DebugPoint {
            position,
            size,
            color,
        });
    }

    /// Emits a line segment.
    pub fn line(&mut self, start: Vec3, end: Vec3, color: Color) {
        self.lines.push(DebugLine { start, end, color });
    }

    /// Emits a triangle.
    pub fn triangle(&mut self, a: Vec3, b: Vec3, c: Vec3, color: Color) {
        self.triangles.push(DebugTriangle {
            vertices: [a, b, c],
            color,
        });
    }

    /// Emits the 12 edges of an axis-aligned box given its min corner and size.
    pub fn aabb(&mut self, origin: Vec3, extent: Vec3, color: Color) {
        let corner = |i: usize| {
            origin
                + Vec3::new(
                    if i & 4 != 0 { extent.x } else { 0.0 },
                    if i & 2 != 0 { extent.y } else { 0.0 },
                    if i & 1 != 0 { extent.z } else { 0.0 },
                )
        };
        for (a, b) in [
            (0, 1), (2, 3), (4, 5), (6, 7),
            (0, 2), (1, 3), (4, 6), (5, 7),
            (0, 4), (1, 5), (2, 6), (3, 7),
        ] {
            self.line(corner(a), corner(b), color);
        }
    }

    /// Flattens lines into a line-list vertex stream (two vertices per line).
    pub fn line_vertices(&self) -> Vec<DebugVertex> {
        let mut out = Vec::with_capacity(self.lines.len() * 2);
        for line in &self.lines {
            out.push(DebugVertex::new(line.start, line.color));
            out.push(DebugVertex::new(line.end, line.color));
        }
        out
    }

    /// Flattens triangles into a triangle-list vertex stream.
    pub fn triangle_vertices(&self) -> Vec<DebugVertex> {
        self.triangles
            .iter()
            .flat_map(|tri| tri.vertices.map(|v| DebugVertex::new(v, tri.color)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_emits_twelve_edges() {
        let mut list = DebugDrawList::new();
        list.aabb(Vec3::ZERO, Vec3::ONE, OCTREE_COLOR);
        assert_eq!(list.lines.len(), 12);
        for line in &list.lines {
            // Every edge is axis aligned with unit length
            assert!(((line.end - line.start).length() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_line_vertices_are_castable() {
        let mut list = DebugDrawList::new();
        list.line(Vec3::ZERO, Vec3::X, MANIFOLD_COLOR);
        let verts = list.line_vertices();
        assert_eq!(verts.len(), 2);
        let bytes: &[u8] = bytemuck::cast_slice(&verts);
        assert_eq!(bytes.len(), 56);
        assert_eq!(verts[1].position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_clear_keeps_list_reusable() {
        let mut list = DebugDrawList::new();
        list.point(Vec3::ZERO, 0.1, NORMAL_COLOR);
        list.triangle(Vec3::ZERO, Vec3::X, Vec3::Y, VOLUME_COLOR);
        assert!(!list.is_empty());
        assert_eq!(list.triangle_vertices().len(), 3);
        list.clear();
        assert!(list.is_empty());
    }
}
