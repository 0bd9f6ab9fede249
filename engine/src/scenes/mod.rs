//! Demo scenes
//!
//! Builders that populate a [`PhysicsWorld`] with a ready-made setup. They are
//! used by the `ball_pool` binary and double as larger integration fixtures.
//!
//! Tags used here:
//! - [`WALL_TAG`] on every arena wall
//! - [`PROJECTILE_TAG`] on spawned projectiles
//!
//! Projectiles are spawned from inside the arena walls' reach, so
//! [`arena_exclusions`] lists the pair to add to
//! [`PhysicsConfig::excluded_tag_pairs`](crate::physics::PhysicsConfig).

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::physics::{BodyHandle, DistanceConstraint, PhysicsResult, PhysicsWorld, RigidBody};

/// Tag carried by arena walls.
pub const WALL_TAG: &str = "invisible_wall";

/// Tag carried by spawned projectiles.
pub const PROJECTILE_TAG: &str = "spawn";

/// Tag pairs that should never collide in the arena scenes.
pub fn arena_exclusions() -> Vec<(String, String)> {
    vec![(PROJECTILE_TAG.to_string(), WALL_TAG.to_string())]
}

// =============================================================================
// Walled arena
// =============================================================================

/// Dimensions of a closed box arena.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Half the floor width along X and Z
    pub half_size: f32,
    /// Inner height between floor and ceiling
    pub height: f32,
    /// Half thickness of every wall slab
    pub wall_half_thickness: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            half_size: 20.0,
            height: 40.0,
            wall_half_thickness: 1.0,
        }
    }
}

/// Builds a static floor, ceiling and four walls. The floor top sits at y = 0.
pub fn walled_arena(world: &mut PhysicsWorld, config: &ArenaConfig) -> Vec<BodyHandle> {
    let s = config.half_size;
    let t = config.wall_half_thickness;
    let h = config.height * 0.5;

    let slabs = [
        (Vec3::new(0.0, -t, 0.0), Vec3::new(s, t, s)),
        (Vec3::new(0.0, config.height + t, 0.0), Vec3::new(s, t, s)),
        (Vec3::new(-s, h, 0.0), Vec3::new(t, h, s)),
        (Vec3::new(s, h, 0.0), Vec3::new(t, h, s)),
        (Vec3::new(0.0, h, -s), Vec3::new(s, h, t)),
        (Vec3::new(0.0, h, s), Vec3::new(s, h, t)),
    ];

    slabs
        .into_iter()
        .map(|(position, half_extents)| {
            world.add_body(RigidBody::cuboid(position, half_extents, 0.0).with_tag(WALL_TAG))
        })
        .collect()
}

// =============================================================================
// Ball pool
// =============================================================================

/// A cube lattice of balls dropped into a walled arena.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallPoolConfig {
    /// Balls per lattice edge
    pub dims: usize,
    /// Distance between neighbouring ball centres
    pub spacing: f32,
    /// Ball radius
    pub radius: f32,
    /// Ball mass (kg)
    pub mass: f32,
    /// Restitution of every ball
    pub restitution: f32,
    /// Lattice corner
    pub offset: Vec3,
    /// Enclosing arena
    pub arena: ArenaConfig,
}

impl Default for BallPoolConfig {
    fn default() -> Self {
        Self {
            dims: 13,
            spacing: 3.0,
            radius: 1.0,
            mass: 10.0,
            restitution: 0.0,
            offset: Vec3::new(-18.0, 1.0, -18.0),
            arena: ArenaConfig::default(),
        }
    }
}

/// Builds the arena and a `dims³` lattice of balls. Returns the ball handles.
pub fn ball_pool(world: &mut PhysicsWorld, config: &BallPoolConfig) -> Vec<BodyHandle> {
    walled_arena(world, &config.arena);

    let inverse_mass = if config.mass > 0.0 { 1.0 / config.mass } else { 0.0 };
    let mut balls = Vec::with_capacity(config.dims.pow(3));
    for x in 0..config.dims {
        for y in 0..config.dims {
            for z in 0..config.dims {
                let position = config.offset + Vec3::new(x as f32, y as f32, z as f32) * config.spacing;
                let ball = RigidBody::sphere(position, config.radius, inverse_mass)
                    .with_restitution(config.restitution);
                balls.push(world.add_body(ball));
            }
        }
    }
    balls
}

/// Fires a tagged projectile ball from `origin` along `direction`.
pub fn spawn_projectile(
    world: &mut PhysicsWorld,
    origin: Vec3,
    direction: Vec3,
    speed: f32,
    radius: f32,
) -> BodyHandle {
    let ball = RigidBody::sphere(origin, radius, 0.1)
        .with_tag(PROJECTILE_TAG)
        .with_linear_velocity(direction.normalize_or_zero() * speed);
    world.add_body(ball)
}

// =============================================================================
// Cube tower
// =============================================================================

/// Stacks `levels` cubes on top of each other starting at `base` (bottom face).
pub fn cube_tower(world: &mut PhysicsWorld, base: Vec3, levels: usize, half_extent: f32) -> Vec<BodyHandle> {
    // Small gap so the stack settles instead of starting interpenetrated
    let gap = half_extent * 0.02;
    (0..levels)
        .map(|level| {
            let y = base.y + half_extent + level as f32 * (2.0 * half_extent + gap);
            let cube = RigidBody::cuboid(Vec3::new(base.x, y, base.z), Vec3::splat(half_extent), 1.0)
                .with_restitution(0.1)
                .with_friction(0.8);
            world.add_body(cube)
        })
        .collect()
}

// =============================================================================
// Constraint cloth
// =============================================================================

/// A grid of small spheres linked by distance constraints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClothConfig {
    /// Top-left corner of the cloth
    pub origin: Vec3,
    /// Nodes along X
    pub columns: usize,
    /// Nodes along -Y
    pub rows: usize,
    /// Rest distance between neighbouring nodes
    pub spacing: f32,
    /// Node sphere radius
    pub node_radius: f32,
    /// Make the top row static
    pub pin_top_row: bool,
}

impl Default for ClothConfig {
    fn default() -> Self {
        Self {
            origin: Vec3::new(-5.0, 15.0, 0.0),
            columns: 10,
            rows: 10,
            spacing: 1.0,
            node_radius: 0.2,
            pin_top_row: true,
        }
    }
}

/// Builds a cloth of `columns × rows` nodes with structural links.
///
/// Returns node handles in row-major order.
pub fn constraint_cloth(world: &mut PhysicsWorld, config: &ClothConfig) -> PhysicsResult<Vec<BodyHandle>> {
    let mut nodes = Vec::with_capacity(config.columns * config.rows);
    for row in 0..config.rows {
        for col in 0..config.columns {
            let position = config.origin + Vec3::new(col as f32, -(row as f32), 0.0) * config.spacing;
            let inverse_mass = if config.pin_top_row && row == 0 { 0.0 } else { 1.0 };
            let node = RigidBody::sphere(position, config.node_radius, inverse_mass).with_tag("cloth");
            nodes.push(world.add_body(node));
        }
    }

    for row in 0..config.rows {
        for col in 0..config.columns {
            let here = nodes[row * config.columns + col];
            if col + 1 < config.columns {
                let right = nodes[row * config.columns + col + 1];
                let link = DistanceConstraint::between_centres(here, right, world.bodies())?;
                world.add_constraint(link);
            }
            if row + 1 < config.rows {
                let below = nodes[(row + 1) * config.columns + col];
                let link = DistanceConstraint::between_centres(here, below, world.bodies())?;
                world.add_constraint(link);
            }
        }
    }
    Ok(nodes)
}

/// Tag pair that keeps cloth nodes from colliding with each other.
pub fn cloth_exclusions() -> Vec<(String, String)> {
    vec![("cloth".to_string(), "cloth".to_string())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsConfig;

    #[test]
    fn test_ball_pool_counts() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        let config = BallPoolConfig {
            dims: 3,
            ..BallPoolConfig::default()
        };
        let balls = ball_pool(&mut world, &config);
        assert_eq!(balls.len(), 27);
        assert_eq!(world.body_count(), 27 + 6);
    }

    #[test]
    fn test_cloth_link_count() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        let config = ClothConfig {
            columns: 4,
            rows: 3,
            ..ClothConfig::default()
        };
        let nodes = constraint_cloth(&mut world, &config).unwrap();
        assert_eq!(nodes.len(), 12);
        // Horizontal 3 per row * 3 rows + vertical 4 per gap * 2 gaps
        assert_eq!(world.constraint_count(), 9 + 8);
        assert!(world.body(nodes[0]).unwrap().is_static());
        assert!(!world.body(nodes[4]).unwrap().is_static());
    }

    #[test]
    fn test_tower_stacks_upward() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        let cubes = cube_tower(&mut world, Vec3::ZERO, 4, 0.5);
        let heights: Vec<f32> = cubes.iter().map(|h| world.body(*h).unwrap().position().y).collect();
        assert!(heights.windows(2).all(|w| w[1] > w[0] + 0.99));
        assert!((heights[0] - 0.5).abs() < 1e-6);
    }
}
