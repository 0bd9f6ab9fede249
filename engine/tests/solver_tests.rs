//! Solver Tests - Sequential Impulses
//!
//! Behaviour of contact manifolds and distance constraints once they run
//! through the full sub-step pipeline.

use glam::Vec3;
use sat_impulse_engine::physics::{
    BodyHandle, BodySet, Constraint, DistanceConstraint, PhysicsConfig, PhysicsWorld, RigidBody,
    SolverConfig, SolverOrder,
};
use sat_impulse_engine::scenes::{self, BallPoolConfig};

/// Default gravity, no damping, deterministic sweep order.
fn earth_world() -> PhysicsWorld {
    let config = PhysicsConfig {
        damping: 1.0,
        solver: SolverConfig {
            order: SolverOrder::Fixed,
            ..SolverConfig::default()
        },
        ..PhysicsConfig::default()
    };
    PhysicsWorld::new(config).unwrap()
}

/// Static slab whose top face sits at y = 0.
fn add_ground(world: &mut PhysicsWorld) -> BodyHandle {
    world.add_body(RigidBody::cuboid(Vec3::new(0.0, -1.0, 0.0), Vec3::new(10.0, 1.0, 10.0), 0.0))
}

// ============================================================================
// Distance constraint
// ============================================================================

#[test]
fn test_distance_error_shrinks_every_step() {
    let mut world = PhysicsWorld::new(PhysicsConfig::vacuum()).unwrap();
    let a = world.add_body(RigidBody::sphere(Vec3::ZERO, 0.2, 1.0));
    let b = world.add_body(RigidBody::sphere(Vec3::new(3.0, 0.0, 0.0), 0.2, 1.0));
    let link = DistanceConstraint::between_centres(a, b, world.bodies())
        .unwrap()
        .with_rest_length(1.0);
    let gauge = link.clone();
    world.add_constraint(link);

    let mut error = (gauge.current_length(world.bodies()).unwrap() - 1.0).abs();
    assert!((error - 2.0).abs() < 1e-6);
    for _ in 0..50 {
        world.step_once();
        let next = (gauge.current_length(world.bodies()).unwrap() - 1.0).abs();
        assert!(next < error, "error grew from {error} to {next}");
        error = next;
    }
    assert!(error < 0.05);
}

#[test]
fn test_chain_velocity_error_shrinks_every_iteration() {
    // Three collinear bodies, two stretched links sharing the middle body
    let mut bodies = BodySet::with_key();
    let handles: Vec<_> = [0.0, 3.0, 6.0]
        .iter()
        .map(|&x| bodies.insert(RigidBody::sphere(Vec3::new(x, 0.0, 0.0), 0.2, 1.0)))
        .collect();
    let mut links = [
        DistanceConstraint::between_centres(handles[0], handles[1], &bodies)
            .unwrap()
            .with_rest_length(1.0),
        DistanceConstraint::between_centres(handles[1], handles[2], &bodies)
            .unwrap()
            .with_rest_length(1.0),
    ];
    let solver = SolverConfig::default();
    for link in &mut links {
        link.pre_solver_step(&bodies, 1.0 / 60.0, &solver);
    }
    let total_error = |links: &[DistanceConstraint], bodies: &BodySet| -> f32 {
        links.iter().map(|l| l.velocity_error(bodies).unwrap().abs()).sum()
    };

    let initial = total_error(&links, &bodies);
    assert!(initial > 0.0);
    let mut error = initial;
    for iteration in 0..6 {
        for link in &mut links {
            link.apply_impulse(&mut bodies);
        }
        let next = total_error(&links, &bodies);
        assert!(next < error, "iteration {iteration}: error grew from {error} to {next}");
        error = next;
    }
    assert!(error < initial * 0.01);
}

#[test]
fn test_distance_constraint_holds_pendulum() {
    let mut world = earth_world();
    let pivot = world.add_body(RigidBody::sphere(Vec3::new(0.0, 10.0, 0.0), 0.1, 0.0));
    let bob = world.add_body(RigidBody::sphere(Vec3::new(2.0, 10.0, 0.0), 0.3, 1.0));
    world.add_constraint(DistanceConstraint::between_centres(pivot, bob, world.bodies()).unwrap());

    for _ in 0..120 {
        world.step_once();
        let length = (world.body(bob).unwrap().position() - Vec3::new(0.0, 10.0, 0.0)).length();
        assert!((length - 2.0).abs() < 0.2, "rod stretched to {length}");
    }
    // Swung down below the pivot
    assert!(world.body(bob).unwrap().position().y < 10.0);
    assert_eq!(world.body(pivot).unwrap().position(), Vec3::new(0.0, 10.0, 0.0));
}

// ============================================================================
// Contacts
// ============================================================================

#[test]
fn test_ball_comes_to_rest_on_ground() {
    let mut world = earth_world();
    add_ground(&mut world);
    let ball = world.add_body(RigidBody::sphere(Vec3::new(0.0, 0.5, 0.0), 0.5, 1.0).with_restitution(0.0));

    for _ in 0..120 {
        world.step_once();
        let y = world.body(ball).unwrap().position().y;
        assert!(y > 0.45 && y < 0.55, "ball at y = {y}");
    }
    assert!(world.body(ball).unwrap().linear_velocity.length() < 0.5);
}

#[test]
fn test_box_rests_on_ground() {
    let mut world = earth_world();
    add_ground(&mut world);
    let block = world.add_body(RigidBody::cuboid(Vec3::new(0.0, 0.5, 0.0), Vec3::splat(0.5), 1.0).with_restitution(0.0));

    for _ in 0..120 {
        world.step_once();
    }
    let body = world.body(block).unwrap();
    assert!(body.position().y > 0.4 && body.position().y < 0.6);
    assert!(body.position().x.abs() < 0.1 && body.position().z.abs() < 0.1);
    assert!(body.angular_velocity.length() < 1.0);
}

#[test]
fn test_restitution_controls_bounce() {
    let bounce = |restitution: f32| {
        let mut world = PhysicsWorld::new(PhysicsConfig::vacuum()).unwrap();
        world.add_body(
            RigidBody::cuboid(Vec3::new(0.0, -1.0, 0.0), Vec3::new(10.0, 1.0, 10.0), 0.0)
                .with_restitution(restitution),
        );
        let ball = world.add_body(
            RigidBody::sphere(Vec3::new(0.0, 0.6, 0.0), 0.5, 1.0)
                .with_restitution(restitution)
                .with_linear_velocity(Vec3::new(0.0, -5.0, 0.0)),
        );
        // Contact is first detected on the third sub-step
        for _ in 0..3 {
            world.step_once();
        }
        world.body(ball).unwrap().linear_velocity.y
    };

    let elastic = bounce(1.0);
    let inelastic = bounce(0.0);
    assert!(elastic > 4.0, "elastic rebound {elastic}");
    assert!((0.0..1.0).contains(&inelastic), "inelastic rebound {inelastic}");
}

#[test]
fn test_friction_stops_sliding_box() {
    let slide = |friction: f32| {
        let mut world = earth_world();
        world.add_body(
            RigidBody::cuboid(Vec3::new(0.0, -1.0, 0.0), Vec3::new(10.0, 1.0, 10.0), 0.0)
                .with_friction(friction),
        );
        let block = world.add_body(
            RigidBody::cuboid(Vec3::new(0.0, 0.49, 0.0), Vec3::splat(0.5), 1.0)
                .with_friction(friction)
                .with_restitution(0.0)
                .with_linear_velocity(Vec3::new(3.0, 0.0, 0.0)),
        );
        for _ in 0..60 {
            world.step_once();
        }
        world.body(block).unwrap().linear_velocity.x
    };

    let frictionless = slide(0.0);
    let rough = slide(0.8);
    assert!(frictionless > 2.5, "frictionless box slowed to {frictionless}");
    assert!(rough.abs() < 1.0, "rough box still at {rough}");
}

#[test]
fn test_static_pair_produces_no_impulse() {
    let mut world = earth_world();
    let a = world.add_body(RigidBody::cuboid(Vec3::ZERO, Vec3::ONE, 0.0));
    let b = world.add_body(RigidBody::cuboid(Vec3::new(1.5, 0.0, 0.0), Vec3::ONE, 0.0));
    world.step_once();
    assert_eq!(world.manifolds().len(), 1);
    assert_eq!(world.body(a).unwrap().linear_velocity, Vec3::ZERO);
    assert_eq!(world.body(b).unwrap().linear_velocity, Vec3::ZERO);
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_seeded_shuffle_is_reproducible() {
    let run = || {
        let config = PhysicsConfig {
            solver: SolverConfig {
                order: SolverOrder::Shuffled { seed: Some(7) },
                ..SolverConfig::default()
            },
            ..PhysicsConfig::default()
        };
        let mut world = PhysicsWorld::new(config).unwrap();
        let pool = BallPoolConfig {
            dims: 3,
            ..BallPoolConfig::default()
        };
        let balls = scenes::ball_pool(&mut world, &pool);
        for _ in 0..90 {
            world.step_once();
        }
        balls
            .iter()
            .map(|h| world.body(*h).unwrap().position())
            .collect::<Vec<_>>()
    };

    assert_eq!(run(), run());
}
