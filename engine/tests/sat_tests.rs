//! SAT Tests - Narrowphase Detection and Contact Generation
//!
//! Tests for the separating axis detector and the manifold builder.

use glam::{Quat, Vec3};
use sat_impulse_engine::physics::manifold::Manifold;
use sat_impulse_engine::physics::sat::{ShapeInstance, check_axis, detect};
use sat_impulse_engine::physics::{BodyHandle, CollisionShape, Pose, RigidBody};

fn at(position: Vec3) -> Pose {
    Pose::new(position, Quat::IDENTITY)
}

fn manifold_between(a: &RigidBody, b: &RigidBody) -> Option<Manifold> {
    let data = detect(
        &ShapeInstance::new(a.shape()?, a.pose()),
        &ShapeInstance::new(b.shape()?, b.pose()),
    )?;
    Manifold::build(BodyHandle::default(), a, BodyHandle::default(), b, &data)
}

// ============================================================================
// Detection
// ============================================================================

#[test]
fn test_touching_cubes_collide_with_zero_penetration() {
    let cube = CollisionShape::cuboid(Vec3::ONE);
    let a = ShapeInstance::new(&cube, at(Vec3::ZERO));
    let b = ShapeInstance::new(&cube, at(Vec3::new(2.0, 0.0, 0.0)));

    let data = detect(&a, &b).expect("touching cubes count as colliding");
    assert!(data.penetration.abs() < 1e-5, "penetration {}", data.penetration);
    assert!((data.normal - Vec3::X).length() < 1e-5);
}

#[test]
fn test_cubes_with_small_gap_do_not_collide() {
    let cube = CollisionShape::cuboid(Vec3::ONE);
    let a = ShapeInstance::new(&cube, at(Vec3::ZERO));
    let b = ShapeInstance::new(&cube, at(Vec3::new(2.1, 0.0, 0.0)));

    assert!(detect(&a, &b).is_none());
    // The X axis shows the gap
    assert!(check_axis(Vec3::X, &a, &b).is_none());
}

#[test]
fn test_shallowest_axis_is_selected() {
    // Overlap: 0.2 on X, 0.5 on Y, 2.0 on Z
    let cube = CollisionShape::cuboid(Vec3::ONE);
    let a = ShapeInstance::new(&cube, at(Vec3::ZERO));
    let b = ShapeInstance::new(&cube, at(Vec3::new(1.8, 1.5, 0.0)));

    let x = check_axis(Vec3::X, &a, &b).unwrap();
    let y = check_axis(Vec3::Y, &a, &b).unwrap();
    assert!((x.penetration + 0.2).abs() < 1e-5);
    assert!((y.penetration + 0.5).abs() < 1e-5);

    let data = detect(&a, &b).unwrap();
    assert!((data.penetration + 0.2).abs() < 1e-5);
    assert!((data.normal - Vec3::X).length() < 1e-5);
}

#[test]
fn test_rotated_cube_separated_on_its_own_axis() {
    // A 45° cube reaches sqrt(2) along X; a second cube at 2.5 sits just clear
    let cube = CollisionShape::cuboid(Vec3::ONE);
    let a = ShapeInstance::new(&cube, Pose::new(Vec3::ZERO, Quat::from_rotation_z(std::f32::consts::FRAC_PI_4)));
    let b = ShapeInstance::new(&cube, at(Vec3::new(2.5, 0.0, 0.0)));
    assert!(detect(&a, &b).is_none());

    let b = ShapeInstance::new(&cube, at(Vec3::new(2.3, 0.0, 0.0)));
    let data = detect(&a, &b).expect("corner pokes into the cube");
    assert!(data.penetration < 0.0);
    assert!(data.normal.x > 0.0);
}

#[test]
fn test_sphere_inside_cuboid_still_detects() {
    let cube = CollisionShape::cuboid(Vec3::splat(2.0));
    let ball = CollisionShape::sphere(0.5);
    let a = ShapeInstance::new(&cube, at(Vec3::ZERO));
    let b = ShapeInstance::new(&ball, at(Vec3::new(0.5, 0.0, 0.0)));
    let data = detect(&a, &b).expect("sphere centre inside the box");
    assert!(data.penetration < 0.0);
}

// ============================================================================
// Contact generation
// ============================================================================

#[test]
fn test_sphere_resting_on_cuboid_has_one_contact() {
    let ground = RigidBody::cuboid(Vec3::ZERO, Vec3::new(20.0, 1.0, 20.0), 0.0);
    let ball = RigidBody::sphere(Vec3::new(3.0, 1.49, -2.0), 0.5, 1.0);

    let manifold = manifold_between(&ground, &ball).expect("ball rests on the face");
    assert_eq!(manifold.contacts().len(), 1);

    let contact = manifold.contacts()[0];
    assert!((contact.penetration + 0.01).abs() < 1e-4);
    assert!((contact.point_on_a - Vec3::new(3.0, 1.0, -2.0)).length() < 1e-4);
    assert!((contact.point_on_b - Vec3::new(3.0, 0.99, -2.0)).length() < 1e-4);
}

#[test]
fn test_box_on_box_face_overlap_has_four_contacts() {
    let lower = RigidBody::cuboid(Vec3::ZERO, Vec3::ONE, 0.0);
    let upper = RigidBody::cuboid(Vec3::new(1.0, 1.9, 1.0), Vec3::ONE, 1.0);

    let manifold = manifold_between(&lower, &upper).expect("faces overlap");
    let contacts = manifold.contacts();
    assert_eq!(contacts.len(), 4);

    // Clipped to the shared quad [0,1] x [0,1]
    for c in contacts {
        assert!(c.point_on_b.x >= -1e-4 && c.point_on_b.x <= 1.0 + 1e-4);
        assert!(c.point_on_b.z >= -1e-4 && c.point_on_b.z <= 1.0 + 1e-4);
        assert!((c.penetration + 0.1).abs() < 1e-4);
    }
}

#[test]
fn test_yawed_box_on_ground_has_four_contacts() {
    let ground = RigidBody::cuboid(Vec3::ZERO, Vec3::new(10.0, 1.0, 10.0), 0.0);
    let crate_ = RigidBody::cuboid(Vec3::new(0.0, 1.9, 0.0), Vec3::ONE, 1.0)
        .with_orientation(Quat::from_rotation_y(0.3));

    let manifold = manifold_between(&ground, &crate_).expect("crate sinks into ground");
    assert_eq!(manifold.contacts().len(), 4);
    for c in manifold.contacts() {
        assert!((c.normal - Vec3::Y).length() < 1e-4);
    }
}

#[test]
fn test_contact_count_never_exceeds_clip_capacity() {
    // Reference face larger than the incident face: nothing is clipped away
    let ground = RigidBody::cuboid(Vec3::ZERO, Vec3::new(10.0, 1.0, 10.0), 0.0);
    for offset in [0.0, 2.5, 8.5] {
        let block = RigidBody::cuboid(Vec3::new(offset, 1.95, 0.0), Vec3::ONE, 1.0);
        let manifold = manifold_between(&ground, &block).expect("overlapping");
        assert!(!manifold.contacts().is_empty());
        assert!(manifold.contacts().len() <= 4);
    }
}
