use std::sync::Arc;

use cgmath::{Deg, InnerSpace, Matrix4, Quaternion, Rotation3, Vector3};
use roll_ngin::{
    collide::{self, ColliderError, MeshCollider, SlideParams},
    data_structures::{
        mesh::{MeshBuffer, Topology},
        transform::{Transform, TransformId, Transforms},
    },
};

mod common;

/// A 100x100 floor at z = 0.
fn floor() -> (Vec<MeshCollider>, Transforms) {
    let mut buffer = MeshBuffer::new();
    buffer.push_mesh("floor", Topology::Triangles, &common::quad(50.0, 0.0));
    let buffer = Arc::new(buffer);
    let mut transforms = Transforms::new();
    let transform = transforms.push_root(Transform::named("floor"));
    let mesh = buffer.lookup("floor").unwrap().clone();
    let collider = MeshCollider::new(transform, &mesh, buffer).unwrap();
    (vec![collider], transforms)
}

const PLAYER: SlideParams = SlideParams {
    radius: 1.0,
    response: 1.1,
    max_iterations: 10,
};

#[test]
fn sweep_without_colliders_reaches_the_destination() {
    let transforms = Transforms::new();
    let from = Vector3::new(1.0, 2.0, 3.0);
    let to = Vector3::new(-4.0, 0.5, 9.0);
    let result = collide::sweep(from, to, 1.0, &[], &transforms);
    assert!(!result.collided);
    assert_eq!(result.t, 1.0);
    assert_eq!(result.position, to);
}

#[test]
fn sphere_falling_onto_floor_stops_one_radius_above_it() {
    let (colliders, transforms) = floor();
    let from = Vector3::new(0.3, -0.7, 5.0);
    let to = Vector3::new(0.3, -0.7, -5.0);
    let result = collide::sweep(from, to, 1.0, &colliders, &transforms);

    assert!(result.collided);
    common::assert_close(result.t, 0.4, 1e-5);
    let expected = Vector3::new(0.3, -0.7, 1.0);
    assert!((result.position - expected).magnitude() < 1e-4);
    assert!((result.contact - Vector3::new(0.3, -0.7, 0.0)).magnitude() < 1e-4);
    assert!(result.normal.dot(to - from) < 0.0);
    common::assert_close(result.normal.z, 1.0, 1e-5);
}

#[test]
fn floor_is_two_sided() {
    let (colliders, transforms) = floor();
    let from = Vector3::new(1.0, 1.5, -4.0);
    let to = Vector3::new(1.0, 1.5, 4.0);
    let result = collide::sweep(from, to, 1.0, &colliders, &transforms);
    assert!(result.collided);
    common::assert_close(result.position.z, -1.0, 1e-4);
    common::assert_close(result.normal.z, -1.0, 1e-5);
}

#[test]
fn moving_away_from_a_touched_surface_is_free() {
    let (colliders, transforms) = floor();
    let from = Vector3::new(0.0, 3.0, 1.0);
    let to = Vector3::new(2.0, 3.0, 3.0);
    let result = collide::sweep(from, to, 1.0, &colliders, &transforms);
    assert!(!result.collided);
}

#[test]
fn sphere_hits_triangle_edge_from_the_side() {
    // floor edge at x = 50
    let (colliders, transforms) = floor();
    let from = Vector3::new(60.0, 0.0, 0.0);
    let to = Vector3::new(40.0, 0.0, 0.0);
    let result = collide::sweep(from, to, 1.0, &colliders, &transforms);
    assert!(result.collided);
    common::assert_close(result.position.x, 51.0, 1e-3);
    common::assert_close(result.normal.x, 1.0, 1e-3);
}

#[test]
fn slide_removes_only_the_inward_velocity() {
    let (colliders, transforms) = floor();
    for vx in [-3.0, 0.0, 2.0] {
        for vy in [-2.5, 0.0, 1.0] {
            for vz in [2.0, 3.0, 5.0] {
                let mut position = Vector3::new(0.3, -0.9, 2.0);
                let mut velocity = Vector3::new(vx, vy, -vz);
                let contacts =
                    collide::slide(&mut position, &mut velocity, 1.0, PLAYER, &colliders, &transforms);

                assert!(contacts >= 1);
                assert!(velocity.z >= 0.0, "velocity {:?} still points into the floor", velocity);
                common::assert_close(velocity.x, vx, 1e-5);
                common::assert_close(velocity.y, vy, 1e-5);
                assert!(position.z >= 1.0 - 1e-3);
            }
        }
    }
}

#[test]
fn slide_without_contact_moves_freely() {
    let (colliders, transforms) = floor();
    let mut position = Vector3::new(0.0, 0.0, 10.0);
    let mut velocity = Vector3::new(1.0, 2.0, 0.0);
    let contacts = collide::slide(&mut position, &mut velocity, 0.5, PLAYER, &colliders, &transforms);
    assert_eq!(contacts, 0);
    assert_eq!(position, Vector3::new(0.5, 1.0, 10.0));
    assert_eq!(velocity, Vector3::new(1.0, 2.0, 0.0));
}

#[test]
fn exhausted_iteration_budget_drops_the_rest_of_the_step() {
    let (colliders, transforms) = floor();
    let single = SlideParams {
        max_iterations: 1,
        ..PLAYER
    };
    let mut position = Vector3::new(0.3, -0.9, 5.0);
    let mut velocity = Vector3::new(0.0, 0.0, -10.0);
    let contacts = collide::slide(&mut position, &mut velocity, 1.0, single, &colliders, &transforms);

    assert_eq!(contacts, 1);
    // contact after 0.4s; the bounce velocity would carry the last 0.6s to z = 1.6
    common::assert_close(position.z, 1.0, 1e-4);
    common::assert_close(velocity.z, 1.0, 1e-4);
    assert_eq!([position.x, position.y], [0.3, -0.9]);

    // with a budget the same step finishes its bounce
    let mut position = Vector3::new(0.3, -0.9, 5.0);
    let mut velocity = Vector3::new(0.0, 0.0, -10.0);
    collide::slide(&mut position, &mut velocity, 1.0, PLAYER, &colliders, &transforms);
    common::assert_close(position.z, 1.6, 1e-3);
}

#[test]
fn zero_time_step_does_nothing() {
    let (colliders, transforms) = floor();
    let mut position = Vector3::new(0.0, 0.0, 1.5);
    let mut velocity = Vector3::new(0.0, 0.0, -100.0);
    let contacts = collide::slide(&mut position, &mut velocity, 0.0, PLAYER, &colliders, &transforms);
    assert_eq!(contacts, 0);
    assert_eq!(position, Vector3::new(0.0, 0.0, 1.5));
}

#[test]
fn broad_phase_uses_the_collider_transform() {
    let (mut colliders, mut transforms) = floor();
    // move the floor far away; the same sweep must now miss
    transforms[colliders[0].transform].position = Vector3::new(500.0, 0.0, 0.0);
    let result = collide::sweep(
        Vector3::new(0.0, 0.0, 5.0),
        Vector3::new(0.0, 0.0, -5.0),
        1.0,
        &colliders,
        &transforms,
    );
    assert!(!result.collided);

    // and a raised copy is hit at its new height
    let raised = transforms.push_root(Transform {
        position: Vector3::new(0.0, 0.0, 2.0),
        ..Transform::new()
    });
    let mut copy = colliders[0].clone();
    copy.transform = raised;
    colliders.push(copy);
    let result = collide::sweep(
        Vector3::new(0.0, 0.5, 5.0),
        Vector3::new(0.0, 0.5, -5.0),
        1.0,
        &colliders,
        &transforms,
    );
    assert!(result.collided);
    common::assert_close(result.position.z, 3.0, 1e-4);
}

#[test]
fn earliest_contact_wins_over_collider_order() {
    let (mut colliders, mut transforms) = floor();
    let high: TransformId = transforms.push_root(Transform {
        position: Vector3::new(0.0, 0.0, 3.0),
        ..Transform::new()
    });
    let mut copy = colliders[0].clone();
    copy.transform = high;
    colliders.push(copy);

    let result = collide::sweep(
        Vector3::new(0.2, 0.1, 10.0),
        Vector3::new(0.2, 0.1, -10.0),
        1.0,
        &colliders,
        &transforms,
    );
    assert!(result.collided);
    common::assert_close(result.position.z, 4.0, 1e-4);
}

#[test]
fn non_triangle_meshes_cannot_collide() {
    let mut buffer = MeshBuffer::new();
    buffer.push_mesh("wire", Topology::Lines, &common::quad(1.0, 0.0));
    let mesh = buffer.lookup("wire").unwrap().clone();
    let mut transforms = Transforms::new();
    let transform = transforms.push_root(Transform::new());
    let err = MeshCollider::new(transform, &mesh, Arc::new(buffer)).unwrap_err();
    assert!(matches!(
        err,
        ColliderError::UnsupportedTopology {
            topology: Topology::Lines,
            ..
        }
    ));
}

#[test]
fn world_bounds_cover_a_rotated_scaled_box() {
    let to_world = Matrix4::from_translation(Vector3::new(10.0, 0.0, 0.0))
        * Matrix4::from(Quaternion::from_angle_z(Deg(90.0)))
        * Matrix4::from_scale(2.0);
    let (min, max) = collide::world_bounds(
        &to_world,
        Vector3::new(-1.0, -2.0, 0.0),
        Vector3::new(1.0, 2.0, 0.0),
    );
    let expect = |v: Vector3<f32>, e: [f32; 3]| {
        for axis in 0..3 {
            common::assert_close(v[axis], e[axis], 1e-4);
        }
    };
    expect(min, [6.0, -2.0, 0.0]);
    expect(max, [14.0, 2.0, 0.0]);
}

#[test]
fn aabb_overlap_includes_touching_boxes() {
    let unit = Vector3::new(1.0, 1.0, 1.0);
    let zero = Vector3::new(0.0, 0.0, 0.0);
    assert!(collide::aabb_overlap(zero, unit, unit, unit * 2.0));
    assert!(!collide::aabb_overlap(zero, unit, unit * 1.01, unit * 2.0));
    assert!(collide::aabb_overlap(-unit, unit, zero, zero));
}
