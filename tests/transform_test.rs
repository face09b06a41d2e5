use cgmath::{Deg, Matrix4, One, Quaternion, Rotation3, SquareMatrix, Vector3};
use roll_ngin::{
    data_structures::transform::{Transform, Transforms},
    resources::scene_file::SceneError,
};

mod common;

fn assert_identity(m: Matrix4<f32>) {
    let identity = Matrix4::<f32>::identity();
    for c in 0..4 {
        for r in 0..4 {
            common::assert_close(m[c][r], identity[c][r], 1e-4);
        }
    }
}

fn chain() -> (Transforms, Vec<roll_ngin::data_structures::transform::TransformId>) {
    let mut transforms = Transforms::new();
    let root = transforms.push_root(Transform {
        position: Vector3::new(3.0, -1.0, 2.0),
        rotation: Quaternion::from_angle_z(Deg(30.0)),
        scale: Vector3::new(2.0, 2.0, 2.0),
        ..Transform::named("root")
    });
    let arm = transforms
        .push(Transform {
            position: Vector3::new(0.0, 4.0, 0.0),
            rotation: Quaternion::from_angle_x(Deg(-45.0)),
            scale: Vector3::new(1.0, 0.5, 3.0),
            parent: Some(root),
            ..Transform::named("arm")
        })
        .unwrap();
    let hand = transforms
        .push(Transform {
            position: Vector3::new(1.0, 0.0, -2.0),
            rotation: Quaternion::from_angle_y(Deg(90.0)),
            parent: Some(arm),
            ..Transform::named("hand")
        })
        .unwrap();
    (transforms, vec![root, arm, hand])
}

#[test]
fn local_to_world_inverts_world_to_local() {
    let (transforms, ids) = chain();
    for id in ids {
        assert_identity(transforms.local_to_world(id) * transforms.world_to_local(id));
        assert_identity(transforms.world_to_local(id) * transforms.local_to_world(id));
    }
}

#[test]
fn parent_to_local_inverts_local_to_parent() {
    let transform = Transform {
        position: Vector3::new(-5.0, 0.5, 7.0),
        rotation: Quaternion::from_angle_z(Deg(120.0)),
        scale: Vector3::new(0.25, 4.0, 1.5),
        ..Transform::new()
    };
    assert_identity(transform.local_to_parent() * transform.parent_to_local());
}

#[test]
fn zero_scale_is_degenerate_not_infinite() {
    let transform = Transform {
        position: Vector3::new(1.0, 2.0, 3.0),
        scale: Vector3::new(0.0, 1.0, 1.0),
        ..Transform::new()
    };
    let m = transform.parent_to_local();
    for c in 0..4 {
        for r in 0..4 {
            assert!(m[c][r].is_finite());
        }
    }
    assert_eq!(m[0][0], 0.0);
}

#[test]
fn world_position_follows_the_parent_chain() {
    let mut transforms = Transforms::new();
    let root = transforms.push_root(Transform {
        position: Vector3::new(10.0, 0.0, 0.0),
        rotation: Quaternion::from_angle_z(Deg(90.0)),
        ..Transform::new()
    });
    let child = transforms
        .push(Transform {
            position: Vector3::new(1.0, 0.0, 0.0),
            parent: Some(root),
            ..Transform::new()
        })
        .unwrap();
    let p = transforms.world_position(child);
    common::assert_close(p.x, 10.0, 1e-5);
    common::assert_close(p.y, 1.0, 1e-5);
    common::assert_close(p.z, 0.0, 1e-5);
}

#[test]
fn parent_must_precede_child() {
    let mut transforms = Transforms::new();
    let root = transforms.push_root(Transform::new());
    let mut other = Transforms::new();
    other.push_root(Transform::new());
    other.push_root(Transform::new());
    let dangling = other.push_root(Transform::new());

    let err = transforms
        .push(Transform {
            parent: Some(dangling),
            ..Transform::new()
        })
        .unwrap_err();
    assert!(matches!(
        err,
        SceneError::NotTopological { index: 1, parent: 2 }
    ));
    assert_eq!(transforms.len(), 1);
    assert!(transforms.get(root).is_some());
}

#[test]
fn ids_stay_valid_as_the_arena_grows() {
    let mut transforms = Transforms::new();
    let first = transforms.push_root(Transform::named("first"));
    for i in 0..1000 {
        transforms.push_root(Transform::named(format!("t{}", i)));
    }
    assert_eq!(transforms[first].name, "first");
    assert_eq!(transforms[first].rotation, Quaternion::one());
}
