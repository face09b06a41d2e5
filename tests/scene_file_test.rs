use std::io::Cursor;

use roll_ngin::{
    data_structures::scene::{LightKind, Scene},
    resources::{
        chunk::ChunkError,
        scene_file::{CameraEntry, LampEntry, MeshEntry, SceneError, SceneFile},
    },
};

mod common;

fn sample() -> SceneFile {
    let mut file = SceneFile::default();
    let root = file.push_transform("root", None, [1.0, 2.0, 3.0]);
    let child = file.push_transform("child", Some(root), [0.0, 1.0, 0.0]);
    file.push_mesh(child, "soil");
    file.push_mesh(root, "player");
    file.cameras.push(CameraEntry {
        transform: root,
        kind: *b"pers",
        data: 45.0,
        near: 0.1,
        far: 100.0,
    });
    file.cameras.push(CameraEntry {
        transform: child,
        kind: *b"orth",
        data: 10.0,
        near: 0.1,
        far: 100.0,
    });
    file.lamps.push(LampEntry {
        transform: child,
        kind: b's',
        color: [255, 0, 51],
        energy: 2.0,
        distance: 30.0,
        fov: 90.0,
    });
    file.lamps.push(LampEntry {
        transform: root,
        kind: b'x',
        color: [255, 255, 255],
        energy: 1.0,
        distance: 1.0,
        fov: 0.0,
    });
    file
}

fn bytes(file: &SceneFile) -> Vec<u8> {
    let mut out = Vec::new();
    file.write_to(&mut out).unwrap();
    out
}

fn load(file: &SceneFile) -> Result<(Scene, Vec<String>), SceneError> {
    let mut scene = Scene::new();
    let mut meshes = Vec::new();
    scene.load(file, |scene, transform, name| {
        meshes.push(format!("{}@{}", name, scene.transforms[transform].name));
        Ok::<(), SceneError>(())
    })?;
    Ok((scene, meshes))
}

#[test]
fn written_files_read_back_unchanged() {
    let file = sample();
    let read = SceneFile::from_reader(&mut Cursor::new(bytes(&file)), "sample").unwrap();
    assert_eq!(read, file);
}

#[test]
fn trailing_data_is_ignored() {
    let file = sample();
    let mut data = bytes(&file);
    data.extend_from_slice(b"junk");
    let read = SceneFile::from_reader(&mut Cursor::new(data), "sample").unwrap();
    assert_eq!(read, file);
}

#[test]
fn chunks_must_come_in_order() {
    let mut data = Vec::new();
    roll_ngin::resources::chunk::write_chunk::<u8, _>(&mut data, b"xfh0", &[]).unwrap();
    let err = SceneFile::from_reader(&mut Cursor::new(data), "bad").unwrap_err();
    match err {
        SceneError::Chunk(ChunkError::Magic { expected, found }) => {
            assert_eq!(expected, "str0");
            assert_eq!(found, "xfh0");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn truncated_files_fail() {
    let data = bytes(&sample());
    let err = SceneFile::from_reader(&mut Cursor::new(&data[..data.len() - 3]), "short").unwrap_err();
    assert!(matches!(err, SceneError::Chunk(ChunkError::Io(_))));
}

#[test]
fn chunk_size_must_match_records() {
    let mut data = Vec::new();
    roll_ngin::resources::chunk::write_chunk::<u8, _>(&mut data, b"str0", b"abc").unwrap();
    // 5 bytes cannot hold whole hierarchy records
    roll_ngin::resources::chunk::write_chunk::<u8, _>(&mut data, b"xfh0", &[0; 5]).unwrap();
    let err = SceneFile::from_reader(&mut Cursor::new(data), "odd").unwrap_err();
    assert!(matches!(err, SceneError::Chunk(ChunkError::Size { size: 5, .. })));
}

#[test]
fn load_builds_hierarchy_cameras_and_lights() {
    let (scene, meshes) = load(&sample()).unwrap();

    assert_eq!(scene.transforms.len(), 2);
    let child = scene
        .transforms
        .iter()
        .find(|(_, t)| t.name == "child")
        .map(|(id, _)| id)
        .unwrap();
    let p = scene.transforms.world_position(child);
    assert_eq!([p.x, p.y, p.z], [1.0, 3.0, 3.0]);

    assert_eq!(meshes, vec!["soil@child".to_string(), "player@root".to_string()]);

    // the orthographic camera is skipped
    assert_eq!(scene.cameras.len(), 1);
    common::assert_close(scene.cameras[0].fovy, 45f32.to_radians(), 1e-6);
    assert_eq!(scene.cameras[0].near, 0.1);

    // the unknown lamp type is skipped
    assert_eq!(scene.lights.len(), 1);
    let light = &scene.lights[0];
    assert_eq!(light.kind, LightKind::Spot);
    common::assert_close(light.energy.x, 2.0, 1e-6);
    common::assert_close(light.energy.y, 0.0, 1e-6);
    common::assert_close(light.energy.z, 0.4, 1e-6);
    common::assert_close(light.spot_fov, 90f32.to_radians(), 1e-6);
}

#[test]
fn loading_twice_appends() {
    let file = sample();
    let mut scene = Scene::new();
    for _ in 0..2 {
        scene
            .load(&file, |_, _, _| Ok::<(), SceneError>(()))
            .unwrap();
    }
    assert_eq!(scene.transforms.len(), 4);
    let (id, second_child) = scene.transforms.iter().nth(3).unwrap();
    assert_eq!(second_child.name, "child");
    // parents refer into the second copy
    assert_eq!(second_child.parent.map(|p| p.index()), Some(2));
    assert_eq!(id.index(), 3);
}

#[test]
fn parents_must_precede_children() {
    let mut file = sample();
    file.hierarchy[0].parent = 1;
    let err = load(&file).unwrap_err();
    assert!(matches!(err, SceneError::NotTopological { index: 0, parent: 1 }));

    let mut file = sample();
    file.hierarchy[1].parent = 1;
    assert!(matches!(
        load(&file).unwrap_err(),
        SceneError::NotTopological { index: 1, parent: 1 }
    ));
}

#[test]
fn invalid_name_ranges_fail() {
    let mut file = sample();
    file.hierarchy[1].name_end = 1000;
    assert!(matches!(
        load(&file).unwrap_err(),
        SceneError::InvalidNameRange {
            kind: "transform",
            index: 1,
            ..
        }
    ));

    let mut file = sample();
    file.meshes[0].name_begin = file.meshes[0].name_end + 1;
    assert!(matches!(
        load(&file).unwrap_err(),
        SceneError::InvalidNameRange { kind: "mesh", index: 0, .. }
    ));
}

#[test]
fn invalid_transform_references_fail() {
    let mut file = sample();
    file.meshes.push(MeshEntry {
        transform: 7,
        name_begin: 0,
        name_end: 0,
    });
    assert!(matches!(
        load(&file).unwrap_err(),
        SceneError::InvalidTransformIndex {
            kind: "mesh",
            index: 2,
            transform: 7,
        }
    ));

    let mut file = sample();
    file.lamps[0].transform = 2;
    assert!(matches!(
        load(&file).unwrap_err(),
        SceneError::InvalidTransformIndex { kind: "lamp", .. }
    ));
}

#[test]
fn nothing_is_added_when_the_hierarchy_is_invalid() {
    let mut file = sample();
    file.hierarchy[1].name_end = 1000;
    let mut scene = Scene::new();
    let mut calls = 0;
    let result = scene.load(&file, |_, _, _| {
        calls += 1;
        Ok::<(), SceneError>(())
    });
    assert!(result.is_err());
    assert_eq!(calls, 0);
    assert!(scene.transforms.is_empty());
}
