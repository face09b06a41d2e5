#![allow(dead_code)]

use roll_ngin::{
    config::Settings,
    data_structures::mesh::{MeshBuffer, Topology, Vertex},
    resources::{LoadedAssets, scene_file::SceneFile},
    roll::{LevelError, RollAssets, RollLevel},
};

/// Two triangles covering `[-half, half]²` at height `z`, facing +z.
pub fn quad(half: f32, z: f32) -> Vec<Vertex> {
    let up = [0.0, 0.0, 1.0];
    [
        [-half, -half, z],
        [half, -half, z],
        [half, half, z],
        [-half, -half, z],
        [half, half, z],
        [-half, half, z],
    ]
    .into_iter()
    .map(|p| Vertex::new(p, up))
    .collect()
}

/// A small triangle around the origin, used for marker meshes.
pub fn marker() -> Vec<Vertex> {
    let up = [0.0, 0.0, 1.0];
    vec![
        Vertex::new([-0.25, -0.25, 0.0], up),
        Vertex::new([0.25, -0.25, 0.0], up),
        Vertex::new([0.0, 0.25, 0.0], up),
    ]
}

/// Mesh buffer with every mesh name the default level settings know about.
pub fn level_meshes() -> MeshBuffer {
    let mut buffer = MeshBuffer::new();
    buffer.push_mesh("player", Topology::Triangles, &marker());
    buffer.push_mesh("soil", Topology::Triangles, &quad(50.0, 0.0));
    buffer.push_mesh("path", Topology::Triangles, &quad(2.0, 0.0));
    buffer.push_mesh("goal", Topology::Triangles, &marker());
    buffer.push_mesh("destination", Topology::Triangles, &marker());
    buffer
}

/// A scene file with one root transform and mesh instance per entry.
pub fn scene(entries: &[(&str, [f32; 3])]) -> SceneFile {
    let mut file = SceneFile::default();
    for (mesh, position) in entries {
        let transform = file.push_transform(mesh, None, *position);
        file.push_mesh(transform, mesh);
    }
    file
}

pub fn roll_assets(buffer: MeshBuffer) -> (LoadedAssets, RollAssets) {
    let mut assets = LoadedAssets::new();
    let roll = RollAssets::register(&mut assets, buffer, &Settings::default())
        .expect("first-pass program should register");
    (assets, roll)
}

pub fn load_level(buffer: MeshBuffer, file: &SceneFile) -> Result<RollLevel, LevelError> {
    let (assets, roll) = roll_assets(buffer);
    RollLevel::new(file, "test level", &assets, &roll, &Settings::default())
}

pub fn assert_close(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "{} and {} differ by more than {}", a, b, eps);
}

/// A 2x2 PNG filled with `rgba`.
pub fn png(rgba: [u8; 4]) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
