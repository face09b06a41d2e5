use std::path::PathBuf;

use roll_ngin::resources::{self, LoadedAssets, TextureSource};

mod common;

/// Writes `bytes` to a fresh file in the temp directory. Absolute paths are
/// not rebased onto the asset directory.
fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("roll-ngin-{}-{}", std::process::id(), name));
    std::fs::write(&path, bytes).unwrap();
    path
}

#[tokio::test]
async fn textures_load_under_their_name() {
    let png = common::png([10, 20, 30, 255]);
    let path = temp_file("soil.png", &png);

    let mut assets = LoadedAssets::new();
    let id = resources::load_texture(&mut assets, "soil", path.to_str().unwrap())
        .await
        .unwrap();
    assert_eq!(assets.texture_id("soil"), Some(id));

    let (_, name, source) = assets.textures().find(|(t, _, _)| *t == id).unwrap();
    assert_eq!(name, "soil");
    match source {
        TextureSource::Encoded(bytes) => assert_eq!(bytes, &png),
        other => panic!("unexpected source {:?}", other),
    }
    std::fs::remove_file(path).unwrap();
}

#[tokio::test]
async fn unknown_image_formats_are_rejected() {
    let path = temp_file("notes.txt", b"not an image at all");
    let mut assets = LoadedAssets::new();
    let result = resources::load_texture(&mut assets, "notes", path.to_str().unwrap()).await;
    assert!(result.is_err());
    assert_eq!(assets.texture_id("notes"), None);
    std::fs::remove_file(path).unwrap();
}

#[tokio::test]
async fn missing_files_name_the_path() {
    let mut assets = LoadedAssets::new();
    let err = resources::load_texture(&mut assets, "gone", "does-not-exist.png")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("does-not-exist.png"), "{}", err);
}
