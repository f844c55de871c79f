use std::path::Path;

use image::{GrayImage, RgbaImage};
use tempfile::TempDir;
use turntable_scene::{
    resources::{
        material::MaterialRegistry,
        texture::{TextureError, TextureId, TextureRegistry},
    },
    scene::SceneDescription,
};

use crate::common::test_utils::{TagUploader, register_all};

mod common;

const SCENE: &str = r#"
    #![enable(implicit_some)]
    (
        textures: [
            (tag: "Wood", path: "textures/Wood.png"),
            (tag: "Shade", path: "textures/Shade.png"),
            (tag: "Mask", path: "textures/Mask.png"),
            (tag: "Glass", path: "textures/Glass.png"),
        ],
        parts: [],
    )
"#;

fn write_fixtures(root: &Path) {
    let textures = root.join("textures");
    std::fs::create_dir_all(&textures).unwrap();
    RgbaImage::from_pixel(8, 8, image::Rgba([200, 150, 100, 255]))
        .save(textures.join("Wood.png"))
        .unwrap();
    RgbaImage::from_pixel(3, 5, image::Rgba([255, 255, 255, 64]))
        .save(textures.join("Shade.png"))
        .unwrap();
    GrayImage::from_pixel(4, 4, image::Luma([128]))
        .save(textures.join("Mask.png"))
        .unwrap();
    // Glass.png is never written
}

#[test]
fn scene_textures_register_in_document_order() {
    let dir = TempDir::new().unwrap();
    write_fixtures(dir.path());
    let scene = SceneDescription::from_ron_str(SCENE).unwrap();

    let (registry, uploader, loaded) = register_all(dir.path(), &scene);
    assert_eq!(loaded, 2);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.find_slot("Wood"), Some(0));
    assert_eq!(registry.find_slot("Shade"), Some(1));
    assert_eq!(registry.find_slot("Mask"), None);
    assert_eq!(registry.find_slot("Glass"), None);
    assert_eq!(
        uploader.uploads,
        vec![("Wood".to_string(), 8, 8), ("Shade".to_string(), 3, 5)]
    );

    let tags: Vec<_> = registry.iter().map(|entry| entry.handle.as_str()).collect();
    assert_eq!(tags, ["Wood", "Shade"]);
}

#[test]
fn detailed_errors_name_the_problem() {
    let dir = TempDir::new().unwrap();
    write_fixtures(dir.path());
    let textures = dir.path().join("textures");
    let mut registry: TextureRegistry<String> = TextureRegistry::new();
    let mut uploader = TagUploader::default();

    let id = registry
        .try_register(&mut uploader, &textures.join("Wood.png"), "Wood")
        .unwrap();
    assert_ne!(id, TextureId(0));
    assert_eq!(registry.find_id("Wood"), Some(id));

    assert!(matches!(
        registry.try_register(&mut uploader, &textures.join("Shade.png"), "Wood"),
        Err(TextureError::DuplicateTag(tag)) if tag == "Wood"
    ));
    assert!(matches!(
        registry.try_register(&mut uploader, &textures.join("Mask.png"), "Mask"),
        Err(TextureError::UnsupportedChannels { channels: 1, .. })
    ));
    assert!(matches!(
        registry.try_register(&mut uploader, &textures.join("Glass.png"), "Glass"),
        Err(TextureError::Decode { .. })
    ));
    assert_eq!(registry.len(), 1);
}

#[test]
fn material_lookup_is_exact() {
    let registry = MaterialRegistry::new();
    assert!(registry.find("Glossy").is_none());

    let scene = SceneDescription::load(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/scene.ron"))
        .unwrap();
    let registry = scene.material_registry();
    assert_eq!(registry.len(), 7);
    let glossy = registry.find("Glossy").unwrap();
    assert_eq!(glossy.shininess, 80.0);
    assert_eq!(glossy.ambient_strength, 0.3);
    assert!(registry.find("Super").is_none());
    assert!(registry.find("super glossy").is_none());
    assert_eq!(registry.find("Super Glossy").map(|m| m.shininess), Some(90.0));
}
