use std::path::{Path, PathBuf};

use image::RgbImage;
use turntable_scene::{
    resources::texture::{PreparedImage, TextureRegistry, TextureUploader},
    scene::SceneDescription,
};

/// Stands in for the GPU: the handle is just the tag it was uploaded under.
#[derive(Default)]
pub(crate) struct TagUploader {
    pub uploads: Vec<(String, u32, u32)>,
}

impl TextureUploader for TagUploader {
    type Handle = String;

    fn upload(&mut self, image: &PreparedImage, tag: &str) -> String {
        self.uploads
            .push((tag.to_string(), image.width, image.height));
        tag.to_string()
    }
}

pub(crate) fn shipped_scene_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/scene.ron")
}

pub(crate) fn shipped_scene() -> SceneDescription {
    SceneDescription::load(shipped_scene_path()).expect("the shipped scene parses")
}

/// Writes a small RGB image for every texture source of `scene` except the tags in `skip`.
pub(crate) fn write_texture_files(root: &Path, scene: &SceneDescription, skip: &[&str]) {
    for source in &scene.textures {
        if skip.contains(&source.tag.as_str()) {
            continue;
        }
        let path = root.join(&source.path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::from_pixel(4, 2, image::Rgb([120, 90, 60]))
            .save(&path)
            .unwrap();
    }
}

/// Registers the scene's textures from `root` without a GPU.
pub(crate) fn register_all(
    root: &Path,
    scene: &SceneDescription,
) -> (TextureRegistry<String>, TagUploader, usize) {
    let mut registry = TextureRegistry::new();
    let mut uploader = TagUploader::default();
    let loaded = scene.register_textures(&mut registry, &mut uploader, root);
    (registry, uploader, loaded)
}
