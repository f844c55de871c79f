use std::path::{Path, PathBuf};

/**
 * This module contains everything the scene is assembled from: textures loaded
 * from image files, named lighting materials and the primitive meshes.
 */
pub mod material;
pub mod shapes;
pub mod texture;

/// Resolves `file` against the asset root. Absolute paths are kept as they are.
pub fn asset_path(root: &Path, file: impl AsRef<Path>) -> PathBuf {
    let file = file.as_ref();
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        root.join(file)
    }
}
