//! The scene as data.
//!
//! A [`SceneDescription`] is read from a RON document and holds everything the
//! renderer needs to set up once: the texture files with their tags, the
//! material presets, up to [`MAX_LIGHTS`] point lights and the ordered list of
//! [`PartRecord`]s that is walked every frame (see [`walk`]).
//!
//! # Key types
//! - [`SceneDescription`]: the whole document
//! - [`PartRecord`]: one decorative element (transform, appearance, mesh)
//! - [`LightSource`]: a point light
//! - [`SceneWarning`]: non-fatal problems found by [`SceneDescription::validate`]

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    data_structures::instance::Transform,
    resources::{
        asset_path,
        material::{MaterialPreset, MaterialRegistry},
        shapes::MeshKind,
        texture::{TextureRegistry, TextureUploader},
    },
};

pub mod walk;

/// The shader has room for this many lights; extra ones are ignored.
pub const MAX_LIGHTS: usize = 4;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("could not read scene file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed scene description: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Problems that don't stop the scene from rendering but will make it look wrong.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneWarning {
    #[error("part {part:?} uses texture {tag:?} which is never loaded")]
    UnknownTexture { part: String, tag: String },
    #[error("part {part:?} uses material {tag:?} which is never defined")]
    UnknownMaterial { part: String, tag: String },
    #[error("{0} lights are defined but only {} are used", MAX_LIGHTS)]
    TooManyLights(usize),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureSource {
    pub tag: String,
    /// Relative to the asset root.
    pub path: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightSource {
    pub position: [f32; 3],
    pub ambient_color: [f32; 3],
    pub diffuse_color: [f32; 3],
    pub specular_color: [f32; 3],
    pub focal_strength: f32,
    pub specular_intensity: f32,
}

/// One decorative element of the scene.
///
/// `color` is applied before `texture`, so a part that names both ends up
/// textured. Appearance fields left out keep whatever the previous part set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartRecord {
    pub name: String,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub color: Option<[f32; 4]>,
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub uv_scale: Option<[f32; 2]>,
    pub mesh: MeshKind,
}

fn lighting_on() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub textures: Vec<TextureSource>,
    #[serde(default)]
    pub materials: Vec<MaterialPreset>,
    #[serde(default)]
    pub lights: Vec<LightSource>,
    #[serde(default = "lighting_on")]
    pub use_lighting: bool,
    pub parts: Vec<PartRecord>,
}

impl SceneDescription {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scene = Self::from_ron_str(&text)?;
        log::info!(
            "Loaded scene {:?}: {} parts, {} textures, {} materials, {} lights",
            path,
            scene.parts.len(),
            scene.textures.len(),
            scene.materials.len(),
            scene.lights.len()
        );
        Ok(scene)
    }

    pub fn from_ron_str(text: &str) -> Result<Self, SceneError> {
        Ok(ron::from_str(text)?)
    }

    /// Checks tag references and the light count, logging every finding.
    pub fn validate(&self) -> Vec<SceneWarning> {
        let textures: HashSet<&str> = self.textures.iter().map(|t| t.tag.as_str()).collect();
        let materials: HashSet<&str> = self.materials.iter().map(|m| m.tag.as_str()).collect();
        let mut warnings = Vec::new();

        for part in &self.parts {
            if let Some(tag) = part.texture.as_deref().filter(|tag| !textures.contains(tag)) {
                warnings.push(SceneWarning::UnknownTexture {
                    part: part.name.clone(),
                    tag: tag.to_string(),
                });
            }
            if let Some(tag) = part.material.as_deref().filter(|tag| !materials.contains(tag)) {
                warnings.push(SceneWarning::UnknownMaterial {
                    part: part.name.clone(),
                    tag: tag.to_string(),
                });
            }
        }
        if self.lights.len() > MAX_LIGHTS {
            warnings.push(SceneWarning::TooManyLights(self.lights.len()));
        }

        warnings.iter().for_each(|warning| log::warn!("{warning}"));
        warnings
    }

    /// The lights the shader will actually see.
    pub fn active_lights(&self) -> &[LightSource] {
        &self.lights[..self.lights.len().min(MAX_LIGHTS)]
    }

    pub fn material_registry(&self) -> MaterialRegistry {
        self.materials.iter().cloned().collect()
    }

    /// Registers every texture source in document order. Returns how many succeeded.
    pub fn register_textures<U>(
        &self,
        registry: &mut TextureRegistry<U::Handle>,
        uploader: &mut U,
        asset_root: &Path,
    ) -> usize
    where
        U: TextureUploader,
    {
        let mut loaded = 0;
        for source in &self.textures {
            let path = asset_path(asset_root, &source.path);
            if registry.register(&mut *uploader, path, &source.tag) {
                loaded += 1;
            }
        }
        loaded
    }

    /// Mesh kinds referenced by at least one part, in first-use order.
    pub fn mesh_kinds(&self) -> Vec<MeshKind> {
        let mut seen = HashSet::new();
        self.parts
            .iter()
            .map(|part| part.mesh)
            .filter(|kind| seen.insert(*kind))
            .collect()
    }
}
