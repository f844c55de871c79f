//! Named lighting materials.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A fixed, named bundle of lighting coefficients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialPreset {
    pub tag: String,
    pub ambient_color: [f32; 3],
    pub ambient_strength: f32,
    pub diffuse_color: [f32; 3],
    pub specular_color: [f32; 3],
    pub shininess: f32,
}

impl MaterialPreset {
    /// Packs the preset into the three material rows of the part uniform.
    pub fn to_rows(&self) -> [[f32; 4]; 3] {
        let [ar, ag, ab] = self.ambient_color;
        let [dr, dg, db] = self.diffuse_color;
        let [sr, sg, sb] = self.specular_color;
        [
            [ar, ag, ab, self.ambient_strength],
            [dr, dg, db, self.shininess],
            [sr, sg, sb, 0.0],
        ]
    }
}

/// Exact-match lookup table of material presets.
#[derive(Clone, Debug, Default)]
pub struct MaterialRegistry {
    presets: HashMap<String, MaterialPreset>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `preset`. A preset with the same tag is replaced.
    pub fn define(&mut self, preset: MaterialPreset) {
        if let Some(old) = self.presets.insert(preset.tag.clone(), preset) {
            log::warn!("Material {:?} was defined twice, keeping the later one", old.tag);
        }
    }

    pub fn find(&self, tag: &str) -> Option<&MaterialPreset> {
        self.presets.get(tag)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

impl FromIterator<MaterialPreset> for MaterialRegistry {
    fn from_iter<T: IntoIterator<Item = MaterialPreset>>(iter: T) -> Self {
        let mut registry = Self::new();
        iter.into_iter().for_each(|preset| registry.define(preset));
        registry
    }
}
