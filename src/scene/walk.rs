//! Turning part records into draws.
//!
//! The shader state behaves like a set of shared uniforms: every part only
//! overwrites what it names, and the rest carries over from the part before.
//! [`walk`] replays the records in order against a [`ShaderState`] and
//! snapshots it into one [`DrawCommand`] per part.

use cgmath::Matrix4;

use crate::{
    data_structures::instance::{PartRaw, Transform},
    resources::{
        material::{MaterialPreset, MaterialRegistry},
        shapes::MeshKind,
        texture::TextureRegistry,
    },
    scene::PartRecord,
};

/// CPU copy of the per-draw uniforms.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderState {
    pub model: Matrix4<f32>,
    pub normal: Matrix4<f32>,
    pub color: [f32; 4],
    pub use_texture: bool,
    pub texture_slot: Option<usize>,
    pub uv_scale: [f32; 2],
    pub material: Option<MaterialPreset>,
}

impl Default for ShaderState {
    fn default() -> Self {
        let identity = Transform::new();
        Self {
            model: identity.to_matrix(),
            normal: identity.to_normal_matrix(),
            color: [1.0, 1.0, 1.0, 1.0],
            use_texture: false,
            texture_slot: None,
            uv_scale: [1.0, 1.0],
            material: None,
        }
    }
}

impl ShaderState {
    pub fn set_transform(&mut self, transform: &Transform) {
        self.model = transform.to_matrix();
        self.normal = transform.to_normal_matrix();
    }

    /// Switches to flat color. Any texture chosen earlier is ignored from now on.
    pub fn set_color(&mut self, color: [f32; 4]) {
        self.use_texture = false;
        self.color = color;
    }

    pub fn set_texture_slot(&mut self, slot: usize) {
        self.use_texture = true;
        self.texture_slot = Some(slot);
    }

    pub fn set_uv_scale(&mut self, uv_scale: [f32; 2]) {
        self.uv_scale = uv_scale;
    }

    pub fn set_material(&mut self, material: &MaterialPreset) {
        self.material = Some(material.clone());
    }

    /// The slot actually sampled by the next draw.
    pub fn active_slot(&self) -> Option<usize> {
        self.texture_slot.filter(|_| self.use_texture)
    }

    pub fn is_transparent(&self) -> bool {
        self.color[3] < 1.0
    }

    pub fn to_raw(&self) -> PartRaw {
        let [ambient, diffuse, specular] = self
            .material
            .as_ref()
            .map(MaterialPreset::to_rows)
            .unwrap_or([[0.0; 4]; 3]);
        PartRaw {
            model: self.model.into(),
            normal: self.normal.into(),
            color: self.color,
            ambient,
            diffuse,
            specular,
            uv_scale: self.uv_scale,
            use_texture: self.active_slot().is_some() as u32,
            use_material: self.material.is_some() as u32,
        }
    }
}

/// Everything needed to draw one part.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCommand {
    /// Index of the part record this draw came from.
    pub part: usize,
    pub mesh: MeshKind,
    pub uniforms: PartRaw,
    pub texture_slot: Option<usize>,
    pub transparent: bool,
}

/// Applies one part record on top of the current state.
pub fn apply_part<H>(
    state: &mut ShaderState,
    part: &PartRecord,
    textures: &TextureRegistry<H>,
    materials: &MaterialRegistry,
) {
    state.set_transform(&part.transform);
    if let Some(color) = part.color {
        state.set_color(color);
    }
    if let Some(tag) = part.texture.as_deref() {
        match textures.find_slot(tag) {
            Some(slot) => state.set_texture_slot(slot),
            None => {
                log::debug!("{:?}: texture {:?} is not loaded, drawing untextured", part.name, tag);
                state.use_texture = false;
            }
        }
    }
    if let Some(uv_scale) = part.uv_scale {
        state.set_uv_scale(uv_scale);
    }
    if let Some(tag) = part.material.as_deref() {
        match materials.find(tag) {
            Some(material) => state.set_material(material),
            None => log::debug!("{:?}: material {:?} is not defined, keeping the previous one", part.name, tag),
        }
    }
}

/// Replays `parts` in order from a fresh state. One command per part.
pub fn walk<H>(
    parts: &[PartRecord],
    textures: &TextureRegistry<H>,
    materials: &MaterialRegistry,
) -> Vec<DrawCommand> {
    let mut state = ShaderState::default();
    parts
        .iter()
        .enumerate()
        .map(|(index, part)| {
            apply_part(&mut state, part, textures, materials);
            DrawCommand {
                part: index,
                mesh: part.mesh,
                uniforms: state.to_raw(),
                texture_slot: state.active_slot(),
                transparent: state.is_transparent(),
            }
        })
        .collect()
}

/// Opaque commands first, then the see-through ones, each group in record order.
///
/// The transparent pipeline leaves the depth buffer alone, so anything solid
/// has to be in it before glass is blended on top.
pub fn draw_order(commands: &[DrawCommand]) -> Vec<&DrawCommand> {
    let (transparent, mut ordered): (Vec<_>, Vec<_>) =
        commands.iter().partition(|command| command.transparent);
    ordered.extend(transparent);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::texture::{PreparedImage, TextureUploader};
    use image::RgbImage;
    use tempfile::TempDir;

    struct NoGpu;

    impl TextureUploader for NoGpu {
        type Handle = ();

        fn upload(&mut self, _image: &PreparedImage, _tag: &str) {}
    }

    fn textures(tags: &[&str]) -> (TempDir, TextureRegistry<()>) {
        let dir = TempDir::new().unwrap();
        let mut registry = TextureRegistry::new();
        for tag in tags {
            let path = dir.path().join(format!("{tag}.png"));
            RgbImage::new(2, 2).save(&path).unwrap();
            assert!(registry.register(&mut NoGpu, &path, tag));
        }
        (dir, registry)
    }

    fn material(tag: &str, shininess: f32) -> MaterialPreset {
        MaterialPreset {
            tag: tag.to_string(),
            ambient_color: [0.0; 3],
            ambient_strength: 0.5,
            diffuse_color: [0.1; 3],
            specular_color: [0.01; 3],
            shininess,
        }
    }

    fn part(name: &str) -> PartRecord {
        PartRecord {
            name: name.to_string(),
            transform: Transform::new(),
            color: None,
            texture: None,
            material: None,
            uv_scale: None,
            mesh: MeshKind::Box,
        }
    }

    #[test]
    fn texture_after_color_wins() {
        let (_dir, textures) = textures(&["Wood", "Black"]);
        let parts = vec![PartRecord {
            color: Some([0.1, 0.1, 0.1, 1.0]),
            texture: Some("Black".into()),
            ..part("base")
        }];
        let commands = walk(&parts, &textures, &MaterialRegistry::new());
        assert_eq!(commands[0].texture_slot, Some(1));
        assert_eq!(commands[0].uniforms.use_texture, 1);
        assert_eq!(commands[0].uniforms.color, [0.1, 0.1, 0.1, 1.0]);
    }

    #[test]
    fn color_alone_turns_texturing_off() {
        let (_dir, textures) = textures(&["Wood"]);
        let parts = vec![
            PartRecord {
                texture: Some("Wood".into()),
                ..part("table")
            },
            PartRecord {
                color: Some([0.2, 0.2, 0.2, 1.0]),
                ..part("motor")
            },
        ];
        let commands = walk(&parts, &textures, &MaterialRegistry::new());
        assert_eq!(commands[0].texture_slot, Some(0));
        assert_eq!(commands[1].texture_slot, None);
        assert_eq!(commands[1].uniforms.use_texture, 0);
    }

    #[test]
    fn unknown_texture_draws_untextured() {
        let (_dir, textures) = textures(&["Modern"]);
        let parts = vec![
            PartRecord {
                texture: Some("Modern".into()),
                ..part("shade")
            },
            PartRecord {
                texture: Some("Glossy3".into()),
                ..part("joint")
            },
        ];
        let commands = walk(&parts, &textures, &MaterialRegistry::new());
        assert_eq!(commands[1].texture_slot, None);
        assert_eq!(commands[1].uniforms.use_texture, 0);
    }

    #[test]
    fn unknown_material_keeps_the_previous_one() {
        let (_dir, textures) = textures(&[]);
        let materials: MaterialRegistry = [material("Glossy", 80.0)].into_iter().collect();
        let parts = vec![
            PartRecord {
                material: Some("Glossy".into()),
                ..part("stand")
            },
            PartRecord {
                material: Some("Brass".into()),
                ..part("joint")
            },
        ];
        let commands = walk(&parts, &textures, &materials);
        assert_eq!(commands[1].uniforms.use_material, 1);
        assert_eq!(commands[1].uniforms.diffuse[3], 80.0);
    }

    #[test]
    fn unset_appearance_carries_over() {
        let (_dir, textures) = textures(&[]);
        let parts = vec![
            PartRecord {
                color: Some([0.6, 0.75, 0.7, 0.4]),
                uv_scale: Some([2.0, 3.0]),
                ..part("platter")
            },
            part("motor"),
        ];
        let commands = walk(&parts, &textures, &MaterialRegistry::new());
        assert_eq!(commands[1].uniforms.color, [0.6, 0.75, 0.7, 0.4]);
        assert_eq!(commands[1].uniforms.uv_scale, [2.0, 3.0]);
        assert!(commands[1].transparent);
    }

    #[test]
    fn fresh_state_is_opaque_white_without_material() {
        let (_dir, textures) = textures(&[]);
        let commands = walk(&[part("first")], &textures, &MaterialRegistry::new());
        let raw = commands[0].uniforms;
        assert_eq!(raw.color, [1.0; 4]);
        assert_eq!(raw.uv_scale, [1.0, 1.0]);
        assert_eq!(raw.use_material, 0);
        assert!(!commands[0].transparent);
    }

    #[test]
    fn record_order_is_preserved() {
        let (_dir, textures) = textures(&[]);
        let parts = vec![
            PartRecord {
                color: Some([1.0, 1.0, 1.0, 0.55]),
                mesh: MeshKind::Box,
                ..part("lid")
            },
            PartRecord {
                color: Some([1.0; 4]),
                mesh: MeshKind::Cylinder,
                ..part("handle")
            },
            PartRecord {
                mesh: MeshKind::Torus,
                ..part("rivet")
            },
        ];
        let commands = walk(&parts, &textures, &MaterialRegistry::new());
        let order: Vec<_> = commands.iter().map(|c| (c.part, c.mesh, c.transparent)).collect();
        assert_eq!(
            order,
            vec![
                (0, MeshKind::Box, true),
                (1, MeshKind::Cylinder, false),
                (2, MeshKind::Torus, false),
            ]
        );
    }

    #[test]
    fn model_matrix_comes_from_the_part_transform() {
        let (_dir, textures) = textures(&[]);
        let transform = Transform::new()
            .with_scale([2.0, 1.0, 1.0])
            .with_translation([3.0, 0.0, -5.0]);
        let parts = vec![PartRecord {
            transform,
            ..part("moved")
        }];
        let commands = walk(&parts, &textures, &MaterialRegistry::new());
        let expected: [[f32; 4]; 4] = transform.to_matrix().into();
        assert_eq!(commands[0].uniforms.model, expected);
    }

    #[test]
    fn see_through_parts_are_drawn_last() {
        let (_dir, textures) = textures(&[]);
        let materials = MaterialRegistry::new();
        let mut parts: Vec<PartRecord> = ["solid", "glass", "solid again", "clear lid", "base"]
            .iter()
            .map(|name| part(name))
            .collect();
        parts[1].color = Some([1.0, 1.0, 1.0, 0.5]);
        parts[2].color = Some([0.2, 0.2, 0.2, 1.0]);
        parts[3].color = Some([1.0, 1.0, 1.0, 0.3]);
        parts[4].color = Some([0.5, 0.5, 0.5, 1.0]);

        let commands = walk(&parts, &textures, &materials);
        let order: Vec<usize> = draw_order(&commands).iter().map(|c| c.part).collect();
        assert_eq!(order, vec![0, 2, 4, 1, 3]);

        let first_glass = order.iter().position(|&i| commands[i].transparent).unwrap();
        assert!(order[first_glass..].iter().all(|&i| commands[i].transparent));
    }
}
