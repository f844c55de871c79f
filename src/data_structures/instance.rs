//! Part transformation data for GPU rendering.
//!
//! Every part of the scene carries a scale, three Euler angles and a
//! translation. They are combined into a model matrix in a fixed order and
//! packed, together with the part's appearance, into a [`PartRaw`] uniform.

use cgmath::{Deg, Matrix, Matrix4, SquareMatrix, Vector3};
use serde::{Deserialize, Serialize};

/// Per-part transformation: scale, rotation (Euler angles in degrees) and translation.
///
/// The rotation is applied X first, then Y, then Z, matching how the scene was
/// authored. See [`Transform::to_matrix`] for the exact composition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub scale: [f32; 3],
    /// Rotation around the X, Y and Z axes in degrees.
    pub rotation: [f32; 3],
    pub translation: [f32; 3],
}

impl Transform {
    /// Create a new transform with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            scale: [1.0, 1.0, 1.0],
            rotation: [0.0, 0.0, 0.0],
            translation: [0.0, 0.0, 0.0],
        }
    }

    pub fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: [f32; 3]) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_translation(mut self, translation: [f32; 3]) -> Self {
        self.translation = translation;
        self
    }

    /// Model matrix `T * Rx * Ry * Rz * S`.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        let [sx, sy, sz] = self.scale;
        let [rx, ry, rz] = self.rotation;
        Matrix4::from_translation(Vector3::from(self.translation))
            * Matrix4::from_angle_x(Deg(rx))
            * Matrix4::from_angle_y(Deg(ry))
            * Matrix4::from_angle_z(Deg(rz))
            * Matrix4::from_nonuniform_scale(sx, sy, sz)
    }

    /// Matrix used to bring normals into world space.
    ///
    /// Inverse-transpose of the model matrix so non-uniform scales keep normals
    /// perpendicular. A degenerate scale falls back to the bare rotation.
    pub fn to_normal_matrix(&self) -> Matrix4<f32> {
        match self.to_matrix().invert() {
            Some(inverse) => inverse.transpose(),
            None => {
                let [rx, ry, rz] = self.rotation;
                Matrix4::from_angle_x(Deg(rx))
                    * Matrix4::from_angle_y(Deg(ry))
                    * Matrix4::from_angle_z(Deg(rz))
            }
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw part uniform is the actual data stored on the GPU for one draw.
 *
 * Layout mirrors `PartUniform` in `scene.wgsl`: two matrices followed by
 * five 16-byte rows. Material rows carry a scalar in their `w` component.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PartRaw {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// rgb = ambient color, w = ambient strength
    pub ambient: [f32; 4],
    /// rgb = diffuse color, w = shininess
    pub diffuse: [f32; 4],
    /// rgb = specular color, w unused
    pub specular: [f32; 4],
    pub uv_scale: [f32; 2],
    pub use_texture: u32,
    pub use_material: u32,
}

impl PartRaw {
    /// Size of one part slot in the dynamic uniform buffer.
    ///
    /// Dynamic offsets must be multiples of `min_uniform_buffer_offset_alignment`,
    /// which is at most 256 on every backend wgpu supports.
    pub const SLOT_SIZE: wgpu::BufferAddress = 256;
}
