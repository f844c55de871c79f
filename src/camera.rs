//! The fixed scene camera.
//!
//! The camera never moves; it is read from the config file and only the
//! aspect ratio follows the window size.

use cgmath::{Deg, Matrix4, Point3, Vector3, perspective};
use serde::{Deserialize, Serialize};

/// cgmath builds OpenGL style clip space (z in -1..1), wgpu expects z in 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub eye: [f32; 3],
    pub target: [f32; 3],
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: [0.0, 9.0, 12.0],
            target: [-1.5, 3.0, -6.0],
            fovy: 45.0,
            znear: 0.1,
            zfar: 100.0,
        }
    }
}

impl Camera {
    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::from(self.eye),
            Point3::from(self.target),
            Vector3::unit_y(),
        )
    }

    pub fn projection(&self, width: u32, height: u32) -> Matrix4<f32> {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        OPENGL_TO_WGPU_MATRIX * perspective(Deg(self.fovy), aspect, self.znear, self.zfar)
    }

    pub fn view_proj(&self, width: u32, height: u32) -> Matrix4<f32> {
        self.projection(width, height) * self.view()
    }
}
