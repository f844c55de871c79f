//! Primitive meshes every scene part is built from.
//!
//! Each [`MeshKind`] is generated once on the CPU, uploaded, and then drawn
//! as often as the scene needs it. All shapes are unit sized so a part's scale
//! reads directly as its size:
//!
//! - plane: -1..1 on X and Z at y = 0, facing +Y
//! - box: unit cube centred on the origin
//! - cylinder / cone: radius 1, base at y = 0, top at y = 1
//! - sphere: radius 1; half sphere: its upper half with a closed base at y = 0
//! - torus: main radius 1, tube radius 0.2, lying in the XY plane
//! - pyramid4: square base of side 1 at y = -0.5, apex at y = 0.5
//! - prism: triangular prism of unit size centred on the origin, extruded along Z

use std::{collections::HashMap, f32::consts::PI};

use cgmath::{InnerSpace, Vector3};
use serde::{Deserialize, Serialize};

use crate::data_structures::mesh::{CpuMesh, GpuMesh, ModelVertex};

const SEGMENTS: u32 = 36;
const RINGS: u32 = 18;
const TORUS_TUBE_SEGMENTS: u32 = 24;
const TORUS_TUBE_RADIUS: f32 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshKind {
    Plane,
    Box,
    Cylinder,
    Pyramid4,
    Sphere,
    HalfSphere,
    Torus,
    Cone,
    Prism,
}

impl MeshKind {
    pub const ALL: [MeshKind; 9] = [
        MeshKind::Plane,
        MeshKind::Box,
        MeshKind::Cylinder,
        MeshKind::Pyramid4,
        MeshKind::Sphere,
        MeshKind::HalfSphere,
        MeshKind::Torus,
        MeshKind::Cone,
        MeshKind::Prism,
    ];

    pub fn generate(self) -> CpuMesh {
        match self {
            MeshKind::Plane => plane(),
            MeshKind::Box => cube(),
            MeshKind::Cylinder => cylinder(SEGMENTS),
            MeshKind::Pyramid4 => pyramid4(),
            MeshKind::Sphere => sphere(SEGMENTS, RINGS, false),
            MeshKind::HalfSphere => sphere(SEGMENTS, RINGS / 2, true),
            MeshKind::Torus => torus(SEGMENTS, TORUS_TUBE_SEGMENTS, 1.0, TORUS_TUBE_RADIUS),
            MeshKind::Cone => cone(SEGMENTS),
            MeshKind::Prism => prism(),
        }
    }
}

/// One uploaded mesh per kind, loaded once and shared by every part.
#[derive(Debug, Default)]
pub struct ShapeMeshes {
    meshes: HashMap<MeshKind, GpuMesh>,
}

impl ShapeMeshes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates and uploads every kind in `kinds` that isn't loaded yet.
    pub fn load(&mut self, device: &wgpu::Device, kinds: impl IntoIterator<Item = MeshKind>) {
        for kind in kinds {
            if self.meshes.contains_key(&kind) {
                continue;
            }
            let mesh = kind.generate();
            log::debug!("Uploading {:?} ({} triangles)", kind, mesh.triangle_count());
            self.meshes.insert(kind, mesh.upload(device));
        }
    }

    /// Issues the indexed draw for `kind`. Returns `false` if it was never loaded.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, kind: MeshKind) -> bool {
        match self.meshes.get(&kind) {
            Some(mesh) => {
                mesh.draw(render_pass);
                true
            }
            None => {
                log::warn!("{:?} mesh was drawn before it was loaded", kind);
                false
            }
        }
    }
}

type V3 = Vector3<f32>;

fn v3(x: f32, y: f32, z: f32) -> V3 {
    Vector3::new(x, y, z)
}

/// Adds a planar quad. Corners must be counter-clockwise seen from the front;
/// the normal is derived from the winding.
fn flat_quad(mesh: &mut CpuMesh, corners: [V3; 4]) {
    let [a, b, c, d] = corners;
    let normal: [f32; 3] = (b - a).cross(c - a).normalize().into();
    let i0 = mesh.push(ModelVertex::new(a.into(), normal, [0.0, 0.0]));
    let i1 = mesh.push(ModelVertex::new(b.into(), normal, [1.0, 0.0]));
    let i2 = mesh.push(ModelVertex::new(c.into(), normal, [1.0, 1.0]));
    let i3 = mesh.push(ModelVertex::new(d.into(), normal, [0.0, 1.0]));
    mesh.triangle(i0, i1, i2);
    mesh.triangle(i0, i2, i3);
}

fn flat_triangle(mesh: &mut CpuMesh, corners: [V3; 3], uvs: [[f32; 2]; 3]) {
    let [a, b, c] = corners;
    let normal: [f32; 3] = (b - a).cross(c - a).normalize().into();
    let i0 = mesh.push(ModelVertex::new(a.into(), normal, uvs[0]));
    let i1 = mesh.push(ModelVertex::new(b.into(), normal, uvs[1]));
    let i2 = mesh.push(ModelVertex::new(c.into(), normal, uvs[2]));
    mesh.triangle(i0, i1, i2);
}

/// Face of an axis aligned box. `u x v` must equal `normal`.
fn box_face(mesh: &mut CpuMesh, normal: V3, u: V3, v: V3, half: f32) {
    let c = normal * half;
    let (u, v) = (u * half, v * half);
    flat_quad(mesh, [c - u - v, c + u - v, c + u + v, c - u + v]);
}

/// Flat disc at height `y` facing up or down.
fn disc(mesh: &mut CpuMesh, segments: u32, y: f32, up: bool) {
    let normal = if up { [0.0, 1.0, 0.0] } else { [0.0, -1.0, 0.0] };
    let center = mesh.push(ModelVertex::new([0.0, y, 0.0], normal, [0.5, 0.5]));
    let first = mesh.vertices.len() as u32;
    for i in 0..=segments {
        let theta = i as f32 / segments as f32 * 2.0 * PI;
        let (sin, cos) = theta.sin_cos();
        mesh.push(ModelVertex::new(
            [cos, y, sin],
            normal,
            [0.5 + 0.5 * cos, 0.5 + 0.5 * sin],
        ));
    }
    for i in 0..segments {
        let (p, q) = (first + i, first + i + 1);
        if up {
            mesh.triangle(center, q, p);
        } else {
            mesh.triangle(center, p, q);
        }
    }
}

pub fn plane() -> CpuMesh {
    let mut mesh = CpuMesh::new("plane");
    flat_quad(
        &mut mesh,
        [
            v3(-1.0, 0.0, 1.0),
            v3(1.0, 0.0, 1.0),
            v3(1.0, 0.0, -1.0),
            v3(-1.0, 0.0, -1.0),
        ],
    );
    mesh
}

pub fn cube() -> CpuMesh {
    let mut mesh = CpuMesh::new("box");
    let (x, y, z) = (V3::unit_x(), V3::unit_y(), V3::unit_z());
    box_face(&mut mesh, x, -z, y, 0.5);
    box_face(&mut mesh, -x, z, y, 0.5);
    box_face(&mut mesh, y, x, -z, 0.5);
    box_face(&mut mesh, -y, x, z, 0.5);
    box_face(&mut mesh, z, x, y, 0.5);
    box_face(&mut mesh, -z, -x, y, 0.5);
    mesh
}

pub fn cylinder(segments: u32) -> CpuMesh {
    let mut mesh = CpuMesh::new("cylinder");
    for i in 0..=segments {
        let u = i as f32 / segments as f32;
        let (sin, cos) = (u * 2.0 * PI).sin_cos();
        let normal = [cos, 0.0, sin];
        mesh.push(ModelVertex::new([cos, 0.0, sin], normal, [u, 0.0]));
        mesh.push(ModelVertex::new([cos, 1.0, sin], normal, [u, 1.0]));
    }
    for i in 0..segments {
        let (bottom, top) = (i * 2, i * 2 + 1);
        let (next_bottom, next_top) = (bottom + 2, top + 2);
        mesh.triangle(bottom, top, next_bottom);
        mesh.triangle(top, next_top, next_bottom);
    }
    disc(&mut mesh, segments, 1.0, true);
    disc(&mut mesh, segments, 0.0, false);
    mesh
}

pub fn cone(segments: u32) -> CpuMesh {
    let mut mesh = CpuMesh::new("cone");
    let slope_normal = |theta: f32| -> [f32; 3] {
        let (sin, cos) = theta.sin_cos();
        v3(cos, 1.0, sin).normalize().into()
    };
    for i in 0..segments {
        let u0 = i as f32 / segments as f32;
        let u1 = (i + 1) as f32 / segments as f32;
        let (t0, t1) = (u0 * 2.0 * PI, u1 * 2.0 * PI);
        let (s0, c0) = t0.sin_cos();
        let (s1, c1) = t1.sin_cos();
        let a = mesh.push(ModelVertex::new([c0, 0.0, s0], slope_normal(t0), [u0, 0.0]));
        let apex = mesh.push(ModelVertex::new(
            [0.0, 1.0, 0.0],
            slope_normal((t0 + t1) * 0.5),
            [(u0 + u1) * 0.5, 1.0],
        ));
        let b = mesh.push(ModelVertex::new([c1, 0.0, s1], slope_normal(t1), [u1, 0.0]));
        mesh.triangle(a, apex, b);
    }
    disc(&mut mesh, segments, 0.0, false);
    mesh
}

/// UV sphere of radius 1. With `upper_half` only the rings down to the
/// equator are built and the base is closed with a disc.
pub fn sphere(segments: u32, rings: u32, upper_half: bool) -> CpuMesh {
    let mut mesh = CpuMesh::new(if upper_half { "half sphere" } else { "sphere" });
    let sweep = if upper_half { PI / 2.0 } else { PI };
    for ring in 0..=rings {
        let phi = ring as f32 / rings as f32 * sweep;
        let (ring_radius, y) = phi.sin_cos();
        for segment in 0..=segments {
            let u = segment as f32 / segments as f32;
            let (sin, cos) = (u * 2.0 * PI).sin_cos();
            let p = [ring_radius * cos, y, ring_radius * sin];
            mesh.push(ModelVertex::new(p, p, [u, 1.0 - phi / PI]));
        }
    }
    for ring in 0..rings {
        for segment in 0..segments {
            let current = ring * (segments + 1) + segment;
            let next = current + segments + 1;
            mesh.triangle(current, current + 1, next);
            mesh.triangle(current + 1, next + 1, next);
        }
    }
    if upper_half {
        disc(&mut mesh, segments, 0.0, false);
    }
    mesh
}

pub fn torus(main_segments: u32, tube_segments: u32, main_radius: f32, tube_radius: f32) -> CpuMesh {
    let mut mesh = CpuMesh::new("torus");
    for i in 0..=main_segments {
        let u = i as f32 / main_segments as f32;
        let (su, cu) = (u * 2.0 * PI).sin_cos();
        for j in 0..=tube_segments {
            let v = j as f32 / tube_segments as f32;
            let (sv, cv) = (v * 2.0 * PI).sin_cos();
            let normal = v3(cv * cu, cv * su, sv);
            let position = v3(main_radius * cu, main_radius * su, 0.0) + normal * tube_radius;
            mesh.push(ModelVertex::new(position.into(), normal.into(), [u, v]));
        }
    }
    for i in 0..main_segments {
        for j in 0..tube_segments {
            let a = i * (tube_segments + 1) + j;
            let b = a + tube_segments + 1;
            mesh.triangle(a, b, b + 1);
            mesh.triangle(a, b + 1, a + 1);
        }
    }
    mesh
}

pub fn pyramid4() -> CpuMesh {
    let mut mesh = CpuMesh::new("pyramid4");
    let apex = v3(0.0, 0.5, 0.0);
    // base corners, counter-clockwise seen from above
    let corners = [
        v3(-0.5, -0.5, 0.5),
        v3(0.5, -0.5, 0.5),
        v3(0.5, -0.5, -0.5),
        v3(-0.5, -0.5, -0.5),
    ];
    for i in 0..4 {
        let (a, b) = (corners[i], corners[(i + 1) % 4]);
        flat_triangle(&mut mesh, [a, b, apex], [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]]);
    }
    box_face(&mut mesh, -V3::unit_y(), V3::unit_x(), V3::unit_z(), 0.5);
    mesh
}

pub fn prism() -> CpuMesh {
    let mut mesh = CpuMesh::new("prism");
    let (l, r, t) = (v3(-0.5, -0.5, 0.0), v3(0.5, -0.5, 0.0), v3(0.0, 0.5, 0.0));
    let (front, back) = (v3(0.0, 0.0, 0.5), v3(0.0, 0.0, -0.5));
    let uvs = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];
    flat_triangle(&mut mesh, [l + front, r + front, t + front], uvs);
    flat_triangle(&mut mesh, [r + back, l + back, t + back], uvs);
    // bottom
    flat_quad(&mut mesh, [l + back, r + back, r + front, l + front]);
    // right slope
    flat_quad(&mut mesh, [r + front, r + back, t + back, t + front]);
    // left slope
    flat_quad(&mut mesh, [l + back, l + front, t + front, t + back]);
    mesh
}
