//! turntable-scene
//!
//! A fixed 3D scene (a turntable with its dust cover, a record album and a desk
//! lamp) described as data and rendered with wgpu. The scene is a flat list of
//! part records, each naming a primitive mesh, a transform, a color or a texture
//! and an optional lighting material. Textures and materials are registered once
//! by tag; every frame the part list is walked in order and turned into draws.
//!
//! High-level modules
//! - `camera`: the fixed look-at camera and its uniform
//! - `config`: application configuration loaded from RON
//! - `context`: GPU and window context that owns device/queue/surface
//! - `data_structures`: transforms, GPU textures and mesh vertices
//! - `flow`: the winit application loop
//! - `pipelines`: opaque and transparent render pipelines
//! - `render`: per-frame uniform upload and draw submission
//! - `resources`: texture registry, material registry and primitive meshes
//! - `scene`: the scene description, lights and the per-frame walk
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
