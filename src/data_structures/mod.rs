//! Engine data structures: transforms, textures and mesh vertices.
//!
//! - `instance` holds a part's scale/rotation/translation and the raw uniform built from it
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `mesh` contains the vertex layout and the CPU/GPU mesh types shared by all primitives

pub mod instance;
pub mod mesh;
pub mod texture;
