//! Render pipelines and the bind group layouts they share.
//!
//! Both pipelines run the same shader (`scene.wgsl`) with the same layout:
//! - group 0: globals (camera and lights)
//! - group 1: the part uniform, bound with a dynamic offset per draw
//! - group 2: the part's texture and sampler
//!
//! They only differ in blending and depth writes, so a frame can switch
//! between them part by part without rebinding anything else.

pub mod basic;
pub mod transparent;

use crate::resources::texture::texture_layout;

#[derive(Debug)]
pub struct SceneLayouts {
    pub globals: wgpu::BindGroupLayout,
    pub part: wgpu::BindGroupLayout,
    pub texture: wgpu::BindGroupLayout,
}

impl SceneLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let globals = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("globals_bind_group_layout"),
        });
        let part = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<crate::data_structures::instance::PartRaw>() as u64,
                    ),
                },
                count: None,
            }],
            label: Some("part_bind_group_layout"),
        });
        Self {
            globals,
            part,
            texture: texture_layout(device),
        }
    }

    pub fn pipeline_layout(&self, device: &wgpu::Device) -> wgpu::PipelineLayout {
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&self.globals, &self.part, &self.texture],
            push_constant_ranges: &[],
        })
    }
}

pub(crate) fn scene_shader() -> wgpu::ShaderModuleDescriptor<'static> {
    wgpu::ShaderModuleDescriptor {
        label: Some("Scene Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
    }
}
