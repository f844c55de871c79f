use crate::{
    data_structures::mesh::{ModelVertex, Vertex},
    pipelines::{
        SceneLayouts,
        basic::{DepthMode, mk_render_pipeline},
        scene_shader,
    },
};

/**
 * Pipeline for parts whose color alpha is below one (the platter, the dust cover).
 *
 * Blends over what is already drawn and tests depth without writing it, so
 * parts behind a glass panel that are drawn after it still show through. Both
 * faces are drawn so the far side of a glass box is visible through the near one.
 */
pub fn mk_transparent_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    layouts: &SceneLayouts,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = layouts.pipeline_layout(device);
    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        config.format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        DepthMode::ReadOnly,
        None,
        &[ModelVertex::desc()],
        scene_shader(),
    )
}
