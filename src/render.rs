//! Frame rendering.
//!
//! [`SceneRenderer`] owns everything built once at startup (pipelines, the
//! texture and material registries, the shape meshes, uniform buffers) and
//! draws the scene each frame:
//!
//! 1. walk the part records into [`DrawCommand`]s
//! 2. upload the globals and one 256-byte part slot per command
//! 3. draw the opaque commands, then the transparent ones, each in record
//!    order
//!
//! # Key types
//!
//! - [`SceneRenderer`] is the per-window renderer
//! - [`GlobalsRaw`] / [`LightRaw`] are the camera and light uniforms

use std::{iter, path::Path};

use wgpu::util::DeviceExt;

use crate::{
    camera::Camera,
    context::Context,
    data_structures::{instance::PartRaw, texture::Texture},
    pipelines::{SceneLayouts, basic::mk_basic_pipeline, transparent::mk_transparent_pipeline},
    resources::{
        material::MaterialRegistry,
        shapes::ShapeMeshes,
        texture::{GpuUploader, SlotBindings, TextureRegistry},
    },
    scene::{
        LightSource, MAX_LIGHTS, SceneDescription,
        walk::{DrawCommand, draw_order, walk},
    },
};

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRaw {
    /// xyz = position, w = focal strength
    pub position: [f32; 4],
    /// rgb = ambient color, w = specular intensity
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
}

impl From<&LightSource> for LightRaw {
    fn from(light: &LightSource) -> Self {
        let [px, py, pz] = light.position;
        let [ar, ag, ab] = light.ambient_color;
        let [dr, dg, db] = light.diffuse_color;
        let [sr, sg, sb] = light.specular_color;
        Self {
            position: [px, py, pz, light.focal_strength],
            ambient: [ar, ag, ab, light.specular_intensity],
            diffuse: [dr, dg, db, 0.0],
            specular: [sr, sg, sb, 0.0],
        }
    }
}

/// Layout mirrors `Globals` in `scene.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalsRaw {
    pub view_proj: [[f32; 4]; 4],
    pub view_position: [f32; 4],
    pub lights: [LightRaw; MAX_LIGHTS],
    pub light_count: u32,
    pub use_lighting: u32,
    _padding: [u32; 2],
}

impl GlobalsRaw {
    /// Lights past [`MAX_LIGHTS`] are dropped.
    pub fn new(
        camera: &Camera,
        size: [u32; 2],
        lights: &[LightSource],
        use_lighting: bool,
    ) -> Self {
        let [ex, ey, ez] = camera.eye;
        let mut packed = [LightRaw::default(); MAX_LIGHTS];
        for (slot, light) in packed.iter_mut().zip(lights) {
            *slot = light.into();
        }
        Self {
            view_proj: camera.view_proj(size[0], size[1]).into(),
            view_position: [ex, ey, ez, 1.0],
            lights: packed,
            light_count: lights.len().min(MAX_LIGHTS) as u32,
            use_lighting: use_lighting as u32,
            _padding: [0; 2],
        }
    }
}

/// Lays the part uniforms out at [`PartRaw::SLOT_SIZE`] strides, ready for one upload.
pub fn pack_part_slots(commands: &[DrawCommand]) -> Vec<u8> {
    let slot = PartRaw::SLOT_SIZE as usize;
    let mut bytes = vec![0u8; commands.len() * slot];
    for (chunk, command) in bytes.chunks_exact_mut(slot).zip(commands) {
        let raw = bytemuck::bytes_of(&command.uniforms);
        chunk[..raw.len()].copy_from_slice(raw);
    }
    bytes
}

#[derive(Debug)]
pub struct SceneRenderer {
    scene: SceneDescription,
    camera: Camera,
    textures: TextureRegistry<Texture>,
    slots: SlotBindings,
    materials: MaterialRegistry,
    meshes: ShapeMeshes,
    basic: wgpu::RenderPipeline,
    transparent: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    part_buffer: wgpu::Buffer,
    part_bind_group: wgpu::BindGroup,
}

impl SceneRenderer {
    /// Registers textures and materials, binds texture slots and uploads the meshes.
    pub fn new(ctx: &Context, scene: SceneDescription, camera: Camera, asset_root: &Path) -> Self {
        let device = &ctx.device;
        scene.validate();

        let mut textures = TextureRegistry::new();
        let mut uploader = GpuUploader {
            device,
            queue: &ctx.queue,
        };
        let loaded = scene.register_textures(&mut textures, &mut uploader, asset_root);
        if loaded < scene.textures.len() {
            log::warn!(
                "{} of {} textures could not be loaded, affected parts are drawn untextured",
                scene.textures.len() - loaded,
                scene.textures.len()
            );
        }
        let materials = scene.material_registry();

        let layouts = SceneLayouts::new(device);
        let slots = textures.bind_all(device, &ctx.queue, &layouts.texture);

        let mut meshes = ShapeMeshes::new();
        meshes.load(device, scene.mesh_kinds());

        let basic = mk_basic_pipeline(device, &ctx.config, &layouts);
        let transparent = mk_transparent_pipeline(device, &ctx.config, &layouts);

        let globals = GlobalsRaw::new(
            &camera,
            [ctx.config.width, ctx.config.height],
            scene.active_lights(),
            scene.use_lighting,
        );
        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globals Buffer"),
            contents: bytemuck::cast_slice(&[globals]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.globals,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
            label: Some("globals_bind_group"),
        });

        let part_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Part Buffer"),
            size: PartRaw::SLOT_SIZE * scene.parts.len().max(1) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let part_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.part,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &part_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<PartRaw>() as u64),
                }),
            }],
            label: Some("part_bind_group"),
        });

        Self {
            scene,
            camera,
            textures,
            slots,
            materials,
            meshes,
            basic,
            transparent,
            globals_buffer,
            globals_bind_group,
            part_buffer,
            part_bind_group,
        }
    }

    pub fn render(&self, ctx: &Context) -> Result<(), wgpu::SurfaceError> {
        let output = ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let globals = GlobalsRaw::new(
            &self.camera,
            [ctx.config.width, ctx.config.height],
            self.scene.active_lights(),
            self.scene.use_lighting,
        );
        ctx.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::cast_slice(&[globals]));

        let commands = walk(&self.scene.parts, &self.textures, &self.materials);
        if !commands.is_empty() {
            ctx.queue
                .write_buffer(&self.part_buffer, 0, &pack_part_slots(&commands));
        }

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
            let mut transparent = None;
            for command in draw_order(&commands) {
                if transparent != Some(command.transparent) {
                    let pipeline = if command.transparent {
                        &self.transparent
                    } else {
                        &self.basic
                    };
                    render_pass.set_pipeline(pipeline);
                    transparent = Some(command.transparent);
                }
                let offset = (command.part as u64 * PartRaw::SLOT_SIZE) as u32;
                render_pass.set_bind_group(1, &self.part_bind_group, &[offset]);
                render_pass.set_bind_group(2, self.slots.get(command.texture_slot), &[]);
                self.meshes.draw(&mut render_pass, command.mesh);
            }
        }

        ctx.queue.submit(iter::once(encoder.finish()));
        ctx.window.pre_present_notify();
        output.present();
        Ok(())
    }
}
