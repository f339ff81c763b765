use glam::Mat4;

use crate::camera::{Camera, CameraUniform};
use crate::lights::LightsUniform;
use crate::mesh::MeshVertex;
use crate::settings::RenderSettings;

use super::targets::DEPTH_FORMAT;
use super::{sampler_entry, texture_entry, uniform_entry};

/// Per-frame constants for the sky and chunk shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniform {
    /// Camera transforms.
    pub camera: CameraUniform,
    /// Shadow-map projection.
    pub light_view_proj: [[f32; 4]; 4],
    /// Light travel direction; `w` is the ambient term.
    pub light_dir: [f32; 4],
    /// Light color; `w` is the shadow strength.
    pub light_color: [f32; 4],
    /// Sky color straight up.
    pub sky_zenith: [f32; 4],
    /// Sky color at the horizon; `w` is the shadow depth bias.
    pub sky_horizon: [f32; 4],
}

impl SceneUniform {
    /// Build from the camera, settings, and the light matrix of this frame.
    pub fn new(camera: &Camera, settings: &RenderSettings, light_view_proj: Mat4, shadows: bool) -> Self {
        let light = &settings.light;
        let dir = light.direction();
        Self {
            camera: CameraUniform::from_camera(camera),
            light_view_proj: light_view_proj.to_cols_array_2d(),
            light_dir: [dir.x, dir.y, dir.z, light.ambient],
            light_color: [
                light.color[0],
                light.color[1],
                light.color[2],
                if shadows { 1.0 } else { 0.0 },
            ],
            sky_zenith: [settings.sky.zenith[0], settings.sky.zenith[1], settings.sky.zenith[2], 1.0],
            sky_horizon: [
                settings.sky.horizon[0],
                settings.sky.horizon[1],
                settings.sky.horizon[2],
                settings.shadows.bias,
            ],
        }
    }
}

/// Uniforms and textures bound by every scene pipeline.
pub struct SceneBindings {
    scene_layout: wgpu::BindGroupLayout,
    atlas_layout: wgpu::BindGroupLayout,
    scene_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    atlas_bind_group: wgpu::BindGroup,
}

impl SceneBindings {
    /// Create buffers and bind groups. The scene group samples `shadow_view`.
    pub fn new(
        device: &wgpu::Device,
        atlas: &wgpu::Texture,
        shadow_view: &wgpu::TextureView,
        shadow_sampler: &wgpu::Sampler,
    ) -> Self {
        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniform Buffer"),
            size: std::mem::size_of::<SceneUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Emissive Lights Buffer"),
            size: std::mem::size_of::<LightsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
                super::depth_texture_entry(2),
                sampler_entry(3, wgpu::SamplerBindingType::Comparison),
            ],
        });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &scene_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: scene_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(shadow_sampler),
                },
            ],
        });

        let atlas_view = atlas.create_view(&wgpu::TextureViewDescriptor::default());
        let atlas_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Texture Atlas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest, // Pixel-perfect rendering
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let atlas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &[
                texture_entry(0),
                sampler_entry(1, wgpu::SamplerBindingType::Filtering),
            ],
        });

        let atlas_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Texture Bind Group"),
            layout: &atlas_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&atlas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&atlas_sampler),
                },
            ],
        });

        Self {
            scene_layout,
            atlas_layout,
            scene_buffer,
            lights_buffer,
            scene_bind_group,
            atlas_bind_group,
        }
    }

    /// Write this frame's uniforms.
    pub fn update(&self, queue: &wgpu::Queue, scene: &SceneUniform, lights: &LightsUniform) {
        queue.write_buffer(&self.scene_buffer, 0, bytemuck::cast_slice(&[*scene]));
        queue.write_buffer(&self.lights_buffer, 0, bytemuck::cast_slice(&[*lights]));
    }

    /// Group 0 of every scene pipeline.
    pub fn scene_bind_group(&self) -> &wgpu::BindGroup {
        &self.scene_bind_group
    }

    /// Group 1 of the chunk pipelines.
    pub fn atlas_bind_group(&self) -> &wgpu::BindGroup {
        &self.atlas_bind_group
    }

    /// Scene uniform buffer; the overlay pass reads its camera prefix.
    pub fn scene_buffer(&self) -> &wgpu::Buffer {
        &self.scene_buffer
    }
}

/// Sky, opaque and transparent pipelines for one color format.
pub struct ScenePipelines {
    format: wgpu::TextureFormat,
    sky: wgpu::RenderPipeline,
    opaque: wgpu::RenderPipeline,
    transparent: wgpu::RenderPipeline,
}

impl ScenePipelines {
    /// Create the pipelines rendering into `format`.
    pub fn new(device: &wgpu::Device, bindings: &SceneBindings, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/scene.wgsl").into()),
        });

        let sky_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sky Pipeline Layout"),
            bind_group_layouts: &[&bindings.scene_layout],
            push_constant_ranges: &[],
        });

        let sky = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sky Render Pipeline"),
            layout: Some(&sky_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_sky",
                buffers: &[], // Full-screen triangle generated in the shader
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_sky",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None, // No depth testing for the sky
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let chunk_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Chunk Pipeline Layout"),
            bind_group_layouts: &[&bindings.scene_layout, &bindings.atlas_layout],
            push_constant_ranges: &[],
        });

        let chunk_pipeline = |label: &str, fragment: &str, blend: wgpu::BlendState, depth_write: bool| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&chunk_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &[MeshVertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: fragment,
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: depth_write,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
            })
        };

        let opaque = chunk_pipeline("Opaque Chunk Pipeline", "fs_opaque", wgpu::BlendState::REPLACE, true);
        // Blended layers test against opaque depth but never write it.
        let transparent = chunk_pipeline(
            "Transparent Chunk Pipeline",
            "fs_transparent",
            wgpu::BlendState::ALPHA_BLENDING,
            false,
        );

        Self {
            format,
            sky,
            opaque,
            transparent,
        }
    }

    /// Color format these pipelines target.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Full-screen background.
    pub fn sky(&self) -> &wgpu::RenderPipeline {
        &self.sky
    }

    /// Opaque chunk layers.
    pub fn opaque(&self) -> &wgpu::RenderPipeline {
        &self.opaque
    }

    /// Transparent chunk layers.
    pub fn transparent(&self) -> &wgpu::RenderPipeline {
        &self.transparent
    }
}

/// Begin the sky pass, clearing `view`.
pub(crate) fn begin_sky_pass<'a>(
    encoder: &'a mut wgpu::CommandEncoder,
    view: &'a wgpu::TextureView,
) -> wgpu::RenderPass<'a> {
    super::color_pass(encoder, "Sky Render Pass", view, wgpu::LoadOp::Clear(wgpu::Color::BLACK))
}

/// Begin the chunk pass: keep the sky, clear depth.
pub(crate) fn begin_chunk_pass<'a>(
    encoder: &'a mut wgpu::CommandEncoder,
    view: &'a wgpu::TextureView,
    depth_view: &'a wgpu::TextureView,
) -> wgpu::RenderPass<'a> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Chunk Render Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                // Load existing content (sky already rendered)
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layout_matches_shader() {
        // Camera (2 mat4 + vec4), light matrix, four vec4s.
        assert_eq!(std::mem::size_of::<SceneUniform>(), 144 + 64 + 64);
        assert_eq!(std::mem::size_of::<SceneUniform>() % 16, 0);
    }

    #[test]
    fn shadow_strength_follows_toggle() {
        let camera = Camera::new(1.0);
        let settings = RenderSettings::default();
        let on = SceneUniform::new(&camera, &settings, Mat4::IDENTITY, true);
        let off = SceneUniform::new(&camera, &settings, Mat4::IDENTITY, false);
        assert_eq!(on.light_color[3], 1.0);
        assert_eq!(off.light_color[3], 0.0);
        assert_eq!(on.sky_horizon[3], settings.shadows.bias);
    }
}
