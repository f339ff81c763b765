use std::path::Path;

use anyhow::{Context, Result};
use blockview_world::BlockSource;
use glam::Vec3;

use crate::builder::{ChunkBuilder, MeshEntry};
use crate::camera::Camera;
use crate::culling::DrawDistance;
use crate::frame::{light_screen_position, light_view_projection, FramePlan, OverlayVisibility, RenderPass};
use crate::gpu::{GpuMesh, GpuUploader};
use crate::lights::LightsUniform;
use crate::resources::Resources;
use crate::screenshot::{record_texture_readback, write_png};
use crate::settings::RenderSettings;

use super::atlas::AtlasImage;
use super::context::RenderContext;
use super::overlay::{overlay_lines, OverlayPipeline};
use super::post::PostProcess;
use super::scene::{begin_chunk_pass, begin_sky_pass, SceneBindings, ScenePipelines, SceneUniform};
use super::shadow::ShadowPass;
use super::targets::{FrameTargets, HDR_FORMAT};

/// What one call to [`Renderer::render`] did.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Passes recorded, in order.
    pub plan: FramePlan,
    /// Chunk layers drawn by the main pass.
    pub entries_drawn: usize,
    /// Chunk layers skipped by the draw distance.
    pub entries_culled: usize,
    /// Chunk layers rendered into the shadow map.
    pub shadow_casters: usize,
    /// Emissive lights uploaded.
    pub lights: usize,
}

/// Pipelines that depend on the shadow map and atlas.
struct Passes {
    shadow: ShadowPass,
    bindings: SceneBindings,
    hdr: ScenePipelines,
    direct: ScenePipelines,
    overlay: OverlayPipeline,
}

impl Passes {
    fn new(ctx: &RenderContext, settings: &RenderSettings, atlas: &wgpu::Texture) -> Self {
        let device = &ctx.device;
        let shadow = ShadowPass::new(device, settings.shadows.resolution);
        let bindings = SceneBindings::new(device, atlas, shadow.sample_view(), shadow.sampler());
        let hdr = ScenePipelines::new(device, &bindings, HDR_FORMAT);
        let direct = ScenePipelines::new(device, &bindings, ctx.format);
        let overlay = OverlayPipeline::new(device, ctx.format, bindings.scene_buffer());
        Self {
            shadow,
            bindings,
            hdr,
            direct,
            overlay,
        }
    }
}

/// Frame driver: shadow map, sky, chunk layers, post-processing and
/// overlays for one output size.
pub struct Renderer {
    ctx: RenderContext,
    settings: RenderSettings,
    atlas: wgpu::Texture,
    targets: FrameTargets,
    passes: Passes,
    post: PostProcess,
}

impl Renderer {
    /// Create every pipeline. The atlas image is loaded from `atlas_path`
    /// or generated from the atlas metadata of `resources`.
    pub fn new(
        ctx: RenderContext,
        settings: RenderSettings,
        resources: &Resources,
        atlas_path: Option<&Path>,
    ) -> Result<Self> {
        let image = AtlasImage::load_or_generate(atlas_path, resources.atlas());
        let atlas = image.upload(&ctx.device, &ctx.queue);
        let targets = FrameTargets::new(&ctx.device, ctx.size);
        let passes = Passes::new(&ctx, &settings, &atlas);
        let post = PostProcess::new(&ctx.device, ctx.format, &targets);
        tracing::info!(
            width = ctx.size.0,
            height = ctx.size.1,
            atlas_width = image.width,
            atlas_height = image.height,
            shadows = settings.shadows.enabled,
            post = settings.post_processing(),
            "renderer initialized"
        );
        Ok(Self {
            ctx,
            settings,
            atlas,
            targets,
            passes,
            post,
        })
    }

    /// Settings in use.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Replace the settings. The shadow map is reallocated when its
    /// resolution changes.
    pub fn set_settings(&mut self, settings: RenderSettings) {
        let reallocate = settings.shadows.resolution.max(1) != self.passes.shadow.resolution();
        self.settings = settings;
        if reallocate {
            self.passes = Passes::new(&self.ctx, &self.settings, &self.atlas);
        }
    }

    /// Rendering context.
    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    /// Reallocate the frame targets for a new output size.
    pub fn resize(&mut self, size: (u32, u32)) {
        self.ctx.resize(size);
        if self.targets.size() == self.ctx.size {
            return;
        }
        self.targets = FrameTargets::new(&self.ctx.device, self.ctx.size);
        self.post.bind_targets(&self.ctx.device, &self.targets);
    }

    /// Record and submit one frame into `output`, which must match the
    /// context size and format.
    pub fn render<S: BlockSource>(
        &mut self,
        builder: &mut ChunkBuilder<S, GpuUploader>,
        camera: &Camera,
        overlays: OverlayVisibility,
        output: &wgpu::TextureView,
    ) -> FrameReport {
        let plan = FramePlan::new(&self.settings, overlays);
        let bounds = builder.structure().bounds().map(|bounds| {
            let (min, max) = bounds.corners_f32();
            (Vec3::from(min), Vec3::from(max))
        });
        let lights = builder.emissive_lights();
        let camera_pos = camera.position;

        let mut entries = builder.mesh_entries();
        DrawDistance::new(camera_pos, self.settings.draw_distance).mark(&mut entries);

        let (box_min, box_max) = bounds.unwrap_or((Vec3::ZERO, Vec3::ONE));
        let light_dir = self.settings.light.direction();
        let light_vp = light_view_projection(light_dir, box_min, box_max);
        let shadows = plan.contains(RenderPass::Shadow);
        let scene = SceneUniform::new(camera, &self.settings, light_vp, shadows);
        self.passes
            .bindings
            .update(&self.ctx.queue, &scene, &LightsUniform::from_lights(&lights));

        if plan.renders_offscreen() {
            let light_on_screen = light_screen_position(
                camera.view_projection_matrix(),
                camera_pos,
                light_dir,
                camera.far * 0.5,
            );
            self.post
                .update(&self.ctx.queue, &self.settings, &plan, &self.targets, light_on_screen);
        }

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let shadow_casters = if shadows {
            self.passes
                .shadow
                .record(&self.ctx.queue, &mut encoder, light_vp, &entries);
            entries.iter().filter(|entry| entry.gpu.is_some()).count()
        } else {
            self.passes.shadow.clear(&mut encoder);
            0
        };

        let (scene_view, pipelines) = if plan.renders_offscreen() {
            (&self.targets.hdr.view, &self.passes.hdr)
        } else {
            (output, &self.passes.direct)
        };

        {
            let mut pass = begin_sky_pass(&mut encoder, scene_view);
            pass.set_pipeline(pipelines.sky());
            pass.set_bind_group(0, self.passes.bindings.scene_bind_group(), &[]);
            pass.draw(0..3, 0..1);
        }

        let entries_drawn = {
            let mut pass = begin_chunk_pass(&mut encoder, scene_view, &self.targets.depth.view);
            pass.set_bind_group(0, self.passes.bindings.scene_bind_group(), &[]);
            pass.set_bind_group(1, self.passes.bindings.atlas_bind_group(), &[]);
            let mut drawn = 0;
            for (transparent, pipeline) in [(false, pipelines.opaque()), (true, pipelines.transparent())] {
                pass.set_pipeline(pipeline);
                for entry in entries
                    .iter()
                    .filter(|entry| entry.visible && entry.is_transparent() == transparent)
                {
                    if draw_entry(&mut pass, entry) {
                        drawn += 1;
                    }
                }
            }
            drawn
        };

        for &pass in plan.passes() {
            self.post.record(&mut encoder, pass, &self.targets, output);
        }

        if plan.contains(RenderPass::Overlays) {
            let lines = overlay_lines(bounds, overlays);
            self.passes.overlay.record(
                &self.ctx.device,
                &mut encoder,
                output,
                &self.targets.depth.view,
                &lines,
                &entries,
                overlays,
            );
        }

        self.ctx.queue.submit(Some(encoder.finish()));

        let report = FrameReport {
            entries_culled: entries.iter().filter(|entry| !entry.visible).count(),
            entries_drawn,
            shadow_casters,
            lights: lights.len(),
            plan,
        };
        tracing::debug!(
            drawn = report.entries_drawn,
            culled = report.entries_culled,
            shadow_casters = report.shadow_casters,
            lights = report.lights,
            passes = report.plan.passes().len(),
            "frame rendered"
        );
        report
    }

    /// Render one frame offscreen and read it back as tightly packed RGBA8.
    pub fn render_to_rgba<S: BlockSource>(
        &mut self,
        builder: &mut ChunkBuilder<S, GpuUploader>,
        camera: &Camera,
        overlays: OverlayVisibility,
    ) -> Result<(FrameReport, Vec<u8>)> {
        let size = self.ctx.size;
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Output Texture"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.ctx.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let report = self.render(builder, camera, overlays, &view);

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        let readback = record_texture_readback(&self.ctx.device, &mut encoder, &texture, self.ctx.format, size);
        self.ctx.queue.submit(Some(encoder.finish()));
        let rgba = readback
            .read_rgba8(&self.ctx.device)
            .context("failed to read back rendered frame")?;
        Ok((report, rgba))
    }

    /// Render one frame offscreen and save it as a PNG.
    pub fn render_to_png<S: BlockSource>(
        &mut self,
        builder: &mut ChunkBuilder<S, GpuUploader>,
        camera: &Camera,
        overlays: OverlayVisibility,
        path: &Path,
    ) -> Result<FrameReport> {
        let (report, rgba) = self.render_to_rgba(builder, camera, overlays)?;
        write_png(path, self.ctx.size, &rgba)?;
        tracing::info!(path = %path.display(), "frame saved");
        Ok(report)
    }
}

fn draw_entry<'a>(pass: &mut wgpu::RenderPass<'a>, entry: &MeshEntry<'a, GpuMesh>) -> bool {
    let Some(gpu) = entry.gpu else { return false };
    let (Some(vertices), Some(indices)) = (&gpu.vertex_buffer, &gpu.index_buffer) else {
        return false;
    };
    pass.set_vertex_buffer(0, vertices.slice(..));
    pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
    pass.draw_indexed(0..gpu.index_count, 0, 0..1);
    true
}
