use glam::Vec2;

use crate::frame::{gaussian_weights, FramePlan, RenderPass};
use crate::settings::RenderSettings;

use super::targets::{FrameTargets, HDR_FORMAT};
use super::{
    color_pass, depth_texture_entry, fullscreen_pipeline, linear_sampler, sampler_entry,
    texture_entry, uniform_entry,
};

const MAX_BLUR_RADIUS: usize = 15;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SsaoUniform {
    params: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BloomUniform {
    params: [f32; 4],
    weights: [[f32; 4]; 4],
}

impl BloomUniform {
    fn new(settings: &RenderSettings, step: [f32; 2]) -> Self {
        let bloom = &settings.bloom;
        let radius = (bloom.radius as usize).min(MAX_BLUR_RADIUS);
        let kernel = gaussian_weights(radius, bloom.sigma);
        let mut weights = [[0.0f32; 4]; 4];
        for (i, weight) in kernel.iter().enumerate() {
            weights[i / 4][i % 4] = *weight;
        }
        Self {
            params: [bloom.threshold, (kernel.len() - 1) as f32, step[0], step[1]],
            weights,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct GodRayUniform {
    light: [f32; 4],
    params: [f32; 4],
}

/// Stage switches and strengths read by the composite shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositeUniform {
    /// `x` SSAO, `y` bloom, `z` god rays (1 on, 0 off); `w` bloom intensity.
    pub toggles: [f32; 4],
}

impl CompositeUniform {
    /// Toggles for the stages `plan` runs.
    pub fn new(settings: &RenderSettings, plan: &FramePlan) -> Self {
        let flag = |pass| if plan.contains(pass) { 1.0 } else { 0.0 };
        Self {
            toggles: [
                flag(RenderPass::Ssao),
                flag(RenderPass::BloomBlur),
                flag(RenderPass::GodRays),
                settings.bloom.intensity,
            ],
        }
    }
}

struct Stage {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    uniform: wgpu::Buffer,
}

impl Stage {
    #[allow(clippy::too_many_arguments)]
    fn new(
        device: &wgpu::Device,
        label: &str,
        shader: &wgpu::ShaderModule,
        fragment_entry: &str,
        entries: &[wgpu::BindGroupLayoutEntry],
        uniform_size: usize,
        format: wgpu::TextureFormat,
    ) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries,
        });
        let pipeline = fullscreen_pipeline(device, label, shader, fragment_entry, &[&layout], format, None);
        let uniform = uniform_buffer(device, label, uniform_size);
        Self {
            pipeline,
            layout,
            uniform,
        }
    }
}

fn uniform_buffer(device: &wgpu::Device, label: &str, size: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

struct PostBindGroups {
    ssao: wgpu::BindGroup,
    extract: wgpu::BindGroup,
    blur_horizontal: wgpu::BindGroup,
    blur_vertical: wgpu::BindGroup,
    god_rays: wgpu::BindGroup,
    composite: wgpu::BindGroup,
}

/// SSAO, bloom, god rays and the final composite.
pub struct PostProcess {
    sampler: wgpu::Sampler,
    ssao: Stage,
    extract: Stage,
    blur: Stage,
    // The blur runs twice per frame, so the second direction needs its own
    // uniform.
    blur_vertical_uniform: wgpu::Buffer,
    god_rays: Stage,
    composite: Stage,
    bind_groups: PostBindGroups,
}

impl PostProcess {
    /// Build every stage; the composite writes `output_format`.
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat, targets: &FrameTargets) -> Self {
        let sampler = linear_sampler(device, "Post Process Sampler");
        let filtering = wgpu::SamplerBindingType::Filtering;

        let ssao_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("SSAO Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/ssao.wgsl").into()),
        });
        let ssao = Stage::new(
            device,
            "SSAO",
            &ssao_shader,
            "fs_ssao",
            &[uniform_entry(0, wgpu::ShaderStages::FRAGMENT), depth_texture_entry(1)],
            std::mem::size_of::<SsaoUniform>(),
            targets.ao.texture.format(),
        );

        let bloom_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bloom Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/bloom.wgsl").into()),
        });
        let bloom_entries = [
            uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
            texture_entry(1),
            sampler_entry(2, filtering),
        ];
        let extract = Stage::new(
            device,
            "Bloom Extract",
            &bloom_shader,
            "fs_extract",
            &bloom_entries,
            std::mem::size_of::<BloomUniform>(),
            HDR_FORMAT,
        );
        let blur = Stage::new(
            device,
            "Bloom Blur",
            &bloom_shader,
            "fs_blur",
            &bloom_entries,
            std::mem::size_of::<BloomUniform>(),
            HDR_FORMAT,
        );
        let blur_vertical_uniform =
            uniform_buffer(device, "Bloom Blur Vertical", std::mem::size_of::<BloomUniform>());

        let rays_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("God Ray Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/god_rays.wgsl").into()),
        });
        let god_rays = Stage::new(
            device,
            "God Rays",
            &rays_shader,
            "fs_god_rays",
            &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1),
                sampler_entry(2, filtering),
                depth_texture_entry(3),
            ],
            std::mem::size_of::<GodRayUniform>(),
            HDR_FORMAT,
        );

        let composite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Composite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/composite.wgsl").into()),
        });
        let composite = Stage::new(
            device,
            "Composite",
            &composite_shader,
            "fs_composite",
            &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                texture_entry(4),
                sampler_entry(5, filtering),
            ],
            std::mem::size_of::<CompositeUniform>(),
            output_format,
        );

        let bind_groups = Self::create_bind_groups(
            device,
            &sampler,
            targets,
            [&ssao, &extract, &blur, &god_rays, &composite],
            &blur_vertical_uniform,
        );

        Self {
            sampler,
            ssao,
            extract,
            blur,
            blur_vertical_uniform,
            god_rays,
            composite,
            bind_groups,
        }
    }

    /// Rebind after the frame targets were reallocated.
    pub fn bind_targets(&mut self, device: &wgpu::Device, targets: &FrameTargets) {
        self.bind_groups = Self::create_bind_groups(
            device,
            &self.sampler,
            targets,
            [&self.ssao, &self.extract, &self.blur, &self.god_rays, &self.composite],
            &self.blur_vertical_uniform,
        );
    }

    fn create_bind_groups(
        device: &wgpu::Device,
        sampler: &wgpu::Sampler,
        targets: &FrameTargets,
        [ssao, extract, blur, god_rays, composite]: [&Stage; 5],
        blur_vertical_uniform: &wgpu::Buffer,
    ) -> PostBindGroups {
        let view = |view| wgpu::BindingResource::TextureView(view);
        let sampled = |label, stage: &Stage, uniform: &wgpu::Buffer, source| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &stage.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: view(source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            })
        };

        let ssao_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SSAO Bind Group"),
            layout: &ssao.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ssao.uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: view(&targets.depth.view),
                },
            ],
        });

        let god_rays_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("God Ray Bind Group"),
            layout: &god_rays.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: god_rays.uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: view(&targets.hdr.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: view(&targets.depth.view),
                },
            ],
        });

        let composite_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Bind Group"),
            layout: &composite.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: composite.uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: view(&targets.hdr.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: view(&targets.ao.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: view(&targets.bloom_a.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: view(&targets.god_rays.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        PostBindGroups {
            ssao: ssao_group,
            extract: sampled("Bloom Extract Bind Group", extract, &extract.uniform, &targets.hdr.view),
            blur_horizontal: sampled("Bloom Blur H Bind Group", blur, &blur.uniform, &targets.bloom_a.view),
            blur_vertical: sampled(
                "Bloom Blur V Bind Group",
                blur,
                blur_vertical_uniform,
                &targets.bloom_b.view,
            ),
            god_rays: god_rays_group,
            composite: composite_group,
        }
    }

    /// Write this frame's stage parameters. `light_on_screen` is the light's
    /// texture-space position, if it projects in front of the camera.
    pub fn update(
        &self,
        queue: &wgpu::Queue,
        settings: &RenderSettings,
        plan: &FramePlan,
        targets: &FrameTargets,
        light_on_screen: Option<Vec2>,
    ) {
        let ssao = SsaoUniform {
            params: [
                settings.ssao.radius,
                settings.ssao.intensity,
                settings.ssao.samples as f32,
                0.0,
            ],
        };
        queue.write_buffer(&self.ssao.uniform, 0, bytemuck::bytes_of(&ssao));

        let (half_w, half_h) = targets.half_size();
        let texel = [1.0 / half_w as f32, 1.0 / half_h as f32];
        queue.write_buffer(
            &self.extract.uniform,
            0,
            bytemuck::bytes_of(&BloomUniform::new(settings, [0.0, 0.0])),
        );
        queue.write_buffer(
            &self.blur.uniform,
            0,
            bytemuck::bytes_of(&BloomUniform::new(settings, [texel[0], 0.0])),
        );
        queue.write_buffer(
            &self.blur_vertical_uniform,
            0,
            bytemuck::bytes_of(&BloomUniform::new(settings, [0.0, texel[1]])),
        );

        let rays = &settings.god_rays;
        let (light, visible) = match light_on_screen {
            Some(pos) => (pos, 1.0),
            None => (Vec2::splat(0.5), 0.0),
        };
        let god_rays = GodRayUniform {
            light: [light.x, light.y, rays.samples as f32, visible],
            params: [rays.density, rays.decay, rays.weight, rays.exposure],
        };
        queue.write_buffer(&self.god_rays.uniform, 0, bytemuck::bytes_of(&god_rays));

        queue.write_buffer(
            &self.composite.uniform,
            0,
            bytemuck::bytes_of(&CompositeUniform::new(settings, plan)),
        );
    }

    /// Record one post-process pass. Passes outside the chain are ignored.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pass: RenderPass,
        targets: &FrameTargets,
        output: &wgpu::TextureView,
    ) {
        let clear = wgpu::LoadOp::Clear(wgpu::Color::BLACK);
        let (label, stage, bind_group, view) = match pass {
            RenderPass::Ssao => ("SSAO Pass", &self.ssao, &self.bind_groups.ssao, &targets.ao.view),
            RenderPass::BloomExtract => (
                "Bloom Extract Pass",
                &self.extract,
                &self.bind_groups.extract,
                &targets.bloom_a.view,
            ),
            RenderPass::BloomBlur => {
                self.draw(
                    encoder,
                    "Bloom Blur H Pass",
                    &self.blur,
                    &self.bind_groups.blur_horizontal,
                    &targets.bloom_b.view,
                    clear,
                );
                (
                    "Bloom Blur V Pass",
                    &self.blur,
                    &self.bind_groups.blur_vertical,
                    &targets.bloom_a.view,
                )
            }
            RenderPass::GodRays => (
                "God Ray Pass",
                &self.god_rays,
                &self.bind_groups.god_rays,
                &targets.god_rays.view,
            ),
            RenderPass::Composite => ("Composite Pass", &self.composite, &self.bind_groups.composite, output),
            RenderPass::Shadow
            | RenderPass::Sky
            | RenderPass::Opaque
            | RenderPass::Transparent
            | RenderPass::Overlays => return,
        };
        self.draw(encoder, label, stage, bind_group, view, clear);
    }

    fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        stage: &Stage,
        bind_group: &wgpu::BindGroup,
        view: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
    ) {
        let mut pass = color_pass(encoder, label, view, load);
        pass.set_pipeline(&stage.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::OverlayVisibility;

    #[test]
    fn bloom_uniform_packs_kernel() {
        let mut settings = RenderSettings::default();
        settings.bloom.radius = 6;
        settings.bloom.sigma = 3.0;
        let uniform = BloomUniform::new(&settings, [0.5, 0.0]);
        assert_eq!(uniform.params[1], 6.0);
        let packed: Vec<f32> = uniform.weights.iter().flatten().copied().collect();
        let kernel = gaussian_weights(6, 3.0);
        assert_eq!(&packed[..7], kernel.as_slice());
        assert!(packed[7..].iter().all(|w| *w == 0.0));
    }

    #[test]
    fn oversized_radius_is_clamped() {
        let mut settings = RenderSettings::default();
        settings.bloom.radius = 100;
        let uniform = BloomUniform::new(&settings, [0.0, 0.0]);
        assert_eq!(uniform.params[1], MAX_BLUR_RADIUS as f32);
    }

    #[test]
    fn composite_toggles_follow_plan() {
        let mut settings = RenderSettings::default();
        settings.ssao.enabled = false;
        let plan = FramePlan::new(&settings, OverlayVisibility::NONE);
        let uniform = CompositeUniform::new(&settings, &plan);
        assert_eq!(uniform.toggles[..3], [0.0, 1.0, 0.0]);
        assert_eq!(uniform.toggles[3], settings.bloom.intensity);
    }

    #[test]
    fn uniform_sizes_are_aligned() {
        assert_eq!(std::mem::size_of::<BloomUniform>(), 80);
        assert_eq!(std::mem::size_of::<GodRayUniform>(), 32);
        assert_eq!(std::mem::size_of::<CompositeUniform>() % 16, 0);
    }
}
