use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::builder::MeshEntry;
use crate::frame::OverlayVisibility;
use crate::gpu::GpuMesh;
use crate::mesh::LineVertex;
use crate::model::cube_edges;

use super::targets::DEPTH_FORMAT;
use super::uniform_entry;

const GRID_COLOR: [f32; 4] = [0.35, 0.35, 0.38, 0.7];
const OUTLINE_COLOR: [f32; 4] = [1.0, 0.85, 0.2, 1.0];

/// Grid and outline vertices for the box `min..max` (float corners).
///
/// The grid lies on the bottom face with one line per block boundary.
/// Mesh debug lines are drawn from the chunk buffers instead.
pub fn overlay_lines(bounds: Option<(Vec3, Vec3)>, overlays: OverlayVisibility) -> Vec<LineVertex> {
    let Some((min, max)) = bounds else {
        return Vec::new();
    };
    let mut vertices = Vec::new();
    let mut push = |from: Vec3, to: Vec3, color: [f32; 4]| {
        vertices.push(LineVertex {
            position: from.to_array(),
            color,
        });
        vertices.push(LineVertex {
            position: to.to_array(),
            color,
        });
    };

    if overlays.grid {
        let y = min.y;
        let mut x = min.x;
        while x <= max.x {
            push(Vec3::new(x, y, min.z), Vec3::new(x, y, max.z), GRID_COLOR);
            x += 1.0;
        }
        let mut z = min.z;
        while z <= max.z {
            push(Vec3::new(min.x, y, z), Vec3::new(max.x, y, z), GRID_COLOR);
            z += 1.0;
        }
    }

    if overlays.outline {
        for (from, to) in cube_edges(min, max) {
            push(from, to, OUTLINE_COLOR);
        }
    }

    vertices
}

/// Line-list pipeline drawn last, over the final image.
pub struct OverlayPipeline {
    render_pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
}

impl OverlayPipeline {
    /// Create the pipeline. `camera_buffer` must start with a camera uniform.
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, camera_buffer: &wgpu::Buffer) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Overlay Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Overlay Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/overlay.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Overlay Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[LineVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false, // Don't write depth for overlays
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState {
                    constant: -1, // Slight offset to avoid z-fighting
                    slope_scale: -1.0,
                    clamp: 0.0,
                },
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        Self {
            render_pipeline,
            bind_group,
        }
    }

    /// Draw grid/outline `lines` plus, when requested, the debug lines of
    /// `entries`. Uses the scene depth without writing it.
    pub fn record(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        lines: &[LineVertex],
        entries: &[MeshEntry<'_, GpuMesh>],
        overlays: OverlayVisibility,
    ) {
        let line_buffer = (!lines.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Overlay Line Buffer"),
                contents: bytemuck::cast_slice(lines),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Overlay Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });
        pass.set_pipeline(&self.render_pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);

        if let Some(buffer) = &line_buffer {
            pass.set_vertex_buffer(0, buffer.slice(..));
            pass.draw(0..lines.len() as u32, 0..1);
        }

        if overlays.mesh_lines {
            for entry in entries.iter().filter(|entry| entry.visible) {
                let Some(gpu) = entry.gpu else { continue };
                let Some(buffer) = &gpu.line_buffer else { continue };
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(0..gpu.line_vertex_count, 0..1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_bounds_no_lines() {
        assert!(overlay_lines(None, OverlayVisibility::ALL).is_empty());
    }

    #[test]
    fn grid_covers_every_boundary() {
        let lines = overlay_lines(
            Some((Vec3::ZERO, Vec3::new(3.0, 2.0, 2.0))),
            OverlayVisibility {
                grid: true,
                ..OverlayVisibility::NONE
            },
        );
        // 4 lines along z, 3 along x, two vertices each.
        assert_eq!(lines.len(), (4 + 3) * 2);
        assert!(lines.iter().all(|v| v.position[1] == 0.0));
    }

    #[test]
    fn outline_is_twelve_edges() {
        let lines = overlay_lines(
            Some((Vec3::ZERO, Vec3::ONE)),
            OverlayVisibility {
                outline: true,
                ..OverlayVisibility::NONE
            },
        );
        assert_eq!(lines.len(), 24);
        assert!(lines.iter().all(|v| v.color == OUTLINE_COLOR));
    }

    #[test]
    fn mesh_lines_alone_add_nothing_here() {
        let lines = overlay_lines(
            Some((Vec3::ZERO, Vec3::ONE)),
            OverlayVisibility {
                mesh_lines: true,
                ..OverlayVisibility::NONE
            },
        );
        assert!(lines.is_empty());
    }
}
