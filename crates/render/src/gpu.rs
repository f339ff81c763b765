use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::chunk::{ChunkCoord, Layer};
use crate::mesh::MeshBuffers;

/// Turns finalized chunk buffers into whatever the renderer draws from.
///
/// Called synchronously during a rebuild, once per non-empty layer of each
/// rebuilt chunk.
pub trait MeshUploader {
    /// Handle kept on the chunk layer.
    type Buffer;

    /// Upload one layer. `None` leaves the layer without a handle.
    fn upload(&mut self, coord: ChunkCoord, layer: Layer, buffers: &MeshBuffers)
        -> Option<Self::Buffer>;
}

/// Upload record kept by [`CpuUploader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuMesh {
    /// Number of vertices.
    pub vertex_count: u32,
    /// Number of indices.
    pub index_count: u32,
    /// Number of line vertices.
    pub line_vertex_count: u32,
}

/// Uploader for headless meshing; counts uploads instead of touching a GPU.
#[derive(Debug, Default)]
pub struct CpuUploader {
    uploads: usize,
}

impl CpuUploader {
    /// Fresh uploader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Layers uploaded so far.
    pub fn uploads(&self) -> usize {
        self.uploads
    }
}

impl MeshUploader for CpuUploader {
    type Buffer = CpuMesh;

    fn upload(&mut self, _coord: ChunkCoord, _layer: Layer, buffers: &MeshBuffers) -> Option<CpuMesh> {
        self.uploads += 1;
        Some(CpuMesh {
            vertex_count: buffers.vertices.len() as u32,
            index_count: buffers.indices.len() as u32,
            line_vertex_count: buffers.lines.len() as u32,
        })
    }
}

/// GPU-side representation of a chunk layer.
pub struct GpuMesh {
    /// Vertex buffer on GPU.
    pub vertex_buffer: Option<wgpu::Buffer>,
    /// Index buffer on GPU.
    pub index_buffer: Option<wgpu::Buffer>,
    /// Number of indices to draw.
    pub index_count: u32,
    /// Line-list buffer for the overlay pass.
    pub line_buffer: Option<wgpu::Buffer>,
    /// Number of line vertices.
    pub line_vertex_count: u32,
}

impl GpuMesh {
    /// Upload mesh buffers to the GPU.
    pub fn from_mesh_buffers(device: &wgpu::Device, mesh: &MeshBuffers) -> Self {
        let (vertex_buffer, index_buffer) = if mesh.indices.is_empty() {
            (None, None)
        } else {
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Chunk Vertex Buffer"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Chunk Index Buffer"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (Some(vertex_buffer), Some(index_buffer))
        };

        let line_buffer = (!mesh.lines.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Chunk Line Buffer"),
                contents: bytemuck::cast_slice(&mesh.lines),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            line_buffer,
            line_vertex_count: mesh.lines.len() as u32,
        }
    }
}

/// Uploads chunk layers into wgpu buffers.
pub struct GpuUploader {
    device: Arc<wgpu::Device>,
}

impl GpuUploader {
    /// Uploader bound to `device`.
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self { device }
    }
}

impl MeshUploader for GpuUploader {
    type Buffer = GpuMesh;

    fn upload(&mut self, coord: ChunkCoord, layer: Layer, buffers: &MeshBuffers) -> Option<GpuMesh> {
        tracing::trace!(?coord, ?layer, vertices = buffers.vertices.len(), "uploading chunk layer");
        Some(GpuMesh::from_mesh_buffers(&self.device, buffers))
    }
}
