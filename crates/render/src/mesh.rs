use blake3::Hasher;
use glam::Vec3;

/// Hash of the combined vertex/index buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MeshHash(pub [u8; 32]);

impl MeshHash {
    /// Lowercase hex rendering, used in metrics artifacts.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Vertex layout shared by every block quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    /// Position in structure space once placed (block-local inside a model).
    pub position: [f32; 3],
    /// Face normal (unit length).
    pub normal: [f32; 3],
    /// Texture coordinates for atlas sampling.
    pub uv: [f32; 2],
    /// Atlas tile rect `[u0, v0, u1, v1]` the sampler is clamped to.
    pub uv_rect: [f32; 4],
    /// Tint color; alpha drives blending in the transparent pass.
    pub color: [f32; 4],
    /// Position of the block that produced this vertex.
    pub block_pos: [f32; 3],
    /// Emission strength, added on top of lit color.
    pub emissive: f32,
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x3,
        6 => Float32,
    ];

    /// Vertex buffer layout matching the shader inputs.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Four vertices in counter-clockwise order seen from the front.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    /// Corner vertices.
    pub vertices: [MeshVertex; 4],
}

impl Quad {
    /// Geometric normal from the winding, or `None` for a degenerate quad.
    pub fn face_normal(&self) -> Option<Vec3> {
        let p0 = Vec3::from(self.vertices[0].position);
        let p1 = Vec3::from(self.vertices[1].position);
        let p2 = Vec3::from(self.vertices[2].position);
        (p1 - p0).cross(p2 - p0).try_normalize()
    }
}

/// Debug line segment drawn by the overlay pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    /// Start point.
    pub from: [f32; 3],
    /// End point.
    pub to: [f32; 3],
    /// Line color.
    pub color: [f32; 4],
}

/// Vertex layout for overlay lines.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    /// Position in structure space.
    pub position: [f32; 3],
    /// Line color.
    pub color: [f32; 4],
}

impl LineVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

    /// Vertex buffer layout matching the overlay shader.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Block geometry: an ordered list of quads plus debug lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Quads in emission order.
    pub quads: Vec<Quad>,
    /// Debug lines in emission order.
    pub lines: Vec<DebugLine>,
}

impl Mesh {
    /// Empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the mesh carries no geometry at all.
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty() && self.lines.is_empty()
    }

    /// Number of quads.
    pub fn quad_count(&self) -> usize {
        self.quads.len()
    }

    /// Number of triangles the quads expand to.
    pub fn triangle_count(&self) -> usize {
        self.quads.len() * 2
    }

    /// Add a quad.
    pub fn push_quad(&mut self, quad: Quad) {
        self.quads.push(quad);
    }

    /// Add a debug line.
    pub fn push_line(&mut self, line: DebugLine) {
        self.lines.push(line);
    }

    /// Move all geometry from `other` onto the end of this mesh.
    pub fn append(&mut self, other: &mut Mesh) {
        self.quads.append(&mut other.quads);
        self.lines.append(&mut other.lines);
    }

    /// Clear geometry while keeping allocations.
    pub fn clear(&mut self) {
        self.quads.clear();
        self.lines.clear();
    }

    /// Offset every vertex and line endpoint by `offset`.
    pub fn translate(&mut self, offset: [f32; 3]) {
        let offset = Vec3::from(offset);
        for quad in &mut self.quads {
            for vertex in &mut quad.vertices {
                vertex.position = (Vec3::from(vertex.position) + offset).to_array();
            }
        }
        for line in &mut self.lines {
            line.from = (Vec3::from(line.from) + offset).to_array();
            line.to = (Vec3::from(line.to) + offset).to_array();
        }
    }

    /// Stamp the source block position and the winding normal on every vertex.
    pub fn tag_block(&mut self, block_pos: [f32; 3]) {
        for quad in &mut self.quads {
            let normal = quad.face_normal().map(|n| n.to_array());
            for vertex in &mut quad.vertices {
                vertex.block_pos = block_pos;
                if let Some(normal) = normal {
                    vertex.normal = normal;
                }
            }
        }
    }

    /// Flatten into GPU-ready buffers.
    pub fn to_buffers(&self) -> MeshBuffers {
        let mut vertices = Vec::with_capacity(self.quads.len() * 4);
        let mut indices = Vec::with_capacity(self.quads.len() * 6);
        for quad in &self.quads {
            let base = vertices.len() as u32;
            vertices.extend_from_slice(&quad.vertices);
            indices.extend([0, 1, 2, 0, 2, 3].map(|i| base + i));
        }
        let lines: Vec<LineVertex> = self
            .lines
            .iter()
            .flat_map(|line| {
                [
                    LineVertex {
                        position: line.from,
                        color: line.color,
                    },
                    LineVertex {
                        position: line.to,
                        color: line.color,
                    },
                ]
            })
            .collect();

        let mut hasher = Hasher::new();
        hasher.update(bytemuck::cast_slice(&vertices));
        hasher.update(bytemuck::cast_slice(&indices));
        hasher.update(bytemuck::cast_slice(&lines));
        MeshBuffers {
            vertices,
            indices,
            lines,
            hash: MeshHash(*hasher.finalize().as_bytes()),
        }
    }
}

/// Output buffers for one mesh layer.
#[derive(Debug, Clone)]
pub struct MeshBuffers {
    /// Vertex buffer used for draw submission.
    pub vertices: Vec<MeshVertex>,
    /// Index buffer (triangle list).
    pub indices: Vec<u32>,
    /// Line-list vertices for the overlay pass.
    pub lines: Vec<LineVertex>,
    /// Stable hash of the vertex + index + line buffers.
    pub hash: MeshHash,
}

impl MeshBuffers {
    /// Buffers for an empty mesh.
    pub fn empty() -> Self {
        Mesh::new().to_buffers()
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty() && self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(position: [f32; 3]) -> MeshVertex {
        MeshVertex {
            position,
            normal: [0.0; 3],
            uv: [0.0; 2],
            uv_rect: [0.0, 0.0, 1.0, 1.0],
            color: [1.0; 4],
            block_pos: [0.0; 3],
            emissive: 0.0,
        }
    }

    fn up_quad() -> Quad {
        Quad {
            vertices: [
                vertex([0.0, 1.0, 1.0]),
                vertex([1.0, 1.0, 1.0]),
                vertex([1.0, 1.0, 0.0]),
                vertex([0.0, 1.0, 0.0]),
            ],
        }
    }

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 20 * 4);
        assert_eq!(std::mem::size_of::<LineVertex>(), 7 * 4);
    }

    #[test]
    fn tagging_sets_winding_normal_and_source() {
        let mut mesh = Mesh::new();
        mesh.push_quad(up_quad());
        mesh.translate([2.0, 0.0, -3.0]);
        mesh.tag_block([2.0, 0.0, -3.0]);

        let v = mesh.quads[0].vertices[0];
        assert_eq!(v.position, [2.0, 1.0, -2.0]);
        assert_eq!(v.normal, [0.0, 1.0, 0.0]);
        assert_eq!(v.block_pos, [2.0, 0.0, -3.0]);
    }

    #[test]
    fn buffers_index_two_triangles_per_quad() {
        let mut mesh = Mesh::new();
        mesh.push_quad(up_quad());
        mesh.push_quad(up_quad());
        mesh.push_line(DebugLine {
            from: [0.0; 3],
            to: [1.0; 3],
            color: [1.0; 4],
        });
        let buffers = mesh.to_buffers();
        assert_eq!(buffers.vertices.len(), 8);
        assert_eq!(buffers.indices, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
        assert_eq!(buffers.lines.len(), 2);
    }

    #[test]
    fn hash_tracks_geometry() {
        let mut a = Mesh::new();
        a.push_quad(up_quad());
        let mut b = a.clone();
        assert_eq!(a.to_buffers().hash, b.to_buffers().hash);

        b.translate([0.0, 1.0, 0.0]);
        assert_ne!(a.to_buffers().hash, b.to_buffers().hash);
        assert_ne!(MeshBuffers::empty().hash, a.to_buffers().hash);
    }

    #[test]
    fn hex_hash_has_64_chars() {
        assert_eq!(MeshBuffers::empty().hash.to_hex().len(), 64);
    }
}
