//! Chunk cells: how block positions map to mesh batches.

use blockview_core::BlockPos;
use glam::Vec3;

use crate::lights::EmissiveLight;
use crate::mesh::{Mesh, MeshBuffers, MeshHash};

/// Chunk edge length used when none is configured.
pub const DEFAULT_CHUNK_SIZE: u32 = 16;

/// Signed chunk coordinate: `floor(block / chunk_size)` per axis.
///
/// Ordered by `(x, y, z)` so chunk maps iterate deterministically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// Chunk index along X.
    pub x: i32,
    /// Chunk index along Y.
    pub y: i32,
    /// Chunk index along Z.
    pub z: i32,
}

impl ChunkCoord {
    /// Coordinate from chunk indices.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Chunk containing `pos`. Negative positions round toward negative
    /// infinity, so block -1 lives in chunk -1, not chunk 0.
    pub fn containing(pos: BlockPos, chunk_size: u32) -> Self {
        let size = chunk_size.max(1) as i32;
        Self {
            x: pos.x.div_euclid(size),
            y: pos.y.div_euclid(size),
            z: pos.z.div_euclid(size),
        }
    }

    /// Minimum block corner of the chunk.
    pub fn origin(self, chunk_size: u32) -> Vec3 {
        let size = chunk_size as f32;
        Vec3::new(self.x as f32, self.y as f32, self.z as f32) * size
    }

    /// Geometric center of the chunk cell.
    pub fn center(self, chunk_size: u32) -> Vec3 {
        self.origin(chunk_size) + Vec3::splat(chunk_size as f32 * 0.5)
    }

    /// Zig-zag storage slot per axis: `|v| * 2 + (v < 0)`.
    ///
    /// Distinct coordinates always map to distinct slots.
    pub fn storage_slot(self) -> [u64; 3] {
        [self.x, self.y, self.z].map(zigzag)
    }
}

fn zigzag(v: i32) -> u64 {
    u64::from(v.unsigned_abs()) * 2 + u64::from(v < 0)
}

/// Which sub-mesh of a chunk a piece of geometry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    /// Depth-writing pass.
    Opaque,
    /// Blended pass, drawn after every opaque layer.
    Transparent,
}

/// One sub-mesh with its finalized buffers.
#[derive(Debug)]
pub struct ChunkLayer<B> {
    mesh: Mesh,
    hash: MeshHash,
    gpu: Option<B>,
}

impl<B> ChunkLayer<B> {
    fn new() -> Self {
        Self {
            mesh: Mesh::new(),
            hash: MeshBuffers::empty().hash,
            gpu: None,
        }
    }

    /// CPU-side geometry.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Hash of the last finalized buffers.
    pub fn hash(&self) -> MeshHash {
        self.hash
    }

    /// Uploaded buffers, if the layer is non-empty and was finalized.
    pub fn gpu(&self) -> Option<&B> {
        self.gpu.as_ref()
    }
}

/// Per-chunk meshes, lights and origin.
///
/// Created on first reference and kept for the builder's lifetime.
#[derive(Debug)]
pub struct ChunkEntry<B> {
    coord: ChunkCoord,
    origin: Vec3,
    center: Vec3,
    pub(crate) opaque: ChunkLayer<B>,
    pub(crate) transparent: ChunkLayer<B>,
    pub(crate) lights: Vec<EmissiveLight>,
}

impl<B> ChunkEntry<B> {
    pub(crate) fn new(coord: ChunkCoord, chunk_size: u32) -> Self {
        Self {
            coord,
            origin: coord.origin(chunk_size),
            center: coord.center(chunk_size),
            opaque: ChunkLayer::new(),
            transparent: ChunkLayer::new(),
            lights: Vec::new(),
        }
    }

    /// Chunk coordinate.
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Structure-space origin (`coord * chunk_size`).
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Geometric center used for draw-distance tests.
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Sub-mesh for `layer`.
    pub fn layer(&self, layer: Layer) -> &ChunkLayer<B> {
        match layer {
            Layer::Opaque => &self.opaque,
            Layer::Transparent => &self.transparent,
        }
    }

    /// Emissive lights collected for this chunk.
    pub fn lights(&self) -> &[EmissiveLight] {
        &self.lights
    }

    pub(crate) fn layer_mut(&mut self, layer: Layer) -> &mut ChunkLayer<B> {
        match layer {
            Layer::Opaque => &mut self.opaque,
            Layer::Transparent => &mut self.transparent,
        }
    }

    pub(crate) fn clear(&mut self) {
        for layer in [Layer::Opaque, Layer::Transparent] {
            let layer = self.layer_mut(layer);
            layer.mesh.clear();
            layer.gpu = None;
        }
        self.lights.clear();
    }

    pub(crate) fn append(&mut self, layer: Layer, mesh: &mut Mesh) {
        self.layer_mut(layer).mesh.append(mesh);
    }

    /// Rebuild buffers for both layers and hand them to `upload`.
    pub(crate) fn finalize(&mut self, mut upload: impl FnMut(Layer, &MeshBuffers) -> Option<B>) {
        for kind in [Layer::Opaque, Layer::Transparent] {
            let layer = self.layer_mut(kind);
            let buffers = layer.mesh.to_buffers();
            layer.hash = buffers.hash;
            layer.gpu = if buffers.is_empty() {
                None
            } else {
                upload(kind, &buffers)
            };
        }
    }
}
