#![warn(missing_docs)]
//! Chunked mesh building and rendering for block structures.
//!
//! [`ChunkBuilder`] walks a [`BlockSource`](blockview_world::BlockSource),
//! meshes every visible block into per-chunk opaque and transparent layers,
//! and collects emissive lights. [`Renderer`] draws the result with a shadow
//! pass, a sky and chunk pass, and optional SSAO, bloom and god rays.

mod builder;
mod camera;
mod chunk;
mod culling;
mod frame;
mod gpu;
mod lights;
mod mesh;
mod model;
mod pipeline;
mod resources;
mod screenshot;
mod settings;
pub mod visibility;

pub use builder::{
    stats_to_metrics, write_metrics_to_file, BuildError, ChunkBuilder, ChunkMeshStat, MeshEntry,
    RebuildStats,
};
pub use camera::{Camera, CameraUniform};
pub use chunk::{ChunkCoord, ChunkEntry, ChunkLayer, Layer, DEFAULT_CHUNK_SIZE};
pub use culling::DrawDistance;
pub use frame::{
    bloom_composite, gaussian_weights, light_screen_position, light_view_projection,
    project_to_screen, soft_highlight, FramePlan, HIGHLIGHT_KNEE, OverlayVisibility, RenderPass,
};
pub use gpu::{CpuMesh, CpuUploader, GpuMesh, GpuUploader, MeshUploader};
pub use lights::{EmissiveLight, LightCollector, LightsUniform, MAX_EMISSIVE_LIGHTS};
pub use mesh::{DebugLine, LineVertex, Mesh, MeshBuffers, MeshHash, MeshVertex, Quad};
pub use model::{
    BlockAppearance, BlockEntityMeshProvider, BlockEntityOutline, BoxModel, CubeModel, MeshProvider,
    ModelError, ModelSet, SlabModel,
};
pub use pipeline::{
    overlay_lines, AtlasImage, AtlasImageError, CompositeUniform, FrameReport, FrameTargets,
    OverlayPipeline, PostProcess, RenderContext, Renderer, SceneBindings, ScenePipelines,
    SceneUniform, ShadowPass, Target, DEPTH_FORMAT, HDR_FORMAT,
};
pub use resources::{Resources, DEFAULT_TILE_SIZE};
pub use screenshot::{record_texture_readback, write_png, TextureReadback};
pub use settings::{
    BloomSettings, GodRaySettings, LightSettings, RenderSettings, ResolutionSettings,
    ShadowSettings, SkySettings, SsaoSettings, DEFAULT_SETTINGS_PATH,
};
