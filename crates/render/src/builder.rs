//! Structure walk that turns placed blocks into per-chunk meshes.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use blake3::Hasher;
use blockview_assets::BlockFlags;
use blockview_core::{BlockPos, PlacedBlock};
use blockview_testkit::{ChunkMeshMetric, MeshMetricSink};
use blockview_world::BlockSource;
use glam::Vec3;
use thiserror::Error;

use crate::chunk::{ChunkCoord, ChunkEntry, Layer};
use crate::culling::DrawDistance;
use crate::gpu::{CpuUploader, MeshUploader};
use crate::lights::{EmissiveLight, LightCollector, MAX_EMISSIVE_LIGHTS};
use crate::mesh::{Mesh, MeshHash};
use crate::model::ModelError;
use crate::resources::Resources;
use crate::visibility::{self, CellInfo};

/// Hard failures that stop a builder from being usable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// The resources cannot generate any block mesh.
    #[error("resources provide no mesh generator")]
    NoMeshProvider,
    /// Chunk edge length of zero.
    #[error("chunk size must be at least 1")]
    InvalidChunkSize,
}

/// One drawable chunk layer.
pub struct MeshEntry<'a, B> {
    /// Chunk coordinate.
    pub coord: ChunkCoord,
    /// Opaque or transparent layer.
    pub layer: Layer,
    /// CPU geometry in structure space.
    pub mesh: &'a Mesh,
    /// Uploaded buffers, if any.
    pub gpu: Option<&'a B>,
    /// Chunk origin (`coord * chunk_size`).
    pub origin: Vec3,
    /// Chunk center.
    pub center: Vec3,
    /// Draw-distance result; `true` until a culler says otherwise.
    pub visible: bool,
}

impl<B> Clone for MeshEntry<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for MeshEntry<'_, B> {}

impl<'a, B> MeshEntry<'a, B> {
    fn new(entry: &'a ChunkEntry<B>, layer: Layer) -> Self {
        let chunk_layer = entry.layer(layer);
        Self {
            coord: entry.coord(),
            layer,
            mesh: chunk_layer.mesh(),
            gpu: chunk_layer.gpu(),
            origin: entry.origin(),
            center: entry.center(),
            visible: true,
        }
    }

    /// Whether this entry belongs to the blended pass.
    pub fn is_transparent(&self) -> bool {
        self.layer == Layer::Transparent
    }
}

/// Flat draw list state: rebuilt lazily after any chunk changes.
#[derive(Debug)]
enum MeshCache {
    Dirty,
    Clean(Vec<(ChunkCoord, Layer)>),
}

/// Mesh stats for one rebuilt chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMeshStat {
    /// Chunk coordinate.
    pub coord: ChunkCoord,
    /// Triangles in the opaque layer.
    pub opaque_triangles: usize,
    /// Triangles in the transparent layer.
    pub transparent_triangles: usize,
    /// Combined hash of both layers.
    pub hash: MeshHash,
}

impl ChunkMeshStat {
    fn of_entry<B>(entry: &ChunkEntry<B>) -> Self {
        let opaque = entry.layer(Layer::Opaque);
        let transparent = entry.layer(Layer::Transparent);
        let mut hasher = Hasher::new();
        hasher.update(&opaque.hash().0);
        hasher.update(&transparent.hash().0);
        Self {
            coord: entry.coord(),
            opaque_triangles: opaque.mesh().triangle_count(),
            transparent_triangles: transparent.mesh().triangle_count(),
            hash: MeshHash(*hasher.finalize().as_bytes()),
        }
    }
}

/// Summary of one rebuild call.
#[derive(Debug, Clone, Default)]
pub struct RebuildStats {
    /// Blocks inside the rebuilt chunks.
    pub blocks_visited: usize,
    /// Blocks skipped because every neighbor is opaque.
    pub blocks_occluded: usize,
    /// Blocks whose mesh generation failed.
    pub blocks_failed: usize,
    /// Quads written to opaque layers.
    pub opaque_quads: usize,
    /// Quads written to transparent layers.
    pub transparent_quads: usize,
    /// Emissive lights the frame sees after this rebuild, across every
    /// chunk and capped at [`MAX_EMISSIVE_LIGHTS`].
    pub lights: usize,
    /// Per-chunk results, in coordinate order.
    pub chunks: Vec<ChunkMeshStat>,
    /// Wall time spent, including uploads.
    pub elapsed: Duration,
}

impl RebuildStats {
    /// Convert stats into serializable metrics for CI artifacts.
    pub fn to_metrics(&self) -> Vec<ChunkMeshMetric> {
        stats_to_metrics(&self.chunks)
    }

    /// Write metrics to disk using the testkit sink.
    pub fn write_metrics_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_metrics_to_file(&self.chunks, path)
    }
}

/// Convert chunk stats into serializable metrics.
pub fn stats_to_metrics(stats: &[ChunkMeshStat]) -> Vec<ChunkMeshMetric> {
    stats
        .iter()
        .map(|stat| ChunkMeshMetric {
            chunk: [stat.coord.x, stat.coord.y, stat.coord.z],
            opaque_triangles: stat.opaque_triangles,
            transparent_triangles: stat.transparent_triangles,
            hash: stat.hash.to_hex(),
        })
        .collect()
}

/// Write chunk stats as a JSON metrics artifact.
pub fn write_metrics_to_file<P: AsRef<Path>>(stats: &[ChunkMeshStat], path: P) -> Result<()> {
    let metrics = stats_to_metrics(stats);
    let mut sink = MeshMetricSink::create(path)?;
    sink.write(&metrics)?;
    Ok(())
}

enum BlockOutcome {
    Occluded,
    Visible {
        geometry: Option<(Mesh, Layer)>,
        light: Option<EmissiveLight>,
    },
}

/// Chunked, visibility-pruned meshing of one structure.
///
/// The builder owns its structure and chunk grid. Edits go through
/// [`ChunkBuilder::structure_mut`] followed by
/// [`ChunkBuilder::update_structure_buffers`], so a draw list is never read
/// while a rebuild is in flight.
pub struct ChunkBuilder<S, U: MeshUploader = CpuUploader> {
    structure: S,
    resources: Arc<Resources>,
    chunk_size: u32,
    uploader: U,
    chunks: BTreeMap<ChunkCoord, ChunkEntry<U::Buffer>>,
    cache: MeshCache,
}

impl<S: BlockSource, U: MeshUploader> ChunkBuilder<S, U> {
    /// Bind a structure and resources, then mesh everything.
    pub fn new(
        structure: S,
        resources: Arc<Resources>,
        chunk_size: u32,
        uploader: U,
    ) -> Result<Self, BuildError> {
        if chunk_size == 0 {
            return Err(BuildError::InvalidChunkSize);
        }
        if !resources.models().has_providers() {
            return Err(BuildError::NoMeshProvider);
        }
        let mut builder = Self {
            structure,
            resources,
            chunk_size,
            uploader,
            chunks: BTreeMap::new(),
            cache: MeshCache::Dirty,
        };
        builder.update_structure_buffers(None);
        Ok(builder)
    }

    /// Structure being meshed.
    pub fn structure(&self) -> &S {
        &self.structure
    }

    /// Mutable structure access for edits. Follow up with
    /// [`Self::update_structure_buffers`] for the affected chunks.
    pub fn structure_mut(&mut self) -> &mut S {
        &mut self.structure
    }

    /// Resources in use.
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Chunk edge length in blocks.
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Uploader in use.
    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    /// Swap in a new structure and rebuild everything. Returns the old one.
    pub fn set_structure(&mut self, structure: S) -> S {
        let previous = std::mem::replace(&mut self.structure, structure);
        self.update_structure_buffers(None);
        previous
    }

    /// Swap in new resources and rebuild everything.
    pub fn set_resources(&mut self, resources: Arc<Resources>) -> Result<RebuildStats, BuildError> {
        if !resources.models().has_providers() {
            return Err(BuildError::NoMeshProvider);
        }
        self.resources = resources;
        Ok(self.update_structure_buffers(None))
    }

    /// Rebuild every chunk (`None`) or only the listed chunks.
    ///
    /// Chunks outside the list keep their meshes and buffers untouched.
    /// Per-block mesh failures are logged and skipped.
    pub fn update_structure_buffers(&mut self, only: Option<&[ChunkCoord]>) -> RebuildStats {
        let started = Instant::now();
        let targets: Option<BTreeSet<ChunkCoord>> = only.map(|coords| coords.iter().copied().collect());
        let mut touched: BTreeSet<ChunkCoord> = match &targets {
            Some(targets) => targets.clone(),
            None => self.chunks.keys().copied().collect(),
        };
        for coord in &touched {
            if let Some(entry) = self.chunks.get_mut(coord) {
                entry.clear();
            }
        }

        let mut stats = RebuildStats::default();
        let chunk_size = self.chunk_size;
        let resources = &*self.resources;
        for block in self.structure.blocks() {
            let coord = ChunkCoord::containing(block.pos, chunk_size);
            if targets.as_ref().is_some_and(|targets| !targets.contains(&coord)) {
                continue;
            }
            touched.insert(coord);
            stats.blocks_visited += 1;
            let entry = self
                .chunks
                .entry(coord)
                .or_insert_with(|| ChunkEntry::new(coord, chunk_size));

            match mesh_block(&self.structure, resources, block) {
                Ok(BlockOutcome::Occluded) => stats.blocks_occluded += 1,
                Ok(BlockOutcome::Visible { geometry, light }) => {
                    if let Some(light) = light {
                        if entry.lights.len() < MAX_EMISSIVE_LIGHTS {
                            entry.lights.push(light);
                        }
                    }
                    if let Some((mut mesh, layer)) = geometry {
                        match layer {
                            Layer::Opaque => stats.opaque_quads += mesh.quad_count(),
                            Layer::Transparent => stats.transparent_quads += mesh.quad_count(),
                        }
                        entry.append(layer, &mut mesh);
                    }
                }
                Err(err) => {
                    stats.blocks_failed += 1;
                    tracing::warn!(
                        pos = %block.pos,
                        block = %block.state.name,
                        %err,
                        "block mesh generation failed; block skipped"
                    );
                }
            }
        }

        let uploader = &mut self.uploader;
        for coord in &touched {
            if let Some(entry) = self.chunks.get_mut(coord) {
                entry.finalize(|layer, buffers| uploader.upload(*coord, layer, buffers));
                stats.chunks.push(ChunkMeshStat::of_entry(entry));
            }
        }
        self.cache = MeshCache::Dirty;
        stats.lights = self
            .chunks
            .values()
            .map(|entry| entry.lights().len())
            .sum::<usize>()
            .min(MAX_EMISSIVE_LIGHTS);
        stats.elapsed = started.elapsed();

        tracing::debug!(
            chunks = stats.chunks.len(),
            blocks = stats.blocks_visited,
            occluded = stats.blocks_occluded,
            failed = stats.blocks_failed,
            opaque_quads = stats.opaque_quads,
            transparent_quads = stats.transparent_quads,
            lights = stats.lights,
            elapsed_ms = stats.elapsed.as_secs_f64() * 1000.0,
            partial = targets.is_some(),
            "rebuilt chunk meshes"
        );
        stats
    }

    /// Chunks whose geometry may change when the blocks at `positions` are
    /// edited: each block's own chunk plus the chunks of its six neighbors.
    pub fn chunks_affected_by(
        &self,
        positions: impl IntoIterator<Item = BlockPos>,
    ) -> Vec<ChunkCoord> {
        let mut coords = BTreeSet::new();
        for pos in positions {
            coords.insert(ChunkCoord::containing(pos, self.chunk_size));
            for (_, neighbor) in pos.neighbors() {
                coords.insert(ChunkCoord::containing(neighbor, self.chunk_size));
            }
        }
        coords.into_iter().collect()
    }

    /// Chunk entry at `coord`, if one was ever created.
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&ChunkEntry<U::Buffer>> {
        self.chunks.get(&coord)
    }

    /// All chunk entries in coordinate order.
    pub fn chunks(&self) -> impl Iterator<Item = &ChunkEntry<U::Buffer>> {
        self.chunks.values()
    }

    /// Current stats for every chunk.
    pub fn chunk_stats(&self) -> Vec<ChunkMeshStat> {
        self.chunks.values().map(ChunkMeshStat::of_entry).collect()
    }

    /// Whether the draw list reflects the latest rebuild.
    pub fn is_cache_clean(&self) -> bool {
        matches!(self.cache, MeshCache::Clean(_))
    }

    /// Non-empty chunk layers: every opaque layer, then every transparent
    /// layer, each group in chunk coordinate order.
    ///
    /// Transparent layers are not sorted by depth.
    pub fn mesh_entries(&mut self) -> Vec<MeshEntry<'_, U::Buffer>> {
        self.refresh_cache();
        self.cached_entries()
    }

    /// [`Self::mesh_entries`] limited to chunks whose center lies within
    /// `max_distance` of `camera`. `None` returns everything.
    pub fn mesh_entries_in_range(
        &mut self,
        camera: Vec3,
        max_distance: Option<f32>,
    ) -> Vec<MeshEntry<'_, U::Buffer>> {
        let culler = DrawDistance::new(camera, max_distance);
        culler.filter(self.mesh_entries())
    }

    /// Meshes in draw-list order.
    pub fn meshes(&mut self) -> Vec<&Mesh> {
        self.mesh_entries()
            .into_iter()
            .map(|entry| entry.mesh)
            .collect()
    }

    /// Emissive lights across all chunks in coordinate order, capped at
    /// [`MAX_EMISSIVE_LIGHTS`].
    pub fn emissive_lights(&self) -> Vec<EmissiveLight> {
        let mut collector = LightCollector::new();
        for entry in self.chunks.values() {
            collector.extend(entry.lights());
        }
        collector.finish()
    }

    fn refresh_cache(&mut self) {
        if let MeshCache::Clean(_) = self.cache {
            return;
        }
        let mut refs = Vec::new();
        for layer in [Layer::Opaque, Layer::Transparent] {
            refs.extend(
                self.chunks
                    .iter()
                    .filter(|(_, entry)| !entry.layer(layer).mesh().is_empty())
                    .map(|(coord, _)| (*coord, layer)),
            );
        }
        tracing::trace!(entries = refs.len(), "mesh entry cache rebuilt");
        self.cache = MeshCache::Clean(refs);
    }

    fn cached_entries(&self) -> Vec<MeshEntry<'_, U::Buffer>> {
        let MeshCache::Clean(refs) = &self.cache else {
            return Vec::new();
        };
        refs.iter()
            .filter_map(|&(coord, layer)| {
                self.chunks
                    .get(&coord)
                    .map(|entry| MeshEntry::new(entry, layer))
            })
            .collect()
    }
}

fn mesh_block<S: BlockSource + ?Sized>(
    source: &S,
    resources: &Resources,
    block: &PlacedBlock,
) -> Result<BlockOutcome, ModelError> {
    if visibility::is_fully_occluded(source, resources, block.pos) {
        return Ok(BlockOutcome::Occluded);
    }

    let info = CellInfo::of_block(block, resources);
    let light = resources
        .emission(&block.state.name)
        .map(|emission| EmissiveLight::at_block(block.pos, emission));
    if info.flags.contains(BlockFlags::INVISIBLE) {
        return Ok(BlockOutcome::Visible {
            geometry: None,
            light,
        });
    }

    let cull = visibility::cull_flags(source, resources, block, &info);
    let mut mesh = resources.models().block_mesh(block, cull)?;
    if mesh.is_empty() {
        return Ok(BlockOutcome::Visible {
            geometry: None,
            light,
        });
    }

    let origin = block.pos.as_f32();
    mesh.translate(origin);
    mesh.tag_block(origin);
    let layer = if info.flags.is_semi_transparent() {
        Layer::Transparent
    } else {
        Layer::Opaque
    };
    Ok(BlockOutcome::Visible {
        geometry: Some((mesh, layer)),
        light,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use blockview_assets::{BlockDescriptor, BlockRegistry};
    use blockview_core::{BlockName, BlockState};
    use blockview_world::Structure;

    use super::*;
    use crate::model::ModelSet;

    fn resources() -> Arc<Resources> {
        Arc::new(Resources::with_default_models(BlockRegistry::new(vec![
            BlockDescriptor::simple("stone", BlockFlags::OPAQUE | BlockFlags::SELF_CULLING)
                .unwrap(),
            BlockDescriptor::simple("glass", BlockFlags::SEMI_TRANSPARENT | BlockFlags::SELF_CULLING)
                .unwrap(),
            BlockDescriptor::simple("glowstone", BlockFlags::OPAQUE | BlockFlags::EMISSIVE)
                .unwrap(),
        ])))
    }

    fn state(name: &str) -> BlockState {
        BlockState::new(BlockName::parse(name).unwrap())
    }

    fn builder(structure: Structure) -> ChunkBuilder<Structure> {
        ChunkBuilder::new(structure, resources(), 16, CpuUploader::new()).unwrap()
    }

    #[test]
    fn rejects_resources_without_models() {
        let resources = Arc::new(Resources::new(
            Arc::new(BlockRegistry::default()),
            Arc::new(blockview_assets::TextureAtlasMetadata::grid(16, 0, ["a"])),
            ModelSet::new(),
        ));
        let err = ChunkBuilder::new(Structure::with_size(1, 1, 1), resources, 16, CpuUploader::new())
            .err();
        assert_eq!(err, Some(BuildError::NoMeshProvider));

        let err = ChunkBuilder::new(Structure::with_size(1, 1, 1), self::resources(), 0, CpuUploader::new())
            .err();
        assert_eq!(err, Some(BuildError::InvalidChunkSize));
    }

    #[test]
    fn opaque_entries_come_before_transparent() {
        let mut structure = Structure::with_size(40, 1, 1);
        structure.set_block(BlockPos::new(0, 0, 0), state("glass")).unwrap();
        structure.set_block(BlockPos::new(20, 0, 0), state("stone")).unwrap();
        structure.set_block(BlockPos::new(39, 0, 0), state("glass")).unwrap();
        let mut builder = builder(structure);

        let layers: Vec<(i32, Layer)> = builder
            .mesh_entries()
            .iter()
            .map(|entry| (entry.coord.x, entry.layer))
            .collect();
        assert_eq!(
            layers,
            vec![
                (1, Layer::Opaque),
                (0, Layer::Transparent),
                (2, Layer::Transparent)
            ]
        );
    }

    #[test]
    fn cache_goes_dirty_after_rebuild() {
        let mut structure = Structure::with_size(2, 1, 1);
        structure.set_block(BlockPos::ZERO, state("stone")).unwrap();
        let mut builder = builder(structure);
        assert!(!builder.is_cache_clean());
        assert_eq!(builder.mesh_entries().len(), 1);
        assert!(builder.is_cache_clean());

        builder
            .structure_mut()
            .set_block(BlockPos::new(1, 0, 0), state("glass"))
            .unwrap();
        let affected = builder.chunks_affected_by([BlockPos::new(1, 0, 0)]);
        builder.update_structure_buffers(Some(&affected));
        assert!(!builder.is_cache_clean());
        assert_eq!(builder.mesh_entries().len(), 2);
    }

    #[test]
    fn occluded_emitters_give_no_light() {
        let mut structure = Structure::with_size(3, 3, 3);
        structure.fill(BlockPos::ZERO, BlockPos::new(2, 2, 2), &state("stone"));
        structure.set_block(BlockPos::new(1, 1, 1), state("glowstone")).unwrap();
        structure.set_block(BlockPos::new(0, 0, 0), state("glowstone")).unwrap();
        let builder = builder(structure);

        let lights = builder.emissive_lights();
        assert_eq!(lights.len(), 1);
        assert_eq!(lights[0].position, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn failing_block_is_skipped() {
        let mut structure = Structure::with_size(2, 1, 1);
        structure.set_block(BlockPos::ZERO, state("stone")).unwrap();
        structure
            .set_block(
                BlockPos::new(1, 0, 0),
                state("oak_slab").with_property("type", "sideways"),
            )
            .unwrap();
        let registry = BlockRegistry::new(vec![
            BlockDescriptor::simple("stone", BlockFlags::OPAQUE).unwrap(),
            BlockDescriptor::simple("oak_slab", BlockFlags::empty()).unwrap(),
        ]);
        let resources = Arc::new(Resources::with_default_models(registry));
        let mut builder =
            ChunkBuilder::new(structure, resources, 16, CpuUploader::new()).unwrap();

        let stats = builder.update_structure_buffers(None);
        assert_eq!(stats.blocks_failed, 1);
        assert_eq!(stats.blocks_visited, 2);
        // The stone keeps all six faces; nothing from the broken slab.
        let meshes = builder.meshes();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].quad_count(), 6);
    }

    #[test]
    fn partial_rebuild_uploads_only_targets() {
        let mut structure = Structure::with_size(48, 1, 1);
        for x in [0, 20, 40] {
            structure.set_block(BlockPos::new(x, 0, 0), state("stone")).unwrap();
        }
        let mut builder = builder(structure);
        assert_eq!(builder.uploader().uploads(), 3);

        let stats = builder.update_structure_buffers(Some(&[ChunkCoord::new(1, 0, 0)]));
        assert_eq!(stats.chunks.len(), 1);
        assert_eq!(stats.blocks_visited, 1);
        assert_eq!(builder.uploader().uploads(), 4);
    }

    #[test]
    fn metrics_written_per_chunk() {
        let mut structure = Structure::new(blockview_world::Bounds::new(
            BlockPos::new(-1, 0, 0),
            BlockPos::new(0, 0, 0),
        ));
        structure.set_block(BlockPos::new(-1, 0, 0), state("stone")).unwrap();
        structure.set_block(BlockPos::new(0, 0, 0), state("stone")).unwrap();
        let mut builder = builder(structure);
        let stats = builder.update_structure_buffers(None);

        let metrics = stats.to_metrics();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].chunk, [-1, 0, 0]);
        assert_eq!(metrics[0].opaque_triangles, 10);

        let path = std::env::temp_dir().join("blockview-builder-metrics.json");
        stats.write_metrics_to_file(&path).expect("metrics write");
        let contents = fs::read_to_string(&path).expect("read metrics");
        assert!(contents.contains("\"opaque_triangles\""));
    }
}
