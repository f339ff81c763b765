//! Block mesh generation.
//!
//! Every block type gets its geometry from a [`MeshProvider`]. A [`ModelSet`]
//! dispatches by block name, falls back to a default provider, and layers an
//! optional block-entity provider on top for blocks that carry extra data.

use std::collections::HashMap;
use std::sync::Arc;

use blockview_assets::{BlockFlags, BlockRegistry, TextureAtlasMetadata};
use blockview_core::{BlockName, CullFlags, Direction, PlacedBlock, Properties};
use glam::Vec3;
use thiserror::Error;

use crate::mesh::{DebugLine, Mesh, MeshVertex, Quad};

/// Alpha applied to semi-transparent blocks.
const TRANSLUCENT_ALPHA: f32 = 0.6;
const OUTLINE_COLOR: [f32; 4] = [1.0, 0.85, 0.2, 1.0];

/// Failure while generating a single block's mesh.
#[derive(Debug, Error)]
pub enum ModelError {
    /// No provider handles this block name.
    #[error("no model registered for block {0}")]
    UnknownBlock(BlockName),
    /// A property value the model does not understand.
    #[error("block {name} has unsupported {key}={value}")]
    InvalidProperty {
        /// Block name.
        name: BlockName,
        /// Property key.
        key: String,
        /// Offending value.
        value: String,
    },
    /// Block-entity data could not be interpreted.
    #[error("block entity data for {name} is invalid: {reason}")]
    BlockEntity {
        /// Block name.
        name: BlockName,
        /// What was wrong with the data.
        reason: String,
    },
}

/// Produces block-local geometry (inside the unit cell) for a block type.
pub trait MeshProvider {
    /// Mesh for `name` with `properties`, omitting faces set in `cull`.
    fn mesh_for(
        &self,
        name: &BlockName,
        properties: &Properties,
        cull: CullFlags,
    ) -> Result<Mesh, ModelError>;
}

/// Extra geometry for blocks that carry block-entity data.
pub trait BlockEntityMeshProvider {
    /// Block-local mesh for `block`; only called when `block.extra` is set.
    fn mesh_for_entity(&self, block: &PlacedBlock, cull: CullFlags) -> Result<Mesh, ModelError>;
}

/// Providers dispatched by block name.
#[derive(Default)]
pub struct ModelSet {
    by_name: HashMap<BlockName, Box<dyn MeshProvider>>,
    fallback: Option<Box<dyn MeshProvider>>,
    block_entities: Option<Box<dyn BlockEntityMeshProvider>>,
}

impl ModelSet {
    /// Empty set; it cannot mesh anything until a provider is added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider for one block name.
    pub fn with_model(mut self, name: BlockName, provider: impl MeshProvider + 'static) -> Self {
        self.by_name.insert(name, Box::new(provider));
        self
    }

    /// Provider used for names without a dedicated model.
    pub fn with_fallback(mut self, provider: impl MeshProvider + 'static) -> Self {
        self.fallback = Some(Box::new(provider));
        self
    }

    /// Provider for block-entity geometry.
    pub fn with_block_entities(mut self, provider: impl BlockEntityMeshProvider + 'static) -> Self {
        self.block_entities = Some(Box::new(provider));
        self
    }

    /// Whether any block-definition provider is registered.
    pub fn has_providers(&self) -> bool {
        !self.by_name.is_empty() || self.fallback.is_some()
    }

    /// Complete mesh for a placed block: definition geometry plus any
    /// block-entity geometry.
    pub fn block_mesh(&self, block: &PlacedBlock, cull: CullFlags) -> Result<Mesh, ModelError> {
        let mut mesh = self.mesh_for(&block.state.name, &block.state.properties, cull)?;
        if block.extra.is_some() {
            if let Some(entities) = &self.block_entities {
                let mut extra = entities.mesh_for_entity(block, cull)?;
                mesh.append(&mut extra);
            }
        }
        Ok(mesh)
    }
}

impl MeshProvider for ModelSet {
    fn mesh_for(
        &self,
        name: &BlockName,
        properties: &Properties,
        cull: CullFlags,
    ) -> Result<Mesh, ModelError> {
        match self.by_name.get(name).or(self.fallback.as_ref()) {
            Some(provider) => provider.mesh_for(name, properties, cull),
            None => Err(ModelError::UnknownBlock(name.clone())),
        }
    }
}

/// Registry and atlas lookups shared by the built-in models.
#[derive(Debug, Clone)]
pub struct BlockAppearance {
    registry: Arc<BlockRegistry>,
    atlas: Arc<TextureAtlasMetadata>,
}

struct FaceStyle {
    uv_rect: [f32; 4],
    color: [f32; 4],
    emissive: f32,
}

impl BlockAppearance {
    /// Wrap shared registry and atlas handles.
    pub fn new(registry: Arc<BlockRegistry>, atlas: Arc<TextureAtlasMetadata>) -> Self {
        Self { registry, atlas }
    }

    fn is_invisible(&self, name: &BlockName) -> bool {
        self.registry.flags(name).contains(BlockFlags::INVISIBLE)
    }

    fn face_style(&self, name: &BlockName, face: Direction) -> FaceStyle {
        let desc = self.registry.descriptor(name);
        let texture = desc.map_or(name.path(), |d| d.texture_for(face));
        let tint = desc.map_or([1.0; 3], |d| d.tint);
        let alpha = if self.registry.flags(name).is_semi_transparent() {
            TRANSLUCENT_ALPHA
        } else {
            1.0
        };
        FaceStyle {
            uv_rect: self.atlas.uv_rect(texture),
            color: [tint[0], tint[1], tint[2], alpha],
            emissive: desc
                .and_then(|d| d.emission)
                .map_or(0.0, |emission| emission.intensity),
        }
    }

    /// Axis-aligned box between `from` and `to` (block-local, 0..=1).
    ///
    /// Faces lying on the cell boundary honor `cull`; inner faces are always
    /// emitted.
    pub fn box_mesh(&self, name: &BlockName, from: Vec3, to: Vec3, cull: CullFlags) -> Mesh {
        let mut mesh = Mesh::new();
        for face in Direction::ALL {
            if on_cell_boundary(face, from, to) && cull.culls(face) {
                continue;
            }
            let style = self.face_style(name, face);
            let corners = face_corners(face, from, to);
            let vertices = corners.map(|corner| {
                let (u, v) = local_uv(face, corner);
                MeshVertex {
                    position: corner.to_array(),
                    normal: face.normal(),
                    uv: [
                        style.uv_rect[0] + u * (style.uv_rect[2] - style.uv_rect[0]),
                        style.uv_rect[1] + v * (style.uv_rect[3] - style.uv_rect[1]),
                    ],
                    uv_rect: style.uv_rect,
                    color: style.color,
                    block_pos: [0.0; 3],
                    emissive: style.emissive,
                }
            });
            mesh.push_quad(Quad { vertices });
        }
        mesh
    }
}

fn on_cell_boundary(face: Direction, from: Vec3, to: Vec3) -> bool {
    match face {
        Direction::Down => from.y <= 0.0,
        Direction::Up => to.y >= 1.0,
        Direction::North => from.z <= 0.0,
        Direction::South => to.z >= 1.0,
        Direction::West => from.x <= 0.0,
        Direction::East => to.x >= 1.0,
    }
}

/// Corners in counter-clockwise order seen from outside the box.
fn face_corners(face: Direction, a: Vec3, b: Vec3) -> [Vec3; 4] {
    match face {
        Direction::Up => [
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, b.y, a.z),
        ],
        Direction::Down => [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, a.y, b.z),
        ],
        Direction::North => [
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
        ],
        Direction::South => [
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(a.x, b.y, b.z),
        ],
        Direction::West => [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(a.x, b.y, a.z),
        ],
        Direction::East => [
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(b.x, b.y, b.z),
        ],
    }
}

fn local_uv(face: Direction, corner: Vec3) -> (f32, f32) {
    match face {
        Direction::Up | Direction::Down => (corner.x, corner.z),
        Direction::North | Direction::South => (corner.x, 1.0 - corner.y),
        Direction::West | Direction::East => (corner.z, 1.0 - corner.y),
    }
}

/// Full unit cube textured from the registry.
#[derive(Debug, Clone)]
pub struct CubeModel {
    appearance: BlockAppearance,
}

impl CubeModel {
    /// Cube model drawing with `appearance`.
    pub fn new(appearance: BlockAppearance) -> Self {
        Self { appearance }
    }
}

impl MeshProvider for CubeModel {
    fn mesh_for(
        &self,
        name: &BlockName,
        _properties: &Properties,
        cull: CullFlags,
    ) -> Result<Mesh, ModelError> {
        if self.appearance.is_invisible(name) {
            return Ok(Mesh::new());
        }
        Ok(self.appearance.box_mesh(name, Vec3::ZERO, Vec3::ONE, cull))
    }
}

/// Fixed sub-cell box (torches, carpets and similar).
#[derive(Debug, Clone)]
pub struct BoxModel {
    appearance: BlockAppearance,
    from: Vec3,
    to: Vec3,
}

impl BoxModel {
    /// Box spanning `from..to` inside the unit cell.
    pub fn new(appearance: BlockAppearance, from: Vec3, to: Vec3) -> Self {
        Self {
            appearance,
            from: from.min(to).clamp(Vec3::ZERO, Vec3::ONE),
            to: from.max(to).clamp(Vec3::ZERO, Vec3::ONE),
        }
    }
}

impl MeshProvider for BoxModel {
    fn mesh_for(
        &self,
        name: &BlockName,
        _properties: &Properties,
        cull: CullFlags,
    ) -> Result<Mesh, ModelError> {
        Ok(self.appearance.box_mesh(name, self.from, self.to, cull))
    }
}

/// Half-height slab driven by the `type` property (`bottom`, `top`, `double`).
#[derive(Debug, Clone)]
pub struct SlabModel {
    appearance: BlockAppearance,
}

impl SlabModel {
    /// Slab model drawing with `appearance`.
    pub fn new(appearance: BlockAppearance) -> Self {
        Self { appearance }
    }
}

impl MeshProvider for SlabModel {
    fn mesh_for(
        &self,
        name: &BlockName,
        properties: &Properties,
        cull: CullFlags,
    ) -> Result<Mesh, ModelError> {
        let kind = properties.get("type").map_or("bottom", String::as_str);
        let (from, to) = match kind {
            "bottom" => (Vec3::ZERO, Vec3::new(1.0, 0.5, 1.0)),
            "top" => (Vec3::new(0.0, 0.5, 0.0), Vec3::ONE),
            "double" => (Vec3::ZERO, Vec3::ONE),
            other => {
                return Err(ModelError::InvalidProperty {
                    name: name.clone(),
                    key: "type".into(),
                    value: other.into(),
                })
            }
        };
        Ok(self.appearance.box_mesh(name, from, to, cull))
    }
}

/// Outlines blocks that carry block-entity data.
///
/// An `outline` entry of `[r, g, b]` in the extra data overrides the color.
#[derive(Debug, Clone, Default)]
pub struct BlockEntityOutline;

impl BlockEntityMeshProvider for BlockEntityOutline {
    fn mesh_for_entity(&self, block: &PlacedBlock, _cull: CullFlags) -> Result<Mesh, ModelError> {
        let color = match block.extra.as_ref().and_then(|extra| extra.get("outline")) {
            None => OUTLINE_COLOR,
            Some(value) => parse_rgb(value).ok_or_else(|| ModelError::BlockEntity {
                name: block.state.name.clone(),
                reason: format!("outline must be [r, g, b], got {value}"),
            })?,
        };

        let mut mesh = Mesh::new();
        for (from, to) in cube_edges(Vec3::splat(-0.002), Vec3::splat(1.002)) {
            mesh.push_line(DebugLine {
                from: from.to_array(),
                to: to.to_array(),
                color,
            });
        }
        Ok(mesh)
    }
}

fn parse_rgb(value: &serde_json::Value) -> Option<[f32; 4]> {
    let items = value.as_array()?;
    if items.len() != 3 {
        return None;
    }
    let mut rgb = [0.0; 3];
    for (slot, item) in rgb.iter_mut().zip(items) {
        *slot = item.as_f64()? as f32;
    }
    Some([rgb[0], rgb[1], rgb[2], 1.0])
}

/// The twelve edges of the cube `lo..hi`.
pub(crate) fn cube_edges(lo: Vec3, hi: Vec3) -> [(Vec3, Vec3); 12] {
    let c = |x: bool, y: bool, z: bool| {
        Vec3::new(
            if x { hi.x } else { lo.x },
            if y { hi.y } else { lo.y },
            if z { hi.z } else { lo.z },
        )
    };
    [
        (c(false, false, false), c(true, false, false)),
        (c(true, false, false), c(true, false, true)),
        (c(true, false, true), c(false, false, true)),
        (c(false, false, true), c(false, false, false)),
        (c(false, true, false), c(true, true, false)),
        (c(true, true, false), c(true, true, true)),
        (c(true, true, true), c(false, true, true)),
        (c(false, true, true), c(false, true, false)),
        (c(false, false, false), c(false, true, false)),
        (c(true, false, false), c(true, true, false)),
        (c(true, false, true), c(true, true, true)),
        (c(false, false, true), c(false, true, true)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockview_assets::{BlockDescriptor, LightEmission};
    use blockview_core::{BlockPos, BlockState};

    fn name(s: &str) -> BlockName {
        BlockName::parse(s).unwrap()
    }

    fn appearance() -> BlockAppearance {
        let registry = BlockRegistry::new(vec![
            BlockDescriptor::simple("air", BlockFlags::INVISIBLE).unwrap(),
            BlockDescriptor::simple("stone", BlockFlags::OPAQUE).unwrap(),
            BlockDescriptor::simple("glass", BlockFlags::SEMI_TRANSPARENT).unwrap(),
            BlockDescriptor::simple("glowstone", BlockFlags::OPAQUE)
                .unwrap()
                .with_emission(LightEmission {
                    color: [1.0, 1.0, 1.0],
                    intensity: 3.0,
                }),
        ]);
        let atlas = TextureAtlasMetadata::for_registry(&registry, 16, 1);
        BlockAppearance::new(Arc::new(registry), Arc::new(atlas))
    }

    #[test]
    fn cube_drops_culled_faces() {
        let cube = CubeModel::new(appearance());
        let full = cube
            .mesh_for(&name("stone"), &Properties::new(), CullFlags::empty())
            .unwrap();
        assert_eq!(full.quad_count(), 6);

        let culled = cube
            .mesh_for(&name("stone"), &Properties::new(), CullFlags::UP | CullFlags::EAST)
            .unwrap();
        assert_eq!(culled.quad_count(), 4);
        assert!(culled
            .quads
            .iter()
            .all(|q| q.vertices[0].normal != [0.0, 1.0, 0.0]));
    }

    #[test]
    fn cube_winding_matches_face_normals() {
        let mesh = CubeModel::new(appearance())
            .mesh_for(&name("stone"), &Properties::new(), CullFlags::empty())
            .unwrap();
        for quad in &mesh.quads {
            let winding = quad.face_normal().unwrap().to_array();
            assert_eq!(winding, quad.vertices[0].normal);
        }
    }

    #[test]
    fn invisible_blocks_have_no_geometry() {
        let mesh = CubeModel::new(appearance())
            .mesh_for(&BlockName::air(), &Properties::new(), CullFlags::empty())
            .unwrap();
        assert!(mesh.is_empty());
    }

    #[test]
    fn style_reflects_flags() {
        let cube = CubeModel::new(appearance());
        let glass = cube
            .mesh_for(&name("glass"), &Properties::new(), CullFlags::empty())
            .unwrap();
        assert_eq!(glass.quads[0].vertices[0].color[3], TRANSLUCENT_ALPHA);
        let glow = cube
            .mesh_for(&name("glowstone"), &Properties::new(), CullFlags::empty())
            .unwrap();
        assert_eq!(glow.quads[0].vertices[0].emissive, 3.0);
    }

    #[test]
    fn slab_inner_face_survives_culling() {
        let slab = SlabModel::new(appearance());
        let mesh = slab
            .mesh_for(&name("stone"), &Properties::new(), CullFlags::all())
            .unwrap();
        // Only the top face at y=0.5 is off the cell boundary.
        assert_eq!(mesh.quad_count(), 1);
        assert_eq!(mesh.quads[0].vertices[0].position[1], 0.5);
    }

    #[test]
    fn slab_rejects_unknown_type() {
        let mut props = Properties::new();
        props.insert("type".into(), "sideways".into());
        let err = SlabModel::new(appearance())
            .mesh_for(&name("stone"), &props, CullFlags::empty())
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidProperty { .. }));
    }

    #[test]
    fn model_set_dispatches_by_name() {
        let appearance = appearance();
        let set = ModelSet::new()
            .with_model(name("stone"), SlabModel::new(appearance.clone()));
        assert!(set.has_providers());
        let slab = set
            .mesh_for(&name("stone"), &Properties::new(), CullFlags::empty())
            .unwrap();
        assert_eq!(slab.quad_count(), 6);
        let err = set
            .mesh_for(&name("glass"), &Properties::new(), CullFlags::empty())
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownBlock(_)));

        let set = set.with_fallback(CubeModel::new(appearance));
        assert!(set
            .mesh_for(&name("glass"), &Properties::new(), CullFlags::empty())
            .is_ok());
    }

    #[test]
    fn block_entities_add_outline() {
        let set = ModelSet::new()
            .with_fallback(CubeModel::new(appearance()))
            .with_block_entities(BlockEntityOutline);
        let plain = PlacedBlock::new(BlockPos::ZERO, BlockState::new(name("stone")));
        assert!(set.block_mesh(&plain, CullFlags::empty()).unwrap().lines.is_empty());

        let chest = plain
            .clone()
            .with_extra(serde_json::json!({ "outline": [0.0, 1.0, 0.0] }));
        let mesh = set.block_mesh(&chest, CullFlags::empty()).unwrap();
        assert_eq!(mesh.lines.len(), 12);
        assert_eq!(mesh.lines[0].color, [0.0, 1.0, 0.0, 1.0]);

        let broken = plain.with_extra(serde_json::json!({ "outline": "green" }));
        assert!(matches!(
            set.block_mesh(&broken, CullFlags::empty()),
            Err(ModelError::BlockEntity { .. })
        ));
    }
}
