use std::sync::Arc;

use blockview_assets::{BlockFlags, BlockRegistry, LightEmission, TextureAtlasMetadata};
use blockview_core::{BlockName, BlockState, Properties};
use glam::Vec3;

use crate::model::{BlockAppearance, BlockEntityOutline, BoxModel, CubeModel, ModelSet, SlabModel};

/// Atlas tile size used when the atlas is derived from the registry.
pub const DEFAULT_TILE_SIZE: u32 = 16;

/// Read-only block metadata and mesh providers consumed by the builder.
pub struct Resources {
    registry: Arc<BlockRegistry>,
    atlas: Arc<TextureAtlasMetadata>,
    models: ModelSet,
}

impl Resources {
    /// Bundle an explicit registry, atlas and model set.
    pub fn new(
        registry: Arc<BlockRegistry>,
        atlas: Arc<TextureAtlasMetadata>,
        models: ModelSet,
    ) -> Self {
        Self {
            registry,
            atlas,
            models,
        }
    }

    /// Built-in models for every registered block: cubes by default, slab
    /// shapes for `*_slab`, thin boxes for torches, and outlines for blocks
    /// carrying block-entity data.
    pub fn with_default_models(registry: BlockRegistry) -> Self {
        let atlas = TextureAtlasMetadata::for_registry(&registry, DEFAULT_TILE_SIZE, 1);
        let registry = Arc::new(registry);
        let atlas = Arc::new(atlas);
        let appearance = BlockAppearance::new(registry.clone(), atlas.clone());

        let mut models = ModelSet::new()
            .with_fallback(CubeModel::new(appearance.clone()))
            .with_block_entities(BlockEntityOutline);
        for desc in registry.iter() {
            let path = desc.name.path();
            if path.ends_with("_slab") {
                models = models.with_model(desc.name.clone(), SlabModel::new(appearance.clone()));
            } else if path.ends_with("torch") {
                let torch = BoxModel::new(
                    appearance.clone(),
                    Vec3::new(7.0, 0.0, 7.0) / 16.0,
                    Vec3::new(9.0, 10.0, 9.0) / 16.0,
                );
                models = models.with_model(desc.name.clone(), torch);
            }
        }

        Self::new(registry, atlas, models)
    }

    /// Block registry.
    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Atlas layout referenced by vertex UVs.
    pub fn atlas(&self) -> &TextureAtlasMetadata {
        &self.atlas
    }

    /// Mesh providers.
    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    /// Render flags; unknown names get none.
    pub fn flags(&self, name: &BlockName) -> BlockFlags {
        self.registry.flags(name)
    }

    /// Properties of `state` with registry defaults underneath.
    pub fn merged_properties(&self, state: &BlockState) -> Properties {
        match self.registry.default_properties(&state.name) {
            Some(defaults) => state.merged_properties(defaults),
            None => state.properties.clone(),
        }
    }

    /// Emission for `name`, if it is flagged emissive.
    pub fn emission(&self, name: &BlockName) -> Option<LightEmission> {
        let desc = self.registry.descriptor(name)?;
        if !desc.flags.contains(BlockFlags::EMISSIVE) {
            return None;
        }
        Some(desc.emission.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockview_core::{CullFlags, PlacedBlock, BlockPos};
    use crate::model::MeshProvider;

    fn name(s: &str) -> BlockName {
        BlockName::parse(s).unwrap()
    }

    #[test]
    fn defaults_merge_under_explicit_properties() {
        let resources = Resources::with_default_models(BlockRegistry::builtin());
        let state = BlockState::new(name("oak_leaves")).with_property("waterlogged", "true");
        let merged = resources.merged_properties(&state);
        assert_eq!(merged.get("waterlogged").map(String::as_str), Some("true"));
        assert_eq!(merged.get("persistent").map(String::as_str), Some("false"));
    }

    #[test]
    fn default_models_pick_shapes() {
        let resources = Resources::with_default_models(BlockRegistry::builtin());
        let slab = resources
            .models()
            .mesh_for(&name("oak_slab"), &Properties::new(), CullFlags::empty())
            .unwrap();
        let top = slab
            .quads
            .iter()
            .map(|q| q.vertices[0].position[1])
            .fold(0.0f32, f32::max);
        assert_eq!(top, 0.5);

        let torch = PlacedBlock::new(BlockPos::ZERO, BlockState::new(name("torch")));
        let mesh = resources.models().block_mesh(&torch, CullFlags::all()).unwrap();
        // Only the bottom face touches the cell boundary.
        assert_eq!(mesh.quad_count(), 5);
    }

    #[test]
    fn emission_requires_flag() {
        let resources = Resources::with_default_models(BlockRegistry::builtin());
        assert!(resources.emission(&name("glowstone")).is_some());
        assert!(resources.emission(&name("stone")).is_none());
        assert!(resources.emission(&name("unknown")).is_none());
    }
}
