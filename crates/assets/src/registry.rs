use std::collections::HashMap;

use blockview_core::{BlockName, Direction, Properties};
use serde::{Deserialize, Serialize};

use crate::{AssetError, BlockDefinition, BlockTextureConfig};

bitflags::bitflags! {
    /// Render-relevant block flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BlockFlags: u8 {
        const OPAQUE = 0b0000_0001;
        const SEMI_TRANSPARENT = 0b0000_0010;
        const SELF_CULLING = 0b0000_0100;
        const EMISSIVE = 0b0000_1000;
        const INVISIBLE = 0b0001_0000;
    }
}

impl BlockFlags {
    /// Whether neighbors touching this block hide their shared face.
    pub fn is_opaque(self) -> bool {
        self.contains(BlockFlags::OPAQUE)
    }

    /// Whether geometry belongs to the transparent pass.
    pub fn is_semi_transparent(self) -> bool {
        self.contains(BlockFlags::SEMI_TRANSPARENT)
    }

    /// Whether identical neighbors hide their shared face.
    pub fn is_self_culling(self) -> bool {
        self.contains(BlockFlags::SELF_CULLING)
    }
}

/// Point-light emission for glowing blocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightEmission {
    /// Linear RGB color.
    #[serde(default = "LightEmission::default_color")]
    pub color: [f32; 3],
    /// Scalar intensity multiplier.
    #[serde(default = "LightEmission::default_intensity")]
    pub intensity: f32,
}

impl LightEmission {
    fn default_color() -> [f32; 3] {
        [1.0, 0.85, 0.6]
    }

    fn default_intensity() -> f32 {
        1.0
    }
}

impl Default for LightEmission {
    fn default() -> Self {
        Self {
            color: Self::default_color(),
            intensity: Self::default_intensity(),
        }
    }
}

/// Resolved block metadata.
#[derive(Debug, Clone)]
pub struct BlockDescriptor {
    /// Block name.
    pub name: BlockName,
    /// Render flags.
    pub flags: BlockFlags,
    /// Defaults merged under placed-block properties.
    pub default_properties: Properties,
    /// Emission, present iff `flags` contains `EMISSIVE`.
    pub emission: Option<LightEmission>,
    /// Vertex tint applied by the cube model.
    pub tint: [f32; 3],
    textures: BlockTextures,
}

impl BlockDescriptor {
    /// Resolve the atlas entry for a face.
    pub fn texture_for(&self, face: Direction) -> &str {
        self.textures.texture_for(face)
    }

    /// Construct a descriptor from its JSON definition.
    pub fn from_definition(def: BlockDefinition) -> Result<Self, AssetError> {
        let name = BlockName::parse(&def.name)?;
        let base_texture = def.texture.unwrap_or_else(|| name.path().to_string());
        let textures = BlockTextures::from_config(&base_texture, def.textures);

        let mut flags = BlockFlags::empty();
        flags.set(BlockFlags::OPAQUE, def.opaque);
        flags.set(BlockFlags::SEMI_TRANSPARENT, def.semi_transparent);
        flags.set(BlockFlags::SELF_CULLING, def.self_culling);
        flags.set(BlockFlags::INVISIBLE, def.invisible);
        flags.set(BlockFlags::EMISSIVE, def.emissive.is_some());

        Ok(Self {
            name,
            flags,
            default_properties: def.default_properties,
            emission: def.emissive,
            tint: def.tint.unwrap_or([1.0, 1.0, 1.0]),
            textures,
        })
    }

    /// Helper for tests and built-ins: a descriptor with the given flags.
    pub fn simple(name: &str, flags: BlockFlags) -> Result<Self, AssetError> {
        let name = BlockName::parse(name)?;
        let emission = flags
            .contains(BlockFlags::EMISSIVE)
            .then(LightEmission::default);
        Ok(Self {
            textures: BlockTextures::uniform(name.path()),
            name,
            flags,
            default_properties: Properties::new(),
            emission,
            tint: [1.0, 1.0, 1.0],
        })
    }

    /// Builder-style default property.
    pub fn with_default(mut self, key: &str, value: &str) -> Self {
        self.default_properties
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Builder-style emission override; also sets the `EMISSIVE` flag.
    pub fn with_emission(mut self, emission: LightEmission) -> Self {
        self.flags.insert(BlockFlags::EMISSIVE);
        self.emission = Some(emission);
        self
    }
}

/// Block metadata keyed by name.
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    descriptors: Vec<BlockDescriptor>,
    by_name: HashMap<BlockName, usize>,
}

impl BlockRegistry {
    /// Construct a registry; later descriptors replace earlier ones of the same name.
    pub fn new(descriptors: Vec<BlockDescriptor>) -> Self {
        let mut registry = Self::default();
        for desc in descriptors {
            registry.insert(desc);
        }
        registry
    }

    /// Add or replace a descriptor.
    pub fn insert(&mut self, desc: BlockDescriptor) {
        match self.by_name.get(&desc.name) {
            Some(&idx) => self.descriptors[idx] = desc,
            None => {
                self.by_name.insert(desc.name.clone(), self.descriptors.len());
                self.descriptors.push(desc);
            }
        }
    }

    /// Look up a descriptor by name.
    pub fn descriptor(&self, name: &BlockName) -> Option<&BlockDescriptor> {
        self.by_name.get(name).map(|&idx| &self.descriptors[idx])
    }

    /// Flags for `name`.
    ///
    /// Unknown blocks get no flags, so their faces are always drawn. Air is
    /// the exception: it is invisible even when the registry omits it.
    pub fn flags(&self, name: &BlockName) -> BlockFlags {
        match self.descriptor(name) {
            Some(desc) => desc.flags,
            None if name.is_air() => BlockFlags::INVISIBLE,
            None => BlockFlags::empty(),
        }
    }

    /// Default properties for `name` (empty when unknown).
    pub fn default_properties(&self, name: &BlockName) -> Option<&Properties> {
        self.descriptor(name).map(|desc| &desc.default_properties)
    }

    /// Iterate descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockDescriptor> {
        self.descriptors.iter()
    }

    /// Number of registered blocks.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Small built-in palette used when no resource file is supplied.
    pub fn builtin() -> Self {
        const BUILTIN: &str = include_str!("builtin_blocks.json");
        match crate::registry_from_str(BUILTIN) {
            Ok(registry) => registry,
            Err(err) => {
                tracing::warn!(%err, "built-in block table failed to load");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone)]
struct BlockTextures {
    up: String,
    down: String,
    north: String,
    south: String,
    east: String,
    west: String,
}

impl BlockTextures {
    fn uniform(name: &str) -> Self {
        Self {
            up: name.to_string(),
            down: name.to_string(),
            north: name.to_string(),
            south: name.to_string(),
            east: name.to_string(),
            west: name.to_string(),
        }
    }

    fn from_config(base: &str, config: Option<BlockTextureConfig>) -> Self {
        let mut textures = Self::uniform(base);
        let Some(cfg) = config else {
            return textures;
        };
        if let Some(all) = cfg.all {
            textures = Self::uniform(&all);
        }
        if let Some(side) = cfg.side {
            textures.north = side.clone();
            textures.south = side.clone();
            textures.east = side.clone();
            textures.west = side;
        }
        let overrides = [
            (cfg.top, &mut textures.up),
            (cfg.bottom, &mut textures.down),
            (cfg.north, &mut textures.north),
            (cfg.south, &mut textures.south),
            (cfg.east, &mut textures.east),
            (cfg.west, &mut textures.west),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value;
            }
        }
        textures
    }

    fn texture_for(&self, face: Direction) -> &str {
        match face {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
            Direction::North => &self.north,
            Direction::South => &self.south,
            Direction::East => &self.east,
            Direction::West => &self.west,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> BlockName {
        BlockName::parse(s).unwrap()
    }

    #[test]
    fn unknown_blocks_have_no_flags() {
        let registry = BlockRegistry::new(vec![
            BlockDescriptor::simple("stone", BlockFlags::OPAQUE | BlockFlags::SELF_CULLING)
                .unwrap(),
        ]);
        assert!(registry.flags(&name("stone")).is_opaque());
        assert_eq!(registry.flags(&name("mystery")), BlockFlags::empty());
        assert!(registry.default_properties(&name("mystery")).is_none());
    }

    #[test]
    fn air_is_invisible_even_when_unregistered() {
        let registry = BlockRegistry::default();
        assert_eq!(registry.flags(&BlockName::air()), BlockFlags::INVISIBLE);
    }

    #[test]
    fn later_descriptor_replaces_earlier() {
        let registry = BlockRegistry::new(vec![
            BlockDescriptor::simple("glass", BlockFlags::OPAQUE).unwrap(),
            BlockDescriptor::simple("minecraft:glass", BlockFlags::SEMI_TRANSPARENT).unwrap(),
        ]);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.flags(&name("glass")),
            BlockFlags::SEMI_TRANSPARENT
        );
    }

    #[test]
    fn face_textures_resolve_overrides() {
        let def = BlockDefinition {
            name: "grass_block".into(),
            opaque: true,
            semi_transparent: false,
            self_culling: true,
            invisible: false,
            emissive: None,
            default_properties: Properties::new(),
            texture: None,
            textures: Some(BlockTextureConfig {
                side: Some("grass_block_side".into()),
                top: Some("grass_block_top".into()),
                bottom: Some("dirt".into()),
                ..Default::default()
            }),
            tint: None,
        };
        let desc = BlockDescriptor::from_definition(def).unwrap();
        assert_eq!(desc.texture_for(Direction::Up), "grass_block_top");
        assert_eq!(desc.texture_for(Direction::Down), "dirt");
        assert_eq!(desc.texture_for(Direction::East), "grass_block_side");
    }

    #[test]
    fn builtin_table_loads() {
        let registry = BlockRegistry::builtin();
        assert!(!registry.is_empty());
        assert!(registry.flags(&name("stone")).is_opaque());
        assert!(registry.flags(&name("glass")).is_semi_transparent());
        assert!(registry.flags(&name("glowstone")).contains(BlockFlags::EMISSIVE));
    }
}
