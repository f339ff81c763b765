#![warn(missing_docs)]
//! Block resource metadata: render flags, default properties, textures and
//! atlas layout.

mod atlas;
mod loader;
mod registry;

pub use atlas::{AtlasEntry, AtlasError, TextureAtlasMetadata, MISSING_TEXTURE};
pub use loader::{registry_from_file, registry_from_str};
pub use registry::{BlockDescriptor, BlockFlags, BlockRegistry, LightEmission};

use blockview_core::{BlockNameError, Properties};
use serde::Deserialize;
use thiserror::Error;

/// Block definition as written in a JSON resource file.
///
/// Every flag defaults to `false`, which is the least-culling reading: an
/// unknown or half-specified block is drawn rather than hidden.
#[derive(Debug, Deserialize)]
pub struct BlockDefinition {
    /// Block name (`namespace:path` or bare path).
    pub name: String,
    /// Fully hides the faces of neighbors touching it.
    #[serde(default)]
    pub opaque: bool,
    /// Routed to the blended transparent pass.
    #[serde(default)]
    pub semi_transparent: bool,
    /// Hides faces shared with another block of the same name.
    #[serde(default)]
    pub self_culling: bool,
    /// Produces no geometry at all (air and friends).
    #[serde(default)]
    pub invisible: bool,
    /// Point-light emission, if the block glows.
    #[serde(default)]
    pub emissive: Option<LightEmission>,
    /// Property values assumed when a placed block omits them.
    #[serde(default)]
    pub default_properties: Properties,
    /// Atlas entry name to use for all faces (defaults to the name's path).
    #[serde(default)]
    pub texture: Option<String>,
    /// Optional per-face textures.
    #[serde(default)]
    pub textures: Option<BlockTextureConfig>,
    /// Multiplicative vertex tint (grass, leaves, water).
    #[serde(default)]
    pub tint: Option<[f32; 3]>,
}

/// Errors emitted while loading resources.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Wrap IO errors when reading resource files.
    #[error("failed to read block resources: {0}")]
    Io(#[from] std::io::Error),
    /// Wrap serde parsing issues.
    #[error("failed to parse block resources: {0}")]
    Parse(#[from] serde_json::Error),
    /// A definition used an invalid block name.
    #[error(transparent)]
    Name(#[from] BlockNameError),
}

/// Parse a JSON array of block definitions.
pub fn load_blocks_from_str(input: &str) -> Result<Vec<BlockDefinition>, AssetError> {
    Ok(serde_json::from_str(input)?)
}

/// Configuration for per-face textures.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BlockTextureConfig {
    /// Apply to all faces when specified.
    pub all: Option<String>,
    /// Apply to the four side faces when specified.
    pub side: Option<String>,
    /// Specific texture for the top face.
    pub top: Option<String>,
    /// Specific texture for the bottom face.
    pub bottom: Option<String>,
    /// Specific texture for the north (-Z) face.
    pub north: Option<String>,
    /// Specific texture for the south (+Z) face.
    pub south: Option<String>,
    /// Specific texture for the east (+X) face.
    pub east: Option<String>,
    /// Specific texture for the west (-X) face.
    pub west: Option<String>,
}
