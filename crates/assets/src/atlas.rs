use std::{collections::BTreeSet, fs, path::Path};

use blockview_core::Direction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::BlockRegistry;

/// Entry name reserved for the placeholder tile.
pub const MISSING_TEXTURE: &str = "missing";

/// Errors that can occur while loading or validating atlas metadata.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// Wrap IO failures when reading metadata files.
    #[error("failed to read atlas metadata: {0}")]
    Io(#[from] std::io::Error),
    /// Wrap JSON parsing issues.
    #[error("failed to parse atlas metadata: {0}")]
    Parse(#[from] serde_json::Error),
    /// Metadata is internally inconsistent.
    #[error("invalid atlas metadata: {0}")]
    Invalid(String),
}

/// One tile of the atlas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasEntry {
    /// Texture name referenced by block descriptors.
    pub name: String,
    /// Grid column.
    pub column: u32,
    /// Grid row.
    pub row: u32,
    /// Normalized `[u0, v0, u1, v1]`, inset by the padding.
    pub uv: [f32; 4],
}

/// Grid layout of square tiles in a single texture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureAtlasMetadata {
    /// Tile size in pixels.
    pub tile_size: u32,
    /// Padding around each tile in pixels.
    pub padding: u32,
    /// Number of columns in the atlas grid.
    pub columns: u32,
    /// Number of rows in the atlas grid.
    pub rows: u32,
    /// Tiles in slot order. Slot 0 is always [`MISSING_TEXTURE`].
    pub entries: Vec<AtlasEntry>,
}

impl TextureAtlasMetadata {
    /// Lay `names` out on a near-square grid, after the placeholder tile.
    /// Duplicate names share one slot.
    pub fn grid<I, S>(tile_size: u32, padding: u32, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = vec![MISSING_TEXTURE.to_string()];
        for name in names {
            let name = name.into();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }

        let count = unique.len() as u32;
        let columns = (count as f32).sqrt().ceil().max(1.0) as u32;
        let rows = count.div_ceil(columns);

        let mut atlas = Self {
            tile_size: tile_size.max(1),
            padding,
            columns,
            rows,
            entries: Vec::with_capacity(unique.len()),
        };
        for (slot, name) in unique.into_iter().enumerate() {
            let slot = slot as u32;
            let (column, row) = (slot % columns, slot / columns);
            let uv = atlas.cell_uv(column, row);
            atlas.entries.push(AtlasEntry {
                name,
                column,
                row,
                uv,
            });
        }
        atlas
    }

    /// Atlas covering every face texture named by `registry`.
    pub fn for_registry(registry: &BlockRegistry, tile_size: u32, padding: u32) -> Self {
        let names: BTreeSet<&str> = registry
            .iter()
            .flat_map(|desc| Direction::ALL.map(|face| desc.texture_for(face)))
            .collect();
        Self::grid(tile_size, padding, names)
    }

    /// Parse metadata from a JSON string and validate contents.
    pub fn parse_str(input: &str) -> Result<Self, AtlasError> {
        let metadata: TextureAtlasMetadata = serde_json::from_str(input)?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Load metadata from a file on disk.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, AtlasError> {
        let data = fs::read_to_string(path)?;
        Self::parse_str(&data)
    }

    /// Width of the atlas image in pixels.
    pub fn atlas_width(&self) -> u32 {
        self.columns * self.stride()
    }

    /// Height of the atlas image in pixels.
    pub fn atlas_height(&self) -> u32 {
        self.rows * self.stride()
    }

    /// Check grid dimensions, slot placement and name uniqueness.
    pub fn validate(&self) -> Result<(), AtlasError> {
        if self.tile_size == 0 {
            return Err(AtlasError::Invalid("tile_size must be > 0".into()));
        }
        if self.columns == 0 || self.rows == 0 {
            return Err(AtlasError::Invalid(
                "columns and rows must be greater than zero".into(),
            ));
        }
        let mut seen = BTreeSet::new();
        for entry in &self.entries {
            if entry.column >= self.columns || entry.row >= self.rows {
                return Err(AtlasError::Invalid(format!(
                    "entry {} sits outside the {}x{} grid",
                    entry.name, self.columns, self.rows
                )));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(AtlasError::Invalid(format!(
                    "duplicate atlas entry '{}'",
                    entry.name
                )));
            }
        }
        Ok(())
    }

    /// Lookup a texture entry by name.
    pub fn entry(&self, name: &str) -> Option<&AtlasEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// UV clamp rect for `name`, falling back to the placeholder tile.
    pub fn uv_rect(&self, name: &str) -> [f32; 4] {
        self.entry(name)
            .or_else(|| self.entry(MISSING_TEXTURE))
            .map(|entry| entry.uv)
            .unwrap_or([0.0, 0.0, 1.0, 1.0])
    }

    fn stride(&self) -> u32 {
        self.tile_size + self.padding * 2
    }

    fn cell_uv(&self, column: u32, row: u32) -> [f32; 4] {
        let width = self.atlas_width() as f32;
        let height = self.atlas_height() as f32;
        let x0 = (column * self.stride() + self.padding) as f32;
        let y0 = (row * self.stride() + self.padding) as f32;
        let size = self.tile_size as f32;
        [x0 / width, y0 / height, (x0 + size) / width, (y0 + size) / height]
    }
}
