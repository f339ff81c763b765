//! ASCII volume templates.
//!
//! `layers[y][z]` is a string whose bytes are the X row, so a small structure
//! can be written inline:
//!
//! ```ignore
//! let layers: &[&[&str]] = &[&["sg", "s."]];
//! ```

use blockview_core::{BlockPos, BlockState};

use crate::{Bounds, Structure};

/// Rotation about the Y axis applied when placing a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YRotation {
    /// No rotation.
    #[default]
    R0,
    /// Quarter turn.
    R90,
    /// Half turn.
    R180,
    /// Three-quarter turn.
    R270,
}

impl YRotation {
    /// Footprint after rotation.
    pub const fn rotated_size_xz(self, size_x: usize, size_z: usize) -> (usize, usize) {
        match self {
            Self::R0 | Self::R180 => (size_x, size_z),
            Self::R90 | Self::R270 => (size_z, size_x),
        }
    }

    /// Map a template cell to its rotated cell.
    pub const fn rotate_xz(self, x: usize, z: usize, size_x: usize, size_z: usize) -> (usize, usize) {
        match self {
            Self::R0 => (x, z),
            Self::R90 => (size_z - 1 - z, x),
            Self::R180 => (size_x - 1 - x, size_z - 1 - z),
            Self::R270 => (z, size_x - 1 - x),
        }
    }
}

impl Structure {
    /// Build a structure sized exactly to an ASCII template.
    ///
    /// The palette returns `None` for cells that should stay empty. Ragged
    /// layers are padded with empty cells.
    pub fn from_layers(
        layers: &[&[&str]],
        palette: impl FnMut(u8) -> Option<BlockState>,
    ) -> Structure {
        let size_y = layers.len();
        let size_z = layers.iter().map(|layer| layer.len()).max().unwrap_or(0);
        let size_x = layers
            .iter()
            .flat_map(|layer| layer.iter().map(|row| row.len()))
            .max()
            .unwrap_or(0);

        let mut structure = Structure::with_size(size_x as u32, size_y as u32, size_z as u32);
        structure.place_layers(BlockPos::ZERO, YRotation::R0, layers, palette);
        structure
    }

    /// Stamp an ASCII template with its minimum corner at `origin`.
    ///
    /// Cells landing outside the structure are dropped. Returns the number of
    /// blocks written.
    pub fn place_layers(
        &mut self,
        origin: BlockPos,
        rotation: YRotation,
        layers: &[&[&str]],
        mut palette: impl FnMut(u8) -> Option<BlockState>,
    ) -> usize {
        let size_z = layers.iter().map(|layer| layer.len()).max().unwrap_or(0);
        let size_x = layers
            .iter()
            .flat_map(|layer| layer.iter().map(|row| row.len()))
            .max()
            .unwrap_or(0);
        if size_x == 0 || size_z == 0 {
            return 0;
        }

        let bounds: Bounds = self.structure_bounds();
        let mut written = 0;
        let mut clipped = 0;

        for (dy, layer) in layers.iter().enumerate() {
            for (z, row) in layer.iter().enumerate() {
                for (x, byte) in row.bytes().enumerate() {
                    let Some(state) = palette(byte) else {
                        continue;
                    };

                    let (rx, rz) = rotation.rotate_xz(x, z, size_x, size_z);
                    let pos = BlockPos::new(
                        origin.x + rx as i32,
                        origin.y + dy as i32,
                        origin.z + rz as i32,
                    );
                    if !bounds.contains(pos) {
                        clipped += 1;
                        continue;
                    }
                    if self.set_block(pos, state).is_ok() {
                        written += 1;
                    }
                }
            }
        }

        if clipped > 0 {
            tracing::warn!(clipped, %origin, "template cells fell outside the structure");
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockSource;
    use blockview_core::BlockName;

    fn palette(byte: u8) -> Option<BlockState> {
        let name = match byte {
            b'a' => "andesite",
            b'b' => "basalt",
            b'c' => "calcite",
            b'd' => "diorite",
            _ => return None,
        };
        Some(BlockState::new(BlockName::parse(name).unwrap()))
    }

    fn name_at(structure: &Structure, x: i32, y: i32, z: i32) -> String {
        structure
            .lookup(BlockPos::new(x, y, z))
            .block()
            .map(|b| b.state.name.path().to_string())
            .unwrap_or_default()
    }

    #[test]
    fn from_layers_sizes_to_template() {
        let layers: &[&[&str]] = &[&["ab", "c."], &["d"]];
        let structure = Structure::from_layers(layers, palette);
        assert_eq!(structure.structure_bounds().size(), [2, 2, 2]);
        assert_eq!(structure.len(), 4);
        assert_eq!(name_at(&structure, 1, 0, 0), "basalt");
        assert_eq!(name_at(&structure, 0, 1, 0), "diorite");
        assert!(structure.get(BlockPos::new(1, 0, 1)).is_none());
    }

    #[test]
    fn rotation_maps_expected_positions() {
        // z=0: a b
        // z=1: c d
        // rotated a quarter turn:
        // z=0: c a
        // z=1: d b
        let layers: &[&[&str]] = &[&["ab", "cd"]];
        let mut structure = Structure::with_size(2, 1, 2);
        let written = structure.place_layers(BlockPos::ZERO, YRotation::R90, layers, palette);
        assert_eq!(written, 4);
        assert_eq!(name_at(&structure, 0, 0, 0), "calcite");
        assert_eq!(name_at(&structure, 1, 0, 0), "andesite");
        assert_eq!(name_at(&structure, 0, 0, 1), "diorite");
        assert_eq!(name_at(&structure, 1, 0, 1), "basalt");
    }

    #[test]
    fn cells_outside_structure_are_dropped() {
        let layers: &[&[&str]] = &[&["aaa"]];
        let mut structure = Structure::with_size(2, 1, 1);
        let written = structure.place_layers(BlockPos::ZERO, YRotation::R0, layers, palette);
        assert_eq!(written, 2);
    }
}
