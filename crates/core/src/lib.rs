#![warn(missing_docs)]
//! Core primitives shared across the workspace.

mod block;
mod direction;
mod name;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use block::{is_waterlogged, BlockState, PlacedBlock, Properties, WATERLOGGED};
pub use direction::{CullFlags, Direction};
pub use name::{BlockName, BlockNameError, DEFAULT_NAMESPACE};

/// Integer block position in structure space.
///
/// Ordered by `(x, y, z)` so sets and maps of positions iterate deterministically.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    /// Origin of structure space.
    pub const ZERO: Self = Self::new(0, 0, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Neighbor one step toward `dir`.
    pub fn offset(self, dir: Direction) -> Self {
        let [dx, dy, dz] = dir.offset();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// All six axis neighbors paired with the direction that reaches them.
    pub fn neighbors(self) -> [(Direction, BlockPos); 6] {
        Direction::ALL.map(|dir| (dir, self.offset(dir)))
    }

    /// Position as floats (the block's minimum corner).
    pub fn as_f32(self) -> [f32; 3] {
        [self.x as f32, self.y as f32, self.z as f32]
    }

    /// Center of the block cell.
    pub fn center(self) -> [f32; 3] {
        [
            self.x as f32 + 0.5,
            self.y as f32 + 0.5,
            self.z as f32 + 0.5,
        ]
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<[i32; 3]> for BlockPos {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_are_one_step_away() {
        let pos = BlockPos::new(-3, 7, 12);
        for (dir, neighbor) in pos.neighbors() {
            let dist = (neighbor.x - pos.x).abs()
                + (neighbor.y - pos.y).abs()
                + (neighbor.z - pos.z).abs();
            assert_eq!(dist, 1);
            assert_eq!(neighbor.offset(dir.opposite()), pos);
        }
    }

    #[test]
    fn center_is_half_block_in() {
        assert_eq!(BlockPos::new(-1, 0, 2).center(), [-0.5, 0.5, 2.5]);
    }

    proptest::proptest! {
        #[test]
        fn offset_then_opposite_is_identity(x in -1_000_000i32..1_000_000, y in -1000i32..1000, z in -1_000_000i32..1_000_000) {
            let pos = BlockPos::new(x, y, z);
            for dir in Direction::ALL {
                proptest::prop_assert_eq!(pos.offset(dir).offset(dir.opposite()), pos);
            }
        }
    }
}
