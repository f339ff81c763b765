#![warn(missing_docs)]
//! Block structure access: the read-only provider interface the mesher
//! consumes, plus an in-memory structure used by tools and tests.

mod structure;
mod template;

pub use structure::{Bounds, Structure, StructureError};
pub use template::YRotation;

use blockview_core::{BlockPos, PlacedBlock};

/// Result of looking up a single cell.
///
/// `Empty` and `OutOfBounds` are deliberately distinct: a cell outside the
/// structure never hides a face, while an empty cell inside it still takes
/// part in flag-based culling as air.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockLookup<'a> {
    /// A block occupies the cell.
    Present(&'a PlacedBlock),
    /// Inside the structure, but nothing is stored there.
    Empty,
    /// Outside the structure.
    OutOfBounds,
}

impl<'a> BlockLookup<'a> {
    /// The block, if one is present.
    pub fn block(self) -> Option<&'a PlacedBlock> {
        match self {
            BlockLookup::Present(block) => Some(block),
            BlockLookup::Empty | BlockLookup::OutOfBounds => None,
        }
    }

    /// Whether the cell lies inside the structure.
    pub fn in_bounds(self) -> bool {
        !matches!(self, BlockLookup::OutOfBounds)
    }
}

/// Read-only access to a block structure.
pub trait BlockSource {
    /// Enumerate every placed block.
    fn blocks(&self) -> Box<dyn Iterator<Item = &PlacedBlock> + '_>;

    /// Look up the cell at `pos`.
    fn lookup(&self, pos: BlockPos) -> BlockLookup<'_>;

    /// Inclusive bounding box, or `None` for an unbounded/empty source.
    fn bounds(&self) -> Option<Bounds>;
}

impl<T: BlockSource + ?Sized> BlockSource for &T {
    fn blocks(&self) -> Box<dyn Iterator<Item = &PlacedBlock> + '_> {
        (**self).blocks()
    }

    fn lookup(&self, pos: BlockPos) -> BlockLookup<'_> {
        (**self).lookup(pos)
    }

    fn bounds(&self) -> Option<Bounds> {
        (**self).bounds()
    }
}
