use std::collections::BTreeMap;

use blockview_core::{BlockPos, BlockState, PlacedBlock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BlockLookup, BlockSource};

/// Inclusive axis-aligned block bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest contained position.
    pub min: BlockPos,
    /// Largest contained position.
    pub max: BlockPos,
}

impl Bounds {
    /// Bounds spanning `min..=max`; corners are sorted per axis.
    pub fn new(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Bounds of a `size` box whose minimum corner is `origin`.
    ///
    /// Returns `None` if any extent is zero.
    pub fn from_origin_size(origin: BlockPos, size: [u32; 3]) -> Option<Self> {
        if size.contains(&0) {
            return None;
        }
        Some(Self {
            min: origin,
            max: BlockPos::new(
                origin.x + size[0] as i32 - 1,
                origin.y + size[1] as i32 - 1,
                origin.z + size[2] as i32 - 1,
            ),
        })
    }

    /// Whether `pos` lies inside the bounds.
    pub fn contains(&self, pos: BlockPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    /// Extent in blocks per axis.
    pub fn size(&self) -> [u32; 3] {
        [
            (self.max.x - self.min.x + 1) as u32,
            (self.max.y - self.min.y + 1) as u32,
            (self.max.z - self.min.z + 1) as u32,
        ]
    }

    /// Minimum and maximum corners in float space (max is the far face).
    pub fn corners_f32(&self) -> ([f32; 3], [f32; 3]) {
        (
            self.min.as_f32(),
            [
                self.max.x as f32 + 1.0,
                self.max.y as f32 + 1.0,
                self.max.z as f32 + 1.0,
            ],
        )
    }
}

/// Errors raised when editing a [`Structure`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructureError {
    /// Tried to place a block outside the structure.
    #[error("position {pos} lies outside structure bounds {min}..={max}")]
    OutOfBounds {
        /// Offending position.
        pos: BlockPos,
        /// Bounds minimum.
        min: BlockPos,
        /// Bounds maximum.
        max: BlockPos,
    },
}

/// Sparse in-memory structure with fixed bounds.
///
/// Blocks iterate in position order, so meshing the same structure twice
/// produces identical buffers.
#[derive(Debug, Clone)]
pub struct Structure {
    bounds: Bounds,
    blocks: BTreeMap<BlockPos, PlacedBlock>,
}

impl Structure {
    /// Empty structure covering `bounds`.
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            blocks: BTreeMap::new(),
        }
    }

    /// Empty structure of the given size anchored at the origin.
    ///
    /// Zero extents are clamped to one block.
    pub fn with_size(size_x: u32, size_y: u32, size_z: u32) -> Self {
        let size = [size_x.max(1), size_y.max(1), size_z.max(1)];
        let bounds = Bounds {
            min: BlockPos::ZERO,
            max: BlockPos::new(size[0] as i32 - 1, size[1] as i32 - 1, size[2] as i32 - 1),
        };
        Self::new(bounds)
    }

    /// Structure bounds.
    pub fn structure_bounds(&self) -> Bounds {
        self.bounds
    }

    /// Number of stored blocks (air included if it was placed explicitly).
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no blocks are stored.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block stored at `pos`.
    pub fn get(&self, pos: BlockPos) -> Option<&PlacedBlock> {
        self.blocks.get(&pos)
    }

    /// Place `state` at `pos`, returning the previous block.
    pub fn set_block(
        &mut self,
        pos: BlockPos,
        state: BlockState,
    ) -> Result<Option<PlacedBlock>, StructureError> {
        self.place(PlacedBlock::new(pos, state))
    }

    /// Store a fully specified block (including block-entity data).
    pub fn place(&mut self, block: PlacedBlock) -> Result<Option<PlacedBlock>, StructureError> {
        if !self.bounds.contains(block.pos) {
            return Err(StructureError::OutOfBounds {
                pos: block.pos,
                min: self.bounds.min,
                max: self.bounds.max,
            });
        }
        Ok(self.blocks.insert(block.pos, block))
    }

    /// Remove the block at `pos`, leaving the cell empty.
    pub fn remove_block(&mut self, pos: BlockPos) -> Option<PlacedBlock> {
        self.blocks.remove(&pos)
    }

    /// Fill the inclusive box `a..=b` with `state`. Cells outside the
    /// structure are skipped. Returns the number of cells written.
    pub fn fill(&mut self, a: BlockPos, b: BlockPos, state: &BlockState) -> usize {
        let region = Bounds::new(a, b);
        let mut written = 0;
        for x in region.min.x..=region.max.x {
            for y in region.min.y..=region.max.y {
                for z in region.min.z..=region.max.z {
                    let pos = BlockPos::new(x, y, z);
                    if self.bounds.contains(pos) {
                        self.blocks.insert(pos, PlacedBlock::new(pos, state.clone()));
                        written += 1;
                    }
                }
            }
        }
        written
    }
}

impl BlockSource for Structure {
    fn blocks(&self) -> Box<dyn Iterator<Item = &PlacedBlock> + '_> {
        Box::new(self.blocks.values())
    }

    fn lookup(&self, pos: BlockPos) -> BlockLookup<'_> {
        if !self.bounds.contains(pos) {
            return BlockLookup::OutOfBounds;
        }
        match self.blocks.get(&pos) {
            Some(block) => BlockLookup::Present(block),
            None => BlockLookup::Empty,
        }
    }

    fn bounds(&self) -> Option<Bounds> {
        Some(self.bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockview_core::BlockName;

    fn stone() -> BlockState {
        BlockState::new(BlockName::parse("stone").unwrap())
    }

    #[test]
    fn lookup_distinguishes_empty_from_outside() {
        let mut structure = Structure::with_size(2, 1, 1);
        structure.set_block(BlockPos::new(0, 0, 0), stone()).unwrap();

        assert!(matches!(
            structure.lookup(BlockPos::new(0, 0, 0)),
            BlockLookup::Present(_)
        ));
        assert_eq!(structure.lookup(BlockPos::new(1, 0, 0)), BlockLookup::Empty);
        assert_eq!(
            structure.lookup(BlockPos::new(2, 0, 0)),
            BlockLookup::OutOfBounds
        );
        assert_eq!(
            structure.lookup(BlockPos::new(-1, 0, 0)),
            BlockLookup::OutOfBounds
        );
    }

    #[test]
    fn placing_outside_bounds_fails() {
        let mut structure = Structure::with_size(1, 1, 1);
        let err = structure
            .set_block(BlockPos::new(0, 1, 0), stone())
            .unwrap_err();
        assert!(matches!(err, StructureError::OutOfBounds { .. }));
        assert!(structure.is_empty());
    }

    #[test]
    fn negative_bounds_are_supported() {
        let bounds = Bounds::new(BlockPos::new(-17, 0, 0), BlockPos::new(3, 0, 0));
        let mut structure = Structure::new(bounds);
        assert_eq!(bounds.size(), [21, 1, 1]);
        assert!(structure.set_block(BlockPos::new(-17, 0, 0), stone()).is_ok());
        assert!(structure.set_block(BlockPos::new(-18, 0, 0), stone()).is_err());
    }

    #[test]
    fn fill_clips_to_bounds() {
        let mut structure = Structure::with_size(2, 2, 2);
        let written = structure.fill(BlockPos::new(-1, 0, 0), BlockPos::new(1, 1, 1), &stone());
        assert_eq!(written, 8);
        assert_eq!(structure.len(), 8);
    }

    #[test]
    fn blocks_iterate_in_position_order() {
        let mut structure = Structure::with_size(3, 1, 1);
        for x in [2, 0, 1] {
            structure.set_block(BlockPos::new(x, 0, 0), stone()).unwrap();
        }
        let xs: Vec<i32> = structure.blocks().map(|b| b.pos.x).collect();
        assert_eq!(xs, vec![0, 1, 2]);
    }

    #[test]
    fn from_origin_size_rejects_zero_extent() {
        assert!(Bounds::from_origin_size(BlockPos::ZERO, [0, 1, 1]).is_none());
        let bounds = Bounds::from_origin_size(BlockPos::new(-2, 0, 0), [4, 1, 1]).unwrap();
        assert_eq!(bounds.max, BlockPos::new(1, 0, 0));
    }

    proptest::proptest! {
        #[test]
        fn fill_count_matches_clipped_volume(
            ax in -6i32..6, ay in -6i32..6, az in -6i32..6,
            bx in -6i32..6, by in -6i32..6, bz in -6i32..6,
        ) {
            let mut structure = Structure::new(Bounds::new(BlockPos::new(-2, -2, -2), BlockPos::new(2, 2, 2)));
            let placed = structure.fill(BlockPos::new(ax, ay, az), BlockPos::new(bx, by, bz), &stone());
            let span = |a: i32, b: i32| (a.min(b).max(-2)..=a.max(b).min(2)).count();
            proptest::prop_assert_eq!(placed, span(ax, bx) * span(ay, by) * span(az, bz));
            proptest::prop_assert_eq!(structure.len(), placed);
        }
    }
}
