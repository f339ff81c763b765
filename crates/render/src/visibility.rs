//! Neighbor-aware face visibility.
//!
//! Rules, per face of a block toward a neighbor cell:
//!
//! - neighbor outside the structure: draw;
//! - same name and the neighbor self-culls: cull;
//! - neighbor opaque: cull, except the top face of a waterlogged block;
//! - neighbor not opaque: cull only when both cells are waterlogged.
//!
//! A known-empty cell inside the structure counts as air.

use blockview_assets::BlockFlags;
use blockview_core::{is_waterlogged, BlockName, BlockPos, CullFlags, Direction, PlacedBlock};
use blockview_world::{BlockLookup, BlockSource};

use crate::resources::Resources;

/// Flag-relevant view of one cell.
#[derive(Debug, Clone)]
pub struct CellInfo {
    /// Block name (air for known-empty cells).
    pub name: BlockName,
    /// Registry flags.
    pub flags: BlockFlags,
    /// Waterlogged after defaults are merged.
    pub waterlogged: bool,
}

impl CellInfo {
    /// Describe a placed block.
    pub fn of_block(block: &PlacedBlock, resources: &Resources) -> Self {
        let properties = resources.merged_properties(&block.state);
        Self {
            name: block.state.name.clone(),
            flags: resources.flags(&block.state.name),
            waterlogged: is_waterlogged(&properties),
        }
    }

    /// Describe a known-empty cell.
    pub fn air(resources: &Resources) -> Self {
        let name = BlockName::air();
        Self {
            flags: resources.flags(&name),
            name,
            waterlogged: false,
        }
    }

    /// Describe the result of a lookup; `None` for cells outside the structure.
    pub fn of_lookup(lookup: BlockLookup<'_>, resources: &Resources) -> Option<Self> {
        match lookup {
            BlockLookup::Present(block) => Some(Self::of_block(block, resources)),
            BlockLookup::Empty => Some(Self::air(resources)),
            BlockLookup::OutOfBounds => None,
        }
    }
}

/// Whether the face of `block` toward `dir` is hidden by `neighbor`.
pub fn needs_cull(block: &CellInfo, dir: Direction, neighbor: Option<&CellInfo>) -> bool {
    let Some(neighbor) = neighbor else {
        return false;
    };
    if block.name == neighbor.name && neighbor.flags.is_self_culling() {
        return true;
    }
    if neighbor.flags.is_opaque() {
        return !(dir == Direction::Up && block.waterlogged);
    }
    block.waterlogged && neighbor.waterlogged
}

/// Whether all six neighbors are present and opaque.
///
/// Cells outside the structure never occlude.
pub fn is_fully_occluded<S: BlockSource + ?Sized>(
    source: &S,
    resources: &Resources,
    pos: BlockPos,
) -> bool {
    pos.neighbors().into_iter().all(|(_, neighbor)| {
        source
            .lookup(neighbor)
            .block()
            .is_some_and(|block| resources.flags(&block.state.name).is_opaque())
    })
}

/// Per-face cull flags for `block`.
pub fn cull_flags<S: BlockSource + ?Sized>(
    source: &S,
    resources: &Resources,
    block: &PlacedBlock,
    info: &CellInfo,
) -> CullFlags {
    let mut flags = CullFlags::empty();
    for (dir, neighbor_pos) in block.pos.neighbors() {
        let neighbor = CellInfo::of_lookup(source.lookup(neighbor_pos), resources);
        if needs_cull(info, dir, neighbor.as_ref()) {
            flags |= dir.flag();
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(name: &str, flags: BlockFlags, waterlogged: bool) -> CellInfo {
        CellInfo {
            name: BlockName::parse(name).unwrap(),
            flags,
            waterlogged,
        }
    }

    #[test]
    fn outside_neighbor_never_culls() {
        let stone = cell("stone", BlockFlags::OPAQUE | BlockFlags::SELF_CULLING, false);
        for dir in Direction::ALL {
            assert!(!needs_cull(&stone, dir, None));
        }
    }

    #[test]
    fn self_culling_requires_same_name() {
        let glass = cell("glass", BlockFlags::SELF_CULLING, false);
        let ice = cell("ice", BlockFlags::SELF_CULLING, false);
        assert!(needs_cull(&glass, Direction::East, Some(&glass)));
        assert!(!needs_cull(&glass, Direction::East, Some(&ice)));
    }

    #[test]
    fn waterlogged_top_survives_opaque_ceiling() {
        let stone = cell("stone", BlockFlags::OPAQUE, false);
        let slab = cell("oak_slab", BlockFlags::empty(), true);
        assert!(!needs_cull(&slab, Direction::Up, Some(&stone)));
        assert!(needs_cull(&slab, Direction::North, Some(&stone)));
        assert!(needs_cull(&slab, Direction::Down, Some(&stone)));
    }

    #[test]
    fn waterlogged_pairs_hide_shared_faces() {
        let slab = cell("oak_slab", BlockFlags::empty(), true);
        let leaves = cell("oak_leaves", BlockFlags::empty(), true);
        let dry = cell("oak_leaves", BlockFlags::empty(), false);
        assert!(needs_cull(&slab, Direction::Up, Some(&leaves)));
        assert!(!needs_cull(&slab, Direction::Up, Some(&dry)));
        assert!(!needs_cull(&dry, Direction::Down, Some(&slab)));
    }

    #[test]
    fn unflagged_neighbor_keeps_face() {
        let stone = cell("stone", BlockFlags::OPAQUE, false);
        let mystery = cell("mystery", BlockFlags::empty(), false);
        assert!(!needs_cull(&stone, Direction::West, Some(&mystery)));
    }
}
