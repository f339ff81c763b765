use anyhow::{Context, Result};
use blockview_core::{BlockName, BlockPos, BlockState};
use blockview_world::{Bounds, Structure, YRotation};

fn state(name: &str) -> Result<BlockState> {
    let name = BlockName::parse(name).with_context(|| format!("invalid block name {name}"))?;
    Ok(BlockState::new(name))
}

const HUT: &[&[&str]] = &[
    &["ggggg", "g...g", "g.L.g", "g...g", "gg.gg"],
    &["ggggg", "g...g", "g.t.g", "g...g", "gg.gg"],
    &["ggggg", "g...g", "g...g", "g...g", "ggggg"],
    &["ggggg", "ggggg", "ggggg", "ggggg", "ggggg"],
];

/// Small scene straddling the origin so it spans negative chunks: a grass
/// floor, a glass hut with a lamp, a pond under a slab roof, and a tree.
pub fn demo_structure() -> Result<Structure> {
    let mut structure = Structure::new(Bounds::new(BlockPos::new(-12, 0, -12), BlockPos::new(11, 9, 11)));

    structure.fill(BlockPos::new(-12, 0, -12), BlockPos::new(11, 0, 11), &state("grass_block")?);
    structure.fill(BlockPos::new(-12, 0, -12), BlockPos::new(-9, 0, 11), &state("stone")?);

    // Glass hut with a glowstone lamp inside, door facing east.
    let glass = state("glass")?;
    let lamp = state("glowstone")?;
    let torch = state("torch")?;
    structure.place_layers(BlockPos::new(-6, 1, -6), YRotation::R90, HUT, |byte| match byte {
        b'g' => Some(glass.clone()),
        b'L' => Some(lamp.clone()),
        b't' => Some(torch.clone()),
        _ => None,
    });

    // Pond: water dug into the floor, slabs overhead, one waterlogged.
    structure.fill(BlockPos::new(2, 0, 2), BlockPos::new(6, 0, 6), &state("water")?);
    let slab = state("oak_slab")?.with_property("type", "top");
    structure.fill(BlockPos::new(3, 3, 3), BlockPos::new(5, 3, 5), &slab);
    structure.set_block(
        BlockPos::new(4, 1, 4),
        state("oak_slab")?.with_property("waterlogged", "true"),
    )?;

    // Tree.
    structure.fill(BlockPos::new(7, 1, -6), BlockPos::new(7, 5, -6), &state("oak_log")?);
    structure.fill(BlockPos::new(5, 5, -8), BlockPos::new(9, 7, -4), &state("oak_leaves")?);
    structure.fill(BlockPos::new(7, 5, -6), BlockPos::new(7, 6, -6), &state("oak_log")?);

    structure.set_block(BlockPos::new(0, 1, 0), state("sea_lantern")?)?;
    structure.fill(BlockPos::new(-1, 1, 8), BlockPos::new(1, 2, 10), &state("cobblestone")?);

    tracing::debug!(blocks = structure.len(), "demo structure built");
    Ok(structure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockview_world::BlockSource;

    #[test]
    fn demo_spans_negative_and_positive_coordinates() {
        let structure = demo_structure().unwrap();
        assert!(structure.blocks().any(|block| block.pos.x < 0));
        assert!(structure.blocks().any(|block| block.pos.x > 0));
        assert!(structure.blocks().any(|block| block.state.name.path() == "glowstone"));
    }
}
