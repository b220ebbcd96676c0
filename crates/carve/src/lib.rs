//! Chunk content generation: corridor carving and terrain/path reconciliation.
//!
//! # Invariants
//! - Generation is a pure function of (seed, entry, exits, height field).
//! - The entry anchor and every realized exit form one connected walkable region.
//! - Carving always terminates; a stuck walk degrades to a straight run.

mod anchor;
mod corridor;
mod layout;
mod placement;

pub use anchor::{anchor_point, border_point, in_chunk, in_interior};
pub use corridor::{
    CorridorCarver, LegOutcome, LegTrace, MAX_MIDPOINT_PROBES, MAX_OCCUPIED_NEIGHBORS, MAX_WALK_ATTEMPTS,
    breaks_line,
};
pub use layout::ChunkLayout;
pub use placement::{
    BlockGrid, BlockKind, BlockPlan, FLOOR_LAYER, OBSTRUCTION_LAYER, PlacementOp, PlacementSink,
};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use trailhead_common::{LevelConfig, Side};
use trailhead_terrain::HeightField;

/// Turns a chunk blueprint into a walkable layout and block placements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkGenerator {
    dim: usize,
    randomness_bias: f32,
    flat_baseline: u32,
}

impl ChunkGenerator {
    pub fn new(dim: usize, randomness_bias: f32, flat_baseline: u32) -> Self {
        Self {
            dim,
            randomness_bias,
            flat_baseline,
        }
    }

    pub fn from_config(config: &LevelConfig) -> Self {
        Self::new(
            config.chunk_dim,
            config.randomness_bias,
            config.terrain.flat_baseline,
        )
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Carve the walkable layout. Identical inputs give identical layouts.
    pub fn generate(&self, seed: i32, entry: Side, exits: &[Side]) -> ChunkLayout {
        self.generate_traced(seed, entry, exits).0
    }

    /// [`generate`](Self::generate), also returning every walked leg in carve order.
    pub fn generate_traced(
        &self,
        seed: i32,
        entry: Side,
        exits: &[Side],
    ) -> (ChunkLayout, Vec<LegTrace>) {
        let mut legs = Vec::new();
        let mut rng = ChaCha8Rng::seed_from_u64(i64::from(seed) as u64);
        let mut walkable = BTreeSet::new();
        let entry_anchor = anchor_point(entry, self.dim);
        walkable.insert(entry_anchor);

        let mut realized_sides: Vec<Side> = Vec::with_capacity(exits.len());
        let mut realized = Vec::with_capacity(exits.len());
        for &side in exits {
            if side == entry || side.is_center() || realized_sides.contains(&side) {
                tracing::warn!(%entry, exit = %side, "exit cannot be carved; skipping");
                realized.push((side, false));
                continue;
            }
            let exit_anchor = anchor_point(side, self.dim);
            legs.extend(
                CorridorCarver::new(self.dim, self.randomness_bias, &mut rng, &mut walkable)
                    .carve(entry_anchor, exit_anchor),
            );
            walkable.insert(border_point(side, self.dim));
            realized_sides.push(side);
            realized.push((side, true));
        }

        let layout = ChunkLayout {
            dim: self.dim,
            entry,
            walkable,
            exits: realized,
        };
        (layout, legs)
    }

    /// Block instructions for a carved layout over its height field.
    pub fn plan(&self, layout: &ChunkLayout, heights: &HeightField) -> BlockPlan {
        BlockPlan::reconcile(layout, heights, self.flat_baseline)
    }

    /// Carve and push the resulting blocks into a sink.
    pub fn generate_into(
        &self,
        seed: i32,
        entry: Side,
        exits: &[Side],
        heights: &HeightField,
        sink: &mut dyn PlacementSink,
    ) -> ChunkLayout {
        let layout = self.generate(seed, entry, exits);
        self.plan(&layout, heights).apply(sink);
        layout
    }
}

pub fn crate_info() -> &'static str {
    "trailhead-carve v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let generator = ChunkGenerator::new(11, 0.25, 1);
        let a = generator.generate(-913, Side::West, &[Side::North, Side::East]);
        let b = generator.generate(-913, Side::West, &[Side::North, Side::East]);
        assert_eq!(a, b);
    }

    #[test]
    fn exit_matching_entry_is_not_realized() {
        let generator = ChunkGenerator::new(9, 0.0, 1);
        let layout = generator.generate(5, Side::South, &[Side::South, Side::North]);
        assert_eq!(layout.exits, vec![(Side::South, false), (Side::North, true)]);
        assert!(layout.is_connected());
    }

    #[test]
    fn no_exits_leaves_only_the_anchor() {
        let generator = ChunkGenerator::new(9, 0.0, 1);
        let layout = generator.generate(1, Side::East, &[]);
        assert_eq!(layout.walkable.len(), 1);
        assert!(layout.is_walkable(anchor_point(Side::East, 9)));
    }

    #[test]
    fn traced_generation_matches_plain_generation() {
        let generator = ChunkGenerator::new(11, 0.25, 1);
        let (layout, legs) = generator.generate_traced(17, Side::North, &[Side::South, Side::East]);
        assert_eq!(layout, generator.generate(17, Side::North, &[Side::South, Side::East]));
        assert!(legs.len() >= 2);
        assert_eq!(legs[0].from, anchor_point(Side::North, 11));
    }

    #[test]
    fn exit_border_is_walkable() {
        let generator = ChunkGenerator::new(11, 0.25, 1);
        let layout = generator.generate(42, Side::Center, &[Side::East]);
        assert!(layout.is_walkable(border_point(Side::East, 11)));
        assert!(!layout.is_walkable(border_point(Side::West, 11)));
    }

    #[test]
    fn generate_into_fills_sink() {
        let generator = ChunkGenerator::new(7, 0.0, 1);
        let heights = HeightField::flat(7, 3);
        let mut grid = BlockGrid::new();
        let layout = generator.generate_into(8, Side::North, &[Side::South], &heights, &mut grid);
        for cell in &layout.walkable {
            assert!(grid.is_open(*cell));
        }
        assert!(grid.is_open(border_point(Side::North, 7)));
    }
}
