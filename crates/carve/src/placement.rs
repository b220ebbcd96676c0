use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trailhead_common::CellPos;
use trailhead_terrain::HeightField;

use crate::layout::ChunkLayout;

/// Layer of the flat floor under every cell.
pub const FLOOR_LAYER: u32 = 0;
/// Layer of the ground-level obstruction on non-walkable cells.
pub const OBSTRUCTION_LAYER: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    Floor,
    Ground,
    Elevation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementOp {
    Place {
        cell: CellPos,
        layer: u32,
        block: BlockKind,
    },
    Clear {
        cell: CellPos,
        layer: u32,
    },
}

/// Receives block instructions for one materialized chunk.
///
/// Implementations own whatever renders or simulates the blocks; the generator only
/// decides what belongs where.
pub trait PlacementSink {
    /// Move the chunk's content to a world-space origin.
    fn set_origin(&mut self, origin: Vec3);
    fn place(&mut self, cell: CellPos, layer: u32, block: BlockKind);
    fn clear(&mut self, cell: CellPos, layer: u32);
    /// Drop all content and placement, returning to the neutral state.
    fn reset(&mut self);
}

/// Ordered block instructions for one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockPlan {
    ops: Vec<PlacementOp>,
}

impl BlockPlan {
    /// Reconcile a carved layout with its height field.
    ///
    /// Every cell gets a floor. Non-walkable cells get a ground obstruction and, above
    /// the baseline, an elevation stack unless they border a corridor. Openings on the
    /// chunk border are cleared last.
    pub fn reconcile(layout: &ChunkLayout, heights: &HeightField, flat_baseline: u32) -> Self {
        let dim = layout.dim as i32;
        let mut ops = Vec::new();
        for z in 0..dim {
            for x in 0..dim {
                let cell = CellPos::new(x, z);
                ops.push(PlacementOp::Place {
                    cell,
                    layer: FLOOR_LAYER,
                    block: BlockKind::Floor,
                });
                if layout.is_walkable(cell) {
                    continue;
                }
                ops.push(PlacementOp::Place {
                    cell,
                    layer: OBSTRUCTION_LAYER,
                    block: BlockKind::Ground,
                });
                let rise = heights.at(cell).saturating_sub(flat_baseline);
                if rise > 0 && !layout.touches_walkable(cell) {
                    for i in 0..rise {
                        ops.push(PlacementOp::Place {
                            cell,
                            layer: OBSTRUCTION_LAYER + 1 + i,
                            block: BlockKind::Elevation,
                        });
                    }
                }
            }
        }

        for cell in layout.openings() {
            let rise = heights.at(cell).saturating_sub(flat_baseline);
            for layer in OBSTRUCTION_LAYER..=OBSTRUCTION_LAYER + rise {
                ops.push(PlacementOp::Clear { cell, layer });
            }
        }
        Self { ops }
    }

    pub fn ops(&self) -> &[PlacementOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn apply(&self, sink: &mut dyn PlacementSink) {
        for op in &self.ops {
            match *op {
                PlacementOp::Place { cell, layer, block } => sink.place(cell, layer, block),
                PlacementOp::Clear { cell, layer } => sink.clear(cell, layer),
            }
        }
    }
}

/// In-memory sink that keeps the resulting blocks per (cell, layer).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockGrid {
    origin: Option<Vec3>,
    blocks: BTreeMap<(CellPos, u32), BlockKind>,
}

impl BlockGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(&self) -> Option<Vec3> {
        self.origin
    }

    pub fn block(&self, cell: CellPos, layer: u32) -> Option<BlockKind> {
        self.blocks.get(&(cell, layer)).copied()
    }

    /// Whether a walker can stand on `cell`: floor present, nothing above it.
    pub fn is_open(&self, cell: CellPos) -> bool {
        self.block(cell, FLOOR_LAYER).is_some() && self.column_height(cell) == 1
    }

    /// One past the highest occupied layer in the column, 0 when empty.
    pub fn column_height(&self, cell: CellPos) -> u32 {
        self.blocks
            .range((cell, 0)..=(cell, u32::MAX))
            .next_back()
            .map(|((_, layer), _)| layer + 1)
            .unwrap_or(0)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.origin.is_none()
    }
}

impl PlacementSink for BlockGrid {
    fn set_origin(&mut self, origin: Vec3) {
        self.origin = Some(origin);
    }

    fn place(&mut self, cell: CellPos, layer: u32, block: BlockKind) {
        self.blocks.insert((cell, layer), block);
    }

    fn clear(&mut self, cell: CellPos, layer: u32) {
        self.blocks.remove(&(cell, layer));
    }

    fn reset(&mut self) {
        self.origin = None;
        self.blocks.clear();
    }
}
