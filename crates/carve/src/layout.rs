use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use trailhead_common::{CellPos, Side};

use crate::anchor::{anchor_point, border_point, in_chunk};

/// Walkable layout of one chunk, as produced by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkLayout {
    pub dim: usize,
    pub entry: Side,
    pub walkable: BTreeSet<CellPos>,
    /// Requested exits in order, with whether each was carved.
    pub exits: Vec<(Side, bool)>,
}

impl ChunkLayout {
    pub fn is_walkable(&self, cell: CellPos) -> bool {
        self.walkable.contains(&cell)
    }

    pub fn entry_anchor(&self) -> CellPos {
        anchor_point(self.entry, self.dim)
    }

    pub fn realized_exits(&self) -> impl Iterator<Item = Side> + '_ {
        self.exits
            .iter()
            .filter(|(_, realized)| *realized)
            .map(|(side, _)| *side)
    }

    /// Border cells whose walls must be opened.
    pub fn openings(&self) -> Vec<CellPos> {
        let mut cells = Vec::new();
        if !self.entry.is_center() {
            cells.push(border_point(self.entry, self.dim));
        }
        cells.extend(self.realized_exits().map(|side| border_point(side, self.dim)));
        cells
    }

    /// Whether any orthogonal neighbour of `cell` is walkable.
    pub fn touches_walkable(&self, cell: CellPos) -> bool {
        cell.neighbors().iter().any(|n| self.walkable.contains(n))
    }

    pub fn walkable_neighbors(&self, cell: CellPos) -> usize {
        cell.neighbors()
            .iter()
            .filter(|n| self.walkable.contains(n))
            .count()
    }

    /// Every walkable cell reachable from `start` through orthogonal walkable steps.
    pub fn reachable_from(&self, start: CellPos) -> BTreeSet<CellPos> {
        let mut seen = BTreeSet::new();
        if !self.walkable.contains(&start) {
            return seen;
        }
        let mut queue = VecDeque::from([start]);
        seen.insert(start);
        while let Some(cell) = queue.pop_front() {
            for n in cell.neighbors() {
                if in_chunk(n, self.dim) && self.walkable.contains(&n) && seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
        seen
    }

    /// Whether the entry anchor connects to every realized exit's anchor and border.
    pub fn is_connected(&self) -> bool {
        let reached = self.reachable_from(self.entry_anchor());
        self.realized_exits().all(|side| {
            reached.contains(&anchor_point(side, self.dim))
                && reached.contains(&border_point(side, self.dim))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_layout() -> ChunkLayout {
        // Center (2,2) running north to the border at (2,4).
        let walkable = [(2, 2), (2, 3), (2, 4)]
            .into_iter()
            .map(|(x, z)| CellPos::new(x, z))
            .collect();
        ChunkLayout {
            dim: 5,
            entry: Side::Center,
            walkable,
            exits: vec![(Side::North, true)],
        }
    }

    #[test]
    fn straight_corridor_is_connected() {
        let layout = straight_layout();
        assert!(layout.is_connected());
        assert_eq!(layout.reachable_from(CellPos::new(2, 2)).len(), 3);
    }

    #[test]
    fn gap_breaks_connectivity() {
        let mut layout = straight_layout();
        layout.walkable.remove(&CellPos::new(2, 3));
        assert!(!layout.is_connected());
    }

    #[test]
    fn center_entry_has_no_opening() {
        let layout = straight_layout();
        assert_eq!(layout.openings(), vec![CellPos::new(2, 4)]);
    }

    #[test]
    fn unrealized_exits_are_skipped() {
        let mut layout = straight_layout();
        layout.exits.push((Side::East, false));
        assert_eq!(layout.realized_exits().collect::<Vec<_>>(), vec![Side::North]);
        assert!(layout.is_connected());
    }

    #[test]
    fn neighbour_queries() {
        let layout = straight_layout();
        assert!(layout.touches_walkable(CellPos::new(1, 3)));
        assert!(!layout.touches_walkable(CellPos::new(0, 0)));
        assert_eq!(layout.walkable_neighbors(CellPos::new(2, 3)), 2);
    }
}
