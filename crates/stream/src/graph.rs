use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trailhead_common::{GridCoord, Side};

use crate::error::StreamError;
use crate::pool::WorkerId;
use crate::record::ChunkRecord;

/// What the level knows about a coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellState<'a> {
    Unvisited,
    Recorded(&'a ChunkRecord),
}

/// An unresolved exit: generation may continue across `side` of `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSlot {
    pub origin: GridCoord,
    pub side: Side,
    /// Worker that materialized `origin` when the slot opened. Liveness only.
    pub owner: WorkerId,
}

impl ConnectionSlot {
    pub fn target(&self) -> GridCoord {
        self.origin.neighbor(self.side)
    }
}

/// A breach of the frontier closure rule found by [`LevelGraph::audit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrontierIssue {
    /// The exit's target has a record and a slot still points at it.
    RecordAndSlot { origin: GridCoord, side: Side },
    /// More than one slot for the same exit.
    DuplicateSlots { origin: GridCoord, side: Side, count: usize },
    /// A materialized chunk's exit leads nowhere and has no slot.
    MissingSlot { origin: GridCoord, side: Side },
    /// A slot that matches no exit of any record.
    OrphanSlot { origin: GridCoord, side: Side },
}

/// Every chunk ever generated plus the open frontier.
#[derive(Debug, Default)]
pub struct LevelGraph {
    records: BTreeMap<GridCoord, ChunkRecord>,
    frontier: Vec<ConnectionSlot>,
    next_index: u64,
}

impl LevelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from saved records. Duplicate coordinates are rejected.
    pub fn from_records(
        records: impl IntoIterator<Item = ChunkRecord>,
        next_index: u64,
    ) -> Result<Self, StreamError> {
        let mut graph = Self {
            next_index,
            ..Self::default()
        };
        for record in records {
            if record.creation_index() >= next_index {
                return Err(StreamError::InvalidState(format!(
                    "record at {} has creation index {} but the counter is at {next_index}",
                    record.coord(),
                    record.creation_index()
                )));
            }
            graph.register(record)?;
        }
        Ok(graph)
    }

    pub fn state(&self, coord: GridCoord) -> CellState<'_> {
        match self.records.get(&coord) {
            Some(record) => CellState::Recorded(record),
            None => CellState::Unvisited,
        }
    }

    pub fn record(&self, coord: GridCoord) -> Option<&ChunkRecord> {
        self.records.get(&coord)
    }

    pub fn is_recorded(&self, coord: GridCoord) -> bool {
        self.records.contains_key(&coord)
    }

    pub fn records(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.records.values()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Next creation index without consuming it.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn allocate_index(&mut self) -> u64 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// Store a record. The map is write-once per coordinate.
    pub fn register(&mut self, record: ChunkRecord) -> Result<(), StreamError> {
        let coord = record.coord();
        if self.records.contains_key(&coord) {
            return Err(StreamError::CoordinateCollision(coord));
        }
        self.records.insert(coord, record);
        Ok(())
    }

    pub fn frontier(&self) -> &[ConnectionSlot] {
        &self.frontier
    }

    /// Open a slot for an exit, unless its target is already recorded or the exit
    /// already has one. Returns whether a slot was added.
    pub fn open_slot(&mut self, origin: GridCoord, side: Side, owner: WorkerId) -> bool {
        if self.is_recorded(origin.neighbor(side)) {
            return false;
        }
        if self
            .frontier
            .iter()
            .any(|s| s.origin == origin && s.side == side)
        {
            return false;
        }
        self.frontier.push(ConnectionSlot {
            origin,
            side,
            owner,
        });
        true
    }

    /// Remove and return the slot leading into `target`.
    ///
    /// When several exits lead there, the one with the smallest `(origin, side)` wins
    /// so the choice does not depend on the order slots were opened in.
    pub fn take_slot_for(&mut self, target: GridCoord) -> Option<ConnectionSlot> {
        let (index, _) = self
            .frontier
            .iter()
            .enumerate()
            .filter(|(_, s)| s.target() == target)
            .min_by_key(|(_, s)| (s.origin, s.side))?;
        Some(self.frontier.remove(index))
    }

    pub fn slots_targeting(&self, target: GridCoord) -> usize {
        self.frontier.iter().filter(|s| s.target() == target).count()
    }

    /// Drop satisfied slots and slots whose owner is no longer live.
    pub fn prune(&mut self, mut is_live: impl FnMut(&ConnectionSlot) -> bool) -> usize {
        let before = self.frontier.len();
        let records = &self.records;
        self.frontier
            .retain(|slot| !records.contains_key(&slot.target()) && is_live(slot));
        before - self.frontier.len()
    }

    /// Check frontier closure. `is_materialized` tells which records currently
    /// have a live worker; only those must carry a slot for every open exit.
    pub fn audit(&self, is_materialized: impl Fn(GridCoord) -> bool) -> Vec<FrontierIssue> {
        let mut issues = Vec::new();
        let mut slot_counts: BTreeMap<(GridCoord, Side), usize> = BTreeMap::new();
        for slot in &self.frontier {
            *slot_counts.entry((slot.origin, slot.side)).or_default() += 1;
        }

        for record in self.records.values() {
            for (side, target) in record.exit_targets() {
                let origin = record.coord();
                let slots = slot_counts.get(&(origin, side)).copied().unwrap_or(0);
                if self.is_recorded(target) {
                    if slots > 0 {
                        issues.push(FrontierIssue::RecordAndSlot { origin, side });
                    }
                } else if slots > 1 {
                    issues.push(FrontierIssue::DuplicateSlots {
                        origin,
                        side,
                        count: slots,
                    });
                } else if slots == 0 && is_materialized(origin) {
                    issues.push(FrontierIssue::MissingSlot { origin, side });
                }
            }
        }

        for &(origin, side) in slot_counts.keys() {
            let known = self
                .record(origin)
                .is_some_and(|r| r.exits().contains(&side));
            if !known {
                issues.push(FrontierIssue::OrphanSlot { origin, side });
            }
        }
        issues
    }
}
