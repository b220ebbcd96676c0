use glam::Vec3;
use serde::{Deserialize, Serialize};
use trailhead_common::{GridCoord, Side};
use trailhead_terrain::HeightField;

/// Durable blueprint of one chunk. Written once, replayed whenever the chunk
/// re-enters the active window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    coord: GridCoord,
    origin: Vec3,
    seed: i32,
    entry: Side,
    exits: Vec<Side>,
    heights: HeightField,
    creation_index: u64,
}

impl ChunkRecord {
    pub fn new(
        coord: GridCoord,
        origin: Vec3,
        seed: i32,
        entry: Side,
        exits: Vec<Side>,
        heights: HeightField,
        creation_index: u64,
    ) -> Self {
        Self {
            coord,
            origin,
            seed,
            entry,
            exits,
            heights,
            creation_index,
        }
    }

    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    /// World-space corner the chunk is placed at.
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn seed(&self) -> i32 {
        self.seed
    }

    pub fn entry(&self) -> Side {
        self.entry
    }

    pub fn exits(&self) -> &[Side] {
        &self.exits
    }

    pub fn heights(&self) -> &HeightField {
        &self.heights
    }

    pub fn creation_index(&self) -> u64 {
        self.creation_index
    }

    /// Coordinates this chunk's exits lead to.
    pub fn exit_targets(&self) -> impl Iterator<Item = (Side, GridCoord)> + '_ {
        self.exits.iter().map(|side| (*side, self.coord.neighbor(*side)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_targets_follow_sides() {
        let record = ChunkRecord::new(
            GridCoord::new(2, 3),
            Vec3::new(22.0, 0.0, 33.0),
            -7,
            Side::West,
            vec![Side::North, Side::East],
            HeightField::flat(11, 0),
            4,
        );
        let targets: Vec<_> = record.exit_targets().collect();
        assert_eq!(
            targets,
            vec![
                (Side::North, GridCoord::new(2, 4)),
                (Side::East, GridCoord::new(3, 3)),
            ]
        );
        assert_eq!(record.creation_index(), 4);
        assert_eq!(record.seed(), -7);
    }
}
