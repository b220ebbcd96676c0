use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chunk coordinates the level may reach on either axis. Leaves headroom so that
/// neighbours and window offsets never overflow `i32`.
pub const GRID_LIMIT: i32 = 1 << 28;

/// Address of a chunk on the infinite level lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub z: i32,
}

impl GridCoord {
    pub const ORIGIN: GridCoord = GridCoord { x: 0, z: 0 };

    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing a world-space position, or `None` when the position is not
    /// finite or lies beyond [`GRID_LIMIT`].
    pub fn try_from_world(pos: Vec3, chunk_extent: f32) -> Option<Self> {
        if !pos.is_finite() {
            return None;
        }
        let x = (pos.x / chunk_extent).floor();
        let z = (pos.z / chunk_extent).floor();
        let limit = GRID_LIMIT as f32;
        if x.abs() > limit || z.abs() > limit {
            return None;
        }
        Some(Self::new(x as i32, z as i32))
    }

    /// World-space corner of this chunk (minimum x/z, ground level).
    pub fn world_origin(self, chunk_extent: f32) -> Vec3 {
        Vec3::new(
            self.x as f32 * chunk_extent,
            0.0,
            self.z as f32 * chunk_extent,
        )
    }

    /// The chunk across the given side. `Center` maps to `self`.
    pub fn neighbor(self, side: Side) -> Self {
        let (dx, dz) = side.offset();
        Self::new(self.x + dx, self.z + dz)
    }

    pub fn manhattan(self, other: GridCoord) -> u32 {
        self.x.abs_diff(other.x) + self.z.abs_diff(other.z)
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// One edge of a chunk, or the degenerate center used by the level origin.
///
/// North is +z, east is +x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    North,
    South,
    East,
    West,
    Center,
}

impl Side {
    /// The four real edges, in a fixed order. Random side draws index into this.
    pub const CARDINAL: [Side; 4] = [Side::North, Side::South, Side::East, Side::West];

    pub fn opposite(self) -> Side {
        match self {
            Side::North => Side::South,
            Side::South => Side::North,
            Side::East => Side::West,
            Side::West => Side::East,
            Side::Center => Side::Center,
        }
    }

    /// Unit lattice step across this side.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Side::North => (0, 1),
            Side::South => (0, -1),
            Side::East => (1, 0),
            Side::West => (-1, 0),
            Side::Center => (0, 0),
        }
    }

    pub fn is_center(self) -> bool {
        self == Side::Center
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Side::North => "north",
            Side::South => "south",
            Side::East => "east",
            Side::West => "west",
            Side::Center => "center",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "north" | "n" => Ok(Side::North),
            "south" | "s" => Ok(Side::South),
            "east" | "e" => Ok(Side::East),
            "west" | "w" => Ok(Side::West),
            "center" | "c" => Ok(Side::Center),
            other => Err(format!("unknown side '{other}'")),
        }
    }
}

/// A cell inside one chunk, `0..dim` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    pub x: i32,
    pub z: i32,
}

impl CellPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    /// The four orthogonal neighbours (north, south, east, west).
    pub fn neighbors(self) -> [CellPos; 4] {
        Side::CARDINAL.map(|side| {
            let (dx, dz) = side.offset();
            self.offset(dx, dz)
        })
    }

    pub fn manhattan(self, other: CellPos) -> u32 {
        self.x.abs_diff(other.x) + self.z.abs_diff(other.z)
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}
