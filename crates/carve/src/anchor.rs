use trailhead_common::{CellPos, Side};

/// Midpoint cell of a chunk edge; the chunk center for [`Side::Center`].
pub fn border_point(side: Side, dim: usize) -> CellPos {
    let last = dim as i32 - 1;
    let mid = dim as i32 / 2;
    match side {
        Side::North => CellPos::new(mid, last),
        Side::South => CellPos::new(mid, 0),
        Side::East => CellPos::new(last, mid),
        Side::West => CellPos::new(0, mid),
        Side::Center => CellPos::new(mid, mid),
    }
}

/// Where a corridor attaches to a side: one cell inward from its border point.
pub fn anchor_point(side: Side, dim: usize) -> CellPos {
    let border = border_point(side, dim);
    let (dx, dz) = side.offset();
    border.offset(-dx, -dz)
}

/// Cells a corridor may occupy: everything except the outer wall ring.
pub fn in_interior(cell: CellPos, dim: usize) -> bool {
    let hi = dim as i32 - 2;
    (1..=hi).contains(&cell.x) && (1..=hi).contains(&cell.z)
}

pub fn in_chunk(cell: CellPos, dim: usize) -> bool {
    let hi = dim as i32 - 1;
    (0..=hi).contains(&cell.x) && (0..=hi).contains(&cell.z)
}
