//! Plain-text views of chunks and of the level map. North is up.

use trailhead_carve::{BlockGrid, ChunkLayout, border_point};
use trailhead_common::{CellPos, GridCoord};
use trailhead_stream::LevelGraph;

/// One character per cell: `E` entry anchor, `X` exit border, `.` walkable,
/// `#` solid.
pub fn render_layout(layout: &ChunkLayout) -> String {
    let dim = layout.dim as i32;
    let anchor = layout.entry_anchor();
    let exits: Vec<CellPos> = layout
        .realized_exits()
        .map(|side| border_point(side, layout.dim))
        .collect();
    let mut out = String::with_capacity((layout.dim + 1) * layout.dim);
    for z in (0..dim).rev() {
        for x in 0..dim {
            let cell = CellPos::new(x, z);
            let c = if cell == anchor {
                'E'
            } else if exits.contains(&cell) {
                'X'
            } else if layout.is_walkable(cell) {
                '.'
            } else {
                '#'
            };
            out.push(c);
        }
        out.push('\n');
    }
    out
}

/// Column heights of a materialized chunk: `.` open floor, `1`-`9` stacked
/// blocks (capped at 9), `?` no floor.
pub fn render_blocks(grid: &BlockGrid, dim: usize) -> String {
    let dim = dim as i32;
    let mut out = String::new();
    for z in (0..dim).rev() {
        for x in 0..dim {
            let cell = CellPos::new(x, z);
            let c = if grid.is_open(cell) {
                '.'
            } else {
                match grid.column_height(cell) {
                    0 => '?',
                    h => char::from_digit((h - 1).clamp(1, 9), 10).unwrap_or('9'),
                }
            };
            out.push(c);
        }
        out.push('\n');
    }
    out
}

/// Record map around `center`: `@` observer chunk, `O` active record, `o`
/// stored record, `+` open slot target, `.` unvisited.
pub fn render_level_map(
    graph: &LevelGraph,
    center: GridCoord,
    radius: i32,
    is_active: impl Fn(GridCoord) -> bool,
) -> String {
    let mut out = String::new();
    for dz in (-radius..=radius).rev() {
        for dx in -radius..=radius {
            let coord = GridCoord::new(center.x + dx, center.z + dz);
            let c = if coord == center {
                '@'
            } else if graph.is_recorded(coord) {
                if is_active(coord) { 'O' } else { 'o' }
            } else if graph.slots_targeting(coord) > 0 {
                '+'
            } else {
                '.'
            };
            out.push(c);
        }
        out.push('\n');
    }
    out
}
