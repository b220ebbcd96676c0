use trailhead_common::GridCoord;

/// All coordinates within Manhattan distance `radius` of `center`.
///
/// The order is fixed (x ascending, then z ascending) so that synthesis, and with
/// it the global RNG, runs the same way every time.
pub fn diamond(center: GridCoord, radius: u32) -> Vec<GridCoord> {
    let n = radius as usize;
    let mut cells = Vec::with_capacity(2 * n * n + 2 * n + 1);
    let r = radius as i32;
    for dx in -r..=r {
        let span = r - dx.abs();
        for dz in -span..=span {
            cells.push(GridCoord::new(center.x + dx, center.z + dz));
        }
    }
    cells
}

pub fn in_diamond(coord: GridCoord, center: GridCoord, radius: u32) -> bool {
    coord.manhattan(center) <= radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn window_three_is_a_plus_shape() {
        let cells: HashSet<GridCoord> = diamond(GridCoord::ORIGIN, 3 / 2).into_iter().collect();
        let expected: HashSet<GridCoord> = [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)]
            .into_iter()
            .map(|(x, z)| GridCoord::new(x, z))
            .collect();
        assert_eq!(cells, expected);
    }

    #[test]
    fn radius_zero_is_the_center() {
        assert_eq!(diamond(GridCoord::new(4, -2), 0), vec![GridCoord::new(4, -2)]);
    }

    #[test]
    fn diamond_matches_manhattan_predicate() {
        let center = GridCoord::new(-3, 7);
        for radius in 0..6 {
            let cells = diamond(center, radius);
            let r = radius as usize;
            assert_eq!(cells.len(), 2 * r * r + 2 * r + 1);
            for x in -10..=10 {
                for z in -10..=10 {
                    let c = GridCoord::new(center.x + x, center.z + z);
                    assert_eq!(cells.contains(&c), in_diamond(c, center, radius));
                }
            }
        }
    }

    #[test]
    fn corners_are_excluded() {
        let cells = diamond(GridCoord::ORIGIN, 1);
        assert!(!cells.contains(&GridCoord::new(1, 1)));
        assert!(!cells.contains(&GridCoord::new(-1, -1)));
    }
}
