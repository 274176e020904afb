//! Integer Dijkstra scans over cost maps.
//!
//! Distance maps are seeded by the caller (0 at sources, [`UNREACHABLE`]
//! elsewhere) and relaxed in place. Cost maps mark non-traversable cells
//! [`PDS_FORBIDDEN`]; [`PDS_OBSTRUCTION`] cells (doors and the like) can be
//! entered orthogonally at unit cost but never diagonally, and no diagonal
//! step may cut the corner past one.

use crate::cell::Cell;
use crate::grid::Grid;
use crate::tiles::TileFlags;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

pub const PDS_FORBIDDEN: i32 = -1;
pub const PDS_OBSTRUCTION: i32 = -2;
pub const UNREACHABLE: i32 = 30_000;

const CARDINALS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
const ALL_DIRS: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

/// Relax `distance_map` in place from every cell seeded below `UNREACHABLE`.
///
/// A diagonal step is permitted only when both flanking orthogonal cells are
/// neither forbidden nor obstructions.
pub fn dijkstra_scan(distance_map: &mut Grid<i32>, cost_map: &Grid<i32>, use_diagonals: bool) {
    let mut heap: BinaryHeap<Reverse<(i32, i32, i32)>> = BinaryHeap::new();
    for (x, y, d) in distance_map.iter() {
        if d < UNREACHABLE {
            heap.push(Reverse((d, x as i32, y as i32)));
        }
    }

    while let Some(Reverse((dist, x, y))) = heap.pop() {
        if distance_map.get(x, y) != Some(dist) {
            continue;
        }
        let dirs: &[(i32, i32)] = if use_diagonals { &ALL_DIRS } else { &CARDINALS };
        for &(dx, dy) in dirs {
            let (nx, ny) = (x + dx, y + dy);
            if dx != 0 && dy != 0 {
                let side_a = cost_map.get(nx, y).unwrap_or(PDS_FORBIDDEN);
                let side_b = cost_map.get(x, ny).unwrap_or(PDS_FORBIDDEN);
                if side_a < 0 || side_b < 0 {
                    continue;
                }
            }
            let Some(step_cost) = cost_map.get(nx, ny) else {
                continue;
            };
            if step_cost == PDS_FORBIDDEN {
                continue;
            }
            // Obstructions admit orthogonal entry only.
            if step_cost == PDS_OBSTRUCTION && dx != 0 && dy != 0 {
                continue;
            }
            let next = dist + if step_cost == PDS_OBSTRUCTION { 1 } else { step_cost };
            if next < distance_map.get(nx, ny).unwrap_or(0) {
                distance_map.set(nx, ny, next);
                heap.push(Reverse((next, nx, ny)));
            }
        }
    }
}

/// Shortest walking distance between two cells, treating any tile carrying
/// `blockers` as forbidden. Returns [`UNREACHABLE`] when no path exists.
pub fn pathing_distance(
    grid: &Grid<Cell>,
    from: (i32, i32),
    to: (i32, i32),
    blockers: TileFlags,
) -> i32 {
    let (w, h) = (grid.width(), grid.height());
    let mut cost_map: Grid<i32> = Grid::filled(w, h, 1);
    for (x, y, c) in grid.iter() {
        if c.has_tile_flag(blockers) {
            cost_map.set(x as i32, y as i32, PDS_FORBIDDEN);
        } else if c.has_tile_flag(TileFlags::OBSTRUCTS_DIAGONAL_MOVEMENT) {
            // Doors: walkable straight through, never around the corner.
            cost_map.set(x as i32, y as i32, PDS_OBSTRUCTION);
        }
    }
    // Endpoints are traversable by fiat; the caller asks about them knowingly.
    cost_map.set(from.0, from.1, 1);
    cost_map.set(to.0, to.1, 1);

    let mut distance_map: Grid<i32> = Grid::filled(w, h, UNREACHABLE);
    distance_map.set(to.0, to.1, 0);
    dijkstra_scan(&mut distance_map, &cost_map, true);
    distance_map.get(from.0, from.1).unwrap_or(UNREACHABLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_finds_straight_line_distance() {
        let cost: Grid<i32> = Grid::filled(10, 1, 1);
        let mut dist: Grid<i32> = Grid::filled(10, 1, UNREACHABLE);
        dist.set(0, 0, 0);
        dijkstra_scan(&mut dist, &cost, false);
        assert_eq!(dist.get(9, 0), Some(9));
    }

    #[test]
    fn forbidden_cells_split_the_map() {
        let mut cost: Grid<i32> = Grid::filled(10, 1, 1);
        cost.set(5, 0, PDS_FORBIDDEN);
        let mut dist: Grid<i32> = Grid::filled(10, 1, UNREACHABLE);
        dist.set(0, 0, 0);
        dijkstra_scan(&mut dist, &cost, false);
        assert_eq!(dist.get(9, 0), Some(UNREACHABLE));
    }

    #[test]
    fn obstructions_block_diagonal_cuts_but_not_entry() {
        // 2x2 with obstructions at (1,0) and (0,1): the diagonal from (0,0)
        // to (1,1) is barred, but walking through an obstruction cell
        // orthogonally still works, so the corner costs two steps.
        let mut cost: Grid<i32> = Grid::filled(2, 2, 1);
        cost.set(1, 0, PDS_OBSTRUCTION);
        cost.set(0, 1, PDS_OBSTRUCTION);
        let mut dist: Grid<i32> = Grid::filled(2, 2, UNREACHABLE);
        dist.set(0, 0, 0);
        dijkstra_scan(&mut dist, &cost, true);
        assert_eq!(dist.get(1, 0), Some(1));
        assert_eq!(dist.get(1, 1), Some(2));
    }

    #[test]
    fn obstruction_in_a_corridor_is_walkable_straight_through() {
        let mut cost: Grid<i32> = Grid::filled(5, 1, 1);
        cost.set(2, 0, PDS_OBSTRUCTION);
        let mut dist: Grid<i32> = Grid::filled(5, 1, UNREACHABLE);
        dist.set(0, 0, 0);
        dijkstra_scan(&mut dist, &cost, false);
        assert_eq!(dist.get(4, 0), Some(4));
    }

    #[test]
    fn pathing_distance_passes_through_doors() {
        use crate::cell::Layer;
        use crate::tiles::TileType;
        let mut grid: Grid<Cell> = Grid::new(7, 3);
        for x in 1..6 {
            grid.get_mut(x, 1).unwrap().clear_to_floor();
        }
        grid.get_mut(3, 1).unwrap().set_tile(Layer::Dungeon, TileType::Door);
        let d = pathing_distance(&grid, (1, 1), (5, 1), TileFlags::PATHING_BLOCKER);
        assert_eq!(d, 4);
    }
}
