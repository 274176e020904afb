//! Map analysis: loop membership, chokepoints, and gate sites.
//!
//! The choke map scores every passable cell with the size of the pocket that
//! would be cut off if that cell were blocked ([`crate::dijkstra::UNREACHABLE`]
//! when blocking it cuts off nothing). Room machines anchor on gate sites and
//! flood their interiors along non-increasing choke values.

use crate::cell::{Cell, CellFlags};
use crate::dijkstra::UNREACHABLE;
use crate::grid::Grid;

const RING: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];
const CARDINALS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

fn arc_count(map: &Grid<i16>, x: i32, y: i32) -> i32 {
    let mut transitions = 0;
    for dir in 0..8 {
        let (ox, oy) = RING[(dir + 7) % 8];
        let (nx, ny) = RING[dir];
        let old = map.get(x + ox, y + oy).unwrap_or(0) > 0;
        let new = map.get(x + nx, y + ny).unwrap_or(0) > 0;
        if old != new {
            transitions += 1;
        }
    }
    transitions / 2
}

/// Recompute `IN_LOOP`, `IS_CHOKEPOINT`, `IS_GATE_SITE`, and (optionally)
/// `choke_map` across the passable cells of the level.
pub fn analyze_map(grid: &mut Grid<Cell>, choke_map: &mut Grid<i32>, calculate_choke_map: bool) {
    let (w, h) = (grid.width() as i32, grid.height() as i32);

    let mut pass_map: Grid<i16> = Grid::new(w as usize, h as usize);
    for (x, y, c) in grid.iter() {
        if c.is_passable_or_door() {
            pass_map.set(x as i32, y as i32, 1);
        }
    }

    for y in 0..h {
        for x in 0..w {
            grid.get_mut(x, y).unwrap().flags.remove(
                CellFlags::IN_LOOP | CellFlags::IS_CHOKEPOINT | CellFlags::IS_GATE_SITE,
            );
        }
    }

    // Dead-end stripping: remove passable cells with at most one passable
    // arc until stable. Whatever survives lies on a loop.
    let mut loop_map = pass_map.clone();
    loop {
        let mut stripped = false;
        for y in 0..h {
            for x in 0..w {
                if loop_map.get(x, y) == Some(1) && arc_count(&loop_map, x, y) <= 1 {
                    loop_map.set(x, y, 0);
                    stripped = true;
                }
            }
        }
        if !stripped {
            break;
        }
    }
    for (x, y, v) in loop_map.iter() {
        if v == 1 {
            grid.get_mut(x as i32, y as i32).unwrap().flags |= CellFlags::IN_LOOP;
        }
    }

    if !calculate_choke_map {
        return;
    }

    choke_map.fill(UNREACHABLE);
    let mut scratch: Grid<i16> = Grid::new(w as usize, h as usize);
    for y in 0..h {
        for x in 0..w {
            if pass_map.get(x, y) != Some(1)
                || loop_map.get(x, y) == Some(1)
                || arc_count(&pass_map, x, y) < 2
            {
                continue;
            }
            // Block the cell and label the components among its cardinal
            // neighbors.
            scratch.copy_from(&pass_map);
            scratch.set(x, y, 0);
            let mut components: Vec<(i16, u32)> = Vec::new();
            let mut label = 2i16;
            for (dx, dy) in CARDINALS {
                let (nx, ny) = (x + dx, y + dy);
                if scratch.get(nx, ny) == Some(1) {
                    let size = scratch.flood_fill(nx, ny, |v| v == 1, label);
                    components.push((label, size));
                    label += 1;
                }
            }
            if components.len() < 2 {
                continue;
            }
            // The smallest disconnected side is the pocket this cell guards.
            let (pocket_label, pocket_size) =
                *components.iter().min_by_key(|&&(_, size)| size).unwrap();
            let pocket_size = pocket_size as i32;

            let cell_flags = &mut grid.get_mut(x, y).unwrap().flags;
            *cell_flags |= CellFlags::IS_CHOKEPOINT | CellFlags::IS_GATE_SITE;
            if pocket_size < choke_map.get(x, y).unwrap_or(UNREACHABLE) {
                choke_map.set(x, y, pocket_size);
            }
            for (px, py, v) in scratch.iter() {
                if v == pocket_label && pocket_size < choke_map[(px, py)] {
                    choke_map.set(px as i32, py as i32, pocket_size);
                }
            }
        }
    }
}

/// Would blocking every marked cell of `blocking_map` split the walkable
/// level? Returns the size of the smallest region that gets cut off, or `0`
/// when the level stays connected (or has no walkable cells left).
pub fn level_is_disconnected_with(grid: &Grid<Cell>, blocking_map: &Grid<i16>) -> u32 {
    let (w, h) = (grid.width() as i32, grid.height() as i32);
    let mut pass_map: Grid<i16> = Grid::new(w as usize, h as usize);
    for (x, y, c) in grid.iter() {
        if c.is_passable_or_door() && blocking_map.get(x as i32, y as i32).unwrap_or(0) == 0 {
            pass_map.set(x as i32, y as i32, 1);
        }
    }
    let mut sizes: Vec<u32> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if pass_map.get(x, y) == Some(1) {
                sizes.push(pass_map.flood_fill(x, y, |v| v == 1, 2));
            }
        }
    }
    if sizes.len() < 2 {
        return 0;
    }
    sizes.sort_unstable();
    sizes[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two rooms joined by a single corridor: the corridor cells are
    /// chokepoints; nothing is on a loop.
    fn dumbbell() -> Grid<Cell> {
        let mut g: Grid<Cell> = Grid::new(21, 9);
        for y in 2..7 {
            for x in 2..7 {
                g.get_mut(x, y).unwrap().clear_to_floor();
            }
        }
        for y in 2..7 {
            for x in 14..19 {
                g.get_mut(x, y).unwrap().clear_to_floor();
            }
        }
        for x in 7..14 {
            g.get_mut(x, 4).unwrap().clear_to_floor();
        }
        g
    }

    #[test]
    fn corridor_cells_are_chokepoints() {
        let mut g = dumbbell();
        let mut choke: Grid<i32> = Grid::new(21, 9);
        analyze_map(&mut g, &mut choke, true);
        assert!(g[(10, 4)].flags.contains(CellFlags::IS_CHOKEPOINT));
        assert!(g[(10, 4)].flags.contains(CellFlags::IS_GATE_SITE));
        // The pocket behind the middle of the corridor is a room plus half
        // the corridor: strictly smaller than the whole level.
        let v = choke[(10, 4)];
        assert!(v > 0 && v < 40, "choke value {} should be a pocket size", v);
    }

    #[test]
    fn room_interiors_are_not_chokepoints() {
        let mut g = dumbbell();
        let mut choke: Grid<i32> = Grid::new(21, 9);
        analyze_map(&mut g, &mut choke, true);
        assert!(!g[(3, 3)].flags.contains(CellFlags::IS_CHOKEPOINT));
    }

    #[test]
    fn ring_corridor_is_a_loop() {
        let mut g: Grid<Cell> = Grid::new(11, 11);
        for i in 2..9 {
            g.get_mut(i, 2).unwrap().clear_to_floor();
            g.get_mut(i, 8).unwrap().clear_to_floor();
            g.get_mut(2, i).unwrap().clear_to_floor();
            g.get_mut(8, i).unwrap().clear_to_floor();
        }
        let mut choke: Grid<i32> = Grid::new(11, 11);
        analyze_map(&mut g, &mut choke, true);
        assert!(g[(2, 5)].flags.contains(CellFlags::IN_LOOP));
        assert!(!g[(2, 5)].flags.contains(CellFlags::IS_CHOKEPOINT));
    }
}
