//! Bridge discovery and paving across bridgeable terrain (chasms).
//!
//! One bridge per call; the driver keeps calling until nothing fits. A span
//! is only worth paving when the walk around it is much longer than the walk
//! across it, with the required detour ratio scaling by depth.

use crate::cell::{Cell, Layer};
use crate::dijkstra::pathing_distance;
use crate::grid::Grid;
use crate::rng::{fill_sequential_list, Rng};
use crate::tiles::{TileFlags, TileMechFlags, TileType};

const MIN_BRIDGE_SPAN: i32 = 3;

/// Attempt to build one bridge; returns whether one was paved.
pub fn build_a_bridge(grid: &mut Grid<Cell>, depth: i32, rng: &mut Rng) -> bool {
    let (w, h) = (grid.width() as i32, grid.height() as i32);
    let bridge_ratio_x = 100 + (100 + 100 * depth / 9) * rng.rand_range(10, 20) / 10;
    let bridge_ratio_y = 100 + (400 + 100 * depth / 18) * rng.rand_range(10, 20) / 10;

    let mut cols: Vec<i32> = vec![0; w as usize];
    let mut rows: Vec<i32> = vec![0; h as usize];
    fill_sequential_list(&mut cols);
    fill_sequential_list(&mut rows);
    rng.shuffle(&mut cols);
    rng.shuffle(&mut rows);

    for &i in &cols {
        if i < 1 || i >= w - 1 {
            continue;
        }
        for &j in &rows {
            if j < 1 || j >= h - 1 {
                continue;
            }
            if grid.has_terrain_flag(i, j, TileFlags::PATHING_BLOCKER)
                || grid[(i as usize, j as usize)].machine_number != 0
            {
                continue;
            }
            if try_span(grid, (i, j), (1, 0), bridge_ratio_x) {
                return true;
            }
            if try_span(grid, (i, j), (0, 1), bridge_ratio_y) {
                return true;
            }
        }
    }
    false
}

/// Walk from `start` along `dir` over bridgeable terrain and pave if the
/// span qualifies.
fn try_span(grid: &mut Grid<Cell>, start: (i32, i32), dir: (i32, i32), ratio: i32) -> bool {
    let (sx, sy) = start;
    let (dx, dy) = dir;
    // The banks flanking the walk direction.
    let (px, py) = (dy, dx);

    let mut found_exposure = false;
    let (mut x, mut y) = (sx + dx, sy + dy);
    while grid.in_bounds(x, y)
        && grid.has_terrain_flag(x, y, TileFlags::CAN_BE_BRIDGED)
        && !grid.has_mech_flag_at(x, y, TileMechFlags::IS_SECRET)
        && grid[(x as usize, y as usize)].machine_number == 0
        && grid.has_terrain_flag(x - px, y - py, TileFlags::CAN_BE_BRIDGED | TileFlags::OBSTRUCTS_PASSABILITY)
        && grid.has_terrain_flag(x + px, y + py, TileFlags::CAN_BE_BRIDGED | TileFlags::OBSTRUCTS_PASSABILITY)
    {
        if !grid.has_terrain_flag(x - px, y - py, TileFlags::OBSTRUCTS_PASSABILITY)
            || !grid.has_terrain_flag(x + px, y + py, TileFlags::OBSTRUCTS_PASSABILITY)
        {
            found_exposure = true;
        }
        x += dx;
        y += dy;
    }

    let span = (x - sx).abs() + (y - sy).abs();
    if !grid.in_bounds(x, y)
        || span <= MIN_BRIDGE_SPAN
        || !found_exposure
        || grid.has_terrain_flag(x, y, TileFlags::PATHING_BLOCKER | TileFlags::CAN_BE_BRIDGED)
        || grid[(x as usize, y as usize)].machine_number != 0
    {
        return false;
    }
    let walk_around = pathing_distance(grid, (sx, sy), (x, y), TileFlags::PATHING_BLOCKER);
    if 100 * walk_around / span <= ratio {
        return false;
    }

    let (mut bx, mut by) = (sx + dx, sy + dy);
    while (bx, by) != (x, y) {
        grid.get_mut(bx, by).unwrap().set_tile(Layer::Liquid, TileType::Bridge);
        bx += dx;
        by += dy;
    }
    grid.get_mut(sx, sy).unwrap().set_tile(Layer::Surface, TileType::BridgeEdge);
    grid.get_mut(x, y).unwrap().set_tile(Layer::Surface, TileType::BridgeEdge);
    log::debug!("bridge paved: span {} at ratio {}", span, ratio);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A chasm strip crossed only by a long detour along the bottom row:
    /// crossing is 7 steps, walking around is up to 27, so at least the
    /// topmost rows always beat the detour ratio.
    fn chasm_level() -> Grid<Cell> {
        let mut g: Grid<Cell> = Grid::new(30, 13);
        for y in 1..=11 {
            for x in 1..29 {
                g.get_mut(x, y).unwrap().clear_to_floor();
            }
        }
        for y in 1..=10 {
            for x in 12..=17 {
                let c = g.get_mut(x, y).unwrap();
                c.set_tile(Layer::Liquid, TileType::Chasm);
            }
        }
        g
    }

    #[test]
    fn bridge_paves_across_the_chasm() {
        let mut g = chasm_level();
        let mut rng = Rng::new(21);
        assert!(build_a_bridge(&mut g, 1, &mut rng), "a bridge should fit here");
        let paved = g.iter().filter(|&(_, _, c)| c.tile(Layer::Liquid) == TileType::Bridge).count();
        assert!(paved >= MIN_BRIDGE_SPAN as usize);
    }

    #[test]
    fn failed_bridge_call_leaves_grid_untouched() {
        let mut g: Grid<Cell> = Grid::new(20, 11);
        for y in 1..10 {
            for x in 1..19 {
                g.get_mut(x, y).unwrap().clear_to_floor();
            }
        }
        let before = g.clone();
        let mut rng = Rng::new(3);
        assert!(!build_a_bridge(&mut g, 5, &mut rng), "no chasm, no bridge");
        assert_eq!(g, before);
    }
}
