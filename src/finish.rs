//! Wall, door, and diagonal-opening finishing passes.

use crate::cell::{Cell, CellFlags, Layer};
use crate::grid::Grid;
use crate::rng::Rng;
use crate::tiles::{TileFlags, TileType};

/// A cell "exposes" its neighbors when it neither blocks movement nor sight.
fn exposes(grid: &Grid<Cell>, x: i32, y: i32) -> bool {
    match grid.get(x, y) {
        Some(c) => {
            let f = c.tile_flags();
            !f.contains(TileFlags::OBSTRUCTS_PASSABILITY)
                || !f.contains(TileFlags::OBSTRUCTS_VISION)
        }
        None => false,
    }
}

/// Promote granite that touches anything exposed into finished wall, and
/// demote finished wall that touches nothing back to granite. The first
/// pass (before lakes) looks only at cardinal neighbors; the final pass
/// includes diagonals.
pub fn finish_walls(grid: &mut Grid<Cell>, include_diagonals: bool) {
    let (w, h) = (grid.width() as i32, grid.height() as i32);
    for y in 0..h {
        for x in 0..w {
            let tile = grid[(x as usize, y as usize)].tile(Layer::Dungeon);
            if tile != TileType::Granite && tile != TileType::Wall {
                continue;
            }
            let mut exposed = false;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    if !include_diagonals && dx != 0 && dy != 0 {
                        continue;
                    }
                    if exposes(grid, x + dx, y + dy) {
                        exposed = true;
                    }
                }
            }
            let promoted = if exposed { TileType::Wall } else { TileType::Granite };
            if promoted != tile {
                grid.get_mut(x, y).unwrap().set_tile(Layer::Dungeon, promoted);
            }
        }
    }
}

/// Iterate to fixed point removing diagonal-only openings: wherever a 2x2
/// square is passable on exactly one diagonal and wall on the other, demote
/// one wall cell (fair coin) by copying its row-neighbor's layers onto it.
/// Protected cells (monster or machine) are skipped, not retried.
pub fn remove_diagonal_openings(grid: &mut Grid<Cell>, rng: &mut Rng) {
    let (w, h) = (grid.width() as i32, grid.height() as i32);
    let blocks = |grid: &Grid<Cell>, x: i32, y: i32, f: TileFlags| {
        grid.get(x, y)
            .map(|c| c.tile(Layer::Dungeon).flags().contains(f))
            .unwrap_or(true)
    };
    loop {
        let mut removed = false;
        for y in 0..h - 1 {
            for x in 0..w - 1 {
                for k in 0..=1i32 {
                    // Passable at (x+k, y) and (x+1-k, y+1); full diagonal
                    // blockers on the opposite corners.
                    if !blocks(grid, x + k, y, TileFlags::OBSTRUCTS_PASSABILITY)
                        && blocks(grid, x + 1 - k, y, TileFlags::OBSTRUCTS_PASSABILITY)
                        && blocks(grid, x + 1 - k, y, TileFlags::OBSTRUCTS_DIAGONAL_MOVEMENT)
                        && blocks(grid, x + k, y + 1, TileFlags::OBSTRUCTS_PASSABILITY)
                        && blocks(grid, x + k, y + 1, TileFlags::OBSTRUCTS_DIAGONAL_MOVEMENT)
                        && !blocks(grid, x + 1 - k, y + 1, TileFlags::OBSTRUCTS_PASSABILITY)
                    {
                        let (tx, sx, ty) = if rng.rand_percent(50) {
                            (x + 1 - k, x + k, y)
                        } else {
                            (x + k, x + 1 - k, y + 1)
                        };
                        let target = grid[(tx as usize, ty as usize)];
                        if target.flags.contains(CellFlags::HAS_MONSTER)
                            || target.machine_number != 0
                        {
                            continue;
                        }
                        let source_layers = grid[(sx as usize, ty as usize)].layers;
                        grid.get_mut(tx, ty).unwrap().layers = source_layers;
                        removed = true;
                    }
                }
            }
        }
        if !removed {
            break;
        }
    }
}

/// Remove orphaned and dead-end doors; convert a depth-scaled share of the
/// survivors into secret doors. Machine cells are left alone.
pub fn finish_doors(grid: &mut Grid<Cell>, depth: i32, amulet_level: i32, rng: &mut Rng) {
    let (w, h) = (grid.width() as i32, grid.height() as i32);
    let secret_chance = (67 * (depth - 1) / (amulet_level - 1)).clamp(0, 67);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let cell = grid[(x as usize, y as usize)];
            if cell.tile(Layer::Dungeon) != TileType::Door || cell.machine_number != 0 {
                continue;
            }
            let open_x = !grid.has_terrain_flag(x + 1, y, TileFlags::OBSTRUCTS_PASSABILITY)
                || !grid.has_terrain_flag(x - 1, y, TileFlags::OBSTRUCTS_PASSABILITY);
            let open_y = !grid.has_terrain_flag(x, y + 1, TileFlags::OBSTRUCTS_PASSABILITY)
                || !grid.has_terrain_flag(x, y - 1, TileFlags::OBSTRUCTS_PASSABILITY);
            let blocker_count = [(1, 0), (-1, 0), (0, 1), (0, -1)]
                .iter()
                .filter(|&&(dx, dy)| grid.has_terrain_flag(x + dx, y + dy, TileFlags::PATHING_BLOCKER))
                .count();
            if open_x && open_y {
                // Passable on both axes: an orphan, not a doorway.
                grid.get_mut(x, y).unwrap().set_tile(Layer::Dungeon, TileType::Floor);
            } else if blocker_count >= 3 {
                // Dead-end door.
                grid.get_mut(x, y).unwrap().set_tile(Layer::Dungeon, TileType::Floor);
            } else if rng.rand_percent(secret_chance) {
                grid.get_mut(x, y).unwrap().set_tile(Layer::Dungeon, TileType::SecretDoor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with_floor(coords: &[(i32, i32)]) -> Grid<Cell> {
        let mut g: Grid<Cell> = Grid::new(10, 10);
        for &(x, y) in coords {
            g.get_mut(x, y).unwrap().clear_to_floor();
        }
        g
    }

    #[test]
    fn walls_form_around_floor() {
        let mut g = grid_with_floor(&[(5, 5)]);
        finish_walls(&mut g, false);
        assert_eq!(g[(4, 5)].tile(Layer::Dungeon), TileType::Wall);
        assert_eq!(g[(5, 4)].tile(Layer::Dungeon), TileType::Wall);
        // Diagonals stay granite on the cardinal pass.
        assert_eq!(g[(4, 4)].tile(Layer::Dungeon), TileType::Granite);
        finish_walls(&mut g, true);
        assert_eq!(g[(4, 4)].tile(Layer::Dungeon), TileType::Wall);
    }

    #[test]
    fn diagonal_openings_are_sealed() {
        // Passable at (4,5) and (5,4); blocked at (4,4) and (5,5).
        let mut g = grid_with_floor(&[(4, 5), (5, 4)]);
        let mut rng = Rng::new(1);
        remove_diagonal_openings(&mut g, &mut rng);
        let a = g[(4, 4)].is_passable();
        let b = g[(5, 5)].is_passable();
        assert!(a || b, "one of the two corners must open");
    }

    #[test]
    fn orphan_doors_become_floor() {
        let mut g = grid_with_floor(&[(4, 5), (6, 5), (5, 4), (5, 6)]);
        g.get_mut(5, 5).unwrap().clear_to_floor();
        g.get_mut(5, 5).unwrap().set_tile(Layer::Dungeon, TileType::Door);
        let mut rng = Rng::new(1);
        finish_doors(&mut g, 1, 26, &mut rng);
        assert_eq!(g[(5, 5)].tile(Layer::Dungeon), TileType::Floor);
    }

    #[test]
    fn dead_end_doors_become_floor() {
        let mut g = grid_with_floor(&[(5, 4)]);
        g.get_mut(5, 5).unwrap().clear_to_floor();
        g.get_mut(5, 5).unwrap().set_tile(Layer::Dungeon, TileType::Door);
        let mut rng = Rng::new(1);
        finish_doors(&mut g, 1, 26, &mut rng);
        assert_eq!(g[(5, 5)].tile(Layer::Dungeon), TileType::Floor);
    }
}
