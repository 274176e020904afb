//! Cellular-automata blob generation.
//!
//! Seeds a rectangle with noise, runs a birth/survival automaton for a few
//! rounds, and keeps the largest connected component if its bounding box
//! falls inside the requested size window. Lakes and cavern rooms both grow
//! from here.

use crate::grid::Grid;
use crate::rng::Rng;

#[derive(Debug, Clone, Copy)]
pub struct BlobParams {
    pub rounds: i32,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub percent_seeded: i32,
    /// Indexed by live-neighbor count 0..=8: `'t'` means a dead cell is born.
    pub birth: &'static str,
    /// Indexed by live-neighbor count 0..=8: `'t'` means a live cell survives.
    pub survival: &'static str,
}

/// Bounding box of the accepted blob, in grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobBounds {
    pub min_x: i32,
    pub min_y: i32,
    pub width: i32,
    pub height: i32,
}

const BLOB_FAIL_SAFE: i32 = 500;

/// Grow one connected blob of `1`s on `grid` (everything else zeroed).
/// Returns its bounding box, or `None` if no acceptable blob emerged within
/// the fail-safe budget.
pub fn create_blob_on_grid(
    grid: &mut Grid<i16>,
    rng: &mut Rng,
    params: &BlobParams,
) -> Option<BlobBounds> {
    let birth: Vec<bool> = params.birth.bytes().map(|b| b == b't').collect();
    let survival: Vec<bool> = params.survival.bytes().map(|b| b == b't').collect();

    for _ in 0..BLOB_FAIL_SAFE {
        grid.fill(0);
        for y in 0..params.max_height {
            for x in 0..params.max_width {
                if rng.rand_percent(params.percent_seeded) {
                    grid.set(x, y, 1);
                }
            }
        }

        for _ in 0..params.rounds {
            let snapshot = grid.clone();
            for y in 0..params.max_height {
                for x in 0..params.max_width {
                    let n = live_neighbors(&snapshot, x, y);
                    let alive = snapshot.get(x, y) == Some(1);
                    let next = if alive {
                        *survival.get(n).unwrap_or(&false)
                    } else {
                        *birth.get(n).unwrap_or(&false)
                    };
                    grid.set(x, y, i16::from(next));
                }
            }
        }

        if let Some(bounds) = isolate_largest_blob(grid) {
            if bounds.width >= params.min_width && bounds.height >= params.min_height {
                return Some(bounds);
            }
        }
    }
    None
}

fn live_neighbors(grid: &Grid<i16>, x: i32, y: i32) -> usize {
    let mut count = 0;
    for dy in -1..=1 {
        for dx in -1..=1 {
            if (dx != 0 || dy != 0) && grid.get(x + dx, y + dy) == Some(1) {
                count += 1;
            }
        }
    }
    count
}

/// Label components, erase all but the largest, renumber it to `1`, and
/// return its bounding box.
fn isolate_largest_blob(grid: &mut Grid<i16>) -> Option<BlobBounds> {
    let mut best_label = 0i16;
    let mut best_size = 0u32;
    let mut label = 2i16;
    for y in 0..grid.height() as i32 {
        for x in 0..grid.width() as i32 {
            if grid.get(x, y) == Some(1) {
                let size = grid.flood_fill(x, y, |v| v == 1, label);
                if size > best_size {
                    best_size = size;
                    best_label = label;
                }
                label += 1;
            }
        }
    }
    if best_size == 0 {
        return None;
    }

    let (mut min_x, mut min_y) = (grid.width() as i32, grid.height() as i32);
    let (mut max_x, mut max_y) = (0, 0);
    for y in 0..grid.height() as i32 {
        for x in 0..grid.width() as i32 {
            let v = grid.get(x, y).unwrap_or(0);
            if v == best_label {
                grid.set(x, y, 1);
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            } else if v != 0 {
                grid.set(x, y, 0);
            }
        }
    }
    Some(BlobBounds {
        min_x,
        min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAKE_PARAMS: BlobParams = BlobParams {
        rounds: 5,
        min_width: 4,
        min_height: 4,
        max_width: 26,
        max_height: 12,
        percent_seeded: 55,
        birth: "ffffftttt",
        survival: "ffffttttt",
    };

    #[test]
    fn blob_is_single_connected_component() {
        let mut grid: Grid<i16> = Grid::new(30, 15);
        let mut rng = Rng::new(42);
        let bounds = create_blob_on_grid(&mut grid, &mut rng, &LAKE_PARAMS).unwrap();
        assert!(bounds.width >= 4 && bounds.height >= 4);

        // Flood from any live cell reaches every live cell.
        let total = grid.count(|v| v == 1) as u32;
        let (sx, sy, _) = grid.iter().find(|&(_, _, v)| v == 1).unwrap();
        let mut scratch = grid.clone();
        let reached = scratch.flood_fill(sx as i32, sy as i32, |v| v == 1, 2);
        assert_eq!(reached, total);
    }

    #[test]
    fn blob_respects_bounding_box() {
        let mut grid: Grid<i16> = Grid::new(30, 15);
        let mut rng = Rng::new(7);
        let bounds = create_blob_on_grid(&mut grid, &mut rng, &LAKE_PARAMS).unwrap();
        for (x, y, v) in grid.iter() {
            if v == 1 {
                assert!((x as i32) >= bounds.min_x && (x as i32) < bounds.min_x + bounds.width);
                assert!((y as i32) >= bounds.min_y && (y as i32) < bounds.min_y + bounds.height);
            }
        }
    }
}
