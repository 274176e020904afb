//! Blob-shaped lakes: placement with a connectivity acceptance test, liquid
//! fill with a shallow wreath, and boundary cleanup.

use crate::blob::{create_blob_on_grid, BlobParams};
use crate::cell::{Cell, CellFlags, Layer};
use crate::grid::Grid;
use crate::rng::{fill_sequential_list, Rng};
use crate::tiles::{TileFlags, TileMechFlags, TileType};

const LAKE_PLACEMENT_ATTEMPTS: i32 = 20;
const LAKE_SCAN_WIDTH: i32 = 4;

fn lake_blob_params(max_width: i32, max_height: i32) -> BlobParams {
    BlobParams {
        rounds: 5,
        min_width: 4,
        min_height: 4,
        max_width,
        max_height,
        percent_seeded: 55,
        birth: "ffffftttt",
        survival: "ffffttttt",
    }
}

/// Place blobs of descending size wherever they fit without disconnecting
/// the level. Accepted cells are marked `1` in `lake_map` and their dungeon
/// layer cleared to floor (the liquid arrives in [`fill_lakes`]).
pub fn design_lakes(grid: &mut Grid<Cell>, lake_map: &mut Grid<i16>, rng: &mut Rng) {
    lake_map.fill(0);
    let (w, h) = (grid.width(), grid.height());
    let mut blob_grid: Grid<i16> = Grid::new(w, h);

    let mut max_height = 15;
    let mut max_width = 30;
    while max_height >= 10 {
        let Some(bounds) =
            create_blob_on_grid(&mut blob_grid, rng, &lake_blob_params(max_width, max_height))
        else {
            max_height -= 1;
            max_width -= 2;
            continue;
        };
        for _ in 0..LAKE_PLACEMENT_ATTEMPTS {
            let dx = rng.rand_range(1 - bounds.min_x, w as i32 - bounds.width - bounds.min_x - 2);
            let dy = rng.rand_range(1 - bounds.min_y, h as i32 - bounds.height - bounds.min_y - 2);
            if !lake_disrupts_passability(grid, lake_map, &blob_grid, dx, dy) {
                for (x, y, v) in blob_grid.iter() {
                    if v == 1 {
                        let (gx, gy) = (x as i32 + dx, y as i32 + dy);
                        lake_map.set(gx, gy, 1);
                        if let Some(cell) = grid.get_mut(gx, gy) {
                            cell.set_tile(Layer::Dungeon, TileType::Floor);
                        }
                    }
                }
                log::debug!("lake accepted: {}x{} blob", bounds.width, bounds.height);
                break;
            }
        }
        max_height -= 1;
        max_width -= 2;
    }
}

/// Would stamping `blob_grid` at offset `(dx, dy)` split the walkable level?
pub fn lake_disrupts_passability(
    grid: &Grid<Cell>,
    lake_map: &Grid<i16>,
    blob_grid: &Grid<i16>,
    dx: i32,
    dy: i32,
) -> bool {
    let (w, h) = (grid.width() as i32, grid.height() as i32);
    let in_blob = |x: i32, y: i32| blob_grid.get(x - dx, y - dy) == Some(1);
    let open = |x: i32, y: i32| -> bool {
        let Some(cell) = grid.get(x, y) else { return false };
        (!cell.has_tile_flag(TileFlags::PATHING_BLOCKER)
            || cell.has_mech_flag(TileMechFlags::CONNECTS_LEVEL))
            && lake_map.get(x, y) == Some(0)
            && !in_blob(x, y)
    };

    // Flood from any walkable cell outside the candidate lake.
    let mut mark: Grid<i16> = Grid::new(w as usize, h as usize);
    let mut seed = None;
    'outer: for y in 0..h {
        for x in 0..w {
            if open(x, y) && grid.cell_is_passable_or_door(x, y) {
                seed = Some((x, y));
                break 'outer;
            }
        }
    }
    let Some((sx, sy)) = seed else {
        return true;
    };
    let mut stack = vec![(sx, sy)];
    mark.set(sx, sy, 1);
    while let Some((cx, cy)) = stack.pop() {
        for (nx, ny) in [(cx - 1, cy), (cx + 1, cy), (cx, cy - 1), (cx, cy + 1)] {
            if mark.get(nx, ny) == Some(0) && open(nx, ny) {
                mark.set(nx, ny, 1);
                stack.push((nx, ny));
            }
        }
    }

    for y in 0..h {
        for x in 0..w {
            if open(x, y) && grid.cell_is_passable_or_door(x, y) && mark.get(x, y) == Some(0) {
                return true;
            }
        }
    }
    false
}

/// The liquid family for this depth: `(deep, wreath, wreath width)`.
/// Water is forced on the deepest level so the portal is always reachable.
pub fn liquid_type(
    depth: i32,
    deepest_level: i32,
    minimum_lava_level: i32,
    minimum_brimstone_level: i32,
    rng: &mut Rng,
) -> (TileType, Option<TileType>, i32) {
    let lo = if depth < minimum_lava_level { 1 } else { 0 };
    let hi = if depth < minimum_brimstone_level { 2 } else { 3 };
    let mut roll = rng.rand_range(lo, hi);
    if depth == deepest_level {
        roll = 1;
    }
    match roll {
        0 => (TileType::Lava, None, 0),
        1 => (TileType::DeepWater, Some(TileType::ShallowWater), 2),
        2 => (TileType::Chasm, Some(TileType::ChasmEdge), 1),
        _ => (TileType::InertBrimstone, Some(TileType::Obsidian), 2),
    }
}

/// Flood every designed lake with its liquid, then paint the wreath.
pub fn fill_lakes(
    grid: &mut Grid<Cell>,
    lake_map: &mut Grid<i16>,
    depth: i32,
    deepest_level: i32,
    minimum_lava_level: i32,
    minimum_brimstone_level: i32,
    rng: &mut Rng,
) {
    let (deep, shallow, wreath_width) =
        liquid_type(depth, deepest_level, minimum_lava_level, minimum_brimstone_level, rng);
    let (w, h) = (grid.width(), grid.height());
    let mut wreath_map: Grid<i16> = Grid::new(w, h);

    // Shuffled scan order so lakes fill in random rather than reading order.
    let mut rows: Vec<i32> = vec![0; h];
    let mut cols: Vec<i32> = vec![0; w];
    fill_sequential_list(&mut rows);
    fill_sequential_list(&mut cols);
    rng.shuffle(&mut rows);
    rng.shuffle(&mut cols);

    for &j in &rows {
        for &i in &cols {
            if lake_map.get(i, j) == Some(1) {
                fill_lake(grid, lake_map, &mut wreath_map, i, j, deep);
            }
        }
    }

    if let Some(shallow) = shallow {
        create_wreath(grid, &wreath_map, shallow, wreath_width);
    }
}

/// Flood one lake from `(x, y)`: each step claims every unfilled lake cell
/// inside a 9x9 window. Explicit stack; semantics match the recursion.
fn fill_lake(
    grid: &mut Grid<Cell>,
    lake_map: &mut Grid<i16>,
    wreath_map: &mut Grid<i16>,
    x: i32,
    y: i32,
    deep: TileType,
) {
    let mut stack = vec![(x, y)];
    lake_map.set(x, y, 2);
    stamp_lake_cell(grid, wreath_map, x, y, deep);
    while let Some((cx, cy)) = stack.pop() {
        for j in cy - LAKE_SCAN_WIDTH..=cy + LAKE_SCAN_WIDTH {
            for i in cx - LAKE_SCAN_WIDTH..=cx + LAKE_SCAN_WIDTH {
                if lake_map.get(i, j) == Some(1) {
                    lake_map.set(i, j, 2);
                    stamp_lake_cell(grid, wreath_map, i, j, deep);
                    stack.push((i, j));
                }
            }
        }
    }
}

fn stamp_lake_cell(grid: &mut Grid<Cell>, wreath_map: &mut Grid<i16>, x: i32, y: i32, deep: TileType) {
    if let Some(cell) = grid.get_mut(x, y) {
        cell.set_tile(Layer::Liquid, deep);
    }
    wreath_map.set(x, y, 1);
}

/// Paint the shallow liquid on every empty liquid cell within Euclidean
/// distance `width` of the lake proper. Doors drowned by the wreath revert
/// to floor.
fn create_wreath(grid: &mut Grid<Cell>, wreath_map: &Grid<i16>, shallow: TileType, width: i32) {
    for (x, y, marked) in wreath_map.iter() {
        if marked != 1 {
            continue;
        }
        let (i, j) = (x as i32, y as i32);
        for l in j - width..=j + width {
            for k in i - width..=i + width {
                if (i - k) * (i - k) + (j - l) * (j - l) > width * width {
                    continue;
                }
                let Some(cell) = grid.get_mut(k, l) else { continue };
                if cell.tile(Layer::Liquid) == TileType::Nothing {
                    cell.set_tile(Layer::Liquid, shallow);
                    if cell.tile(Layer::Dungeon) == TileType::Door {
                        cell.set_tile(Layer::Dungeon, TileType::Floor);
                    }
                }
            }
        }
    }
}

/// Smooth lake edges: a wall squeezed between two cells of the same lake
/// liquid (on either axis) becomes that liquid. Alternates scan direction
/// until stable.
pub fn clean_up_lake_boundaries(grid: &mut Grid<Cell>) {
    let (w, h) = (grid.width() as i32, grid.height() as i32);
    let mut reverse = true;
    // A cell pinched between two different liquids on opposite axes could
    // alternate forever; the pass budget keeps the scan finite.
    let mut passes = 100;
    loop {
        passes -= 1;
        let mut made_change = false;
        reverse = !reverse;
        let xs: Vec<i32> = if reverse { (1..w - 1).rev().collect() } else { (1..w - 1).collect() };
        let ys: Vec<i32> = if reverse { (1..h - 1).rev().collect() } else { (1..h - 1).collect() };
        for &j in &ys {
            for &i in &xs {
                let cell = grid[(i as usize, j as usize)];
                if !cell.has_tile_flag(TileFlags::LAKE_PATHING_BLOCKER | TileFlags::OBSTRUCTS_PASSABILITY)
                    || cell.has_mech_flag(TileMechFlags::IS_SECRET)
                    || cell.flags.contains(CellFlags::IMPREGNABLE)
                {
                    continue;
                }
                let subject = cell.tile_flags()
                    & (TileFlags::LAKE_PATHING_BLOCKER | TileFlags::OBSTRUCTS_PASSABILITY);
                let lake_beyond = |x: i32, y: i32| -> bool {
                    grid.get(x, y).is_some_and(|c| {
                        c.tile_flags()
                            .intersection(TileFlags::LAKE_PATHING_BLOCKER)
                            .difference(subject)
                            != TileFlags::empty()
                    })
                };
                let source = if lake_beyond(i - 1, j) && lake_beyond(i + 1, j) {
                    Some((i + 1, j))
                } else if lake_beyond(i, j - 1) && lake_beyond(i, j + 1) {
                    Some((i, j + 1))
                } else {
                    None
                };
                if let Some((sx, sy)) = source {
                    made_change = true;
                    let layers = grid[(sx as usize, sy as usize)].layers;
                    grid.get_mut(i, j).unwrap().layers = layers;
                }
            }
        }
        if !made_change || passes <= 0 {
            break;
        }
    }
}
