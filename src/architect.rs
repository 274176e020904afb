//! The per-generation context and the top-level level driver.
//!
//! Everything mutable that the pipeline shares lives on
//! [`GenerationContext`]: the cell grid, the RNG, the machine counter, the
//! reward budget, the collaborator stores, and the per-depth level records.

use crate::autogen::run_autogenerators;
use crate::bridges::build_a_bridge;
use crate::carver::carve_dungeon;
use crate::cell::{Cell, CellFlags, Layer};
use crate::dijkstra::{dijkstra_scan, PDS_FORBIDDEN, UNREACHABLE};
use crate::error::ArchitectError;
use crate::finish::{finish_doors, finish_walls, remove_diagonal_openings};
use crate::fov::get_fov_mask;
use crate::grid::Grid;
use crate::items::{Item, ItemId};
use crate::lakes::{clean_up_lake_boundaries, design_lakes, fill_lakes};
use crate::machines::add_machines;
use crate::monsters::{Creature, CreatureId};
use crate::rng::Rng;
use crate::tiles::{TileFlags, TileType};
use serde::Serialize;

pub const DCOLS: usize = 79;
pub const DROWS: usize = 29;
pub const NUMBER_TERRAIN_LAYERS: usize = 4;

pub const AMULET_LEVEL: i32 = 26;
pub const DEEPEST_LEVEL: i32 = 26;
pub const MINIMUM_LAVA_LEVEL: i32 = 4;
pub const MINIMUM_BRIMSTONE_LEVEL: i32 = 17;

pub const MACHINES_BUFFER_LENGTH: usize = 200;
pub const MAX_WAYPOINT_COUNT: usize = 40;
pub const WAYPOINT_SIGHT_RADIUS: i32 = 10;

pub(crate) const MACHINE_SUPPRESSION_MULTIPLIER: i32 = 3;
pub(crate) const MACHINE_SUPPRESSION_OFFSET: i32 = 2;
pub(crate) const MACHINE_INCREASE_FACTOR: i32 = 1;

/// Persistent per-depth record in the level store.
#[derive(Debug, Clone, Default)]
pub struct LevelRecord {
    pub up_stairs_loc: Option<(i32, i32)>,
    pub down_stairs_loc: Option<(i32, i32)>,
    pub player_exited_via: Option<(i32, i32)>,
    pub visited: bool,
}

/// A monster-pathfinding seed cell with its precomputed distance map.
#[derive(Debug, Clone)]
pub struct Waypoint {
    pub loc: (i32, i32),
    pub distance_map: Grid<i32>,
}

/// Summary counters for a finished level.
#[derive(Debug, Clone, Serialize)]
pub struct LevelStats {
    pub depth: i32,
    pub floor_cells: usize,
    pub doors: usize,
    pub secret_doors: usize,
    pub lake_cells: usize,
    pub bridge_cells: usize,
    pub machines: u16,
    pub items: usize,
    pub monsters: usize,
    pub waypoints: usize,
}

/// Owns the grid and every counter the pipeline mutates.
pub struct GenerationContext {
    pub grid: Grid<Cell>,
    pub rng: Rng,
    pub depth: i32,
    /// Highest machine id assigned on this level so far.
    pub machine_number: u16,
    pub reward_rooms_generated: i32,
    pub choke_map: Grid<i32>,
    pub stale_loop_map: bool,
    pub items: Vec<Item>,
    pub monsters: Vec<Creature>,
    pub next_item_id: ItemId,
    pub next_monster_id: CreatureId,
    pub levels: Vec<LevelRecord>,
    pub waypoints: Vec<Waypoint>,
}

impl GenerationContext {
    pub fn new(seed: u64, depth: i32) -> Self {
        Self {
            grid: Grid::new(DCOLS, DROWS),
            rng: Rng::new(seed),
            depth,
            machine_number: 0,
            reward_rooms_generated: 0,
            choke_map: Grid::new(DCOLS, DROWS),
            stale_loop_map: true,
            items: Vec::new(),
            monsters: Vec::new(),
            next_item_id: 1,
            next_monster_id: 1,
            levels: vec![LevelRecord::default(); DEEPEST_LEVEL as usize],
            waypoints: Vec::new(),
        }
    }

    /// Reset the grid and all per-level state to solid granite.
    pub fn clear_level(&mut self) {
        self.grid.fill(Cell::default());
        self.machine_number = 0;
        self.stale_loop_map = true;
        self.items.clear();
        self.monsters.clear();
        self.waypoints.clear();
    }

    pub fn item_index(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    pub fn monster_index(&self, id: CreatureId) -> Option<usize> {
        self.monsters.iter().position(|m| m.id == id)
    }

    pub fn stats(&self) -> LevelStats {
        let mut floor_cells = 0;
        let mut doors = 0;
        let mut secret_doors = 0;
        let mut lake_cells = 0;
        let mut bridge_cells = 0;
        for (_, _, c) in self.grid.iter() {
            match c.tile(Layer::Dungeon) {
                TileType::Floor => floor_cells += 1,
                TileType::Door | TileType::LockedDoor => doors += 1,
                TileType::SecretDoor => secret_doors += 1,
                _ => {}
            }
            match c.tile(Layer::Liquid) {
                TileType::Nothing => {}
                TileType::Bridge => bridge_cells += 1,
                _ => lake_cells += 1,
            }
        }
        LevelStats {
            depth: self.depth,
            floor_cells,
            doors,
            secret_doors,
            lake_cells,
            bridge_cells,
            machines: self.machine_number,
            items: self.items.len(),
            monsters: self.monsters.len(),
            waypoints: self.waypoints.len(),
        }
    }
}

/// Probe up to 500 random cells for one whose dungeon and liquid layers
/// match the requested tiles (`None` matches anything).
pub(crate) fn random_matching_location(
    grid: &Grid<Cell>,
    rng: &mut Rng,
    dungeon_tile: Option<TileType>,
    liquid_tile: Option<TileType>,
) -> Option<(i32, i32)> {
    for _ in 0..500 {
        let x = rng.rand_range(0, grid.width() as i32 - 1);
        let y = rng.rand_range(0, grid.height() as i32 - 1);
        let cell = grid.get(x, y)?;
        if dungeon_tile.is_some_and(|t| cell.tile(Layer::Dungeon) != t) {
            continue;
        }
        if liquid_tile.is_some_and(|t| cell.tile(Layer::Liquid) != t) {
            continue;
        }
        if cell.flags.intersects(CellFlags::HAS_ITEM | CellFlags::HAS_MONSTER | CellFlags::HAS_STAIRS)
        {
            continue;
        }
        return Some((x, y));
    }
    None
}

/// Build one complete level for the context's depth.
pub fn dig_dungeon(ctx: &mut GenerationContext) -> Result<(), ArchitectError> {
    log::debug!("digging level {} ", ctx.depth);
    ctx.clear_level();

    // Coarse topology on a numeric grid, then blit to cells.
    let mut carve_grid: Grid<i16> = Grid::new(DCOLS, DROWS);
    carve_dungeon(&mut carve_grid, ctx.depth, AMULET_LEVEL, &mut ctx.rng);
    for (x, y, v) in carve_grid.iter() {
        let tile = match v {
            1 => TileType::Floor,
            2 => {
                if ctx.depth < DEEPEST_LEVEL && ctx.rng.rand_percent(60) {
                    TileType::Door
                } else {
                    TileType::Floor
                }
            }
            _ => continue,
        };
        let cell = ctx.grid.get_mut(x as i32, y as i32).unwrap();
        cell.clear_to_floor();
        cell.set_tile(Layer::Dungeon, tile);
    }

    finish_walls(&mut ctx.grid, false);

    let mut lake_map: Grid<i16> = Grid::new(DCOLS, DROWS);
    design_lakes(&mut ctx.grid, &mut lake_map, &mut ctx.rng);
    fill_lakes(
        &mut ctx.grid,
        &mut lake_map,
        ctx.depth,
        DEEPEST_LEVEL,
        MINIMUM_LAVA_LEVEL,
        MINIMUM_BRIMSTONE_LEVEL,
        &mut ctx.rng,
    );

    run_autogenerators(ctx, false);
    remove_diagonal_openings(&mut ctx.grid, &mut ctx.rng);

    add_machines(ctx);
    run_autogenerators(ctx, true);

    clean_up_lake_boundaries(&mut ctx.grid);
    while build_a_bridge(&mut ctx.grid, ctx.depth, &mut ctx.rng) {}

    finish_doors(&mut ctx.grid, ctx.depth, AMULET_LEVEL, &mut ctx.rng);
    finish_walls(&mut ctx.grid, true);

    place_stairs(ctx)?;
    setup_waypoints(ctx);

    #[cfg(debug_assertions)]
    validate_level(ctx)?;

    Ok(())
}

/// A wall cell qualifies for stairs when it sits in a one-cell alcove:
/// exactly one open cardinal neighbor, itself in a dead-end pose.
pub fn valid_stair_loc(grid: &Grid<Cell>, x: i32, y: i32) -> bool {
    let cell = match grid.get(x, y) {
        Some(c) => c,
        None => return false,
    };
    if cell.tile(Layer::Dungeon) != TileType::Wall {
        return false;
    }
    for dy in -1..=1 {
        for dx in -1..=1 {
            if let Some(n) = grid.get(x + dx, y + dy) {
                if n.machine_number != 0 {
                    return false;
                }
            }
        }
    }
    let mut open_dir = None;
    let mut blockers = 0;
    for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
        if grid.has_terrain_flag(x + dx, y + dy, TileFlags::OBSTRUCTS_PASSABILITY)
            || !grid.in_bounds(x + dx, y + dy)
        {
            blockers += 1;
        } else {
            open_dir = Some((dx, dy));
        }
    }
    if blockers != 3 {
        return false;
    }
    let (dx, dy) = match open_dir {
        Some(d) => d,
        None => return false,
    };
    let (ox, oy) = (x + dx, y + dy);
    if grid.passable_arc_count(ox, oy) >= 2 {
        return false;
    }
    // Every diagonal must be blocked: the pair flanking the open neighbor
    // (so the stairwell reads as an alcove) and the rear pair (so opening
    // this cell cannot create a diagonal-only passage).
    for ddy in [-1, 1] {
        for ddx in [-1, 1] {
            if !grid.has_terrain_flag(x + ddx, y + ddy, TileFlags::OBSTRUCTS_PASSABILITY)
                && grid.in_bounds(x + ddx, y + ddy)
            {
                return false;
            }
        }
    }
    let (fx, fy) = (dy, dx);
    grid.has_terrain_flag(ox + fx, oy + fy, TileFlags::OBSTRUCTS_PASSABILITY)
        && grid.has_terrain_flag(ox - fx, oy - fy, TileFlags::OBSTRUCTS_PASSABILITY)
}

fn stamp_stairs(grid: &mut Grid<Cell>, x: i32, y: i32, tile: TileType) {
    let cell = grid.get_mut(x, y).unwrap();
    cell.layers = [tile, TileType::Nothing, TileType::Nothing, TileType::Nothing];
    cell.flags |= CellFlags::HAS_STAIRS;
    // Torch-lined walls around the stairwell; granite next to a now-open
    // cell would otherwise never have been promoted.
    for dy in -1..=1 {
        for dx in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            if let Some(n) = grid.get_mut(x + dx, y + dy) {
                let t = n.tile(Layer::Dungeon);
                if t == TileType::Granite || t == TileType::Wall {
                    n.set_tile(Layer::Dungeon, TileType::TorchWall);
                }
            }
        }
    }
}

fn nearest_valid(valid: &[(i32, i32)], target: (i32, i32)) -> Option<(i32, i32)> {
    valid
        .iter()
        .min_by_key(|&&(x, y)| {
            let dx = x - target.0;
            let dy = y - target.1;
            dx * dx + dy * dy
        })
        .copied()
}

/// Place the stairway pair, preferring the level store's remembered
/// locations, and propagate the down-stairs to the next level's entry.
pub fn place_stairs(ctx: &mut GenerationContext) -> Result<(), ArchitectError> {
    let mut valid: Vec<(i32, i32)> = Vec::new();
    for y in 0..DROWS as i32 {
        for x in 0..DCOLS as i32 {
            if valid_stair_loc(&ctx.grid, x, y) {
                valid.push((x, y));
            }
        }
    }

    let level_idx = (ctx.depth - 1) as usize;
    let down_target = ctx.levels[level_idx]
        .down_stairs_loc
        .unwrap_or((DCOLS as i32 / 2, DROWS as i32 / 2));
    let down = nearest_valid(&valid, down_target).or_else(|| fallback_stair_loc(ctx));
    let Some(down) = down else {
        return Err(ArchitectError::StairPlacementFailed);
    };
    valid.retain(|&loc| loc != down);

    let up_target = ctx.levels[level_idx]
        .up_stairs_loc
        .unwrap_or((DCOLS as i32 / 2, 2));
    let up = nearest_valid(&valid, up_target).or_else(|| fallback_stair_loc(ctx));
    let Some(up) = up else {
        return Err(ArchitectError::StairPlacementFailed);
    };

    let down_tile =
        if ctx.depth == DEEPEST_LEVEL { TileType::DungeonPortal } else { TileType::DownStairs };
    let up_tile = if ctx.depth == 1 { TileType::DungeonExit } else { TileType::UpStairs };
    stamp_stairs(&mut ctx.grid, down.0, down.1, down_tile);
    stamp_stairs(&mut ctx.grid, up.0, up.1, up_tile);

    ctx.levels[level_idx].down_stairs_loc = Some(down);
    ctx.levels[level_idx].up_stairs_loc = Some(up);
    if ctx.depth < DEEPEST_LEVEL {
        let next = &mut ctx.levels[level_idx + 1];
        if !next.visited {
            next.up_stairs_loc = Some(down);
        }
    }
    Ok(())
}

fn fallback_stair_loc(ctx: &mut GenerationContext) -> Option<(i32, i32)> {
    for _ in 0..500 {
        let x = ctx.rng.rand_range(1, DCOLS as i32 - 2);
        let y = ctx.rng.rand_range(1, DROWS as i32 - 2);
        let cell = ctx.grid.get(x, y)?;
        if cell.tile(Layer::Dungeon) == TileType::Floor
            && cell.machine_number == 0
            && cell.is_passable()
            && !cell.flags.intersects(CellFlags::HAS_STAIRS | CellFlags::HAS_ITEM | CellFlags::HAS_MONSTER)
        {
            return Some((x, y));
        }
    }
    None
}

/// Greedily pick waypoint cells whose sight disks do not overlap previously
/// chosen waypoints, then precompute a distance map for each.
pub fn setup_waypoints(ctx: &mut GenerationContext) {
    ctx.waypoints.clear();
    let mut covered: Grid<i16> = Grid::new(DCOLS, DROWS);
    let mut chosen: Vec<(i32, i32)> = Vec::new();

    for y in 0..DROWS as i32 {
        for x in 0..DCOLS as i32 {
            if chosen.len() >= MAX_WAYPOINT_COUNT {
                break;
            }
            if !ctx.grid.cell_is_passable(x, y) || covered.get(x, y) != Some(0) {
                continue;
            }
            get_fov_mask(
                &mut covered,
                &ctx.grid,
                x,
                y,
                WAYPOINT_SIGHT_RADIUS,
                TileFlags::OBSTRUCTS_PASSABILITY,
                CellFlags::empty(),
                false,
            );
            chosen.push((x, y));
        }
    }

    let mut cost_map: Grid<i32> = Grid::filled(DCOLS, DROWS, 1);
    for (x, y, c) in ctx.grid.iter() {
        if c.has_tile_flag(TileFlags::PATHING_BLOCKER) && !c.is_passable_or_door() {
            cost_map.set(x as i32, y as i32, PDS_FORBIDDEN);
        }
    }
    for (x, y) in chosen {
        let mut distance_map: Grid<i32> = Grid::filled(DCOLS, DROWS, UNREACHABLE);
        distance_map.set(x, y, 0);
        dijkstra_scan(&mut distance_map, &cost_map, true);
        ctx.waypoints.push(Waypoint { loc: (x, y), distance_map });
    }
}

/// Debug-build sanity pass over the exit invariants.
#[cfg(debug_assertions)]
fn validate_level(ctx: &GenerationContext) -> Result<(), ArchitectError> {
    // Connectivity: one walkable component.
    let mut pass: Grid<i16> = Grid::new(DCOLS, DROWS);
    let mut seed = None;
    for (x, y, c) in ctx.grid.iter() {
        if c.is_passable_or_door() {
            pass.set(x as i32, y as i32, 1);
            seed.get_or_insert((x as i32, y as i32));
        }
    }
    let total = pass.count(|v| v == 1) as u32;
    if let Some((sx, sy)) = seed {
        let reached = pass.flood_fill(sx, sy, |v| v == 1, 2);
        if reached != total {
            return Err(ArchitectError::LevelInvariantViolation(format!(
                "connectivity: {} of {} walkable cells reachable",
                reached, total
            )));
        }
    }
    // Machine containment.
    for (x, y, c) in ctx.grid.iter() {
        if c.machine_number != 0 && !c.flags.intersects(CellFlags::IS_IN_MACHINE) {
            return Err(ArchitectError::LevelInvariantViolation(format!(
                "cell ({}, {}) has machine id {} without a machine flag",
                x, y, c.machine_number
            )));
        }
    }
    Ok(())
}
