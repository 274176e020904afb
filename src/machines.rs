//! The machine builder: instantiates blueprints as themed level machinery.
//!
//! A machine is anchored at an origin, claims an interior region, and walks
//! its blueprint's feature list in order, placing terrain, dungeon features,
//! items, monsters, and recursive sub-machines. Failure past the point of no
//! return restores a grid snapshot and unwinds everything the attempt
//! spawned; no partial machine ever survives on the grid.

use crate::analysis::{analyze_map, level_is_disconnected_with};
use crate::architect::{
    random_matching_location, GenerationContext, AMULET_LEVEL, MACHINES_BUFFER_LENGTH,
    MACHINE_INCREASE_FACTOR, MACHINE_SUPPRESSION_MULTIPLIER, MACHINE_SUPPRESSION_OFFSET,
};
use crate::blueprints::{
    Blueprint, BpFlags, MachineFeature, MfFlags, AMULET_BLUEPRINT, BLUEPRINT_CATALOG,
};
use crate::carver::{add_loops, design_room, RoomType};
use crate::cell::{CellFlags, Layer};
use crate::dijkstra::{dijkstra_scan, PDS_FORBIDDEN, PDS_OBSTRUCTION, UNREACHABLE};
use crate::dungeon_features::spawn_dungeon_feature;
use crate::fov::get_fov_mask;
use crate::grid::Grid;
use crate::items::{generate_item, place_item_at, remove_item_from_floor, ItemCategory, ItemId, KeyLoc};
use crate::monsters::{generate_monster, monster_at_loc, spawn_horde, CreatureId, CreatureState, HordeFlags};
use crate::tiles::{TileFlags, TileMechFlags, TileType};

const MAX_MACHINE_NESTING: u32 = 10;
const LOCATION_FAIL_SAFE: i32 = 10;
const OUTSOURCE_RETRIES: i32 = 10;
const VESTIBULE_RETRIES: i32 = 5;
const ITEM_GENERATION_RETRIES: i32 = 1000;
const REQUIRED_BLOCKING_SIZE: u32 = 100;

/// True iff the blueprint may be chosen for this request: depth in range,
/// all required flags present, and no adopt/vestibule special unless the
/// request asked for one.
pub fn blueprint_qualifies(bp: &Blueprint, depth: i32, required: BpFlags) -> bool {
    if depth < bp.depth_range.0 || depth > bp.depth_range.1 {
        return false;
    }
    if !bp.flags.contains(required) {
        return false;
    }
    let special = BpFlags::ADOPT_ITEM | BpFlags::VESTIBULE;
    if !required.intersects(special) && bp.flags.intersects(special) {
        return false;
    }
    true
}

/// Top-level machine pipeline: the amulet machine on its level, then reward
/// machines against the depth-scaled budget.
pub fn add_machines(ctx: &mut GenerationContext) {
    analyze_map(&mut ctx.grid, &mut ctx.choke_map, true);
    ctx.stale_loop_map = false;

    if ctx.depth == AMULET_LEVEL {
        let mut built = false;
        for _ in 0..50 {
            if build_a_machine(ctx, Some(AMULET_BLUEPRINT), None, BpFlags::empty(), None, None, None)
            {
                built = true;
                break;
            }
        }
        if !built {
            log::warn!("amulet machine failed all 50 attempts at depth {}", ctx.depth);
        }
    }

    let mut machine_count = 0;
    while (ctx.reward_rooms_generated + machine_count) * MACHINE_SUPPRESSION_MULTIPLIER
        + MACHINE_SUPPRESSION_OFFSET
        < ctx.depth * MACHINE_INCREASE_FACTOR
    {
        machine_count += 1;
    }
    if ctx.rng.rand_percent(10) {
        machine_count += 1;
    }

    let mut failsafe = 50;
    while machine_count > 0 && failsafe > 0 {
        failsafe -= 1;
        if build_a_machine(ctx, None, None, BpFlags::REWARD, None, None, None) {
            machine_count -= 1;
            ctx.reward_rooms_generated += 1;
        }
    }
}

/// Build one machine. `blueprint_index = None` draws a weighted qualifying
/// blueprint; `origin = None` lets the machine choose its own anchor.
/// Returns false when no machine could be built (the grid is unchanged).
#[allow(clippy::too_many_arguments)]
pub fn build_a_machine(
    ctx: &mut GenerationContext,
    blueprint_index: Option<usize>,
    origin: Option<(i32, i32)>,
    required_flags: BpFlags,
    adoptive_item: Option<ItemId>,
    parent_spawned_items: Option<&mut Vec<ItemId>>,
    parent_spawned_monsters: Option<&mut Vec<CreatureId>>,
) -> bool {
    build_inner(
        ctx,
        blueprint_index,
        origin,
        required_flags,
        adoptive_item,
        parent_spawned_items,
        parent_spawned_monsters,
        0,
    )
}

#[allow(clippy::too_many_arguments)]
fn build_inner(
    ctx: &mut GenerationContext,
    blueprint_index: Option<usize>,
    origin: Option<(i32, i32)>,
    required_flags: BpFlags,
    adoptive_item: Option<ItemId>,
    parent_spawned_items: Option<&mut Vec<ItemId>>,
    parent_spawned_monsters: Option<&mut Vec<CreatureId>>,
    nesting: u32,
) -> bool {
    if nesting > MAX_MACHINE_NESTING {
        return false;
    }

    // 1. Select the blueprint.
    let bp_index = match blueprint_index {
        Some(i) => i,
        None => {
            let total: i32 = BLUEPRINT_CATALOG
                .iter()
                .filter(|bp| blueprint_qualifies(bp, ctx.depth, required_flags))
                .map(|bp| bp.frequency)
                .sum();
            if total <= 0 {
                return false;
            }
            let mut roll = ctx.rng.rand_range(0, total - 1);
            let mut chosen = None;
            for (i, bp) in BLUEPRINT_CATALOG.iter().enumerate() {
                if blueprint_qualifies(bp, ctx.depth, required_flags) {
                    roll -= bp.frequency;
                    if roll < 0 {
                        chosen = Some(i);
                        break;
                    }
                }
            }
            match chosen {
                Some(i) => i,
                None => return false,
            }
        }
    };
    let bp = &BLUEPRINT_CATALOG[bp_index];

    if ctx.stale_loop_map {
        analyze_map(&mut ctx.grid, &mut ctx.choke_map, true);
        ctx.stale_loop_map = false;
    }

    // 2. Choose origin and interior.
    let (w, h) = (ctx.grid.width(), ctx.grid.height());
    let mut interior: Grid<bool> = Grid::new(w, h);
    let Some(chosen_origin) = select_interior(ctx, bp, origin, &mut interior) else {
        log::debug!("no interior found for blueprint '{}'", bp.name);
        return false;
    };

    // 3. The point of no return: snapshot the grid.
    let grid_backup = ctx.grid.clone();
    let machine_number_backup = ctx.machine_number;

    // 4. Prepare the interior per blueprint flags.
    prepare_interior(ctx, &mut interior, chosen_origin, bp);

    // 5. Label the interior.
    ctx.machine_number += 1;
    let machine_number = ctx.machine_number;
    let machine_flag = if bp.flags.contains(BpFlags::ROOM) {
        CellFlags::IS_IN_ROOM_MACHINE
    } else {
        CellFlags::IS_IN_AREA_MACHINE
    };
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            if !interior[(x as usize, y as usize)] {
                continue;
            }
            let cell = ctx.grid.get_mut(x, y).unwrap();
            cell.flags |= machine_flag;
            cell.machine_number = machine_number;
            for layer in Layer::ALL {
                let t = cell.tile(layer);
                if t.mech_flags()
                    .intersects(TileMechFlags::IS_WIRED | TileMechFlags::IS_CIRCUIT_BREAKER)
                {
                    let replacement =
                        if layer == Layer::Dungeon { TileType::Floor } else { TileType::Nothing };
                    cell.set_tile(layer, replacement);
                }
            }
            if cell.tile(Layer::Dungeon) == TileType::SecretDoor {
                cell.set_tile(Layer::Dungeon, TileType::Door);
            }
        }
    }

    // 6. Distances from the origin across the interior.
    let dist_map = interior_distance_map(ctx, &interior, chosen_origin);
    let mut sorted: Vec<i32> = Vec::new();
    for (x, y, inside) in interior.iter() {
        if inside {
            let d = dist_map[(x, y)];
            if d < UNREACHABLE {
                sorted.push(d);
            }
        }
    }
    sorted.sort_unstable();
    let distance_25 = sorted.get(sorted.len() / 4).copied().unwrap_or(0);
    let distance_75 = sorted.get(sorted.len() * 3 / 4).copied().unwrap_or(0);

    // 7. Resolve alternative feature groups: keep exactly one of each.
    let mut skip = vec![false; bp.features.len()];
    for alt in [MfFlags::ALTERNATIVE, MfFlags::ALTERNATIVE_2] {
        let members: Vec<usize> = bp
            .features
            .iter()
            .enumerate()
            .filter(|(_, f)| f.flags.contains(alt))
            .map(|(i, _)| i)
            .collect();
        if members.len() > 1 {
            let keep = members[ctx.rng.rand_range(0, members.len() as i32 - 1) as usize];
            for &i in &members {
                if i != keep {
                    skip[i] = true;
                }
            }
        }
    }

    // Per-build state. The adoptive item's key list is remembered so an
    // abort can strip any bindings this attempt appended.
    let adoptive_keyloc_len = adoptive_item
        .and_then(|id| ctx.item_index(id))
        .map(|idx| ctx.items[idx].key_loc.len());
    let mut build = MachineBuild {
        machine_number,
        machine_flag,
        adoptive_item,
        adoptive_used: false,
        spawned_items: Vec::new(),
        spawned_monsters: Vec::new(),
        placed_kinds: Vec::new(),
        occupied: Grid::new(w, h),
        nesting,
    };

    // 8. Place features in order.
    let mut aborted = false;
    'features: for (fi, feat) in bp.features.iter().enumerate() {
        if skip[fi] {
            continue;
        }
        let view_map = build_view_map(ctx, feat, chosen_origin);
        let mut candidates: Grid<bool> = Grid::new(w, h);
        let mut candidate_count = 0;
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                if cell_is_feature_candidate(
                    ctx,
                    bp,
                    feat,
                    x,
                    y,
                    chosen_origin,
                    &interior,
                    &build.occupied,
                    view_map.as_ref(),
                    &dist_map,
                    distance_25,
                    distance_75,
                ) {
                    candidates.set(x, y, true);
                    candidate_count += 1;
                }
            }
        }

        let goal = if feat.flags.contains(MfFlags::EVERYWHERE) {
            i32::MAX
        } else {
            ctx.rng.rand_range(feat.instance_count.0, feat.instance_count.1)
        };
        let repeat = feat.flags.contains(MfFlags::REPEAT_UNTIL_NO_PROGRESS);
        let mut instances = 0;
        while candidate_count > 0 && (instances < goal || repeat) {
            // Uniform pick over the candidate grid, row-major.
            let mut pick = ctx.rng.rand_range(0, candidate_count - 1);
            let mut chosen_cell = None;
            'scan: for y in 0..h as i32 {
                for x in 0..w as i32 {
                    if candidates[(x as usize, y as usize)] {
                        if pick == 0 {
                            chosen_cell = Some((x, y));
                            break 'scan;
                        }
                        pick -= 1;
                    }
                }
            }
            let Some((x, y)) = chosen_cell else { break };

            match place_feature_instance(ctx, bp, feat, x, y, &mut build) {
                InstanceOutcome::Placed => {
                    instances += 1;
                    // Personal space: clear candidates in the Manhattan disk.
                    let radius = (feat.personal_space - 1).max(0);
                    for dy in -radius..=radius {
                        for dx in -radius..=radius {
                            if dx.abs() + dy.abs() <= radius
                                && candidates.get(x + dx, y + dy) == Some(true)
                            {
                                candidates.set(x + dx, y + dy, false);
                                candidate_count -= 1;
                            }
                        }
                    }
                    if candidates.get(x, y) == Some(true) {
                        candidates.set(x, y, false);
                        candidate_count -= 1;
                    }
                    build.occupied.set(x, y, true);
                }
                InstanceOutcome::CellFailed => {
                    candidates.set(x, y, false);
                    candidate_count -= 1;
                    if repeat {
                        // No progress this round ends the repetition.
                        break;
                    }
                }
                InstanceOutcome::Abort => {
                    aborted = true;
                    break 'features;
                }
            }
        }

        if !aborted && instances < feat.minimum_instance_count && !repeat {
            log::debug!(
                "blueprint '{}' feature {} placed {} of {} required instances",
                bp.name,
                fi,
                instances,
                feat.minimum_instance_count
            );
            aborted = true;
            break;
        }
    }

    if aborted {
        // Roll back: the grid snapshot undoes every tile and flag; spawned
        // items and monsters are deleted outright.
        ctx.grid = grid_backup;
        ctx.machine_number = machine_number_backup;
        let items = std::mem::take(&mut build.spawned_items);
        for id in items {
            if let Some(idx) = ctx.item_index(id) {
                ctx.items.remove(idx);
            }
        }
        let monsters = std::mem::take(&mut build.spawned_monsters);
        for id in monsters {
            if let Some(idx) = ctx.monster_index(id) {
                ctx.monsters.remove(idx);
            }
        }
        if let (Some(id), Some(len)) = (adoptive_item, adoptive_keyloc_len) {
            if let Some(idx) = ctx.item_index(id) {
                ctx.items[idx].key_loc.truncate(len);
            }
        }
        // The restored grid matches the last analysis exactly, so the loop
        // and choke maps stay fresh.
        return false;
    }

    // 14. Post-build bookkeeping.
    if bp.flags.contains(BpFlags::NO_INTERIOR_FLAG) {
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let cell = ctx.grid.get_mut(x, y).unwrap();
                if cell.machine_number == machine_number
                    && !cell.mech_flags().intersects(
                        TileMechFlags::IS_WIRED | TileMechFlags::IS_CIRCUIT_BREAKER,
                    )
                {
                    cell.flags.remove(CellFlags::IS_IN_MACHINE);
                    cell.machine_number = 0;
                }
            }
        }
    }
    if let Some(buf) = parent_spawned_items {
        for id in &build.spawned_items {
            if buf.len() < MACHINES_BUFFER_LENGTH {
                buf.push(*id);
            }
        }
    }
    if let Some(buf) = parent_spawned_monsters {
        for id in &build.spawned_monsters {
            if buf.len() < MACHINES_BUFFER_LENGTH {
                buf.push(*id);
            }
        }
    }
    ctx.stale_loop_map = true;
    log::debug!("built machine {} from blueprint '{}'", machine_number, bp.name);
    true
}

/// Mutable state threaded through one machine construction.
struct MachineBuild {
    machine_number: u16,
    machine_flag: CellFlags,
    adoptive_item: Option<ItemId>,
    adoptive_used: bool,
    spawned_items: Vec<ItemId>,
    spawned_monsters: Vec<CreatureId>,
    placed_kinds: Vec<(ItemCategory, i32)>,
    occupied: Grid<bool>,
    nesting: u32,
}

enum InstanceOutcome {
    Placed,
    CellFailed,
    Abort,
}

// ---------------------------------------------------------------------------
// Interior selection
// ---------------------------------------------------------------------------

fn select_interior(
    ctx: &mut GenerationContext,
    bp: &Blueprint,
    origin: Option<(i32, i32)>,
    interior: &mut Grid<bool>,
) -> Option<(i32, i32)> {
    let (w, h) = (ctx.grid.width() as i32, ctx.grid.height() as i32);

    if bp.flags.contains(BpFlags::ROOM) {
        // Gate sites whose pocket size fits the blueprint's window.
        let mut candidates: Vec<(i32, i32)> = Vec::new();
        for y in 0..h {
            for x in 0..w {
                if ctx.grid.has_cell_flag(x, y, CellFlags::IS_GATE_SITE) {
                    let choke = ctx.choke_map.get(x, y).unwrap_or(UNREACHABLE);
                    if choke >= bp.room_size.0 && choke <= bp.room_size.1 {
                        candidates.push((x, y));
                    }
                }
            }
        }
        ctx.rng.shuffle(&mut candidates);
        for (x, y) in candidates {
            interior.fill(false);
            if add_tile_to_machine_interior(ctx, interior, x, y)
                && interior_blocking_ok(ctx, bp, interior)
            {
                return Some((x, y));
            }
        }
        return None;
    }

    if bp.flags.contains(BpFlags::VESTIBULE) {
        let o = origin?;
        interior.fill(false);
        if grow_interior_by_distance(ctx, interior, o, bp, true)
            && interior_blocking_ok(ctx, bp, interior)
        {
            return Some(o);
        }
        return None;
    }

    // Area machine: random floor anchor, up to the location fail-safe.
    for attempt in 0..LOCATION_FAIL_SAFE {
        let o = if attempt == 0 && origin.is_some() {
            origin.unwrap()
        } else {
            match random_matching_location(
                &ctx.grid,
                &mut ctx.rng,
                Some(TileType::Floor),
                Some(TileType::Nothing),
            ) {
                Some(o) => o,
                None => return None,
            }
        };
        interior.fill(false);
        if !grow_interior_by_distance(ctx, interior, o, bp, false) {
            continue;
        }
        // Restart if the region already belongs to anything.
        let mut tainted = false;
        for (x, y, inside) in interior.iter() {
            if inside
                && ctx.grid.has_cell_flag(
                    x as i32,
                    y as i32,
                    CellFlags::HAS_ITEM | CellFlags::HAS_MONSTER | CellFlags::IS_IN_MACHINE,
                )
            {
                tainted = true;
                break;
            }
        }
        if tainted || !interior_blocking_ok(ctx, bp, interior) {
            continue;
        }
        return Some(o);
    }
    None
}

/// Flood out from a gate site, claiming cardinal neighbors whose choke
/// values do not exceed the frontier cell's. Items poison the whole claim.
fn add_tile_to_machine_interior(
    ctx: &GenerationContext,
    interior: &mut Grid<bool>,
    seed_x: i32,
    seed_y: i32,
) -> bool {
    let mut stack = vec![(seed_x, seed_y)];
    interior.set(seed_x, seed_y, true);
    while let Some((x, y)) = stack.pop() {
        let here = ctx.choke_map.get(x, y).unwrap_or(UNREACHABLE);
        for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
            let (nx, ny) = (x + dx, y + dy);
            if interior.get(nx, ny) != Some(false) {
                continue;
            }
            let Some(cell) = ctx.grid.get(nx, ny) else { continue };
            if ctx.choke_map.get(nx, ny).unwrap_or(UNREACHABLE) > here {
                continue;
            }
            if cell.flags.intersects(CellFlags::IS_IN_MACHINE)
                && !cell.flags.contains(CellFlags::IS_GATE_SITE)
            {
                continue;
            }
            if cell.flags.contains(CellFlags::HAS_ITEM) {
                return false;
            }
            interior.set(nx, ny, true);
            stack.push((nx, ny));
        }
    }
    true
}

/// Grow an interior by ascending walking distance from the origin until a
/// cell count drawn from the blueprint's size window is reached. Vestibules
/// forbid machine cells; area machines forbid pathing blockers only.
fn grow_interior_by_distance(
    ctx: &mut GenerationContext,
    interior: &mut Grid<bool>,
    origin: (i32, i32),
    bp: &Blueprint,
    vestibule: bool,
) -> bool {
    let (w, h) = (ctx.grid.width(), ctx.grid.height());
    let mut cost_map: Grid<i32> = Grid::filled(w, h, 1);
    for (x, y, c) in ctx.grid.iter() {
        let forbidden = if vestibule {
            c.flags.intersects(CellFlags::IS_IN_MACHINE)
                || c.has_tile_flag(TileFlags::OBSTRUCTS_PASSABILITY)
        } else {
            c.has_tile_flag(TileFlags::PATHING_BLOCKER)
        };
        if forbidden {
            cost_map.set(x as i32, y as i32, PDS_FORBIDDEN);
        }
    }
    cost_map.set(origin.0, origin.1, 1);
    let mut dist: Grid<i32> = Grid::filled(w, h, UNREACHABLE);
    dist.set(origin.0, origin.1, 0);
    dijkstra_scan(&mut dist, &cost_map, true);

    let target = ctx.rng.rand_range(bp.room_size.0, bp.room_size.1);
    let mut reachable: Vec<(i32, i32, i32)> = Vec::new();
    for (x, y, d) in dist.iter() {
        if d < UNREACHABLE {
            reachable.push((d, x as i32, y as i32));
        }
    }
    if (reachable.len() as i32) < bp.room_size.0 {
        return false;
    }
    reachable.sort_unstable();
    for &(_, x, y) in reachable.iter().take(target.max(1) as usize) {
        interior.set(x, y, true);
    }
    true
}

/// Apply the blueprint's blocking constraints to a candidate interior.
fn interior_blocking_ok(ctx: &GenerationContext, bp: &Blueprint, interior: &Grid<bool>) -> bool {
    if !bp.flags.intersects(BpFlags::TREAT_AS_BLOCKING | BpFlags::REQUIRE_BLOCKING) {
        return true;
    }
    let mut blocking: Grid<i16> = Grid::new(interior.width(), interior.height());
    for (x, y, inside) in interior.iter() {
        if inside {
            blocking.set(x as i32, y as i32, 1);
        }
    }
    let cut_off = level_is_disconnected_with(&ctx.grid, &blocking);
    if bp.flags.contains(BpFlags::TREAT_AS_BLOCKING) && cut_off > 0 {
        return false;
    }
    if bp.flags.contains(BpFlags::REQUIRE_BLOCKING) && cut_off < REQUIRED_BLOCKING_SIZE {
        return false;
    }
    true
}

// ---------------------------------------------------------------------------
// Interior preparation
// ---------------------------------------------------------------------------

fn prepare_interior(
    ctx: &mut GenerationContext,
    interior: &mut Grid<bool>,
    origin: (i32, i32),
    bp: &Blueprint,
) {
    if bp.flags.contains(BpFlags::MAXIMIZE_INTERIOR) {
        expand_machine_interior(ctx, interior, 1);
    } else if bp.flags.contains(BpFlags::OPEN_INTERIOR) {
        expand_machine_interior(ctx, interior, 4);
    }

    let (w, h) = (ctx.grid.width() as i32, ctx.grid.height() as i32);
    for y in 0..h {
        for x in 0..w {
            if !interior[(x as usize, y as usize)] {
                continue;
            }
            let cell = ctx.grid.get_mut(x, y).unwrap();
            if bp.flags.contains(BpFlags::PURGE_INTERIOR) {
                cell.clear_to_floor();
                cell.volume = 0;
            }
            if bp.flags.contains(BpFlags::PURGE_PATHING_BLOCKERS) {
                if cell.tile(Layer::Dungeon).flags().intersects(TileFlags::PATHING_BLOCKER) {
                    cell.set_tile(Layer::Dungeon, TileType::Floor);
                }
                for layer in [Layer::Liquid, Layer::Surface] {
                    if cell.tile(layer).flags().intersects(TileFlags::PATHING_BLOCKER) {
                        cell.set_tile(layer, TileType::Nothing);
                    }
                }
            }
            if bp.flags.contains(BpFlags::PURGE_LIQUIDS) {
                cell.set_tile(Layer::Liquid, TileType::Nothing);
            }
        }
    }

    if bp.flags.contains(BpFlags::SURROUND_WITH_WALLS) {
        for y in 0..h {
            for x in 0..w {
                if interior[(x as usize, y as usize)] {
                    continue;
                }
                // Wall off neighbors of the interior proper, but leave the
                // approach to any gate site open.
                let mut touches = false;
                let mut guards_gate = false;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let (nx, ny) = (x + dx, y + dy);
                        if interior.get(nx, ny) != Some(true) {
                            continue;
                        }
                        if ctx.grid.has_cell_flag(nx, ny, CellFlags::IS_GATE_SITE)
                            && dx.abs() + dy.abs() <= 1
                        {
                            guards_gate = true;
                        } else {
                            touches = true;
                        }
                    }
                }
                if !touches || guards_gate {
                    continue;
                }
                let cell = ctx.grid[(x as usize, y as usize)];
                if cell.is_passable_or_door()
                    && !cell.flags.contains(CellFlags::IS_GATE_SITE)
                    && cell.machine_number == 0
                {
                    // A rim cell that carries through-traffic (a corridor
                    // brushing the pocket corner) must stay open.
                    let mut blocking: Grid<i16> = Grid::new(w as usize, h as usize);
                    blocking.set(x, y, 1);
                    if level_is_disconnected_with(&ctx.grid, &blocking) > 0 {
                        continue;
                    }
                    ctx.grid.get_mut(x, y).unwrap().layers =
                        [TileType::Wall, TileType::Nothing, TileType::Nothing, TileType::Nothing];
                }
            }
        }
    }

    if bp.flags.contains(BpFlags::REDESIGN_INTERIOR) {
        redesign_interior(ctx, interior, origin);
    }

    if bp.flags.contains(BpFlags::IMPREGNABLE) {
        for y in 0..h {
            for x in 0..w {
                let inside = interior[(x as usize, y as usize)];
                let mut rim = false;
                if !inside {
                    for dy in -1..=1 {
                        for dx in -1..=1 {
                            if interior.get(x + dx, y + dy) == Some(true) {
                                rim = true;
                            }
                        }
                    }
                }
                if inside || rim {
                    let cell = ctx.grid.get_mut(x, y).unwrap();
                    if !cell.flags.contains(CellFlags::IS_GATE_SITE) {
                        cell.flags |= CellFlags::IMPREGNABLE;
                    }
                }
            }
        }
    }
}

/// Absorb wall cells into the interior: a wall joins when it touches at
/// least `threshold` interior cells and no exterior passable or machine
/// cell. Absorbed walls become floor.
fn expand_machine_interior(
    ctx: &mut GenerationContext,
    interior: &mut Grid<bool>,
    threshold: i32,
) {
    let (w, h) = (ctx.grid.width() as i32, ctx.grid.height() as i32);
    loop {
        let mut changed = false;
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                if interior[(x as usize, y as usize)] {
                    continue;
                }
                let cell = ctx.grid[(x as usize, y as usize)];
                if !cell.tile(Layer::Dungeon).flags().contains(TileFlags::OBSTRUCTS_PASSABILITY) {
                    continue;
                }
                let mut interior_neighbors = 0;
                let mut exterior_exposure = false;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let (nx, ny) = (x + dx, y + dy);
                        if interior.get(nx, ny) == Some(true) {
                            interior_neighbors += 1;
                        } else if let Some(n) = ctx.grid.get(nx, ny) {
                            if n.is_passable_or_door() || n.machine_number != 0 {
                                exterior_exposure = true;
                            }
                        }
                    }
                }
                if interior_neighbors >= threshold && !exterior_exposure {
                    interior.set(x, y, true);
                    ctx.grid.get_mut(x, y).unwrap().clear_to_floor();
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

/// Re-carve the interior from scratch: seed rooms, connect them to the
/// origin, patch orphaned pockets, add one round of loops, and seal any
/// diagonal-only openings the carving left behind.
fn redesign_interior(ctx: &mut GenerationContext, interior: &Grid<bool>, origin: (i32, i32)) {
    let (w, h) = (ctx.grid.width(), ctx.grid.height());
    // -1 off limits, 0 solid, 1 floor, 2 door candidate.
    let mut scratch: Grid<i16> = Grid::filled(w, h, -1);
    let mut cells: Vec<(i32, i32)> = Vec::new();
    for (x, y, inside) in interior.iter() {
        if inside {
            scratch.set(x as i32, y as i32, 0);
            cells.push((x as i32, y as i32));
        }
    }
    if cells.is_empty() {
        return;
    }
    scratch.set(origin.0, origin.1, 1);

    // Seed a few small rooms inside the region.
    let mut room_map: Grid<i16> = Grid::new(w, h);
    let mut door_sites = [None; 4];
    let room_count = ctx.rng.rand_range(2, 4);
    for _ in 0..room_count {
        design_room(&mut room_map, RoomType::SmallRoom, &mut door_sites, &mut ctx.rng);
        let anchor = cells[ctx.rng.rand_range(0, cells.len() as i32 - 1) as usize];
        let (cx, cy) = (w as i32 / 2, h as i32 / 2);
        for (x, y, v) in room_map.iter() {
            if v == 1 {
                let (gx, gy) = (x as i32 - cx + anchor.0, y as i32 - cy + anchor.1);
                if scratch.get(gx, gy).unwrap_or(-1) >= 0 {
                    scratch.set(gx, gy, 1);
                }
            }
        }
    }

    // Connect every floor pocket back to the origin with Dijkstra paths.
    let mut cost_map: Grid<i32> = Grid::new(w, h);
    for (x, y, v) in scratch.iter() {
        cost_map.set(x as i32, y as i32, if v >= 0 { 1 } else { PDS_FORBIDDEN });
    }
    let mut dist: Grid<i32> = Grid::filled(w, h, UNREACHABLE);
    dist.set(origin.0, origin.1, 0);
    dijkstra_scan(&mut dist, &cost_map, false);
    let mut pockets: Vec<(i32, i32)> = Vec::new();
    for &(x, y) in &cells {
        if scratch.get(x, y) == Some(1) && (x, y) != origin {
            pockets.push((x, y));
        }
    }
    for (px, py) in pockets {
        // Walk downhill from the pocket to the origin, carving floor.
        let (mut x, mut y) = (px, py);
        let mut guard = (w * h) as i32;
        while (x, y) != origin && guard > 0 {
            guard -= 1;
            let mut best = (x, y);
            let mut best_d = dist.get(x, y).unwrap_or(UNREACHABLE);
            for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
                let d = dist.get(x + dx, y + dy).unwrap_or(UNREACHABLE);
                if d < best_d {
                    best_d = d;
                    best = (x + dx, y + dy);
                }
            }
            if best == (x, y) {
                break;
            }
            x = best.0;
            y = best.1;
            if scratch.get(x, y) == Some(0) {
                scratch.set(x, y, 1);
            }
        }
    }

    add_loops(&mut scratch, 10, &mut ctx.rng);

    // Seal diagonal-only openings inside the scratch region.
    loop {
        let mut fixed = false;
        for y in 0..h as i32 - 1 {
            for x in 0..w as i32 - 1 {
                let a = scratch.get(x, y).unwrap_or(-1) > 0;
                let b = scratch.get(x + 1, y).unwrap_or(-1) > 0;
                let c = scratch.get(x, y + 1).unwrap_or(-1) > 0;
                let d = scratch.get(x + 1, y + 1).unwrap_or(-1) > 0;
                if a && d && !b && !c && scratch.get(x + 1, y) == Some(0) {
                    scratch.set(x + 1, y, 1);
                    fixed = true;
                } else if b && c && !a && !d && scratch.get(x, y) == Some(0) {
                    scratch.set(x, y, 1);
                    fixed = true;
                }
            }
        }
        if !fixed {
            break;
        }
    }

    // Write the redesign back onto the cell grid.
    for (x, y, v) in scratch.iter() {
        if v < 0 {
            continue;
        }
        let cell = ctx.grid.get_mut(x as i32, y as i32).unwrap();
        match v {
            1 => cell.clear_to_floor(),
            2 => {
                cell.clear_to_floor();
                cell.set_tile(Layer::Dungeon, TileType::Door);
            }
            _ => {
                cell.layers =
                    [TileType::Wall, TileType::Nothing, TileType::Nothing, TileType::Nothing];
            }
        }
    }
}

fn interior_distance_map(
    ctx: &GenerationContext,
    interior: &Grid<bool>,
    origin: (i32, i32),
) -> Grid<i32> {
    let (w, h) = (ctx.grid.width(), ctx.grid.height());
    let mut cost_map: Grid<i32> = Grid::filled(w, h, PDS_FORBIDDEN);
    for (x, y, inside) in interior.iter() {
        if inside && !ctx.grid[(x, y)].has_tile_flag(TileFlags::PATHING_BLOCKER) {
            let cost = if ctx.grid[(x, y)].has_tile_flag(TileFlags::OBSTRUCTS_DIAGONAL_MOVEMENT) {
                PDS_OBSTRUCTION
            } else {
                1
            };
            cost_map.set(x as i32, y as i32, cost);
        }
    }
    cost_map.set(origin.0, origin.1, 1);
    let mut dist: Grid<i32> = Grid::filled(w, h, UNREACHABLE);
    dist.set(origin.0, origin.1, 0);
    dijkstra_scan(&mut dist, &cost_map, true);
    dist
}

fn build_view_map(
    ctx: &GenerationContext,
    feat: &MachineFeature,
    origin: (i32, i32),
) -> Option<Grid<i16>> {
    let opaque = if feat.flags.contains(MfFlags::IN_VIEW_OF_ORIGIN) {
        TileFlags::OBSTRUCTS_PASSABILITY.union(TileFlags::OBSTRUCTS_VISION)
    } else if feat.flags.contains(MfFlags::IN_PASSABLE_VIEW_OF_ORIGIN) {
        TileFlags::PATHING_BLOCKER
    } else {
        return None;
    };
    let mut mask: Grid<i16> = Grid::new(ctx.grid.width(), ctx.grid.height());
    get_fov_mask(
        &mut mask,
        &ctx.grid,
        origin.0,
        origin.1,
        ctx.grid.width().max(ctx.grid.height()) as i32,
        opaque,
        CellFlags::empty(),
        false,
    );
    Some(mask)
}

// ---------------------------------------------------------------------------
// Candidate predicates
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn cell_is_feature_candidate(
    ctx: &GenerationContext,
    bp: &Blueprint,
    feat: &MachineFeature,
    x: i32,
    y: i32,
    origin: (i32, i32),
    interior: &Grid<bool>,
    occupied: &Grid<bool>,
    view_map: Option<&Grid<i16>>,
    dist_map: &Grid<i32>,
    distance_25: i32,
    distance_75: i32,
) -> bool {
    let (w, h) = (ctx.grid.width() as i32, ctx.grid.height() as i32);
    let Some(cell) = ctx.grid.get(x, y) else {
        return false;
    };

    if feat.flags.contains(MfFlags::NOT_ON_LEVEL_PERIMETER)
        && (x == 0 || y == 0 || x == w - 1 || y == h - 1)
    {
        return false;
    }
    if feat.flags.contains(MfFlags::BUILD_AT_ORIGIN) {
        return (x, y) == origin;
    }
    if bp.flags.contains(BpFlags::ROOM) && (x, y) == origin {
        return false;
    }
    if occupied[(x as usize, y as usize)] {
        return false;
    }
    if let Some(view) = view_map {
        if view.get(x, y) != Some(1) {
            return false;
        }
    }

    let in_walls = feat.flags.contains(MfFlags::BUILD_IN_WALLS);
    let distance = if in_walls {
        let mut best = UNREACHABLE;
        for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
            let Some(n) = ctx.grid.get(x + dx, y + dy) else { continue };
            if !n.has_tile_flag(TileFlags::PATHING_BLOCKER) {
                best = best.min(dist_map.get(x + dx, y + dy).unwrap_or(UNREACHABLE));
            }
        }
        if best >= UNREACHABLE {
            UNREACHABLE
        } else {
            best + 1
        }
    } else {
        dist_map.get(x, y).unwrap_or(UNREACHABLE)
    };
    if feat.flags.contains(MfFlags::NEAR_ORIGIN) && distance > distance_25 {
        return false;
    }
    if feat.flags.contains(MfFlags::FAR_FROM_ORIGIN) && distance < distance_75 {
        return false;
    }

    if in_walls {
        let wall_tile = cell.tile(Layer::Dungeon);
        if wall_tile != TileType::Wall && wall_tile != TileType::Granite {
            return false;
        }
        if cell.machine_number != 0 {
            return false;
        }
        for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
            let (nx, ny) = (x + dx, y + dy);
            if feat.flags.contains(MfFlags::BUILD_ANYWHERE_ON_LEVEL) {
                if ctx.grid.cell_is_passable(nx, ny)
                    && nx > 0
                    && ny > 0
                    && nx < w - 1
                    && ny < h - 1
                {
                    return true;
                }
            } else if interior.get(nx, ny) == Some(true)
                && (nx, ny) != origin
                && !ctx.grid.has_terrain_flag(nx, ny, TileFlags::PATHING_BLOCKER)
            {
                return true;
            }
        }
        return false;
    }

    if feat.flags.contains(MfFlags::BUILD_ANYWHERE_ON_LEVEL) {
        if feat.flags.contains(MfFlags::GENERATE_ITEM) {
            // Items must land somewhere they can rest: nothing that blocks,
            // sweeps, or swallows them.
            if cell.flags.intersects(
                CellFlags::IS_CHOKEPOINT | CellFlags::IN_LOOP | CellFlags::IS_IN_MACHINE,
            ) || cell.has_tile_flag(TileFlags::OBSTRUCTS_ITEMS | TileFlags::MOVES_ITEMS)
            {
                return false;
            }
        } else if cell.machine_number != 0 {
            return false;
        }
        if !cell.is_passable() || cell.flags.intersects(CellFlags::HAS_ITEM | CellFlags::HAS_MONSTER)
        {
            return false;
        }
        if feat.flags.contains(MfFlags::NOT_IN_HALLWAY) && ctx.grid.passable_arc_count(x, y) > 1 {
            return false;
        }
        return true;
    }

    if interior[(x as usize, y as usize)] {
        if cell.has_tile_flag(TileFlags::PATHING_BLOCKER) {
            return false;
        }
        if feat.flags.contains(MfFlags::NOT_IN_HALLWAY) && ctx.grid.passable_arc_count(x, y) > 1 {
            return false;
        }
        return true;
    }
    false
}

// ---------------------------------------------------------------------------
// Instance placement
// ---------------------------------------------------------------------------

fn place_feature_instance(
    ctx: &mut GenerationContext,
    bp: &Blueprint,
    feat: &MachineFeature,
    x: i32,
    y: i32,
    build: &mut MachineBuild,
) -> InstanceOutcome {
    // Dungeon feature first; its failure only disqualifies the cell.
    if let Some(df) = feat.feature {
        let abort_if_blocking = !feat.flags.contains(MfFlags::PERMIT_BLOCKING);
        if !spawn_dungeon_feature(&mut ctx.grid, &mut ctx.rng, x, y, df, abort_if_blocking, None) {
            return InstanceOutcome::CellFailed;
        }
    }

    // Terrain, guarded by the single-cell disconnection test.
    if let Some(tile) = feat.terrain {
        let would_block = tile.flags().intersects(TileFlags::PATHING_BLOCKER)
            || feat.flags.contains(MfFlags::TREAT_AS_BLOCKING);
        if would_block && !feat.flags.contains(MfFlags::PERMIT_BLOCKING) {
            let mut blocking: Grid<i16> = Grid::new(ctx.grid.width(), ctx.grid.height());
            blocking.set(x, y, 1);
            if level_is_disconnected_with(&ctx.grid, &blocking) > 0 {
                return InstanceOutcome::CellFailed;
            }
        }
        let cell = ctx.grid.get_mut(x, y).unwrap();
        cell.set_tile(feat.layer, tile);
    }

    // The cell joins the machine.
    {
        let cell = ctx.grid.get_mut(x, y).unwrap();
        cell.flags |= build.machine_flag;
        cell.machine_number = build.machine_number;
        if feat.flags.contains(MfFlags::IMPREGNABLE) {
            cell.flags |= CellFlags::IMPREGNABLE;
        }
    }

    // Item generation or adoption.
    let mut item_id: Option<ItemId> = None;
    let mut item_was_adopted = false;
    if feat.flags.contains(MfFlags::ADOPT_ITEM)
        && bp.flags.contains(BpFlags::ADOPT_ITEM)
        && !build.adoptive_used
        && build.adoptive_item.is_some()
    {
        item_id = build.adoptive_item;
        build.adoptive_used = true;
        item_was_adopted = true;
    } else if feat.flags.contains(MfFlags::GENERATE_ITEM) {
        let mut generated = None;
        for _ in 0..ITEM_GENERATION_RETRIES {
            let item =
                generate_item(&mut ctx.rng, &mut ctx.next_item_id, ctx.depth, feat.item_category, feat.item_kind);
            if feat.flags.contains(MfFlags::REQUIRE_HEAVY_WEAPON) && !item.is_heavy_weapon() {
                continue;
            }
            if feat.flags.contains(MfFlags::REQUIRE_GOOD_RUNIC) && !item.is_positively_enchanted() {
                continue;
            }
            if feat.flags.contains(MfFlags::NO_THROWING_WEAPONS)
                && item.flags.contains(crate::items::ItemFlags::IS_THROWING_WEAPON)
            {
                continue;
            }
            if item.category.is_unique_per_machine()
                && build.placed_kinds.contains(&(item.category, item.kind))
            {
                continue;
            }
            generated = Some(item);
            break;
        }
        let Some(item) = generated else {
            return InstanceOutcome::CellFailed;
        };
        build.placed_kinds.push((item.category, item.kind));
        let id = item.id;
        ctx.items.push(item);
        build.spawned_items.push(id);
        item_id = Some(id);
    }

    if let Some(id) = item_id {
        // Key binding: append, never overwrite.
        let disposable = feat.flags.contains(MfFlags::KEY_DISPOSABLE);
        let skeleton = feat.flags.contains(MfFlags::SKELETON_KEY);
        let machine_number = build.machine_number;
        if let Some(idx) = ctx.item_index(id) {
            if ctx.items[idx].is_key() {
                ctx.items[idx].key_loc.push(KeyLoc { loc: (x, y), machine: 0, disposable });
                if skeleton {
                    ctx.items[idx].key_loc.push(KeyLoc {
                        loc: (0, 0),
                        machine: machine_number,
                        disposable,
                    });
                }
            }
        }

        if feat.flags.contains(MfFlags::OUTSOURCE_ITEM_TO_MACHINE) && !item_was_adopted {
            // Hand the item to a machine elsewhere on the level.
            if let Some(idx) = ctx.item_index(id) {
                let mut item = ctx.items[idx].clone();
                remove_item_from_floor(&mut ctx.grid, &mut item);
                ctx.items[idx] = item;
            }
            let mut delivered = false;
            for _ in 0..OUTSOURCE_RETRIES {
                let mut child_items = Vec::new();
                let mut child_monsters = Vec::new();
                if build_inner(
                    ctx,
                    None,
                    None,
                    BpFlags::ADOPT_ITEM,
                    Some(id),
                    Some(&mut child_items),
                    Some(&mut child_monsters),
                    build.nesting + 1,
                ) {
                    merge_spawned(&mut build.spawned_items, &child_items);
                    merge_spawned(&mut build.spawned_monsters, &child_monsters);
                    delivered = true;
                    break;
                }
            }
            if !delivered {
                return InstanceOutcome::Abort;
            }
        } else if !feat.flags.contains(MfFlags::MONSTER_TAKE_ITEM) {
            if let Some(idx) = ctx.item_index(id) {
                let mut item = ctx.items[idx].clone();
                place_item_at(&mut ctx.grid, &mut item, x, y);
                ctx.items[idx] = item;
            }
        }
    }

    // Vestibule construction at this feature's cell.
    if feat.flags.contains(MfFlags::BUILD_VESTIBULE) {
        let mut built = false;
        for _ in 0..VESTIBULE_RETRIES {
            let mut child_items = Vec::new();
            let mut child_monsters = Vec::new();
            if build_inner(
                ctx,
                None,
                Some((x, y)),
                BpFlags::VESTIBULE,
                None,
                Some(&mut child_items),
                Some(&mut child_monsters),
                build.nesting + 1,
            ) {
                merge_spawned(&mut build.spawned_items, &child_items);
                merge_spawned(&mut build.spawned_monsters, &child_monsters);
                built = true;
                break;
            }
        }
        if !built {
            return InstanceOutcome::Abort;
        }
    }

    // Monster and horde placement.
    let mut group: Vec<CreatureId> = Vec::new();
    if feat.flags.contains(MfFlags::GENERATE_HORDE) {
        let spawned = spawn_horde(
            &mut ctx.grid,
            &mut ctx.rng,
            &mut ctx.next_monster_id,
            ctx.depth,
            x,
            y,
            HordeFlags::empty(),
            feat.horde_flags,
        );
        for m in spawned {
            group.push(m.id);
            ctx.monsters.push(m);
        }
        if group.is_empty() && feat.minimum_instance_count > 0 {
            return InstanceOutcome::CellFailed;
        }
    }
    if let Some(kind) = feat.monster_kind {
        if let Some(idx) = monster_at_loc(&ctx.monsters, x, y) {
            let old = ctx.monsters.remove(idx);
            crate::monsters::kill_creature(&mut ctx.grid, &old);
        }
        let m = generate_monster(&mut ctx.grid, &mut ctx.next_monster_id, kind, x, y);
        group.push(m.id);
        ctx.monsters.push(m);
    }

    if !group.is_empty() {
        let leader_id = group[0];
        for (i, id) in group.iter().enumerate() {
            let Some(idx) = ctx.monster_index(*id) else { continue };
            let m = &mut ctx.monsters[idx];
            if i > 0 && m.leader.is_none() {
                m.leader = Some(leader_id);
            }
            if feat.flags.contains(MfFlags::MONSTER_SLEEPING) {
                m.state = CreatureState::Sleeping;
            }
            if feat.flags.contains(MfFlags::MONSTER_FLEEING) {
                m.state = CreatureState::Fleeing;
            }
            if feat.flags.contains(MfFlags::MONSTERS_DORMANT) {
                m.state = CreatureState::Dormant;
            }
            m.machine_home = build.machine_number;
        }
        build.spawned_monsters.extend(group.iter().copied());

        // Torch bearer: the most recent monster carries the item.
        if feat.flags.contains(MfFlags::MONSTER_TAKE_ITEM) {
            if let (Some(item), Some(&carrier)) = (item_id, group.last()) {
                if let Some(midx) = ctx.monster_index(carrier) {
                    if let Some(previous) = ctx.monsters[midx].carried_item.take() {
                        if let Some(pidx) = ctx.item_index(previous) {
                            ctx.items.remove(pidx);
                        }
                    }
                    ctx.monsters[midx].carried_item = Some(item);
                }
            }
        }
    }

    InstanceOutcome::Placed
}

fn merge_spawned<T: Copy>(into: &mut Vec<T>, from: &[T]) {
    for &v in from {
        if into.len() >= MACHINES_BUFFER_LENGTH {
            break;
        }
        into.push(v);
    }
}
