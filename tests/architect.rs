//! Whole-pipeline properties: connectivity, wall exposure, door sanity,
//! machine containment, and determinism across a seed sweep.

use dungeon_architect::{
    dig_dungeon, CellFlags, GenerationContext, Grid, Layer, TileFlags, TileType, DCOLS,
    DEEPEST_LEVEL, DROWS,
};

const SEEDS: [u64; 6] = [1, 42, 1234, 99999, 31337, 777777];

fn dug(seed: u64, depth: i32) -> GenerationContext {
    let mut ctx = GenerationContext::new(seed, depth);
    dig_dungeon(&mut ctx).expect("level generation should succeed");
    ctx
}

fn is_wall_class(t: TileType) -> bool {
    matches!(t, TileType::Wall | TileType::TorchWall | TileType::PermanentWall)
}

#[test]
fn every_walkable_cell_is_mutually_reachable() {
    for &seed in &SEEDS {
        for depth in [1, 7, 15] {
            let ctx = dug(seed, depth);
            let mut pass: Grid<i16> = Grid::new(DCOLS, DROWS);
            let mut seed_cell = None;
            for (x, y, c) in ctx.grid.iter() {
                if c.is_passable_or_door() {
                    pass.set(x as i32, y as i32, 1);
                    seed_cell.get_or_insert((x as i32, y as i32));
                }
            }
            let total = pass.count(|v| v == 1) as u32;
            let (sx, sy) = seed_cell.expect("a level must have walkable cells");
            let reached = pass.flood_fill(sx, sy, |v| v == 1, 2);
            assert_eq!(reached, total, "seed {} depth {}: disconnected level", seed, depth);
        }
    }
}

#[test]
fn stairs_are_connected_to_each_other() {
    for &seed in &SEEDS {
        let ctx = dug(seed, 5);
        let rec = &ctx.levels[4];
        let down = rec.down_stairs_loc.unwrap();
        let up = rec.up_stairs_loc.unwrap();
        let mut pass: Grid<i16> = Grid::new(DCOLS, DROWS);
        for (x, y, c) in ctx.grid.iter() {
            if c.is_passable_or_door() {
                pass.set(x as i32, y as i32, 1);
            }
        }
        assert_eq!(pass.get(down.0, down.1), Some(1), "seed {}: down stairs walkable", seed);
        pass.flood_fill(down.0, down.1, |v| v == 1, 2);
        assert_eq!(pass.get(up.0, up.1), Some(2), "seed {}: stairs in one component", seed);
    }
}

#[test]
fn no_diagonal_only_openings_outside_machine_rims() {
    for &seed in &SEEDS {
        let ctx = dug(seed, 3);
        for y in 0..DROWS as i32 - 1 {
            'window: for x in 0..DCOLS as i32 - 1 {
                // Machines may lawfully wall off their perimeter after the
                // diagonal pass, so skip windows that touch one.
                for dy in -1..=2 {
                    for dx in -1..=2 {
                        if let Some(c) = ctx.grid.get(x + dx, y + dy) {
                            if c.machine_number != 0 {
                                continue 'window;
                            }
                        }
                    }
                }
                for k in 0..=1 {
                    let open_a = ctx.grid.cell_is_passable(x + k, y);
                    let open_b = ctx.grid.cell_is_passable(x + 1 - k, y + 1);
                    let full_block = |cx: i32, cy: i32| {
                        let f = ctx.grid.get(cx, cy).unwrap().tile_flags();
                        f.contains(TileFlags::OBSTRUCTS_PASSABILITY)
                            && f.contains(TileFlags::OBSTRUCTS_DIAGONAL_MOVEMENT)
                    };
                    assert!(
                        !(open_a && open_b && full_block(x + 1 - k, y) && full_block(x + k, y + 1)),
                        "seed {}: diagonal-only opening at ({}, {})",
                        seed,
                        x,
                        y
                    );
                }
            }
        }
    }
}

#[test]
fn walls_are_exposed_and_granite_is_buried() {
    for &seed in &SEEDS {
        let ctx = dug(seed, 4);
        for y in 0..DROWS as i32 {
            for x in 0..DCOLS as i32 {
                let tile = ctx.grid.get(x, y).unwrap().tile(Layer::Dungeon);
                if !is_wall_class(tile) && tile != TileType::Granite {
                    continue;
                }
                let mut exposed = false;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        if let Some(n) = ctx.grid.get(x + dx, y + dy) {
                            let f = n.tile_flags();
                            if !f.contains(TileFlags::OBSTRUCTS_PASSABILITY)
                                || !f.contains(TileFlags::OBSTRUCTS_VISION)
                            {
                                exposed = true;
                            }
                        }
                    }
                }
                if tile == TileType::Granite {
                    assert!(!exposed, "seed {}: exposed granite at ({}, {})", seed, x, y);
                } else {
                    assert!(exposed, "seed {}: buried wall at ({}, {})", seed, x, y);
                }
            }
        }
    }
}

#[test]
fn no_orphan_doors_survive() {
    for &seed in &SEEDS {
        let ctx = dug(seed, 6);
        for (x, y, c) in ctx.grid.iter() {
            if c.tile(Layer::Dungeon) != TileType::Door || c.machine_number != 0 {
                continue;
            }
            let (x, y) = (x as i32, y as i32);
            let open = |dx: i32, dy: i32| {
                !ctx.grid.has_terrain_flag(x + dx, y + dy, TileFlags::OBSTRUCTS_PASSABILITY)
            };
            let open_x = open(1, 0) || open(-1, 0);
            let open_y = open(0, 1) || open(0, -1);
            assert!(
                !(open_x && open_y),
                "seed {}: orphan door at ({}, {})",
                seed,
                x,
                y
            );
        }
    }
}

#[test]
fn machine_cells_carry_machine_flags() {
    for &seed in &SEEDS {
        let ctx = dug(seed, 12);
        for (x, y, c) in ctx.grid.iter() {
            if c.machine_number != 0 {
                assert!(
                    c.flags.intersects(CellFlags::IS_IN_MACHINE),
                    "seed {}: bare machine id at ({}, {})",
                    seed,
                    x,
                    y
                );
            }
        }
    }
}

#[test]
fn machine_numbers_are_dense_from_one() {
    let ctx = dug(4242, 14);
    let mut seen = vec![false; ctx.machine_number as usize + 1];
    for (_, _, c) in ctx.grid.iter() {
        if c.machine_number != 0 {
            seen[c.machine_number as usize] = true;
        }
    }
    // Ids are assigned sequentially; rollbacks release them again, so every
    // id at or below the high-water mark that survives must be in range.
    assert!(ctx.machine_number as usize >= seen.iter().filter(|&&s| s).count());
}

#[test]
fn same_seed_same_level() {
    for &seed in &[5u64, 909, 62025] {
        let a = dug(seed, 9);
        let b = dug(seed, 9);
        assert_eq!(a.grid, b.grid, "seed {}: grids differ", seed);
        assert_eq!(a.machine_number, b.machine_number);
        assert_eq!(a.items.len(), b.items.len());
        assert_eq!(a.monsters.len(), b.monsters.len());
        assert_eq!(a.rng.draw_count(), b.rng.draw_count());
    }
}

#[test]
fn cleared_level_is_solid_granite() {
    let mut ctx = GenerationContext::new(1, 1);
    ctx.clear_level();
    for (_, _, c) in ctx.grid.iter() {
        assert_eq!(c.tile(Layer::Dungeon), TileType::Granite);
        assert_eq!(c.tile(Layer::Liquid), TileType::Nothing);
        assert_eq!(c.tile(Layer::Gas), TileType::Nothing);
        assert_eq!(c.tile(Layer::Surface), TileType::Nothing);
        assert!(c.flags.is_empty());
        assert_eq!(c.machine_number, 0);
        assert_eq!(c.volume, 0);
    }
}

#[test]
fn depth_one_has_an_exit_and_no_amulet() {
    let ctx = dug(11, 1);
    let exits =
        ctx.grid.iter().filter(|&(_, _, c)| c.tile(Layer::Dungeon) == TileType::DungeonExit).count();
    assert_eq!(exits, 1);
    assert!(ctx
        .items
        .iter()
        .all(|i| i.category != dungeon_architect::ItemCategory::Amulet));
}

#[test]
fn deepest_level_gets_a_portal_and_water_lakes() {
    let ctx = dug(2026, DEEPEST_LEVEL);
    let portals = ctx
        .grid
        .iter()
        .filter(|&(_, _, c)| c.tile(Layer::Dungeon) == TileType::DungeonPortal)
        .count();
    let down_stairs =
        ctx.grid.iter().filter(|&(_, _, c)| c.tile(Layer::Dungeon) == TileType::DownStairs).count();
    assert_eq!(portals, 1);
    assert_eq!(down_stairs, 0);
    for (x, y, c) in ctx.grid.iter() {
        let liquid = c.tile(Layer::Liquid);
        assert_ne!(liquid, TileType::Lava, "lava lake at ({}, {}) on the deepest level", x, y);
        assert_ne!(liquid, TileType::Chasm, "chasm lake at ({}, {}) on the deepest level", x, y);
        assert_ne!(liquid, TileType::InertBrimstone, "brimstone at ({}, {})", x, y);
    }
}

#[test]
fn waypoints_cover_the_level_within_the_cap() {
    let ctx = dug(314, 8);
    assert!(!ctx.waypoints.is_empty());
    assert!(ctx.waypoints.len() <= dungeon_architect::MAX_WAYPOINT_COUNT);
    for wp in &ctx.waypoints {
        assert!(ctx.grid.cell_is_passable(wp.loc.0, wp.loc.1));
        assert_eq!(wp.distance_map.get(wp.loc.0, wp.loc.1), Some(0));
    }
}

#[test]
fn stats_reflect_the_grid() {
    let ctx = dug(808, 10);
    let stats = ctx.stats();
    assert_eq!(stats.depth, 10);
    assert!(stats.floor_cells > 100, "a level should have real floor space");
    assert_eq!(stats.machines, ctx.machine_number);
    let json = serde_json::to_string(&stats).unwrap();
    assert!(json.contains("\"floor_cells\""));
}
