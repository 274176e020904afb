//! Map analysis on crafted maps and fully generated levels: chokepoints,
//! gate sites, loops, and the disconnection probe must agree with each
//! other end to end.

use dungeon_architect::{
    analyze_map, dig_dungeon, level_is_disconnected_with, CellFlags, GenerationContext, Grid,
    DCOLS, DROWS,
};

/// Two rooms joined by one corridor, built on a real generation context.
fn dumbbell_context() -> GenerationContext {
    let mut ctx = GenerationContext::new(1, 2);
    ctx.clear_level();
    for y in 10..15 {
        for x in 5..10 {
            ctx.grid.get_mut(x, y).unwrap().clear_to_floor();
        }
    }
    for y in 10..15 {
        for x in 20..25 {
            ctx.grid.get_mut(x, y).unwrap().clear_to_floor();
        }
    }
    for x in 10..20 {
        ctx.grid.get_mut(x, 12).unwrap().clear_to_floor();
    }
    ctx
}

#[test]
fn corridor_cells_become_gate_sites() {
    let mut ctx = dumbbell_context();
    analyze_map(&mut ctx.grid, &mut ctx.choke_map, true);
    let mid = ctx.grid.get(15, 12).unwrap();
    assert!(mid.flags.contains(CellFlags::IS_CHOKEPOINT));
    assert!(mid.flags.contains(CellFlags::IS_GATE_SITE));
    let choke = ctx.choke_map.get(15, 12).unwrap();
    assert!(choke > 0 && choke < 60, "choke value {} should be one pocket", choke);
    assert!(!ctx.grid.get(7, 12).unwrap().flags.contains(CellFlags::IS_CHOKEPOINT));
}

#[test]
fn blocking_a_gate_site_disconnects_the_dumbbell() {
    let mut ctx = dumbbell_context();
    analyze_map(&mut ctx.grid, &mut ctx.choke_map, true);
    let mut blocking: Grid<i16> = Grid::new(DCOLS, DROWS);
    blocking.set(15, 12, 1);
    let cut = level_is_disconnected_with(&ctx.grid, &blocking);
    assert!(cut > 0, "severing the corridor must split the map");
    assert_eq!(cut as i32, ctx.choke_map.get(15, 12).unwrap(), "pocket sizes must agree");
}

#[test]
fn generated_levels_have_consistent_chokepoints() {
    for seed in [4u64, 190, 23232] {
        let mut ctx = GenerationContext::new(seed, 6);
        dig_dungeon(&mut ctx).unwrap();
        analyze_map(&mut ctx.grid, &mut ctx.choke_map, true);

        let mut verified = 0;
        for y in 0..DROWS as i32 {
            for x in 0..DCOLS as i32 {
                let cell = ctx.grid.get(x, y).unwrap();
                if !cell.flags.contains(CellFlags::IS_GATE_SITE) {
                    continue;
                }
                assert!(
                    cell.flags.contains(CellFlags::IS_CHOKEPOINT),
                    "seed {}: gate site without chokepoint at ({}, {})",
                    seed,
                    x,
                    y
                );
                let choke = ctx.choke_map.get(x, y).unwrap();
                assert!(choke > 0, "seed {}: gate with empty pocket at ({}, {})", seed, x, y);
                // Blocking the gate must actually cut off a pocket.
                if verified < 5 {
                    let mut blocking: Grid<i16> = Grid::new(DCOLS, DROWS);
                    blocking.set(x, y, 1);
                    assert!(
                        level_is_disconnected_with(&ctx.grid, &blocking) > 0,
                        "seed {}: gate at ({}, {}) does not guard anything",
                        seed,
                        x,
                        y
                    );
                    verified += 1;
                }
            }
        }
    }
}

#[test]
fn loops_and_chokepoints_are_disjoint() {
    for seed in [4u64, 190] {
        let mut ctx = GenerationContext::new(seed, 8);
        dig_dungeon(&mut ctx).unwrap();
        analyze_map(&mut ctx.grid, &mut ctx.choke_map, true);
        for (x, y, c) in ctx.grid.iter() {
            assert!(
                !(c.flags.contains(CellFlags::IN_LOOP) && c.flags.contains(CellFlags::IS_CHOKEPOINT)),
                "seed {}: ({}, {}) is both loop and chokepoint",
                seed,
                x,
                y
            );
        }
    }
}
