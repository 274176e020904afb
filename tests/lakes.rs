//! Lake acceptance behavior on crafted topologies.

use dungeon_architect::{
    design_lakes, fill_lakes, lake_disrupts_passability, Cell, GenerationContext, Grid, Layer,
    Rng, TileType, DCOLS, DROWS,
};

/// A single east-west corridor; everything else is rock.
fn corridor_grid() -> Grid<Cell> {
    let mut g: Grid<Cell> = Grid::new(DCOLS, DROWS);
    for x in 1..DCOLS as i32 - 1 {
        g.get_mut(x, 14).unwrap().clear_to_floor();
    }
    g
}

#[test]
fn blob_across_the_corridor_is_rejected() {
    let grid = corridor_grid();
    let lake_map: Grid<i16> = Grid::new(DCOLS, DROWS);
    // A 3x7 blob column dropped over the corridor severs it.
    let mut blob: Grid<i16> = Grid::new(DCOLS, DROWS);
    for y in 0..7 {
        for x in 0..3 {
            blob.set(x, y, 1);
        }
    }
    assert!(lake_disrupts_passability(&grid, &lake_map, &blob, 30, 11));
}

#[test]
fn blob_clear_of_the_corridor_is_accepted() {
    let grid = corridor_grid();
    let lake_map: Grid<i16> = Grid::new(DCOLS, DROWS);
    let mut blob: Grid<i16> = Grid::new(DCOLS, DROWS);
    for y in 0..5 {
        for x in 0..5 {
            blob.set(x, y, 1);
        }
    }
    // Placed well above the corridor, in solid rock.
    assert!(!lake_disrupts_passability(&grid, &lake_map, &blob, 30, 2));
}

#[test]
fn designed_lakes_never_break_a_single_corridor() {
    for seed in [1u64, 17, 400, 9999] {
        let mut ctx = GenerationContext::new(seed, 5);
        ctx.clear_level();
        ctx.grid = corridor_grid();
        let mut lake_map: Grid<i16> = Grid::new(DCOLS, DROWS);
        design_lakes(&mut ctx.grid, &mut lake_map, &mut ctx.rng);
        fill_lakes(&mut ctx.grid, &mut lake_map, 5, 26, 4, 17, &mut ctx.rng);

        // The corridor is still one walkable piece.
        let mut pass: Grid<i16> = Grid::new(DCOLS, DROWS);
        for (x, y, c) in ctx.grid.iter() {
            if c.is_passable_or_door() {
                pass.set(x as i32, y as i32, 1);
            }
        }
        let total = pass.count(|v| v == 1) as u32;
        let seed_cell = ctx.grid.iter().find(|&(_, _, c)| c.is_passable_or_door()).unwrap();
        let reached = pass.flood_fill(seed_cell.0 as i32, seed_cell.1 as i32, |v| v == 1, 2);
        assert_eq!(reached, total, "seed {}: lake severed the corridor", seed);
    }
}

#[test]
fn lake_cells_are_floored_and_wet() {
    let mut ctx = GenerationContext::new(52, 8);
    ctx.clear_level();
    for y in 1..DROWS as i32 - 1 {
        for x in 1..DCOLS as i32 - 1 {
            ctx.grid.get_mut(x, y).unwrap().clear_to_floor();
        }
    }
    let mut lake_map: Grid<i16> = Grid::new(DCOLS, DROWS);
    design_lakes(&mut ctx.grid, &mut lake_map, &mut ctx.rng);
    let designed = lake_map.count(|v| v == 1);
    assert!(designed > 0, "an open level should accept at least one lake");
    fill_lakes(&mut ctx.grid, &mut lake_map, 8, 26, 4, 17, &mut ctx.rng);
    for (x, y, v) in lake_map.iter() {
        if v != 0 {
            let c = ctx.grid.get(x as i32, y as i32).unwrap();
            assert_eq!(c.tile(Layer::Dungeon), TileType::Floor);
            assert_ne!(c.tile(Layer::Liquid), TileType::Nothing, "dry lake cell at ({}, {})", x, y);
        }
    }
}

#[test]
fn liquid_choice_is_deterministic_per_seed() {
    let a = dungeon_architect::liquid_type(10, 26, 4, 17, &mut Rng::new(5));
    let b = dungeon_architect::liquid_type(10, 26, 4, 17, &mut Rng::new(5));
    assert_eq!(a.0, b.0);
    assert_eq!(a.1, b.1);
    assert_eq!(a.2, b.2);
}
