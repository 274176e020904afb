//! Bridge builder properties on generated levels.

use dungeon_architect::{
    build_a_bridge, dig_dungeon, GenerationContext, Layer, TileFlags, TileType,
};

#[test]
fn failed_bridge_calls_never_mutate_the_grid() {
    // Drive the builder to exhaustion by hand; every failing call must
    // leave the grid exactly as it found it.
    for seed in [2u64, 300, 4444] {
        let mut ctx = GenerationContext::new(seed, 9);
        dig_dungeon(&mut ctx).unwrap();
        let mut paved = 0;
        loop {
            let before = ctx.grid.clone();
            if build_a_bridge(&mut ctx.grid, ctx.depth, &mut ctx.rng) {
                paved += 1;
                assert!(paved < 100, "seed {}: bridge builder never saturates", seed);
            } else {
                assert_eq!(ctx.grid, before, "seed {}: failed call mutated the grid", seed);
                break;
            }
        }
    }
}

#[test]
fn bridges_span_bridgeable_terrain_only() {
    for seed in [15u64, 166, 52025] {
        let mut ctx = GenerationContext::new(seed, 12);
        dig_dungeon(&mut ctx).unwrap();
        for (x, y, c) in ctx.grid.iter() {
            if c.tile(Layer::Liquid) != TileType::Bridge {
                continue;
            }
            // A bridge cell is walkable and was carved over a chasm, whose
            // neighbors along one axis continue the span or reach a bank.
            assert!(c.is_passable(), "seed {}: impassable bridge at ({}, {})", seed, x, y);
            let (x, y) = (x as i32, y as i32);
            let linked = [(1, 0), (-1, 0), (0, 1), (0, -1)].iter().any(|&(dx, dy)| {
                let n = ctx.grid.get(x + dx, y + dy);
                n.is_some_and(|n| {
                    n.tile(Layer::Liquid) == TileType::Bridge
                        || n.tile(Layer::Surface) == TileType::BridgeEdge
                })
            });
            assert!(linked, "seed {}: orphaned bridge cell at ({}, {})", seed, x, y);
        }
    }
}

#[test]
fn bridge_edges_sit_on_walkable_banks() {
    for seed in [15u64, 166, 52025] {
        let mut ctx = GenerationContext::new(seed, 14);
        dig_dungeon(&mut ctx).unwrap();
        for (x, y, c) in ctx.grid.iter() {
            if c.tile(Layer::Surface) == TileType::BridgeEdge {
                assert!(
                    !c.has_tile_flag(TileFlags::OBSTRUCTS_PASSABILITY),
                    "seed {}: bridge edge inside a wall at ({}, {})",
                    seed,
                    x,
                    y
                );
            }
        }
    }
}
