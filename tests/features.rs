//! Dungeon-feature spawning: propagation bounds, priorities, chaining, and
//! the blocking abort.

use dungeon_architect::{
    spawn_dungeon_feature, spawn_map_df, Cell, CellFlags, DffFlags, FeatureId, Grid, Layer, Rng,
    TileType,
};

fn floor_grid(w: usize, h: usize) -> Grid<Cell> {
    let mut g: Grid<Cell> = Grid::new(w, h);
    for y in 1..h as i32 - 1 {
        for x in 1..w as i32 - 1 {
            g.get_mut(x, y).unwrap().clear_to_floor();
        }
    }
    g
}

#[test]
fn every_catalog_feature_terminates_within_its_bound() {
    for &id in dungeon_architect::DF_CATALOG {
        let feat = id.def();
        if feat.layer == Layer::Gas || feat.probability_decrement <= 0 {
            continue;
        }
        let g = floor_grid(40, 25);
        let mut rng = Rng::new(1234);
        let mut spawn_map: Grid<i16> = Grid::new(40, 25);
        spawn_map_df(&g, &mut rng, 20, 12, &feat, &mut spawn_map);
        let max_step = spawn_map.iter().map(|(_, _, v)| v).max().unwrap() as i32;
        let bound = (feat.start_probability + feat.probability_decrement - 1)
            / feat.probability_decrement
            + 2;
        assert!(max_step <= bound, "{:?}: {} wavefronts > bound {}", id, max_step, bound);
    }
}

#[test]
fn blocking_feature_aborts_rather_than_severing_a_corridor() {
    // One corridor; a collapsed floor dropped mid-corridor must refuse.
    let mut g: Grid<Cell> = Grid::new(30, 9);
    for x in 1..29 {
        g.get_mut(x, 4).unwrap().clear_to_floor();
    }
    let before = g.clone();
    let mut rng = Rng::new(77);
    let placed =
        spawn_dungeon_feature(&mut g, &mut rng, 15, 4, FeatureId::CollapsedFloor, true, None);
    assert!(!placed, "a level-severing collapse must abort");
    assert_eq!(g, before, "an aborted feature must leave no residue");
}

#[test]
fn carpet_clears_other_terrain() {
    let mut g = floor_grid(20, 20);
    g.get_mut(10, 10).unwrap().set_tile(Layer::Surface, TileType::Bones);
    let mut rng = Rng::new(5);
    assert!(spawn_dungeon_feature(&mut g, &mut rng, 10, 10, FeatureId::CarpetArea, false, None));
    assert_eq!(g[(10, 10)].tile(Layer::Surface), TileType::Carpet);
    assert!(FeatureId::CarpetArea.def().flags.contains(DffFlags::CLEAR_OTHER_TERRAIN));
}

#[test]
fn grass_chains_into_fungus_at_the_origin() {
    // GrassPatch chains a FungusPatch; whatever wins the cell, the surface
    // layer must not stay empty at the origin.
    let mut g = floor_grid(30, 30);
    let mut rng = Rng::new(42);
    spawn_dungeon_feature(&mut g, &mut rng, 15, 15, FeatureId::GrassPatch, false, None);
    let t = g[(15, 15)].tile(Layer::Surface);
    assert!(t == TileType::Grass || t == TileType::Fungus, "origin surface was {:?}", t);
}

#[test]
fn gas_volume_accumulates_across_spawns() {
    let mut g = floor_grid(10, 10);
    let mut rng = Rng::new(9);
    spawn_dungeon_feature(&mut g, &mut rng, 5, 5, FeatureId::SwampGasCloud, false, None);
    let first = g[(5, 5)].volume;
    spawn_dungeon_feature(&mut g, &mut rng, 5, 5, FeatureId::SwampGasCloud, false, None);
    assert!(g[(5, 5)].volume > first);
    assert_eq!(g[(5, 5)].tile(Layer::Gas), TileType::SwampGas);
}

#[test]
fn propagation_respects_required_terrain() {
    // Foliage only spreads across grass; with a single grass cell, the
    // spawn stays confined to it and the origin.
    let mut g = floor_grid(20, 20);
    g.get_mut(10, 10).unwrap().set_tile(Layer::Surface, TileType::Grass);
    let feat = FeatureId::FoliagePatch.def();
    let mut spawn_map: Grid<i16> = Grid::new(20, 20);
    let mut rng = Rng::new(3);
    spawn_map_df(&g, &mut rng, 10, 10, &feat, &mut spawn_map);
    for (x, y, v) in spawn_map.iter() {
        if v > 0 && (x, y) != (10, 10) {
            panic!("foliage escaped its grass at ({}, {})", x, y);
        }
    }
}

#[test]
fn brimstone_vents_ignite_their_bed() {
    // Active brimstone painted over an inert brimstone field catches fire.
    let mut g = floor_grid(20, 20);
    for y in 8..13 {
        for x in 8..13 {
            g.get_mut(x, y).unwrap().set_tile(Layer::Liquid, TileType::InertBrimstone);
        }
    }
    let mut rng = Rng::new(61);
    assert!(spawn_dungeon_feature(&mut g, &mut rng, 10, 10, FeatureId::BrimstoneVent, false, None));
    assert_eq!(g[(10, 10)].tile(Layer::Liquid), TileType::ActiveBrimstone);
    assert!(g[(10, 10)].flags.contains(CellFlags::CAUGHT_FIRE_THIS_TURN));
    // The vent never escapes its propagation terrain.
    assert_eq!(g[(2, 2)].tile(Layer::Liquid), TileType::Nothing);
}

#[test]
fn spawned_cells_never_carry_stale_fire_marks() {
    let mut g = floor_grid(20, 20);
    g.get_mut(10, 10).unwrap().flags |= CellFlags::CAUGHT_FIRE_THIS_TURN;
    let mut rng = Rng::new(8);
    spawn_dungeon_feature(&mut g, &mut rng, 10, 10, FeatureId::GrassPatch, false, None);
    assert!(!g[(10, 10)].flags.contains(CellFlags::CAUGHT_FIRE_THIS_TURN));
}
