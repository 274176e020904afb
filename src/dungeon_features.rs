//! Dungeon features: terrain paintbrushes that propagate across the grid by
//! probability-decayed flooding, painting one layer and optionally chaining
//! a subsequent feature.

use crate::analysis::level_is_disconnected_with;
use crate::cell::{Cell, CellFlags, Layer};
use crate::grid::Grid;
use crate::rng::Rng;
use crate::tiles::{TileFlags, TileType};
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DffFlags: u32 {
        const PERMIT_BLOCKING             = 1 << 0;
        const TREAT_AS_BLOCKING           = 1 << 1;
        const SUPERPRIORITY               = 1 << 2;
        const BLOCKED_BY_OTHER_LAYERS     = 1 << 3;
        const CLEAR_LOWER_PRIORITY_TERRAIN = 1 << 4;
        const CLEAR_OTHER_TERRAIN         = 1 << 5;
        const SUBSEQ_EVERYWHERE           = 1 << 6;
    }
}

/// One paintbrush definition.
#[derive(Debug, Clone, Copy)]
pub struct DungeonFeature {
    pub tile: TileType,
    pub layer: Layer,
    pub start_probability: i32,
    pub probability_decrement: i32,
    pub flags: DffFlags,
    pub subsequent: Option<FeatureId>,
    /// When set, propagation only crosses cells containing this tile.
    pub propagation_terrain: Option<TileType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureId {
    GrassPatch,
    DeadGrassPatch,
    FungusPatch,
    FoliagePatch,
    DeadFoliagePatch,
    RubblePatch,
    BonesPatch,
    AshesPatch,
    CarpetArea,
    MudPool,
    ShallowPool,
    SwampBasin,
    CollapsedFloor,
    ChasmEdgeRing,
    PoisonGasCloud,
    SwampGasCloud,
    BrimstoneOutcrop,
    BrimstoneVent,
    ObsidianFloor,
}

const NO_FLAGS: DffFlags = DffFlags::empty();

const fn df(
    tile: TileType,
    layer: Layer,
    start_probability: i32,
    probability_decrement: i32,
    flags: DffFlags,
    subsequent: Option<FeatureId>,
    propagation_terrain: Option<TileType>,
) -> DungeonFeature {
    DungeonFeature { tile, layer, start_probability, probability_decrement, flags, subsequent, propagation_terrain }
}

impl FeatureId {
    pub const fn def(self) -> DungeonFeature {
        use FeatureId::*;
        use Layer::*;
        use TileType as T;
        match self {
            GrassPatch => df(T::Grass, Surface, 75, 10, NO_FLAGS, Some(FungusPatch), None),
            DeadGrassPatch => {
                df(T::DeadGrass, Surface, 75, 10, NO_FLAGS, Some(DeadFoliagePatch), None)
            }
            FungusPatch => df(T::Fungus, Surface, 15, 12, NO_FLAGS, None, None),
            FoliagePatch => df(T::Foliage, Surface, 60, 15, NO_FLAGS, None, Some(T::Grass)),
            DeadFoliagePatch => df(T::DeadFoliage, Surface, 50, 30, NO_FLAGS, None, None),
            RubblePatch => df(T::Rubble, Surface, 45, 23, NO_FLAGS, None, None),
            BonesPatch => df(T::Bones, Surface, 75, 23, NO_FLAGS, None, None),
            AshesPatch => df(T::Ashes, Surface, 50, 25, NO_FLAGS, None, None),
            CarpetArea => df(
                T::Carpet,
                Surface,
                120,
                20,
                DffFlags::SUPERPRIORITY.union(DffFlags::CLEAR_OTHER_TERRAIN),
                None,
                None,
            ),
            MudPool => df(T::Mud, Liquid, 75, 5, NO_FLAGS, None, None),
            ShallowPool => df(T::ShallowWater, Liquid, 50, 5, NO_FLAGS, None, None),
            SwampBasin => df(T::Mud, Liquid, 60, 8, NO_FLAGS, Some(SwampGasCloud), None),
            CollapsedFloor => df(
                T::Chasm,
                Liquid,
                55,
                5,
                DffFlags::TREAT_AS_BLOCKING.union(DffFlags::CLEAR_OTHER_TERRAIN),
                Some(ChasmEdgeRing),
                None,
            ),
            ChasmEdgeRing => df(T::ChasmEdge, Liquid, 100, 100, NO_FLAGS, None, None),
            PoisonGasCloud => df(T::PoisonGas, Gas, 1000, 0, NO_FLAGS, None, None),
            SwampGasCloud => df(T::SwampGas, Gas, 325, 0, NO_FLAGS, None, None),
            BrimstoneOutcrop => df(T::InertBrimstone, Liquid, 60, 7, NO_FLAGS, None, None),
            BrimstoneVent => {
                df(T::ActiveBrimstone, Liquid, 45, 10, NO_FLAGS, None, Some(T::InertBrimstone))
            }
            ObsidianFloor => df(T::Obsidian, Liquid, 100, 30, DffFlags::SUPERPRIORITY, None, None),
        }
    }
}

/// Static view of the whole catalog, mostly for bounds and demo listings.
pub static DF_CATALOG: &[FeatureId] = &[
    FeatureId::GrassPatch,
    FeatureId::DeadGrassPatch,
    FeatureId::FungusPatch,
    FeatureId::FoliagePatch,
    FeatureId::DeadFoliagePatch,
    FeatureId::RubblePatch,
    FeatureId::BonesPatch,
    FeatureId::AshesPatch,
    FeatureId::CarpetArea,
    FeatureId::MudPool,
    FeatureId::ShallowPool,
    FeatureId::SwampBasin,
    FeatureId::CollapsedFloor,
    FeatureId::ChasmEdgeRing,
    FeatureId::PoisonGasCloud,
    FeatureId::SwampGasCloud,
    FeatureId::BrimstoneOutcrop,
    FeatureId::BrimstoneVent,
    FeatureId::ObsidianFloor,
];

/// Runtime effect hooks. Always no-ops during generation; a running game
/// installs real implementations so features refresh display cells and
/// apply instant tile effects.
pub trait SpawnHooks {
    fn refresh_cell(&mut self, _x: i32, _y: i32) {}
    fn apply_tile_effects(&mut self, _x: i32, _y: i32) {}
}

fn cell_has_tile(cell: &Cell, tile: TileType) -> bool {
    cell.layers.iter().any(|&t| t == tile)
}

/// Flood out the spawn footprint for a feature anchored at `(x, y)`.
/// Cells are stamped with their wavefront step number.
pub fn spawn_map_df(
    grid: &Grid<Cell>,
    rng: &mut Rng,
    x: i32,
    y: i32,
    feat: &DungeonFeature,
    spawn_map: &mut Grid<i16>,
) -> bool {
    let require_prop = feat.propagation_terrain.is_some();
    let mut prob = feat.start_probability;
    let mut t: i16 = 1;
    spawn_map.set(x, y, t);
    let mut made_change = true;

    while made_change && prob > 0 {
        made_change = false;
        t += 1;
        for j in 0..grid.height() as i32 {
            for i in 0..grid.width() as i32 {
                if spawn_map.get(i, j) != Some(t - 1) {
                    continue;
                }
                for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
                    let (x2, y2) = (i + dx, j + dy);
                    let Some(cell) = grid.get(x2, y2) else { continue };
                    if spawn_map.get(x2, y2) != Some(0) {
                        continue;
                    }
                    let on_prop = feat
                        .propagation_terrain
                        .map(|p| cell_has_tile(&cell, p))
                        .unwrap_or(false);
                    if require_prop && !on_prop {
                        continue;
                    }
                    if cell.has_tile_flag(TileFlags::OBSTRUCTS_SURFACE_EFFECTS) && !on_prop {
                        continue;
                    }
                    if rng.rand_percent(prob) {
                        spawn_map.set(x2, y2, t);
                        made_change = true;
                    }
                }
            }
        }
        prob -= feat.probability_decrement;
        if t > 100 {
            // Collapse step numbers so the counter can keep wrapping safely.
            for j in 0..grid.height() as i32 {
                for i in 0..grid.width() as i32 {
                    let v = spawn_map.get(i, j).unwrap_or(0);
                    if v == t {
                        spawn_map.set(i, j, 2);
                    } else if v > 0 {
                        spawn_map.set(i, j, 1);
                    }
                }
            }
            t = 2;
        }
    }
    true
}

/// Spawn `feat` at `(x, y)`. Returns whether anything was placed.
///
/// With `abort_if_blocking`, a footprint that would disconnect the level is
/// discarded entirely. The `refresh` hooks fire per stamped cell only when
/// provided (never during generation).
pub fn spawn_dungeon_feature(
    grid: &mut Grid<Cell>,
    rng: &mut Rng,
    x: i32,
    y: i32,
    feat_id: FeatureId,
    abort_if_blocking: bool,
    hooks: Option<&mut dyn SpawnHooks>,
) -> bool {
    let mut hooks = hooks;
    spawn_dungeon_feature_impl(grid, rng, x, y, feat_id, abort_if_blocking, &mut hooks)
}

fn spawn_dungeon_feature_impl(
    grid: &mut Grid<Cell>,
    rng: &mut Rng,
    x: i32,
    y: i32,
    feat_id: FeatureId,
    abort_if_blocking: bool,
    hooks: &mut Option<&mut dyn SpawnHooks>,
) -> bool {
    let feat = feat_id.def();

    if feat.layer == Layer::Gas {
        if let Some(cell) = grid.get_mut(x, y) {
            cell.volume = cell.volume.saturating_add(feat.start_probability as i16);
            cell.set_tile(Layer::Gas, feat.tile);
            if let Some(h) = hooks.as_deref_mut() {
                h.refresh_cell(x, y);
            }
            return true;
        }
        return false;
    }

    let mut spawn_map: Grid<i16> = Grid::new(grid.width(), grid.height());
    spawn_map_df(grid, rng, x, y, &feat, &mut spawn_map);

    let blocking = abort_if_blocking
        && !feat.flags.contains(DffFlags::PERMIT_BLOCKING)
        && (feat.tile.flags().intersects(TileFlags::PATHING_BLOCKER)
            || feat.flags.contains(DffFlags::TREAT_AS_BLOCKING));
    if blocking && level_is_disconnected_with(grid, &spawn_map) > 0 {
        return false;
    }

    let placed = fill_spawn_map(grid, &feat, &spawn_map, hooks);

    if let Some(sub) = feat.subsequent {
        if feat.flags.contains(DffFlags::SUBSEQ_EVERYWHERE) {
            for j in 0..grid.height() as i32 {
                for i in 0..grid.width() as i32 {
                    if spawn_map.get(i, j).unwrap_or(0) > 0 {
                        spawn_dungeon_feature_impl(grid, rng, i, j, sub, false, hooks);
                    }
                }
            }
        } else {
            spawn_dungeon_feature_impl(grid, rng, x, y, sub, false, hooks);
        }
    }
    placed
}

fn fill_spawn_map(
    grid: &mut Grid<Cell>,
    feat: &DungeonFeature,
    spawn_map: &Grid<i16>,
    hooks: &mut Option<&mut dyn SpawnHooks>,
) -> bool {
    let mut placed = false;
    let new_priority = feat.tile.draw_priority();
    for (xu, yu, mark) in spawn_map.iter() {
        if mark == 0 {
            continue;
        }
        let (x, y) = (xu as i32, yu as i32);
        let cell = grid[(xu, yu)];
        let superpriority = feat.flags.contains(DffFlags::SUPERPRIORITY);
        if !superpriority && cell.highest_priority_tile().draw_priority() < new_priority {
            continue;
        }
        if feat.flags.contains(DffFlags::BLOCKED_BY_OTHER_LAYERS)
            && cell.highest_priority_layer() != feat.layer
            && cell.highest_priority_tile().draw_priority() < new_priority
        {
            continue;
        }
        let ignitable = cell.has_tile_flag(TileFlags::CAN_BE_IGNITED);
        let cell = grid.get_mut(x, y).unwrap();
        cell.set_tile(feat.layer, feat.tile);
        // Painting fire onto ignitable terrain catches it alight; anything
        // else resets the bit.
        if feat.tile.flags().contains(TileFlags::IS_FIRE) && ignitable {
            cell.flags.insert(CellFlags::CAUGHT_FIRE_THIS_TURN);
        } else {
            cell.flags.remove(CellFlags::CAUGHT_FIRE_THIS_TURN);
        }
        if feat.flags.contains(DffFlags::CLEAR_OTHER_TERRAIN) {
            for layer in Layer::ALL {
                if layer != feat.layer {
                    let replacement =
                        if layer == Layer::Dungeon { TileType::Floor } else { TileType::Nothing };
                    cell.set_tile(layer, replacement);
                }
            }
        } else if feat.flags.contains(DffFlags::CLEAR_LOWER_PRIORITY_TERRAIN) {
            for layer in Layer::ALL {
                if layer != feat.layer && cell.tile(layer).draw_priority() > new_priority {
                    let replacement =
                        if layer == Layer::Dungeon { TileType::Floor } else { TileType::Nothing };
                    cell.set_tile(layer, replacement);
                }
            }
        }
        if let Some(h) = hooks.as_deref_mut() {
            h.refresh_cell(x, y);
            h.apply_tile_effects(x, y);
        }
        placed = true;
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_grid() -> Grid<Cell> {
        let mut g: Grid<Cell> = Grid::new(30, 20);
        for y in 1..19 {
            for x in 1..29 {
                g.get_mut(x, y).unwrap().clear_to_floor();
            }
        }
        g
    }

    #[test]
    fn grass_spreads_from_the_origin() {
        let mut g = floor_grid();
        let mut rng = Rng::new(17);
        assert!(spawn_dungeon_feature(&mut g, &mut rng, 15, 10, FeatureId::GrassPatch, false, None));
        assert!(g[(15, 10)].tile(Layer::Surface) == TileType::Grass
            || g[(15, 10)].tile(Layer::Surface) == TileType::Fungus);
        let grassy = g.iter().filter(|&(_, _, c)| c.tile(Layer::Surface) != TileType::Nothing).count();
        assert!(grassy > 1, "propagation should reach neighbors");
    }

    #[test]
    fn wavefront_count_is_bounded() {
        let g = floor_grid();
        let mut rng = Rng::new(2);
        let feat = FeatureId::GrassPatch.def();
        let mut spawn_map: Grid<i16> = Grid::new(30, 20);
        spawn_map_df(&g, &mut rng, 15, 10, &feat, &mut spawn_map);
        let max_step = spawn_map.iter().map(|(_, _, v)| v).max().unwrap();
        let bound = (feat.start_probability + feat.probability_decrement - 1)
            / feat.probability_decrement
            + 2;
        assert!(
            (max_step as i32) <= bound,
            "wavefront {} exceeded bound {}",
            max_step,
            bound
        );
    }

    #[test]
    fn gas_features_accumulate_volume() {
        let mut g = floor_grid();
        let mut rng = Rng::new(2);
        spawn_dungeon_feature(&mut g, &mut rng, 5, 5, FeatureId::PoisonGasCloud, false, None);
        assert_eq!(g[(5, 5)].tile(Layer::Gas), TileType::PoisonGas);
        assert!(g[(5, 5)].volume > 0);
    }

    #[test]
    fn surface_effects_do_not_enter_walls() {
        let mut g = floor_grid();
        let mut rng = Rng::new(9);
        spawn_dungeon_feature(&mut g, &mut rng, 2, 2, FeatureId::GrassPatch, false, None);
        assert_eq!(g[(0, 0)].tile(Layer::Surface), TileType::Nothing);
    }
}
