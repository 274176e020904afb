//! Autogenerators: lightweight depth-scaled spawners that sprinkle terrain,
//! dungeon features, and area machines across the finished topology.

use crate::architect::{random_matching_location, GenerationContext};
use crate::cell::Layer;
use crate::dungeon_features::{spawn_dungeon_feature, FeatureId};
use crate::grid::Grid;
use crate::machines::build_a_machine;
use crate::tiles::TileType;

/// One spawner row: what to place, where it may root, and how its count
/// scales with depth (`count = min(max, (intercept + depth * slope) / 100)`,
/// plus probabilistic increments at `frequency` percent each).
#[derive(Debug, Clone, Copy)]
pub struct AutoGenerator {
    pub terrain: Option<TileType>,
    pub layer: Layer,
    pub feature: Option<FeatureId>,
    /// Index into [`crate::blueprints::BLUEPRINT_CATALOG`].
    pub machine: Option<usize>,
    pub required_dungeon: Option<TileType>,
    pub required_liquid: Option<TileType>,
    pub min_depth: i32,
    pub max_depth: i32,
    pub frequency: i32,
    pub min_intercept: i32,
    pub min_slope: i32,
    pub max_number: i32,
}

const AG: AutoGenerator = AutoGenerator {
    terrain: None,
    layer: Layer::Dungeon,
    feature: None,
    machine: None,
    required_dungeon: Some(TileType::Floor),
    required_liquid: Some(TileType::Nothing),
    min_depth: 1,
    max_depth: 26,
    frequency: 0,
    min_intercept: 0,
    min_slope: 0,
    max_number: 1,
};

pub static AUTOGEN_CATALOG: &[AutoGenerator] = &[
    // Terrain flavor.
    AutoGenerator { feature: Some(FeatureId::GrassPatch), max_depth: 10, frequency: 50, min_intercept: 1000, min_slope: -80, max_number: 10, ..AG },
    AutoGenerator { feature: Some(FeatureId::DeadGrassPatch), min_depth: 4, max_depth: 9, frequency: 50, min_intercept: 500, min_slope: 100, max_number: 10, ..AG },
    AutoGenerator { feature: Some(FeatureId::FungusPatch), min_depth: 3, frequency: 50, min_slope: 15, max_number: 3, ..AG },
    AutoGenerator { feature: Some(FeatureId::FoliagePatch), min_depth: 2, max_depth: 8, frequency: 40, min_intercept: 300, max_number: 4, ..AG },
    AutoGenerator { feature: Some(FeatureId::RubblePatch), frequency: 30, min_intercept: 100, max_number: 4, ..AG },
    AutoGenerator { feature: Some(FeatureId::BonesPatch), min_depth: 12, frequency: 30, min_slope: 10, max_number: 4, ..AG },
    AutoGenerator { feature: Some(FeatureId::MudPool), min_depth: 12, frequency: 30, min_intercept: 200, max_number: 3, ..AG },
    AutoGenerator { feature: Some(FeatureId::BrimstoneVent), required_liquid: Some(TileType::InertBrimstone), min_depth: 17, frequency: 50, min_intercept: 200, max_number: 4, ..AG },
    AutoGenerator { feature: Some(FeatureId::ShallowPool), min_depth: 2, frequency: 30, min_intercept: 150, max_number: 2, ..AG },
    AutoGenerator { terrain: Some(TileType::TorchWall), required_dungeon: Some(TileType::Wall), required_liquid: None, min_depth: 6, frequency: 40, min_intercept: 200, min_slope: 30, max_number: 10, ..AG },
    AutoGenerator { terrain: Some(TileType::Statue), min_depth: 10, frequency: 20, min_intercept: 100, max_number: 3, ..AG },
    // Traps.
    AutoGenerator { terrain: Some(TileType::PoisonGasTrapHidden), min_depth: 5, frequency: 30, min_slope: 10, max_number: 3, ..AG },
    AutoGenerator { terrain: Some(TileType::TrapDoorHidden), min_depth: 2, max_depth: 25, frequency: 30, min_slope: 10, max_number: 2, ..AG },
    AutoGenerator { terrain: Some(TileType::FireTrapHidden), min_depth: 8, frequency: 30, min_slope: 10, max_number: 3, ..AG },
    AutoGenerator { terrain: Some(TileType::FloodTrapHidden), min_depth: 8, frequency: 30, min_slope: 8, max_number: 2, ..AG },
    AutoGenerator { terrain: Some(TileType::NetTrapHidden), min_depth: 6, frequency: 30, min_slope: 8, max_number: 2, ..AG },
    AutoGenerator { terrain: Some(TileType::AlarmTrapHidden), min_depth: 10, frequency: 20, min_slope: 8, max_number: 2, ..AG },
    // Area machines.
    AutoGenerator { machine: Some(21), min_depth: 12, frequency: 15, min_intercept: 100, max_number: 1, ..AG },
    AutoGenerator { machine: Some(22), min_depth: 2, max_depth: 10, frequency: 15, min_intercept: 100, max_number: 1, ..AG },
    AutoGenerator { machine: Some(23), min_depth: 4, max_depth: 20, frequency: 15, min_intercept: 100, max_number: 1, ..AG },
    AutoGenerator { machine: Some(14), min_depth: 3, max_depth: 25, frequency: 15, min_intercept: 50, min_slope: 2, max_number: 1, ..AG },
];

/// Run one autogenerator pass. Machine rows run only on the machine pass
/// (after `add_machines`), everything else on the terrain pass before it.
pub fn run_autogenerators(ctx: &mut GenerationContext, machines_only: bool) {
    for ag in AUTOGEN_CATALOG {
        if ag.machine.is_some() != machines_only {
            continue;
        }
        if ctx.depth < ag.min_depth || ctx.depth > ag.max_depth {
            continue;
        }
        let mut count =
            (ag.min_intercept + ctx.depth * ag.min_slope) / 100;
        count = count.clamp(0, ag.max_number);
        while count < ag.max_number && ctx.rng.rand_percent(ag.frequency) {
            count += 1;
        }
        for _ in 0..count {
            let Some((x, y)) = random_matching_location(
                &ctx.grid,
                &mut ctx.rng,
                ag.required_dungeon,
                ag.required_liquid,
            ) else {
                continue;
            };
            if let Some(bp) = ag.machine {
                build_a_machine(ctx, Some(bp), Some((x, y)), crate::blueprints::BpFlags::empty(), None, None, None);
            } else {
                if let Some(feat) = ag.feature {
                    spawn_dungeon_feature(&mut ctx.grid, &mut ctx.rng, x, y, feat, true, None);
                }
                if let Some(tile) = ag.terrain {
                    // A blocking tile may not pinch off the level.
                    if tile.flags().intersects(crate::tiles::TileFlags::PATHING_BLOCKER) {
                        let mut blocking: Grid<i16> =
                            Grid::new(ctx.grid.width(), ctx.grid.height());
                        blocking.set(x, y, 1);
                        if crate::analysis::level_is_disconnected_with(&ctx.grid, &blocking) > 0 {
                            continue;
                        }
                    }
                    if let Some(cell) = ctx.grid.get_mut(x, y) {
                        cell.set_tile(ag.layer, tile);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_rows_reference_real_blueprints() {
        for ag in AUTOGEN_CATALOG {
            if let Some(bp) = ag.machine {
                assert!(bp < crate::blueprints::BLUEPRINT_CATALOG.len());
            }
        }
    }

    #[test]
    fn depth_ranges_are_ordered() {
        for ag in AUTOGEN_CATALOG {
            assert!(ag.min_depth <= ag.max_depth);
        }
    }
}
