//! # Dungeon Architect
//!
//! A deterministic procedural dungeon architect for traditional roguelikes.
//!
//! Given a seed and a depth index, the architect lays out one complete level:
//! rooms and corridors, blob-shaped lakes with shallow wreaths, bridges over
//! chasms, doors and secret doors, stairs, terrain flavor, traps, and themed
//! "machines" (keyed puzzles, reward vaults, guarded vestibules) instantiated
//! from a declarative blueprint catalog.
//!
//! ## Quick Start
//!
//! ```rust
//! use dungeon_architect::{dig_dungeon, GenerationContext};
//!
//! let mut ctx = GenerationContext::new(12345, 3);
//! dig_dungeon(&mut ctx).unwrap();
//!
//! println!("{} machines built", ctx.machine_number);
//! ```
//!
//! ## Pipeline
//!
//! Each level is built by one pass over a shared 4-layer cell grid:
//!
//! 1. carve rooms and corridors ([`carve_dungeon`])
//! 2. design and fill lakes ([`design_lakes`], [`fill_lakes`])
//! 3. run autogenerators ([`run_autogenerators`])
//! 4. build machines from blueprints ([`add_machines`])
//! 5. pave bridges ([`build_a_bridge`])
//! 6. finish walls and doors ([`finish_walls`], [`finish_doors`])
//! 7. place stairs and waypoints
//!
//! ## Determinism
//!
//! All substantive decisions draw from a single seeded ChaCha8 stream in a
//! fixed order; two runs with the same seed and depth produce byte-identical
//! grids. Cosmetic shuffles use a second, independent stream.

mod analysis;
mod architect;
mod autogen;
mod blob;
mod blueprints;
mod bridges;
mod carver;
mod cell;
mod dijkstra;
mod dungeon_features;
mod error;
mod finish;
mod fov;
mod grid;
mod items;
mod lakes;
mod machines;
mod monsters;
mod rng;
mod tiles;

pub use analysis::{analyze_map, level_is_disconnected_with};
pub use architect::{
    dig_dungeon, place_stairs, setup_waypoints, valid_stair_loc, GenerationContext, LevelRecord,
    LevelStats, Waypoint, AMULET_LEVEL, DCOLS, DEEPEST_LEVEL, DROWS, MACHINES_BUFFER_LENGTH,
    MAX_WAYPOINT_COUNT, MINIMUM_BRIMSTONE_LEVEL, MINIMUM_LAVA_LEVEL, NUMBER_TERRAIN_LAYERS,
    WAYPOINT_SIGHT_RADIUS,
};
pub use autogen::{run_autogenerators, AutoGenerator, AUTOGEN_CATALOG};
pub use blob::{create_blob_on_grid, BlobBounds, BlobParams};
pub use blueprints::{
    Blueprint, BpFlags, MachineFeature, MfFlags, AMULET_BLUEPRINT, BLUEPRINT_CATALOG,
    LOCKED_DOOR_VESTIBULE,
};
pub use bridges::build_a_bridge;
pub use carver::{carve_dungeon, DungeonProfile, RoomType};
pub use cell::{Cell, CellFlags, Layer};
pub use dijkstra::{dijkstra_scan, pathing_distance, PDS_FORBIDDEN, PDS_OBSTRUCTION, UNREACHABLE};
pub use dungeon_features::{
    spawn_dungeon_feature, spawn_map_df, DffFlags, DungeonFeature, FeatureId, SpawnHooks,
    DF_CATALOG,
};
pub use error::ArchitectError;
pub use finish::{finish_doors, finish_walls, remove_diagonal_openings};
pub use fov::get_fov_mask;
pub use grid::Grid;
pub use items::{
    generate_item, place_item_at, remove_item_from_floor, Item, ItemCategory, ItemFlags, ItemId,
    KeyLoc, KEY_CAGE, KEY_DOOR, KEY_PORTAL,
};
pub use lakes::{
    clean_up_lake_boundaries, design_lakes, fill_lakes, lake_disrupts_passability, liquid_type,
};
pub use machines::{add_machines, blueprint_qualifies, build_a_machine};
pub use monsters::{
    generate_monster, kill_creature, monster_at_loc, spawn_horde, Creature, CreatureId,
    CreatureState, HordeDef, HordeFlags, MonsterKind, HORDE_CATALOG,
};
pub use rng::{fill_sequential_list, ClumpRange, Rng};
pub use tiles::{TileDef, TileFlags, TileMechFlags, TileType};
