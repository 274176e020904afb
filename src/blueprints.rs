//! Machine blueprints: declarative templates for keyed puzzles, reward
//! vaults, guarded vestibules, and themed hazard rooms.
//!
//! A blueprint is pure data: a depth band, an interior-size window, a flag
//! set, and an ordered list of feature directives. One procedure
//! ([`crate::machines::build_a_machine`]) interprets them all.

use crate::cell::Layer;
use crate::dungeon_features::FeatureId;
use crate::items::{ItemCategory, ItemFlags, KEY_CAGE, KEY_DOOR};
use crate::monsters::{HordeFlags, MonsterKind};
use crate::tiles::TileType;
use bitflags::bitflags;

bitflags! {
    /// Blueprint-level flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BpFlags: u32 {
        const ROOM                   = 1 << 0;
        const VESTIBULE              = 1 << 1;
        const REWARD                 = 1 << 2;
        const ADOPT_ITEM             = 1 << 3;
        const PURGE_INTERIOR         = 1 << 4;
        const PURGE_LIQUIDS          = 1 << 5;
        const PURGE_PATHING_BLOCKERS = 1 << 6;
        const SURROUND_WITH_WALLS    = 1 << 7;
        const MAXIMIZE_INTERIOR      = 1 << 8;
        const OPEN_INTERIOR          = 1 << 9;
        const REDESIGN_INTERIOR      = 1 << 10;
        const IMPREGNABLE            = 1 << 11;
        const TREAT_AS_BLOCKING      = 1 << 12;
        const REQUIRE_BLOCKING       = 1 << 13;
        const NO_INTERIOR_FLAG       = 1 << 14;
    }
}

bitflags! {
    /// Per-feature flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MfFlags: u32 {
        const GENERATE_ITEM             = 1 << 0;
        const ADOPT_ITEM                = 1 << 1;
        const OUTSOURCE_ITEM_TO_MACHINE = 1 << 2;
        const BUILD_VESTIBULE           = 1 << 3;
        const BUILD_AT_ORIGIN           = 1 << 4;
        const BUILD_IN_WALLS            = 1 << 5;
        const BUILD_ANYWHERE_ON_LEVEL   = 1 << 6;
        const NEAR_ORIGIN               = 1 << 7;
        const FAR_FROM_ORIGIN           = 1 << 8;
        const IN_VIEW_OF_ORIGIN         = 1 << 9;
        const IN_PASSABLE_VIEW_OF_ORIGIN = 1 << 10;
        const NOT_IN_HALLWAY            = 1 << 11;
        const NOT_ON_LEVEL_PERIMETER    = 1 << 12;
        const TREAT_AS_BLOCKING         = 1 << 13;
        const PERMIT_BLOCKING           = 1 << 14;
        const IMPREGNABLE               = 1 << 15;
        const EVERYWHERE                = 1 << 16;
        const ALTERNATIVE               = 1 << 17;
        const ALTERNATIVE_2             = 1 << 18;
        const REPEAT_UNTIL_NO_PROGRESS  = 1 << 19;
        const MONSTER_TAKE_ITEM         = 1 << 20;
        const MONSTER_SLEEPING          = 1 << 21;
        const MONSTER_FLEEING           = 1 << 22;
        const MONSTERS_DORMANT          = 1 << 23;
        const GENERATE_HORDE            = 1 << 24;
        const KEY_DISPOSABLE            = 1 << 25;
        const SKELETON_KEY              = 1 << 26;
        const NO_THROWING_WEAPONS       = 1 << 27;
        const REQUIRE_GOOD_RUNIC        = 1 << 28;
        const REQUIRE_HEAVY_WEAPON      = 1 << 29;
    }
}

/// One placement directive within a blueprint.
#[derive(Debug, Clone, Copy)]
pub struct MachineFeature {
    pub feature: Option<FeatureId>,
    pub terrain: Option<TileType>,
    pub layer: Layer,
    pub instance_count: (i32, i32),
    pub minimum_instance_count: i32,
    pub item_category: Option<ItemCategory>,
    /// `-1` draws a random kind within the category.
    pub item_kind: i32,
    pub monster_kind: Option<MonsterKind>,
    pub personal_space: i32,
    pub horde_flags: HordeFlags,
    pub item_flags: ItemFlags,
    pub flags: MfFlags,
}

/// Baseline feature every catalog entry amends.
pub const FEATURE: MachineFeature = MachineFeature {
    feature: None,
    terrain: None,
    layer: Layer::Dungeon,
    instance_count: (1, 1),
    minimum_instance_count: 1,
    item_category: None,
    item_kind: -1,
    monster_kind: None,
    personal_space: 0,
    horde_flags: HordeFlags::empty(),
    item_flags: ItemFlags::empty(),
    flags: MfFlags::empty(),
};

#[derive(Debug, Clone, Copy)]
pub struct Blueprint {
    pub name: &'static str,
    pub depth_range: (i32, i32),
    /// Interior cell-count window (for rooms: the choke pocket size).
    pub room_size: (i32, i32),
    pub frequency: i32,
    pub flags: BpFlags,
    pub features: &'static [MachineFeature],
}

pub const AMULET_BLUEPRINT: usize = 0;
pub const LOCKED_DOOR_VESTIBULE: usize = 16;

pub static BLUEPRINT_CATALOG: &[Blueprint] = &[
    // 0 -- the amulet chamber, built once on the amulet level.
    Blueprint {
        name: "amulet chamber",
        depth_range: (26, 26),
        room_size: (10, 100),
        frequency: 0,
        flags: BpFlags::ROOM
            .union(BpFlags::REWARD)
            .union(BpFlags::PURGE_INTERIOR)
            .union(BpFlags::SURROUND_WITH_WALLS)
            .union(BpFlags::OPEN_INTERIOR),
        features: &[
            MachineFeature {
                terrain: Some(TileType::Pedestal),
                item_category: Some(ItemCategory::Amulet),
                item_kind: 0,
                personal_space: 2,
                flags: MfFlags::GENERATE_ITEM
                    .union(MfFlags::FAR_FROM_ORIGIN)
                    .union(MfFlags::TREAT_AS_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                minimum_instance_count: 0,
                horde_flags: HordeFlags::MACHINE_BOSS,
                flags: MfFlags::GENERATE_HORDE
                    .union(MfFlags::MONSTERS_DORMANT)
                    .union(MfFlags::FAR_FROM_ORIGIN),
                ..FEATURE
            },
            MachineFeature {
                flags: MfFlags::BUILD_AT_ORIGIN
                    .union(MfFlags::BUILD_VESTIBULE)
                    .union(MfFlags::PERMIT_BLOCKING),
                ..FEATURE
            },
        ],
    },
    // 1 -- a treasure vault: loot on pedestals behind a sealed door.
    Blueprint {
        name: "treasure vault",
        depth_range: (8, 26),
        room_size: (10, 60),
        frequency: 15,
        flags: BpFlags::ROOM
            .union(BpFlags::REWARD)
            .union(BpFlags::PURGE_INTERIOR)
            .union(BpFlags::SURROUND_WITH_WALLS)
            .union(BpFlags::OPEN_INTERIOR)
            .union(BpFlags::IMPREGNABLE),
        features: &[
            MachineFeature {
                feature: Some(FeatureId::CarpetArea),
                minimum_instance_count: 0,
                flags: MfFlags::BUILD_AT_ORIGIN.union(MfFlags::PERMIT_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                terrain: Some(TileType::Pedestal),
                instance_count: (2, 4),
                minimum_instance_count: 2,
                personal_space: 2,
                flags: MfFlags::GENERATE_ITEM
                    .union(MfFlags::NOT_IN_HALLWAY)
                    .union(MfFlags::TREAT_AS_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                flags: MfFlags::BUILD_AT_ORIGIN
                    .union(MfFlags::BUILD_VESTIBULE)
                    .union(MfFlags::PERMIT_BLOCKING),
                ..FEATURE
            },
        ],
    },
    // 2 -- a guarded treasure room: the loot is watched, not locked.
    Blueprint {
        name: "guarded treasure room",
        depth_range: (5, 26),
        room_size: (20, 100),
        frequency: 15,
        flags: BpFlags::ROOM.union(BpFlags::REWARD).union(BpFlags::OPEN_INTERIOR),
        features: &[
            MachineFeature {
                terrain: Some(TileType::Pedestal),
                instance_count: (1, 2),
                personal_space: 2,
                flags: MfFlags::GENERATE_ITEM
                    .union(MfFlags::FAR_FROM_ORIGIN)
                    .union(MfFlags::TREAT_AS_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                horde_flags: HordeFlags::MACHINE_BOSS,
                flags: MfFlags::GENERATE_HORDE
                    .union(MfFlags::MONSTER_SLEEPING)
                    .union(MfFlags::FAR_FROM_ORIGIN),
                ..FEATURE
            },
            MachineFeature {
                feature: Some(FeatureId::BonesPatch),
                minimum_instance_count: 0,
                flags: MfFlags::NEAR_ORIGIN,
                ..FEATURE
            },
        ],
    },
    // 3 -- a dungeon library: scrolls shelved away from thrown fire.
    Blueprint {
        name: "library",
        depth_range: (6, 24),
        room_size: (10, 40),
        frequency: 10,
        flags: BpFlags::ROOM
            .union(BpFlags::REWARD)
            .union(BpFlags::PURGE_INTERIOR)
            .union(BpFlags::SURROUND_WITH_WALLS),
        features: &[
            MachineFeature {
                terrain: Some(TileType::Pedestal),
                instance_count: (2, 3),
                minimum_instance_count: 2,
                item_category: Some(ItemCategory::Scroll),
                personal_space: 1,
                flags: MfFlags::GENERATE_ITEM
                    .union(MfFlags::NO_THROWING_WEAPONS)
                    .union(MfFlags::TREAT_AS_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                terrain: Some(TileType::Carpet),
                layer: Layer::Surface,
                minimum_instance_count: 0,
                flags: MfFlags::EVERYWHERE.union(MfFlags::PERMIT_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                flags: MfFlags::BUILD_AT_ORIGIN
                    .union(MfFlags::BUILD_VESTIBULE)
                    .union(MfFlags::PERMIT_BLOCKING),
                ..FEATURE
            },
        ],
    },
    // 4 -- commutation altars: wired pair that trades enchantment.
    Blueprint {
        name: "commutation altars",
        depth_range: (4, 22),
        room_size: (10, 60),
        frequency: 10,
        flags: BpFlags::ROOM.union(BpFlags::REWARD).union(BpFlags::PURGE_LIQUIDS),
        features: &[
            MachineFeature {
                terrain: Some(TileType::Altar),
                instance_count: (2, 2),
                minimum_instance_count: 2,
                personal_space: 3,
                flags: MfFlags::NOT_IN_HALLWAY.union(MfFlags::TREAT_AS_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                feature: Some(FeatureId::CarpetArea),
                minimum_instance_count: 0,
                flags: MfFlags::BUILD_AT_ORIGIN.union(MfFlags::PERMIT_BLOCKING),
                ..FEATURE
            },
        ],
    },
    // 5 -- a resurrection altar, attended by a dormant guardian.
    Blueprint {
        name: "resurrection altar",
        depth_range: (10, 26),
        room_size: (10, 60),
        frequency: 8,
        flags: BpFlags::ROOM.union(BpFlags::REWARD).union(BpFlags::PURGE_INTERIOR),
        features: &[
            MachineFeature {
                terrain: Some(TileType::Altar),
                personal_space: 2,
                flags: MfFlags::NOT_IN_HALLWAY.union(MfFlags::TREAT_AS_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                monster_kind: Some(MonsterKind::Guardian),
                minimum_instance_count: 0,
                flags: MfFlags::MONSTERS_DORMANT.union(MfFlags::NEAR_ORIGIN),
                ..FEATURE
            },
        ],
    },
    // 6 -- a captive monster: cage, prisoner, and a key hidden elsewhere.
    Blueprint {
        name: "captive monster room",
        depth_range: (3, 18),
        room_size: (10, 50),
        frequency: 10,
        flags: BpFlags::ROOM.union(BpFlags::PURGE_LIQUIDS),
        features: &[
            MachineFeature {
                terrain: Some(TileType::CageClosed),
                item_category: Some(ItemCategory::Key),
                item_kind: KEY_CAGE,
                horde_flags: HordeFlags::MACHINE_CAPTIVE,
                personal_space: 1,
                flags: MfFlags::GENERATE_ITEM
                    .union(MfFlags::GENERATE_HORDE)
                    .union(MfFlags::OUTSOURCE_ITEM_TO_MACHINE)
                    .union(MfFlags::KEY_DISPOSABLE)
                    .union(MfFlags::FAR_FROM_ORIGIN)
                    .union(MfFlags::TREAT_AS_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                feature: Some(FeatureId::RubblePatch),
                minimum_instance_count: 0,
                flags: MfFlags::NEAR_ORIGIN,
                ..FEATURE
            },
        ],
    },
    // 7 -- statuary: dormant monsters sealed in cracked statues.
    Blueprint {
        name: "statuary",
        depth_range: (8, 26),
        room_size: (20, 90),
        frequency: 10,
        flags: BpFlags::ROOM.union(BpFlags::PURGE_LIQUIDS),
        features: &[
            MachineFeature {
                terrain: Some(TileType::StatueDormant),
                instance_count: (2, 5),
                minimum_instance_count: 2,
                horde_flags: HordeFlags::MACHINE_STATUE,
                personal_space: 2,
                flags: MfFlags::GENERATE_HORDE
                    .union(MfFlags::MONSTERS_DORMANT)
                    .union(MfFlags::NOT_IN_HALLWAY)
                    .union(MfFlags::TREAT_AS_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                feature: Some(FeatureId::RubblePatch),
                instance_count: (1, 3),
                minimum_instance_count: 0,
                flags: MfFlags::empty(),
                ..FEATURE
            },
        ],
    },
    // 8 -- a kennel: caged beasts with a disposable cage key nearby.
    Blueprint {
        name: "kennel",
        depth_range: (3, 11),
        room_size: (20, 80),
        frequency: 10,
        flags: BpFlags::ROOM.union(BpFlags::PURGE_LIQUIDS),
        features: &[
            MachineFeature {
                terrain: Some(TileType::CageClosed),
                instance_count: (2, 4),
                minimum_instance_count: 2,
                horde_flags: HordeFlags::MACHINE_KENNEL,
                personal_space: 1,
                flags: MfFlags::GENERATE_HORDE
                    .union(MfFlags::MONSTERS_DORMANT)
                    .union(MfFlags::TREAT_AS_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                item_category: Some(ItemCategory::Key),
                item_kind: KEY_CAGE,
                flags: MfFlags::GENERATE_ITEM
                    .union(MfFlags::OUTSOURCE_ITEM_TO_MACHINE)
                    .union(MfFlags::SKELETON_KEY)
                    .union(MfFlags::KEY_DISPOSABLE),
                ..FEATURE
            },
        ],
    },
    // 9 -- a goblin warren: a tribe dug in around its conjurer.
    Blueprint {
        name: "goblin warren",
        depth_range: (3, 10),
        room_size: (30, 100),
        frequency: 10,
        flags: BpFlags::ROOM.union(BpFlags::PURGE_LIQUIDS).union(BpFlags::MAXIMIZE_INTERIOR),
        features: &[
            MachineFeature {
                monster_kind: Some(MonsterKind::GoblinChieftain),
                flags: MfFlags::FAR_FROM_ORIGIN.union(MfFlags::MONSTER_SLEEPING),
                ..FEATURE
            },
            MachineFeature {
                monster_kind: Some(MonsterKind::Goblin),
                instance_count: (2, 4),
                minimum_instance_count: 1,
                personal_space: 1,
                flags: MfFlags::MONSTER_SLEEPING,
                ..FEATURE
            },
            MachineFeature {
                feature: Some(FeatureId::DeadGrassPatch),
                minimum_instance_count: 0,
                flags: MfFlags::BUILD_AT_ORIGIN.union(MfFlags::PERMIT_BLOCKING),
                ..FEATURE
            },
        ],
    },
    // 10 -- a guardian puzzle: glyphs that a construct patrols.
    Blueprint {
        name: "guardian puzzle",
        depth_range: (6, 22),
        room_size: (20, 70),
        frequency: 8,
        flags: BpFlags::ROOM
            .union(BpFlags::PURGE_INTERIOR)
            .union(BpFlags::SURROUND_WITH_WALLS)
            .union(BpFlags::REDESIGN_INTERIOR),
        features: &[
            MachineFeature {
                terrain: Some(TileType::GuardianGlyph),
                instance_count: (3, 6),
                minimum_instance_count: 3,
                personal_space: 1,
                flags: MfFlags::NOT_IN_HALLWAY.union(MfFlags::PERMIT_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                monster_kind: Some(MonsterKind::Guardian),
                flags: MfFlags::NEAR_ORIGIN,
                ..FEATURE
            },
        ],
    },
    // 11 -- a paralysis trap: hidden plates ring the bait.
    Blueprint {
        name: "paralysis trap alcove",
        depth_range: (5, 18),
        room_size: (5, 30),
        frequency: 8,
        flags: BpFlags::ROOM.union(BpFlags::NO_INTERIOR_FLAG),
        features: &[
            MachineFeature {
                terrain: Some(TileType::PressurePlate),
                instance_count: (2, 4),
                minimum_instance_count: 2,
                personal_space: 1,
                flags: MfFlags::NEAR_ORIGIN.union(MfFlags::NOT_IN_HALLWAY),
                ..FEATURE
            },
            MachineFeature {
                item_category: Some(ItemCategory::Potion),
                flags: MfFlags::GENERATE_ITEM.union(MfFlags::FAR_FROM_ORIGIN),
                ..FEATURE
            },
        ],
    },
    // 12 -- a poison gas trap room sprung from hidden vents.
    Blueprint {
        name: "poison gas trap room",
        depth_range: (6, 26),
        room_size: (15, 70),
        frequency: 8,
        flags: BpFlags::ROOM.union(BpFlags::NO_INTERIOR_FLAG),
        features: &[
            MachineFeature {
                terrain: Some(TileType::PoisonGasTrapHidden),
                instance_count: (3, 6),
                minimum_instance_count: 3,
                personal_space: 1,
                flags: MfFlags::NOT_IN_HALLWAY,
                ..FEATURE
            },
            MachineFeature {
                item_category: Some(ItemCategory::Scroll),
                minimum_instance_count: 0,
                flags: MfFlags::GENERATE_ITEM.union(MfFlags::FAR_FROM_ORIGIN),
                ..FEATURE
            },
        ],
    },
    // 13 -- a fire trap gauntlet.
    Blueprint {
        name: "fire trap room",
        depth_range: (8, 26),
        room_size: (15, 70),
        frequency: 8,
        flags: BpFlags::ROOM.union(BpFlags::NO_INTERIOR_FLAG),
        features: &[
            MachineFeature {
                terrain: Some(TileType::FireTrapHidden),
                instance_count: (3, 7),
                minimum_instance_count: 3,
                personal_space: 1,
                flags: MfFlags::NOT_IN_HALLWAY,
                ..FEATURE
            },
            MachineFeature {
                feature: Some(FeatureId::AshesPatch),
                minimum_instance_count: 0,
                flags: MfFlags::NEAR_ORIGIN,
                ..FEATURE
            },
        ],
    },
    // 14 -- a collapsing floor area over a chasm.
    Blueprint {
        name: "collapsing floor area",
        depth_range: (2, 25),
        room_size: (20, 100),
        frequency: 8,
        flags: BpFlags::TREAT_AS_BLOCKING.union(BpFlags::NO_INTERIOR_FLAG),
        features: &[
            MachineFeature {
                feature: Some(FeatureId::CollapsedFloor),
                flags: MfFlags::BUILD_AT_ORIGIN,
                ..FEATURE
            },
            MachineFeature {
                terrain: Some(TileType::TrapDoorHidden),
                instance_count: (2, 4),
                minimum_instance_count: 0,
                personal_space: 1,
                flags: MfFlags::empty(),
                ..FEATURE
            },
        ],
    },
    // 15 -- a plain door vestibule.
    Blueprint {
        name: "door vestibule",
        depth_range: (1, 26),
        room_size: (1, 10),
        frequency: 20,
        flags: BpFlags::VESTIBULE,
        features: &[MachineFeature {
            terrain: Some(TileType::Door),
            flags: MfFlags::BUILD_AT_ORIGIN.union(MfFlags::PERMIT_BLOCKING),
            ..FEATURE
        }],
    },
    // 16 -- a locked door vestibule; its key is outsourced or adopted.
    Blueprint {
        name: "locked door vestibule",
        depth_range: (1, 26),
        room_size: (1, 10),
        frequency: 30,
        flags: BpFlags::VESTIBULE.union(BpFlags::ADOPT_ITEM),
        features: &[MachineFeature {
            terrain: Some(TileType::LockedDoor),
            item_category: Some(ItemCategory::Key),
            item_kind: KEY_DOOR,
            flags: MfFlags::BUILD_AT_ORIGIN
                .union(MfFlags::PERMIT_BLOCKING)
                .union(MfFlags::IMPREGNABLE)
                .union(MfFlags::GENERATE_ITEM)
                .union(MfFlags::ADOPT_ITEM)
                .union(MfFlags::OUTSOURCE_ITEM_TO_MACHINE)
                .union(MfFlags::KEY_DISPOSABLE),
            ..FEATURE
        }],
    },
    // 17 -- a portcullis vestibule with a lever hidden in the walls.
    Blueprint {
        name: "portcullis vestibule",
        depth_range: (4, 26),
        room_size: (1, 10),
        frequency: 20,
        flags: BpFlags::VESTIBULE,
        features: &[
            MachineFeature {
                terrain: Some(TileType::PortcullisClosed),
                flags: MfFlags::BUILD_AT_ORIGIN
                    .union(MfFlags::PERMIT_BLOCKING)
                    .union(MfFlags::IMPREGNABLE),
                ..FEATURE
            },
            MachineFeature {
                terrain: Some(TileType::WallLever),
                flags: MfFlags::BUILD_IN_WALLS
                    .union(MfFlags::IN_PASSABLE_VIEW_OF_ORIGIN)
                    .union(MfFlags::PERMIT_BLOCKING),
                ..FEATURE
            },
        ],
    },
    // 18 -- a guardian vestibule: something dormant watches the door.
    Blueprint {
        name: "guardian vestibule",
        depth_range: (8, 26),
        room_size: (2, 14),
        frequency: 15,
        flags: BpFlags::VESTIBULE,
        features: &[
            MachineFeature {
                terrain: Some(TileType::Door),
                flags: MfFlags::BUILD_AT_ORIGIN.union(MfFlags::PERMIT_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                monster_kind: Some(MonsterKind::Guardian),
                flags: MfFlags::MONSTERS_DORMANT.union(MfFlags::NEAR_ORIGIN),
                ..FEATURE
            },
        ],
    },
    // 19 -- a key altar: adopted items rest on an altar under guard.
    Blueprint {
        name: "key altar",
        depth_range: (1, 26),
        room_size: (10, 40),
        frequency: 20,
        flags: BpFlags::ADOPT_ITEM,
        features: &[
            MachineFeature {
                terrain: Some(TileType::Altar),
                personal_space: 1,
                flags: MfFlags::ADOPT_ITEM
                    .union(MfFlags::NOT_IN_HALLWAY)
                    .union(MfFlags::TREAT_AS_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                minimum_instance_count: 0,
                horde_flags: HordeFlags::MACHINE_STATUE,
                flags: MfFlags::GENERATE_HORDE.union(MfFlags::MONSTERS_DORMANT),
                ..FEATURE
            },
        ],
    },
    // 20 -- a key thief: a creature carries the adopted item.
    Blueprint {
        name: "key bearer",
        depth_range: (2, 26),
        room_size: (10, 60),
        frequency: 12,
        flags: BpFlags::ADOPT_ITEM,
        features: &[MachineFeature {
            horde_flags: HordeFlags::MACHINE_THIEF,
            flags: MfFlags::ADOPT_ITEM
                .union(MfFlags::GENERATE_HORDE)
                .union(MfFlags::MONSTER_TAKE_ITEM)
                .union(MfFlags::MONSTER_FLEEING),
            ..FEATURE
        }],
    },
    // 21 -- a mud pit seeded with swamp gas.
    Blueprint {
        name: "mud pit",
        depth_range: (10, 26),
        room_size: (30, 100),
        frequency: 10,
        flags: BpFlags::NO_INTERIOR_FLAG.union(BpFlags::PURGE_LIQUIDS),
        features: &[MachineFeature {
            feature: Some(FeatureId::SwampBasin),
            instance_count: (2, 4),
            minimum_instance_count: 1,
            flags: MfFlags::EVERYWHERE.union(MfFlags::PERMIT_BLOCKING),
            ..FEATURE
        }],
    },
    // 22 -- an overgrown grove.
    Blueprint {
        name: "sacred grove",
        depth_range: (2, 14),
        room_size: (30, 100),
        frequency: 10,
        flags: BpFlags::NO_INTERIOR_FLAG,
        features: &[
            MachineFeature {
                feature: Some(FeatureId::GrassPatch),
                instance_count: (2, 4),
                minimum_instance_count: 1,
                flags: MfFlags::PERMIT_BLOCKING,
                ..FEATURE
            },
            MachineFeature {
                feature: Some(FeatureId::FoliagePatch),
                minimum_instance_count: 0,
                flags: MfFlags::PERMIT_BLOCKING.union(MfFlags::ALTERNATIVE),
                ..FEATURE
            },
            MachineFeature {
                feature: Some(FeatureId::FungusPatch),
                minimum_instance_count: 0,
                flags: MfFlags::PERMIT_BLOCKING.union(MfFlags::ALTERNATIVE),
                ..FEATURE
            },
        ],
    },
    // 23 -- a guarded rest stop: torches, bones, and an armed corpse.
    Blueprint {
        name: "abandoned camp",
        depth_range: (4, 20),
        room_size: (15, 60),
        frequency: 10,
        flags: BpFlags::NO_INTERIOR_FLAG,
        features: &[
            MachineFeature {
                terrain: Some(TileType::TorchWall),
                instance_count: (1, 3),
                minimum_instance_count: 0,
                flags: MfFlags::BUILD_IN_WALLS.union(MfFlags::PERMIT_BLOCKING),
                ..FEATURE
            },
            MachineFeature {
                feature: Some(FeatureId::BonesPatch),
                flags: MfFlags::NOT_ON_LEVEL_PERIMETER,
                ..FEATURE
            },
            MachineFeature {
                item_category: Some(ItemCategory::Weapon),
                minimum_instance_count: 0,
                flags: MfFlags::GENERATE_ITEM
                    .union(MfFlags::REQUIRE_HEAVY_WEAPON)
                    .union(MfFlags::ALTERNATIVE),
                ..FEATURE
            },
            MachineFeature {
                item_category: Some(ItemCategory::Armor),
                minimum_instance_count: 0,
                flags: MfFlags::GENERATE_ITEM
                    .union(MfFlags::REQUIRE_GOOD_RUNIC)
                    .union(MfFlags::ALTERNATIVE),
                ..FEATURE
            },
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_indices_match_the_named_constants() {
        assert_eq!(BLUEPRINT_CATALOG[AMULET_BLUEPRINT].name, "amulet chamber");
        assert_eq!(BLUEPRINT_CATALOG[LOCKED_DOOR_VESTIBULE].name, "locked door vestibule");
        assert!(BLUEPRINT_CATALOG[LOCKED_DOOR_VESTIBULE]
            .flags
            .contains(BpFlags::VESTIBULE));
    }

    #[test]
    fn every_blueprint_is_internally_consistent() {
        for bp in BLUEPRINT_CATALOG {
            assert!(bp.depth_range.0 <= bp.depth_range.1, "{}", bp.name);
            assert!(bp.room_size.0 <= bp.room_size.1, "{}", bp.name);
            assert!(!bp.features.is_empty(), "{}", bp.name);
            for f in bp.features {
                assert!(f.instance_count.0 <= f.instance_count.1, "{}", bp.name);
                assert!(f.minimum_instance_count <= f.instance_count.1, "{}", bp.name);
                if f.flags.contains(MfFlags::ADOPT_ITEM) && !f.flags.contains(MfFlags::GENERATE_ITEM)
                {
                    assert!(bp.flags.contains(BpFlags::ADOPT_ITEM), "{}", bp.name);
                }
            }
        }
    }

    #[test]
    fn vestibules_are_never_rewards() {
        for bp in BLUEPRINT_CATALOG {
            if bp.flags.contains(BpFlags::VESTIBULE) {
                assert!(!bp.flags.contains(BpFlags::REWARD), "{}", bp.name);
            }
        }
    }
}
