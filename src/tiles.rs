//! Tile types and the static terrain catalog.
//!
//! Every tile id maps to a [`TileDef`]: terrain flags, mechanical flags, a
//! draw priority (lower number wins when layers stack), and a display glyph.
//! The catalog is pure data; all behavior lives in the systems that read it.

use bitflags::bitflags;

bitflags! {
    /// Terrain flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TileFlags: u32 {
        const OBSTRUCTS_PASSABILITY      = 1 << 0;
        const OBSTRUCTS_VISION           = 1 << 1;
        const OBSTRUCTS_ITEMS            = 1 << 2;
        const OBSTRUCTS_SURFACE_EFFECTS  = 1 << 3;
        const OBSTRUCTS_DIAGONAL_MOVEMENT = 1 << 4;
        const SPONTANEOUSLY_IGNITES      = 1 << 5;
        const AUTO_DESCENT               = 1 << 6;
        const LAVA_INSTA_DEATH           = 1 << 7;
        const IS_FLAMMABLE               = 1 << 8;
        const IS_FIRE                    = 1 << 9;
        const IS_DEEP_WATER              = 1 << 10;
        const CAN_BE_BRIDGED             = 1 << 11;

        /// Anything a walking creature cannot path through.
        const PATHING_BLOCKER = Self::OBSTRUCTS_PASSABILITY.bits()
            | Self::AUTO_DESCENT.bits()
            | Self::IS_DEEP_WATER.bits()
            | Self::LAVA_INSTA_DEATH.bits()
            | Self::IS_FIRE.bits()
            | Self::SPONTANEOUSLY_IGNITES.bits();

        /// Lake terrain that blocks pathing; used by the lake acceptance test.
        const LAKE_PATHING_BLOCKER = Self::AUTO_DESCENT.bits()
            | Self::IS_DEEP_WATER.bits()
            | Self::LAVA_INSTA_DEATH.bits()
            | Self::SPONTANEOUSLY_IGNITES.bits();

        /// Permanent connectivity dividers. Active fire is a pathing blocker
        /// but burns out, so it never divides the level for good.
        const DIVIDES_LEVEL = Self::OBSTRUCTS_PASSABILITY.bits()
            | Self::AUTO_DESCENT.bits()
            | Self::IS_DEEP_WATER.bits()
            | Self::LAVA_INSTA_DEATH.bits()
            | Self::SPONTANEOUSLY_IGNITES.bits();

        /// Terrain that sweeps dropped items away or swallows them.
        const MOVES_ITEMS = Self::IS_DEEP_WATER.bits()
            | Self::LAVA_INSTA_DEATH.bits()
            | Self::AUTO_DESCENT.bits();

        /// Terrain fire can catch on.
        const CAN_BE_IGNITED = Self::IS_FLAMMABLE.bits()
            | Self::SPONTANEOUSLY_IGNITES.bits();
    }
}

bitflags! {
    /// Mechanical flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TileMechFlags: u32 {
        const IS_SECRET          = 1 << 0;
        const PROMOTES_WITH_KEY  = 1 << 1;
        const CONNECTS_LEVEL     = 1 << 2;
        const IS_WIRED           = 1 << 3;
        const IS_CIRCUIT_BREAKER = 1 << 4;
        const EXTINGUISHES_FIRE  = 1 << 5;
        const ALLOWS_SUBMERGING  = 1 << 6;
        const STAND_IN_TILE      = 1 << 7;
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct TileDef {
    pub flags: TileFlags,
    pub mech_flags: TileMechFlags,
    /// Lower number = higher priority when layers stack.
    pub draw_priority: i32,
    pub glyph: char,
    pub description: &'static str,
}

/// All tile ids known to the architect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TileType {
    #[default]
    Nothing,
    Granite,
    Floor,
    Wall,
    PermanentWall,
    Door,
    SecretDoor,
    LockedDoor,
    PortcullisClosed,
    PortcullisDormant,
    WallLever,
    PressurePlate,
    PressurePlateUsed,
    Statue,
    StatueDormant,
    GuardianGlyph,
    TorchWall,
    Altar,
    Pedestal,
    CageClosed,
    CageOpen,
    DownStairs,
    UpStairs,
    DungeonPortal,
    DungeonExit,
    PoisonGasTrap,
    PoisonGasTrapHidden,
    TrapDoor,
    TrapDoorHidden,
    FireTrap,
    FireTrapHidden,
    FloodTrap,
    FloodTrapHidden,
    NetTrap,
    NetTrapHidden,
    AlarmTrap,
    AlarmTrapHidden,
    // liquid layer
    DeepWater,
    ShallowWater,
    Mud,
    Chasm,
    ChasmEdge,
    Lava,
    Obsidian,
    InertBrimstone,
    ActiveBrimstone,
    Bridge,
    // gas layer
    PoisonGas,
    SwampGas,
    // surface layer
    Grass,
    DeadGrass,
    Fungus,
    Foliage,
    DeadFoliage,
    Rubble,
    Bones,
    Ashes,
    Carpet,
    BridgeEdge,
}

const NONE: TileFlags = TileFlags::empty();
const M_NONE: TileMechFlags = TileMechFlags::empty();

/// Full wall: blocks movement, sight, items, surface effects, and corners.
const WALL_LIKE: TileFlags = TileFlags::OBSTRUCTS_PASSABILITY
    .union(TileFlags::OBSTRUCTS_VISION)
    .union(TileFlags::OBSTRUCTS_ITEMS)
    .union(TileFlags::OBSTRUCTS_SURFACE_EFFECTS)
    .union(TileFlags::OBSTRUCTS_DIAGONAL_MOVEMENT);

const fn def(
    flags: TileFlags,
    mech_flags: TileMechFlags,
    draw_priority: i32,
    glyph: char,
    description: &'static str,
) -> TileDef {
    TileDef { flags, mech_flags, draw_priority, glyph, description }
}

impl TileType {
    /// Catalog lookup. Exhaustive by construction.
    pub const fn def(self) -> TileDef {
        use TileFlags as T;
        use TileMechFlags as TM;
        use TileType::*;
        match self {
            Nothing => def(NONE, M_NONE, 10000, ' ', "nothing"),
            Granite => def(WALL_LIKE, M_NONE, 70, '#', "a rough granite wall"),
            Floor => def(NONE, M_NONE, 95, '.', "the dungeon floor"),
            Wall => def(WALL_LIKE, M_NONE, 50, '#', "a stone wall"),
            PermanentWall => def(WALL_LIKE, M_NONE, 40, '#', "a smooth obsidian wall"),
            Door => def(
                T::OBSTRUCTS_VISION
                    .union(T::OBSTRUCTS_DIAGONAL_MOVEMENT)
                    .union(T::OBSTRUCTS_SURFACE_EFFECTS),
                TM::STAND_IN_TILE,
                45,
                '+',
                "a wooden door",
            ),
            SecretDoor => def(WALL_LIKE, TM::IS_SECRET, 45, '#', "a secret door"),
            LockedDoor => def(
                WALL_LIKE,
                TM::PROMOTES_WITH_KEY.union(TM::IS_WIRED),
                30,
                '+',
                "a locked door",
            ),
            PortcullisClosed => def(
                T::OBSTRUCTS_PASSABILITY.union(T::OBSTRUCTS_ITEMS),
                TM::IS_WIRED.union(TM::CONNECTS_LEVEL),
                28,
                '#',
                "an iron portcullis",
            ),
            PortcullisDormant => def(NONE, TM::IS_WIRED, 95, '.', "a portcullis slot"),
            WallLever => def(WALL_LIKE, TM::IS_WIRED, 35, '\\', "a lever in the wall"),
            PressurePlate => def(NONE, TM::IS_WIRED, 60, '^', "a pressure plate"),
            PressurePlateUsed => def(NONE, M_NONE, 60, '^', "a depressed pressure plate"),
            Statue => def(
                T::OBSTRUCTS_PASSABILITY
                    .union(T::OBSTRUCTS_ITEMS)
                    .union(T::OBSTRUCTS_SURFACE_EFFECTS),
                M_NONE,
                48,
                '&',
                "a marble statue",
            ),
            StatueDormant => def(
                T::OBSTRUCTS_PASSABILITY
                    .union(T::OBSTRUCTS_ITEMS)
                    .union(T::OBSTRUCTS_SURFACE_EFFECTS),
                TM::IS_WIRED,
                48,
                '&',
                "a cracked statue",
            ),
            GuardianGlyph => def(NONE, TM::IS_WIRED, 42, ':', "a glowing glyph"),
            TorchWall => def(WALL_LIKE, M_NONE, 45, '#', "a wall sconce with a torch"),
            Altar => def(T::OBSTRUCTS_SURFACE_EFFECTS, TM::IS_WIRED, 55, '|', "a stone altar"),
            Pedestal => def(T::OBSTRUCTS_SURFACE_EFFECTS, M_NONE, 55, '|', "a stone pedestal"),
            CageClosed => def(
                T::OBSTRUCTS_PASSABILITY,
                TM::PROMOTES_WITH_KEY.union(TM::IS_WIRED),
                42,
                '#',
                "an iron cage",
            ),
            CageOpen => def(NONE, M_NONE, 95, '.', "an open cage"),
            DownStairs => def(
                T::OBSTRUCTS_ITEMS.union(T::OBSTRUCTS_SURFACE_EFFECTS),
                TM::CONNECTS_LEVEL,
                25,
                '>',
                "a downward staircase",
            ),
            UpStairs => def(
                T::OBSTRUCTS_ITEMS.union(T::OBSTRUCTS_SURFACE_EFFECTS),
                TM::CONNECTS_LEVEL,
                25,
                '<',
                "an upward staircase",
            ),
            DungeonPortal => def(
                T::OBSTRUCTS_ITEMS.union(T::OBSTRUCTS_SURFACE_EFFECTS),
                TM::CONNECTS_LEVEL,
                25,
                '>',
                "a shimmering portal",
            ),
            DungeonExit => def(
                T::OBSTRUCTS_ITEMS.union(T::OBSTRUCTS_SURFACE_EFFECTS),
                TM::CONNECTS_LEVEL,
                25,
                '<',
                "the dungeon exit",
            ),
            PoisonGasTrap => def(NONE, M_NONE, 65, '^', "a poison gas trap"),
            PoisonGasTrapHidden => def(NONE, TM::IS_SECRET, 65, '.', "a hidden gas trap"),
            TrapDoor => def(T::AUTO_DESCENT, M_NONE, 65, '^', "a trap door"),
            TrapDoorHidden => def(T::AUTO_DESCENT, TM::IS_SECRET, 65, '.', "a hidden trap door"),
            FireTrap => def(NONE, M_NONE, 65, '^', "a fire trap"),
            FireTrapHidden => def(NONE, TM::IS_SECRET, 65, '.', "a hidden fire trap"),
            FloodTrap => def(NONE, M_NONE, 65, '^', "a flood trap"),
            FloodTrapHidden => def(NONE, TM::IS_SECRET, 65, '.', "a hidden flood trap"),
            NetTrap => def(NONE, M_NONE, 65, '^', "a net trap"),
            NetTrapHidden => def(NONE, TM::IS_SECRET, 65, '.', "a hidden net trap"),
            AlarmTrap => def(NONE, M_NONE, 65, '^', "an alarm trap"),
            AlarmTrapHidden => def(NONE, TM::IS_SECRET, 65, '.', "a hidden alarm trap"),
            DeepWater => def(
                T::IS_DEEP_WATER,
                TM::EXTINGUISHES_FIRE.union(TM::ALLOWS_SUBMERGING),
                75,
                '~',
                "murky deep water",
            ),
            ShallowWater => def(NONE, TM::EXTINGUISHES_FIRE, 80, '~', "shallow water"),
            Mud => def(NONE, M_NONE, 85, ',', "a pool of mud"),
            Chasm => def(T::AUTO_DESCENT.union(T::CAN_BE_BRIDGED), M_NONE, 75, ':', "a gaping chasm"),
            ChasmEdge => def(NONE, M_NONE, 85, ':', "the brink of a chasm"),
            Lava => def(T::LAVA_INSTA_DEATH, M_NONE, 75, '~', "molten lava"),
            Obsidian => def(NONE, M_NONE, 90, '.', "cooled obsidian"),
            InertBrimstone => def(
                T::SPONTANEOUSLY_IGNITES.union(T::IS_FLAMMABLE),
                M_NONE,
                75,
                '.',
                "hissing brimstone",
            ),
            ActiveBrimstone => def(
                T::SPONTANEOUSLY_IGNITES.union(T::IS_FIRE),
                M_NONE,
                75,
                '.',
                "sputtering brimstone",
            ),
            Bridge => def(NONE, M_NONE, 20, '=', "a rickety rope bridge"),
            PoisonGas => def(NONE, M_NONE, 15, '*', "a cloud of caustic gas"),
            SwampGas => def(T::IS_FLAMMABLE, M_NONE, 15, '*', "a cloud of swamp gas"),
            Grass => def(T::IS_FLAMMABLE, M_NONE, 85, '"', "a patch of grass"),
            DeadGrass => def(T::IS_FLAMMABLE, M_NONE, 85, '"', "withered grass"),
            Fungus => def(T::IS_FLAMMABLE, M_NONE, 86, '"', "luminescent fungus"),
            Foliage => def(
                T::OBSTRUCTS_VISION.union(T::IS_FLAMMABLE),
                M_NONE,
                66,
                '&',
                "dense foliage",
            ),
            DeadFoliage => def(
                T::OBSTRUCTS_VISION.union(T::IS_FLAMMABLE),
                M_NONE,
                66,
                '&',
                "dead foliage",
            ),
            Rubble => def(NONE, M_NONE, 88, ',', "a pile of rubble"),
            Bones => def(NONE, M_NONE, 88, ',', "a pile of bones"),
            Ashes => def(NONE, M_NONE, 87, ',', "a pile of ashes"),
            Carpet => def(T::IS_FLAMMABLE, M_NONE, 89, '.', "a red carpet"),
            BridgeEdge => def(NONE, M_NONE, 20, '=', "the end of a bridge"),
        }
    }

    #[inline]
    pub fn flags(self) -> TileFlags {
        self.def().flags
    }

    #[inline]
    pub fn mech_flags(self) -> TileMechFlags {
        self.def().mech_flags
    }

    #[inline]
    pub fn draw_priority(self) -> i32 {
        self.def().draw_priority
    }

    #[inline]
    pub fn glyph(self) -> char {
        self.def().glyph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pathing_blocker_union_covers_lakes() {
        assert!(TileType::Lava.flags().intersects(TileFlags::PATHING_BLOCKER));
        assert!(TileType::DeepWater.flags().intersects(TileFlags::PATHING_BLOCKER));
        assert!(TileType::Chasm.flags().intersects(TileFlags::PATHING_BLOCKER));
        assert!(!TileType::ShallowWater.flags().intersects(TileFlags::PATHING_BLOCKER));
    }

    #[test]
    fn fire_blocks_pathing_but_does_not_divide() {
        let f = TileType::ActiveBrimstone.flags();
        assert!(f.intersects(TileFlags::PATHING_BLOCKER));
        // Brimstone still divides through its ignition flag; a pure fire
        // tile would not.
        assert!(!TileFlags::IS_FIRE.intersects(TileFlags::DIVIDES_LEVEL));
    }

    #[test]
    fn item_swallowing_terrain_is_flagged() {
        assert!(TileType::DeepWater.flags().intersects(TileFlags::MOVES_ITEMS));
        assert!(TileType::Chasm.flags().intersects(TileFlags::MOVES_ITEMS));
        assert!(TileType::Lava.flags().intersects(TileFlags::MOVES_ITEMS));
        assert!(!TileType::ShallowWater.flags().intersects(TileFlags::MOVES_ITEMS));
    }

    #[test]
    fn grass_and_brimstone_can_be_ignited() {
        assert!(TileType::Grass.flags().intersects(TileFlags::CAN_BE_IGNITED));
        assert!(TileType::InertBrimstone.flags().intersects(TileFlags::CAN_BE_IGNITED));
        assert!(!TileType::Floor.flags().intersects(TileFlags::CAN_BE_IGNITED));
    }

    #[test]
    fn secret_door_reads_as_wall() {
        let d = TileType::SecretDoor.def();
        assert!(d.flags.contains(TileFlags::OBSTRUCTS_PASSABILITY));
        assert!(d.mech_flags.contains(TileMechFlags::IS_SECRET));
    }

    #[test]
    fn bridge_outranks_chasm() {
        assert!(TileType::Bridge.draw_priority() < TileType::Chasm.draw_priority());
    }
}
