//! Creature model: the minimum the machine builder needs from its monster
//! collaborator. A compact bestiary, horde templates, and placement state.

use crate::cell::CellFlags;
use crate::grid::Grid;
use crate::rng::Rng;
use crate::Cell;
use bitflags::bitflags;

pub type CreatureId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreatureState {
    #[default]
    Wandering,
    Sleeping,
    Fleeing,
    Dormant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonsterKind {
    Rat,
    Kobold,
    Jackal,
    Eel,
    Monkey,
    Goblin,
    GoblinConjurer,
    GoblinChieftain,
    Toad,
    VampireBat,
    ArrowTurret,
    Spider,
    Ogre,
    Wraith,
    Zombie,
    Troll,
    Naga,
    Dragon,
    Guardian,
    WingedGuardian,
}

impl MonsterKind {
    /// Depth band in which the kind naturally appears.
    pub fn depth_range(self) -> (i32, i32) {
        use MonsterKind::*;
        match self {
            Rat => (1, 5),
            Kobold => (1, 6),
            Jackal => (1, 7),
            Eel => (2, 22),
            Monkey => (2, 9),
            Toad => (1, 5),
            Goblin => (3, 10),
            GoblinConjurer => (3, 12),
            GoblinChieftain => (4, 12),
            VampireBat => (6, 18),
            ArrowTurret => (5, 18),
            Spider => (8, 20),
            Ogre => (7, 18),
            Wraith => (12, 23),
            Zombie => (14, 24),
            Troll => (12, 26),
            Naga => (16, 26),
            Dragon => (20, 26),
            Guardian | WingedGuardian => (1, 26),
        }
    }

    /// Turrets live inside walls; everything else stands on the floor.
    pub fn lives_in_walls(self) -> bool {
        matches!(self, MonsterKind::ArrowTurret)
    }
}

bitflags! {
    /// Horde selection flags; machine features require or forbid these.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HordeFlags: u32 {
        const MACHINE_BOSS          = 1 << 0;
        const MACHINE_WATER_MONSTER = 1 << 1;
        const MACHINE_CAPTIVE       = 1 << 2;
        const MACHINE_STATUE        = 1 << 3;
        const MACHINE_TURRET        = 1 << 4;
        const MACHINE_KENNEL        = 1 << 5;
        const MACHINE_THIEF         = 1 << 6;
        const LEADER_CAPTIVE        = 1 << 7;
        const NO_PERIODIC_SPAWN     = 1 << 8;

        const MACHINE_ONLY = Self::MACHINE_BOSS.bits()
            | Self::MACHINE_WATER_MONSTER.bits()
            | Self::MACHINE_CAPTIVE.bits()
            | Self::MACHINE_STATUE.bits()
            | Self::MACHINE_TURRET.bits()
            | Self::MACHINE_KENNEL.bits()
            | Self::MACHINE_THIEF.bits();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HordeDef {
    pub leader: MonsterKind,
    /// (kind, min count, max count) per member slot.
    pub members: &'static [(MonsterKind, i32, i32)],
    pub min_depth: i32,
    pub max_depth: i32,
    pub frequency: i32,
    pub flags: HordeFlags,
}

pub static HORDE_CATALOG: &[HordeDef] = &[
    HordeDef { leader: MonsterKind::Rat, members: &[(MonsterKind::Rat, 1, 3)], min_depth: 1, max_depth: 5, frequency: 15, flags: HordeFlags::empty() },
    HordeDef { leader: MonsterKind::Kobold, members: &[], min_depth: 1, max_depth: 6, frequency: 10, flags: HordeFlags::empty() },
    HordeDef { leader: MonsterKind::Jackal, members: &[(MonsterKind::Jackal, 1, 2)], min_depth: 2, max_depth: 7, frequency: 10, flags: HordeFlags::empty() },
    HordeDef { leader: MonsterKind::Goblin, members: &[(MonsterKind::Goblin, 1, 3)], min_depth: 3, max_depth: 10, frequency: 10, flags: HordeFlags::empty() },
    HordeDef { leader: MonsterKind::GoblinChieftain, members: &[(MonsterKind::Goblin, 2, 4), (MonsterKind::GoblinConjurer, 1, 2)], min_depth: 5, max_depth: 12, frequency: 8, flags: HordeFlags::empty() },
    HordeDef { leader: MonsterKind::Ogre, members: &[], min_depth: 7, max_depth: 18, frequency: 10, flags: HordeFlags::empty() },
    HordeDef { leader: MonsterKind::Troll, members: &[], min_depth: 12, max_depth: 26, frequency: 8, flags: HordeFlags::empty() },
    HordeDef { leader: MonsterKind::Wraith, members: &[(MonsterKind::Wraith, 1, 2)], min_depth: 12, max_depth: 23, frequency: 8, flags: HordeFlags::empty() },
    HordeDef { leader: MonsterKind::Zombie, members: &[(MonsterKind::Zombie, 1, 3)], min_depth: 14, max_depth: 24, frequency: 8, flags: HordeFlags::empty() },
    HordeDef { leader: MonsterKind::Naga, members: &[], min_depth: 16, max_depth: 26, frequency: 6, flags: HordeFlags::empty() },
    // Machine hordes.
    HordeDef { leader: MonsterKind::Eel, members: &[], min_depth: 2, max_depth: 22, frequency: 10, flags: HordeFlags::MACHINE_WATER_MONSTER },
    HordeDef { leader: MonsterKind::ArrowTurret, members: &[], min_depth: 5, max_depth: 18, frequency: 10, flags: HordeFlags::MACHINE_TURRET },
    HordeDef { leader: MonsterKind::Monkey, members: &[], min_depth: 2, max_depth: 9, frequency: 10, flags: HordeFlags::MACHINE_THIEF },
    HordeDef { leader: MonsterKind::Jackal, members: &[(MonsterKind::Jackal, 2, 4)], min_depth: 3, max_depth: 11, frequency: 10, flags: HordeFlags::MACHINE_KENNEL },
    HordeDef { leader: MonsterKind::Goblin, members: &[], min_depth: 3, max_depth: 10, frequency: 8, flags: HordeFlags::MACHINE_CAPTIVE.union(HordeFlags::LEADER_CAPTIVE) },
    HordeDef { leader: MonsterKind::Ogre, members: &[], min_depth: 8, max_depth: 18, frequency: 8, flags: HordeFlags::MACHINE_CAPTIVE.union(HordeFlags::LEADER_CAPTIVE) },
    HordeDef { leader: MonsterKind::Spider, members: &[], min_depth: 8, max_depth: 20, frequency: 8, flags: HordeFlags::MACHINE_STATUE },
    HordeDef { leader: MonsterKind::Troll, members: &[], min_depth: 14, max_depth: 26, frequency: 8, flags: HordeFlags::MACHINE_STATUE },
    HordeDef { leader: MonsterKind::GoblinChieftain, members: &[(MonsterKind::Goblin, 2, 3), (MonsterKind::GoblinConjurer, 1, 1)], min_depth: 4, max_depth: 12, frequency: 8, flags: HordeFlags::MACHINE_BOSS },
    HordeDef { leader: MonsterKind::Ogre, members: &[(MonsterKind::Ogre, 0, 1)], min_depth: 7, max_depth: 18, frequency: 8, flags: HordeFlags::MACHINE_BOSS },
    HordeDef { leader: MonsterKind::Dragon, members: &[], min_depth: 20, max_depth: 26, frequency: 5, flags: HordeFlags::MACHINE_BOSS },
    HordeDef { leader: MonsterKind::Troll, members: &[(MonsterKind::Troll, 1, 2)], min_depth: 16, max_depth: 26, frequency: 8, flags: HordeFlags::MACHINE_BOSS },
];

#[derive(Debug, Clone)]
pub struct Creature {
    pub id: CreatureId,
    pub kind: MonsterKind,
    pub pos: (i32, i32),
    pub state: CreatureState,
    /// 0 when unaffiliated; otherwise the machine that spawned it.
    pub machine_home: u16,
    pub leader: Option<CreatureId>,
    pub carried_item: Option<crate::items::ItemId>,
    pub is_captive: bool,
}

/// Spawn a single monster of `kind`, flagging its cell.
pub fn generate_monster(
    grid: &mut Grid<Cell>,
    next_id: &mut CreatureId,
    kind: MonsterKind,
    x: i32,
    y: i32,
) -> Creature {
    if let Some(cell) = grid.get_mut(x, y) {
        cell.flags |= CellFlags::HAS_MONSTER;
    }
    let id = *next_id;
    *next_id += 1;
    Creature {
        id,
        kind,
        pos: (x, y),
        state: CreatureState::Wandering,
        machine_home: 0,
        leader: None,
        carried_item: None,
        is_captive: false,
    }
}

/// Remove a creature from the level, clearing its cell flag.
pub fn kill_creature(grid: &mut Grid<Cell>, creature: &Creature) {
    if let Some(cell) = grid.get_mut(creature.pos.0, creature.pos.1) {
        cell.flags.remove(CellFlags::HAS_MONSTER);
    }
}

/// Pick a horde for `(depth, forbidden, required)` and spawn its leader at
/// `(x, y)` with members on nearby passable cells. Returns the spawned
/// creatures, leader first, or an empty vector when nothing qualifies.
pub fn spawn_horde(
    grid: &mut Grid<Cell>,
    rng: &mut Rng,
    next_id: &mut CreatureId,
    depth: i32,
    x: i32,
    y: i32,
    forbidden: HordeFlags,
    required: HordeFlags,
) -> Vec<Creature> {
    let mut total = 0;
    for horde in HORDE_CATALOG {
        if horde_qualifies(horde, depth, forbidden, required) {
            total += horde.frequency;
        }
    }
    if total == 0 {
        return Vec::new();
    }
    let mut roll = rng.rand_range(0, total - 1);
    let mut chosen = None;
    for horde in HORDE_CATALOG {
        if horde_qualifies(horde, depth, forbidden, required) {
            roll -= horde.frequency;
            if roll < 0 {
                chosen = Some(horde);
                break;
            }
        }
    }
    let horde = match chosen {
        Some(h) => h,
        None => return Vec::new(),
    };

    let mut spawned = Vec::new();
    let mut leader = generate_monster(grid, next_id, horde.leader, x, y);
    if horde.flags.contains(HordeFlags::LEADER_CAPTIVE) {
        leader.is_captive = true;
    }
    let leader_id = leader.id;
    spawned.push(leader);

    for &(kind, lo, hi) in horde.members {
        let count = rng.rand_range(lo, hi);
        for _ in 0..count {
            if let Some((mx, my)) = open_cell_near(grid, rng, x, y) {
                let mut m = generate_monster(grid, next_id, kind, mx, my);
                m.leader = Some(leader_id);
                spawned.push(m);
            }
        }
    }
    spawned
}

fn horde_qualifies(horde: &HordeDef, depth: i32, forbidden: HordeFlags, required: HordeFlags) -> bool {
    if depth < horde.min_depth || depth > horde.max_depth {
        return false;
    }
    if horde.flags.intersects(forbidden) {
        return false;
    }
    if !horde.flags.contains(required) {
        return false;
    }
    // Machine hordes never spawn for generic requests.
    required.intersects(HordeFlags::MACHINE_ONLY)
        || !horde.flags.intersects(HordeFlags::MACHINE_ONLY)
}

fn open_cell_near(grid: &Grid<Cell>, rng: &mut Rng, x: i32, y: i32) -> Option<(i32, i32)> {
    for _ in 0..50 {
        let nx = x + rng.rand_range(-3, 3);
        let ny = y + rng.rand_range(-3, 3);
        if let Some(cell) = grid.get(nx, ny) {
            if cell.is_passable() && !cell.flags.intersects(CellFlags::HAS_MONSTER | CellFlags::HAS_PLAYER) {
                return Some((nx, ny));
            }
        }
    }
    None
}

/// The creature standing on `(x, y)`, if any.
pub fn monster_at_loc(monsters: &[Creature], x: i32, y: i32) -> Option<usize> {
    monsters.iter().position(|m| m.pos == (x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_grid() -> Grid<Cell> {
        let mut g: Grid<Cell> = Grid::new(20, 20);
        for y in 0..20 {
            for x in 0..20 {
                g.get_mut(x, y).unwrap().clear_to_floor();
            }
        }
        g
    }

    #[test]
    fn horde_members_follow_the_leader() {
        let mut g = floor_grid();
        let mut rng = Rng::new(11);
        let mut next = 1;
        let spawned = spawn_horde(&mut g, &mut rng, &mut next, 5, 10, 10, HordeFlags::empty(), HordeFlags::empty());
        assert!(!spawned.is_empty());
        let leader = spawned[0].id;
        for m in &spawned[1..] {
            assert_eq!(m.leader, Some(leader));
        }
    }

    #[test]
    fn machine_hordes_require_machine_flags() {
        let mut g = floor_grid();
        let mut rng = Rng::new(11);
        let mut next = 1;
        for _ in 0..20 {
            let spawned = spawn_horde(&mut g, &mut rng, &mut next, 10, 5, 5, HordeFlags::empty(), HordeFlags::empty());
            for m in &spawned {
                assert_ne!(m.kind, MonsterKind::ArrowTurret);
                kill_creature(&mut g, m);
            }
        }
    }
}
