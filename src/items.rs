//! Item model: the minimum the machine builder needs from its item
//! collaborator. Categories, kinds, key locations, and floor placement.

use crate::cell::CellFlags;
use crate::grid::Grid;
use crate::rng::Rng;
use crate::Cell;
use bitflags::bitflags;

pub type ItemId = u32;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ItemFlags: u32 {
        const IS_KEY          = 1 << 0;
        const PLAYER_AVOIDS   = 1 << 1;
        const KIND_AUTO_DETECT = 1 << 2;
        const IS_THROWING_WEAPON = 1 << 3;
        const IS_CURSED       = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemCategory {
    Food,
    Weapon,
    Armor,
    Scroll,
    Potion,
    Staff,
    Wand,
    Charm,
    Ring,
    Gem,
    Amulet,
    Key,
}

impl ItemCategory {
    /// Number of distinct kinds per category.
    pub fn kind_count(self) -> i32 {
        match self {
            ItemCategory::Food => 3,
            ItemCategory::Weapon => 10,
            ItemCategory::Armor => 7,
            ItemCategory::Scroll => 12,
            ItemCategory::Potion => 13,
            ItemCategory::Staff => 8,
            ItemCategory::Wand => 6,
            ItemCategory::Charm => 7,
            ItemCategory::Ring => 6,
            ItemCategory::Gem => 1,
            ItemCategory::Amulet => 1,
            ItemCategory::Key => 3,
        }
    }

    /// Categories where a machine must not place the same kind twice.
    pub fn is_unique_per_machine(self) -> bool {
        matches!(
            self,
            ItemCategory::Staff
                | ItemCategory::Wand
                | ItemCategory::Potion
                | ItemCategory::Scroll
                | ItemCategory::Ring
                | ItemCategory::Weapon
                | ItemCategory::Armor
                | ItemCategory::Charm
        )
    }

    fn generation_weight(self) -> i32 {
        match self {
            ItemCategory::Food => 15,
            ItemCategory::Weapon => 10,
            ItemCategory::Armor => 10,
            ItemCategory::Scroll => 25,
            ItemCategory::Potion => 30,
            ItemCategory::Staff => 4,
            ItemCategory::Wand => 3,
            ItemCategory::Charm => 2,
            ItemCategory::Ring => 1,
            ItemCategory::Gem => 0,
            ItemCategory::Amulet => 0,
            ItemCategory::Key => 0,
        }
    }
}

/// Key kinds.
pub const KEY_DOOR: i32 = 0;
pub const KEY_CAGE: i32 = 1;
pub const KEY_PORTAL: i32 = 2;

/// One location or machine a key unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLoc {
    pub loc: (i32, i32),
    /// 0 when the entry names a cell; otherwise the machine id it opens.
    pub machine: u16,
    pub disposable: bool,
}

#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    pub category: ItemCategory,
    pub kind: i32,
    pub flags: ItemFlags,
    pub enchant: i32,
    pub key_loc: Vec<KeyLoc>,
    pub loc: Option<(i32, i32)>,
    pub origin_depth: i32,
}

impl Item {
    pub fn is_key(&self) -> bool {
        self.flags.contains(ItemFlags::IS_KEY)
    }

    /// Heavy weapons: the top third of the weapon table.
    pub fn is_heavy_weapon(&self) -> bool {
        self.category == ItemCategory::Weapon && self.kind >= 7
    }

    pub fn is_positively_enchanted(&self) -> bool {
        self.enchant > 0
    }
}

const WEIGHTED_CATEGORIES: [ItemCategory; 9] = [
    ItemCategory::Food,
    ItemCategory::Weapon,
    ItemCategory::Armor,
    ItemCategory::Scroll,
    ItemCategory::Potion,
    ItemCategory::Staff,
    ItemCategory::Wand,
    ItemCategory::Charm,
    ItemCategory::Ring,
];

/// Generate one item. `category = None` draws from the weighted table;
/// `kind < 0` draws uniformly within the category.
pub fn generate_item(
    rng: &mut Rng,
    next_id: &mut ItemId,
    depth: i32,
    category: Option<ItemCategory>,
    kind: i32,
) -> Item {
    let category = category.unwrap_or_else(|| {
        let total: i32 = WEIGHTED_CATEGORIES.iter().map(|c| c.generation_weight()).sum();
        let mut roll = rng.rand_range(0, total - 1);
        let mut chosen = ItemCategory::Potion;
        for &c in &WEIGHTED_CATEGORIES {
            roll -= c.generation_weight();
            if roll < 0 {
                chosen = c;
                break;
            }
        }
        chosen
    });
    let kind = if kind >= 0 { kind } else { rng.rand_range(0, category.kind_count() - 1) };
    let mut flags = ItemFlags::empty();
    if category == ItemCategory::Key {
        flags |= ItemFlags::IS_KEY;
    }
    // The bottom of the weapon table is darts and javelins.
    if category == ItemCategory::Weapon && kind <= 1 {
        flags |= ItemFlags::IS_THROWING_WEAPON;
    }
    let enchant = match category {
        ItemCategory::Weapon | ItemCategory::Armor => {
            rng.rand_clumped_range(-2, 2 + depth / 8, 2)
        }
        ItemCategory::Staff | ItemCategory::Wand | ItemCategory::Charm | ItemCategory::Ring => {
            rng.rand_clumped_range(1, 3 + depth / 10, 2)
        }
        _ => 0,
    };
    if enchant < 0 {
        flags |= ItemFlags::IS_CURSED;
    }
    let id = *next_id;
    *next_id += 1;
    Item {
        id,
        category,
        kind,
        flags,
        enchant,
        key_loc: Vec::new(),
        loc: None,
        origin_depth: depth,
    }
}

/// Put an item on the floor, flagging its cell.
pub fn place_item_at(grid: &mut Grid<Cell>, item: &mut Item, x: i32, y: i32) {
    item.loc = Some((x, y));
    if let Some(cell) = grid.get_mut(x, y) {
        cell.flags |= CellFlags::HAS_ITEM;
    }
}

/// Lift an item off the floor, clearing its cell flag.
pub fn remove_item_from_floor(grid: &mut Grid<Cell>, item: &mut Item) {
    if let Some((x, y)) = item.loc.take() {
        if let Some(cell) = grid.get_mut(x, y) {
            cell.flags.remove(CellFlags::HAS_ITEM);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_carry_the_key_flag() {
        let mut rng = Rng::new(5);
        let mut next = 1;
        let key = generate_item(&mut rng, &mut next, 3, Some(ItemCategory::Key), KEY_DOOR);
        assert!(key.is_key());
        assert!(key.key_loc.is_empty());
    }

    #[test]
    fn item_ids_are_unique() {
        let mut rng = Rng::new(5);
        let mut next = 1;
        let a = generate_item(&mut rng, &mut next, 1, None, -1);
        let b = generate_item(&mut rng, &mut next, 1, None, -1);
        assert_ne!(a.id, b.id);
    }
}
