//! The layered cell and its per-cell flags.

use crate::grid::Grid;
use crate::tiles::{TileFlags, TileMechFlags, TileType};
use bitflags::bitflags;

/// The four stacked terrain layers of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Dungeon = 0,
    Liquid = 1,
    Gas = 2,
    Surface = 3,
}

impl Layer {
    pub const ALL: [Layer; 4] = [Layer::Dungeon, Layer::Liquid, Layer::Gas, Layer::Surface];
}

bitflags! {
    /// Per-cell state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u32 {
        const HAS_MONSTER           = 1 << 0;
        const HAS_ITEM              = 1 << 1;
        const HAS_STAIRS            = 1 << 2;
        const HAS_PLAYER            = 1 << 3;
        const IS_IN_ROOM_MACHINE    = 1 << 4;
        const IS_IN_AREA_MACHINE    = 1 << 5;
        const IS_GATE_SITE          = 1 << 6;
        const IS_CHOKEPOINT         = 1 << 7;
        const IN_LOOP               = 1 << 8;
        const IMPREGNABLE           = 1 << 9;
        const CAUGHT_FIRE_THIS_TURN = 1 << 10;
        // Visibility and memory bits; unused during generation.
        const VISIBLE               = 1 << 11;
        const DISCOVERED            = 1 << 12;
        const MAGIC_MAPPED          = 1 << 13;

        const IS_IN_MACHINE = Self::IS_IN_ROOM_MACHINE.bits() | Self::IS_IN_AREA_MACHINE.bits();
    }
}

/// One grid position: four tile layers, flags, a machine id, gas volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub layers: [TileType; 4],
    pub flags: CellFlags,
    /// 0 outside machines; machine ids start at 1 and increase per level.
    pub machine_number: u16,
    pub volume: i16,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            layers: [TileType::Granite, TileType::Nothing, TileType::Nothing, TileType::Nothing],
            flags: CellFlags::empty(),
            machine_number: 0,
            volume: 0,
        }
    }
}

impl Cell {
    #[inline]
    pub fn tile(&self, layer: Layer) -> TileType {
        self.layers[layer as usize]
    }

    #[inline]
    pub fn set_tile(&mut self, layer: Layer, tile: TileType) {
        self.layers[layer as usize] = tile;
    }

    /// Union of terrain flags across all four layers.
    pub fn tile_flags(&self) -> TileFlags {
        let mut f = TileFlags::empty();
        for t in self.layers {
            f |= t.flags();
        }
        f
    }

    /// Union of mechanical flags across all four layers.
    pub fn mech_flags(&self) -> TileMechFlags {
        let mut f = TileMechFlags::empty();
        for t in self.layers {
            f |= t.mech_flags();
        }
        f
    }

    #[inline]
    pub fn has_tile_flag(&self, flags: TileFlags) -> bool {
        self.tile_flags().intersects(flags)
    }

    #[inline]
    pub fn has_mech_flag(&self, flags: TileMechFlags) -> bool {
        self.mech_flags().intersects(flags)
    }

    /// The layer whose tile wins the draw-priority contest.
    pub fn highest_priority_layer(&self) -> Layer {
        let mut best = Layer::Dungeon;
        let mut best_priority = self.layers[0].draw_priority();
        for layer in [Layer::Liquid, Layer::Gas, Layer::Surface] {
            let p = self.layers[layer as usize].draw_priority();
            if p < best_priority {
                best_priority = p;
                best = layer;
            }
        }
        best
    }

    pub fn highest_priority_tile(&self) -> TileType {
        self.tile(self.highest_priority_layer())
    }

    /// A walking creature can occupy this cell.
    #[inline]
    pub fn is_passable(&self) -> bool {
        !self.has_tile_flag(TileFlags::PATHING_BLOCKER)
    }

    /// Passable, or a blocked tile that will open again: secret doors,
    /// keyed doors, and level connectors promise to open, and transient
    /// hazards (fire) burn out rather than divide the level.
    pub fn is_passable_or_door(&self) -> bool {
        if self.is_passable() {
            return true;
        }
        if !self.has_tile_flag(TileFlags::DIVIDES_LEVEL) {
            return true;
        }
        self.has_mech_flag(
            TileMechFlags::IS_SECRET
                | TileMechFlags::PROMOTES_WITH_KEY
                | TileMechFlags::CONNECTS_LEVEL,
        ) && self.has_tile_flag(TileFlags::PATHING_BLOCKER)
    }

    /// Reset to bare floor on the dungeon layer, nothing elsewhere.
    pub fn clear_to_floor(&mut self) {
        self.layers = [TileType::Floor, TileType::Nothing, TileType::Nothing, TileType::Nothing];
    }
}

// Cell-grid helpers shared by every pipeline stage.
impl Grid<Cell> {
    #[inline]
    pub fn has_terrain_flag(&self, x: i32, y: i32, flags: TileFlags) -> bool {
        self.get(x, y).is_some_and(|c| c.has_tile_flag(flags))
    }

    #[inline]
    pub fn has_mech_flag_at(&self, x: i32, y: i32, flags: TileMechFlags) -> bool {
        self.get(x, y).is_some_and(|c| c.has_mech_flag(flags))
    }

    #[inline]
    pub fn has_cell_flag(&self, x: i32, y: i32, flags: CellFlags) -> bool {
        self.get(x, y).is_some_and(|c| c.flags.intersects(flags))
    }

    #[inline]
    pub fn cell_is_passable(&self, x: i32, y: i32) -> bool {
        self.get(x, y).is_some_and(|c| c.is_passable())
    }

    #[inline]
    pub fn cell_is_passable_or_door(&self, x: i32, y: i32) -> bool {
        self.get(x, y).is_some_and(|c| c.is_passable_or_door())
    }

    /// Number of distinct passable arcs in the 8-neighbor ring. Straight
    /// corridors score 2; rooms score 1; junctions score 3+.
    pub fn passable_arc_count(&self, x: i32, y: i32) -> i32 {
        const RING: [(i32, i32); 8] = [
            (0, -1),
            (1, -1),
            (1, 0),
            (1, 1),
            (0, 1),
            (-1, 1),
            (-1, 0),
            (-1, -1),
        ];
        let mut transitions = 0;
        for dir in 0..8 {
            let (ox, oy) = RING[(dir + 7) % 8];
            let (nx, ny) = RING[dir];
            let old = self.cell_is_passable_or_door(x + ox, y + oy);
            let new = self.cell_is_passable_or_door(x + nx, y + ny);
            if old != new {
                transitions += 1;
            }
        }
        transitions / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cell_is_solid_granite() {
        let c = Cell::default();
        assert_eq!(c.tile(Layer::Dungeon), TileType::Granite);
        assert_eq!(c.tile(Layer::Liquid), TileType::Nothing);
        assert!(!c.is_passable());
        assert_eq!(c.machine_number, 0);
        assert_eq!(c.volume, 0);
    }

    #[test]
    fn layer_priority_prefers_bridge_over_chasm() {
        let mut c = Cell::default();
        c.clear_to_floor();
        c.set_tile(Layer::Liquid, TileType::Chasm);
        assert_eq!(c.highest_priority_layer(), Layer::Liquid);
        c.set_tile(Layer::Liquid, TileType::Bridge);
        assert_eq!(c.highest_priority_tile(), TileType::Bridge);
    }

    #[test]
    fn arc_count_in_corridor_is_two() {
        let mut g: Grid<Cell> = Grid::new(5, 5);
        for x in 0..5 {
            g.get_mut(x, 2).unwrap().clear_to_floor();
        }
        assert_eq!(g.passable_arc_count(2, 2), 2);
    }
}
