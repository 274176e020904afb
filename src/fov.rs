//! Field-of-view masks for view-constrained machine feature placement and
//! waypoint separation.

use crate::cell::{Cell, CellFlags};
use crate::grid::Grid;
use crate::tiles::TileFlags;

/// Octant transforms for recursive shadowcasting.
const OCTANTS: [(i32, i32, i32, i32); 8] = [
    (1, 0, 0, 1),
    (0, 1, 1, 0),
    (0, -1, 1, 0),
    (-1, 0, 0, 1),
    (-1, 0, 0, -1),
    (0, -1, -1, 0),
    (0, 1, -1, 0),
    (1, 0, 0, -1),
];

/// Fill `mask` with `1` on every cell visible from `(x, y)` within
/// `max_radius`. A cell is opaque when any of its tiles carries
/// `forbidden_terrain` or the cell carries `forbidden_flags`. With
/// `cautious_on_walls`, opaque cells themselves are left unmarked.
pub fn get_fov_mask(
    mask: &mut Grid<i16>,
    grid: &Grid<Cell>,
    x: i32,
    y: i32,
    max_radius: i32,
    forbidden_terrain: TileFlags,
    forbidden_flags: CellFlags,
    cautious_on_walls: bool,
) {
    mask.set(x, y, 1);
    let opaque = |cx: i32, cy: i32| -> bool {
        match grid.get(cx, cy) {
            Some(c) => c.has_tile_flag(forbidden_terrain) || c.flags.intersects(forbidden_flags),
            None => true,
        }
    };
    for &(xx, xy, yx, yy) in &OCTANTS {
        cast_octant(
            mask,
            &opaque,
            x,
            y,
            max_radius,
            1,
            1.0,
            0.0,
            (xx, xy, yx, yy),
            cautious_on_walls,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn cast_octant<F: Fn(i32, i32) -> bool>(
    mask: &mut Grid<i16>,
    opaque: &F,
    ox: i32,
    oy: i32,
    radius: i32,
    row: i32,
    mut start_slope: f32,
    end_slope: f32,
    xform: (i32, i32, i32, i32),
    cautious: bool,
) {
    if start_slope < end_slope {
        return;
    }
    let (xx, xy, yx, yy) = xform;
    let radius2 = radius * radius;
    let mut blocked = false;
    let mut dist = row;
    while dist <= radius && !blocked {
        let dy = -dist;
        for dx in -dist..=0 {
            let l_slope = (dx as f32 - 0.5) / (dy as f32 + 0.5);
            let r_slope = (dx as f32 + 0.5) / (dy as f32 - 0.5);
            if start_slope < r_slope {
                continue;
            }
            if end_slope > l_slope {
                break;
            }
            let cx = ox + dx * xx + dy * xy;
            let cy = oy + dx * yx + dy * yy;
            let in_radius = dx * dx + dy * dy <= radius2;
            let cell_opaque = opaque(cx, cy);
            if in_radius && (!cell_opaque || !cautious) && mask.in_bounds(cx, cy) {
                mask.set(cx, cy, 1);
            }
            if blocked {
                if cell_opaque {
                    start_slope = r_slope;
                } else {
                    blocked = false;
                }
            } else if cell_opaque && dist < radius {
                blocked = true;
                cast_octant(
                    mask, opaque, ox, oy, radius,
                    dist + 1,
                    start_slope,
                    l_slope,
                    xform,
                    cautious,
                );
                start_slope = r_slope;
            }
        }
        dist += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Layer;
    use crate::tiles::TileType;

    fn open_grid(w: usize, h: usize) -> Grid<Cell> {
        let mut g: Grid<Cell> = Grid::new(w, h);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                g.get_mut(x, y).unwrap().clear_to_floor();
            }
        }
        g
    }

    #[test]
    fn open_room_is_fully_visible() {
        let g = open_grid(11, 11);
        let mut mask: Grid<i16> = Grid::new(11, 11);
        get_fov_mask(&mut mask, &g, 5, 5, 20, TileFlags::OBSTRUCTS_VISION, CellFlags::empty(), false);
        assert_eq!(mask.count(|v| v == 1), 11 * 11);
    }

    #[test]
    fn wall_casts_shadow() {
        let mut g = open_grid(11, 11);
        g.get_mut(5, 3).unwrap().set_tile(Layer::Dungeon, TileType::Wall);
        let mut mask: Grid<i16> = Grid::new(11, 11);
        get_fov_mask(&mut mask, &g, 5, 5, 20, TileFlags::OBSTRUCTS_VISION, CellFlags::empty(), false);
        assert_eq!(mask.get(5, 3), Some(1), "the wall itself is visible");
        assert_eq!(mask.get(5, 0), Some(0), "cells behind the wall are not");
    }

    #[test]
    fn radius_bounds_the_mask() {
        let g = open_grid(31, 31);
        let mut mask: Grid<i16> = Grid::new(31, 31);
        get_fov_mask(&mut mask, &g, 15, 15, 4, TileFlags::OBSTRUCTS_VISION, CellFlags::empty(), false);
        assert_eq!(mask.get(15, 10), Some(0));
        assert_eq!(mask.get(15, 12), Some(1));
    }
}
