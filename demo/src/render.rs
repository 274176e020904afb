//! Text rendering of generated levels.

use dungeon_architect::{CellFlags, GenerationContext, DCOLS, DROWS};

/// One character per cell: the highest-priority tile's glyph, with items
/// and monsters drawn on top.
pub fn render_text(ctx: &GenerationContext) -> String {
    let mut out = String::with_capacity((DCOLS + 1) * DROWS);
    for y in 0..DROWS as i32 {
        for x in 0..DCOLS as i32 {
            let cell = ctx.grid.get(x, y).unwrap();
            let glyph = if cell.flags.contains(CellFlags::HAS_MONSTER) {
                'm'
            } else if cell.flags.contains(CellFlags::HAS_ITEM) {
                '!'
            } else {
                cell.highest_priority_tile().glyph()
            };
            out.push(glyph);
        }
        out.push('\n');
    }
    out
}
