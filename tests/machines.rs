//! Machine builder behavior: qualification, vestibule key binding,
//! rollback bit-identity, and key reachability on full levels.

use dungeon_architect::{
    blueprint_qualifies, build_a_machine, dig_dungeon, generate_item, BpFlags, CellFlags,
    GenerationContext, ItemCategory, Layer, TileMechFlags, TileType, BLUEPRINT_CATALOG, KEY_DOOR,
    LOCKED_DOOR_VESTIBULE,
};

/// An open rectangular chamber for direct machine construction.
fn open_context(w: i32, h: i32) -> GenerationContext {
    let mut ctx = GenerationContext::new(7, 5);
    ctx.clear_level();
    for y in 1..=h {
        for x in 1..=w {
            ctx.grid.get_mut(x, y).unwrap().clear_to_floor();
        }
    }
    ctx
}

#[test]
fn vestibules_and_adopters_need_to_be_asked_for() {
    for bp in BLUEPRINT_CATALOG {
        let depth = bp.depth_range.0;
        if bp.flags.intersects(BpFlags::VESTIBULE | BpFlags::ADOPT_ITEM) {
            assert!(
                !blueprint_qualifies(bp, depth, BpFlags::empty()),
                "{} qualified without its special flag being required",
                bp.name
            );
        }
        if bp.flags.contains(BpFlags::VESTIBULE) {
            assert!(blueprint_qualifies(bp, depth, BpFlags::VESTIBULE), "{}", bp.name);
        }
    }
}

#[test]
fn depth_range_gates_qualification() {
    let bp = &BLUEPRINT_CATALOG[LOCKED_DOOR_VESTIBULE];
    assert!(!blueprint_qualifies(bp, bp.depth_range.0 - 1, BpFlags::VESTIBULE));
    assert!(!blueprint_qualifies(bp, bp.depth_range.1 + 1, BpFlags::VESTIBULE));
}

#[test]
fn locked_door_vestibule_binds_a_supplied_key() {
    let mut ctx = open_context(20, 20);
    let key = generate_item(&mut ctx.rng, &mut ctx.next_item_id, 5, Some(ItemCategory::Key), KEY_DOOR);
    let key_id = key.id;
    ctx.items.push(key);

    let origin = (10, 10);
    let built = build_a_machine(
        &mut ctx,
        Some(LOCKED_DOOR_VESTIBULE),
        Some(origin),
        BpFlags::VESTIBULE,
        Some(key_id),
        None,
        None,
    );
    assert!(built, "the vestibule should build on an open floor");

    let locked_doors: Vec<(usize, usize)> = ctx
        .grid
        .iter()
        .filter(|&(_, _, c)| c.tile(Layer::Dungeon) == TileType::LockedDoor)
        .map(|(x, y, _)| (x, y))
        .collect();
    assert_eq!(locked_doors, vec![(origin.0 as usize, origin.1 as usize)]);

    let key = &ctx.items[ctx.item_index(key_id).unwrap()];
    assert!(!key.key_loc.is_empty(), "the supplied key must learn its lock");
    assert_eq!(key.key_loc[0].loc, origin);
    assert_eq!(key.key_loc[0].machine, 0);
    assert!(key.key_loc[0].disposable);
}

#[test]
fn failed_machine_restores_the_grid_bit_for_bit() {
    // A 3x3 chamber: the vestibule itself fits, but the key it generates
    // cannot be outsourced anywhere, so the build must abort and unwind.
    let mut ctx = open_context(3, 3);
    let before = ctx.grid.clone();
    let machine_number_before = ctx.machine_number;

    let built = build_a_machine(
        &mut ctx,
        Some(LOCKED_DOOR_VESTIBULE),
        Some((2, 2)),
        BpFlags::VESTIBULE,
        None,
        None,
        None,
    );
    assert!(!built, "outsourcing must fail with nowhere to put the key");
    assert_eq!(ctx.grid, before, "rollback must be bit-identical");
    assert_eq!(ctx.machine_number, machine_number_before);
    assert!(ctx.items.is_empty(), "spawned items must be deleted on abort");
    assert!(ctx.monsters.is_empty(), "spawned monsters must be killed on abort");
}

#[test]
fn machine_monsters_remember_their_machine() {
    for seed in [3u64, 555, 80808] {
        let mut ctx = GenerationContext::new(seed, 12);
        dig_dungeon(&mut ctx).unwrap();
        for m in &ctx.monsters {
            // Every generated monster comes from a machine on this level.
            assert!(m.machine_home >= 1);
            assert!(m.machine_home <= ctx.machine_number);
        }
    }
}

#[test]
fn keys_always_know_what_they_open() {
    for seed in [9u64, 404, 123456] {
        let mut ctx = GenerationContext::new(seed, 10);
        dig_dungeon(&mut ctx).unwrap();
        for item in &ctx.items {
            if !item.is_key() {
                continue;
            }
            assert!(!item.key_loc.is_empty(), "seed {}: key with no lock", seed);
            let reachable_lock = item.key_loc.iter().any(|kl| {
                if kl.machine != 0 {
                    return kl.machine <= ctx.machine_number;
                }
                ctx.grid
                    .get(kl.loc.0, kl.loc.1)
                    .is_some_and(|c| c.has_mech_flag(TileMechFlags::PROMOTES_WITH_KEY))
            });
            assert!(reachable_lock, "seed {}: key bound to nothing that unlocks", seed);
        }
    }
}

#[test]
fn no_interior_flag_blueprints_leave_only_wired_cells_claimed() {
    for seed in [21u64, 7777] {
        let mut ctx = GenerationContext::new(seed, 8);
        dig_dungeon(&mut ctx).unwrap();
        for (x, y, c) in ctx.grid.iter() {
            if c.machine_number != 0 {
                assert!(
                    c.flags.intersects(CellFlags::IS_IN_MACHINE),
                    "seed {}: ({}, {}) keeps an id without a flag",
                    seed,
                    x,
                    y
                );
            }
        }
    }
}
