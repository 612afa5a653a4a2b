//! Round-trip and idempotence laws from `SPEC_FULL.md` §8.

mod common;

use cellulator::{Area, Brush, Config, Error, State::Alive, State::Dead};

fn engine() -> Result<cellulator::Engine, Error> {
    Config::default().engine()
}

#[test]
fn painting_a_brush_then_its_inverse_restores_an_empty_world() -> Result<(), Error> {
    common::init();
    let e = engine()?;
    e.allocate_to(16, 16)?;

    let brush = Brush::from_pattern(
        3,
        3,
        vec![vec![Alive, Dead, Alive], vec![Dead, Alive, Dead], vec![Alive, Dead, Alive]],
    );
    e.paint(&brush, 5, 5);
    assert_eq!(e.live_count(), 5);

    e.paint(&brush.inverse(), 5, 5);
    assert_eq!(e.live_count(), 0);

    for y in 4..7 {
        for x in 4..7 {
            assert_eq!(e.cell_status(x, y).0, Dead);
        }
    }
    Ok(())
}

#[test]
fn an_empty_ruleset_kills_every_generation_and_stays_dead() -> Result<(), Error> {
    common::init();
    let e = engine()?;
    e.allocate_to(16, 16)?;

    let brush = Brush::from_pattern(3, 1, vec![vec![Alive, Alive, Alive]]);
    e.paint(&brush, 0, 0);
    assert!(e.live_count() > 0);

    assert!(e.set_ruleset([], []));

    for _ in 0..3 {
        common::step_and_wait(&e);
        assert_eq!(e.live_count(), 0);
    }
    Ok(())
}

#[test]
fn fetch_cells_agrees_with_per_cell_queries() -> Result<(), Error> {
    common::init();
    let e = engine()?;
    e.allocate_to(16, 16)?;

    let brush = Brush::from_pattern(
        4,
        3,
        vec![
            vec![Alive, Dead, Dead, Alive],
            vec![Dead, Alive, Alive, Dead],
            vec![Alive, Dead, Dead, Alive],
        ],
    );
    e.paint(&brush, 8, 8);

    // Kept inside the single block `allocate_to` pre-allocates, so every
    // queried coordinate is covered by `live_area` and `cell_status` never
    // takes its "outside live_area" (Dead, -1) shortcut.
    let area = Area::new(0, 0, 16, 16);
    let slab = e.fetch_cells(area);
    assert_eq!(slab.len(), 256);

    for y in area.y..area.y + area.h {
        for x in area.x..area.x + area.w {
            let idx = ((y - area.y) * area.w + (x - area.x)) as usize;
            let (state, age) = e.cell_status(x, y);
            assert_eq!(slab[idx], (state, age.max(0) as u32), "mismatch at ({}, {})", x, y);
        }
    }
    Ok(())
}
