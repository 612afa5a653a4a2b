//! The six concrete end-to-end scenarios from `SPEC_FULL.md` §8.

mod common;

use cellulator::{Brush, Config, Error, SimState, State::Alive, State::Dead};

fn engine() -> Result<cellulator::Engine, Error> {
    Config::default().engine()
}

#[test]
fn blinker_oscillates_with_period_two() -> Result<(), Error> {
    common::init();
    let e = engine()?;
    e.allocate_to(16, 16)?;

    let brush = Brush::from_pattern(3, 1, vec![vec![Alive, Alive, Alive]]);
    e.paint(&brush, 0, 0);
    assert_eq!(e.live_count(), 3);

    common::step_and_wait(&e);
    assert_eq!(e.cell_status(0, 1).0, Alive);
    assert_eq!(e.cell_status(-1, 0).0, Dead);
    assert_eq!(e.live_count(), 3);

    common::step_and_wait(&e);
    assert_eq!(e.cell_status(-1, 0).0, Alive);
    assert_eq!(e.cell_status(0, 1).0, Dead);
    assert_eq!(e.live_count(), 3);
    Ok(())
}

#[test]
fn glider_returns_to_its_shape_translated_after_four_steps() -> Result<(), Error> {
    common::init();
    let e = engine()?;
    e.allocate_to(16, 16)?;

    // Classic five-cell glider, centered so that painting at (1, 1)
    // lands it exactly on (1,0),(2,1),(0,2),(1,2),(2,2).
    let brush = Brush::from_pattern(
        3,
        3,
        vec![
            vec![Alive, Alive, Alive], // y = 2 (top row, painted first)
            vec![Dead, Dead, Alive],   // y = 1
            vec![Dead, Alive, Dead],   // y = 0
        ],
    );
    e.paint(&brush, 1, 1);
    assert_eq!(e.live_count(), 5);

    for _ in 0..4 {
        common::step_and_wait(&e);
    }

    assert_eq!(e.live_count(), 5);
    for (x, y) in [(2, 1), (3, 2), (1, 3), (2, 3), (3, 3)] {
        assert_eq!(e.cell_status(x, y).0, Alive, "expected ({}, {}) alive", x, y);
    }
    // A cell from the original shape not part of the translated shape.
    assert_eq!(e.cell_status(0, 2).0, Dead);
    Ok(())
}

#[test]
fn empty_world_closes_immediately() -> Result<(), Error> {
    common::init();
    let e = engine()?;
    let toggles = common::toggle_channel(&e);

    e.step();
    let running = toggles
        .recv_timeout(std::time::Duration::from_secs(2))
        .expect("simulation-toggled did not fire for an empty schedule");

    assert!(!running);
    assert_eq!(e.generation(), 0);
    assert_eq!(e.state(), SimState::Stopped);
    Ok(())
}

#[test]
fn brush_paint_sets_live_count_and_live_area() -> Result<(), Error> {
    common::init();
    let e = engine()?;
    e.allocate_to(32, 32)?;

    let brush = Brush::monotonic(3, 3, Alive);
    e.paint(&brush, 10, 10);

    assert_eq!(e.live_count(), 9);
    for y in 9..12 {
        for x in 9..12 {
            assert_eq!(e.cell_status(x, y), (Alive, 1));
        }
    }

    // live_area is tracked per allocated block, not per live cell, so it
    // bounds the single 16x16 block the brush landed in rather than the
    // tight 3x3 painted rectangle (grounded in the original's own
    // `CellsQuadTreeNode::expand`, which accumulates node boundaries the
    // same way).
    let area = e.live_area();
    assert!(area.contains((9, 9)) && area.contains((11, 11)));
    assert_eq!((area.w, area.h), (16.0, 16.0));
    Ok(())
}

#[test]
fn extinguished_world_returns_to_zero_live_blocks() -> Result<(), Error> {
    common::init();
    let e = engine()?;
    e.allocate_to(16, 16)?;

    // A single isolated cell dies from underpopulation after one step.
    let brush = Brush::monotonic(1, 1, Alive);
    e.paint(&brush, 0, 0);
    assert_eq!(e.live_count(), 1);

    common::step_and_wait(&e);
    assert_eq!(e.live_count(), 0);

    // The block store still accepts new life at the same coordinate,
    // whether via a freshly allocated block or a recycled one.
    e.paint(&brush, 0, 0);
    assert_eq!(e.live_count(), 1);
    assert_eq!(e.cell_status(0, 0).0, Alive);
    Ok(())
}

#[test]
fn ruleset_change_is_rejected_while_running() -> Result<(), Error> {
    common::init();
    let e = engine()?;
    e.allocate_to(16, 16)?;
    let brush = Brush::from_pattern(3, 1, vec![vec![Alive, Alive, Alive]]);
    e.paint(&brush, 0, 0);

    e.start();
    assert_eq!(e.state(), SimState::Running);

    let applied = e.set_ruleset([1], [1, 2]);
    assert!(!applied);
    assert_eq!(e.state(), SimState::Running);

    e.stop();
    Ok(())
}
