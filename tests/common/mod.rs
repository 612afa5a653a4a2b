//! Shared helpers for the integration test suite.
//!
//! Every simulation step runs on the scheduler's background notifier
//! thread, so tests observe completion through the engine's own
//! notification callbacks rather than by sleeping and polling.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};

use cellulator::Engine;

const TIMEOUT: Duration = Duration::from_secs(2);

/// Initializes `env_logger` for a single test process. Safe to call from
/// every test; only the first call has any effect.
pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Registers a `generation-computed` listener and returns a channel that
/// yields `(generation, live_count)` once per completed step.
pub fn generation_channel(engine: &Engine) -> Receiver<(u64, u32)> {
    let (tx, rx) = unbounded();
    engine.on_generation_computed(move |gen, live| {
        let _ = tx.send((gen, live));
    });
    rx
}

/// Registers a `simulation-toggled` listener and returns a channel that
/// yields the new `running` flag on every toggle.
pub fn toggle_channel(engine: &Engine) -> Receiver<bool> {
    let (tx, rx) = unbounded();
    engine.on_simulation_toggled(move |running| {
        let _ = tx.send(running);
    });
    rx
}

/// Steps once and blocks until the resulting generation is reported.
/// Panics if no notification arrives within the timeout.
pub fn step_and_wait(engine: &Engine) -> (u64, u32) {
    let rx = generation_channel(engine);
    engine.step();
    rx.recv_timeout(TIMEOUT).expect("generation-computed did not fire")
}
