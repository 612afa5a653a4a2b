//! The top-level engine: the only type external callers (a GUI, a test
//! harness) need to hold (spec.md §6).
//!
//! Grounded in `original_source/src/Colony.hh`/`.cc` combined with
//! `ColonyScheduler.hh`/`.cc`'s external surface: the original splits "the
//! cells" (`Colony`) from "the thing that drives generations across a
//! thread pool" (`ColonyScheduler`), but callers only ever go through the
//! scheduler, which owns the colony. This crate keeps that same external
//! shape collapsed into one type: `Engine` owns the
//! [`BlockStore`](crate::block::BlockStore) (behind the world lock) and a
//! [`Scheduler`], and every method here is a thin, lock-acquiring
//! pass-through, no logic of its own beyond what spec.md §6's table says.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::sync::{Arc, RwLock};

use crate::block::BlockStore;
use crate::brush::Brush;
use crate::cells::State;
use crate::error::Error;
use crate::geometry::{Area, AreaF};
use crate::rules::RuleSet;
use crate::scheduler::{Scheduler, SimState};

/// A single cellulator simulation (spec.md §6's whole external interface).
pub struct Engine {
    store: Arc<RwLock<BlockStore>>,
    scheduler: Scheduler,
    dead_probability: AtomicU64,
}

impl Engine {
    /// Creates an empty engine with the given block dimensions and worker
    /// pool size (spec.md §6, `new_engine`). Most callers should prefer
    /// [`crate::Config::engine`], which also validates and supplies the
    /// spec defaults.
    pub fn new(
        block_width: u32,
        block_height: u32,
        worker_count: usize,
        dead_probability: f64,
    ) -> Result<Self, Error> {
        let store = Arc::new(RwLock::new(BlockStore::new(block_width, block_height)?));
        let scheduler = Scheduler::new(Arc::clone(&store), worker_count);
        Ok(Engine {
            store,
            scheduler,
            dead_probability: AtomicU64::new(dead_probability.to_bits()),
        })
    }

    /// Creates the initial coverage centered at the origin, at least
    /// `min_w x min_h` (spec.md §4.3, §6).
    pub fn allocate_to(&self, min_w: u32, min_h: u32) -> Result<Area, Error> {
        self.store
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .allocate_to(min_w, min_h)
    }

    /// Atomically swaps the active rule set. Rejected (warn, no-op,
    /// returns `false`) unless the simulation is stopped (spec.md §4.1,
    /// §4.7).
    pub fn set_ruleset(&self, born: impl IntoIterator<Item = u8>, survive: impl IntoIterator<Item = u8>) -> bool {
        self.scheduler.replace_ruleset(RuleSet::new(born, survive))
    }

    /// Applies `brush` centered at `(x, y)`, returning the new total live
    /// count (spec.md §4.5.3, §6).
    pub fn paint(&self, brush: &Brush, x: i32, y: i32) -> u32 {
        self.store
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .paint(brush, (x, y))
    }

    /// Randomizes every active block using the configured dead-cell
    /// probability, then settles the double-buffered state without
    /// advancing [`Self::generation`] (spec.md §4.5.4, §6). Returns the new
    /// live count.
    pub fn randomize(&self) -> u32 {
        let dead_probability = f64::from_bits(self.dead_probability.load(Relaxed));
        let mut rng = rand::thread_rng();
        self.store
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .randomize(&mut rng, dead_probability)
    }

    /// Changes the dead-cell probability used by future [`Self::randomize`]
    /// calls (spec.md §6 configuration constants).
    pub fn set_dead_probability(&self, dead_probability: f64) {
        self.dead_probability.store(dead_probability.to_bits(), Relaxed);
    }

    /// Starts continuous simulation (spec.md §4.7).
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Computes exactly one generation (spec.md §4.7).
    pub fn step(&self) {
        self.scheduler.step();
    }

    /// Stops continuous simulation (spec.md §4.7).
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Flips `Running` <-> `Stopped` (spec.md §4.7).
    pub fn toggle(&self) {
        self.scheduler.toggle();
    }

    /// The scheduler's current run state.
    pub fn state(&self) -> SimState {
        self.scheduler.state()
    }

    /// Registers the `generation-computed(gen, live)` notification (spec.md
    /// §6). Replaces any previously registered callback. Invoked from the
    /// scheduler's notification thread.
    pub fn on_generation_computed(&self, f: impl Fn(u64, u32) + Send + Sync + 'static) {
        self.scheduler.on_generation_computed(f);
    }

    /// Registers the `simulation-toggled(running)` notification (spec.md
    /// §6). Replaces any previously registered callback. Invoked from the
    /// scheduler's notification thread.
    pub fn on_simulation_toggled(&self, f: impl Fn(bool) + Send + Sync + 'static) {
        self.scheduler.on_simulation_toggled(f);
    }

    /// A tight float bound on currently live cells (spec.md §4.5.5, §6).
    pub fn live_area(&self) -> AreaF {
        self.store.read().unwrap_or_else(|e| e.into_inner()).live_area()
    }

    /// The state and age of the cell at `(x, y)`; age is `-1` for `Dead`
    /// (spec.md §4.5.5, §6).
    pub fn cell_status(&self, x: i32, y: i32) -> (State, i32) {
        self.store
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .cell_status((x, y))
    }

    /// A row-major `(state, age)` slab covering `area` (spec.md §4.5.5,
    /// §6).
    pub fn fetch_cells(&self, area: Area) -> Vec<(State, u32)> {
        self.store.read().unwrap_or_else(|e| e.into_inner()).fetch_cells(area)
    }

    /// The current generation counter (spec.md §6).
    pub fn generation(&self) -> u64 {
        self.store.read().unwrap_or_else(|e| e.into_inner()).generation()
    }

    /// The cached live-cell count (spec.md §6).
    pub fn live_count(&self) -> u32 {
        self.store.read().unwrap_or_else(|e| e.into_inner()).live_count()
    }
}
