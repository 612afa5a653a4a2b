//! The scheduler state machine driving generations across the worker pool
//! (C7).
//!
//! Grounded in `original_source/src/ColonyScheduler.hh`/`.cc`: the
//! `SimulationState` enum and `start`/`step`/`stop`/`toggle`/
//! `onRulesetChanged` methods are carried over almost unchanged, and
//! `scheduleRendering`/`handleTilesComputed` become
//! [`Scheduler::begin_generation`]/[`Scheduler::finalize_generation`]. The
//! original's `m_taskProgress`/`m_taskTotal` pair and its "detect a closure
//! among the completed tiles" loop are kept verbatim; what changes is the
//! notification channel (`utils::ThreadPool::onJobsCompleted`, a signal
//! fired on the pool's own thread) becoming an explicit long-lived
//! "notifier" thread draining [`crate::pool::Pool`]'s result channel, since
//! this crate has no GUI signal/slot system to piggyback on (see REDESIGN
//! FLAGS in `SPEC_FULL.md`).

use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, select, Sender};

use crate::block::BlockStore;
use crate::pool::Pool;
use crate::rules::RuleSet;
use crate::tile::Tile;

/// The simulation's run state (spec.md §4.7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimState {
    Stopped,
    Running,
    SingleStep,
}

type GenerationCallback = Arc<dyn Fn(u64, u32) + Send + Sync>;
type ToggleCallback = Arc<dyn Fn(bool) + Send + Sync>;

struct Inner {
    state: SimState,
    /// Bumped every time a fresh batch is submitted; a [`crate::pool::TileResult`]
    /// whose token doesn't match the current one is a straggler from a
    /// superseded schedule and is discarded (spec.md §5, "Cancellation").
    token: u64,
    progress: u32,
    total: u32,
    saw_closure: bool,
    on_generation_computed: Option<GenerationCallback>,
    on_simulation_toggled: Option<ToggleCallback>,
}

/// Drives generations across the block store by dispatching tile jobs to a
/// worker pool and finalizing each completed batch.
pub struct Scheduler {
    store: Arc<RwLock<BlockStore>>,
    pool: Arc<Pool>,
    inner: Arc<Mutex<Inner>>,
    shutdown_tx: Sender<()>,
    notifier: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Creates a scheduler over `store`, backed by a worker pool of
    /// `worker_count` threads (spec.md §6 default: 3).
    pub fn new(store: Arc<RwLock<BlockStore>>, worker_count: usize) -> Self {
        let pool = Arc::new(Pool::new(worker_count, Arc::clone(&store)));
        let inner = Arc::new(Mutex::new(Inner {
            state: SimState::Stopped,
            token: 0,
            progress: 0,
            total: 0,
            saw_closure: false,
            on_generation_computed: None,
            on_simulation_toggled: None,
        }));
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        let notifier = {
            let store = Arc::clone(&store);
            let pool = Arc::clone(&pool);
            let inner = Arc::clone(&inner);
            std::thread::Builder::new()
                .name("cellulator-scheduler".to_string())
                .spawn(move || Self::run_notifier(store, pool, inner, shutdown_rx))
                .expect("failed to spawn cellulator scheduler thread")
        };

        Scheduler {
            store,
            pool,
            inner,
            shutdown_tx,
            notifier: Some(notifier),
        }
    }

    /// Registers the `generation-computed(gen, live)` callback (spec.md
    /// §6). Replaces any previously registered callback.
    pub fn on_generation_computed(&self, f: impl Fn(u64, u32) + Send + Sync + 'static) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).on_generation_computed = Some(Arc::new(f));
    }

    /// Registers the `simulation-toggled(running)` callback (spec.md §6).
    /// Replaces any previously registered callback.
    pub fn on_simulation_toggled(&self, f: impl Fn(bool) + Send + Sync + 'static) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).on_simulation_toggled = Some(Arc::new(f));
    }

    /// The current run state.
    pub fn state(&self) -> SimState {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).state
    }

    /// Starts continuous simulation. No-op if already `Running` or
    /// `SingleStep` (spec.md §4.7: `Stopped -> Running` is the only valid
    /// transition this call performs).
    pub fn start(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.state != SimState::Stopped {
            return;
        }
        inner.state = SimState::Running;
        Self::begin_generation(&self.store, &self.pool, &mut inner);
    }

    /// Computes exactly one generation. No-op unless currently `Stopped`.
    pub fn step(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.state != SimState::Stopped {
            return;
        }
        inner.state = SimState::SingleStep;
        Self::begin_generation(&self.store, &self.pool, &mut inner);
    }

    /// Requests the simulation stop. No-op if already `Stopped`. The
    /// in-flight batch (if any) still runs to completion; it simply won't
    /// be followed by another (spec.md §5, "Cancellation").
    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.state = SimState::Stopped;
    }

    /// Flips `Running` <-> `Stopped`. No-op while `SingleStep` (spec.md
    /// §4.7).
    pub fn toggle(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let new_state = match inner.state {
            SimState::Running => Some(SimState::Stopped),
            SimState::Stopped => Some(SimState::Running),
            SimState::SingleStep => None,
        };
        let new_state = match new_state {
            Some(s) => s,
            None => return,
        };
        inner.state = new_state;
        if new_state == SimState::Running {
            Self::begin_generation(&self.store, &self.pool, &mut inner);
        }
        let cb = inner.on_simulation_toggled.clone();
        drop(inner);
        if let Some(cb) = cb {
            cb(new_state == SimState::Running);
        }
    }

    /// Replaces the active rule set. Rejected (warn, no-op, returns
    /// `false`) unless the simulation is `Stopped` (spec.md §4.7, §7).
    pub fn replace_ruleset(&self, ruleset: RuleSet) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.state != SimState::Stopped {
            log::warn!("rejected ruleset change: simulation is not stopped");
            return false;
        }
        self.store
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .set_ruleset(ruleset);
        true
    }

    /// Submits a fresh batch for the current generation: asks the block
    /// store for a schedule, bumps the generation token, and dispatches
    /// tiles to the pool (spec.md §4.7 steps 1-3). Caller must hold `inner`.
    fn begin_generation(store: &Arc<RwLock<BlockStore>>, pool: &Arc<Pool>, inner: &mut Inner) {
        inner.token += 1;
        let token = inner.token;

        let ids = store.read().unwrap_or_else(|e| e.into_inner()).schedule();
        let tiles: Vec<Tile> = if ids.is_empty() {
            vec![Tile::Closure]
        } else {
            ids.into_iter().map(Tile::Block).collect()
        };

        inner.progress = 0;
        inner.total = tiles.len() as u32;
        inner.saw_closure = false;

        pool.submit(token, &tiles);
    }

    /// The notification thread: drains the pool's result channel, tracks
    /// progress, and finalizes each completed generation (spec.md §4.7
    /// steps 4-5). Selects between the result channel and a one-shot
    /// shutdown channel so [`Drop`] can wake it even while no generation is
    /// in flight.
    fn run_notifier(
        store: Arc<RwLock<BlockStore>>,
        pool: Arc<Pool>,
        inner: Arc<Mutex<Inner>>,
        shutdown_rx: crossbeam_channel::Receiver<()>,
    ) {
        loop {
            let result = select! {
                recv(shutdown_rx) -> _ => return,
                recv(pool.result_receiver()) -> msg => match msg {
                    Ok(result) => result,
                    Err(_) => return,
                },
            };

            let mut guard = inner.lock().unwrap_or_else(|e| e.into_inner());
            if result.token != guard.token {
                // A straggler from a superseded schedule; discard.
                continue;
            }

            guard.progress += 1;
            if result.tile.is_closure() {
                guard.saw_closure = true;
            }
            if guard.progress != guard.total {
                continue;
            }

            if guard.saw_closure {
                guard.state = SimState::Stopped;
                let cb = guard.on_simulation_toggled.clone();
                drop(guard);
                if let Some(cb) = cb {
                    cb(false);
                }
                continue;
            }

            let (live, gen) = {
                let mut store = store.write().unwrap_or_else(|e| e.into_inner());
                let live = store.step();
                (live, store.generation())
            };

            match guard.state {
                SimState::Running => Self::begin_generation(&store, &pool, &mut guard),
                SimState::SingleStep => guard.state = SimState::Stopped,
                SimState::Stopped => {}
            }

            let cb = guard.on_generation_computed.clone();
            drop(guard);
            if let Some(cb) = cb {
                cb(gen, live);
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.notifier.take() {
            let _ = handle.join();
        }
    }
}
