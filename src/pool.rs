//! The fixed-size worker pool that runs tile jobs in parallel (§5 AMBIENT).
//!
//! Grounded in `original_source/src/ColonyScheduler.cc`'s use of
//! `utils::ThreadPool`: a handful of long-lived worker threads pull jobs off
//! a shared queue and report completions back through a single channel. The
//! original's `cancelJobs`/`onJobsCompleted` pair becomes, in the absence of
//! real job cancellation (an in-flight job always runs to completion per
//! spec.md §5), a generation **token**: [`Scheduler`](crate::scheduler::Scheduler)
//! bumps the token before submitting a fresh batch, and discards any
//! [`TileResult`] whose token doesn't match the current one. This is the
//! idiomatic `crossbeam-channel` substitute for the original's
//! `utils::ThreadPool`, adopted because none of the teacher crate
//! (`rlifesrc`)'s single-threaded SAT search needs a worker pool at all;
//! see `DESIGN.md`.

use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::block::BlockStore;
use crate::tile::Tile;

/// A tile job tagged with the schedule generation that produced it.
#[derive(Clone, Copy, Debug)]
struct Job {
    token: u64,
    tile: Tile,
}

/// A completed tile job, still tagged with its originating generation.
#[derive(Clone, Copy, Debug)]
pub struct TileResult {
    pub token: u64,
    pub tile: Tile,
}

/// A fixed-size pool of worker threads evolving blocks in parallel.
///
/// Workers take a shared `.read()` guard on the world lock for the
/// duration of a single block's evolve call (spec.md §5: "Not held by
/// worker threads while running per-block evolution" refers to the
/// *exclusive* form; per-block evolution only ever touches disjoint atomics
/// once armed with a read guard, so many workers hold it concurrently with
/// no contention).
pub struct Pool {
    job_tx: Sender<Job>,
    result_rx: Receiver<TileResult>,
    workers: Vec<JoinHandle<()>>,
}

impl Pool {
    /// Spawns `worker_count` threads, all parked on the same job queue,
    /// evolving blocks from `store` (spec.md §6 default: 3 workers).
    pub fn new(worker_count: usize, store: Arc<RwLock<BlockStore>>) -> Self {
        let worker_count = worker_count.max(1);
        let (job_tx, job_rx) = unbounded::<Job>();
        let (result_tx, result_rx) = unbounded::<TileResult>();

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let store = Arc::clone(&store);
            let handle = std::thread::Builder::new()
                .name(format!("cellulator-worker-{}", worker_id))
                .spawn(move || {
                    while let Ok(job) = job_rx.recv() {
                        if let Tile::Block(id) = job.tile {
                            let guard = store.read().unwrap_or_else(|e| e.into_inner());
                            guard.evolve_block(id);
                        }
                        if result_tx
                            .send(TileResult {
                                token: job.token,
                                tile: job.tile,
                            })
                            .is_err()
                        {
                            break;
                        }
                    }
                })
                .expect("failed to spawn cellulator worker thread");
            workers.push(handle);
        }

        Pool {
            job_tx,
            result_rx,
            workers,
        }
    }

    /// The number of live worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Submits every tile in `tiles`, tagged with `token`.
    pub fn submit(&self, token: u64, tiles: &[Tile]) {
        for &tile in tiles {
            // The receivers are only dropped when every worker has exited,
            // which only happens if a worker panicked; nothing to recover
            // into here beyond logging.
            if self.job_tx.send(Job { token, tile }).is_err() {
                log::error!("cellulator worker pool is gone, dropping tile {:?}", tile);
            }
        }
    }

    /// Blocks until the next completion is available.
    pub fn recv(&self) -> Option<TileResult> {
        self.result_rx.recv().ok()
    }

    /// The result channel's receiving end, for callers (the scheduler's
    /// notification thread) that need to `select!` between it and another
    /// channel rather than blocking exclusively on [`Self::recv`].
    pub(crate) fn result_receiver(&self) -> &Receiver<TileResult> {
        &self.result_rx
    }
}
