//! The block-partitioned sparse world: storage, adjacency, evolution and
//! the query surface (C3 + C4 + C5 + C8).
//!
//! Grounded in `original_source/src/CellsBlocks.hh`/`.cc` almost line for
//! line. The original keeps all four concerns as methods of one
//! `CellsBlocks` class, so this module does the same rather than splitting
//! along spec.md's component boundaries, which don't correspond to any
//! class boundary in the source material.
//!
//! | Rust | Original |
//! |---|---|
//! | [`Block`] | `BlockDesc` |
//! | [`BlockStore::register_block`] | `registerNewBlock` |
//! | [`BlockStore::destroy_block`] | `destroyBlock` |
//! | [`BlockStore::link_neighbors`] | `attach` |
//! | [`BlockStore::unlink_neighbors`] | `detach` |
//! | [`BlockStore::expand_halo`] | `allocateBoundary` |
//! | [`BlockStore::bump_current`]/[`BlockStore::bump_next`] | `updateAdjacency` |
//! | [`BlockStore::evolve_block`] | `evolve` |
//! | [`BlockStore::step`] | `stepPrivate` |
//! | [`BlockStore::paint`] | `paint` |
//! | [`BlockStore::randomize`] | `randomize` / `makeRandom` |
//! | [`BlockStore::find`] | `find` |
//! | [`BlockStore::find_block`] | `findBlock` |
//!
//! The two mutexes spec.md §5 names (world lock, adjacency lock) are
//! realized here as, respectively, the `RwLock<BlockStore>` that
//! [`crate::engine::Engine`] wraps this type in, and per-cell atomics on
//! `state`/`adjacency`/`next_state`/`next_adjacency`; see `SPEC_FULL.md`
//! §5 and `DESIGN.md` for the rationale.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering::Relaxed};

use crate::brush::Brush;
use crate::cells::{Age, Alive, Dead, State};
use crate::error::Error;
use crate::geometry::{Area, AreaF, Coord};
use crate::rules::RuleSet;

/// A stable index into [`BlockStore`]'s block vector. Recycled slots keep
/// their id, matching the original's "index into `m_blocks`" scheme.
pub type BlockId = usize;

/// A fixed-size square (or rectangular) patch of cells (spec.md §3).
///
/// Cell data itself is *not* stored here; it lives in the flat arrays
/// owned by [`BlockStore`], indexed by `start..end`. This mirrors the
/// arena pattern `CellsBlocks` uses: blocks don't own their cell memory.
#[derive(Debug)]
pub struct Block {
    pub(crate) id: BlockId,
    pub(crate) area: Area,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) active: bool,
    pub(crate) alive: u32,
    pub(crate) next_alive: AtomicU32,
    pub(crate) changed: u32,
    pub(crate) north: Option<BlockId>,
    pub(crate) south: Option<BlockId>,
    pub(crate) east: Option<BlockId>,
    pub(crate) west: Option<BlockId>,
    pub(crate) ne: Option<BlockId>,
    pub(crate) nw: Option<BlockId>,
    pub(crate) se: Option<BlockId>,
    pub(crate) sw: Option<BlockId>,
}

impl Block {
    fn new(id: BlockId, area: Area, start: usize, end: usize) -> Self {
        Block {
            id,
            area,
            start,
            end,
            active: true,
            alive: 0,
            next_alive: AtomicU32::new(0),
            changed: 0,
            north: None,
            south: None,
            east: None,
            west: None,
            ne: None,
            nw: None,
            se: None,
            sw: None,
        }
    }

    /// The block's position and extent in world coordinates.
    pub fn area(&self) -> Area {
        self.area
    }

    /// `true` if all eight neighbor directions are linked.
    fn has_full_halo(&self) -> bool {
        self.north.is_some()
            && self.south.is_some()
            && self.east.is_some()
            && self.west.is_some()
            && self.ne.is_some()
            && self.nw.is_some()
            && self.se.is_some()
            && self.sw.is_some()
    }
}

/// The block-partitioned sparse world: owns every block and the flat cell
/// arrays they're sliced from (spec.md §3).
pub struct BlockStore {
    node_w: i32,
    node_h: i32,

    ruleset: RuleSet,

    state: Vec<AtomicU8>,
    adjacency: Vec<AtomicU32>,
    age: Vec<Age>,

    next_state: Vec<AtomicU8>,
    next_adjacency: Vec<AtomicU32>,

    blocks: Vec<Block>,
    free_blocks: Vec<BlockId>,
    index: std::collections::HashMap<i64, BlockId>,
    active_block_count: u32,

    total_area: Area,
    live_area: AreaF,
    generation: u64,
}

impl BlockStore {
    /// Creates an empty block store with no allocated blocks. `node_w`/
    /// `node_h` must both be at least 2 (spec.md §3, "Block").
    pub fn new(node_w: u32, node_h: u32) -> Result<Self, Error> {
        if node_w < 2 || node_h < 2 {
            return Err(Error::InvalidBlockDims(node_w, node_h));
        }

        Ok(BlockStore {
            node_w: node_w as i32,
            node_h: node_h as i32,
            ruleset: RuleSet::default(),
            state: Vec::new(),
            adjacency: Vec::new(),
            age: Vec::new(),
            next_state: Vec::new(),
            next_adjacency: Vec::new(),
            blocks: Vec::new(),
            free_blocks: Vec::new(),
            index: std::collections::HashMap::new(),
            active_block_count: 0,
            total_area: Area::default(),
            live_area: AreaF::default(),
            generation: 0,
        })
    }

    /// The block dimensions fixed at construction.
    pub fn node_dims(&self) -> (u32, u32) {
        (self.node_w as u32, self.node_h as u32)
    }

    fn block_cells(&self) -> usize {
        (self.node_w * self.node_h) as usize
    }

    /// Rounds `(min_w, min_h)` up to the next multiple of the block
    /// dimensions, centered at the origin, and allocates every block
    /// covering that area.
    pub fn allocate_to(&mut self, min_w: u32, min_h: u32) -> Result<Area, Error> {
        if min_w == 0 || min_h == 0 {
            return Err(Error::InvalidArea(min_w, min_h));
        }

        let w = min_w as i32;
        let h = min_h as i32;
        let cw = w + (self.node_w - w % self.node_w) % self.node_w;
        let ch = h + (self.node_h - h % self.node_h) % self.node_h;

        let area = Area::new(-cw / 2, -ch / 2, cw, ch);
        self.allocate(area);

        Ok(area)
    }

    fn allocate(&mut self, area: Area) {
        let bc_w = ((area.w as f32) / self.node_w as f32).ceil() as i32;
        let bc_h = ((area.h as f32) / self.node_h as f32).ceil() as i32;

        let min_x = area.left() + self.node_w / 2;
        let min_y = area.bottom() + self.node_h / 2;

        for y in 0..bc_h {
            for x in 0..bc_w {
                let block_area = Area::new(
                    min_x + x * self.node_w,
                    min_y + y * self.node_h,
                    self.node_w,
                    self.node_h,
                );
                self.register_block(block_area);
            }
        }

        self.total_area = area;
        self.live_area = AreaF::new(area.x as f32, area.y as f32, 0.0, 0.0);
    }

    /// Registers (or reuses a free slot for) a block covering `area`,
    /// resets its cell data to `Dead`/`0`, indexes it by center hash, and
    /// links it to any existing neighbors.
    fn register_block(&mut self, area: Area) -> BlockId {
        let id = self.free_blocks.pop().unwrap_or(self.blocks.len());
        let is_new_slot = id == self.blocks.len();

        let start = id * self.block_cells();
        let end = start + self.block_cells();

        if is_new_slot {
            self.state.resize_with(end, || AtomicU8::new(0));
            self.adjacency.resize_with(end, || AtomicU32::new(0));
            self.age.resize(end, 0);
            self.next_state.resize_with(end, || AtomicU8::new(0));
            self.next_adjacency.resize_with(end, || AtomicU32::new(0));
        } else {
            for i in start..end {
                self.state[i].store(0, Relaxed);
                self.adjacency[i].store(0, Relaxed);
                self.age[i] = 0;
                self.next_state[i].store(0, Relaxed);
                self.next_adjacency[i].store(0, Relaxed);
            }
        }

        let block = Block::new(id, area, start, end);
        if is_new_slot {
            self.blocks.push(block);
        } else {
            self.blocks[id] = block;
        }

        let key = hash_coordinate(area.center());
        if self.index.contains_key(&key) {
            log::warn!(
                "overriding center-hash key {} (area {}) with a new block",
                key,
                area
            );
        }
        self.index.insert(key, id);
        self.active_block_count += 1;

        self.link_neighbors(id);

        id
    }

    /// Deactivates a block, frees its slot for reuse, evicts it from the
    /// center-hash index, and clears reciprocal neighbor links.
    fn destroy_block(&mut self, id: BlockId) -> bool {
        if id >= self.blocks.len() || !self.blocks[id].active {
            return false;
        }

        self.blocks[id].active = false;
        self.free_blocks.push(id);
        self.blocks[id].alive = 0;
        self.blocks[id].next_alive.store(0, Relaxed);
        self.blocks[id].changed = 0;

        let key = hash_coordinate(self.blocks[id].area.center());
        if self.index.remove(&key).is_none() {
            log::warn!(
                "could not remove block {} from the center-hash index",
                id
            );
        }

        self.active_block_count -= 1;
        self.unlink_neighbors(id);

        true
    }

    /// Looks up the block registered for exactly `area`'s center,
    /// self-correcting (evicting) any stale index entry it finds.
    fn find(&mut self, area: Area) -> Option<BlockId> {
        let key = hash_coordinate(area.center());
        match self.index.get(&key).copied() {
            Some(id) if id < self.blocks.len() => Some(id),
            Some(_) => {
                log::warn!("stale center-hash entry for area {}; evicting", area);
                self.index.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Linear search over active blocks for one containing `coord`
    /// (spec.md §4.3, kept as a genuine linear scan, matching `findBlock`).
    pub fn find_block(&self, coord: Coord) -> Option<BlockId> {
        self.blocks
            .iter()
            .find(|b| b.active && b.area.contains(coord))
            .map(|b| b.id)
    }

    fn link_neighbors(&mut self, id: BlockId) {
        let area = self.blocks[id].area;
        let (nw, nh) = (self.node_w, self.node_h);

        if let Some(o) = self.find(Area::new(area.x + nw, area.y + nh, nw, nh)) {
            self.blocks[id].ne = Some(o);
            self.blocks[o].sw = Some(id);
        }
        if let Some(o) = self.find(Area::new(area.x, area.y + nh, nw, nh)) {
            self.blocks[id].north = Some(o);
            self.blocks[o].south = Some(id);
        }
        if let Some(o) = self.find(Area::new(area.x - nw, area.y + nh, nw, nh)) {
            self.blocks[id].nw = Some(o);
            self.blocks[o].se = Some(id);
        }
        if let Some(o) = self.find(Area::new(area.x - nw, area.y, nw, nh)) {
            self.blocks[id].west = Some(o);
            self.blocks[o].east = Some(id);
        }
        if let Some(o) = self.find(Area::new(area.x - nw, area.y - nh, nw, nh)) {
            self.blocks[id].sw = Some(o);
            self.blocks[o].ne = Some(id);
        }
        if let Some(o) = self.find(Area::new(area.x, area.y - nh, nw, nh)) {
            self.blocks[id].south = Some(o);
            self.blocks[o].north = Some(id);
        }
        if let Some(o) = self.find(Area::new(area.x + nw, area.y - nh, nw, nh)) {
            self.blocks[id].se = Some(o);
            self.blocks[o].nw = Some(id);
        }
        if let Some(o) = self.find(Area::new(area.x + nw, area.y, nw, nh)) {
            self.blocks[id].east = Some(o);
            self.blocks[o].west = Some(id);
        }
    }

    fn unlink_neighbors(&mut self, id: BlockId) {
        if let Some(o) = self.blocks[id].ne.take() {
            self.blocks[o].sw = None;
        }
        if let Some(o) = self.blocks[id].north.take() {
            self.blocks[o].south = None;
        }
        if let Some(o) = self.blocks[id].nw.take() {
            self.blocks[o].se = None;
        }
        if let Some(o) = self.blocks[id].west.take() {
            self.blocks[o].east = None;
        }
        if let Some(o) = self.blocks[id].sw.take() {
            self.blocks[o].ne = None;
        }
        if let Some(o) = self.blocks[id].south.take() {
            self.blocks[o].north = None;
        }
        if let Some(o) = self.blocks[id].se.take() {
            self.blocks[o].nw = None;
        }
        if let Some(o) = self.blocks[id].east.take() {
            self.blocks[o].west = None;
        }
    }

    /// Ensures all eight neighbors of `id` are allocated. Returns `true`
    /// if any were created. Skips blocks with no live cells unless
    /// `force` is set (spec.md §4.5.4 randomize forces it for every block
    /// up front so evolution has somewhere to write adjacency).
    fn expand_halo(&mut self, id: BlockId, force: bool) -> bool {
        let (area, alive, links) = {
            let b = &self.blocks[id];
            if !b.active {
                return false;
            }
            (
                b.area,
                b.alive,
                [b.ne, b.north, b.nw, b.west, b.sw, b.south, b.se, b.east],
            )
        };

        if links.iter().all(Option::is_some) {
            return false;
        }
        if alive == 0 && !force {
            return false;
        }

        const DELTAS: [(i32, i32); 8] = [
            (1, 1),
            (0, 1),
            (-1, 1),
            (-1, 0),
            (-1, -1),
            (0, -1),
            (1, -1),
            (1, 0),
        ];

        let mut created = false;
        for (link, (dx, dy)) in links.iter().zip(DELTAS.iter()) {
            if link.is_none() {
                let new_area = Area::new(
                    area.x + dx * self.node_w,
                    area.y + dy * self.node_h,
                    self.node_w,
                    self.node_h,
                );
                self.register_block(new_area);
                created = true;
            }
        }
        created
    }

    /// Resolves the eight Moore-neighbor targets of `local` (0-based
    /// within `block`'s area), returning `(block, local-coord-in-that-
    /// block)` pairs. The interior/border branch of spec.md §4.4.
    fn moore_targets(&self, block: &Block, local: Coord) -> Vec<(BlockId, Coord)> {
        let w = block.area.w;
        let h = block.area.h;
        let interior = local.0 > 1 && local.0 < w - 2 && local.1 > 1 && local.1 < h - 2;

        let mut targets = Vec::with_capacity(8);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let x = local.0 + dx;
                let y = local.1 + dy;

                if interior {
                    targets.push((block.id, (x, y)));
                    continue;
                }

                let ok_x = x >= 0 && x < w;
                let ok_y = y >= 0 && y < h;
                let wrapped = (x.rem_euclid(w), y.rem_euclid(h));

                let target = if ok_x && ok_y {
                    Some(block.id)
                } else if ok_x {
                    if y < 0 {
                        block.south
                    } else {
                        block.north
                    }
                } else if ok_y {
                    if x < 0 {
                        block.west
                    } else {
                        block.east
                    }
                } else if x < 0 && y < 0 {
                    block.sw
                } else if x < 0 {
                    block.nw
                } else if y < 0 {
                    block.se
                } else {
                    block.ne
                };

                match target {
                    Some(id) => targets.push((id, wrapped)),
                    None => log::warn!(
                        "could not resolve adjacency neighbor at local ({}, {}) from block {}",
                        x,
                        y,
                        block.id
                    ),
                }
            }
        }
        targets
    }

    /// Bumps the *current* adjacency bucket (used only by [`Self::paint`],
    /// which always runs under the exclusive world lock, so no atomics
    /// are needed here; a plain read-modify-write is safe).
    fn bump_current(&mut self, block_id: BlockId, local: Coord, delta: i32) {
        debug_assert!(delta == 1 || delta == -1);
        let targets = self.moore_targets(&self.blocks[block_id], local);
        for (tid, tcoord) in targets {
            let w = self.blocks[tid].area.w;
            let idx = self.blocks[tid].start + local_flat_index(w, tcoord);
            if delta > 0 {
                self.adjacency[idx].fetch_add(1, Relaxed);
            } else {
                self.adjacency[idx].fetch_sub(1, Relaxed);
            }
        }
    }

    /// Bumps the *next* adjacency bucket. Callable through a shared `&self`,
    /// which is what lets per-block evolution run without holding the
    /// world lock (spec.md §5): every write lands on a disjoint atomic.
    fn bump_next(&self, block_id: BlockId, local: Coord, delta: i32) {
        debug_assert!(delta == 1 || delta == -1);
        for (tid, tcoord) in self.moore_targets(&self.blocks[block_id], local) {
            let w = self.blocks[tid].area.w;
            let idx = self.blocks[tid].start + local_flat_index(w, tcoord);
            if delta > 0 {
                self.next_adjacency[idx].fetch_add(1, Relaxed);
            } else {
                self.next_adjacency[idx].fetch_sub(1, Relaxed);
            }
        }
    }

    /// Generates one tile job per active block, for the worker pool to
    /// dispatch (spec.md §4.6). An empty result means the caller should
    /// enqueue a single closure job instead.
    pub fn schedule(&self) -> Vec<BlockId> {
        self.blocks.iter().filter(|b| b.active).map(|b| b.id).collect()
    }

    /// Evolves a single block's cells into `next_state`/`next_adjacency`.
    /// Safe to call concurrently for distinct `block_id`s from a shared
    /// `&self` (spec.md §4.5.1, §5).
    pub fn evolve_block(&self, block_id: BlockId) {
        let block = &self.blocks[block_id];

        if block.changed == 0 {
            // Still-life short-circuit: copy forward, but still reassert
            // next-generation adjacency for every live cell so neighbor
            // blocks' counts don't go stale (spec.md §4.5.1).
            block.next_alive.store(block.alive, Relaxed);
            for i in block.start..block.end {
                let s = u8_to_state(self.state[i].load(Relaxed));
                self.next_state[i].store(state_to_u8(s), Relaxed);
                if s.is_alive() {
                    let local = local_coord(block.area.w, i - block.start);
                    self.bump_next(block_id, local, 1);
                }
            }
            return;
        }

        let mut next_alive = 0u32;
        for i in block.start..block.end {
            let s = u8_to_state(self.state[i].load(Relaxed));
            let n = self.adjacency[i].load(Relaxed) as u8;

            let next = match s {
                Alive if self.ruleset.survives(n) => Alive,
                Dead if self.ruleset.is_born(n) => Alive,
                _ => Dead,
            };

            self.next_state[i].store(state_to_u8(next), Relaxed);
            if next.is_alive() {
                next_alive += 1;
                let local = local_coord(block.area.w, i - block.start);
                self.bump_next(block_id, local, 1);
            }
        }
        block.next_alive.store(next_alive, Relaxed);
    }

    /// The global step: swaps buffers, updates ages, reclaims dead
    /// blocks, recomputes the live area, and expands halos (spec.md
    /// §4.5.2). Must run with exclusive access (the world lock's write
    /// side) once every per-block evolve has completed.
    pub fn step(&mut self) -> u32 {
        std::mem::swap(&mut self.state, &mut self.next_state);

        for block in self.blocks.iter_mut() {
            if !block.active {
                continue;
            }
            let mut changed = 0u32;
            for i in block.start..block.end {
                if self.adjacency[i].load(Relaxed) != self.next_adjacency[i].load(Relaxed) {
                    changed += 1;
                }
            }
            block.changed = changed;
        }

        std::mem::swap(&mut self.adjacency, &mut self.next_adjacency);
        for a in self.next_adjacency.iter() {
            a.store(0, Relaxed);
        }

        self.update_cells_age();

        let mut alive_total = 0u32;
        let ids: Vec<BlockId> = self.blocks.iter().filter(|b| b.active).map(|b| b.id).collect();
        for id in ids {
            // `neighbors` is computed with only a shared borrow of `self` live
            // (the closure captures the whole of `self`, not just
            // `self.adjacency`, under this crate's edition); the mutable
            // write to `self.blocks[id]` happens afterwards, once that
            // borrow has ended.
            let (start, end) = {
                let b = &self.blocks[id];
                (b.start, b.end)
            };
            let neighbors: u32 = (start..end).map(|i| self.adjacency[i].load(Relaxed)).sum();
            let alive = self.blocks[id].next_alive.swap(0, Relaxed);
            self.blocks[id].alive = alive;

            alive_total += alive;
            if alive == 0 && neighbors == 0 {
                self.destroy_block(id);
            }
        }

        self.update_live_area();

        let ids: Vec<BlockId> = self.blocks.iter().map(|b| b.id).collect();
        for id in ids {
            self.expand_halo(id, false);
        }

        self.generation += 1;
        alive_total
    }

    fn update_cells_age(&mut self) {
        for i in 0..self.age.len() {
            if u8_to_state(self.state[i].load(Relaxed)).is_alive() {
                self.age[i] += 1;
            } else {
                self.age[i] = 0;
            }
        }
    }

    fn update_live_area(&mut self) {
        let mut area: Option<AreaF> = None;
        for block in &self.blocks {
            if !block.active || block.alive == 0 {
                continue;
            }
            match &mut area {
                None => {
                    area = Some(AreaF::new(
                        block.area.x as f32,
                        block.area.y as f32,
                        block.area.w as f32,
                        block.area.h as f32,
                    ));
                }
                Some(area) => {
                    area.grow_to_contain((block.area.left(), block.area.bottom()));
                    area.grow_to_contain((block.area.right(), block.area.top()));
                }
            }
        }
        self.live_area = area.unwrap_or_else(|| {
            AreaF::new(self.total_area.x as f32, self.total_area.y as f32, 0.0, 0.0)
        });
    }

    /// Paints `brush` centered at `coord`, creating and recycling blocks
    /// as needed (spec.md §4.5.3). Must only be called while the
    /// simulation is stopped.
    pub fn paint(&mut self, brush: &Brush, coord: Coord) -> u32 {
        let (bw, bh) = brush.size();
        let off_x = bw as i32 / 2;
        let off_y = bh as i32 / 2;

        for y in 0..bh as i32 {
            for x in 0..bw as i32 {
                let s = brush.state_at(x, y);
                let c = (coord.0 - off_x + x, coord.1 - off_y + y);

                let mut id = self.find_block(c);

                if id.is_none() {
                    if self.active_block_count == 0 {
                        let total_area = self.total_area;
                        self.allocate(total_area);
                    }

                    let reference = match self.blocks.iter().find(|b| b.active).map(|b| b.area) {
                        Some(a) => a,
                        None => {
                            log::warn!("no valid block to register cell {:?} while painting", c);
                            continue;
                        }
                    };

                    let threshold = 0.01 * self.node_w.max(self.node_h) as f32;
                    let dx =
                        (((c.0 - reference.x) as f32 + threshold) / reference.w as f32).round() as i32;
                    let dy =
                        (((c.1 - reference.y) as f32 + threshold) / reference.h as f32).round() as i32;
                    let area = Area::new(
                        reference.x + dx * reference.w,
                        reference.y + dy * reference.h,
                        reference.w,
                        reference.h,
                    );

                    if !area.contains(c) {
                        log::warn!("could not determine block area containing cell at {:?}", c);
                        continue;
                    }

                    id = Some(self.find(area).unwrap_or_else(|| self.register_block(area)));
                }

                let id = match id {
                    Some(i) => i,
                    None => continue,
                };
                self.expand_halo(id, true);

                let (local, idx) = {
                    let b = &self.blocks[id];
                    let local = (c.0 - b.area.x, c.1 - b.area.y);
                    (local, b.start + local_flat_index(b.area.w, local))
                };

                let current = u8_to_state(self.state[idx].load(Relaxed));
                if current != s {
                    self.state[idx].store(state_to_u8(s), Relaxed);
                    self.age[idx] = if s.is_alive() { 1 } else { 0 };
                    self.bump_current(id, local, if s.is_alive() { 1 } else { -1 });

                    let b = &mut self.blocks[id];
                    if s.is_alive() {
                        b.alive += 1;
                    } else {
                        b.alive -= 1;
                    }
                    b.changed += 1;
                }
            }
        }

        let mut alive_total = 0u32;
        let ids: Vec<BlockId> = self.blocks.iter().filter(|b| b.active).map(|b| b.id).collect();
        for id in ids {
            let (alive, neighbors) = {
                let b = &self.blocks[id];
                let neighbors: u32 = (b.start..b.end).map(|i| self.adjacency[i].load(Relaxed)).sum();
                (b.alive, neighbors)
            };
            alive_total += alive;
            if alive == 0 && neighbors == 0 {
                self.destroy_block(id);
            }
        }

        self.update_live_area();

        let ids: Vec<BlockId> = self.blocks.iter().map(|b| b.id).collect();
        for id in ids {
            self.expand_halo(id, false);
        }

        alive_total
    }

    fn make_random_block<R: rand::Rng>(&mut self, id: BlockId, rng: &mut R, dead_prob: f64) {
        let (start, end, w) = {
            let b = &self.blocks[id];
            (b.start, b.end, b.area.w)
        };

        let mut next_alive = 0u32;
        for i in start..end {
            let prob: f64 = rng.gen_range(0.0..1.0);
            let alive = prob >= dead_prob;
            self.next_state[i].store(state_to_u8(if alive { Alive } else { Dead }), Relaxed);
            self.age[i] = 0;
            if alive {
                next_alive += 1;
            }
        }
        self.blocks[id].next_alive.store(next_alive, Relaxed);
        self.blocks[id].changed = 0;

        for i in start..end {
            if u8_to_state(self.next_state[i].load(Relaxed)).is_alive() {
                let local = local_coord(w, i - start);
                self.bump_next(id, local, 1);
            }
        }
    }

    /// Randomizes every currently active block using `dead_prob` as the
    /// probability a cell stays `Dead` (spec.md §4.5.4). Returns the new
    /// live-cell count.
    pub fn randomize<R: rand::Rng>(&mut self, rng: &mut R, dead_prob: f64) -> u32 {
        if self.active_block_count == 0 {
            let total_area = self.total_area;
            self.allocate(total_area);
        }

        let ids: Vec<BlockId> = self.blocks.iter().filter(|b| b.active).map(|b| b.id).collect();
        for &id in &ids {
            self.expand_halo(id, true);
        }
        for &id in &ids {
            self.make_random_block(id, rng, dead_prob);
        }

        // `step` is reused here only to finalize the double-buffered
        // state/adjacency arrays it just wrote into `next_*`; unlike a real
        // generation it must not advance the generation counter. Grounded in
        // `Colony::generate` (original_source/src/Colony.cc), which resets
        // `m_generation` to 0 around a randomize rather than letting it
        // advance.
        let live = self.step();
        self.generation = 0;
        live
    }

    /// Replaces the active rule set. Gated by the scheduler to only run
    /// while stopped (spec.md §4.7, §7).
    pub fn set_ruleset(&mut self, ruleset: RuleSet) {
        self.ruleset = ruleset;
    }

    /// The currently active rule set.
    pub fn ruleset(&self) -> &RuleSet {
        &self.ruleset
    }

    /// The generation counter, incremented once per completed [`Self::step`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The bounding box of all blocks known to contain at least one live
    /// cell (block granularity, a conservative superset of the exact
    /// live-cell bounding box).
    pub fn live_area(&self) -> AreaF {
        self.live_area
    }

    /// The total area ever covered by [`Self::allocate_to`]/initial
    /// allocation.
    pub fn total_area(&self) -> Area {
        self.total_area
    }

    /// Sum of `alive` over every active block.
    pub fn live_count(&self) -> u32 {
        self.blocks.iter().filter(|b| b.active).map(|b| b.alive).sum()
    }

    /// The state and age of the cell at `coord`; rejects coordinates
    /// outside [`Self::live_area`] in O(1) (spec.md §4.5.5).
    pub fn cell_status(&self, coord: Coord) -> (State, i32) {
        if !self.live_area.contains(coord) {
            return (Dead, -1);
        }
        match self.find_block(coord) {
            None => (Dead, -1),
            Some(id) => {
                let b = &self.blocks[id];
                let idx = b.start + local_flat_index(b.area.w, (coord.0 - b.area.x, coord.1 - b.area.y));
                (u8_to_state(self.state[idx].load(Relaxed)), self.age[idx] as i32)
            }
        }
    }

    /// Fills a `(state, age)` slab the size of `area`, copying from every
    /// intersecting active block; unrepresented cells are `Dead` with age
    /// `0` (spec.md §4.5.5).
    pub fn fetch_cells(&self, area: Area) -> Vec<(State, u32)> {
        let mut out = vec![(Dead, 0u32); (area.w.max(0) as usize) * (area.h.max(0) as usize)];

        for block in self.blocks.iter().filter(|b| b.active) {
            let left = block.area.left().max(area.left());
            let right = block.area.right().min(area.right());
            let bottom = block.area.bottom().max(area.bottom());
            let top = block.area.top().min(area.top());
            if left >= right || bottom >= top {
                continue;
            }

            for y in bottom..top {
                for x in left..right {
                    let bidx =
                        block.start + local_flat_index(block.area.w, (x - block.area.x, y - block.area.y));
                    let oidx = ((y - area.y) * area.w + (x - area.x)) as usize;
                    out[oidx] = (u8_to_state(self.state[bidx].load(Relaxed)), self.age[bidx]);
                }
            }
        }

        out
    }

    /// Iterates every currently allocated block (active or recycled),
    /// for diagnostics and tests.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }
}

fn state_to_u8(s: State) -> u8 {
    if s.is_alive() {
        1
    } else {
        0
    }
}

fn u8_to_state(v: u8) -> State {
    if v != 0 {
        Alive
    } else {
        Dead
    }
}

fn local_flat_index(w: i32, local: Coord) -> usize {
    (local.1 * w + local.0) as usize
}

fn local_coord(w: i32, flat: usize) -> Coord {
    let flat = flat as i32;
    (flat % w, flat / w)
}

/// Szudzik-style pairing function with a sign fold, keyed on a block's
/// center coordinate, guaranteeing at most one block per position
/// (spec.md §3, "center-hash index"). Grounded in the anonymous
/// `hashCoordinate` helper in `CellsBlocks.cc`.
fn hash_coordinate(coord: Coord) -> i64 {
    let (x, y) = coord;
    let a: i64 = if x >= 0 { 2 * x as i64 } else { -2 * x as i64 - 1 };
    let b: i64 = if y >= 0 { 2 * y as i64 } else { -2 * y as i64 - 1 };
    let c: i64 = if a >= b { a * a + a + b } else { a + b * b } / 2;

    if (x < 0 && y < 0) || (x >= 0 && y >= 0) {
        c
    } else {
        -c - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_coordinate_is_injective_over_a_small_grid() -> Result<(), Error> {
        let mut seen = std::collections::HashSet::new();
        for x in -8..8 {
            for y in -8..8 {
                assert!(seen.insert(hash_coordinate((x, y))), "collision at ({}, {})", x, y);
            }
        }
        Ok(())
    }

    #[test]
    fn new_rejects_tiny_blocks() -> Result<(), Error> {
        assert!(BlockStore::new(1, 8).is_err());
        assert!(BlockStore::new(8, 1).is_err());
        assert!(BlockStore::new(8, 8).is_ok());
        Ok(())
    }

    #[test]
    fn allocate_to_rounds_up_to_block_multiples() -> Result<(), Error> {
        let mut store = BlockStore::new(8, 8)?;
        let area = store.allocate_to(10, 3)?;
        assert_eq!(area.w % 8, 0);
        assert_eq!(area.h % 8, 0);
        assert!(area.w >= 10);
        assert!(area.h >= 3);
        Ok(())
    }

    #[test]
    fn allocate_to_links_all_interior_blocks_full_halo() -> Result<(), Error> {
        let mut store = BlockStore::new(8, 8)?;
        store.allocate_to(24, 24)?;
        let interior = store
            .blocks
            .iter()
            .find(|b| b.area.center() == (0, 0))
            .expect("a block centered at the origin");
        assert!(interior.has_full_halo());
        Ok(())
    }

    #[test]
    fn paint_then_inverse_paint_is_a_no_op() -> Result<(), Error> {
        let mut store = BlockStore::new(8, 8)?;
        store.allocate_to(8, 8)?;

        let brush = Brush::monotonic(3, 3, Alive);
        store.paint(&brush, (0, 0));
        assert!(store.live_count() > 0);

        let inverse = brush.inverse();
        store.paint(&inverse, (0, 0));
        assert_eq!(store.live_count(), 0);
        Ok(())
    }

    #[test]
    fn paint_outside_existing_blocks_creates_new_ones() -> Result<(), Error> {
        let mut store = BlockStore::new(8, 8)?;
        store.allocate_to(8, 8)?;
        let brush = Brush::monotonic(1, 1, Alive);
        store.paint(&brush, (1000, 1000));
        assert_eq!(store.find_block((1000, 1000)), Some(store.find_block((1000, 1000)).unwrap()));
        assert_eq!(store.cell_status((1000, 1000)).0, Alive);
        Ok(())
    }

    #[test]
    fn blinker_oscillates_with_period_two() -> Result<(), Error> {
        let mut store = BlockStore::new(16, 16)?;
        store.allocate_to(16, 16)?;

        let brush = Brush::from_pattern(3, 1, vec![vec![Alive, Alive, Alive]]);
        store.paint(&brush, (0, 0));

        for tile in store.schedule() {
            store.evolve_block(tile);
        }
        store.step();
        assert_eq!(store.cell_status((0, 1)).0, Alive);
        assert_eq!(store.cell_status((-1, 0)).0, Dead);

        for tile in store.schedule() {
            store.evolve_block(tile);
        }
        store.step();
        assert_eq!(store.cell_status((-1, 0)).0, Alive);
        assert_eq!(store.cell_status((0, 1)).0, Dead);
        Ok(())
    }

    #[test]
    fn still_life_keeps_changed_at_zero() -> Result<(), Error> {
        let mut store = BlockStore::new(16, 16)?;
        store.allocate_to(16, 16)?;

        let brush = Brush::from_pattern(2, 2, vec![vec![Alive, Alive], vec![Alive, Alive]]);
        store.paint(&brush, (0, 0));

        for _ in 0..3 {
            for tile in store.schedule() {
                store.evolve_block(tile);
            }
            store.step();
        }

        let id = store.find_block((0, 0)).unwrap();
        assert_eq!(store.blocks[id].changed, 0);
        assert_eq!(store.live_count(), 4);
        Ok(())
    }

    #[test]
    fn recycling_reuses_freed_block_ids() -> Result<(), Error> {
        let mut store = BlockStore::new(8, 8)?;
        store.allocate_to(8, 8)?;

        let brush = Brush::monotonic(1, 1, Alive);
        store.paint(&brush, (0, 0));
        let id = store.find_block((0, 0)).unwrap();

        let inverse = brush.inverse();
        store.paint(&inverse, (0, 0));
        for _ in 0..2 {
            for tile in store.schedule() {
                store.evolve_block(tile);
            }
            store.step();
        }

        assert!(store.free_blocks.contains(&id) || !store.blocks[id].active);

        store.paint(&brush, (0, 0));
        assert_eq!(store.find_block((0, 0)).unwrap(), id);
        Ok(())
    }
}
