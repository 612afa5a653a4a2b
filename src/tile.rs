//! A single unit of scheduled work: evolve one block, or signal that a
//! schedule was empty (C6).
//!
//! Grounded in `original_source/src/ColonyTile.hh`/`.hxx`: the original
//! wraps a `blockID` plus a raw pointer to the owning `CellsBlocks`, and its
//! `compute()` override just calls `m_data->evolve(m_blockID)`. This crate
//! has no virtual `compute()` to override; the pool (`crate::pool`) calls
//! [`BlockStore::evolve_block`](crate::block::BlockStore::evolve_block)
//! directly for a [`Tile::Block`] and does nothing for a [`Tile::Closure`].
//! The "no work, signals an empty schedule" sentinel is the same shape as
//! the original's default-constructed tile (`m_blockID` left unset).

use crate::block::BlockId;

/// One work unit dispatched to the worker pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    /// Evolve the block with this id.
    Block(BlockId),
    /// Sentinel: the schedule that produced this tile was empty (spec.md
    /// §4.6, §4.7 step 2).
    Closure,
}

impl Tile {
    /// `true` for [`Tile::Closure`].
    pub fn is_closure(self) -> bool {
        matches!(self, Tile::Closure)
    }
}
