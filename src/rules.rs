//! The birth/survival rule set (C1).
//!
//! Grounded in `original_source/src/CellEvolver.hh`/`.cc`: `m_born` and
//! `m_survive` become two `HashSet<u8>`s, `isBorn`/`survives` become
//! `is_born`/`survives`, and `addBornOption`/`addSurvivingOption` become
//! `add_born`/`add_survive`, keeping their "was this newly inserted" return
//! value.

use std::collections::HashSet;

/// Birth/survival counts for a generalized Game-of-Life rule (spec.md §3).
///
/// `n` is accepted outside `0..=8` without panicking, since a rule set is
/// never the thing that produces an out-of-range neighbor count; the
/// adjacency engine is, and it never does (invariant 3).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleSet {
    born: HashSet<u8>,
    survive: HashSet<u8>,
}

impl RuleSet {
    /// Creates a rule set from explicit born/survive counts.
    pub fn new(born: impl IntoIterator<Item = u8>, survive: impl IntoIterator<Item = u8>) -> Self {
        RuleSet {
            born: born.into_iter().collect(),
            survive: survive.into_iter().collect(),
        }
    }

    /// Clears both the born and survive sets.
    pub fn clear(&mut self) {
        self.born.clear();
        self.survive.clear();
    }

    /// Registers `n` as a valid neighbor count for a dead cell to be born.
    /// Returns `true` if `n` was not already registered.
    pub fn add_born(&mut self, n: u8) -> bool {
        self.born.insert(n)
    }

    /// Registers `n` as a valid neighbor count for a live cell to survive.
    /// Returns `true` if `n` was not already registered.
    pub fn add_survive(&mut self, n: u8) -> bool {
        self.survive.insert(n)
    }

    /// `true` if a dead cell with `n` live neighbors should become alive.
    pub fn is_born(&self, n: u8) -> bool {
        self.born.contains(&n)
    }

    /// `true` if a live cell with `n` live neighbors should stay alive.
    pub fn survives(&self, n: u8) -> bool {
        self.survive.contains(&n)
    }
}

/// `born={3}, survive={2,3}`: Conway's Game of Life (spec.md §3).
impl Default for RuleSet {
    fn default() -> Self {
        RuleSet::new([3], [2, 3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_b3s23() -> Result<(), crate::Error> {
        let r = RuleSet::default();
        assert!(r.is_born(3));
        assert!(!r.is_born(2));
        assert!(r.survives(2));
        assert!(r.survives(3));
        assert!(!r.survives(4));
        Ok(())
    }

    #[test]
    fn add_returns_whether_new() -> Result<(), crate::Error> {
        let mut r = RuleSet::new([], []);
        assert!(r.add_born(3));
        assert!(!r.add_born(3));
        assert!(r.add_survive(2));
        assert!(!r.add_survive(2));
        Ok(())
    }

    #[test]
    fn out_of_range_counts_are_simply_false() -> Result<(), crate::Error> {
        let r = RuleSet::default();
        assert!(!r.is_born(20));
        assert!(!r.survives(255));
        Ok(())
    }

    #[test]
    fn clear_empties_both_sets() -> Result<(), crate::Error> {
        let mut r = RuleSet::default();
        r.clear();
        for n in 0..=8 {
            assert!(!r.is_born(n));
            assert!(!r.survives(n));
        }
        Ok(())
    }
}
