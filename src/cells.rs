//! The state of a single cell.

use rand::{
    distributions::{Distribution, Standard},
    Rng,
};

pub use State::{Alive, Dead};

/// The state of a cell.
///
/// The historical four-state model (`Newborn`/`Alive`/`Dying`/`Dead`) found
/// in some legacy implementations is not reproduced here; see the open
/// question in `spec.md` §9. This crate only ever has two states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum State {
    /// No cell.
    Dead,
    /// A living cell.
    Alive,
}

impl State {
    /// `true` for [`State::Alive`].
    pub fn is_alive(self) -> bool {
        matches!(self, Alive)
    }
}

impl Default for State {
    fn default() -> Self {
        Dead
    }
}

/// Randomly chooses between `Alive` and `Dead` with equal probability.
///
/// Only used by tests; [`crate::Engine::randomize`] uses the configured
/// dead-cell probability instead of a uniform coin flip.
impl Distribution<State> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> State {
        if rng.gen_bool(0.5) {
            Alive
        } else {
            Dead
        }
    }
}

/// The age of a cell: the number of consecutive generations it has been
/// `Alive`. Meaningless for `Dead` cells, which this crate always stores
/// as `0` (see spec.md §3, "Age").
pub type Age = u32;
