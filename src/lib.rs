/*!
__cellulator__ is the core simulation engine of an infinite, sparse,
parallel cellular-automaton system: a conceptually unbounded grid of cells
evolving in lock-step generations under a configurable birth/survival rule
set (a generalization of Conway's Game of Life).

Its distinguishing design feature is a block-partitioned sparse world with
a cached neighbor-adjacency count, an on-demand boundary halo for block
expansion, and a parallel per-block evolve step driven by a worker pool.
Windowing, rendering, colorization and pattern-file formats beyond the
minimal brush contract are external concerns; this crate is the headless
engine underneath them. See `SPEC_FULL.md` in the repository root for the
full specification this crate implements.

# Example

```
use cellulator::{Brush, Config, State};

let engine = Config::default().engine().unwrap();
engine.allocate_to(16, 16).unwrap();

// A blinker: three live cells in a row.
let blinker = Brush::from_pattern(3, 1, vec![vec![State::Alive; 3]]);
engine.paint(&blinker, 0, 0);
assert_eq!(engine.live_count(), 3);

engine.step();
std::thread::sleep(std::time::Duration::from_millis(50));
assert_eq!(engine.generation(), 1);
assert_eq!(engine.live_count(), 3);
```
*/

mod block;
mod brush;
mod cells;
mod config;
mod engine;
mod error;
mod geometry;
mod pool;
mod rules;
mod scheduler;
mod tile;

pub use brush::Brush;
pub use cells::{Age, Alive, Dead, State};
pub use config::Config;
pub use engine::Engine;
pub use error::Error;
pub use geometry::{Area, AreaF, Coord};
pub use rules::RuleSet;
pub use scheduler::SimState;
