//! Engine configuration (§6 AMBIENT).
//!
//! Grounded in `rlifesrc_lib::config::Config`'s shape: a `Default`-backed
//! struct, consuming `set_*` builder methods, and a single fallible
//! constructor (here [`Config::engine`], there `Config::world`) that
//! validates before building, matching spec.md §7's "fail construction
//! with a descriptive error" requirement for configuration errors.

use crate::engine::Engine;
use crate::error::Error;

/// Configuration for a new [`Engine`]. See spec.md §6 for the defaults.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Block width, in cells. Must be at least 2.
    pub block_width: u32,
    /// Block height, in cells. Must be at least 2.
    pub block_height: u32,
    /// Number of worker threads in the scheduler's pool.
    pub worker_count: usize,
    /// Probability that a cell stays `Dead` when [`Engine::randomize`] is
    /// called.
    pub dead_probability: f64,
}

impl Config {
    /// Creates a configuration with the given block dimensions and the
    /// remaining fields at their defaults.
    pub fn new(block_width: u32, block_height: u32) -> Self {
        Config {
            block_width,
            block_height,
            ..Config::default()
        }
    }

    /// Sets the block dimensions.
    pub fn set_block_dims(mut self, width: u32, height: u32) -> Self {
        self.block_width = width;
        self.block_height = height;
        self
    }

    /// Sets the worker pool size.
    pub fn set_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Sets the dead-cell probability used by [`Engine::randomize`].
    pub fn set_dead_probability(mut self, dead_probability: f64) -> Self {
        self.dead_probability = dead_probability;
        self
    }

    /// Validates this configuration and builds the [`Engine`] it describes
    /// (spec.md §6, `new_engine`).
    pub fn engine(&self) -> Result<Engine, Error> {
        Engine::new(self.block_width, self.block_height, self.worker_count, self.dead_probability)
    }
}

/// Block dims `16x16`, 3 workers, `0.7` dead probability (spec.md §6).
impl Default for Config {
    fn default() -> Self {
        Config {
            block_width: 16,
            block_height: 16,
            worker_count: 3,
            dead_probability: 0.7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_constants() -> Result<(), Error> {
        let c = Config::default();
        assert_eq!(c.block_width, 16);
        assert_eq!(c.block_height, 16);
        assert_eq!(c.worker_count, 3);
        assert_eq!(c.dead_probability, 0.7);
        Ok(())
    }

    #[test]
    fn engine_rejects_invalid_block_dims() -> Result<(), Error> {
        let c = Config::new(1, 1);
        assert!(c.engine().is_err());
        Ok(())
    }

    #[test]
    fn engine_builds_with_valid_dims() -> Result<(), Error> {
        let c = Config::default();
        c.engine()?;
        Ok(())
    }
}
