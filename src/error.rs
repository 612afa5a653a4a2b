//! All kinds of errors in this crate.

use thiserror::Error;

/// All kinds of errors in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned by [`crate::Config::engine`] when the requested block
    /// dimensions are not at least `2x2`.
    #[error("invalid block dimensions {0}x{1}, both must be >= 2")]
    InvalidBlockDims(u32, u32),

    /// Returned by [`crate::Engine::allocate_to`] when the requested
    /// minimum area is empty.
    #[error("invalid allocation area {0}x{1}, both must be >= 1")]
    InvalidArea(u32, u32),

    /// Returned while loading a brush from a file that cannot be opened.
    #[error("could not read brush file {path:?}: {source}")]
    BrushFile {
        /// The path that failed to open.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Returned when a brush file's header line is missing or does not
    /// match the `WIDTHxHEIGHT` contract of §4.2.
    #[error("invalid brush header {0:?}, expected WIDTHxHEIGHT")]
    BrushHeader(String),
}
