//! Error types for tiger-common.

use thiserror::Error;

/// Common error type for Tiger operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of buffer at {offset:#x}: needed {needed} bytes but only {available} available")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A relative offset pointed outside of the buffer.
    #[error("relative offset {relative:#x} from {base:#x} is out of bounds")]
    OffsetOutOfBounds { base: usize, relative: u64 },
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
