//! Error types for payload decoding.

use thiserror::Error;

/// Errors raised by payload decoders.
///
/// All of them are local to the entry being decoded.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error, typically a read past the end of the payload.
    #[error("{0}")]
    Common(#[from] tiger_common::Error),

    /// The payload length does not fit the record layout.
    #[error("unexpected payload size: expected {expected} bytes, got {actual}")]
    UnexpectedPayloadSize { expected: usize, actual: usize },

    /// A length or offset inside the payload is inconsistent with its size.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Result type for payload decoding.
pub type Result<T> = std::result::Result<T, Error>;
