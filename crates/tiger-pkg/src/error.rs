//! Error types for the package crate.

use thiserror::Error;

use crate::crypto::CapabilityError;

/// Errors that can occur when reading packages.
///
/// Header and table errors make the whole package unusable. Everything from
/// [`Error::BlockHashMismatch`] down is local to a single extraction.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] tiger_common::Error),

    /// The fixed header is truncated or inconsistent.
    #[error("malformed package header: {0}")]
    MalformedHeader(String),

    /// The entry table is truncated or references missing blocks.
    #[error("malformed entry table: {0}")]
    MalformedEntryTable(String),

    /// The block table is truncated or points outside the package.
    #[error("malformed block table: {0}")]
    MalformedBlockTable(String),

    /// The entry table digest does not match the header.
    #[error("entry table hash mismatch: expected {expected}, got {actual}")]
    EntryTableHashMismatch { expected: String, actual: String },

    /// A decoded block does not match its stored digest (strict mode only).
    #[error("block {block} content hash mismatch")]
    BlockHashMismatch { block: usize },

    /// A block could not be decrypted or its tag did not verify.
    #[error("failed to decrypt block {block}: {source}")]
    DecryptionFailed {
        block: usize,
        #[source]
        source: CapabilityError,
    },

    /// A block could not be decompressed.
    #[error("failed to decompress block {block}: {source}")]
    DecompressionFailed {
        block: usize,
        #[source]
        source: CapabilityError,
    },

    /// No package with this id could be supplied.
    #[error("unknown package {0:#06x}")]
    UnknownPackage(u16),

    /// A reference points past the end of a package's entry table.
    #[error("entry index {index} out of range for package {package_id:#06x} ({count} entries)")]
    EntryIndexOutOfRange {
        package_id: u16,
        index: usize,
        count: usize,
    },

    /// Entry lookup by local index failed.
    #[error("entry not found: {0}")]
    EntryNotFound(usize),

    /// An entry's data runs past the block table or its decoded blocks.
    #[error("entry {entry} out of bounds: {reason}")]
    EntryOutOfBounds { entry: usize, reason: String },
}

/// Result type for package operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Format a digest for error messages.
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
