//! Common utilities for Tiger.
//!
//! This crate provides the foundational pieces shared by the Tiger crates:
//!
//! - [`BinaryReader`] - Zero-copy little-endian reading from byte slices
//! - [`hash`] - SHA-1 digests for table/block integrity and FNV-1a string hashes

mod error;
mod reader;

pub mod hash;

pub use error::{Error, Result};
pub use reader::BinaryReader;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
