//! Tiger - Destiny package decoding library.
//!
//! This crate provides a unified interface to the Tiger crates.
//!
//! # Crates
//!
//! - [`tiger_common`] - Common utilities (binary reading, SHA-1, FNV-1a)
//! - [`tiger_pkg`] - Package reading (header, entry/block tables, AES-GCM, references)
//! - [`tiger_payload`] - Typed payload records and the entry type dispatcher
//!
//! # Example
//!
//! ```no_run
//! use tiger::prelude::*;
//!
//! let package = Package::open("w64_ui_startup_unp1_0.pkg")?;
//! let pipeline = BlockPipeline::new().with_decompressor(ZstdDecompressor);
//! let dispatcher = Dispatcher::new();
//!
//! for (index, _) in package.entries_of_kind(kind::TEXTURE_HEADER, kind::SUBTYPE_TEXTURE) {
//!     if let TypedRecord::Texture(header) = tiger::decode_entry(&pipeline, &dispatcher, &package, index)? {
//!         println!("{}: {}x{} format {}", index, header.width, header.height, header.dxgi_format);
//!     }
//! }
//! # Ok::<(), tiger::Error>(())
//! ```

use thiserror::Error;

use prelude::*;

// Re-export all sub-crates
pub use tiger_common as common;
pub use tiger_payload as payload;
pub use tiger_pkg as pkg;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tiger_common::BinaryReader;
    pub use tiger_payload::{
        AudioBank, AudioMetadataBlock, Dispatcher, FontReferenceBlock, StringBank,
        StringIndexerBlock, StringLocalizerBlock, TextureHeader, TypedRecord,
    };
    pub use tiger_pkg::{
        kind, AesGcmCipher, BlockPipeline, Entry, KeySet, MemoryProvider, Package,
        PackageProvider, PipelineOptions, ReferenceHash, ResolutionSession, ZstdDecompressor,
    };
}

/// Errors from any stage of decoding an entry.
#[derive(Debug, Error)]
pub enum Error {
    /// Package, table, block or reference error.
    #[error("{0}")]
    Package(#[from] tiger_pkg::Error),

    /// Payload decoding error.
    #[error("{0}")]
    Payload(#[from] tiger_payload::Error),
}

/// Result type for combined operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Extract entry `index` of `package` and decode it into a typed record.
pub fn decode_entry(
    pipeline: &BlockPipeline,
    dispatcher: &Dispatcher,
    package: &Package,
    index: usize,
) -> Result<TypedRecord> {
    let entry = package
        .entry(index)
        .ok_or(tiger_pkg::Error::EntryNotFound(index))?;
    let data = pipeline.extract(package, index)?;
    Ok(dispatcher.dispatch(entry, data)?)
}

/// Resolve `reference` through `session`, then extract and decode its target.
pub fn decode_reference<P: PackageProvider>(
    session: &ResolutionSession<P>,
    pipeline: &BlockPipeline,
    dispatcher: &Dispatcher,
    reference: ReferenceHash,
) -> Result<TypedRecord> {
    let resolved = session.resolve(reference)?;
    decode_entry(pipeline, dispatcher, &resolved.package, resolved.index)
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
