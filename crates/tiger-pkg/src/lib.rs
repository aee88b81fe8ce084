//! Reader for Destiny "Tiger" engine packages.
//!
//! A package is a fixed 0x130-byte header followed by an entry table, a block
//! table and the block data. Entries describe files; blocks hold the stored
//! bytes, which may be AES-128-GCM encrypted and/or compressed.
//!
//! - Header, entry table and block table decoding with digest verification
//! - Cross-package references through [`ReferenceHash`]
//! - Injected [`BlockCipher`] and [`Decompressor`] capabilities
//! - Parallel extraction with rayon (with `parallel` feature)
//! - Memory-mapped file access
//!
//! # Example
//!
//! ```no_run
//! use tiger_pkg::{AesGcmCipher, BlockPipeline, KeySet, Package, ZstdDecompressor};
//!
//! let package = Package::open("w64_sr_audio_063c_0.pkg")?;
//! let keys = KeySet { primary: [0; 16], alternate: None, nonce: [0; 12] };
//! let pipeline = BlockPipeline::new()
//!     .with_cipher(AesGcmCipher::new(&keys))
//!     .with_decompressor(ZstdDecompressor);
//!
//! for (index, entry) in package.entries().iter().enumerate() {
//!     let data = pipeline.extract(&package, index)?;
//!     println!("{}/{}: {} bytes", entry.file_type, entry.file_subtype, data.len());
//! }
//! # Ok::<(), tiger_pkg::Error>(())
//! ```

mod block;
mod builder;
mod crypto;
mod decompress;
mod entry;
mod error;
mod header;
mod package;
mod pipeline;
mod reference;
mod resolver;

pub use block::{decode_block_table, Block, BlockFlags, BlockRecord};
pub use builder::{PackageBuilder, SENTINEL};
pub use crypto::{AesGcmCipher, BlockCipher, CapabilityError, KeySelector, KeySet};
pub use decompress::{DeflateDecompressor, Decompressor, ZstdDecompressor};
pub use entry::{decode_entry_table, kind, Entry, BLOCK_SIZE};
pub use error::{Error, Result};
pub use header::{Header, Language};
pub use package::Package;
pub use pipeline::{BlockPipeline, PipelineOptions};
pub use reference::ReferenceHash;
pub use resolver::{MemoryProvider, PackageProvider, ResolutionSession, ResolvedEntry};
