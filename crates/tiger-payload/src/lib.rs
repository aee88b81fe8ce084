//! Typed payload records for Tiger package entries.
//!
//! Extracted entry bytes are handed to a [`Dispatcher`], which picks a decoder
//! by class hash (tagged blocks) or by `(type, subtype)`:
//!
//! - [`TextureHeader`] - 64-byte texture header (type 32, subtype 1)
//! - [`StringBank`] / [`StringLocalizerBlock`] - obfuscated strings and their hashes
//! - [`StringIndexerBlock`] - hashes mapped to the localizers that hold them
//! - [`FontReferenceBlock`] - font name and the entry holding the font file
//! - [`AudioBank`] / [`AudioMetadataBlock`] - dialogue lines with audio and subtitle references
//!
//! Unregistered payloads come back as [`TypedRecord::Opaque`]. References
//! inside payloads are surfaced as [`tiger_pkg::ReferenceHash`] values and
//! never followed.
//!
//! # Example
//!
//! ```
//! use tiger_payload::{Dispatcher, TypedRecord};
//! use tiger_pkg::Entry;
//!
//! let entry = Entry { file_type: 27, file_subtype: 1, ..Entry::default() };
//! let record = Dispatcher::new().dispatch(&entry, vec![0xAB; 4])?;
//! assert_eq!(record, TypedRecord::Opaque(vec![0xAB; 4]));
//! # Ok::<(), tiger_payload::Error>(())
//! ```

use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

mod audio;
mod dispatch;
mod error;
mod font;
mod record;
mod strings;
mod table;
mod texture;

pub use audio::{AudioBank, AudioMetadataBlock, AudioSlot, SubtitleSlot, AUDIO_ENTRY_MARKER};
pub use dispatch::{class, DecodeFn, Dispatcher};
pub use error::{Error, Result};
pub use font::FontReferenceBlock;
pub use record::TypedRecord;
pub use strings::{IndexedLocalizer, StringBank, StringIndexerBlock, StringLocalizerBlock};
pub use table::TablePointer;
pub use texture::TextureHeader;

/// Hash map with the Fx hasher.
pub type FxHashMap<K, V> = hashbrown::HashMap<K, V, BuildHasherDefault<FxHasher>>;
