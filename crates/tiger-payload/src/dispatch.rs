//! Entry type dispatch.
//!
//! Decoders are looked up by class hash for tagged blocks (types 8 and 16)
//! and by `(type, subtype)` otherwise. Anything unregistered comes back as
//! [`TypedRecord::Opaque`].

use tiger_pkg::{kind, Entry};

use crate::audio::AudioBank;
use crate::font::FontReferenceBlock;
use crate::record::TypedRecord;
use crate::strings::{StringBank, StringIndexerBlock, StringLocalizerBlock};
use crate::texture::TextureHeader;
use crate::{FxHashMap, Result};

/// A pure payload decoder.
pub type DecodeFn = fn(&[u8]) -> Result<TypedRecord>;

/// Class hashes of the tagged blocks with built-in decoders.
pub mod class {
    pub const STRING_BANK: u32 = 0x8080_99F1;
    pub const STRING_LOCALIZER: u32 = 0x8080_99EF;
    pub const STRING_INDEXER: u32 = 0x8080_5A09;
    pub const FONT_REFERENCE: u32 = 0x8080_3C12;
    pub const AUDIO_BANK: u32 = 0x8080_97B8;
}

/// Registry of payload decoders.
#[derive(Clone)]
pub struct Dispatcher {
    by_kind: FxHashMap<(u8, u8), DecodeFn>,
    by_class: FxHashMap<u32, DecodeFn>,
}

impl Dispatcher {
    /// A dispatcher with the built-in decoders registered.
    pub fn new() -> Self {
        let mut dispatcher = Self::empty();
        dispatcher.register(kind::TEXTURE_HEADER, kind::SUBTYPE_TEXTURE, |data| {
            TextureHeader::parse(data).map(TypedRecord::Texture)
        });
        dispatcher.register_class(class::STRING_BANK, |data| {
            StringBank::parse(data).map(TypedRecord::StringBank)
        });
        dispatcher.register_class(class::STRING_LOCALIZER, |data| {
            StringLocalizerBlock::parse(data).map(TypedRecord::StringLocalizer)
        });
        dispatcher.register_class(class::STRING_INDEXER, |data| {
            StringIndexerBlock::parse(data).map(TypedRecord::StringIndexer)
        });
        dispatcher.register_class(class::FONT_REFERENCE, |data| {
            FontReferenceBlock::parse(data).map(TypedRecord::Font)
        });
        dispatcher.register_class(class::AUDIO_BANK, |data| {
            AudioBank::parse(data).map(TypedRecord::AudioBank)
        });
        dispatcher
    }

    /// A dispatcher that returns every payload as opaque.
    pub fn empty() -> Self {
        Self {
            by_kind: FxHashMap::default(),
            by_class: FxHashMap::default(),
        }
    }

    /// Register a decoder for a `(type, subtype)` pair, returning the one it
    /// replaces.
    pub fn register(&mut self, file_type: u8, file_subtype: u8, decoder: DecodeFn) -> Option<DecodeFn> {
        self.by_kind.insert((file_type, file_subtype), decoder)
    }

    /// Register a decoder for tagged blocks of a class, returning the one it
    /// replaces.
    pub fn register_class(&mut self, class_hash: u32, decoder: DecodeFn) -> Option<DecodeFn> {
        self.by_class.insert(class_hash, decoder)
    }

    /// The decoder that would handle `entry`, if any.
    pub fn decoder_for(&self, entry: &Entry) -> Option<DecodeFn> {
        if entry.is_tagged_block() {
            if let Some(decoder) = self.by_class.get(&entry.class_hash()) {
                return Some(*decoder);
            }
        }
        self.by_kind
            .get(&(entry.file_type, entry.file_subtype))
            .copied()
    }

    /// Decode an extracted payload according to its entry.
    pub fn dispatch(&self, entry: &Entry, data: Vec<u8>) -> Result<TypedRecord> {
        match self.decoder_for(entry) {
            Some(decoder) => {
                let record = decoder(&data)?;
                log::trace!(
                    "decoded {}/{} ({} bytes) as {}",
                    entry.file_type,
                    entry.file_subtype,
                    data.len(),
                    record.kind_name()
                );
                Ok(record)
            }
            None => Ok(TypedRecord::Opaque(data)),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("kinds", &self.by_kind.len())
            .field("classes", &self.by_class.len())
            .finish()
    }
}
