//! Decoded payload records.

use tiger_pkg::ReferenceHash;

use crate::audio::AudioBank;
use crate::font::FontReferenceBlock;
use crate::strings::{StringBank, StringIndexerBlock, StringLocalizerBlock};
use crate::texture::TextureHeader;

/// The result of dispatching an entry payload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TypedRecord {
    Texture(TextureHeader),
    StringLocalizer(StringLocalizerBlock),
    StringBank(StringBank),
    StringIndexer(StringIndexerBlock),
    Font(FontReferenceBlock),
    AudioBank(AudioBank),
    /// Payload of a type with no registered decoder, passed through as is.
    Opaque(Vec<u8>),
}

impl TypedRecord {
    /// Short name of the variant.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Texture(_) => "texture",
            Self::StringLocalizer(_) => "string localizer",
            Self::StringBank(_) => "string bank",
            Self::StringIndexer(_) => "string indexer",
            Self::Font(_) => "font reference",
            Self::AudioBank(_) => "audio bank",
            Self::Opaque(_) => "opaque",
        }
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque(_))
    }

    pub fn as_texture(&self) -> Option<&TextureHeader> {
        match self {
            Self::Texture(header) => Some(header),
            _ => None,
        }
    }

    pub fn as_font(&self) -> Option<&FontReferenceBlock> {
        match self {
            Self::Font(font) => Some(font),
            _ => None,
        }
    }

    pub fn as_string_localizer(&self) -> Option<&StringLocalizerBlock> {
        match self {
            Self::StringLocalizer(localizer) => Some(localizer),
            _ => None,
        }
    }

    pub fn as_string_bank(&self) -> Option<&StringBank> {
        match self {
            Self::StringBank(bank) => Some(bank),
            _ => None,
        }
    }

    pub fn as_string_indexer(&self) -> Option<&StringIndexerBlock> {
        match self {
            Self::StringIndexer(indexer) => Some(indexer),
            _ => None,
        }
    }

    pub fn as_audio_bank(&self) -> Option<&AudioBank> {
        match self {
            Self::AudioBank(bank) => Some(bank),
            _ => None,
        }
    }

    /// References embedded in the payload, sentinels excluded. These are
    /// lookup keys only; nothing here resolves them.
    pub fn references(&self) -> Vec<ReferenceHash> {
        match self {
            Self::StringLocalizer(localizer) => localizer.string_bank.valid().into_iter().collect(),
            Self::StringIndexer(indexer) => indexer.localizers().collect(),
            Self::Font(font) => font.font.valid().into_iter().collect(),
            Self::AudioBank(bank) => bank.entries.iter().flat_map(|e| e.references()).collect(),
            Self::Texture(_) | Self::StringBank(_) | Self::Opaque(_) => Vec::new(),
        }
    }

    /// Give back the raw bytes of an opaque record.
    pub fn into_opaque(self) -> Option<Vec<u8>> {
        match self {
            Self::Opaque(data) => Some(data),
            _ => None,
        }
    }
}
