//! Texture header records (type 32, subtype 1).
//!
//! The header carries the DXGI format and dimensions; the pixel data lives in
//! a separate type 40/48 entry that the header entry's own reference fields
//! point at.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{Error, Result};

/// The 64-byte texture header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(C)]
pub struct TextureHeader {
    /// Size of the pixel data in bytes.
    pub texture_size: u32,
    /// `DXGI_FORMAT` value.
    pub dxgi_format: u32,
    pub unknown_08: [u32; 6],
    /// 0xCAFE on every header seen so far.
    pub cafe: u16,
    pub width: u16,
    pub height: u16,
    pub unknown_26: u16,
    pub unknown_28: [u32; 6],
}

impl TextureHeader {
    pub const SIZE: usize = 64;
    pub const CAFE: u16 = 0xCAFE;

    /// Decode a header payload. The payload must be exactly 64 bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::read_from_bytes(data).map_err(|_| Error::UnexpectedPayloadSize {
            expected: Self::SIZE,
            actual: data.len(),
        })
    }

    #[inline]
    pub fn has_cafe_marker(&self) -> bool {
        self.cafe == Self::CAFE
    }

    /// Whether the format is one of the BC1-BC7 block-compressed formats.
    pub fn is_block_compressed(&self) -> bool {
        matches!(self.dxgi_format, 70..=84 | 94..=99)
    }
}
