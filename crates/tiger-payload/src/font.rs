//! Font reference blocks (class 0x80803C12).
//!
//! A font reference names a font file and points at the type 24 entry that
//! holds its bytes.

use tiger_common::BinaryReader;
use tiger_pkg::ReferenceHash;

use crate::{Error, Result};

/// A decoded font reference.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FontReferenceBlock {
    pub file_size: u64,
    /// Entry holding the font file.
    pub font: ReferenceHash,
    /// Raw self-relative offset of the name, as stored.
    pub name_offset: u64,
    pub font_size: u64,
    pub class_hash: u64,
    /// File name including its extension, e.g. `Arial.otf`.
    pub name: String,
}

impl FontReferenceBlock {
    /// Bytes before the name.
    pub const HEADER_SIZE: usize = 0x30;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE {
            return Err(Error::UnexpectedPayloadSize {
                expected: Self::HEADER_SIZE,
                actual: data.len(),
            });
        }

        let mut reader = BinaryReader::new(data);
        let file_size = reader.read_u64()?;
        // u32 reference stored in a u64 slot
        let font = ReferenceHash::from_raw(reader.read_u64()? as u32);
        let name_offset = reader.read_u64()?;
        let font_size = reader.read_u64()?;
        let class_hash = reader.read_u64()?;
        let name_length = reader.read_u64()?;

        let available = reader.remaining();
        let name_length = usize::try_from(name_length)
            .ok()
            .filter(|&n| n <= available)
            .ok_or_else(|| {
                Error::MalformedPayload(format!(
                    "font name length {} exceeds the {} trailing bytes",
                    name_length, available
                ))
            })?;

        let raw = reader.read_bytes(name_length)?;
        let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let name = std::str::from_utf8(&raw[..end])
            .map_err(|e| Error::MalformedPayload(format!("font name is not UTF-8: {}", e)))?
            .to_string();

        Ok(Self {
            file_size,
            font,
            name_offset,
            font_size,
            class_hash,
            name,
        })
    }

    /// Name without its extension.
    pub fn stem(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map_or(self.name.as_str(), |(stem, _)| stem)
    }

    /// Extension without the dot, if the name has one.
    pub fn extension(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(_, ext)| ext)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn font_bytes(font: ReferenceHash, name: &[u8], name_length: u64) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend(0x40u64.to_le_bytes());
        data.extend((font.raw() as u64).to_le_bytes());
        data.extend(0x20u64.to_le_bytes());
        data.extend(0x1_2345u64.to_le_bytes());
        data.extend(0x8080_3C12u64.to_le_bytes());
        data.extend(name_length.to_le_bytes());
        data.extend_from_slice(name);
        data
    }

    #[test]
    fn test_parse() {
        let font = ReferenceHash::new(0x12, 7, 0);
        let block = FontReferenceBlock::parse(&font_bytes(font, b"Arial", 5)).unwrap();
        assert_eq!(block.name, "Arial");
        assert_eq!(block.font, font);
        assert_eq!(block.font_size, 0x1_2345);
        assert_eq!(block.class_hash, 0x8080_3C12);
        assert_eq!(block.stem(), "Arial");
        assert_eq!(block.extension(), None);
    }

    #[test]
    fn test_nul_terminated_name() {
        let data = font_bytes(ReferenceHash::NONE, b"Neue.otf\0\0", 10);
        let block = FontReferenceBlock::parse(&data).unwrap();
        assert_eq!(block.name, "Neue.otf");
        assert_eq!(block.stem(), "Neue");
        assert_eq!(block.extension(), Some("otf"));
    }

    #[test]
    fn test_truncated_name() {
        let data = font_bytes(ReferenceHash::NONE, b"Ari", 5);
        assert!(matches!(
            FontReferenceBlock::parse(&data),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_short_header() {
        let data = font_bytes(ReferenceHash::NONE, b"", 0);
        assert!(matches!(
            FontReferenceBlock::parse(&data[..0x2f]),
            Err(Error::UnexpectedPayloadSize { expected: 0x30, .. })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let data = font_bytes(ReferenceHash::NONE, &[0xff, 0xfe], 2);
        assert!(matches!(
            FontReferenceBlock::parse(&data),
            Err(Error::MalformedPayload(_))
        ));
    }
}
