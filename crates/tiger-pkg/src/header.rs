//! Package header.
//!
//! The header occupies the first [`Header::SIZE`] bytes of a package. Fields
//! live at fixed offsets; everything in between is padding or opaque data
//! that is ignored on read and zeroed on write.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use tiger_common::BinaryReader;

use crate::block::Block;
use crate::entry::Entry;
use crate::{Error, Result};

/// Value of the format sentinel at 0x3c.
pub const ALWAYS_0X02: u32 = 2;

mod offsets {
    pub const VERSION: usize = 0x00;
    pub const PLATFORM: usize = 0x02;
    pub const PACKAGE_ID: usize = 0x10;
    pub const IS_PACKAGE: usize = 0x12;
    pub const IS_STARTUP: usize = 0x13;
    pub const FIELD_18: usize = 0x18;
    pub const BUILD_DATE: usize = 0x20;
    pub const BUILD_ID: usize = 0x28;
    pub const PATCH_ID: usize = 0x30;
    pub const LANGUAGE: usize = 0x32;
    pub const ALWAYS_0X02: usize = 0x3c;
    pub const SIGNATURE_OFFSET: usize = 0x40;
    pub const ENTRY_TABLE_OFFSET: usize = 0x44;
    pub const ENTRY_TABLE_HASH: usize = 0x4c;
    pub const ENTRY_TABLE_COUNT: usize = 0x60;
    pub const BLOCK_TABLE_COUNT: usize = 0x68;
    pub const BLOCK_TABLE_OFFSET: usize = 0x6c;
    pub const SENTINEL_OFFSET: usize = 0x11c;
    pub const PACKAGE_SIZE: usize = 0x120;
    pub const FIELD_128: usize = 0x128;
}

/// Package language codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Language {
    None = 0,
    English = 1,
    French = 2,
    Italian = 3,
    German = 4,
    Spanish = 5,
    Japanese = 6,
    Portuguese = 7,
    Russian = 8,
    Polish = 9,
    SimplifiedChinese = 10,
    TraditionalChinese = 11,
    LatinAmericanSpanish = 12,
    Korean = 13,
}

impl TryFrom<u16> for Language {
    type Error = u16;

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::None,
            1 => Self::English,
            2 => Self::French,
            3 => Self::Italian,
            4 => Self::German,
            5 => Self::Spanish,
            6 => Self::Japanese,
            7 => Self::Portuguese,
            8 => Self::Russian,
            9 => Self::Polish,
            10 => Self::SimplifiedChinese,
            11 => Self::TraditionalChinese,
            12 => Self::LatinAmericanSpanish,
            13 => Self::Korean,
            other => return Err(other),
        })
    }
}

/// The fixed-layout package header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub platform: u16,
    pub package_id: u16,
    pub is_package: u8,
    pub is_startup_package: u8,
    /// Opaque; differs between patched and unpatched packages.
    pub field_18: u64,
    /// Seconds since the Unix epoch.
    pub build_date: u64,
    pub build_id: u32,
    pub patch_id: u16,
    /// Raw language code, see [`Header::language`].
    pub language: u16,
    pub always_0x02: u32,
    pub signature_offset: u32,
    pub entry_table_offset: u32,
    /// SHA-1 of the raw entry table.
    pub entry_table_hash: [u8; 20],
    pub entry_table_count: u32,
    pub block_table_count: u32,
    pub block_table_offset: u32,
    /// Offset of the trailing 0xDEAFBEEF marker.
    pub sentinel_offset: u32,
    pub package_size: u64,
    /// Opaque; differs between startup and regular packages.
    pub field_128: u64,
}

impl Header {
    /// Size of the fixed header in bytes.
    pub const SIZE: usize = 0x130;

    /// Parse and validate a header from the start of a package buffer.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::MalformedHeader(format!(
                "buffer of {} bytes is shorter than the {:#x}-byte header",
                data.len(),
                Self::SIZE
            )));
        }

        let at = |offset| BinaryReader::new_at(data, offset);

        let header = Self {
            version: at(offsets::VERSION).read_u16()?,
            platform: at(offsets::PLATFORM).read_u16()?,
            package_id: at(offsets::PACKAGE_ID).read_u16()?,
            is_package: at(offsets::IS_PACKAGE).read_u8()?,
            is_startup_package: at(offsets::IS_STARTUP).read_u8()?,
            field_18: at(offsets::FIELD_18).read_u64()?,
            build_date: at(offsets::BUILD_DATE).read_u64()?,
            build_id: at(offsets::BUILD_ID).read_u32()?,
            patch_id: at(offsets::PATCH_ID).read_u16()?,
            language: at(offsets::LANGUAGE).read_u16()?,
            always_0x02: at(offsets::ALWAYS_0X02).read_u32()?,
            signature_offset: at(offsets::SIGNATURE_OFFSET).read_u32()?,
            entry_table_offset: at(offsets::ENTRY_TABLE_OFFSET).read_u32()?,
            entry_table_hash: at(offsets::ENTRY_TABLE_HASH).read_array()?,
            entry_table_count: at(offsets::ENTRY_TABLE_COUNT).read_u32()?,
            block_table_count: at(offsets::BLOCK_TABLE_COUNT).read_u32()?,
            block_table_offset: at(offsets::BLOCK_TABLE_OFFSET).read_u32()?,
            sentinel_offset: at(offsets::SENTINEL_OFFSET).read_u32()?,
            package_size: at(offsets::PACKAGE_SIZE).read_u64()?,
            field_128: at(offsets::FIELD_128).read_u64()?,
        };

        header.validate(data.len())?;
        Ok(header)
    }

    fn validate(&self, buffer_len: usize) -> Result<()> {
        if self.always_0x02 != ALWAYS_0X02 {
            return Err(Error::MalformedHeader(format!(
                "format sentinel is {:#x}, expected {:#x}",
                self.always_0x02, ALWAYS_0X02
            )));
        }

        if self.package_size > buffer_len as u64 {
            return Err(Error::MalformedHeader(format!(
                "declared package size {:#x} exceeds buffer of {:#x} bytes",
                self.package_size, buffer_len
            )));
        }

        let entry_end = self.entry_table_range().end;
        if entry_end > self.package_size {
            return Err(Error::MalformedHeader(format!(
                "entry table ends at {:#x}, past package size {:#x}",
                entry_end, self.package_size
            )));
        }

        let block_end = self.block_table_range().end;
        if block_end > self.package_size {
            return Err(Error::MalformedHeader(format!(
                "block table ends at {:#x}, past package size {:#x}",
                block_end, self.package_size
            )));
        }

        Ok(())
    }

    /// Byte range of the entry table.
    pub fn entry_table_range(&self) -> std::ops::Range<u64> {
        let start = self.entry_table_offset as u64;
        start..start + self.entry_table_count as u64 * Entry::SIZE as u64
    }

    /// Byte range of the block table.
    pub fn block_table_range(&self) -> std::ops::Range<u64> {
        let start = self.block_table_offset as u64;
        start..start + self.block_table_count as u64 * Block::RECORD_SIZE as u64
    }

    /// Decoded language, if the code is known.
    pub fn language(&self) -> Option<Language> {
        Language::try_from(self.language).ok()
    }

    pub fn is_startup(&self) -> bool {
        self.is_startup_package != 0
    }

    /// Serialize the header into exactly [`Header::SIZE`] bytes.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut buf = vec![0u8; Self::SIZE];
        {
            let mut put = |offset: usize, bytes: &[u8]| {
                buf[offset..offset + bytes.len()].copy_from_slice(bytes);
            };
            put(offsets::VERSION, &self.version.to_le_bytes());
            put(offsets::PLATFORM, &self.platform.to_le_bytes());
            put(offsets::PACKAGE_ID, &self.package_id.to_le_bytes());
            put(offsets::IS_PACKAGE, &[self.is_package]);
            put(offsets::IS_STARTUP, &[self.is_startup_package]);
            put(offsets::FIELD_18, &self.field_18.to_le_bytes());
            put(offsets::BUILD_DATE, &self.build_date.to_le_bytes());
            put(offsets::BUILD_ID, &self.build_id.to_le_bytes());
            put(offsets::PATCH_ID, &self.patch_id.to_le_bytes());
            put(offsets::LANGUAGE, &self.language.to_le_bytes());
            put(offsets::ALWAYS_0X02, &self.always_0x02.to_le_bytes());
            put(offsets::SIGNATURE_OFFSET, &self.signature_offset.to_le_bytes());
            put(offsets::ENTRY_TABLE_OFFSET, &self.entry_table_offset.to_le_bytes());
            put(offsets::ENTRY_TABLE_HASH, &self.entry_table_hash);
            put(offsets::ENTRY_TABLE_COUNT, &self.entry_table_count.to_le_bytes());
            put(offsets::BLOCK_TABLE_COUNT, &self.block_table_count.to_le_bytes());
            put(offsets::BLOCK_TABLE_OFFSET, &self.block_table_offset.to_le_bytes());
            put(offsets::SENTINEL_OFFSET, &self.sentinel_offset.to_le_bytes());
        }
        writer.write_all(&buf[..offsets::PACKAGE_SIZE])?;
        writer.write_u64::<LittleEndian>(self.package_size)?;
        writer.write_u64::<LittleEndian>(self.field_128)?;
        Ok(())
    }
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: 0,
            platform: 0,
            package_id: 0,
            is_package: 1,
            is_startup_package: 0,
            field_18: 0,
            build_date: 0,
            build_id: 0,
            patch_id: 0,
            language: 0,
            always_0x02: ALWAYS_0X02,
            signature_offset: 0,
            entry_table_offset: Self::SIZE as u32,
            entry_table_hash: [0; 20],
            entry_table_count: 0,
            block_table_count: 0,
            block_table_offset: Self::SIZE as u32,
            sentinel_offset: 0,
            package_size: Self::SIZE as u64,
            field_128: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    impl Arbitrary for Header {
        fn arbitrary(g: &mut Gen) -> Self {
            let mut header = Self {
                version: u16::arbitrary(g),
                platform: u16::arbitrary(g),
                package_id: u16::arbitrary(g),
                is_package: u8::arbitrary(g),
                is_startup_package: u8::arbitrary(g),
                field_18: u64::arbitrary(g),
                build_date: u64::arbitrary(g),
                build_id: u32::arbitrary(g),
                patch_id: u16::arbitrary(g),
                language: u16::arbitrary(g),
                always_0x02: ALWAYS_0X02,
                signature_offset: u32::arbitrary(g),
                entry_table_offset: u32::arbitrary(g) & 0xFFFF,
                entry_table_hash: [0; 20],
                entry_table_count: u32::arbitrary(g) % 64,
                block_table_count: u32::arbitrary(g) % 64,
                block_table_offset: u32::arbitrary(g) & 0xFFFF,
                sentinel_offset: u32::arbitrary(g),
                package_size: 0,
                field_128: u64::arbitrary(g),
            };
            for byte in header.entry_table_hash.iter_mut() {
                *byte = u8::arbitrary(g);
            }
            // smallest size that still holds both tables, plus some slack
            let tables_end = header
                .entry_table_range()
                .end
                .max(header.block_table_range().end)
                .max(Header::SIZE as u64);
            header.package_size = tables_end + (u16::arbitrary(g) % 0x100) as u64;
            header
        }
    }

    fn sample() -> Header {
        Header {
            version: 0x35,
            platform: 2,
            package_id: 0x3ff,
            is_package: 1,
            is_startup_package: 1,
            field_18: 0x74ba_d2d8_99aa_f3c7,
            build_date: 1_600_000_000,
            build_id: 0xdead_0001,
            patch_id: 7,
            language: 1,
            always_0x02: 2,
            signature_offset: 0x1000,
            entry_table_offset: 0x130,
            entry_table_hash: [0xab; 20],
            entry_table_count: 2,
            block_table_count: 1,
            block_table_offset: 0x150,
            sentinel_offset: 0x180,
            package_size: 0x200,
            field_128: 0xfb43_8df4,
        }
    }

    fn serialize(header: &Header, len: usize) -> Vec<u8> {
        let mut out = Vec::new();
        header.write_to(&mut out).unwrap();
        assert_eq!(out.len(), Header::SIZE);
        out.resize(len, 0);
        out
    }

    #[test]
    fn test_roundtrip() {
        let header = sample();
        let bytes = serialize(&header, 0x200);
        assert_eq!(Header::parse(&bytes).unwrap(), header);
    }

    #[quickcheck]
    fn valid_headers_roundtrip(header: Header) -> bool {
        let bytes = serialize(&header, header.package_size as usize);
        Header::parse(&bytes).ok() == Some(header)
    }

    #[test]
    fn test_field_offsets() {
        let bytes = serialize(&sample(), 0x200);
        assert_eq!(&bytes[0x10..0x12], &0x3ffu16.to_le_bytes());
        assert_eq!(&bytes[0x3c..0x40], &2u32.to_le_bytes());
        assert_eq!(&bytes[0x4c..0x60], &[0xab; 20]);
        assert_eq!(&bytes[0x120..0x128], &0x200u64.to_le_bytes());
    }

    #[test]
    fn test_language() {
        assert_eq!(sample().language(), Some(Language::English));
        let header = Header { language: 99, ..sample() };
        assert_eq!(header.language(), None);
    }

    #[test]
    fn test_too_short() {
        let result = Header::parse(&[0u8; 0x100]);
        assert!(matches!(result, Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_bad_sentinel() {
        let header = Header { always_0x02: 3, ..sample() };
        let bytes = serialize(&header, 0x200);
        assert!(matches!(Header::parse(&bytes), Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_entry_table_past_package_size() {
        let header = Header { entry_table_count: 100, ..sample() };
        let bytes = serialize(&header, 0x200);
        assert!(matches!(Header::parse(&bytes), Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_block_table_past_package_size() {
        let header = Header { block_table_count: 20, ..sample() };
        let bytes = serialize(&header, 0x200);
        assert!(matches!(Header::parse(&bytes), Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_package_size_past_buffer() {
        let bytes = serialize(&sample(), 0x1ff);
        assert!(matches!(Header::parse(&bytes), Err(Error::MalformedHeader(_))));
    }
}
