//! Entry table records.
//!
//! Each entry is 128 bits stored as four little-endian words:
//!
//! ```text
//! [             D              ] [             C              ]
//! GGGGGGFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFEEEE EEEEEEEE EEDDDDDD DDDDDDDD
//!
//! [             B              ] [             A              ]
//! ........ ........ TTTTTTTS SS...... CCCCCCCC CBBBBBBB BBBAAAAA AAAAAAAA
//! ```
//!
//! A: reference id, B: reference package id, C: reference unknown id,
//! D: starting block, E: starting block offset / 16,
//! F: file size (26 bits of D above the 4 top bits of C),
//! G: unknown, S: subtype, T: type. Dots in B are preserved as flags.

use tiger_common::{hash, BinaryReader};

use crate::header::Header;
use crate::reference::ReferenceHash;
use crate::{error, Error, Result};

/// Well-known entry types.
pub mod kind {
    /// Tagged block whose layout is named by a class hash in word A.
    pub const RAW_DATA: u8 = 8;
    /// Second tagged block type.
    pub const RAW_DATA_ALT: u8 = 16;
    /// OpenType font file.
    pub const FONT_FILE: u8 = 24;
    /// Third-party payloads (audio banks, havok).
    pub const THIRD_PARTY: u8 = 26;
    pub const VIDEO: u8 = 27;
    pub const TEXTURE_HEADER: u8 = 32;
    pub const TEXTURE_DATA: u8 = 40;
    pub const TEXTURE_UI_DATA: u8 = 48;

    /// Third-party Wwise sound bank.
    pub const SUBTYPE_BKHD: u8 = 6;
    /// Third-party RIFF audio.
    pub const SUBTYPE_RIFF: u8 = 7;
    /// USM video.
    pub const SUBTYPE_USM: u8 = 1;
    /// 64-byte texture header / matching texture data.
    pub const SUBTYPE_TEXTURE: u8 = 1;
}

/// Size of a decoded block assumed by [`Entry::block_count`].
pub const BLOCK_SIZE: u32 = 0x40000;

const TYPE_SUBTYPE_MASK: u32 = (0x7F << 9) | (0x7 << 6);

/// A decoded entry table record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Entry {
    /// 13 bits.
    pub reference_id: u16,
    /// 10 bits.
    pub reference_package_id: u16,
    /// 9 bits.
    pub reference_unknown_id: u16,
    /// 7 bits.
    pub file_type: u8,
    /// 3 bits.
    pub file_subtype: u8,
    /// Word B with the type and subtype bits cleared.
    pub flags: u32,
    /// 14 bits.
    pub starting_block: u16,
    /// Byte offset into the starting block; a multiple of 16 below 0x40000.
    pub starting_block_offset: u32,
    /// 30 bits.
    pub file_size: u32,
    /// 6 bits.
    pub unknown: u8,
}

impl Entry {
    /// Size of one record in bytes.
    pub const SIZE: usize = 16;

    /// Decode an entry from its four words.
    pub fn from_words([a, b, c, d]: [u32; 4]) -> Self {
        Self {
            reference_id: (a & 0x1FFF) as u16,
            reference_package_id: ((a >> 13) & 0x3FF) as u16,
            reference_unknown_id: (a >> 23) as u16,
            file_type: ((b >> 9) & 0x7F) as u8,
            file_subtype: ((b >> 6) & 0x7) as u8,
            flags: b & !TYPE_SUBTYPE_MASK,
            starting_block: (c & 0x3FFF) as u16,
            starting_block_offset: ((c >> 14) & 0x3FFF) << 4,
            file_size: ((d & 0x3FF_FFFF) << 4) | ((c >> 28) & 0xF),
            unknown: ((d >> 26) & 0x3F) as u8,
        }
    }

    /// Encode the entry back into its four words. Bits that do not fit a
    /// field are dropped.
    pub fn to_words(&self) -> [u32; 4] {
        let a = self.word_a();
        let b = (self.flags & !TYPE_SUBTYPE_MASK)
            | ((self.file_type as u32 & 0x7F) << 9)
            | ((self.file_subtype as u32 & 0x7) << 6);
        let c = (self.starting_block as u32 & 0x3FFF)
            | (((self.starting_block_offset >> 4) & 0x3FFF) << 14)
            | ((self.file_size & 0xF) << 28);
        let d = ((self.file_size >> 4) & 0x3FF_FFFF) | ((self.unknown as u32 & 0x3F) << 26);
        [a, b, c, d]
    }

    /// Decode a 16-byte record.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        Ok(Self::from_words([
            reader.read_u32()?,
            reader.read_u32()?,
            reader.read_u32()?,
            reader.read_u32()?,
        ]))
    }

    /// Serialize to the 16-byte on-disk form.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.to_words()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    /// Word A as stored. For tagged blocks this is the class hash.
    #[inline]
    pub fn word_a(&self) -> u32 {
        (self.reference_id as u32 & 0x1FFF)
            | ((self.reference_package_id as u32 & 0x3FF) << 13)
            | ((self.reference_unknown_id as u32 & 0x1FF) << 23)
    }

    /// Alias of [`Entry::word_a`] for tagged block entries.
    #[inline]
    pub fn class_hash(&self) -> u32 {
        self.word_a()
    }

    /// The entry's own reference fields as a [`ReferenceHash`].
    ///
    /// Texture headers use this to point at their pixel data.
    pub fn reference(&self) -> ReferenceHash {
        ReferenceHash::new(
            self.reference_package_id,
            self.reference_id,
            self.reference_unknown_id,
        )
    }

    /// Package id of the referenced entry with the high bit selected by the
    /// low two bits of the unknown id applied.
    pub fn reference_target_package(&self) -> u16 {
        let selector = self.reference_unknown_id & 0x3;
        if selector == 1 {
            self.reference_package_id
        } else {
            self.reference_package_id | (0x100 << selector)
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.file_size == 0
    }

    /// Whether word A is a class hash rather than a reference.
    #[inline]
    pub fn is_tagged_block(&self) -> bool {
        matches!(self.file_type, kind::RAW_DATA | kind::RAW_DATA_ALT)
    }

    /// Number of blocks the entry touches if every block decodes to
    /// [`BLOCK_SIZE`] bytes.
    pub fn block_count(&self) -> u32 {
        (self.starting_block_offset + self.file_size).div_ceil(BLOCK_SIZE)
    }
}

/// Decode the entry table described by `header` and verify its digest.
///
/// `data` is the whole package buffer.
pub fn decode_entry_table(header: &Header, data: &[u8]) -> Result<Vec<Entry>> {
    let range = header.entry_table_range();
    let table = data
        .get(range.start as usize..range.end as usize)
        .ok_or_else(|| {
            Error::MalformedEntryTable(format!(
                "table {:#x}..{:#x} outside of {:#x}-byte buffer",
                range.start,
                range.end,
                data.len()
            ))
        })?;

    let actual = hash::sha1(table);
    if actual != header.entry_table_hash {
        return Err(Error::EntryTableHashMismatch {
            expected: error::hex(&header.entry_table_hash),
            actual: error::hex(&actual),
        });
    }

    let entries = table
        .chunks_exact(Entry::SIZE)
        .map(Entry::parse)
        .collect::<Result<Vec<_>>>()?;

    log::debug!(
        "decoded {} entries for package {:#06x}",
        entries.len(),
        header.package_id
    );

    Ok(entries)
}

/// Check that every non-empty entry starts at an existing block.
pub(crate) fn validate_block_indices(entries: &[Entry], block_count: usize) -> Result<()> {
    if let Some((index, entry)) = entries
        .iter()
        .enumerate()
        .find(|(_, e)| !e.is_empty() && e.starting_block as usize >= block_count)
    {
        return Err(Error::MalformedEntryTable(format!(
            "entry {} starts at block {} but the table has {} blocks",
            index, entry.starting_block, block_count
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    impl Arbitrary for Entry {
        fn arbitrary(g: &mut Gen) -> Self {
            Self {
                reference_id: u16::arbitrary(g) & 0x1FFF,
                reference_package_id: u16::arbitrary(g) & 0x3FF,
                reference_unknown_id: u16::arbitrary(g) & 0x1FF,
                file_type: u8::arbitrary(g) & 0x7F,
                file_subtype: u8::arbitrary(g) & 0x7,
                flags: u32::arbitrary(g) & !TYPE_SUBTYPE_MASK,
                starting_block: u16::arbitrary(g) & 0x3FFF,
                starting_block_offset: (u32::arbitrary(g) & 0x3FFF) << 4,
                file_size: u32::arbitrary(g) & 0x3FFF_FFFF,
                unknown: u8::arbitrary(g) & 0x3F,
            }
        }
    }

    #[quickcheck]
    fn fields_roundtrip(entry: Entry) -> bool {
        Entry::from_words(entry.to_words()) == entry
    }

    #[quickcheck]
    fn words_roundtrip(words: (u32, u32, u32, u32)) -> bool {
        let words = [words.0, words.1, words.2, words.3];
        Entry::from_words(words).to_words() == words
    }

    #[test]
    fn test_field_maximums() {
        let entry = Entry {
            reference_id: 0x1FFF,
            reference_package_id: 0x3FF,
            reference_unknown_id: 0x1FF,
            file_type: 0x7F,
            file_subtype: 0x7,
            flags: 0,
            starting_block: 0x3FFF,
            starting_block_offset: 0x3FFF << 4,
            file_size: 0x3FFF_FFFF,
            unknown: 0x3F,
        };
        let words = entry.to_words();
        assert_eq!(words, [u32::MAX, 0xFFC0, u32::MAX, u32::MAX]);
        assert_eq!(Entry::from_words(words), entry);
    }

    #[test]
    fn test_single_fields_do_not_bleed() {
        let entry = Entry {
            file_size: 0xF,
            ..Default::default()
        };
        assert_eq!(entry.to_words(), [0, 0, 0xF000_0000, 0]);

        let entry = Entry {
            file_size: 0x10,
            ..Default::default()
        };
        assert_eq!(entry.to_words(), [0, 0, 0, 1]);

        let entry = Entry {
            starting_block_offset: 0x10,
            ..Default::default()
        };
        assert_eq!(entry.to_words(), [0, 0, 1 << 14, 0]);
    }

    #[test]
    fn test_known_words() {
        // type 32 / subtype 1, block 3 at offset 0x40, 64 bytes
        let entry = Entry::from_words([0x0080_2005, 0x0000_4040, 0x0001_0003, 0x0000_0004]);
        assert_eq!(entry.reference_id, 5);
        assert_eq!(entry.reference_package_id, 1);
        assert_eq!(entry.reference_unknown_id, 1);
        assert_eq!(entry.file_type, 32);
        assert_eq!(entry.file_subtype, 1);
        assert_eq!(entry.starting_block, 3);
        assert_eq!(entry.starting_block_offset, 0x40);
        assert_eq!(entry.file_size, 64);
        assert_eq!(entry.reference_target_package(), 1);
        assert_eq!(entry.reference(), ReferenceHash::new(1, 5, 1));
    }

    #[test]
    fn test_class_hash_preserved() {
        let entry = Entry::from_words([0x8080_3C12, 8 << 9, 0, 0]);
        assert!(entry.is_tagged_block());
        assert_eq!(entry.class_hash(), 0x8080_3C12);
    }

    #[test]
    fn test_reference_target_package() {
        let mut entry = Entry {
            reference_package_id: 0x12,
            reference_unknown_id: 0,
            ..Default::default()
        };
        assert_eq!(entry.reference_target_package(), 0x112);
        entry.reference_unknown_id = 2;
        assert_eq!(entry.reference_target_package(), 0x412);
    }

    #[test]
    fn test_block_count() {
        let entry = Entry {
            starting_block_offset: 0x3FFF0,
            file_size: 0x20,
            ..Default::default()
        };
        assert_eq!(entry.block_count(), 2);
    }

    #[test]
    fn test_validate_block_indices() {
        let entries = [
            Entry { starting_block: 5, ..Default::default() },
            Entry { starting_block: 1, file_size: 1, ..Default::default() },
        ];
        assert!(validate_block_indices(&entries, 2).is_ok());
        assert!(matches!(
            validate_block_indices(&entries, 1),
            Err(Error::MalformedEntryTable(_))
        ));
    }
}
