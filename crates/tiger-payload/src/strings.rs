//! String banks (class 0x808099F1), string localizers (class 0x808099EF) and
//! string indexers (class 0x80805A09).
//!
//! A bank stores obfuscated UTF-8 fragments ("parts") plus a per-string part
//! count. A localizer lists the string hashes of one bank in order and points
//! at the English bank. An indexer maps hashes to the localizers holding them.

use tiger_common::BinaryReader;
use tiger_pkg::ReferenceHash;

use crate::table::TablePointer;
use crate::{Error, FxHashMap, Result};

const PART_STRIDE: usize = 32;
const STRING_STRIDE: usize = 16;

/// A decoded string bank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StringBank {
    pub file_size: u32,
    /// Strings in bank order. `None` where a part used an unsupported
    /// encoding.
    pub strings: Vec<Option<String>>,
}

struct Part<'a> {
    data: &'a [u8],
    key: u16,
}

impl StringBank {
    const PARTS_TABLE: usize = 0x08;
    const STRINGS_TABLE: usize = 0x48;
    pub const MIN_SIZE: usize = Self::STRINGS_TABLE + TablePointer::SIZE;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE {
            return Err(Error::UnexpectedPayloadSize {
                expected: Self::MIN_SIZE,
                actual: data.len(),
            });
        }

        let mut reader = BinaryReader::new(data);
        let file_size = reader.read_u32()?;

        reader.seek(Self::PARTS_TABLE);
        let parts_table = TablePointer::read(&mut reader)?;
        reader.seek(Self::STRINGS_TABLE);
        let strings_table = TablePointer::read(&mut reader)?;

        let parts = parts_table
            .positions(PART_STRIDE, data.len())?
            .map(|position| Self::read_part(data, position))
            .collect::<Result<Vec<_>>>()?;

        let positions = strings_table.positions(STRING_STRIDE, data.len())?;
        let mut parts = parts.into_iter();
        let mut strings = Vec::with_capacity(strings_table.count as usize);

        for position in positions {
            let count = BinaryReader::new_at(data, position + 8).read_i32()?;
            let count = usize::try_from(count).map_err(|_| {
                Error::MalformedPayload(format!("negative part count {} at {:#x}", count, position))
            })?;

            let mut text = Some(Vec::new());
            for _ in 0..count {
                let part = parts.next().ok_or_else(|| {
                    Error::MalformedPayload(format!(
                        "string {} needs more parts than the bank holds",
                        strings.len()
                    ))
                })?;
                text = text.and_then(|mut buf| {
                    buf.extend(deobfuscate(part.data, part.key)?);
                    Some(buf)
                });
            }

            strings.push(text.map(|buf| {
                String::from_utf8_lossy(&buf).trim_matches(' ').to_string()
            }));
        }

        Ok(Self { file_size, strings })
    }

    fn read_part(data: &[u8], position: usize) -> Result<Part<'_>> {
        let mut reader = BinaryReader::new_at(data, position + 8);
        let base = reader.position();
        let relative = reader.read_u32()? as usize;

        reader.seek(position + 20);
        let byte_count = reader.read_u16()? as usize;
        let _length = reader.read_u16()?;
        let key = reader.read_u16()?;

        let start = base + relative;
        let bytes = data.get(start..start + byte_count).ok_or_else(|| {
            Error::MalformedPayload(format!(
                "string part at {:#x} points to {:#x}..{:#x}, outside of payload",
                position,
                start,
                start + byte_count
            ))
        })?;

        Ok(Part { data: bytes, key })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// String at `index`, if present and decodable.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index)?.as_deref()
    }
}

/// Undo the per-part obfuscation. Returns `None` on lead bytes outside the
/// supported ranges.
fn deobfuscate(data: &[u8], key: u16) -> Option<Vec<u8>> {
    let key = key as u8;
    let mut out = vec![0u8; data.len()];
    let mut i = 0;

    while i < data.len() {
        let lead = data[i];
        match lead {
            0x00..=0xBF => {
                out[i] = lead;
                i += 1;
            }
            0xC1..=0xCF => {
                let next = *data.get(i + 1)?;
                out[i] = lead.wrapping_sub(key);
                out[i + 1] = next;
                i += 2;
            }
            0xE1..=0xED => {
                let (second, third) = (*data.get(i + 1)?, *data.get(i + 2)?);
                if lead == 0xE1 && second == 0xBF {
                    let value = u32::from_be_bytes([0, lead, second, third]) + 0xC0C0;
                    let [_, high, mid, low] = value.to_be_bytes();
                    out[i] = high.wrapping_sub(key);
                    out[i + 1] = mid.wrapping_sub(key);
                    out[i + 2] = low;
                } else {
                    out[i] = lead.wrapping_sub(key);
                    out[i + 1] = second.wrapping_sub(key);
                    out[i + 2] = third;
                }
                i += 3;
            }
            _ => return None,
        }
    }

    for b in &mut out {
        *b = b.wrapping_add(key);
    }
    Some(out)
}

/// A decoded string localizer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StringLocalizerBlock {
    pub file_size: u64,
    /// String hashes in the order of the bank's strings.
    pub string_hashes: Vec<u32>,
    /// The English string bank.
    pub string_bank: ReferenceHash,
}

impl StringLocalizerBlock {
    pub const MIN_SIZE: usize = 0x1c;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE {
            return Err(Error::UnexpectedPayloadSize {
                expected: Self::MIN_SIZE,
                actual: data.len(),
            });
        }

        let mut reader = BinaryReader::new(data);
        let file_size = reader.read_u64()?;
        let table = TablePointer::read(&mut reader)?;
        let string_bank = ReferenceHash::from_raw(reader.read_u32()?);

        let string_hashes = table
            .positions(4, data.len())?
            .map(|position| BinaryReader::new_at(data, position).read_u32())
            .collect::<tiger_common::Result<Vec<_>>>()?;

        Ok(Self {
            file_size,
            string_hashes,
            string_bank,
        })
    }

    /// Pair each hash with the bank string at the same position. Hashes
    /// without a decodable string are left out.
    pub fn localize(&self, bank: &StringBank) -> FxHashMap<u32, String> {
        self.string_hashes
            .iter()
            .zip(&bank.strings)
            .filter_map(|(&hash, text)| Some((hash, text.clone()?)))
            .collect()
    }
}

/// One row of a string indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IndexedLocalizer {
    pub hash: u32,
    /// May be a sentinel when no localizer exists for the hash.
    pub localizer: ReferenceHash,
}

/// Top-level index tying hashes to string localizers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StringIndexerBlock {
    pub file_size: u64,
    pub entries: Vec<IndexedLocalizer>,
}

impl StringIndexerBlock {
    pub const MIN_SIZE: usize = 0x18;
    const ENTRY_STRIDE: usize = 8;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE {
            return Err(Error::UnexpectedPayloadSize {
                expected: Self::MIN_SIZE,
                actual: data.len(),
            });
        }

        let mut reader = BinaryReader::new(data);
        let file_size = reader.read_u64()?;
        let table = TablePointer::read(&mut reader)?;

        let entries = table
            .positions(Self::ENTRY_STRIDE, data.len())?
            .map(|position| {
                let mut row = BinaryReader::new_at(data, position);
                Ok(IndexedLocalizer {
                    hash: row.read_u32()?,
                    localizer: ReferenceHash::from_raw(row.read_u32()?),
                })
            })
            .collect::<tiger_common::Result<Vec<_>>>()?;

        Ok(Self { file_size, entries })
    }

    /// The localizer indexed under `hash`, if it has one.
    pub fn localizer_for(&self, hash: u32) -> Option<ReferenceHash> {
        self.entries
            .iter()
            .find(|entry| entry.hash == hash)
            .and_then(|entry| entry.localizer.valid())
    }

    /// Localizers referenced by the index, sentinels excluded.
    pub fn localizers(&self) -> impl Iterator<Item = ReferenceHash> + '_ {
        self.entries.iter().filter_map(|entry| entry.localizer.valid())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn put(data: &mut Vec<u8>, at: usize, bytes: &[u8]) {
        if data.len() < at + bytes.len() {
            data.resize(at + bytes.len(), 0);
        }
        data[at..at + bytes.len()].copy_from_slice(bytes);
    }

    fn put_pointer(data: &mut Vec<u8>, at: usize, count: u64, header: usize) {
        put(data, at, &count.to_le_bytes());
        put(data, at + 8, &((header - (at + 8)) as u64).to_le_bytes());
    }

    fn obfuscate(text: &str, key: u8) -> Vec<u8> {
        text.bytes().map(|b| b.wrapping_sub(key)).collect()
    }

    /// Build a bank from `(stored bytes, key)` parts grouped into strings.
    pub(crate) fn bank_bytes(strings: &[Vec<(Vec<u8>, u16)>]) -> Vec<u8> {
        let parts: Vec<&(Vec<u8>, u16)> = strings.iter().flatten().collect();

        let parts_header = 0x60;
        let parts_start = parts_header + 0x10;
        let strings_header = parts_start + parts.len() * PART_STRIDE;
        let strings_start = strings_header + 0x10;
        let mut blob = strings_start + strings.len() * STRING_STRIDE;

        let mut data = vec![0u8; blob];
        put_pointer(&mut data, 0x08, parts.len() as u64, parts_header);
        put_pointer(&mut data, 0x48, strings.len() as u64, strings_header);

        for (i, (bytes, key)) in parts.iter().enumerate() {
            let element = parts_start + i * PART_STRIDE;
            put(&mut data, element + 8, &((blob - (element + 8)) as u32).to_le_bytes());
            put(&mut data, element + 20, &(bytes.len() as u16).to_le_bytes());
            put(&mut data, element + 22, &(bytes.len() as u16).to_le_bytes());
            put(&mut data, element + 24, &key.to_le_bytes());
            put(&mut data, blob, bytes);
            blob += bytes.len();
        }

        for (i, string) in strings.iter().enumerate() {
            let element = strings_start + i * STRING_STRIDE;
            put(&mut data, element + 8, &(string.len() as i32).to_le_bytes());
        }

        let size = data.len() as u32;
        put(&mut data, 0, &size.to_le_bytes());
        data
    }

    pub(crate) fn simple_bank(strings: &[&str]) -> Vec<u8> {
        let grouped: Vec<Vec<(Vec<u8>, u16)>> = strings
            .iter()
            .map(|s| vec![(obfuscate(s, 5), 5)])
            .collect();
        bank_bytes(&grouped)
    }

    pub(crate) fn localizer_bytes(hashes: &[u32], bank: ReferenceHash) -> Vec<u8> {
        let mut data = vec![0u8; 0x20];
        put_pointer(&mut data, 0x08, hashes.len() as u64, 0x20);
        put(&mut data, 0x18, &bank.raw().to_le_bytes());
        data.resize(0x30, 0);
        for hash in hashes {
            data.extend(hash.to_le_bytes());
        }
        let size = data.len() as u64;
        put(&mut data, 0, &size.to_le_bytes());
        data
    }

    pub(crate) fn indexer_bytes(rows: &[(u32, ReferenceHash)]) -> Vec<u8> {
        let mut data = vec![0u8; 0x20];
        put_pointer(&mut data, 0x08, rows.len() as u64, 0x20);
        data.resize(0x30, 0);
        for (hash, localizer) in rows {
            data.extend(hash.to_le_bytes());
            data.extend(localizer.raw().to_le_bytes());
        }
        let size = data.len() as u64;
        put(&mut data, 0, &size.to_le_bytes());
        data
    }

    #[test]
    fn test_deobfuscate_ascii() {
        assert_eq!(deobfuscate(&obfuscate("Guardian", 3), 3).unwrap(), b"Guardian");
    }

    #[test]
    fn test_deobfuscate_two_byte() {
        // "é" is C3 A9; the lead byte is stored as is, the trailer minus key
        let stored = [0xC3, 0xA9 - 1];
        assert_eq!(deobfuscate(&stored, 1).unwrap(), "é".as_bytes());
    }

    #[test]
    fn test_deobfuscate_three_byte() {
        // "€" is E2 82 AC
        let stored = [0xE2, 0x82, 0xAC - 2];
        assert_eq!(deobfuscate(&stored, 2).unwrap(), "€".as_bytes());
    }

    #[test]
    fn test_deobfuscate_e1bf() {
        let out = deobfuscate(&[0xE1, 0xBF, 0x10], 0).unwrap();
        // 0xE1BF10 + 0xC0C0 = 0xE27FD0
        assert_eq!(out, [0xE2, 0x7F, 0xD0]);
    }

    #[test]
    fn test_deobfuscate_unsupported() {
        assert!(deobfuscate(&[0x41, 0xF0, 0x41], 0).is_none());
        assert!(deobfuscate(&[0xC0, 0x41], 0).is_none());
        assert!(deobfuscate(&[0xC3], 0).is_none());
    }

    #[test]
    fn test_bank() {
        let bank = StringBank::parse(&simple_bank(&["Hello", "  Traveler ", ""])).unwrap();
        assert_eq!(bank.len(), 3);
        assert_eq!(bank.get(0), Some("Hello"));
        assert_eq!(bank.get(1), Some("Traveler"));
        assert_eq!(bank.get(2), Some(""));
        assert_eq!(bank.get(3), None);
    }

    #[test]
    fn test_bank_multipart_and_unsupported() {
        let data = bank_bytes(&[
            vec![(obfuscate("Eyes ", 7), 7), (obfuscate("up", 9), 9)],
            vec![(vec![0xF8, 0x00], 0)],
            vec![],
        ]);
        let bank = StringBank::parse(&data).unwrap();
        assert_eq!(bank.get(0), Some("Eyes up"));
        assert_eq!(bank.strings[1], None);
        assert_eq!(bank.get(2), Some(""));
    }

    #[test]
    fn test_bank_runs_out_of_parts() {
        let mut data = simple_bank(&["a"]);
        let count_at = 0x60 + 0x10 + PART_STRIDE + 0x10 + 8;
        data[count_at..count_at + 4].copy_from_slice(&2i32.to_le_bytes());
        assert!(matches!(
            StringBank::parse(&data),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_bank_too_small() {
        assert!(matches!(
            StringBank::parse(&[0u8; 0x20]),
            Err(Error::UnexpectedPayloadSize { .. })
        ));
    }

    #[test]
    fn test_localizer() {
        let bank_ref = ReferenceHash::new(0x33, 4, 0);
        let block =
            StringLocalizerBlock::parse(&localizer_bytes(&[0xAAAA, 0xBBBB, 0xCCCC], bank_ref))
                .unwrap();
        assert_eq!(block.string_hashes, vec![0xAAAA, 0xBBBB, 0xCCCC]);
        assert_eq!(block.string_bank, bank_ref);

        let bank = StringBank::parse(&bank_bytes(&[
            vec![(obfuscate("first", 2), 2)],
            vec![(vec![0xFF], 0)],
        ]))
        .unwrap();
        let map = block.localize(&bank);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&0xAAAA).map(String::as_str), Some("first"));
    }

    #[test]
    fn test_localizer_table_past_end() {
        let mut data = localizer_bytes(&[1, 2], ReferenceHash::NONE);
        data.truncate(data.len() - 2);
        assert!(matches!(
            StringLocalizerBlock::parse(&data),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_indexer() {
        let first = ReferenceHash::new(0x12, 40, 0);
        let second = ReferenceHash::new(0x13, 2, 0);
        let data = indexer_bytes(&[
            (0x1000, first),
            (0x2000, ReferenceHash::NONE),
            (0x3000, second),
        ]);
        let block = StringIndexerBlock::parse(&data).unwrap();
        assert_eq!(block.file_size, data.len() as u64);
        assert_eq!(block.entries.len(), 3);
        assert_eq!(block.entries[1].hash, 0x2000);
        assert!(block.entries[1].localizer.is_none());

        assert_eq!(block.localizer_for(0x1000), Some(first));
        assert_eq!(block.localizer_for(0x2000), None);
        assert_eq!(block.localizer_for(0x4000), None);
        assert_eq!(block.localizers().collect::<Vec<_>>(), vec![first, second]);
    }

    #[test]
    fn test_empty_indexer() {
        let block = StringIndexerBlock::parse(&indexer_bytes(&[])).unwrap();
        assert!(block.entries.is_empty());
        assert_eq!(block.localizers().count(), 0);
    }

    #[test]
    fn test_indexer_truncated() {
        let mut data = indexer_bytes(&[(1, ReferenceHash::new(1, 1, 0)), (2, ReferenceHash::NONE)]);
        data.truncate(data.len() - 3);
        assert!(matches!(
            StringIndexerBlock::parse(&data),
            Err(Error::MalformedPayload(_))
        ));
        assert!(matches!(
            StringIndexerBlock::parse(&data[..0x10]),
            Err(Error::UnexpectedPayloadSize { expected: 0x18, actual: 0x10 })
        ));
    }
}
