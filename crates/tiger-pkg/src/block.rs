//! Block table records.

use bitflags::bitflags;
use tiger_common::BinaryReader;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::header::Header;
use crate::{Error, Result};

bitflags! {
    /// Block storage flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BlockFlags: u16 {
        const COMPRESSED = 0x1;
        const ENCRYPTED = 0x2;
        /// Decrypt with the alternate key.
        const ALT_KEY = 0x4;
    }
}

/// On-disk block record.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct BlockRecord {
    pub offset: u32,
    pub size: u32,
    pub patch_id: u16,
    pub flags: u16,
    pub hash: [u8; 20],
    pub gcm_tag: [u8; 16],
}

/// A decoded block table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Absolute offset of the stored bytes within the package.
    pub offset: u32,
    /// Stored (possibly encrypted/compressed) size.
    pub size: u32,
    pub patch_id: u16,
    /// Raw flag word; unknown bits are kept.
    pub flags: BlockFlags,
    /// SHA-1 of the decoded payload, all zeros when absent.
    pub hash: [u8; 20],
    /// Only meaningful when encrypted.
    pub gcm_tag: [u8; 16],
}

impl Block {
    /// Size of one record in bytes.
    pub const RECORD_SIZE: usize = std::mem::size_of::<BlockRecord>();

    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.flags.contains(BlockFlags::COMPRESSED)
    }

    #[inline]
    pub fn is_encrypted(&self) -> bool {
        self.flags.contains(BlockFlags::ENCRYPTED)
    }

    #[inline]
    pub fn uses_alt_key(&self) -> bool {
        self.flags.contains(BlockFlags::ALT_KEY)
    }

    /// Whether a content hash was recorded for this block.
    #[inline]
    pub fn has_hash(&self) -> bool {
        self.hash.iter().any(|&b| b != 0)
    }

    /// Byte range of the stored data within the package.
    #[inline]
    pub fn range(&self) -> std::ops::Range<u64> {
        let start = self.offset as u64;
        start..start + self.size as u64
    }

    /// Convert to the on-disk record.
    pub fn to_record(&self) -> BlockRecord {
        BlockRecord {
            offset: self.offset,
            size: self.size,
            patch_id: self.patch_id,
            flags: self.flags.bits(),
            hash: self.hash,
            gcm_tag: self.gcm_tag,
        }
    }
}

impl From<BlockRecord> for Block {
    fn from(record: BlockRecord) -> Self {
        Self {
            offset: record.offset,
            size: record.size,
            patch_id: record.patch_id,
            flags: BlockFlags::from_bits_retain(record.flags),
            hash: record.hash,
            gcm_tag: record.gcm_tag,
        }
    }
}

/// Decode the block table described by `header`.
///
/// `data` is the whole package buffer.
pub fn decode_block_table(header: &Header, data: &[u8]) -> Result<Vec<Block>> {
    let range = header.block_table_range();
    if range.end > data.len() as u64 {
        return Err(Error::MalformedBlockTable(format!(
            "table {:#x}..{:#x} outside of {:#x}-byte buffer",
            range.start,
            range.end,
            data.len()
        )));
    }

    let mut reader = BinaryReader::new_at(data, range.start as usize);
    let mut blocks = Vec::with_capacity(header.block_table_count as usize);

    for index in 0..header.block_table_count as usize {
        let block = Block::from(reader.read_struct::<BlockRecord>()?);
        let end = block.range().end;
        if end > header.package_size {
            return Err(Error::MalformedBlockTable(format!(
                "block {} ends at {:#x}, past package size {:#x}",
                index, end, header.package_size
            )));
        }
        blocks.push(block);
    }

    log::debug!(
        "decoded {} blocks for package {:#06x}",
        blocks.len(),
        header.package_id
    );

    Ok(blocks)
}
