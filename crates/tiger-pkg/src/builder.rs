//! Package writer.
//!
//! Lays a package out as header, entry table, block table, block data and the
//! trailing 0xDEAFBEEF marker, filling in every offset, count and digest.

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use tiger_common::hash;
use zerocopy::IntoBytes;

use crate::block::{Block, BlockFlags};
use crate::entry::Entry;
use crate::header::Header;

/// Marker written after the block data.
pub const SENTINEL: u32 = 0xDEAF_BEEF;

/// Builder for package files.
#[derive(Debug, Clone, Default)]
pub struct PackageBuilder {
    header: Header,
    entries: Vec<Entry>,
    blocks: Vec<(Block, Vec<u8>)>,
}

impl PackageBuilder {
    /// Create a builder for the given package id.
    pub fn new(package_id: u16) -> Self {
        Self {
            header: Header {
                package_id,
                ..Header::default()
            },
            ..Self::default()
        }
    }

    /// Identity fields (version, platform, patch id, language...) are taken
    /// from this header; table offsets, counts, digest and size are computed.
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Append an entry and return its index.
    pub fn push_entry(&mut self, entry: Entry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Append a block holding `stored` bytes exactly as they should appear on
    /// disk, and return its index.
    pub fn push_block(
        &mut self,
        stored: Vec<u8>,
        flags: BlockFlags,
        hash: [u8; 20],
        gcm_tag: [u8; 16],
    ) -> usize {
        let block = Block {
            offset: 0,
            size: stored.len() as u32,
            patch_id: self.header.patch_id,
            flags,
            hash,
            gcm_tag,
        };
        self.blocks.push((block, stored));
        self.blocks.len() - 1
    }

    /// Append an uncompressed, unencrypted block with its SHA-1.
    pub fn push_plain_block(&mut self, data: Vec<u8>) -> usize {
        let digest = hash::sha1(&data);
        self.push_block(data, BlockFlags::empty(), digest, [0; 16])
    }

    /// Store `data` in a fresh plain block and add an entry covering it.
    /// Returns the entry index.
    pub fn push_file(&mut self, file_type: u8, file_subtype: u8, data: Vec<u8>) -> usize {
        let file_size = data.len() as u32;
        let block = self.push_plain_block(data);
        self.push_entry(Entry {
            file_type,
            file_subtype,
            starting_block: block as u16,
            file_size,
            ..Entry::default()
        })
    }

    /// Build the package and return the raw bytes.
    pub fn build(&self) -> io::Result<Vec<u8>> {
        let mut output = Vec::new();
        self.write_to(&mut output)?;
        Ok(output)
    }

    /// Write the package to a writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let entry_table: Vec<u8> = self.entries.iter().flat_map(|e| e.to_bytes()).collect();

        let entry_table_offset = Header::SIZE;
        let block_table_offset = entry_table_offset + entry_table.len();
        let data_offset = block_table_offset + self.blocks.len() * Block::RECORD_SIZE;

        let mut cursor = data_offset;
        let blocks: Vec<Block> = self
            .blocks
            .iter()
            .map(|(block, stored)| {
                let placed = Block {
                    offset: cursor as u32,
                    ..block.clone()
                };
                cursor += stored.len();
                placed
            })
            .collect();

        let sentinel_offset = cursor;
        let package_size = sentinel_offset + 4;

        let header = Header {
            entry_table_offset: entry_table_offset as u32,
            entry_table_hash: hash::sha1(&entry_table),
            entry_table_count: self.entries.len() as u32,
            block_table_count: blocks.len() as u32,
            block_table_offset: block_table_offset as u32,
            sentinel_offset: sentinel_offset as u32,
            package_size: package_size as u64,
            ..self.header.clone()
        };

        header.write_to(writer)?;
        writer.write_all(&entry_table)?;
        for block in &blocks {
            writer.write_all(block.to_record().as_bytes())?;
        }
        for (_, stored) in &self.blocks {
            writer.write_all(stored)?;
        }
        writer.write_u32::<LittleEndian>(SENTINEL)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::decode_block_table;
    use crate::entry::decode_entry_table;

    #[test]
    fn test_layout() {
        let mut builder = PackageBuilder::new(0x42);
        builder.header_mut().patch_id = 3;
        builder.push_file(8, 0, vec![1, 2, 3, 4]);
        builder.push_file(8, 0, vec![5, 6]);
        let bytes = builder.build().unwrap();

        let header = Header::parse(&bytes).unwrap();
        assert_eq!(header.package_id, 0x42);
        assert_eq!(header.patch_id, 3);
        assert_eq!(header.entry_table_offset as usize, Header::SIZE);
        assert_eq!(header.block_table_offset as usize, Header::SIZE + 32);
        assert_eq!(header.package_size as usize, bytes.len());
        assert_eq!(
            &bytes[header.sentinel_offset as usize..],
            &SENTINEL.to_le_bytes()
        );

        let entries = decode_entry_table(&header, &bytes).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].starting_block, 1);
        assert_eq!(entries[1].file_size, 2);

        let blocks = decode_block_table(&header, &bytes).unwrap();
        assert_eq!(blocks[0].patch_id, 3);
        assert_eq!(&bytes[blocks[1].range().start as usize..][..2], &[5, 6]);
        assert!(blocks[1].has_hash());
    }

    #[test]
    fn test_empty_package() {
        let bytes = PackageBuilder::new(1).build().unwrap();
        assert_eq!(bytes.len(), Header::SIZE + 4);
        let header = Header::parse(&bytes).unwrap();
        assert_eq!(header.entry_table_count, 0);
        assert!(decode_entry_table(&header, &bytes).unwrap().is_empty());
    }
}
