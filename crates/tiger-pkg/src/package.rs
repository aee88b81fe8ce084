//! Package reader.
//!
//! A [`Package`] owns its bytes and the tables decoded from them. It is
//! immutable after construction, so one instance can be shared between
//! threads and extracted from concurrently.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::block::{decode_block_table, Block};
use crate::entry::{decode_entry_table, validate_block_indices, Entry};
use crate::header::{Header, Language};
use crate::{Error, Result};

enum PackageData {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl PackageData {
    #[inline]
    fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Owned(data) => data,
            Self::Mapped(mmap) => mmap,
        }
    }
}

/// A parsed package.
pub struct Package {
    data: PackageData,
    name: String,
    header: Header,
    entries: Vec<Entry>,
    blocks: Vec<Block>,
}

impl Package {
    /// Memory-map and parse a package file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Self::parse(PackageData::Mapped(mmap), name)
    }

    /// Parse a package held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::parse(PackageData::Owned(data), String::new())
    }

    fn parse(data: PackageData, name: String) -> Result<Self> {
        let bytes = data.as_bytes();
        let header = Header::parse(bytes)?;
        let entries = decode_entry_table(&header, bytes)?;
        let blocks = decode_block_table(&header, bytes)?;
        validate_block_indices(&entries, blocks.len())?;

        log::debug!(
            "opened package {:#06x} patch {} ({} entries, {} blocks)",
            header.package_id,
            header.patch_id,
            entries.len(),
            blocks.len()
        );

        Ok(Self {
            data,
            name,
            header,
            entries,
            blocks,
        })
    }

    /// File name for packages opened from disk, empty otherwise.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[inline]
    pub fn id(&self) -> u16 {
        self.header.package_id
    }

    #[inline]
    pub fn patch_id(&self) -> u16 {
        self.header.patch_id
    }

    #[inline]
    pub fn build_id(&self) -> u32 {
        self.header.build_id
    }

    #[inline]
    pub fn version(&self) -> u16 {
        self.header.version
    }

    #[inline]
    pub fn platform(&self) -> u16 {
        self.header.platform
    }

    #[inline]
    pub fn language(&self) -> Option<Language> {
        self.header.language()
    }

    /// All entries in table order.
    #[inline]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[inline]
    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// All blocks in table order.
    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// The raw package bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.data.as_bytes()
    }

    /// The stored (still encrypted/compressed) bytes of a block.
    pub fn block_data(&self, block: &Block) -> Result<&[u8]> {
        let range = block.range();
        self.data()
            .get(range.start as usize..range.end as usize)
            .ok_or_else(|| {
                Error::MalformedBlockTable(format!(
                    "block data {:#x}..{:#x} outside of package",
                    range.start, range.end
                ))
            })
    }

    /// Iterate over entries matching a type and subtype, with their indices.
    pub fn entries_of_kind(
        &self,
        file_type: u8,
        file_subtype: u8,
    ) -> impl Iterator<Item = (usize, &Entry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.file_type == file_type && e.file_subtype == file_subtype)
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("name", &self.name)
            .field("id", &self.header.package_id)
            .field("patch_id", &self.header.patch_id)
            .field("entries", &self.entries.len())
            .field("blocks", &self.blocks.len())
            .finish()
    }
}
