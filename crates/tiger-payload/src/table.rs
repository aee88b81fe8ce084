//! Self-relative table pointers.
//!
//! Tagged blocks describe their arrays with a 16-byte `{count, offset}` pair.
//! The offset is relative to its own position and lands on a 16-byte array
//! header; elements follow that header.

use std::ops::Range;

use tiger_common::BinaryReader;

use crate::{Error, Result};

/// A decoded `{count, offset}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TablePointer {
    pub count: u64,
    /// Absolute position of the array header.
    pub offset: usize,
}

impl TablePointer {
    pub const SIZE: usize = 16;
    const ARRAY_HEADER: usize = 0x10;

    /// Read a pointer at the reader's position.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let count = reader.read_u64()?;
        let offset = reader.read_relative_offset()?;
        Ok(Self { count, offset })
    }

    /// Position of the first element.
    #[inline]
    pub fn elements_start(&self) -> usize {
        self.offset + Self::ARRAY_HEADER
    }

    /// Byte range covered by `count` elements of `stride` bytes, checked
    /// against a payload of `len` bytes.
    pub fn elements(&self, stride: usize, len: usize) -> Result<Range<usize>> {
        let start = self.elements_start();
        usize::try_from(self.count)
            .ok()
            .and_then(|count| count.checked_mul(stride))
            .and_then(|size| start.checked_add(size))
            .filter(|&end| end <= len)
            .map(|end| start..end)
            .ok_or_else(|| {
                Error::MalformedPayload(format!(
                    "table of {} x {} bytes at {:#x} exceeds {:#x}-byte payload",
                    self.count, stride, start, len
                ))
            })
    }

    /// Element positions, after checking that the whole table fits.
    pub fn positions(&self, stride: usize, len: usize) -> Result<impl Iterator<Item = usize>> {
        Ok(self.elements(stride, len)?.step_by(stride))
    }
}
