//! Cross-package entry references.
//!
//! A [`ReferenceHash`] packs a package id, an entry index and an opaque id into
//! one u32:
//!
//! ```text
//! [31 ........... 19][18 ....... 9][8 ...... 0]
//!     entry_index       package_id   unknown_id
//! ```

use std::fmt;

const UNKNOWN_BITS: u32 = 9;
const PACKAGE_BITS: u32 = 10;
const INDEX_BITS: u32 = 13;

const UNKNOWN_MASK: u32 = (1 << UNKNOWN_BITS) - 1;
const PACKAGE_MASK: u32 = (1 << PACKAGE_BITS) - 1;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;

const PACKAGE_SHIFT: u32 = UNKNOWN_BITS;
const INDEX_SHIFT: u32 = UNKNOWN_BITS + PACKAGE_BITS;

/// A 32-bit lookup key pointing at an entry in this or another package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReferenceHash(u32);

impl ReferenceHash {
    /// Largest representable package id.
    pub const MAX_PACKAGE_ID: u16 = PACKAGE_MASK as u16;
    /// Largest representable entry index.
    pub const MAX_ENTRY_INDEX: u16 = INDEX_MASK as u16;
    /// Largest representable unknown id.
    pub const MAX_UNKNOWN_ID: u16 = UNKNOWN_MASK as u16;

    /// All-ones marker used for unset references.
    pub const NONE: Self = Self(u32::MAX);
    /// FNV-1a offset basis, the other unset-reference marker.
    pub const EMPTY_HASH: Self = Self(tiger_common::hash::FNV1A32_OFFSET_BASIS);

    /// Wrap a raw value. Every u32 is a syntactically valid reference.
    #[inline]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Pack the three components. Values wider than their field are masked.
    #[inline]
    pub const fn new(package_id: u16, entry_index: u16, unknown_id: u16) -> Self {
        Self(
            ((entry_index as u32 & INDEX_MASK) << INDEX_SHIFT)
                | ((package_id as u32 & PACKAGE_MASK) << PACKAGE_SHIFT)
                | (unknown_id as u32 & UNKNOWN_MASK),
        )
    }

    /// Get the raw value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn package_id(self) -> u16 {
        ((self.0 >> PACKAGE_SHIFT) & PACKAGE_MASK) as u16
    }

    #[inline]
    pub const fn entry_index(self) -> u16 {
        ((self.0 >> INDEX_SHIFT) & INDEX_MASK) as u16
    }

    #[inline]
    pub const fn unknown_id(self) -> u16 {
        (self.0 & UNKNOWN_MASK) as u16
    }

    /// Whether this holds one of the "no reference" markers.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == Self::NONE.0 || self.0 == Self::EMPTY_HASH.0
    }

    /// `None` for the unset markers.
    #[inline]
    pub const fn valid(self) -> Option<Self> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<u32> for ReferenceHash {
    fn from(value: u32) -> Self {
        Self::from_raw(value)
    }
}

impl fmt::Display for ReferenceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}-{:04x} ({:08X})",
            self.package_id(),
            self.entry_index(),
            self.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_bit_positions() {
        let r = ReferenceHash::from_raw(0b1_0000000001_000000011);
        assert_eq!(r.unknown_id(), 3);
        assert_eq!(r.package_id(), 1);
        assert_eq!(r.entry_index(), 1);
    }

    #[test]
    fn test_maximums() {
        let r = ReferenceHash::new(
            ReferenceHash::MAX_PACKAGE_ID,
            ReferenceHash::MAX_ENTRY_INDEX,
            ReferenceHash::MAX_UNKNOWN_ID,
        );
        assert_eq!(r.raw(), u32::MAX);
        assert!(r.is_none());
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(ReferenceHash::from_raw(0x811C9DC5).valid(), None);
        assert!(ReferenceHash::from_raw(0x1234).valid().is_some());
    }

    #[quickcheck]
    fn raw_roundtrip(raw: u32) -> bool {
        let r = ReferenceHash::from_raw(raw);
        ReferenceHash::new(r.package_id(), r.entry_index(), r.unknown_id()) == r
    }

    #[quickcheck]
    fn parts_roundtrip(package_id: u16, entry_index: u16, unknown_id: u16) -> bool {
        let package_id = package_id & ReferenceHash::MAX_PACKAGE_ID;
        let entry_index = entry_index & ReferenceHash::MAX_ENTRY_INDEX;
        let unknown_id = unknown_id & ReferenceHash::MAX_UNKNOWN_ID;
        let r = ReferenceHash::new(package_id, entry_index, unknown_id);
        r.package_id() == package_id && r.entry_index() == entry_index && r.unknown_id() == unknown_id
    }
}
