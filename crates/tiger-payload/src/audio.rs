//! Audio banks (class 0x808097B8).
//!
//! The bank layout itself is not decoded. Each dialogue line is a 0x68-byte
//! record that follows a `0x80809733` class marker, so records are found by
//! scanning for that marker.

use memchr::memmem;
use tiger_common::BinaryReader;
use tiger_pkg::ReferenceHash;

use crate::{Error, Result};

/// Little-endian `0x80809733`.
pub const AUDIO_ENTRY_MARKER: [u8; 4] = [0x33, 0x97, 0x80, 0x80];

/// Reference to the container holding the spoken audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AudioSlot {
    pub reference: ReferenceHash,
    pub count: u32,
}

/// Reference to the subtitle's string localizer and the line's hash in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SubtitleSlot {
    pub localizer: ReferenceHash,
    pub string_hash: u32,
}

/// One dialogue line of an audio bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AudioMetadataBlock {
    pub audio_hash: u32,
    pub conversation_hash: u32,
    pub audio: [AudioSlot; 2],
    pub subtitles: [SubtitleSlot; 2],
    pub narrator_string_hash: u32,
}

impl AudioMetadataBlock {
    pub const SIZE: usize = 0x68;

    /// Decode one record. The slice must be exactly [`Self::SIZE`] bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() != Self::SIZE {
            return Err(Error::UnexpectedPayloadSize {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }

        let at = |offset| BinaryReader::new_at(data, offset);
        let reference = |offset| -> Result<ReferenceHash> {
            Ok(ReferenceHash::from_raw(at(offset).read_u32()?))
        };

        Ok(Self {
            audio_hash: at(0x00).read_u32()?,
            conversation_hash: at(0x04).read_u32()?,
            audio: [
                AudioSlot {
                    reference: reference(0x18)?,
                    count: at(0x1c).read_u32()?,
                },
                AudioSlot {
                    reference: reference(0x38)?,
                    count: at(0x3c).read_u32()?,
                },
            ],
            subtitles: [
                SubtitleSlot {
                    localizer: reference(0x28)?,
                    string_hash: at(0x2c).read_u32()?,
                },
                SubtitleSlot {
                    localizer: reference(0x48)?,
                    string_hash: at(0x4c).read_u32()?,
                },
            ],
            narrator_string_hash: at(0x5c).read_u32()?,
        })
    }

    /// First audio slot holding a real reference.
    pub fn audio(&self) -> Option<&AudioSlot> {
        self.audio.iter().find(|slot| !slot.reference.is_none())
    }

    /// Number of audio files for the preferred slot; zero when neither slot
    /// is usable.
    pub fn audio_count(&self) -> u32 {
        if self.audio.iter().all(|slot| slot.count == 0) {
            return 0;
        }
        self.audio().map_or(0, |slot| slot.count)
    }

    /// First subtitle slot holding a real reference.
    pub fn subtitle(&self) -> Option<&SubtitleSlot> {
        self.subtitles.iter().find(|slot| !slot.localizer.is_none())
    }

    /// All non-sentinel references embedded in the record.
    pub fn references(&self) -> impl Iterator<Item = ReferenceHash> + '_ {
        self.audio
            .iter()
            .map(|slot| slot.reference)
            .chain(self.subtitles.iter().map(|slot| slot.localizer))
            .filter_map(ReferenceHash::valid)
    }
}

/// The dialogue lines of an audio bank, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AudioBank {
    pub entries: Vec<AudioMetadataBlock>,
}

impl AudioBank {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let entries = memmem::find_iter(data, &AUDIO_ENTRY_MARKER)
            .map(|marker| {
                let start = marker + AUDIO_ENTRY_MARKER.len();
                let record = data.get(start..start + AudioMetadataBlock::SIZE).ok_or_else(|| {
                    Error::MalformedPayload(format!(
                        "audio record at {:#x} runs past the {:#x}-byte bank",
                        start,
                        data.len()
                    ))
                })?;
                AudioMetadataBlock::parse(record)
            })
            .collect::<Result<Vec<_>>>()?;

        log::trace!("found {} audio records", entries.len());
        Ok(Self { entries })
    }

    /// Lines that reference at least one audio file.
    pub fn playable(&self) -> impl Iterator<Item = &AudioMetadataBlock> {
        self.entries.iter().filter(|entry| entry.audio_count() > 0)
    }
}
