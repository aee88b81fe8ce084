//! Block data pipeline.
//!
//! Turns the stored bytes of one or more blocks into the contiguous payload of
//! an entry: decrypt, decompress, verify, then slice.

use std::borrow::Cow;
use std::sync::Arc;

use tiger_common::hash;

use crate::crypto::{BlockCipher, KeySelector};
use crate::decompress::Decompressor;
use crate::package::Package;
use crate::{error, Error, Result};

/// Pipeline behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Compare each decoded block with its stored SHA-1.
    pub verify_block_hashes: bool,
    /// Turn a block hash mismatch into an error instead of a warning.
    pub strict: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            verify_block_hashes: true,
            strict: false,
        }
    }
}

/// Extracts entry payloads from packages.
///
/// Capabilities are optional; a block that needs a missing one fails with
/// [`Error::DecryptionFailed`] or [`Error::DecompressionFailed`].
#[derive(Clone, Default)]
pub struct BlockPipeline {
    decompressor: Option<Arc<dyn Decompressor>>,
    cipher: Option<Arc<dyn BlockCipher>>,
    options: PipelineOptions,
}

impl BlockPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decompressor<D: Decompressor + 'static>(mut self, decompressor: D) -> Self {
        self.decompressor = Some(Arc::new(decompressor));
        self
    }

    pub fn with_cipher<C: BlockCipher + 'static>(mut self, cipher: C) -> Self {
        self.cipher = Some(Arc::new(cipher));
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    pub fn verify_block_hashes(mut self, verify: bool) -> Self {
        self.options.verify_block_hashes = verify;
        self
    }

    #[inline]
    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Decode one block of `package` to its plain payload.
    ///
    /// Plain blocks are borrowed straight from the package buffer.
    pub fn decode_block<'a>(&self, package: &'a Package, index: usize) -> Result<Cow<'a, [u8]>> {
        let block = package.block(index).ok_or_else(|| {
            Error::MalformedBlockTable(format!(
                "block {} requested, table has {}",
                index,
                package.blocks().len()
            ))
        })?;
        let stored = package.block_data(block)?;

        log::trace!(
            "block {} of {:#06x}: {} bytes, flags {:?}",
            index,
            package.id(),
            stored.len(),
            block.flags
        );

        let mut data = Cow::Borrowed(stored);

        if block.is_encrypted() {
            let cipher = self.cipher.as_ref().ok_or_else(|| Error::DecryptionFailed {
                block: index,
                source: "no cipher configured".into(),
            })?;
            let selector = KeySelector {
                package_id: package.id(),
                alternate: block.uses_alt_key(),
            };
            let plain = cipher
                .decrypt(&data, &block.gcm_tag, selector)
                .map_err(|source| Error::DecryptionFailed {
                    block: index,
                    source,
                })?;
            data = Cow::Owned(plain);
        }

        if block.is_compressed() {
            let decompressor =
                self.decompressor
                    .as_ref()
                    .ok_or_else(|| Error::DecompressionFailed {
                        block: index,
                        source: "no decompressor configured".into(),
                    })?;
            let plain = decompressor
                .decompress(&data)
                .map_err(|source| Error::DecompressionFailed {
                    block: index,
                    source,
                })?;
            data = Cow::Owned(plain);
        }

        if self.options.verify_block_hashes && block.has_hash() {
            let actual = hash::sha1(&data);
            if actual != block.hash {
                if self.options.strict {
                    return Err(Error::BlockHashMismatch { block: index });
                }
                log::warn!(
                    "block {} of {:#06x} hash mismatch: expected {}, got {}",
                    index,
                    package.id(),
                    error::hex(&block.hash),
                    error::hex(&actual)
                );
            }
        }

        Ok(data)
    }

    /// Extract the payload of entry `entry_index`. The result is exactly the
    /// entry's file size.
    pub fn extract(&self, package: &Package, entry_index: usize) -> Result<Vec<u8>> {
        let entry = package
            .entry(entry_index)
            .ok_or(Error::EntryNotFound(entry_index))?;

        let size = entry.file_size as usize;
        let mut output = Vec::with_capacity(size);
        let mut block_index = entry.starting_block as usize;
        let mut offset = entry.starting_block_offset as usize;

        while output.len() < size {
            if block_index >= package.blocks().len() {
                return Err(Error::EntryOutOfBounds {
                    entry: entry_index,
                    reason: format!(
                        "needs block {} but the table has {} ({} of {} bytes read)",
                        block_index,
                        package.blocks().len(),
                        output.len(),
                        size
                    ),
                });
            }

            let decoded = self.decode_block(package, block_index)?;
            if offset > decoded.len() {
                return Err(Error::EntryOutOfBounds {
                    entry: entry_index,
                    reason: format!(
                        "offset {:#x} past decoded block {} of {:#x} bytes",
                        offset,
                        block_index,
                        decoded.len()
                    ),
                });
            }

            let take = (size - output.len()).min(decoded.len() - offset);
            output.extend_from_slice(&decoded[offset..offset + take]);

            offset = 0;
            block_index += 1;
        }

        Ok(output)
    }

    /// Extract several entries in parallel.
    #[cfg(feature = "parallel")]
    pub fn extract_many(&self, package: &Package, indices: &[usize]) -> Vec<Result<Vec<u8>>> {
        use rayon::prelude::*;

        indices
            .par_iter()
            .map(|&index| self.extract(package, index))
            .collect()
    }
}

impl std::fmt::Debug for BlockPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockPipeline")
            .field("decompressor", &self.decompressor.is_some())
            .field("cipher", &self.cipher.is_some())
            .field("options", &self.options)
            .finish()
    }
}
