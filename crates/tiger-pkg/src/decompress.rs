//! Block decompression.
//!
//! The package format does not fix a codec; the pipeline calls whatever
//! [`Decompressor`] it was given. Zstandard and raw DEFLATE adapters are
//! provided for tooling and tests.

use std::io::Read;

use flate2::read::DeflateDecoder;

use crate::crypto::CapabilityError;
use crate::entry::BLOCK_SIZE;

/// Decompression of a single block.
pub trait Decompressor: Send + Sync {
    /// Decompress a whole block.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CapabilityError>;
}

impl<F> Decompressor for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, CapabilityError> + Send + Sync,
{
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        self(data)
    }
}

/// Zstandard block decompressor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZstdDecompressor;

impl Decompressor for ZstdDecompressor {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        let mut decoder = zstd::Decoder::new(data)?;
        let mut output = Vec::with_capacity(BLOCK_SIZE as usize);
        decoder.read_to_end(&mut output)?;
        Ok(output)
    }
}

/// Raw DEFLATE block decompressor.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateDecompressor;

impl Decompressor for DeflateDecompressor {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        let mut decoder = DeflateDecoder::new(data);
        let mut output = Vec::with_capacity(BLOCK_SIZE as usize);
        decoder.read_to_end(&mut output)?;
        Ok(output)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn deflate(data: &[u8]) -> Vec<u8> {
        use flate2::write::DeflateEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_zstd_roundtrip() {
        let original = b"Hello, World! This is a test of Zstandard compression.";
        let compressed = zstd::encode_all(&original[..], 3).unwrap();
        let decompressed = ZstdDecompressor.decompress(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_deflate_roundtrip() {
        let original = b"Hello, World! This is a test of DEFLATE compression.";
        let decompressed = DeflateDecompressor.decompress(&deflate(original)).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_zstd_garbage() {
        assert!(ZstdDecompressor.decompress(b"not zstd at all").is_err());
    }

    #[test]
    fn test_closure_decompressor() {
        let upper = |data: &[u8]| -> Result<Vec<u8>, CapabilityError> {
            Ok(data.to_ascii_uppercase())
        };
        assert_eq!(upper.decompress(b"abc").unwrap(), b"ABC");
    }
}
