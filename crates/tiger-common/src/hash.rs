//! Hashing utilities.
//!
//! Packages protect their entry table and blocks with SHA-1 digests, while
//! payloads identify strings with 32-bit FNV-1a hashes.

/// Length of a SHA-1 digest in bytes.
pub const SHA1_LEN: usize = 20;

/// FNV-1a 32-bit offset basis. Payloads also use it as a "no value" marker.
pub const FNV1A32_OFFSET_BASIS: u32 = 0x811C_9DC5;

const FNV1A32_PRIME: u32 = 0x0100_0193;

/// Compute the SHA-1 digest of a byte slice.
#[inline]
pub fn sha1(data: &[u8]) -> [u8; SHA1_LEN] {
    sha1_smol::Sha1::from(data).digest().bytes()
}

/// Compute the FNV-1a 32-bit hash of a byte slice.
pub fn fnv1a32(data: &[u8]) -> u32 {
    data.iter().fold(FNV1A32_OFFSET_BASIS, |hash, &b| {
        (hash ^ b as u32).wrapping_mul(FNV1A32_PRIME)
    })
}
