//! Block decryption.
//!
//! Encrypted blocks are sealed with AES-128-GCM. The key is picked by the
//! block's `ALT_KEY` flag and the nonce is derived from the owning package id.
//! Key material is never bundled: callers supply a [`KeySet`].

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{AesGcm, Key, Nonce, Tag};
use cipher::consts::U12;

/// Error type reported by injected capabilities.
pub type CapabilityError = Box<dyn std::error::Error + Send + Sync>;

type Aes128Gcm = AesGcm<aes::Aes128, U12>;

/// Selects the key and nonce used for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySelector {
    /// Id of the package the block belongs to.
    pub package_id: u16,
    /// Use the alternate key.
    pub alternate: bool,
}

/// Authenticated decryption of a single block.
pub trait BlockCipher: Send + Sync {
    /// Decrypt `ciphertext` and verify `tag`. Must fail rather than return
    /// unauthenticated plaintext.
    fn decrypt(
        &self,
        ciphertext: &[u8],
        tag: &[u8; 16],
        selector: KeySelector,
    ) -> Result<Vec<u8>, CapabilityError>;
}

/// Key material for [`AesGcmCipher`].
#[derive(Clone)]
pub struct KeySet {
    pub primary: [u8; 16],
    pub alternate: Option<[u8; 16]>,
    /// Base nonce before the package id is mixed in.
    pub nonce: [u8; 12],
}

impl std::fmt::Debug for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySet")
            .field("alternate", &self.alternate.is_some())
            .finish_non_exhaustive()
    }
}

/// AES-128-GCM block cipher.
pub struct AesGcmCipher {
    primary: Aes128Gcm,
    alternate: Option<Aes128Gcm>,
    nonce: [u8; 12],
}

impl AesGcmCipher {
    pub fn new(keys: &KeySet) -> Self {
        Self {
            primary: Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(&keys.primary)),
            alternate: keys
                .alternate
                .as_ref()
                .map(|k| Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(k))),
            nonce: keys.nonce,
        }
    }

    /// The per-package nonce: the package id is folded into the first and
    /// last bytes of the base nonce.
    pub fn nonce_for(&self, package_id: u16) -> [u8; 12] {
        let mut nonce = self.nonce;
        nonce[0] ^= (package_id >> 8) as u8;
        nonce[11] ^= package_id as u8;
        nonce
    }

    fn cipher_for(&self, selector: KeySelector) -> Result<&Aes128Gcm, CapabilityError> {
        if selector.alternate {
            self.alternate
                .as_ref()
                .ok_or_else(|| "alternate key requested but not configured".into())
        } else {
            Ok(&self.primary)
        }
    }

    /// Seal `plaintext`, returning the ciphertext and its tag.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        selector: KeySelector,
    ) -> Result<(Vec<u8>, [u8; 16]), CapabilityError> {
        let cipher = self.cipher_for(selector)?;
        let nonce = self.nonce_for(selector.package_id);
        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), &[], &mut buffer)
            .map_err(|_| "encryption failed")?;
        let mut tag_bytes = [0u8; 16];
        tag_bytes.copy_from_slice(&tag);
        Ok((buffer, tag_bytes))
    }
}

impl BlockCipher for AesGcmCipher {
    fn decrypt(
        &self,
        ciphertext: &[u8],
        tag: &[u8; 16],
        selector: KeySelector,
    ) -> Result<Vec<u8>, CapabilityError> {
        let cipher = self.cipher_for(selector)?;
        let nonce = self.nonce_for(selector.package_id);
        let mut buffer = ciphertext.to_vec();
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&nonce),
                &[],
                &mut buffer,
                Tag::from_slice(tag),
            )
            .map_err(|_| "authentication tag mismatch")?;
        Ok(buffer)
    }
}

impl std::fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCipher")
            .field("alternate", &self.alternate.is_some())
            .finish_non_exhaustive()
    }
}
