//! AES-256-GCM cipher context holding one transient key and IV.

use std::fmt;

use aead::Aead;
use aead::KeyInit;
use aes_gcm::Aes256Gcm;
use aes_gcm::Nonce;
use zeroize::Zeroize;

use super::compact_size::CompactSizeError;
use super::key_derivation::derive_key_and_iv;
use super::KeyingMaterial;

/// Size of the symmetric key, and of the IV buffer accepted by [`Crypter::set_key`].
pub const KEY_SIZE: usize = 32;
/// Required size of a passphrase salt.
pub const SALT_SIZE: usize = 16;
/// Size of the AES-GCM nonce actually used from the IV.
pub const IV_SIZE: usize = 12;
/// Size of the authentication tag appended to every ciphertext.
pub const TAG_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CrypterError {
    #[error("salt must be {SALT_SIZE} bytes, got {0}")]
    InvalidSaltLength(usize),

    #[error("key derivation requires at least one round")]
    ZeroRounds,

    #[error("unsupported key derivation method {0}")]
    UnsupportedDerivationMethod(u32),

    #[error("invalid key derivation parameters: {0}")]
    InvalidDerivationParams(#[from] CompactSizeError),

    #[error("key derivation memory limit of {0} bytes is not supported")]
    InvalidDerivationMemory(u64),

    #[error("key derivation failed: {0}")]
    KeyDerivation(#[from] argon2::Error),

    #[error("key must be {KEY_SIZE} bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("iv must be {KEY_SIZE} bytes, got {0}")]
    InvalidIvLength(usize),

    #[error("no key has been set")]
    KeyNotSet,

    #[error("ciphertext of {0} bytes is shorter than the authentication tag")]
    CiphertextTooShort(usize),

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,
}

/// Authenticated symmetric encryption under a key that is either derived from
/// a passphrase or installed directly.
///
/// `encrypt` and `decrypt` refuse to run until a key has been set. Key and IV
/// are wiped when the context is dropped or [`Crypter::clean_key`] is called.
#[derive(Default)]
pub struct Crypter {
    key: [u8; KEY_SIZE],
    iv: [u8; IV_SIZE],
    key_set: bool,
}

impl Crypter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive key and IV from `passphrase`.
    ///
    /// On failure the context is left exactly as it was.
    pub fn set_key_from_passphrase(
        &mut self,
        passphrase: &[u8],
        salt: &[u8],
        rounds: u32,
        derivation_method: u32,
        other_derivation_params: &[u8],
    ) -> Result<(), CrypterError> {
        let derived = derive_key_and_iv(
            passphrase,
            salt,
            rounds,
            derivation_method,
            other_derivation_params,
        )?;

        let (key, iv) = derived.split_at(KEY_SIZE);
        self.key.copy_from_slice(key);
        self.iv.copy_from_slice(iv);
        self.key_set = true;
        Ok(())
    }

    /// Install a key and IV directly. Both must be [`KEY_SIZE`] bytes; the
    /// first [`IV_SIZE`] bytes of `iv` become the nonce.
    pub fn set_key(&mut self, key: &[u8], iv: &[u8]) -> Result<(), CrypterError> {
        if key.len() != KEY_SIZE {
            return Err(CrypterError::InvalidKeyLength(key.len()));
        }
        if iv.len() != KEY_SIZE {
            return Err(CrypterError::InvalidIvLength(iv.len()));
        }

        self.key.copy_from_slice(key);
        self.iv.copy_from_slice(&iv[..IV_SIZE]);
        self.key_set = true;
        Ok(())
    }

    pub fn is_key_set(&self) -> bool {
        self.key_set
    }

    /// Wipe key and IV. The context must be keyed again before use.
    pub fn clean_key(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
        self.key_set = false;
    }

    /// Encrypt `plaintext`, returning ciphertext with the tag appended.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CrypterError> {
        let cipher = self.cipher()?;

        cipher
            .encrypt(Nonce::from_slice(&self.iv), plaintext)
            .map_err(|_| CrypterError::EncryptionFailed)
    }

    /// Verify the tag and decrypt `ciphertext`.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<KeyingMaterial, CrypterError> {
        let cipher = self.cipher()?;
        if ciphertext.len() < TAG_SIZE {
            return Err(CrypterError::CiphertextTooShort(ciphertext.len()));
        }

        cipher
            .decrypt(Nonce::from_slice(&self.iv), ciphertext)
            .map(KeyingMaterial::new)
            .map_err(|_| CrypterError::DecryptionFailed)
    }

    fn cipher(&self) -> Result<Aes256Gcm, CrypterError> {
        if !self.key_set {
            return Err(CrypterError::KeyNotSet);
        }
        Aes256Gcm::new_from_slice(&self.key).map_err(|_| CrypterError::InvalidKeyLength(KEY_SIZE))
    }
}

impl Drop for Crypter {
    fn drop(&mut self) {
        self.clean_key();
    }
}

impl fmt::Debug for Crypter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crypter")
            .field("key_set", &self.key_set)
            .finish_non_exhaustive()
    }
}
