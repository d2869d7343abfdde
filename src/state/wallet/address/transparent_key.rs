//! secp256k1 keys for transparent signing.

use std::fmt;

#[cfg(any(test, feature = "arbitrary-impls"))]
use arbitrary::Arbitrary;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::Deserialize;
use serde::Serialize;
use zeroize::Zeroize;

use super::common;
use crate::state::wallet::encryption::KeyingMaterial;

pub const TRANSPARENT_SECRET_KEY_LEN: usize = 32;
pub const KEY_ID_LEN: usize = 20;
pub const COMPRESSED_PUBLIC_KEY_LEN: usize = 33;
pub const UNCOMPRESSED_PUBLIC_KEY_LEN: usize = 65;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TransparentKeyError {
    #[error("secret key must be a non-zero scalar below the curve order")]
    InvalidSecretKey,

    #[error("public key is not a valid SEC1 encoded curve point")]
    InvalidPublicKey,
}

/// Fingerprint of a transparent public key, used to look the key up.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyId([u8; KEY_ID_LEN]);

impl KeyId {
    pub fn as_bytes(&self) -> &[u8; KEY_ID_LEN] {
        &self.0
    }
}

impl From<[u8; KEY_ID_LEN]> for KeyId {
    fn from(bytes: [u8; KEY_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", self)
    }
}

/// A SEC1 encoded secp256k1 public key, compressed or uncompressed.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransparentPublicKey {
    encoded: Vec<u8>,
}

impl TransparentPublicKey {
    /// Parse and validate a SEC1 encoded point.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, TransparentKeyError> {
        k256::PublicKey::from_sec1_bytes(bytes).map_err(|_| TransparentKeyError::InvalidPublicKey)?;
        Ok(Self {
            encoded: bytes.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.encoded
    }

    pub fn is_compressed(&self) -> bool {
        self.encoded.len() == COMPRESSED_PUBLIC_KEY_LEN
    }

    pub fn id(&self) -> KeyId {
        KeyId(common::shake256::<KEY_ID_LEN>(&self.encoded))
    }

    /// Seed from which the IV for this key's encrypted secret is taken.
    pub fn iv_seed(&self) -> [u8; 32] {
        common::sha3_256(&self.encoded)
    }
}

impl fmt::Debug for TransparentPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransparentPublicKey({})", hex::encode(&self.encoded))
    }
}

/// A secp256k1 signing key together with the public key encoding it is
/// published under.
#[derive(Clone, PartialEq, Eq)]
pub struct TransparentSecretKey {
    secret: k256::SecretKey,
    compressed: bool,
}

impl TransparentSecretKey {
    pub fn from_bytes(
        bytes: &[u8; TRANSPARENT_SECRET_KEY_LEN],
        compressed: bool,
    ) -> Result<Self, TransparentKeyError> {
        let secret = k256::SecretKey::from_bytes(bytes.into())
            .map_err(|_| TransparentKeyError::InvalidSecretKey)?;
        Ok(Self { secret, compressed })
    }

    /// Derive a key deterministically from `seed`.
    pub fn from_seed(seed: &[u8; 32], compressed: bool) -> Self {
        let mut scalar = common::shake256::<TRANSPARENT_SECRET_KEY_LEN>(seed);
        let key = Self::from_scalar_bytes(&mut scalar, compressed);
        scalar.zeroize();
        key
    }

    /// Clears the top bit so the value is below the curve order, and forces
    /// a non-zero value.
    fn from_scalar_bytes(bytes: &mut [u8; TRANSPARENT_SECRET_KEY_LEN], compressed: bool) -> Self {
        bytes[0] &= 0x7f;
        if bytes.iter().all(|b| *b == 0) {
            bytes[TRANSPARENT_SECRET_KEY_LEN - 1] = 1;
        }
        Self::from_bytes(bytes, compressed).expect("masked scalar is a valid secret key")
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn public_key(&self) -> TransparentPublicKey {
        let point = self.secret.public_key().to_encoded_point(self.compressed);
        TransparentPublicKey {
            encoded: point.as_bytes().to_vec(),
        }
    }

    pub fn id(&self) -> KeyId {
        self.public_key().id()
    }

    /// The raw 32-byte scalar.
    pub fn to_keying_material(&self) -> KeyingMaterial {
        let mut bytes = self.secret.to_bytes();
        let material = KeyingMaterial::from_slice(&bytes);
        bytes.as_mut_slice().zeroize();
        material
    }
}

impl fmt::Debug for TransparentSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransparentSecretKey")
            .field("id", &self.id())
            .field("compressed", &self.compressed)
            .finish_non_exhaustive()
    }
}

#[cfg(any(test, feature = "arbitrary-impls"))]
impl<'a> Arbitrary<'a> for TransparentSecretKey {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let mut bytes: [u8; TRANSPARENT_SECRET_KEY_LEN] = u.arbitrary()?;
        let compressed = u.arbitrary()?;
        let key = Self::from_scalar_bytes(&mut bytes, compressed);
        bytes.zeroize();
        Ok(key)
    }
}
