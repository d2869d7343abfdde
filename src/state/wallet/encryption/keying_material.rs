use std::fmt;
use std::ops::Deref;

use zeroize::Zeroize;
use zeroize::ZeroizeOnDrop;

/// A buffer of secret bytes that is wiped when dropped.
///
/// Used for master keys, KDF output and decrypted secret payloads. Every
/// clone is an independent buffer with the same guarantee.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyingMaterial(Vec<u8>);

impl KeyingMaterial {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Copy `bytes` into a new buffer. The caller remains responsible for
    /// wiping the source.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    /// a zero-filled buffer of `len` bytes, to be written in place.
    pub fn zeroed(len: usize) -> Self {
        Self(vec![0u8; len])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for KeyingMaterial {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for KeyingMaterial {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for KeyingMaterial {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

// never print secret bytes, not even in debug builds.
impl fmt::Debug for KeyingMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyingMaterial([REDACTED; {}])", self.0.len())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let material = KeyingMaterial::from_slice(&[0xAB; 32]);
        let debug = format!("{:?}", material);

        assert_eq!("KeyingMaterial([REDACTED; 32])", debug);
        assert!(!debug.to_lowercase().contains("ab, "));
    }

    #[test]
    fn zeroize_wipes_contents() {
        let mut material = KeyingMaterial::from_slice(b"very secret");
        material.zeroize();
        assert!(material.is_empty());
    }

    #[test]
    fn clones_are_independent() {
        let original = KeyingMaterial::from_slice(&[1, 2, 3]);
        let mut copy = original.clone();
        copy.as_bytes_mut()[0] = 9;

        assert_eq!(&[1, 2, 3], original.as_bytes());
        assert_eq!(&[9, 2, 3], copy.as_bytes());
    }
}
