//! Per-secret encryption under the master key.
//!
//! Every secret is encrypted with the master key as cipher key and an IV
//! derived from the secret's public identity, so a ciphertext only decrypts
//! when presented together with the identity it was created for.

use std::fmt::Debug;
use std::hash::Hash;

use zeroize::Zeroize;

use crate::state::wallet::address::spending_key::SPENDING_KEY_LEN;
use crate::state::wallet::address::transparent_key::TRANSPARENT_SECRET_KEY_LEN;
use crate::state::wallet::address::KeyId;
use crate::state::wallet::address::PaymentAddress;
use crate::state::wallet::address::SpendingKey;
use crate::state::wallet::address::TransparentPublicKey;
use crate::state::wallet::address::TransparentSecretKey;
use crate::state::wallet::address::ViewingKey;
use crate::state::wallet::encryption::Crypter;
use crate::state::wallet::encryption::CrypterError;
use crate::state::wallet::encryption::KeyingMaterial;
use crate::state::wallet::encryption::KEY_SIZE;

/// A secret failed authenticated decryption or did not match the public
/// identity it was stored under. The two causes are not distinguished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("secret failed decryption or verification")]
pub struct SecretRejected;

/// A kind of secret the key store can protect.
pub trait ProtectedSecret: Clone + Debug + Send + Sync + 'static {
    /// Lookup key for the secret.
    type Id: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static;

    /// Public data stored in the clear next to the ciphertext.
    type Public: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Exact length of the plaintext produced by `to_keying_material`.
    const SERIALIZED_LEN: usize;

    /// Human readable kind, for logs.
    const KIND: &'static str;

    fn public(&self) -> Self::Public;

    fn id_of(public: &Self::Public) -> Self::Id;

    fn iv_seed(public: &Self::Public) -> [u8; KEY_SIZE];

    fn to_keying_material(&self) -> KeyingMaterial;

    /// Rebuild the secret from decrypted bytes. `public` supplies any
    /// presentation details not carried by the secret bytes themselves.
    fn from_keying_material(material: &[u8], public: &Self::Public) -> Option<Self>;

    fn id(&self) -> Self::Id {
        Self::id_of(&self.public())
    }
}

/// An encrypted secret together with the public data it is bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct CryptedSecret<S: ProtectedSecret> {
    pub public: S::Public,
    pub ciphertext: Vec<u8>,
}

impl<S: ProtectedSecret> CryptedSecret<S> {
    pub fn new(public: S::Public, ciphertext: Vec<u8>) -> Self {
        Self { public, ciphertext }
    }

    pub fn id(&self) -> S::Id {
        S::id_of(&self.public)
    }
}

/// Public data of a stored spending key.
///
/// The viewing key is kept in the clear so payments can be detected while the
/// store is locked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShieldedIdentity {
    pub address: PaymentAddress,
    pub viewing_key: ViewingKey,
}

impl From<&SpendingKey> for ShieldedIdentity {
    fn from(spending_key: &SpendingKey) -> Self {
        let viewing_key = spending_key.viewing_key();
        Self {
            address: viewing_key.address(),
            viewing_key,
        }
    }
}

impl ProtectedSecret for TransparentSecretKey {
    type Id = KeyId;
    type Public = TransparentPublicKey;

    const SERIALIZED_LEN: usize = TRANSPARENT_SECRET_KEY_LEN;
    const KIND: &'static str = "transparent key";

    fn public(&self) -> Self::Public {
        self.public_key()
    }

    fn id_of(public: &Self::Public) -> Self::Id {
        public.id()
    }

    fn iv_seed(public: &Self::Public) -> [u8; KEY_SIZE] {
        public.iv_seed()
    }

    fn to_keying_material(&self) -> KeyingMaterial {
        TransparentSecretKey::to_keying_material(self)
    }

    fn from_keying_material(material: &[u8], public: &Self::Public) -> Option<Self> {
        let mut bytes: [u8; TRANSPARENT_SECRET_KEY_LEN] = material.try_into().ok()?;
        let secret = TransparentSecretKey::from_bytes(&bytes, public.is_compressed()).ok();
        bytes.zeroize();
        secret
    }
}

impl ProtectedSecret for SpendingKey {
    type Id = PaymentAddress;
    type Public = ShieldedIdentity;

    const SERIALIZED_LEN: usize = SPENDING_KEY_LEN;
    const KIND: &'static str = "spending key";

    fn public(&self) -> Self::Public {
        ShieldedIdentity::from(self)
    }

    fn id_of(public: &Self::Public) -> Self::Id {
        public.address
    }

    fn iv_seed(public: &Self::Public) -> [u8; KEY_SIZE] {
        public.address.iv_seed()
    }

    fn to_keying_material(&self) -> KeyingMaterial {
        SpendingKey::to_keying_material(self)
    }

    fn from_keying_material(material: &[u8], _public: &Self::Public) -> Option<Self> {
        SpendingKey::from_serialized(material).ok()
    }
}

fn master_key_crypter(
    master_key: &KeyingMaterial,
    iv_seed: &[u8; KEY_SIZE],
) -> Result<Crypter, CrypterError> {
    let mut crypter = Crypter::new();
    crypter.set_key(master_key, iv_seed)?;
    Ok(crypter)
}

/// Encrypt `plaintext` under `master_key` with the IV taken from `iv_seed`.
pub fn encrypt_secret(
    master_key: &KeyingMaterial,
    plaintext: &[u8],
    iv_seed: &[u8; KEY_SIZE],
) -> Result<Vec<u8>, CrypterError> {
    master_key_crypter(master_key, iv_seed)?.encrypt(plaintext)
}

/// Inverse of [`encrypt_secret`].
pub fn decrypt_secret(
    master_key: &KeyingMaterial,
    ciphertext: &[u8],
    iv_seed: &[u8; KEY_SIZE],
) -> Result<KeyingMaterial, CrypterError> {
    master_key_crypter(master_key, iv_seed)?.decrypt(ciphertext)
}

/// Encrypt `secret` into a record bound to its public identity.
pub fn encrypt_protected<S: ProtectedSecret>(
    master_key: &KeyingMaterial,
    secret: &S,
) -> Result<CryptedSecret<S>, CrypterError> {
    let public = secret.public();
    let ciphertext = encrypt_secret(
        master_key,
        &secret.to_keying_material(),
        &S::iv_seed(&public),
    )?;
    Ok(CryptedSecret::new(public, ciphertext))
}

/// Decrypt `record` and check that the recovered secret has exactly the
/// public identity the record was stored under.
pub fn decrypt_protected<S: ProtectedSecret>(
    master_key: &KeyingMaterial,
    record: &CryptedSecret<S>,
) -> Result<S, SecretRejected> {
    let plaintext = decrypt_secret(master_key, &record.ciphertext, &S::iv_seed(&record.public))
        .map_err(|_| SecretRejected)?;

    if plaintext.len() != S::SERIALIZED_LEN {
        return Err(SecretRejected);
    }
    let secret = S::from_keying_material(&plaintext, &record.public).ok_or(SecretRejected)?;

    if secret.public() != record.public {
        return Err(SecretRejected);
    }
    Ok(secret)
}

pub fn decrypt_transparent_key(
    master_key: &KeyingMaterial,
    record: &CryptedSecret<TransparentSecretKey>,
) -> Result<TransparentSecretKey, SecretRejected> {
    decrypt_protected(master_key, record)
}

pub fn decrypt_spending_key(
    master_key: &KeyingMaterial,
    record: &CryptedSecret<SpendingKey>,
) -> Result<SpendingKey, SecretRejected> {
    decrypt_protected(master_key, record)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use proptest::prop_assert;
    use proptest::prop_assert_eq;
    use proptest_arbitrary_interop::arb;
    use test_strategy::proptest;

    use super::*;
    use crate::state::wallet::encryption::generate_master_key;
    use crate::state::wallet::encryption::TAG_SIZE;

    #[test]
    fn secret_roundtrip() {
        let master_key = generate_master_key();
        let iv_seed = [3u8; KEY_SIZE];

        let ciphertext = encrypt_secret(&master_key, b"payload", &iv_seed).unwrap();
        let plaintext = decrypt_secret(&master_key, &ciphertext, &iv_seed).unwrap();

        assert_eq!(b"payload", plaintext.as_bytes());
    }

    #[test]
    fn different_iv_seed_fails() {
        let master_key = generate_master_key();

        let ciphertext = encrypt_secret(&master_key, b"payload", &[3u8; KEY_SIZE]).unwrap();

        assert_eq!(
            Err(CrypterError::DecryptionFailed),
            decrypt_secret(&master_key, &ciphertext, &[4u8; KEY_SIZE])
        );
    }

    #[test]
    fn short_master_key_rejected() {
        let short = KeyingMaterial::zeroed(KEY_SIZE - 1);
        assert_eq!(
            Err(CrypterError::InvalidKeyLength(KEY_SIZE - 1)),
            encrypt_secret(&short, b"payload", &[0u8; KEY_SIZE])
        );
    }

    #[test]
    fn transparent_key_roundtrip() {
        let master_key = generate_master_key();
        let key = TransparentSecretKey::from_seed(&[1u8; 32], true);

        let record = encrypt_protected(&master_key, &key).unwrap();

        assert_eq!(TRANSPARENT_SECRET_KEY_LEN + TAG_SIZE, record.ciphertext.len());
        assert_eq!(key.id(), record.id());
        assert_eq!(key, decrypt_transparent_key(&master_key, &record).unwrap());
    }

    #[test]
    fn spending_key_roundtrip() {
        let master_key = generate_master_key();
        let key = SpendingKey::from_seed(&[1u8; 32]);

        let record = encrypt_protected(&master_key, &key).unwrap();

        assert_eq!(key.address(), record.id());
        assert_eq!(key, decrypt_spending_key(&master_key, &record).unwrap());
    }

    #[test]
    fn wrong_master_key_rejected() {
        let key = TransparentSecretKey::from_seed(&[1u8; 32], true);
        let record = encrypt_protected(&generate_master_key(), &key).unwrap();

        assert_eq!(
            Err(SecretRejected),
            decrypt_transparent_key(&generate_master_key(), &record)
        );
    }

    #[test]
    fn swapped_transparent_identity_rejected() {
        let master_key = generate_master_key();
        let key_a = TransparentSecretKey::from_seed(&[1u8; 32], true);
        let key_b = TransparentSecretKey::from_seed(&[2u8; 32], true);

        let record_a = encrypt_protected(&master_key, &key_a).unwrap();
        let cross_wired = CryptedSecret::<TransparentSecretKey>::new(
            key_b.public_key(),
            record_a.ciphertext.clone(),
        );

        assert_eq!(
            Err(SecretRejected),
            decrypt_transparent_key(&master_key, &cross_wired)
        );
    }

    /// encrypted under key_b's IV, so only the identity check can fail.
    #[test]
    fn foreign_secret_under_matching_iv_rejected() {
        let master_key = generate_master_key();
        let key_a = TransparentSecretKey::from_seed(&[1u8; 32], true);
        let key_b = TransparentSecretKey::from_seed(&[2u8; 32], true);

        let ciphertext = encrypt_secret(
            &master_key,
            &key_a.to_keying_material(),
            &key_b.public_key().iv_seed(),
        )
        .unwrap();
        let record = CryptedSecret::<TransparentSecretKey>::new(key_b.public_key(), ciphertext);

        assert_eq!(Err(SecretRejected), decrypt_transparent_key(&master_key, &record));
    }

    #[test]
    fn compression_flag_comes_from_stored_public_key() {
        let master_key = generate_master_key();
        let compressed = TransparentSecretKey::from_seed(&[1u8; 32], true);
        let uncompressed = TransparentSecretKey::from_seed(&[1u8; 32], false);

        let ciphertext = encrypt_secret(
            &master_key,
            &compressed.to_keying_material(),
            &uncompressed.public_key().iv_seed(),
        )
        .unwrap();
        let record =
            CryptedSecret::<TransparentSecretKey>::new(uncompressed.public_key(), ciphertext);

        assert_eq!(
            uncompressed,
            decrypt_transparent_key(&master_key, &record).unwrap()
        );
    }

    #[test]
    fn wrong_plaintext_length_rejected() {
        let master_key = generate_master_key();
        let key = TransparentSecretKey::from_seed(&[1u8; 32], true);
        let public_key = key.public_key();

        let ciphertext = encrypt_secret(&master_key, &[1u8; 31], &public_key.iv_seed()).unwrap();
        let record = CryptedSecret::<TransparentSecretKey>::new(public_key, ciphertext);

        assert_eq!(Err(SecretRejected), decrypt_transparent_key(&master_key, &record));
    }

    #[test]
    fn foreign_spending_key_under_matching_iv_rejected() {
        let master_key = generate_master_key();
        let key_a = SpendingKey::from_seed(&[1u8; 32]);
        let key_b = SpendingKey::from_seed(&[2u8; 32]);
        let identity_b = ShieldedIdentity::from(&key_b);

        let ciphertext = encrypt_secret(
            &master_key,
            &key_a.to_keying_material(),
            &identity_b.address.iv_seed(),
        )
        .unwrap();
        let record = CryptedSecret::<SpendingKey>::new(identity_b, ciphertext);

        assert_eq!(Err(SecretRejected), decrypt_spending_key(&master_key, &record));
    }

    #[proptest(cases = 32)]
    fn tampered_spending_key_rejected(
        #[strategy(arb())] key: SpendingKey,
        #[strategy(0usize..(SpendingKey::SERIALIZED_LEN + TAG_SIZE) * 8)] bit: usize,
    ) {
        let master_key = generate_master_key();
        let mut record = encrypt_protected(&master_key, &key).unwrap();
        record.ciphertext[bit / 8] ^= 1 << (bit % 8);

        prop_assert!(decrypt_spending_key(&master_key, &record).is_err());
    }

    #[proptest(cases = 32)]
    fn transparent_records_roundtrip(#[strategy(arb())] key: TransparentSecretKey) {
        let master_key = generate_master_key();
        let record = encrypt_protected(&master_key, &key).unwrap();

        prop_assert_eq!(key, decrypt_protected(&master_key, &record).unwrap());
    }
}
