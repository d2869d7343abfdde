//! Shielded spending keys and the viewing keys and payment addresses derived
//! from them.
//!
//! ```text
//! a_sk (252 bits)
//!  ├─ PRF(0) → a_pk ──────────────────────┐
//!  └─ PRF(1) → sk_enc ── x25519 → pk_enc ─┴─ PaymentAddress
//! ```

use std::fmt;

#[cfg(any(test, feature = "arbitrary-impls"))]
use arbitrary::Arbitrary;
use serde::Deserialize;
use serde::Serialize;
use x25519_dalek::PublicKey;
use x25519_dalek::StaticSecret;
use zeroize::Zeroize;
use zeroize::ZeroizeOnDrop;

use super::common;
use crate::state::wallet::encryption::KeyingMaterial;

pub const SPENDING_KEY_LEN: usize = 32;

const A_PK_DOMAIN: u8 = 0;
const SK_ENC_DOMAIN: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SpendingKeyError {
    #[error("spending key must be {SPENDING_KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),

    #[error("spending key exceeds 252 bits")]
    OutOfRange,
}

/// A 252-bit shielded spending key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(try_from = "[u8; SPENDING_KEY_LEN]", into = "[u8; SPENDING_KEY_LEN]")]
pub struct SpendingKey {
    a_sk: [u8; SPENDING_KEY_LEN],
}

impl SpendingKey {
    /// Number of bytes in the bincode encoding of a spending key.
    pub const SERIALIZED_LEN: usize = SPENDING_KEY_LEN;

    /// The top four bits of `bytes` must be clear.
    pub fn from_bytes(bytes: [u8; SPENDING_KEY_LEN]) -> Result<Self, SpendingKeyError> {
        if bytes[0] & 0xf0 != 0 {
            return Err(SpendingKeyError::OutOfRange);
        }
        Ok(Self { a_sk: bytes })
    }

    /// Derive a key deterministically from `seed`.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut a_sk = common::shake256::<SPENDING_KEY_LEN>(seed);
        a_sk[0] &= 0x0f;
        Self { a_sk }
    }

    pub fn viewing_key(&self) -> ViewingKey {
        let a_pk = common::prf(A_PK_DOMAIN, &self.a_sk);
        let sk_enc = StaticSecret::from(common::prf(SK_ENC_DOMAIN, &self.a_sk));
        ViewingKey { a_pk, sk_enc }
    }

    pub fn address(&self) -> PaymentAddress {
        self.viewing_key().address()
    }

    /// Bincode encoding of the key.
    pub fn to_keying_material(&self) -> KeyingMaterial {
        KeyingMaterial::new(
            bincode::serialize(self).expect("serialization should always succeed"),
        )
    }

    /// Decode a key from its bincode encoding.
    pub fn from_serialized(bytes: &[u8]) -> Result<Self, SpendingKeyError> {
        if bytes.len() != Self::SERIALIZED_LEN {
            return Err(SpendingKeyError::InvalidLength(bytes.len()));
        }
        bincode::deserialize(bytes).map_err(|_| SpendingKeyError::OutOfRange)
    }
}

impl TryFrom<[u8; SPENDING_KEY_LEN]> for SpendingKey {
    type Error = SpendingKeyError;

    fn try_from(bytes: [u8; SPENDING_KEY_LEN]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl From<SpendingKey> for [u8; SPENDING_KEY_LEN] {
    fn from(key: SpendingKey) -> Self {
        key.a_sk
    }
}

impl fmt::Debug for SpendingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpendingKey")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(any(test, feature = "arbitrary-impls"))]
impl<'a> Arbitrary<'a> for SpendingKey {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let mut a_sk: [u8; SPENDING_KEY_LEN] = u.arbitrary()?;
        a_sk[0] &= 0x0f;
        Ok(Self { a_sk })
    }
}

/// Grants the ability to detect and decrypt payments to one address without
/// the ability to spend them.
#[derive(Clone, Serialize, Deserialize)]
pub struct ViewingKey {
    a_pk: [u8; 32],
    #[serde(with = "static_secret_bytes")]
    sk_enc: StaticSecret,
}

impl ViewingKey {
    pub fn address(&self) -> PaymentAddress {
        PaymentAddress {
            a_pk: self.a_pk,
            pk_enc: PublicKey::from(&self.sk_enc).to_bytes(),
        }
    }
}

impl PartialEq for ViewingKey {
    fn eq(&self, other: &Self) -> bool {
        self.a_pk == other.a_pk && self.sk_enc.as_bytes() == other.sk_enc.as_bytes()
    }
}

impl Eq for ViewingKey {}

impl fmt::Debug for ViewingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewingKey")
            .field("a_pk", &hex::encode(self.a_pk))
            .finish_non_exhaustive()
    }
}

mod static_secret_bytes {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;
    use x25519_dalek::StaticSecret;

    pub(super) fn serialize<S: Serializer>(
        secret: &StaticSecret,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(secret.as_bytes(), serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<StaticSecret, D::Error> {
        <[u8; 32]>::deserialize(deserializer).map(StaticSecret::from)
    }
}

/// The public destination of shielded payments, and the identifier under
/// which a spending key is stored.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaymentAddress {
    a_pk: [u8; 32],
    pk_enc: [u8; 32],
}

impl PaymentAddress {
    pub fn a_pk(&self) -> &[u8; 32] {
        &self.a_pk
    }

    pub fn pk_enc(&self) -> &[u8; 32] {
        &self.pk_enc
    }

    /// Seed from which the IV for this address's encrypted spending key is
    /// taken.
    pub fn iv_seed(&self) -> [u8; 32] {
        common::sha3_256(bincode::serialize(self).expect("serialization should always succeed"))
    }
}

impl fmt::Display for PaymentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", hex::encode(self.a_pk), hex::encode(self.pk_enc))
    }
}

impl fmt::Debug for PaymentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentAddress({})", &hex::encode(self.a_pk)[..16])
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use proptest::prop_assert_eq;
    use proptest_arbitrary_interop::arb;
    use test_strategy::proptest;

    use super::*;

    #[test]
    fn top_bits_must_be_clear() {
        let mut bytes = [0u8; SPENDING_KEY_LEN];
        bytes[0] = 0x10;

        assert_eq!(Err(SpendingKeyError::OutOfRange), SpendingKey::from_bytes(bytes));
        bytes[0] = 0x0f;
        assert!(SpendingKey::from_bytes(bytes).is_ok());
    }

    #[test]
    fn serialized_length_is_fixed() {
        let key = SpendingKey::from_seed(&[4u8; 32]);
        assert_eq!(SpendingKey::SERIALIZED_LEN, key.to_keying_material().len());
    }

    #[test]
    fn wrong_length_rejected() {
        assert_eq!(
            Err(SpendingKeyError::InvalidLength(31)),
            SpendingKey::from_serialized(&[0u8; 31])
        );
    }

    #[test]
    fn out_of_range_encoding_rejected() {
        assert_eq!(
            Err(SpendingKeyError::OutOfRange),
            SpendingKey::from_serialized(&[0xff; SpendingKey::SERIALIZED_LEN])
        );
    }

    #[test]
    fn distinct_keys_distinct_addresses() {
        let first = SpendingKey::from_seed(&[1u8; 32]);
        let second = SpendingKey::from_seed(&[2u8; 32]);

        assert_ne!(first.address(), second.address());
        assert_ne!(first.address().iv_seed(), second.address().iv_seed());
    }

    #[test]
    fn debug_hides_key() {
        let key = SpendingKey::from_seed(&[7u8; 32]);
        let a_sk = hex::encode(key.a_sk);

        assert!(!format!("{:?}", key).contains(&a_sk));
        assert!(!format!("{:?}", key.viewing_key()).contains(&hex::encode(
            key.viewing_key().sk_enc.as_bytes()
        )));
    }

    #[proptest]
    fn codec_preserves_address(#[strategy(arb())] key: SpendingKey) {
        let decoded = SpendingKey::from_serialized(key.to_keying_material().as_bytes()).unwrap();
        prop_assert_eq!(key.address(), decoded.address());
    }

    #[proptest]
    fn viewing_key_survives_serialization(#[strategy(arb())] key: SpendingKey) {
        let viewing_key = key.viewing_key();
        let decoded: ViewingKey =
            bincode::deserialize(&bincode::serialize(&viewing_key).unwrap()).unwrap();

        prop_assert_eq!(viewing_key.address(), decoded.address());
        prop_assert_eq!(viewing_key, decoded);
    }
}
