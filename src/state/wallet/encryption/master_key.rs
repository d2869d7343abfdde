use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::generate_salt;
use super::Crypter;
use super::CrypterError;
use super::KeyingMaterial;
use super::KEY_SIZE;
use crate::application::config::kdf_config::KdfConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum MasterKeyError {
    #[error("incorrect passphrase")]
    IncorrectPassphrase,

    #[error("master key must be {KEY_SIZE} bytes, got {0}")]
    InvalidLength(usize),

    #[error(transparent)]
    Crypter(#[from] CrypterError),
}

/// A master key sealed under a passphrase, together with everything needed to
/// derive the sealing key again.
///
/// This is the form in which the persistence layer stores the master key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterKeyRecord {
    pub crypted_key: Vec<u8>,
    pub salt: Vec<u8>,
    pub derivation_method: u32,
    pub derive_iterations: u32,
    pub other_derivation_params: Vec<u8>,
}

impl MasterKeyRecord {
    /// Seal `master_key` under `passphrase` using a fresh salt.
    pub fn seal(
        master_key: &KeyingMaterial,
        passphrase: &[u8],
        kdf_config: &KdfConfig,
    ) -> Result<Self, MasterKeyError> {
        if master_key.len() != KEY_SIZE {
            return Err(MasterKeyError::InvalidLength(master_key.len()));
        }

        let salt = generate_salt();
        let other_derivation_params = kdf_config.other_derivation_params();

        let mut crypter = Crypter::new();
        crypter.set_key_from_passphrase(
            passphrase,
            &salt,
            kdf_config.rounds,
            kdf_config.derivation_method,
            &other_derivation_params,
        )?;
        let crypted_key = crypter.encrypt(master_key)?;

        debug!(
            rounds = kdf_config.rounds,
            memory_limit_bytes = kdf_config.memory_limit_bytes,
            "sealed master key"
        );

        Ok(Self {
            crypted_key,
            salt: salt.to_vec(),
            derivation_method: kdf_config.derivation_method,
            derive_iterations: kdf_config.rounds,
            other_derivation_params,
        })
    }

    /// Recover the master key. A failed authentication is reported as
    /// [`MasterKeyError::IncorrectPassphrase`].
    pub fn open(&self, passphrase: &[u8]) -> Result<KeyingMaterial, MasterKeyError> {
        let mut crypter = Crypter::new();
        crypter.set_key_from_passphrase(
            passphrase,
            &self.salt,
            self.derive_iterations,
            self.derivation_method,
            &self.other_derivation_params,
        )?;

        let master_key = crypter.decrypt(&self.crypted_key).map_err(|e| match e {
            CrypterError::DecryptionFailed => MasterKeyError::IncorrectPassphrase,
            other => MasterKeyError::Crypter(other),
        })?;

        if master_key.len() != KEY_SIZE {
            return Err(MasterKeyError::InvalidLength(master_key.len()));
        }
        Ok(master_key)
    }

    /// Seal the same master key under a new passphrase, and possibly new
    /// derivation parameters. The existing record is left untouched.
    pub fn reseal(
        &self,
        old_passphrase: &[u8],
        new_passphrase: &[u8],
        kdf_config: &KdfConfig,
    ) -> Result<Self, MasterKeyError> {
        let master_key = self.open(old_passphrase)?;
        Self::seal(&master_key, new_passphrase, kdf_config)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::state::wallet::encryption::generate_master_key;
    use crate::state::wallet::encryption::SALT_SIZE;

    fn fast_kdf() -> KdfConfig {
        KdfConfig::default()
            .with_rounds(1)
            .with_memory_limit_bytes(64 * 1024)
    }

    #[test]
    fn sealed_key_opens_with_passphrase() {
        let master_key = generate_master_key();
        let record = MasterKeyRecord::seal(&master_key, b"passphrase", &fast_kdf()).unwrap();

        assert_eq!(SALT_SIZE, record.salt.len());
        assert_eq!(1, record.derive_iterations);
        assert_eq!(master_key, record.open(b"passphrase").unwrap());
    }

    #[test]
    fn wrong_passphrase_is_reported() {
        let record =
            MasterKeyRecord::seal(&generate_master_key(), b"passphrase", &fast_kdf()).unwrap();

        assert_eq!(
            Err(MasterKeyError::IncorrectPassphrase),
            record.open(b"passphrase?")
        );
    }

    #[test]
    fn tampered_record_fails_to_open() {
        let mut record =
            MasterKeyRecord::seal(&generate_master_key(), b"passphrase", &fast_kdf()).unwrap();
        record.crypted_key[3] ^= 0x40;

        assert!(record.open(b"passphrase").is_err());
    }

    #[test]
    fn bad_derivation_params_are_not_a_wrong_passphrase() {
        let mut record =
            MasterKeyRecord::seal(&generate_master_key(), b"passphrase", &fast_kdf()).unwrap();
        record.derivation_method = 5;

        assert_eq!(
            Err(MasterKeyError::Crypter(
                CrypterError::UnsupportedDerivationMethod(5)
            )),
            record.open(b"passphrase")
        );
    }

    #[test]
    fn reseal_changes_passphrase_not_key() {
        let master_key = generate_master_key();
        let record = MasterKeyRecord::seal(&master_key, b"old", &fast_kdf()).unwrap();

        let resealed = record
            .reseal(b"old", b"new", &fast_kdf().with_rounds(2))
            .unwrap();

        assert_ne!(record.salt, resealed.salt);
        assert_eq!(2, resealed.derive_iterations);
        assert_eq!(master_key, resealed.open(b"new").unwrap());
        assert_eq!(
            Err(MasterKeyError::IncorrectPassphrase),
            resealed.open(b"old")
        );
    }

    #[test]
    fn reseal_with_wrong_passphrase_fails() {
        let record =
            MasterKeyRecord::seal(&generate_master_key(), b"old", &fast_kdf()).unwrap();

        assert_eq!(
            Err(MasterKeyError::IncorrectPassphrase),
            record.reseal(b"wrong", b"new", &fast_kdf())
        );
    }

    #[test]
    fn short_master_key_is_not_sealed() {
        let short = KeyingMaterial::zeroed(KEY_SIZE - 1);
        assert_eq!(
            Err(MasterKeyError::InvalidLength(KEY_SIZE - 1)),
            MasterKeyRecord::seal(&short, b"pw", &fast_kdf())
        );
    }

    #[test]
    fn record_survives_serialization() {
        let master_key = generate_master_key();
        let record = MasterKeyRecord::seal(&master_key, b"pw", &fast_kdf()).unwrap();

        let stored = bincode::serialize(&record).unwrap();
        let loaded: MasterKeyRecord = bincode::deserialize(&stored).unwrap();

        assert_eq!(record, loaded);
        assert_eq!(master_key, loaded.open(b"pw").unwrap());
    }
}
