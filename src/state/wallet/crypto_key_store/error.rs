use super::secret_envelope::SecretRejected;
use crate::state::wallet::encryption::CrypterError;
use crate::state::wallet::encryption::MasterKeyError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum KeyStoreError {
    #[error("key store is locked")]
    Locked,

    #[error("key store is already encrypted")]
    AlreadyEncrypted,

    #[error("key store still holds plaintext secrets")]
    PlaintextSecretsRemain,

    #[error("master key does not decrypt the stored secrets")]
    IncorrectMasterKey,

    #[error("key store holds no encrypted secrets to check the master key against")]
    NothingToVerify,

    /// Some stored secrets decrypted under the master key and others did not.
    /// A wrong passphrase cannot produce this.
    #[error("key store is corrupted: secrets disagree on the master key")]
    Corrupted,

    #[error("no {kind} stored under {id}")]
    UnknownKey { kind: &'static str, id: String },

    #[error(transparent)]
    SecretRejected(#[from] SecretRejected),

    #[error(transparent)]
    Crypter(#[from] CrypterError),

    #[error(transparent)]
    MasterKey(#[from] MasterKeyError),
}

impl KeyStoreError {
    /// Whether this error signals damaged storage rather than a usage error.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corrupted)
    }

    pub(super) fn unknown_key(kind: &'static str, id: impl std::fmt::Debug) -> Self {
        Self::UnknownKey {
            kind,
            id: format!("{:?}", id),
        }
    }
}
