//! Key store that keeps transparent and shielded secrets either in plaintext
//! or encrypted under a master key.
//!
//! ```text
//!             set_crypted / encrypt_keys
//! Plaintext ─────────────────────────────▶ Locked ◀──── lock ────┐
//!                                            │                   │
//!                                            └──── unlock ──▶ Unlocked
//! ```
//!
//! Once encrypted, a store never returns to plaintext. While locked, public
//! data and viewing keys remain readable but no secret can be obtained or
//! added.
//!
//! ## Lock order
//!
//! vault, then transparent keys, then spending keys. Every method that takes
//! more than one of these acquires them in that order.

pub mod basic_key_store;
pub mod error;
pub mod event;
pub mod secret_envelope;


use std::collections::BTreeMap;

pub use basic_key_store::BasicKeyStore;
pub use error::KeyStoreError;
pub use event::KeyStoreEvent;
pub use event::KeyStoreId;
pub use event::LockStatus;
pub use secret_envelope::decrypt_secret;
pub use secret_envelope::decrypt_spending_key;
pub use secret_envelope::decrypt_transparent_key;
pub use secret_envelope::encrypt_secret;
pub use secret_envelope::CryptedSecret;
pub use secret_envelope::ProtectedSecret;
pub use secret_envelope::SecretRejected;
pub use secret_envelope::ShieldedIdentity;
use tokio::sync::broadcast;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use self::secret_envelope::decrypt_protected;
use self::secret_envelope::encrypt_protected;
use crate::application::locks::std::AtomicMutex;
use crate::application::locks::std::AtomicRw;
use crate::state::wallet::address::KeyId;
use crate::state::wallet::address::PaymentAddress;
use crate::state::wallet::address::SpendingKey;
use crate::state::wallet::address::TransparentPublicKey;
use crate::state::wallet::address::TransparentSecretKey;
use crate::state::wallet::address::ViewingKey;
use crate::state::wallet::encryption::CrypterError;
use crate::state::wallet::encryption::KeyingMaterial;
use crate::state::wallet::encryption::MasterKeyRecord;
use crate::state::wallet::encryption::SecureString;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Mode and master key slot.
#[derive(Debug)]
enum Vault {
    Plaintext,
    Locked {
        decryption_verified: bool,
    },
    Unlocked {
        master_key: KeyingMaterial,
        decryption_verified: bool,
    },
}

impl Vault {
    fn status(&self) -> LockStatus {
        match self {
            Vault::Plaintext => LockStatus::Plaintext,
            Vault::Locked { .. } => LockStatus::Locked,
            Vault::Unlocked { .. } => LockStatus::Unlocked,
        }
    }

    /// Set once an unlock has checked every stored record.
    fn decryption_verified(&self) -> bool {
        match self {
            Vault::Plaintext => false,
            Vault::Locked {
                decryption_verified,
            }
            | Vault::Unlocked {
                decryption_verified,
                ..
            } => *decryption_verified,
        }
    }
}

/// Secrets of one kind. `plaintext` is only populated while the vault is in
/// plaintext mode, `encrypted` only once it has left it.
#[derive(Debug)]
struct KeyCollection<S: ProtectedSecret> {
    plaintext: BasicKeyStore<S>,
    encrypted: BTreeMap<S::Id, CryptedSecret<S>>,
}

impl<S: ProtectedSecret> Default for KeyCollection<S> {
    fn default() -> Self {
        Self {
            plaintext: BasicKeyStore::new(),
            encrypted: BTreeMap::new(),
        }
    }
}

impl<S: ProtectedSecret> KeyCollection<S> {
    fn contains(&self, id: &S::Id) -> bool {
        self.plaintext.contains(id) || self.encrypted.contains_key(id)
    }

    fn public(&self, id: &S::Id) -> Option<S::Public> {
        self.plaintext
            .get_public(id)
            .or_else(|| self.encrypted.get(id).map(|record| record.public.clone()))
    }

    fn ids(&self) -> Vec<S::Id> {
        let mut ids = self.plaintext.ids();
        ids.extend(self.encrypted.keys().copied());
        ids
    }

    fn add(&mut self, vault: &Vault, secret: S) -> Result<S::Id, KeyStoreError> {
        match vault {
            Vault::Plaintext => Ok(self.plaintext.add(secret)),
            Vault::Locked { .. } => Err(KeyStoreError::Locked),
            Vault::Unlocked { master_key, .. } => {
                let record = encrypt_protected(master_key, &secret)?;
                let id = record.id();
                self.encrypted.insert(id, record);
                Ok(id)
            }
        }
    }

    fn get(&self, vault: &Vault, id: &S::Id) -> Result<S, KeyStoreError> {
        let unknown = || KeyStoreError::unknown_key(S::KIND, id);
        match vault {
            Vault::Plaintext => self.plaintext.get(id).ok_or_else(unknown),
            Vault::Locked { .. } => Err(KeyStoreError::Locked),
            Vault::Unlocked { master_key, .. } => {
                let record = self.encrypted.get(id).ok_or_else(unknown)?;
                Ok(decrypt_protected(master_key, record)?)
            }
        }
    }

    /// Encrypt every plaintext secret without changing the collection.
    fn encrypt_plaintext(
        &self,
        master_key: &KeyingMaterial,
    ) -> Result<BTreeMap<S::Id, CryptedSecret<S>>, CrypterError> {
        self.plaintext
            .iter()
            .map(|secret| encrypt_protected(master_key, secret).map(|record| (record.id(), record)))
            .collect()
    }

    /// Try records against `master_key`. Stops once both a success and a
    /// failure have been seen, and at the first success when
    /// `stop_at_first_success` is set.
    fn verify(&self, master_key: &KeyingMaterial, stop_at_first_success: bool) -> Verification {
        let mut verification = Verification::default();
        for record in self.encrypted.values() {
            match decrypt_protected(master_key, record) {
                Ok(_) => verification.passed = true,
                Err(_) => verification.failed = true,
            }
            if verification.is_mixed() || (verification.passed && stop_at_first_success) {
                break;
            }
        }
        verification
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Verification {
    passed: bool,
    failed: bool,
}

impl Verification {
    fn is_mixed(self) -> bool {
        self.passed && self.failed
    }
}

impl std::ops::BitOr for Verification {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            passed: self.passed || rhs.passed,
            failed: self.failed || rhs.failed,
        }
    }
}

/// Leave plaintext mode if no plaintext secrets are held. Returns whether a
/// transition happened.
fn set_crypted(
    vault: &mut Vault,
    transparent: &KeyCollection<TransparentSecretKey>,
    shielded: &KeyCollection<SpendingKey>,
) -> Result<bool, KeyStoreError> {
    if vault.status().is_crypted() {
        return Ok(false);
    }
    if !transparent.plaintext.is_empty() || !shielded.plaintext.is_empty() {
        return Err(KeyStoreError::PlaintextSecretsRemain);
    }

    *vault = Vault::Locked {
        decryption_verified: false,
    };
    Ok(true)
}

/// Stores transparent and shielded secrets, encrypted under a master key once
/// encryption has been enabled.
///
/// All methods take `&self`; share the store between threads with an `Arc`.
#[derive(Debug)]
pub struct CryptoKeyStore {
    id: KeyStoreId,
    vault: AtomicRw<Vault>,
    transparent: AtomicMutex<KeyCollection<TransparentSecretKey>>,
    shielded: AtomicMutex<KeyCollection<SpendingKey>>,
    events: broadcast::Sender<KeyStoreEvent>,
}

impl Default for CryptoKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoKeyStore {
    /// An empty store in plaintext mode.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            id: KeyStoreId::next(),
            vault: AtomicRw::from((
                Vault::Plaintext,
                Some("CryptoKeyStore::vault"),
                Some(crate::LOG_LOCK_EVENT_CB),
            )),
            transparent: AtomicMutex::from((
                KeyCollection::default(),
                Some("CryptoKeyStore::transparent"),
                Some(crate::LOG_LOCK_EVENT_CB),
            )),
            shielded: AtomicMutex::from((
                KeyCollection::default(),
                Some("CryptoKeyStore::shielded"),
                Some(crate::LOG_LOCK_EVENT_CB),
            )),
            events,
        }
    }

    pub fn id(&self) -> KeyStoreId {
        self.id
    }

    /// Receive a [`KeyStoreEvent`] for every state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<KeyStoreEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> LockStatus {
        self.vault.lock(Vault::status)
    }

    pub fn is_crypted(&self) -> bool {
        self.status().is_crypted()
    }

    pub fn is_locked(&self) -> bool {
        self.status() == LockStatus::Locked
    }

    /// Run `f` with exclusive access to vault and both collections.
    fn with_all_mut<R>(
        &self,
        f: impl FnOnce(
            &mut Vault,
            &mut KeyCollection<TransparentSecretKey>,
            &mut KeyCollection<SpendingKey>,
        ) -> R,
    ) -> R {
        let mut vault = self.vault.lock_guard_mut();
        let mut transparent = self.transparent.lock_guard();
        let mut shielded = self.shielded.lock_guard();
        f(&mut *vault, &mut *transparent, &mut *shielded)
    }

    fn notify(&self, status: LockStatus) {
        // no subscribers is not an error
        let _ = self.events.send(KeyStoreEvent::StatusChanged {
            store: self.id,
            status,
        });
    }

    /// Switch to encrypted mode without adding any secret.
    ///
    /// A no-op for a store that is already encrypted. Fails while plaintext
    /// secrets are held; use [`Self::encrypt_keys`] to convert those.
    pub fn set_crypted(&self) -> Result<(), KeyStoreError> {
        let transitioned = self.with_all_mut(|vault, transparent, shielded| {
            set_crypted(vault, transparent, shielded)
        })?;

        if transitioned {
            debug!(store = %self.id, "key store switched to encrypted mode");
            self.notify(LockStatus::Locked);
        }
        Ok(())
    }

    /// Forget the master key.
    ///
    /// A plaintext store holding no secrets becomes encrypted and locked. A
    /// plaintext store holding secrets cannot be locked.
    pub fn lock(&self) -> Result<(), KeyStoreError> {
        self.with_all_mut(|vault, transparent, shielded| {
            set_crypted(vault, transparent, shielded)?;
            let decryption_verified = vault.decryption_verified();
            // dropping the unlocked vault wipes the master key
            *vault = Vault::Locked {
                decryption_verified,
            };
            Ok::<_, KeyStoreError>(())
        })?;

        info!(store = %self.id, "key store locked");
        self.notify(LockStatus::Locked);
        Ok(())
    }

    /// Check `master_key` against the stored records and, if it decrypts
    /// them, keep it.
    ///
    /// Returns [`KeyStoreError::Corrupted`] if some records decrypt and
    /// others do not. On any error the store's state is unchanged.
    pub fn unlock(&self, master_key: &KeyingMaterial) -> Result<(), KeyStoreError> {
        self.with_all_mut(|vault, transparent, shielded| {
            set_crypted(vault, transparent, shielded)?;

            let stop_at_first_success = vault.decryption_verified();
            let verification = transparent.verify(master_key, stop_at_first_success)
                | shielded.verify(master_key, stop_at_first_success);

            match verification {
                Verification {
                    passed: true,
                    failed: true,
                } => {
                    error!(
                        store = %self.id,
                        "some secrets decrypt under the master key and others do not; key store is corrupted"
                    );
                    Err(KeyStoreError::Corrupted)
                }
                Verification {
                    passed: false,
                    failed: false,
                } => Err(KeyStoreError::NothingToVerify),
                Verification { failed: true, .. } => {
                    warn!(store = %self.id, "unlock attempted with incorrect master key");
                    Err(KeyStoreError::IncorrectMasterKey)
                }
                Verification {
                    passed: true,
                    failed: false,
                } => {
                    *vault = Vault::Unlocked {
                        master_key: master_key.clone(),
                        decryption_verified: true,
                    };
                    Ok(())
                }
            }
        })?;

        info!(store = %self.id, "key store unlocked");
        self.notify(LockStatus::Unlocked);
        Ok(())
    }

    /// Open `record` with `passphrase` and unlock with the recovered master
    /// key.
    pub fn unlock_with_passphrase(
        &self,
        passphrase: &SecureString,
        record: &MasterKeyRecord,
    ) -> Result<(), KeyStoreError> {
        let master_key = record.open(passphrase.as_bytes())?;
        self.unlock(&master_key)
    }

    /// Encrypt every plaintext secret under `master_key` and switch to
    /// encrypted mode.
    ///
    /// Either every secret is converted or, on error, nothing changes. The
    /// store is left locked; call [`Self::unlock`] to use it.
    pub fn encrypt_keys(&self, master_key: &KeyingMaterial) -> Result<(), KeyStoreError> {
        let (transparent_count, spending_count) =
            self.with_all_mut(|vault, transparent, shielded| {
                if vault.status().is_crypted()
                    || !transparent.encrypted.is_empty()
                    || !shielded.encrypted.is_empty()
                {
                    return Err(KeyStoreError::AlreadyEncrypted);
                }

                let transparent_records = transparent.encrypt_plaintext(master_key)?;
                let shielded_records = shielded.encrypt_plaintext(master_key)?;
                let counts = (transparent_records.len(), shielded_records.len());

                // plaintext secrets are wiped as they drop
                drop(transparent.plaintext.drain());
                drop(shielded.plaintext.drain());
                transparent.encrypted = transparent_records;
                shielded.encrypted = shielded_records;
                *vault = Vault::Locked {
                    decryption_verified: false,
                };
                Ok(counts)
            })?;

        info!(
            store = %self.id,
            transparent_count, spending_count, "encrypted key store"
        );
        self.notify(LockStatus::Locked);
        Ok(())
    }

    /// Add a transparent key. In encrypted mode the store must be unlocked.
    pub fn add_key(&self, secret_key: TransparentSecretKey) -> Result<KeyId, KeyStoreError> {
        let vault = self.vault.lock_guard();
        let id = self
            .transparent
            .lock_mut(|transparent| transparent.add(&*vault, secret_key))?;
        debug!(store = %self.id, key_id = %id, "added transparent key");
        Ok(id)
    }

    /// Add a spending key. In encrypted mode the store must be unlocked.
    pub fn add_spending_key(
        &self,
        spending_key: SpendingKey,
    ) -> Result<PaymentAddress, KeyStoreError> {
        let vault = self.vault.lock_guard();
        let address = self
            .shielded
            .lock_mut(|shielded| shielded.add(&*vault, spending_key))?;
        debug!(store = %self.id, %address, "added spending key");
        Ok(address)
    }

    /// File an encrypted transparent key, switching the store to encrypted
    /// mode if it is still an empty plaintext store.
    ///
    /// The record is not checked until the next unlock.
    pub fn load_crypted_key(
        &self,
        public_key: TransparentPublicKey,
        ciphertext: Vec<u8>,
    ) -> Result<KeyId, KeyStoreError> {
        let record = CryptedSecret::new(public_key, ciphertext);
        let id = record.id();
        let transitioned = self.with_all_mut(|vault, transparent, shielded| {
            let transitioned = set_crypted(vault, transparent, shielded)?;
            transparent.encrypted.insert(id, record);
            Ok::<_, KeyStoreError>(transitioned)
        })?;

        if transitioned {
            self.notify(LockStatus::Locked);
        }
        Ok(id)
    }

    /// File an encrypted spending key, switching the store to encrypted mode
    /// if it is still an empty plaintext store.
    ///
    /// The record is not checked until the next unlock.
    pub fn load_crypted_spending_key(
        &self,
        address: PaymentAddress,
        viewing_key: ViewingKey,
        ciphertext: Vec<u8>,
    ) -> Result<PaymentAddress, KeyStoreError> {
        let record = CryptedSecret::<SpendingKey>::new(
            ShieldedIdentity {
                address,
                viewing_key,
            },
            ciphertext,
        );
        let transitioned = self.with_all_mut(|vault, transparent, shielded| {
            let transitioned = set_crypted(vault, transparent, shielded)?;
            shielded.encrypted.insert(address, record);
            Ok::<_, KeyStoreError>(transitioned)
        })?;

        if transitioned {
            self.notify(LockStatus::Locked);
        }
        Ok(address)
    }

    /// An owned copy of the transparent key stored under `id`.
    pub fn get_key(&self, id: &KeyId) -> Result<TransparentSecretKey, KeyStoreError> {
        let vault = self.vault.lock_guard();
        self.transparent.lock(|transparent| transparent.get(&*vault, id))
    }

    /// An owned copy of the spending key for `address`.
    pub fn get_spending_key(&self, address: &PaymentAddress) -> Result<SpendingKey, KeyStoreError> {
        let vault = self.vault.lock_guard();
        self.shielded.lock(|shielded| shielded.get(&*vault, address))
    }

    pub fn get_public_key(&self, id: &KeyId) -> Option<TransparentPublicKey> {
        self.transparent.lock(|transparent| transparent.public(id))
    }

    pub fn have_key(&self, id: &KeyId) -> bool {
        self.transparent.lock(|transparent| transparent.contains(id))
    }

    pub fn key_ids(&self) -> Vec<KeyId> {
        self.transparent.lock(KeyCollection::ids)
    }

    pub fn have_spending_key(&self, address: &PaymentAddress) -> bool {
        self.shielded.lock(|shielded| shielded.contains(address))
    }

    /// Viewing keys are readable in every state, including locked.
    pub fn get_viewing_key(&self, address: &PaymentAddress) -> Option<ViewingKey> {
        self.shielded
            .lock(|shielded| shielded.public(address))
            .map(|identity| identity.viewing_key)
    }

    pub fn spending_key_addresses(&self) -> Vec<PaymentAddress> {
        self.shielded.lock(KeyCollection::ids)
    }

    /// Snapshot of the encrypted transparent records, in the form
    /// [`Self::load_crypted_key`] accepts. Empty in plaintext mode.
    pub fn crypted_keys(&self) -> Vec<CryptedSecret<TransparentSecretKey>> {
        self.transparent
            .lock(|transparent| transparent.encrypted.values().cloned().collect())
    }

    /// Snapshot of the encrypted spending key records, in the form
    /// [`Self::load_crypted_spending_key`] accepts. Empty in plaintext mode.
    pub fn crypted_spending_keys(&self) -> Vec<CryptedSecret<SpendingKey>> {
        self.shielded
            .lock(|shielded| shielded.encrypted.values().cloned().collect())
    }
}
