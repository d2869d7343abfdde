use anyhow::ensure;
use anyhow::Context;
use anyhow::Result;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::application::config::kdf_config::KdfConfig;
use crate::state::wallet::address::SpendingKey;
use crate::state::wallet::address::TransparentSecretKey;
use crate::state::wallet::crypto_key_store::CryptoKeyStore;
use crate::state::wallet::crypto_key_store::KeyStoreError;
use crate::state::wallet::crypto_key_store::LockStatus;
use crate::state::wallet::encryption::generate_master_key;
use crate::state::wallet::encryption::MasterKeyRecord;
use crate::state::wallet::encryption::SecureString;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelftestReport {
    pub store: String,
    pub transparent_keys: usize,
    pub spending_keys: usize,
    pub kdf: KdfConfig,
    pub status_changes: Vec<LockStatus>,
    pub final_status: LockStatus,
}

/// Generate sample keys, encrypt them under a fresh passphrase-sealed master
/// key and walk the store through lock and unlock, checking that every secret
/// comes back intact.
pub fn selftest(
    kdf_config: &KdfConfig,
    transparent_keys: usize,
    spending_keys: usize,
) -> Result<SelftestReport> {
    ensure!(
        transparent_keys + spending_keys > 0,
        "selftest needs at least one key to verify the master key against"
    );

    let mut rng = rand::rng();
    let store = CryptoKeyStore::new();
    let mut events = store.subscribe();

    let transparent = (0..transparent_keys)
        .map(|i| TransparentSecretKey::from_seed(&rng.random(), i % 2 == 0))
        .collect::<Vec<_>>();
    let spending = (0..spending_keys)
        .map(|_| SpendingKey::from_seed(&rng.random()))
        .collect::<Vec<_>>();

    for key in &transparent {
        store.add_key(key.clone())?;
    }
    for key in &spending {
        store.add_spending_key(key.clone())?;
    }

    let passphrase = SecureString::new(hex::encode(rng.random::<[u8; 16]>()));
    let master_key = generate_master_key();
    let record = MasterKeyRecord::seal(&master_key, passphrase.as_bytes(), kdf_config)?;
    info!(store = %store.id(), "sealed master key");

    store
        .encrypt_keys(&master_key)
        .context("encrypting sample keys")?;
    ensure!(store.is_locked(), "store not locked after encryption");

    if let Some(key) = transparent.first() {
        ensure!(
            store.get_key(&key.id()) == Err(KeyStoreError::Locked),
            "secret readable while locked"
        );
    }

    store
        .unlock_with_passphrase(&passphrase, &record)
        .context("unlocking with passphrase")?;

    for key in &transparent {
        ensure!(
            store.get_key(&key.id())? == *key,
            "transparent key {} did not round-trip",
            key.id()
        );
    }
    for key in &spending {
        let address = key.address();
        ensure!(
            store.get_spending_key(&address)? == *key,
            "spending key {} did not round-trip",
            address
        );
    }

    store.lock()?;
    for key in &spending {
        ensure!(
            store.get_viewing_key(&key.address()) == Some(key.viewing_key()),
            "viewing key unavailable while locked"
        );
    }

    let mut status_changes = vec![];
    while let Ok(event) = events.try_recv() {
        status_changes.push(event.status());
    }

    Ok(SelftestReport {
        store: store.id().to_string(),
        transparent_keys,
        spending_keys,
        kdf: *kdf_config,
        status_changes,
        final_status: store.status(),
    })
}
