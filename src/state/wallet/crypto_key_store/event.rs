use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;

/// Lock state of a key store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum LockStatus {
    /// Secrets are held unencrypted.
    Plaintext,

    /// Secrets are encrypted and no master key is held.
    Locked,

    /// Secrets are encrypted and the master key is held.
    Unlocked,
}

impl LockStatus {
    pub fn is_crypted(&self) -> bool {
        !matches!(self, Self::Plaintext)
    }
}

/// Identifies the key store an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyStoreId(u64);

impl KeyStoreId {
    pub(super) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for KeyStoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "keystore-{}", self.0)
    }
}

/// Notification published after a key store changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum KeyStoreEvent {
    StatusChanged { store: KeyStoreId, status: LockStatus },
}

impl KeyStoreEvent {
    pub fn store(&self) -> KeyStoreId {
        match self {
            Self::StatusChanged { store, .. } => *store,
        }
    }

    pub fn status(&self) -> LockStatus {
        match self {
            Self::StatusChanged { status, .. } => *status,
        }
    }
}
