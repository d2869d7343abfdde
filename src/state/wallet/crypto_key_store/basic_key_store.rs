use std::collections::BTreeMap;

use super::secret_envelope::ProtectedSecret;

/// Plaintext container for secrets, keyed by identifier.
#[derive(Debug, Clone)]
pub struct BasicKeyStore<S: ProtectedSecret> {
    secrets: BTreeMap<S::Id, S>,
}

impl<S: ProtectedSecret> Default for BasicKeyStore<S> {
    fn default() -> Self {
        Self {
            secrets: BTreeMap::new(),
        }
    }
}

impl<S: ProtectedSecret> BasicKeyStore<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `secret`, replacing any secret with the same identifier.
    pub fn add(&mut self, secret: S) -> S::Id {
        let id = secret.id();
        self.secrets.insert(id, secret);
        id
    }

    pub fn get(&self, id: &S::Id) -> Option<S> {
        self.secrets.get(id).cloned()
    }

    pub fn get_public(&self, id: &S::Id) -> Option<S::Public> {
        self.secrets.get(id).map(ProtectedSecret::public)
    }

    pub fn contains(&self, id: &S::Id) -> bool {
        self.secrets.contains_key(id)
    }

    pub fn ids(&self) -> Vec<S::Id> {
        self.secrets.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &S> {
        self.secrets.values()
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Remove and return every secret.
    pub fn drain(&mut self) -> Vec<S> {
        std::mem::take(&mut self.secrets).into_values().collect()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::state::wallet::address::SpendingKey;
    use crate::state::wallet::address::TransparentSecretKey;

    #[test]
    fn add_then_get() {
        let mut store = BasicKeyStore::<TransparentSecretKey>::new();
        let key = TransparentSecretKey::from_seed(&[1u8; 32], true);

        let id = store.add(key.clone());

        assert!(store.contains(&id));
        assert_eq!(Some(key.clone()), store.get(&id));
        assert_eq!(Some(key.public_key()), store.get_public(&id));
        assert_eq!(vec![id], store.ids());
    }

    #[test]
    fn same_key_added_twice_is_stored_once() {
        let mut store = BasicKeyStore::<SpendingKey>::new();
        let key = SpendingKey::from_seed(&[1u8; 32]);

        store.add(key.clone());
        store.add(key);

        assert_eq!(1, store.len());
    }

    #[test]
    fn drain_empties_store() {
        let mut store = BasicKeyStore::<SpendingKey>::new();
        store.add(SpendingKey::from_seed(&[1u8; 32]));
        store.add(SpendingKey::from_seed(&[2u8; 32]));

        let drained = store.drain();

        assert_eq!(2, drained.len());
        assert!(store.is_empty());
        assert!(store.ids().is_empty());
    }

    #[test]
    fn unknown_id_is_absent() {
        let store = BasicKeyStore::<TransparentSecretKey>::new();
        let id = TransparentSecretKey::from_seed(&[1u8; 32], true).public_key().id();

        assert!(store.get(&id).is_none());
        assert!(store.get_public(&id).is_none());
    }
}
