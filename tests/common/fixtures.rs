use neptune_keystore::application::config::kdf_config::KdfConfig;
use neptune_keystore::SpendingKey;
use neptune_keystore::TransparentSecretKey;
use rand::Rng;

/// Cheap derivation settings. Real deployments use [`KdfConfig::default`].
pub fn fast_kdf() -> KdfConfig {
    KdfConfig::default()
        .with_rounds(1)
        .with_memory_limit_bytes(64 * 1024)
}

pub fn random_transparent_keys(count: usize) -> Vec<TransparentSecretKey> {
    let mut rng = rand::rng();
    (0..count)
        .map(|i| TransparentSecretKey::from_seed(&rng.random(), i % 2 == 0))
        .collect()
}

pub fn random_spending_keys(count: usize) -> Vec<SpendingKey> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| SpendingKey::from_seed(&rng.random()))
        .collect()
}
