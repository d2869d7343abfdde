use serde::Deserialize;
use serde::Serialize;

use crate::state::wallet::encryption::compact_size::write_compact_size;
use crate::state::wallet::encryption::compact_size::MAX_COMPACT_SIZE;
use crate::state::wallet::encryption::DERIVATION_METHOD_ARGON2ID;

/// Parameters for sealing a master key under a passphrase.
///
/// Stored alongside every sealed master key, so changing the defaults never
/// affects keys that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Number of Argon2id passes over memory.
    pub rounds: u32,

    /// Argon2id memory limit in bytes.
    pub memory_limit_bytes: u64,

    pub derivation_method: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            rounds: Self::DEFAULT_ROUNDS,
            memory_limit_bytes: Self::DEFAULT_MEMORY_LIMIT_BYTES,
            derivation_method: DERIVATION_METHOD_ARGON2ID,
        }
    }
}

impl KdfConfig {
    pub const DEFAULT_ROUNDS: u32 = 3;
    pub const DEFAULT_MEMORY_LIMIT_BYTES: u64 = 16 * 1024 * 1024;

    /// Largest memory limit the derivation parameters can carry.
    pub const MAX_MEMORY_LIMIT_BYTES: u64 = MAX_COMPACT_SIZE;

    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_memory_limit_bytes(mut self, memory_limit_bytes: u64) -> Self {
        self.memory_limit_bytes = memory_limit_bytes;
        self
    }

    /// The method-specific parameter blob handed to the key derivation.
    pub fn other_derivation_params(&self) -> Vec<u8> {
        write_compact_size(self.memory_limit_bytes)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::state::wallet::encryption::compact_size::read_compact_size;

    #[test]
    fn default_is_argon2id() {
        let config = KdfConfig::default();

        assert_eq!(DERIVATION_METHOD_ARGON2ID, config.derivation_method);
        assert!(config.rounds >= 1);
        assert!(config.memory_limit_bytes <= KdfConfig::MAX_MEMORY_LIMIT_BYTES);
    }

    #[test]
    fn params_carry_memory_limit() {
        let config = KdfConfig::default().with_memory_limit_bytes(1 << 20);
        let (memory_limit, _) = read_compact_size(&config.other_derivation_params()).unwrap();
        assert_eq!(1 << 20, memory_limit);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: KdfConfig = serde_json::from_str(r#"{"rounds": 9}"#).unwrap();

        assert_eq!(9, config.rounds);
        assert_eq!(
            KdfConfig::DEFAULT_MEMORY_LIMIT_BYTES,
            config.memory_limit_bytes
        );
    }
}
