//! Passphrase-based derivation of the cipher key and IV.
//!
//! Method 0 is Argon2id. Its memory limit, in bytes, travels in the
//! method-specific parameter blob as a compact size.

use argon2::Algorithm;
use argon2::Argon2;
use argon2::ParamsBuilder;
use argon2::Version;
use rand::Rng;

use super::compact_size::read_compact_size;
use super::CrypterError;
use super::KeyingMaterial;
use super::IV_SIZE;
use super::KEY_SIZE;
use super::SALT_SIZE;

/// Identifier of the Argon2id derivation method.
pub const DERIVATION_METHOD_ARGON2ID: u32 = 0;

const ARGON2_PARALLELISM: u32 = 1;

/// Derive `KEY_SIZE + IV_SIZE` bytes from `passphrase`.
///
/// The returned buffer is wiped when dropped, including when the caller
/// bails out after a partial read of it.
pub(crate) fn derive_key_and_iv(
    passphrase: &[u8],
    salt: &[u8],
    rounds: u32,
    derivation_method: u32,
    other_derivation_params: &[u8],
) -> Result<KeyingMaterial, CrypterError> {
    if salt.len() != SALT_SIZE {
        return Err(CrypterError::InvalidSaltLength(salt.len()));
    }
    if rounds == 0 {
        return Err(CrypterError::ZeroRounds);
    }

    match derivation_method {
        DERIVATION_METHOD_ARGON2ID => {
            let (memory_limit, _) = read_compact_size(other_derivation_params)?;
            argon2id(passphrase, salt, rounds, memory_limit)
        }
        unknown => Err(CrypterError::UnsupportedDerivationMethod(unknown)),
    }
}

fn argon2id(
    passphrase: &[u8],
    salt: &[u8],
    rounds: u32,
    memory_limit_bytes: u64,
) -> Result<KeyingMaterial, CrypterError> {
    let m_cost = u32::try_from(memory_limit_bytes / 1024)
        .map_err(|_| CrypterError::InvalidDerivationMemory(memory_limit_bytes))?;

    let params = ParamsBuilder::new()
        .m_cost(m_cost)
        .t_cost(rounds)
        .p_cost(ARGON2_PARALLELISM)
        .output_len(KEY_SIZE + IV_SIZE)
        .build()?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut derived = KeyingMaterial::zeroed(KEY_SIZE + IV_SIZE);
    argon2.hash_password_into(passphrase, salt, derived.as_bytes_mut())?;

    tracing::trace!(rounds, m_cost, "derived cipher key from passphrase");
    Ok(derived)
}

/// Generate a random salt for a new master key record.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::rng().fill(&mut salt);
    salt
}

/// Generate a fresh random master key.
pub fn generate_master_key() -> KeyingMaterial {
    let mut master_key = KeyingMaterial::zeroed(KEY_SIZE);
    rand::rng().fill(master_key.as_bytes_mut());
    master_key
}
