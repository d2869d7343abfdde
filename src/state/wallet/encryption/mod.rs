//! Passphrase-based encryption of key material using Argon2id + AES-256-GCM
//!
//! ## Architecture
//!
//! ```text
//! Passphrase (bytes)
//!     ↓ Argon2id (salt, rounds, memory limit)
//! Sealing key + IV
//!     ↓ AES-256-GCM
//! Master Key (256 bits, random)             -> MasterKeyRecord
//!     ↓ AES-256-GCM, IV bound to the secret's public identity
//! Encrypted secrets                         -> CryptoKeyStore
//! ```
//!
//! ## Usage
//!
//! ```
//! use neptune_keystore::application::config::kdf_config::KdfConfig;
//! use neptune_keystore::state::wallet::encryption::generate_master_key;
//! use neptune_keystore::state::wallet::encryption::MasterKeyRecord;
//!
//! # fn main() -> anyhow::Result<()> {
//! let kdf = KdfConfig::default().with_rounds(1).with_memory_limit_bytes(64 * 1024);
//! let master_key = generate_master_key();
//! let record = MasterKeyRecord::seal(&master_key, b"passphrase", &kdf)?;
//!
//! assert_eq!(master_key, record.open(b"passphrase")?);
//! # Ok(())
//! # }
//! ```

pub use cipher::Crypter;
pub use cipher::CrypterError;
pub use cipher::IV_SIZE;
pub use cipher::KEY_SIZE;
pub use cipher::SALT_SIZE;
pub use cipher::TAG_SIZE;
pub use compact_size::CompactSizeError;
pub use key_derivation::generate_master_key;
pub use key_derivation::generate_salt;
pub use key_derivation::DERIVATION_METHOD_ARGON2ID;
pub use keying_material::KeyingMaterial;
pub use master_key::MasterKeyError;
pub use master_key::MasterKeyRecord;

/// A passphrase that is wiped when dropped.
pub type SecureString = zeroize::Zeroizing<String>;

mod cipher;
pub mod compact_size;
mod key_derivation;
mod keying_material;
mod master_key;
