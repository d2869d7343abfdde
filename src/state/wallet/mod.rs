pub mod address;
pub mod crypto_key_store;
pub mod encryption;
