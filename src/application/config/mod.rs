pub mod cli_args;
pub mod kdf_config;
