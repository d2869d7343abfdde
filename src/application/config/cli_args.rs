use std::time::Duration;

use clap::Parser;

use super::kdf_config::KdfConfig;

/// The `neptune-keystore` program exercises and tunes the encrypted key store.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct Args {
    /// Argon2id memory limit, in bytes, used when sealing master keys.
    #[clap(long, default_value_t = KdfConfig::DEFAULT_MEMORY_LIMIT_BYTES, value_parser = clap::value_parser!(u64).range(8 * 1024..=KdfConfig::MAX_MEMORY_LIMIT_BYTES))]
    pub memory_limit_bytes: u64,

    /// Argon2id rounds used when sealing master keys.
    #[clap(long, default_value_t = KdfConfig::DEFAULT_ROUNDS, value_parser = clap::value_parser!(u32).range(1..))]
    pub rounds: u32,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Parser)]
pub enum Command {
    /// Find the number of Argon2id rounds that takes about `target-millis` to
    /// unlock with the configured memory limit.
    Calibrate {
        #[clap(long, default_value = "1000")]
        target_millis: u64,

        /// Upper bound on the rounds tried.
        #[clap(long, default_value = "64")]
        max_rounds: u32,
    },

    /// Run a full encrypt, lock and unlock cycle on sample keys and print a
    /// JSON summary.
    Selftest {
        /// Number of transparent keys to generate.
        #[clap(long, default_value = "2")]
        transparent_keys: usize,

        /// Number of spending keys to generate.
        #[clap(long, default_value = "1")]
        spending_keys: usize,
    },
}

impl Args {
    pub fn kdf_config(&self) -> KdfConfig {
        KdfConfig::default()
            .with_rounds(self.rounds)
            .with_memory_limit_bytes(self.memory_limit_bytes)
    }
}

impl Command {
    pub fn calibration_target(&self) -> Option<Duration> {
        match self {
            Command::Calibrate { target_millis, .. } => Some(Duration::from_millis(*target_millis)),
            Command::Selftest { .. } => None,
        }
    }
}
