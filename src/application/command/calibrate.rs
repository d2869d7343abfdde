use std::time::Duration;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::application::config::kdf_config::KdfConfig;
use crate::state::wallet::encryption::generate_master_key;
use crate::state::wallet::encryption::MasterKeyError;
use crate::state::wallet::encryption::MasterKeyRecord;

const CALIBRATION_PASSPHRASE: &[u8] = b"calibration";

/// Outcome of searching for a round count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalibrationReport {
    pub memory_limit_bytes: u64,
    pub rounds: u32,
    pub unlock_millis: u128,
    pub target_millis: u128,
}

/// Find the largest number of rounds, up to `max_rounds`, for which opening a
/// sealed master key takes no longer than `target`. At least one round is
/// always reported.
pub fn calibrate(
    kdf_config: &KdfConfig,
    target: Duration,
    max_rounds: u32,
) -> Result<CalibrationReport, MasterKeyError> {
    let master_key = generate_master_key();
    let mut best = None;

    for rounds in 1..=max_rounds.max(1) {
        let config = kdf_config.with_rounds(rounds);
        let record = MasterKeyRecord::seal(&master_key, CALIBRATION_PASSPHRASE, &config)?;

        let start = Instant::now();
        record.open(CALIBRATION_PASSPHRASE)?;
        let elapsed = start.elapsed();
        debug!(rounds, elapsed_millis = elapsed.as_millis(), "calibration step");

        if elapsed > target && best.is_some() {
            break;
        }
        best = Some((rounds, elapsed));
        if elapsed > target {
            break;
        }
    }

    let (rounds, elapsed) = best.unwrap_or((1, Duration::ZERO));
    Ok(CalibrationReport {
        memory_limit_bytes: kdf_config.memory_limit_bytes,
        rounds,
        unlock_millis: elapsed.as_millis(),
        target_millis: target.as_millis(),
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn fast_kdf() -> KdfConfig {
        KdfConfig::default().with_memory_limit_bytes(64 * 1024)
    }

    #[test]
    fn zero_target_reports_one_round() {
        let report = calibrate(&fast_kdf(), Duration::ZERO, 8).unwrap();
        assert_eq!(1, report.rounds);
    }

    #[test]
    fn rounds_are_capped() {
        let report = calibrate(&fast_kdf(), Duration::from_secs(3600), 3).unwrap();

        assert_eq!(3, report.rounds);
        assert_eq!(64 * 1024, report.memory_limit_bytes);
    }
}
