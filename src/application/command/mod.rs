//! Subcommands of the `neptune-keystore` binary. Each returns a report that
//! the binary prints as JSON.

pub mod calibrate;
pub mod selftest;

use serde::Serialize;

use self::calibrate::CalibrationReport;
use self::selftest::SelftestReport;
use super::config::cli_args::Args;
use super::config::cli_args::Command;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Calibration(CalibrationReport),
    Selftest(SelftestReport),
}

pub fn run(args: &Args) -> anyhow::Result<Report> {
    let kdf_config = args.kdf_config();
    let report = match &args.command {
        Command::Calibrate { max_rounds, .. } => {
            let target = args.command.calibration_target().unwrap_or_default();
            Report::Calibration(calibrate::calibrate(&kdf_config, target, *max_rounds)?)
        }
        Command::Selftest {
            transparent_keys,
            spending_keys,
        } => Report::Selftest(selftest::selftest(
            &kdf_config,
            *transparent_keys,
            *spending_keys,
        )?),
    };
    Ok(report)
}
