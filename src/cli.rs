use std::path::PathBuf;

use anyhow::{Result, anyhow};

const USAGE: &str = "usage: escrow-agent [--config <path>] (--request <path> | --cancel <contract-id> [--reason <text>])";
const DEFAULT_CANCEL_REASON: &str = "manual operator action";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Release { request_path: PathBuf },
    /// Refund one escrow to its payer.
    Cancel { contract_id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: PathBuf,
    pub command: Command,
}

pub fn args_from_env() -> Result<CliArgs> {
    parse_args(std::env::args().skip(1))
}

pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut args = args.into_iter();
    let mut config_path = None;
    let mut request_path = None;
    let mut cancel = None;
    let mut reason = None;

    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--config" => &mut config_path,
            "--request" => &mut request_path,
            "--cancel" => &mut cancel,
            "--reason" => &mut reason,
            other => return Err(anyhow!("unknown argument: {other}. {USAGE}")),
        };
        let value = args
            .next()
            .ok_or_else(|| anyhow!("missing value for {arg}"))?;
        *slot = Some(value);
    }

    let command = match (request_path, cancel) {
        (Some(_), Some(_)) => {
            return Err(anyhow!("--request and --cancel are mutually exclusive. {USAGE}"));
        }
        (Some(path), None) => {
            if reason.is_some() {
                return Err(anyhow!("--reason only applies to --cancel. {USAGE}"));
            }
            Command::Release {
                request_path: PathBuf::from(path),
            }
        }
        (None, Some(contract_id)) => Command::Cancel {
            contract_id,
            reason: reason.unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string()),
        },
        (None, None) => return Err(anyhow!("missing --request or --cancel. {USAGE}")),
    };

    Ok(CliArgs {
        config_path: config_path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./escrow-agent.jsonc")),
        command,
    })
}
