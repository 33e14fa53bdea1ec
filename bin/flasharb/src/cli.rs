use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::level_filters::LevelFilter;

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "flasharb.toml";

#[derive(Parser)]
#[command(name = "flasharb")]
#[command(
    author,
    version,
    about = "Deploy and verify the FlashArbitrage contract"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, global = true, env = "FLASHARB_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the TOML configuration file. A missing file is ignored.
    #[arg(short, long, global = true, env = "FLASHARB_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy FlashArbitrage to a network, record its address and verify it.
    Deploy(DeployArgs),
    /// List the supported networks and their protocol addresses.
    Networks,
}

/// Deployment overrides.
///
/// Every field is optional so that unset flags fall through to the environment,
/// the configuration file, and the defaults, in that order.
#[derive(Debug, Clone, Default, Args, Serialize)]
pub struct DeployArgs {
    /// Network to deploy to (e.g. sepolia, base, hardhat).
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    /// JSON-RPC endpoint of the network.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,

    /// Hex-encoded deployer private key. Prefer FLASHARB_PRIVATE_KEY.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,

    /// Env file the deployed address is recorded in.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_file: Option<PathBuf>,

    /// Hardhat artifact of the contract.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,

    /// Directory holding Hardhat build-info files.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_info_dir: Option<PathBuf>,

    /// Seconds to wait before verifying on the block explorer.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_delay_secs: Option<u64>,

    /// Block explorer API key.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_api_key: Option<String>,

    /// Block explorer API endpoint.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_api_url: Option<String>,

    /// Skip block explorer verification.
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_verify: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deploy() {
        let cli = Cli::parse_from([
            "flasharb",
            "deploy",
            "--network",
            "sepolia",
            "--rpc-url",
            "https://rpc.sepolia.org",
            "--no-verify",
        ]);

        let Command::Deploy(args) = cli.command else {
            panic!("expected deploy command");
        };
        assert_eq!(args.network.as_deref(), Some("sepolia"));
        assert_eq!(args.rpc_url.as_deref(), Some("https://rpc.sepolia.org"));
        assert!(args.no_verify);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_unset_flags_are_not_serialized() {
        let args = DeployArgs {
            network: Some("base".to_string()),
            ..Default::default()
        };

        let value = serde_json::to_value(&args).unwrap();

        assert_eq!(value, serde_json::json!({ "network": "base" }));
    }
}
