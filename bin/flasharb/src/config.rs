//! Layered settings: defaults, then `flasharb.toml`, then `FLASHARB_*` env vars,
//! then command line flags.

use std::{fmt, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use flasharb_deploy::{
    DEFAULT_ENV_FILE, DEFAULT_RECEIPT_POLL_INTERVAL, DEFAULT_VERIFY_DELAY, ETHERSCAN_V2_API_URL,
    artifact::{DEFAULT_ARTIFACT_PATH, DEFAULT_BUILD_INFO_DIR},
};
use serde::{Deserialize, Serialize};

use crate::cli::DeployArgs;

/// Prefix of the environment variables read into [`Settings`].
pub const ENV_PREFIX: &str = "FLASHARB_";

/// RPC endpoint used for local networks when none is configured.
pub const LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    pub env_file: PathBuf,
    pub artifact: PathBuf,
    pub build_info_dir: PathBuf,
    pub verify_delay_secs: u64,
    pub receipt_poll_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_api_key: Option<String>,
    pub explorer_api_url: String,
    pub no_verify: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            network: None,
            rpc_url: None,
            private_key: None,
            env_file: PathBuf::from(DEFAULT_ENV_FILE),
            artifact: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            build_info_dir: PathBuf::from(DEFAULT_BUILD_INFO_DIR),
            verify_delay_secs: DEFAULT_VERIFY_DELAY.as_secs(),
            receipt_poll_interval_ms: DEFAULT_RECEIPT_POLL_INTERVAL.as_millis() as u64,
            explorer_api_key: None,
            explorer_api_url: ETHERSCAN_V2_API_URL.to_string(),
            no_verify: false,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |secret: &Option<String>| secret.as_ref().map(|_| "<redacted>");

        f.debug_struct("Settings")
            .field("network", &self.network)
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &redacted(&self.private_key))
            .field("env_file", &self.env_file)
            .field("artifact", &self.artifact)
            .field("build_info_dir", &self.build_info_dir)
            .field("verify_delay_secs", &self.verify_delay_secs)
            .field("receipt_poll_interval_ms", &self.receipt_poll_interval_ms)
            .field("explorer_api_key", &redacted(&self.explorer_api_key))
            .field("explorer_api_url", &self.explorer_api_url)
            .field("no_verify", &self.no_verify)
            .finish()
    }
}

impl Settings {
    /// Resolve settings for a deploy run. A missing config file is not an error.
    pub fn load(config_path: &Path, args: &DeployArgs) -> Result<Self> {
        Self::base(config_path)
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(args))
            .extract()
            .with_context(|| format!("Failed to load settings from {}", config_path.display()))
    }

    /// Defaults layered under the config file.
    fn base(config_path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(config_path))
    }

    pub fn network(&self) -> Result<&str> {
        self.network
            .as_deref()
            .filter(|network| !network.is_empty())
            .context("No network given: pass --network or set FLASHARB_NETWORK")
    }

    /// The configured RPC endpoint, falling back to a local node for local networks.
    pub fn rpc_url(&self, local: bool) -> Result<&str> {
        match self.rpc_url.as_deref() {
            Some(url) if !url.is_empty() => Ok(url),
            _ if local => Ok(LOCAL_RPC_URL),
            _ => anyhow::bail!("No RPC URL configured: pass --rpc-url or set FLASHARB_RPC_URL"),
        }
    }

    pub fn private_key(&self) -> Result<&str> {
        self.private_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .context("No deployer key configured: set FLASHARB_PRIVATE_KEY")
    }

    pub fn verify_delay(&self) -> Duration {
        Duration::from_secs(self.verify_delay_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_defaults_without_config_file() {
        let dir = TempDir::new("flasharb-config").unwrap();

        let settings = Settings::base(&dir.path().join("missing.toml"))
            .extract::<Settings>()
            .unwrap();

        assert_eq!(settings.env_file, PathBuf::from(".env"));
        assert_eq!(settings.verify_delay(), Duration::from_secs(30));
        assert_eq!(settings.receipt_poll_interval(), Duration::from_secs(2));
        assert_eq!(settings.explorer_api_url, ETHERSCAN_V2_API_URL);
        assert!(settings.network.is_none());
        assert!(!settings.no_verify);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new("flasharb-config").unwrap();
        let path = dir.path().join("flasharb.toml");
        std::fs::write(
            &path,
            "network = \"sepolia\"\nrpc_url = \"https://rpc.sepolia.org\"\nverify_delay_secs = 5\n",
        )
        .unwrap();
        let args = DeployArgs {
            network: Some("base".to_string()),
            no_verify: true,
            ..Default::default()
        };

        let settings = Settings::base(&path)
            .merge(Serialized::defaults(&args))
            .extract::<Settings>()
            .unwrap();

        assert_eq!(settings.network().unwrap(), "base");
        assert_eq!(settings.rpc_url(false).unwrap(), "https://rpc.sepolia.org");
        assert_eq!(settings.verify_delay(), Duration::from_secs(5));
        assert!(settings.no_verify);
    }

    #[test]
    fn test_local_networks_default_rpc_url() {
        let settings = Settings::default();

        assert_eq!(settings.rpc_url(true).unwrap(), LOCAL_RPC_URL);
        assert!(settings.rpc_url(false).is_err());
        assert!(settings.private_key().is_err());
        assert!(settings.network().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = Settings {
            private_key: Some("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string()),
            explorer_api_key: Some("ABCDEF123".to_string()),
            ..Default::default()
        };

        let debug = format!("{settings:?}");

        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("ac0974bec"));
        assert!(!debug.contains("ABCDEF123"));
    }
}
