//! Etherscan (v2 multichain API) source verification.

use std::{path::PathBuf, time::Duration};

use alloy_core::primitives::Address;
use anyhow::Context;
use backon::{ConstantBuilder, Retryable};
use serde::Deserialize;
use url::Url;

use crate::{
    ExplorerVerifier, NetworkConfig, VerificationError,
    artifact::{BuildInfo, ContractArtifact, encode_constructor_args},
    rpc,
};

/// Etherscan v2 endpoint; the target chain is selected by the `chainid` parameter.
pub const ETHERSCAN_V2_API_URL: &str = "https://api.etherscan.io/v2/api";

const DEFAULT_STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_MAX_STATUS_CHECKS: usize = 12;

/// Envelope of every Etherscan API response.
#[derive(Debug, Clone, Deserialize)]
struct EtherscanResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: String,
}

/// Verifies `FlashArbitrage` sources with the compiler input from Hardhat build-info.
#[derive(Debug, Clone)]
pub struct EtherscanVerifier {
    client: reqwest::Client,
    api_url: Url,
    api_key: Option<String>,
    source_name: String,
    contract_name: String,
    build_info_dir: PathBuf,
    status_poll_interval: Duration,
    max_status_checks: usize,
}

impl EtherscanVerifier {
    pub fn new(
        api_url: Url,
        api_key: Option<String>,
        artifact: &ContractArtifact,
        build_info_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: rpc::create_client(rpc::DEFAULT_TIMEOUT)?,
            api_url,
            api_key,
            source_name: artifact.source_name.clone(),
            contract_name: artifact.contract_name.clone(),
            build_info_dir,
            status_poll_interval: DEFAULT_STATUS_POLL_INTERVAL,
            max_status_checks: DEFAULT_MAX_STATUS_CHECKS,
        })
    }

    /// Override how often, and how many times, a submitted GUID is checked.
    pub fn status_polling(mut self, interval: Duration, max_checks: usize) -> Self {
        self.status_poll_interval = interval;
        self.max_status_checks = max_checks;
        self
    }

    async fn submit(
        &self,
        api_key: &str,
        network: &NetworkConfig,
        address: Address,
        constructor_args: &[Address],
    ) -> Result<String, VerificationError> {
        let build_info =
            BuildInfo::find(&self.build_info_dir, &self.source_name, &self.contract_name)?;

        let source_code = serde_json::to_string(&build_info.input)
            .context("Failed to serialize compiler input")?;
        let contract_address = address.to_string();
        let contract_name = format!("{}:{}", self.source_name, self.contract_name);
        let compiler_version = build_info.compiler_version();
        let encoded_args = hex::encode(encode_constructor_args(constructor_args));

        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("chainid", &network.chain_id.to_string());

        tracing::debug!(
            network = %network.network_id,
            contract = %contract_name,
            compiler = %compiler_version,
            "Submitting source code for verification"
        );

        let response: EtherscanResponse = self
            .client
            .post(url)
            .form(&[
                ("apikey", api_key),
                ("module", "contract"),
                ("action", "verifysourcecode"),
                ("contractaddress", contract_address.as_str()),
                ("sourceCode", source_code.as_str()),
                ("codeformat", "solidity-standard-json-input"),
                ("contractname", contract_name.as_str()),
                ("compilerversion", compiler_version.as_str()),
                // Etherscan's spelling.
                ("constructorArguements", encoded_args.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        interpret_submission(response)
    }

    async fn check_status(
        &self,
        api_key: &str,
        chain_id: u64,
        guid: &str,
    ) -> Result<(), VerificationError> {
        let chain_id = chain_id.to_string();

        let response: EtherscanResponse = self
            .client
            .get(self.api_url.clone())
            .query(&[
                ("chainid", chain_id.as_str()),
                ("apikey", api_key),
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
            ])
            .send()
            .await?
            .json()
            .await?;

        interpret_status(response)
    }
}

impl ExplorerVerifier for EtherscanVerifier {
    async fn verify(
        &self,
        network: &NetworkConfig,
        address: Address,
        constructor_args: &[Address],
    ) -> Result<(), VerificationError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(VerificationError::MissingApiKey)?;

        let guid = self
            .submit(api_key, network, address, constructor_args)
            .await?;

        tracing::info!(guid = %guid, "Verification submitted, waiting for the explorer");

        (|| async { self.check_status(api_key, network.chain_id, &guid).await })
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.status_poll_interval)
                    .with_max_times(self.max_status_checks),
            )
            .when(|e| matches!(e, VerificationError::Pending))
            .notify(|_, delay| {
                tracing::debug!(guid = %guid, ?delay, "Verification pending, checking again");
            })
            .await
            .map_err(|e| match e {
                VerificationError::Pending => VerificationError::Timeout {
                    checks: self.max_status_checks + 1,
                },
                other => other,
            })
    }
}

fn is_already_verified(message: &str) -> bool {
    message.to_ascii_lowercase().contains("already verified")
}

fn rejection(response: EtherscanResponse) -> VerificationError {
    if response.result.is_empty() {
        VerificationError::Rejected(response.message)
    } else {
        VerificationError::Rejected(response.result)
    }
}

/// Map a `verifysourcecode` response to the submission GUID.
fn interpret_submission(response: EtherscanResponse) -> Result<String, VerificationError> {
    if response.status == "1" {
        return Ok(response.result);
    }

    if is_already_verified(&response.result) {
        return Err(VerificationError::AlreadyVerified);
    }

    Err(rejection(response))
}

/// Map a `checkverifystatus` response to the verification outcome.
fn interpret_status(response: EtherscanResponse) -> Result<(), VerificationError> {
    if response.result.contains("Pending in queue") {
        return Err(VerificationError::Pending);
    }

    if is_already_verified(&response.result) {
        return Err(VerificationError::AlreadyVerified);
    }

    if response.status == "1" || response.result.starts_with("Pass") {
        return Ok(());
    }

    Err(rejection(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: &str, message: &str, result: &str) -> EtherscanResponse {
        EtherscanResponse {
            status: status.to_string(),
            message: message.to_string(),
            result: result.to_string(),
        }
    }

    #[test]
    fn test_submission_returns_guid() {
        let guid = interpret_submission(response(
            "1",
            "OK",
            "ezq878u486pzijkvvmerl6a9mzwhv6sefgvqi5tkwceejc7tvn",
        ))
        .unwrap();

        assert_eq!(guid, "ezq878u486pzijkvvmerl6a9mzwhv6sefgvqi5tkwceejc7tvn");
    }

    #[test]
    fn test_submission_already_verified() {
        let err = interpret_submission(response(
            "0",
            "NOTOK",
            "Contract source code already verified",
        ))
        .unwrap_err();

        assert!(matches!(err, VerificationError::AlreadyVerified));
    }

    #[test]
    fn test_submission_rate_limited() {
        let err = interpret_submission(response("0", "NOTOK", "Max rate limit reached"))
            .unwrap_err();

        assert!(matches!(err, VerificationError::Rejected(msg) if msg == "Max rate limit reached"));
    }

    #[test]
    fn test_submission_rejection_without_result_uses_message() {
        let err = interpret_submission(response("0", "Invalid API Key", "")).unwrap_err();

        assert!(matches!(err, VerificationError::Rejected(msg) if msg == "Invalid API Key"));
    }

    #[test]
    fn test_status_outcomes() {
        assert!(matches!(
            interpret_status(response("0", "NOTOK", "Pending in queue")),
            Err(VerificationError::Pending)
        ));
        assert!(interpret_status(response("1", "OK", "Pass - Verified")).is_ok());
        assert!(matches!(
            interpret_status(response("0", "NOTOK", "Already Verified")),
            Err(VerificationError::AlreadyVerified)
        ));
        assert!(matches!(
            interpret_status(response("0", "NOTOK", "Fail - Unable to verify")),
            Err(VerificationError::Rejected(msg)) if msg == "Fail - Unable to verify"
        ));
    }

    #[test]
    fn test_response_deserialization() {
        let parsed: EtherscanResponse = serde_json::from_str(
            r#"{"status":"1","message":"OK","result":"Pass - Verified"}"#,
        )
        .unwrap();

        assert_eq!(parsed.status, "1");
        assert_eq!(parsed.result, "Pass - Verified");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_any_request() {
        let artifact = ContractArtifact {
            contract_name: "FlashArbitrage".to_string(),
            source_name: "contracts/FlashArbitrage.sol".to_string(),
            bytecode: vec![0x60, 0x80].into(),
        };
        let verifier = EtherscanVerifier::new(
            Url::parse(ETHERSCAN_V2_API_URL).unwrap(),
            None,
            &artifact,
            PathBuf::from("does-not-exist"),
        )
        .unwrap();
        let network = crate::NetworkAddressRegistry::builtin()
            .lookup("base")
            .unwrap()
            .clone();

        let err = verifier
            .verify(&network, Address::ZERO, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, VerificationError::MissingApiKey));
    }
}
