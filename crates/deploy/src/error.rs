//! Error taxonomy for a deployment run.

use alloy_core::primitives::Address;

/// Fatal errors that abort a deployment run.
///
/// None of these are retried: each one needs the operator to act (fix the
/// registry, fund the signer, inspect chain state or the env file).
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The network has no entry in the address registry.
    #[error("no addresses configured for network: {network}")]
    UnknownNetwork { network: String },

    /// The signer holds no native balance on the target network.
    #[error("deployer {address} has no ETH on {network}, fund the wallet first")]
    InsufficientFunds { network: String, address: Address },

    /// The signer address or balance could not be resolved.
    #[error("failed to query deployer balance on {network}: {source:#}")]
    SignerQuery {
        network: String,
        source: anyhow::Error,
    },

    /// Submitting the deployment or waiting for its confirmation failed.
    #[error("deployment to {network} failed: {source:#}")]
    DeploymentFailure {
        network: String,
        source: anyhow::Error,
    },

    /// The contract is on chain but its address could not be recorded.
    #[error(
        "contract deployed to {address} on {network} but could not be saved to the env file: {source:#}"
    )]
    Persistence {
        network: String,
        address: Address,
        source: anyhow::Error,
    },
}

impl DeployError {
    /// The network the failed run was targeting.
    pub fn network(&self) -> &str {
        match self {
            Self::UnknownNetwork { network }
            | Self::InsufficientFunds { network, .. }
            | Self::SignerQuery { network, .. }
            | Self::DeploymentFailure { network, .. }
            | Self::Persistence { network, .. } => network,
        }
    }
}

/// Errors raised by an explorer verification attempt.
///
/// These never abort a run; the verification service turns them into a warning.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("no explorer API key configured")]
    MissingApiKey,

    #[error("explorer request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("explorer rejected the verification request: {0}")]
    Rejected(String),

    #[error("contract source code is already verified")]
    AlreadyVerified,

    #[error("verification is still pending on the explorer")]
    Pending,

    /// Still pending after every status check.
    #[error("verification still pending after {checks} status checks")]
    Timeout { checks: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
