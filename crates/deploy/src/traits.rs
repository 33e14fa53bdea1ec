//! Collaborator seams the deployment orchestrator depends on.
//!
//! The orchestrator only talks to the outside world through these traits: the
//! JSON-RPC chain client and the Etherscan verifier are the production
//! implementations, tests substitute in-memory ones.

use std::future::Future;

use alloy_core::primitives::{Address, B256, U256};
use anyhow::Result;

use crate::{NetworkConfig, VerificationError};

/// Resolves the deploying account and its balance.
pub trait SignerProvider: Send + Sync {
    /// Address of the account that signs the deployment.
    fn address(&self) -> Address;

    /// Current native balance of [`SignerProvider::address`], in wei.
    fn balance(&self) -> impl Future<Output = Result<U256>> + Send;
}

/// Handle to a submitted, not yet confirmed, deployment transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeployment {
    pub tx_hash: B256,
}

/// A deployment whose transaction has been mined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedDeployment {
    pub contract_address: Address,
    pub tx_hash: Option<B256>,
}

/// Submits the contract creation transaction and waits for it to be mined.
pub trait ContractDeployer: Send + Sync {
    /// Submit the deployment with `constructor_args` in order.
    fn submit(
        &self,
        network: &NetworkConfig,
        constructor_args: &[Address],
    ) -> impl Future<Output = Result<PendingDeployment>> + Send;

    /// Block until `pending` is confirmed. Implementations must not time out.
    fn wait_for_confirmation(
        &self,
        pending: PendingDeployment,
    ) -> impl Future<Output = Result<ConfirmedDeployment>> + Send;
}

/// Submits deployed source code to a block explorer.
pub trait ExplorerVerifier: Send + Sync {
    fn verify(
        &self,
        network: &NetworkConfig,
        address: Address,
        constructor_args: &[Address],
    ) -> impl Future<Output = Result<(), VerificationError>> + Send;
}
