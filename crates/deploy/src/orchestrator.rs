//! The deployment run: resolve, check, deploy, record, verify.

use std::{path::PathBuf, time::Duration};

use alloy_core::primitives::{Address, B256, U256};
use serde::Serialize;

use crate::{
    ContractDeployer, DeployError, EnvStore, ExplorerVerifier, NetworkAddressRegistry,
    NetworkConfig, SignerProvider, VerificationService, VerificationStatus, env_key,
    verify::DEFAULT_VERIFY_DELAY,
};

/// Default path of the env file deployed addresses are appended to.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Phase of a deployment run.
///
/// `Failed` is absorbing. Verification can never move a run to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RunState {
    Idle,
    ResolvingNetwork,
    CheckingBalance,
    Deploying,
    Persisting,
    Verifying,
    Done,
    Failed,
}

/// Everything a run needs besides its collaborators.
///
/// Passed explicitly at construction; the orchestrator never reads process
/// environment or global state.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub registry: NetworkAddressRegistry,
    /// Env file the contract address is recorded in.
    pub env_file: PathBuf,
    /// Wait before verifying on the explorer.
    pub verify_delay: Duration,
    /// Skip explorer verification even on public networks.
    pub skip_verification: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            registry: NetworkAddressRegistry::builtin(),
            env_file: PathBuf::from(DEFAULT_ENV_FILE),
            verify_delay: DEFAULT_VERIFY_DELAY,
            skip_verification: false,
        }
    }
}

/// Inputs of a single deployment, assembled once the signer has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRequest {
    pub network_id: String,
    pub signer_address: Address,
    pub signer_balance: U256,
    pub constructor_args: Vec<Address>,
}

/// A confirmed deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRecord {
    pub network_id: String,
    pub contract_address: Address,
    pub transaction_hash: Option<B256>,
    pub constructor_args: Vec<Address>,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOutcome {
    pub record: DeploymentRecord,
    /// Env key the address is stored under.
    pub env_key: String,
    /// False when the key was already present and left untouched.
    pub env_written: bool,
    pub verification: VerificationStatus,
}

/// Runs `FlashArbitrage` deployments against a signer, a deployer and an explorer.
pub struct DeploymentOrchestrator<S, D, V> {
    registry: NetworkAddressRegistry,
    store: EnvStore,
    skip_verification: bool,
    signer: S,
    deployer: D,
    verification: VerificationService<V>,
    state: RunState,
}

impl<S, D, V> DeploymentOrchestrator<S, D, V>
where
    S: SignerProvider,
    D: ContractDeployer,
    V: ExplorerVerifier,
{
    pub fn new(config: OrchestratorConfig, signer: S, deployer: D, verifier: V) -> Self {
        Self {
            registry: config.registry,
            store: EnvStore::new(config.env_file),
            skip_verification: config.skip_verification,
            signer,
            deployer,
            verification: VerificationService::new(verifier, config.verify_delay),
            state: RunState::Idle,
        }
    }

    /// State the last run ended in, or `Idle` before the first run.
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn store(&self) -> &EnvStore {
        &self.store
    }

    /// Deploy to `network_id` and return the confirmed record.
    pub async fn deploy(&mut self, network_id: &str) -> Result<DeploymentRecord, DeployError> {
        self.run(network_id).await.map(|outcome| outcome.record)
    }

    /// Deploy to `network_id` and report every step's result.
    pub async fn run(&mut self, network_id: &str) -> Result<DeploymentOutcome, DeployError> {
        self.state = RunState::Idle;

        let result = self.execute(network_id).await;

        match &result {
            Ok(outcome) => {
                self.transition(RunState::Done);
                tracing::info!(
                    network = %network_id,
                    address = %outcome.record.contract_address,
                    "Deployment complete"
                );
            }
            Err(e) => {
                let failed_in = self.state;
                self.transition(RunState::Failed);
                tracing::error!(network = %network_id, state = %failed_in, err = %e, "Deployment failed");
            }
        }

        result
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = %self.state, to = %next, "Deployment state transition");
        self.state = next;
    }

    async fn execute(&mut self, network_id: &str) -> Result<DeploymentOutcome, DeployError> {
        self.transition(RunState::ResolvingNetwork);
        let network = self.registry.lookup(network_id)?.clone();

        tracing::info!(network = %network.network_id, chain_id = network.chain_id, "Deploying FlashArbitrage");

        self.transition(RunState::CheckingBalance);
        let request = self.check_signer(&network).await?;

        self.transition(RunState::Deploying);
        let record = self.deploy_contract(&network, request).await?;

        self.transition(RunState::Persisting);
        let key = env_key(&network.network_id);
        let written = self
            .store
            .record_if_absent(&key, &record.contract_address.to_string())
            .map_err(|source| DeployError::Persistence {
                network: network.network_id.clone(),
                address: record.contract_address,
                source,
            })?
            .written;

        if written {
            tracing::info!(key = %key, path = %self.store.path().display(), "Saved contract address to env file");
        } else {
            tracing::warn!(key = %key, path = %self.store.path().display(), "Env file already has an entry for this network, left untouched");
        }

        let verification = if network.is_local() {
            tracing::info!(network = %network.network_id, "Local network, skipping verification");
            VerificationStatus::Skipped
        } else if self.skip_verification {
            tracing::info!(network = %network.network_id, "Verification disabled, skipping");
            VerificationStatus::Skipped
        } else {
            self.transition(RunState::Verifying);
            self.verification
                .verify(&network, record.contract_address, &record.constructor_args)
                .await
        };

        Ok(DeploymentOutcome {
            record,
            env_key: key,
            env_written: written,
            verification,
        })
    }

    async fn check_signer(&self, network: &NetworkConfig) -> Result<DeploymentRequest, DeployError> {
        let signer_address = self.signer.address();
        let signer_balance =
            self.signer
                .balance()
                .await
                .map_err(|source| DeployError::SignerQuery {
                    network: network.network_id.clone(),
                    source,
                })?;

        tracing::info!(deployer = %signer_address, balance_wei = %signer_balance, "Resolved deployer");

        if signer_balance.is_zero() {
            return Err(DeployError::InsufficientFunds {
                network: network.network_id.clone(),
                address: signer_address,
            });
        }

        let addresses = &network.dependency_addresses;
        tracing::info!(
            aave_pool = %addresses.aave_pool,
            balancer_vault = %addresses.balancer_vault,
            "Using dependency addresses"
        );

        Ok(DeploymentRequest {
            network_id: network.network_id.clone(),
            signer_address,
            signer_balance,
            constructor_args: addresses.constructor_args(),
        })
    }

    async fn deploy_contract(
        &self,
        network: &NetworkConfig,
        request: DeploymentRequest,
    ) -> Result<DeploymentRecord, DeployError> {
        let failure = |source: anyhow::Error| DeployError::DeploymentFailure {
            network: network.network_id.clone(),
            source,
        };

        let pending = self
            .deployer
            .submit(network, &request.constructor_args)
            .await
            .map_err(failure)?;

        tracing::info!(tx_hash = %pending.tx_hash, "Waiting for deployment confirmation...");

        let confirmed = self
            .deployer
            .wait_for_confirmation(pending)
            .await
            .map_err(failure)?;

        tracing::info!(
            address = %confirmed.contract_address,
            tx_hash = ?confirmed.tx_hash,
            "FlashArbitrage deployed"
        );

        Ok(DeploymentRecord {
            network_id: request.network_id,
            contract_address: confirmed.contract_address,
            transaction_hash: confirmed.tx_hash,
            constructor_args: request.constructor_args,
        })
    }
}
