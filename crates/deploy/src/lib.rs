//! flasharb-deploy - Deployment library for the `FlashArbitrage` contract.
//!
//! This crate deploys `FlashArbitrage` to one of the supported networks: it
//! resolves the protocol addresses the constructor needs, checks the deployer is
//! funded, deploys, records the contract address in the env file exactly once,
//! and verifies the source code on the network's block explorer when possible.

mod error;
pub use error::{DeployError, VerificationError};

mod registry;
pub use registry::{DependencyAddresses, NetworkAddressRegistry, NetworkConfig, is_local};

mod store;
pub use store::{ENV_KEY_PREFIX, EnvStore, RecordOutcome, env_key};

mod traits;
pub use traits::{
    ConfirmedDeployment, ContractDeployer, ExplorerVerifier, PendingDeployment, SignerProvider,
};

pub mod artifact;
pub use artifact::{BuildInfo, ContractArtifact};

pub mod rpc;

mod chain;
pub use chain::{DEFAULT_RECEIPT_POLL_INTERVAL, RpcChain};

pub mod verify;
pub use verify::{
    DEFAULT_VERIFY_DELAY, ETHERSCAN_V2_API_URL, EtherscanVerifier, VerificationService,
    VerificationStatus,
};

mod orchestrator;
pub use orchestrator::{
    DEFAULT_ENV_FILE, DeploymentOrchestrator, DeploymentOutcome, DeploymentRecord,
    DeploymentRequest, OrchestratorConfig, RunState,
};
