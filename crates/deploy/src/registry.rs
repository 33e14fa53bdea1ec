//! Per-network dependency addresses for the `FlashArbitrage` constructor.

use alloy_core::primitives::{Address, address};
use serde::Serialize;

use crate::DeployError;

/// Balancer V2 vault, deployed at the same address on every supported chain.
const BALANCER_VAULT: Address = address!("0xBA12222222228d8Ba445958a75a0704d566BF2C8");

/// Network names that never get verified on a block explorer.
const LOCAL_NETWORKS: &[&str] = &["hardhat", "localhost"];

/// Addresses of the external protocols the contract is wired to at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DependencyAddresses {
    /// Aave V3 pool.
    pub aave_pool: Address,
    /// Balancer vault.
    pub balancer_vault: Address,
}

impl DependencyAddresses {
    /// Constructor arguments in the order `FlashArbitrage` expects them.
    pub fn constructor_args(&self) -> Vec<Address> {
        vec![self.aave_pool, self.balancer_vault]
    }
}

/// A supported network and the addresses to deploy against on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkConfig {
    /// Symbolic network name, e.g. `sepolia`.
    pub network_id: String,
    /// EIP-155 chain id the RPC endpoint must report. Also selects the explorer
    /// through the Etherscan v2 `chainid` parameter.
    pub chain_id: u64,
    /// Whether this is a local development chain.
    pub local: bool,
    pub dependency_addresses: DependencyAddresses,
}

impl NetworkConfig {
    fn new(network_id: &str, chain_id: u64, local: bool, aave_pool: Address) -> Self {
        Self {
            network_id: network_id.to_string(),
            chain_id,
            local,
            dependency_addresses: DependencyAddresses {
                aave_pool,
                balancer_vault: BALANCER_VAULT,
            },
        }
    }

    /// Local networks skip explorer verification.
    pub fn is_local(&self) -> bool {
        self.local || is_local(&self.network_id)
    }
}

/// Returns true for network names that denote a local development chain.
pub fn is_local(network_id: &str) -> bool {
    LOCAL_NETWORKS.contains(&network_id)
}

/// Static table of supported networks.
///
/// Loaded once at startup and never mutated. A network missing from the table is a
/// configuration error: there is no fallback entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAddressRegistry {
    networks: Vec<NetworkConfig>,
}

impl Default for NetworkAddressRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl NetworkAddressRegistry {
    /// Create a registry from an explicit set of entries.
    pub fn new(networks: impl IntoIterator<Item = NetworkConfig>) -> Self {
        Self {
            networks: networks.into_iter().collect(),
        }
    }

    /// The networks `FlashArbitrage` is deployed to.
    pub fn builtin() -> Self {
        Self::new([
            NetworkConfig::new(
                "ethereum",
                1,
                false,
                address!("0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2"),
            ),
            NetworkConfig::new(
                "arbitrum",
                42161,
                false,
                address!("0x794a61358D6845594F94dc1DB02A252b5b4814aD"),
            ),
            NetworkConfig::new(
                "base",
                8453,
                false,
                address!("0xA238Dd80C259a72e81d7e4664a9801593F98d1c5"),
            ),
            NetworkConfig::new(
                "polygon",
                137,
                false,
                address!("0x794a61358D6845594F94dc1DB02A252b5b4814aD"),
            ),
            // testnets
            NetworkConfig::new(
                "sepolia",
                11155111,
                false,
                address!("0x6Ae43d3271ff6888e7Fc43Fd7321a503ff738951"),
            ),
            NetworkConfig::new(
                "arbSepolia",
                421614,
                false,
                address!("0xBfC91D59fdAA134A4ED45f7B584cAf96D7792Eff"),
            ),
            NetworkConfig::new(
                "baseSepolia",
                84532,
                false,
                address!("0x07eA79F68B2B3df564D0A34F8e19D9B1e339814b"),
            ),
            // mainnet fork
            NetworkConfig::new(
                "hardhat",
                1337,
                true,
                address!("0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2"),
            ),
        ])
    }

    /// Resolve the entry for `network_id`.
    pub fn lookup(&self, network_id: &str) -> Result<&NetworkConfig, DeployError> {
        self.networks
            .iter()
            .find(|network| !network_id.is_empty() && network.network_id == network_id)
            .ok_or_else(|| DeployError::UnknownNetwork {
                network: network_id.to_string(),
            })
    }

    /// All configured networks, in declaration order.
    pub fn networks(&self) -> impl Iterator<Item = &NetworkConfig> {
        self.networks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_sepolia() {
        let registry = NetworkAddressRegistry::builtin();
        let sepolia = registry.lookup("sepolia").unwrap();

        assert_eq!(sepolia.chain_id, 11155111);
        assert_eq!(
            sepolia.dependency_addresses.aave_pool,
            address!("0x6Ae43d3271ff6888e7Fc43Fd7321a503ff738951")
        );
        assert_eq!(sepolia.dependency_addresses.balancer_vault, BALANCER_VAULT);
        assert!(!sepolia.is_local());
    }

    #[test]
    fn test_builtin_networks() {
        // (id, chain id, aave pool, local)
        let expected = [
            ("ethereum", 1, address!("0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2"), false),
            ("arbitrum", 42161, address!("0x794a61358D6845594F94dc1DB02A252b5b4814aD"), false),
            ("base", 8453, address!("0xA238Dd80C259a72e81d7e4664a9801593F98d1c5"), false),
            ("polygon", 137, address!("0x794a61358D6845594F94dc1DB02A252b5b4814aD"), false),
            ("sepolia", 11155111, address!("0x6Ae43d3271ff6888e7Fc43Fd7321a503ff738951"), false),
            ("arbSepolia", 421614, address!("0xBfC91D59fdAA134A4ED45f7B584cAf96D7792Eff"), false),
            ("baseSepolia", 84532, address!("0x07eA79F68B2B3df564D0A34F8e19D9B1e339814b"), false),
            ("hardhat", 1337, address!("0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2"), true),
        ];
        let balancer_vault = address!("0xBA12222222228d8Ba445958a75a0704d566BF2C8");
        let registry = NetworkAddressRegistry::builtin();

        for (id, chain_id, aave_pool, local) in expected {
            let network = registry.lookup(id).unwrap();

            assert_eq!(network.network_id, id);
            assert_eq!(network.chain_id, chain_id, "chain id of {id}");
            assert_eq!(network.dependency_addresses.aave_pool, aave_pool, "aave pool of {id}");
            assert_eq!(
                network.dependency_addresses.balancer_vault, balancer_vault,
                "balancer vault of {id}"
            );
            assert_eq!(network.is_local(), local, "locality of {id}");
        }
        assert_eq!(registry.networks().count(), expected.len());
    }

    #[test]
    fn test_public_networks_have_distinct_chain_ids() {
        let registry = NetworkAddressRegistry::builtin();
        let mut chain_ids: Vec<u64> = registry
            .networks()
            .filter(|network| !network.is_local())
            .map(|network| network.chain_id)
            .collect();
        let count = chain_ids.len();

        chain_ids.sort_unstable();
        chain_ids.dedup();

        assert_eq!(chain_ids.len(), count);
    }

    #[test]
    fn test_lookup_unknown_network() {
        let registry = NetworkAddressRegistry::builtin();

        for network in ["fantom", "", "Sepolia", "localhost"] {
            let err = registry.lookup(network).unwrap_err();
            assert!(
                matches!(&err, DeployError::UnknownNetwork { network: n } if n == network),
                "unexpected error for {network:?}: {err}"
            );
        }
    }

    #[test]
    fn test_constructor_args_order() {
        let registry = NetworkAddressRegistry::builtin();
        let arbitrum = registry.lookup("arbitrum").unwrap();

        assert_eq!(
            arbitrum.dependency_addresses.constructor_args(),
            vec![
                address!("0x794a61358D6845594F94dc1DB02A252b5b4814aD"),
                BALANCER_VAULT
            ]
        );
    }

    #[test]
    fn test_local_networks() {
        let registry = NetworkAddressRegistry::builtin();

        assert!(registry.lookup("hardhat").unwrap().is_local());
        assert!(is_local("localhost"));
        assert!(!is_local("base"));
    }
}
