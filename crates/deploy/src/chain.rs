//! JSON-RPC backed signer and contract deployer.

use std::{str::FromStr, time::Duration};

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_core::primitives::{Address, B256, Bytes, TxKind, U64, U128, U256};
use alloy_eips::eip2718::Encodable2718;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::{
    ConfirmedDeployment, ContractDeployer, NetworkConfig, PendingDeployment, SignerProvider,
    artifact::deploy_calldata, rpc,
};

/// Default interval between `eth_getTransactionReceipt` polls.
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Subset of a transaction receipt needed to confirm a deployment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    transaction_hash: B256,
    contract_address: Option<Address>,
    status: Option<U64>,
}

/// Deploys contracts through an Ethereum JSON-RPC endpoint, signing locally.
///
/// Transactions are built as legacy EIP-155 transactions and priced with the
/// node's `eth_gasPrice` suggestion.
#[derive(Debug, Clone)]
pub struct RpcChain {
    client: reqwest::Client,
    rpc_url: Url,
    signer: PrivateKeySigner,
    bytecode: Bytes,
    receipt_poll_interval: Duration,
}

impl RpcChain {
    /// Create a client for `rpc_url` signing with the hex-encoded `private_key`.
    pub fn new(rpc_url: Url, private_key: &str, bytecode: Bytes) -> Result<Self> {
        let signer =
            PrivateKeySigner::from_str(private_key.trim()).context("Invalid deployer private key")?;

        Ok(Self {
            client: rpc::create_client(rpc::DEFAULT_TIMEOUT)?,
            rpc_url,
            signer,
            bytecode,
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
        })
    }

    /// Set the interval between receipt polls.
    pub fn receipt_poll_interval(mut self, interval: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T> {
        rpc::json_rpc_call(&self.client, self.rpc_url.as_str(), method, params).await
    }

    /// Chain id reported by the endpoint.
    pub async fn chain_id(&self) -> Result<u64> {
        let chain_id: U64 = self.call("eth_chainId", vec![]).await?;
        Ok(chain_id.to::<u64>())
    }

    async fn build_deployment(
        &self,
        chain_id: u64,
        constructor_args: &[Address],
    ) -> Result<TxLegacy> {
        let from = self.signer.address();
        let input = deploy_calldata(&self.bytecode, constructor_args);

        let nonce: U64 = self
            .call("eth_getTransactionCount", vec![json!(from), json!("pending")])
            .await
            .context("Failed to fetch deployer nonce")?;

        let gas_price: U128 = self
            .call("eth_gasPrice", vec![])
            .await
            .context("Failed to fetch gas price")?;

        let gas_limit: U64 = self
            .call(
                "eth_estimateGas",
                vec![json!({ "from": from, "data": input })],
            )
            .await
            .context("Failed to estimate deployment gas")?;

        Ok(TxLegacy {
            chain_id: Some(chain_id),
            nonce: nonce.to::<u64>(),
            gas_price: gas_price.to::<u128>(),
            gas_limit: gas_limit.to::<u64>(),
            to: TxKind::Create,
            value: U256::ZERO,
            input,
        })
    }

    fn sign(&self, tx: TxLegacy) -> Result<Vec<u8>> {
        let signature = self
            .signer
            .sign_hash_sync(&tx.signature_hash())
            .context("Failed to sign deployment transaction")?;

        let envelope = TxEnvelope::from(tx.into_signed(signature));

        Ok(envelope.encoded_2718())
    }
}

impl SignerProvider for RpcChain {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn balance(&self) -> Result<U256> {
        self.call(
            "eth_getBalance",
            vec![json!(self.signer.address()), json!("latest")],
        )
        .await
        .context("Failed to fetch deployer balance")
    }
}

impl ContractDeployer for RpcChain {
    async fn submit(
        &self,
        network: &NetworkConfig,
        constructor_args: &[Address],
    ) -> Result<PendingDeployment> {
        let chain_id = self
            .chain_id()
            .await
            .context("Failed to fetch chain id from RPC endpoint")?;
        if chain_id != network.chain_id {
            anyhow::bail!(
                "RPC endpoint reports chain id {} but {} expects {}",
                chain_id,
                network.network_id,
                network.chain_id
            );
        }

        let tx = self.build_deployment(chain_id, constructor_args).await?;

        tracing::debug!(
            nonce = tx.nonce,
            gas_limit = tx.gas_limit,
            gas_price = tx.gas_price,
            calldata_len = tx.input.len(),
            "Signing deployment transaction"
        );

        let raw = self.sign(tx)?;

        let tx_hash: B256 = self
            .call(
                "eth_sendRawTransaction",
                vec![json!(format!("0x{}", hex::encode(raw)))],
            )
            .await
            .context("Failed to broadcast deployment transaction")?;

        tracing::info!(tx_hash = %tx_hash, "Deployment transaction sent");

        Ok(PendingDeployment { tx_hash })
    }

    async fn wait_for_confirmation(
        &self,
        pending: PendingDeployment,
    ) -> Result<ConfirmedDeployment> {
        let tx_hash = pending.tx_hash;

        // Query failures count as "not mined yet".
        let receipt: TransactionReceipt =
            rpc::poll_until("deployment receipt", self.receipt_poll_interval, || async move {
                match self
                    .call::<Option<TransactionReceipt>>(
                        "eth_getTransactionReceipt",
                        vec![json!(tx_hash)],
                    )
                    .await
                {
                    Ok(receipt) => Ok(receipt),
                    Err(e) => {
                        tracing::warn!(tx_hash = %tx_hash, err = %format!("{e:#}"), "Receipt query failed, polling again");
                        Ok(None)
                    }
                }
            })
            .await
            .context("Failed to fetch deployment receipt")?;

        if receipt.status.is_some_and(|status| status.is_zero()) {
            anyhow::bail!("Deployment transaction {} reverted", receipt.transaction_hash);
        }

        let contract_address = receipt.contract_address.with_context(|| {
            format!(
                "Receipt for {} has no contract address",
                receipt.transaction_hash
            )
        })?;

        Ok(ConfirmedDeployment {
            contract_address,
            tx_hash: Some(receipt.transaction_hash),
        })
    }
}
