//! Best-effort source verification on a block explorer.

use std::time::Duration;

use alloy_core::primitives::Address;

use crate::{ExplorerVerifier, NetworkConfig};

mod etherscan;
pub use etherscan::{ETHERSCAN_V2_API_URL, EtherscanVerifier};

/// Default wait before asking the explorer to verify, so its indexer has seen
/// the deployment.
pub const DEFAULT_VERIFY_DELAY: Duration = Duration::from_secs(30);

/// Result of the verification step of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    /// The explorer accepted the source code.
    Verified,
    /// Verification was attempted and failed; the message says why.
    Failed(String),
    /// Verification was not attempted (local network or disabled).
    Skipped,
}

impl VerificationStatus {
    pub fn verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// Delay-gated wrapper around an [`ExplorerVerifier`] that never fails.
#[derive(Debug, Clone)]
pub struct VerificationService<V> {
    verifier: V,
    delay: Duration,
}

impl<V: ExplorerVerifier> VerificationService<V> {
    pub fn new(verifier: V, delay: Duration) -> Self {
        Self { verifier, delay }
    }

    /// Wait for the configured delay, then verify `address`.
    ///
    /// Any verifier error is logged and reported as [`VerificationStatus::Failed`].
    /// There is no retry.
    pub async fn verify(
        &self,
        network: &NetworkConfig,
        address: Address,
        constructor_args: &[Address],
    ) -> VerificationStatus {
        if !self.delay.is_zero() {
            tracing::info!(
                delay_secs = self.delay.as_secs(),
                "Waiting for the block explorer to index the deployment..."
            );
            tokio::time::sleep(self.delay).await;
        }

        match self
            .verifier
            .verify(network, address, constructor_args)
            .await
        {
            Ok(()) => {
                tracing::info!(network = %network.network_id, address = %address, "Contract verified on block explorer");
                VerificationStatus::Verified
            }
            Err(e) => {
                tracing::warn!(
                    network = %network.network_id,
                    address = %address,
                    err = %e,
                    "Verification failed (can retry manually)"
                );
                VerificationStatus::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use alloy_core::primitives::address;

    use super::*;
    use crate::{NetworkAddressRegistry, VerificationError};

    #[derive(Clone, Default)]
    struct CountingVerifier {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl ExplorerVerifier for CountingVerifier {
        async fn verify(
            &self,
            _network: &NetworkConfig,
            _address: Address,
            _constructor_args: &[Address],
        ) -> Result<(), VerificationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(VerificationError::Rejected("Fail - Unable to verify".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn sepolia() -> NetworkConfig {
        NetworkAddressRegistry::builtin()
            .lookup("sepolia")
            .unwrap()
            .clone()
    }

    #[tokio::test]
    async fn test_successful_verification() {
        let verifier = CountingVerifier::default();
        let service = VerificationService::new(verifier.clone(), Duration::ZERO);

        let status = service
            .verify(&sepolia(), address!("0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef"), &[])
            .await;

        assert_eq!(status, VerificationStatus::Verified);
        assert!(status.verified());
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_swallowed_without_retry() {
        let verifier = CountingVerifier {
            fail: true,
            ..Default::default()
        };
        let service = VerificationService::new(verifier.clone(), Duration::from_millis(5));

        let status = service
            .verify(&sepolia(), address!("0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef"), &[])
            .await;

        assert!(!status.verified());
        assert!(matches!(status, VerificationStatus::Failed(msg) if msg.contains("Unable to verify")));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_precedes_verification() {
        let verifier = CountingVerifier::default();
        let delay = Duration::from_secs(30);
        let service = VerificationService::new(verifier.clone(), delay);
        let network = sepolia();

        let handle = tokio::spawn(async move {
            service
                .verify(&network, address!("0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef"), &[])
                .await
        });

        // Let the task start its sleep, then stop just short of the delay.
        tokio::task::yield_now().await;
        tokio::time::advance(delay - Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        let status = handle.await.unwrap();

        assert_eq!(status, VerificationStatus::Verified);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }
}
