//! flasharb deploys the FlashArbitrage contract, records its address and verifies it.

mod cli;
mod config;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL};
use url::Url;

use cli::{Cli, Command, DeployArgs};
use config::Settings;
use flasharb_deploy::{
    ContractArtifact, DeploymentOrchestrator, DeploymentOutcome, EtherscanVerifier,
    NetworkAddressRegistry, NetworkConfig, OrchestratorConfig, RpcChain, VerificationStatus,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match cli.command {
        Command::Networks => {
            print_networks(&NetworkAddressRegistry::builtin());
            Ok(ExitCode::SUCCESS)
        }
        Command::Deploy(args) => run_deploy(&cli.config, &args).await,
    }
}

async fn run_deploy(config_path: &std::path::Path, args: &DeployArgs) -> Result<ExitCode> {
    let settings = Settings::load(config_path, args)?;
    tracing::debug!(?settings, "Loaded settings");

    let registry = NetworkAddressRegistry::builtin();
    let network = match resolve_network(&settings, &registry) {
        Ok(network) => network.clone(),
        Err(e) => {
            eprintln!("{e:#}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let rpc_url = Url::parse(settings.rpc_url(network.is_local())?).context("Invalid RPC URL")?;
    let explorer_api_url =
        Url::parse(&settings.explorer_api_url).context("Invalid explorer API URL")?;

    let artifact = ContractArtifact::load(&settings.artifact)?;
    tracing::info!(
        contract = %artifact.fully_qualified_name(),
        path = %settings.artifact.display(),
        "Loaded contract artifact"
    );

    let chain = RpcChain::new(rpc_url, settings.private_key()?, artifact.bytecode.clone())?
        .receipt_poll_interval(settings.receipt_poll_interval());
    let verifier = EtherscanVerifier::new(
        explorer_api_url,
        settings.explorer_api_key.clone(),
        &artifact,
        settings.build_info_dir.clone(),
    )?;

    let config = OrchestratorConfig {
        registry,
        env_file: settings.env_file.clone(),
        verify_delay: settings.verify_delay(),
        skip_verification: settings.no_verify,
        ..Default::default()
    };

    // The chain client is both the signer and the deployer.
    let mut orchestrator = DeploymentOrchestrator::new(config, chain.clone(), chain, verifier);

    match orchestrator.run(&network.network_id).await {
        Ok(outcome) => {
            print_summary(&outcome);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Deployment to {} failed: {e}", e.network());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Resolve the target network before any artifact, key or RPC setting is read.
fn resolve_network<'a>(
    settings: &Settings,
    registry: &'a NetworkAddressRegistry,
) -> Result<&'a NetworkConfig> {
    let network = settings.network()?;
    Ok(registry.lookup(network)?)
}

fn print_networks(registry: &NetworkAddressRegistry) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Network", "Chain ID", "Aave pool", "Balancer vault", "Verify"]);

    for network in registry.networks() {
        let addresses = &network.dependency_addresses;
        table.add_row(vec![
            network.network_id.clone(),
            network.chain_id.to_string(),
            addresses.aave_pool.to_string(),
            addresses.balancer_vault.to_string(),
            if network.is_local() { "no" } else { "yes" }.to_string(),
        ]);
    }

    println!("{table}");
}

fn print_summary(outcome: &DeploymentOutcome) {
    let record = &outcome.record;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.add_row(vec!["Network".to_string(), record.network_id.clone()]);
    table.add_row(vec![
        "Contract".to_string(),
        record.contract_address.to_string(),
    ]);
    if let Some(tx_hash) = record.transaction_hash {
        table.add_row(vec!["Transaction".to_string(), tx_hash.to_string()]);
    }
    table.add_row(vec![
        "Env entry".to_string(),
        if outcome.env_written {
            format!("{} written", outcome.env_key)
        } else {
            format!("{} already present, left untouched", outcome.env_key)
        },
    ]);
    table.add_row(vec![
        "Verification".to_string(),
        match &outcome.verification {
            VerificationStatus::Verified => "verified".to_string(),
            VerificationStatus::Failed(reason) => format!("failed: {reason}"),
            VerificationStatus::Skipped => "skipped".to_string(),
        },
    ]);

    println!("{table}");
    println!();
    println!("Next steps:");
    println!(
        "  1. Make sure your .env contains {}={}",
        outcome.env_key, record.contract_address
    );
    println!("  2. Run the bot: npm run bot");
    println!("  3. Monitor profits in the dashboard: npm run dashboard");
}

#[cfg(test)]
mod tests {
    use flasharb_deploy::DeployError;

    use super::*;

    fn settings_for(network: &str) -> Settings {
        Settings {
            network: Some(network.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_unknown_network_is_reported_before_other_settings() {
        // No RPC URL, no key, no artifact on disk: only the network matters here.
        let err = resolve_network(&settings_for("fantom"), &NetworkAddressRegistry::builtin())
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DeployError>(),
            Some(DeployError::UnknownNetwork { network }) if network == "fantom"
        ));
    }

    #[test]
    fn test_resolve_local_network() {
        let registry = NetworkAddressRegistry::builtin();

        let network = resolve_network(&settings_for("hardhat"), &registry).unwrap();

        assert_eq!(network.chain_id, 1337);
        assert!(network.is_local());
    }

    #[test]
    fn test_missing_network_setting() {
        let err = resolve_network(&Settings::default(), &NetworkAddressRegistry::builtin())
            .unwrap_err();

        assert!(err.to_string().contains("No network given"));
    }
}
