//! Compiled contract artifacts.
//!
//! Reads the Hardhat artifact for the creation bytecode, and the matching
//! build-info file for the compiler input the explorer needs to verify it.

use std::path::{Path, PathBuf};

use alloy_core::primitives::{Address, Bytes};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// Default location of the `FlashArbitrage` artifact in a Hardhat project.
pub const DEFAULT_ARTIFACT_PATH: &str =
    "artifacts/contracts/FlashArbitrage.sol/FlashArbitrage.json";

/// Default location of Hardhat build-info files.
pub const DEFAULT_BUILD_INFO_DIR: &str = "artifacts/build-info";

/// Hardhat contract artifact (`hh-sol-artifact-1`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    pub source_name: String,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// Load an artifact, rejecting ones without creation bytecode.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;

        let artifact: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact {}", path.display()))?;

        if artifact.bytecode.is_empty() {
            anyhow::bail!(
                "Artifact {} has no bytecode (abstract contract or interface?)",
                path.display()
            );
        }

        Ok(artifact)
    }

    /// Fully qualified name, e.g. `contracts/FlashArbitrage.sol:FlashArbitrage`.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }
}

/// Compiler settings and sources used to produce an artifact.
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Full solc version, e.g. `0.8.24+commit.e11b9ed9`.
    pub solc_long_version: String,
    /// Standard JSON compiler input.
    pub input: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBuildInfo {
    solc_long_version: String,
    input: Value,
    output: Value,
}

impl BuildInfo {
    /// Find the build-info in `dir` that produced `source_name:contract_name`.
    pub fn find(dir: &Path, source_name: &str, contract_name: &str) -> Result<Self> {
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read build-info directory {}", dir.display()))?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                path.extension()
                    .is_some_and(|ext| ext == "json")
                    .then_some(path)
            })
            .collect();
        candidates.sort();

        for path in candidates {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read build-info {}", path.display()))?;

            let raw: RawBuildInfo = match serde_json::from_str(&content) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::debug!(path = %path.display(), err = %e, "Skipping unparsable build-info");
                    continue;
                }
            };

            if raw.output["contracts"][source_name][contract_name].is_object() {
                return Ok(Self {
                    solc_long_version: raw.solc_long_version,
                    input: raw.input,
                });
            }
        }

        anyhow::bail!(
            "No build-info in {} contains {}:{}",
            dir.display(),
            source_name,
            contract_name
        )
    }

    /// Compiler version in the form explorers expect, e.g. `v0.8.24+commit.e11b9ed9`.
    pub fn compiler_version(&self) -> String {
        format!("v{}", self.solc_long_version)
    }
}

/// ABI-encode address constructor arguments.
///
/// Addresses are static types, so each argument is a single left-padded word.
pub fn encode_constructor_args(args: &[Address]) -> Bytes {
    args.iter()
        .flat_map(|address| address.into_word().0)
        .collect::<Vec<u8>>()
        .into()
}

/// Creation calldata: bytecode followed by the encoded constructor arguments.
pub fn deploy_calldata(bytecode: &Bytes, args: &[Address]) -> Bytes {
    let args = encode_constructor_args(args);
    [&bytecode[..], &args[..]].concat().into()
}
