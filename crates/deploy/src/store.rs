//! Append-only `KEY=VALUE` store for deployed contract addresses.
//!
//! The store is a dotenv-style file shared with the bot that consumes the
//! deployed address. Entries are only ever appended: an existing key is never
//! rewritten, even when the new value differs.

use std::{
    fs::{File, OpenOptions},
    io::{Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use fs2::FileExt;

/// Prefix of every contract address key written by the deployer.
pub const ENV_KEY_PREFIX: &str = "ARBITRAGE_CONTRACT_";

/// Derive the env key under which the contract address for `network_id` is stored.
///
/// `arbSepolia` maps to `ARBITRAGE_CONTRACT_ARBSEPOLIA`.
pub fn env_key(network_id: &str) -> String {
    format!("{ENV_KEY_PREFIX}{}", network_id.to_uppercase())
}

/// Result of a [`EnvStore::record_if_absent`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Whether a new line was appended.
    pub written: bool,
}

/// Handle to a dotenv-style file.
#[derive(Debug, Clone)]
pub struct EnvStore {
    path: PathBuf,
}

impl EnvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `key=value` unless `key` is already present in the store.
    ///
    /// The check and the append happen under an exclusive advisory lock on the
    /// file, so two runs racing on the same store write at most one entry. The
    /// file is created if it does not exist.
    pub fn record_if_absent(&self, key: &str, value: &str) -> Result<RecordOutcome> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open env file {}", self.path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("Failed to lock env file {}", self.path.display()))?;

        let outcome = Self::append_locked(&mut file, key, value);

        if let Err(e) = FileExt::unlock(&file) {
            tracing::warn!(err = %e, path = %self.path.display(), "Failed to unlock env file");
        }

        let outcome = outcome
            .with_context(|| format!("Failed to update env file {}", self.path.display()))?;

        if outcome.written {
            tracing::debug!(key, value, path = %self.path.display(), "Appended env entry");
        } else {
            tracing::debug!(key, path = %self.path.display(), "Env entry already present");
        }

        Ok(outcome)
    }

    fn append_locked(file: &mut File, key: &str, value: &str) -> Result<RecordOutcome> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("Failed to read env file")?;

        if find_value(&contents, key).is_some() {
            return Ok(RecordOutcome { written: false });
        }

        let mut line = String::new();
        if !contents.is_empty() && !contents.ends_with('\n') {
            line.push('\n');
        }
        line.push_str(&format!("{key}={value}\n"));

        file.write_all(line.as_bytes())
            .context("Failed to append env entry")?;
        file.sync_data().context("Failed to flush env file")?;

        Ok(RecordOutcome { written: true })
    }

    /// Read the value stored under `key`, if any.
    ///
    /// A missing file is treated as an empty store.
    pub fn lookup(&self, key: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read env file {}", self.path.display()))?;

        Ok(find_value(&contents, key).map(String::from))
    }
}

/// Find the first value assigned to `key`, tolerating comments, blank lines and
/// `export` prefixes.
fn find_value<'a>(contents: &'a str, key: &str) -> Option<&'a str> {
    contents.lines().find_map(|line| {
        let (k, v) = parse_line(line)?;
        (k == key).then_some(v)
    })
}

fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;

    Some((key.trim(), value.trim().trim_matches('"')))
}
