//! The durable record of a successful deployment.

use std::path::{Path, PathBuf};

use alloy_core::primitives::{Address, B256};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{DeployError, DeployedSet};

/// Default file the deployment result is written to.
pub const DEFAULT_OUTPUT_FILENAME: &str = "deployed-addresses.json";

/// Top-level keys of the record that are not contract names.
pub const RESERVED_KEYS: &[&str] = &["deployer", "network", "chainId", "transactions"];

/// Addresses of every deployed contract plus run metadata.
///
/// Serialized as a flat JSON object: one `"<ContractName>": "<address>"` entry
/// per contract in deployment order, followed by the metadata keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    /// Logical contract name to address, in deployment order.
    #[serde(flatten)]
    pub contracts: IndexMap<String, Address>,
    /// Address of the signing identity.
    pub deployer: Address,
    /// Human-readable network label.
    pub network: String,
    /// Numeric chain id.
    pub chain_id: u64,
    /// Creation transaction of each contract.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub transactions: IndexMap<String, B256>,
}

impl DeploymentResult {
    /// Snapshot a completed run.
    pub fn from_deployed(deployed: &DeployedSet, network: &str, chain_id: u64) -> Self {
        Self {
            contracts: deployed
                .iter()
                .map(|i| (i.name.clone(), i.address))
                .collect(),
            deployer: deployed.deployer(),
            network: network.to_string(),
            chain_id,
            transactions: deployed
                .iter()
                .map(|i| (i.name.clone(), i.tx_hash))
                .collect(),
        }
    }

    /// Serialize to pretty JSON. Key order is deterministic.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self).map(|mut json| {
            json.push('\n');
            json
        })
    }

    /// Write the record to `path`, replacing any previous record.
    ///
    /// The content is written to a sibling temporary file first and then
    /// renamed over the destination, so a reader never sees a partial record.
    pub fn persist(&self, path: &Path) -> Result<(), DeployError> {
        let persistence_error = |reason: String| DeployError::PersistenceError {
            path: path.to_path_buf(),
            reason,
        };

        let json = self
            .to_json()
            .map_err(|e| persistence_error(format!("serialization failed: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| persistence_error(format!("failed to create directory: {e}")))?;
        }

        let tmp_path = tmp_path_for(path);
        std::fs::write(&tmp_path, json)
            .map_err(|e| persistence_error(format!("failed to write: {e}")))?;

        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(persistence_error(format!("failed to replace: {e}")));
        }

        tracing::info!(path = %path.display(), "Deployment result saved");
        Ok(())
    }

    /// Read a record written by [`DeploymentResult::persist`].
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deployment result from {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse deployment result JSON")
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    file_name.push(".tmp");
    path.with_file_name(file_name)
}
