use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::{
    Credential, DeploymentResult, HardhatArtifacts, NetworkContext, Orchestrator,
    RetryingSubmitter, RpcSubmitter, TracingReporter,
    config::{DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_CONFIRMATIONS},
    fempunk::{DEFAULT_CANVAS_URI, fempunk_plan},
    record::DEFAULT_OUTPUT_FILENAME,
    submitter::DEFAULT_MAX_RETRIES,
};

/// The default name for the fempunk configuration file.
pub const CONFIG_FILENAME: &str = "Fempunk.toml";

/// Default directory holding the compiled contract artifacts.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

fn default_artifacts() -> PathBuf {
    PathBuf::from(DEFAULT_ARTIFACTS_DIR)
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILENAME)
}

fn default_canvas_uri() -> String {
    DEFAULT_CANVAS_URI.to_string()
}

fn default_confirmations() -> u64 {
    DEFAULT_CONFIRMATIONS
}

fn default_confirmation_timeout_secs() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT.as_secs()
}

fn default_max_retries() -> usize {
    DEFAULT_MAX_RETRIES
}

/// Deploys the FemPunk suite to one network.
///
/// This struct contains all the configuration needed for a deployment and can
/// be serialized to/from TOML format. The credential is never written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployer {
    /// JSON-RPC endpoint of the target network.
    pub endpoint_url: Url,
    /// Chain id the endpoint must report.
    pub chain_id: u64,
    /// Human-readable network label recorded in the output.
    pub network: String,
    /// Hex-encoded private key of the deployer.
    #[serde(default, skip_serializing)]
    pub credential: Option<Credential>,

    /// Directory holding the compiled contract artifacts.
    #[serde(default = "default_artifacts")]
    pub artifacts: PathBuf,
    /// Where the deployed addresses are written.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Metadata URI template passed to the canvas constructor.
    #[serde(default = "default_canvas_uri")]
    pub canvas_uri: String,

    /// Confirmations to wait for on every transaction.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    /// Bound on a single confirmation wait, in seconds.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    /// Retries of an operation that failed before anything was broadcast.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl Deployer {
    pub fn new(endpoint_url: Url, chain_id: u64, network: impl Into<String>) -> Self {
        Self {
            endpoint_url,
            chain_id,
            network: network.into(),
            credential: None,
            artifacts: default_artifacts(),
            output: default_output(),
            canvas_uri: default_canvas_uri(),
            confirmations: default_confirmations(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize deployer config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Load the configuration from a TOML file.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file or directory not found: {}",
                path.display()
            ));
        }

        let config_path = if path.is_dir() {
            path.join(CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };

        let content = std::fs::read_to_string(config_path)
            .context(format!("Failed to read config from {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).context("Failed to parse config file as TOML")?;
        tracing::info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// The network context handed to the transaction submitter.
    pub fn network_context(&self) -> Result<NetworkContext> {
        let credential = self
            .credential
            .clone()
            .context("No deployer credential configured (set FEMPUNK_PRIVATE_KEY)")?;

        Ok(NetworkContext::new(
            self.endpoint_url.clone(),
            self.chain_id,
            self.network.clone(),
            credential,
        )
        .confirmations(self.confirmations)
        .confirmation_timeout(Duration::from_secs(self.confirmation_timeout_secs)))
    }

    pub async fn deploy(self) -> Result<DeploymentResult> {
        tracing::info!("Starting deployment process...");

        let network = self.network_context()?;

        if !self.artifacts.is_dir() {
            anyhow::bail!(
                "Artifacts directory not found: {} (compile the contracts first)",
                self.artifacts.display()
            );
        }

        let submitter = RpcSubmitter::connect(&network)
            .await
            .context("Failed to connect to the RPC endpoint")?;
        let submitter = RetryingSubmitter::new(submitter, self.max_retries);

        let mut orchestrator = Orchestrator::new(
            HardhatArtifacts::new(&self.artifacts),
            submitter,
            TracingReporter,
            network.label.clone(),
            network.chain_id,
        );

        let result = orchestrator
            .execute(&fempunk_plan(self.canvas_uri), &self.output)
            .await?;

        Ok(result)
    }
}
