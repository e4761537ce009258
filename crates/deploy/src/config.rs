//! Network context injected into the submitter.

use std::{fmt, str::FromStr, time::Duration};

use alloy_signer_local::PrivateKeySigner;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::DeployError;

/// Default number of confirmations to wait for on every transaction.
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

/// Default bound on a single confirmation wait.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Hex-encoded private key of the deployer.
///
/// Never printed: `Debug` and `Display` are redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Parse the key into a local signer.
    pub fn signer(&self) -> Result<PrivateKeySigner, DeployError> {
        let key = self.0.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);

        PrivateKeySigner::from_str(key)
            .map_err(|e| DeployError::InvalidCredential(e.to_string()))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Everything the submitter needs to reach and sign for the target network.
#[derive(Debug, Clone)]
pub struct NetworkContext {
    /// JSON-RPC endpoint.
    pub endpoint_url: Url,
    /// Expected chain id; the endpoint must report the same value.
    pub chain_id: u64,
    /// Human-readable network label recorded in the deployment result.
    pub label: String,
    /// Signing credential of the deployer.
    pub credential: Credential,
    /// Confirmations to wait for on every transaction.
    pub confirmations: u64,
    /// Bound on a single confirmation wait.
    pub confirmation_timeout: Duration,
}

impl NetworkContext {
    pub fn new(
        endpoint_url: Url,
        chain_id: u64,
        label: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            endpoint_url,
            chain_id,
            label: label.into(),
            credential,
            confirmations: DEFAULT_CONFIRMATIONS,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }

    pub fn confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }
}
