//! Error taxonomy for a deployment run.

use std::{path::PathBuf, time::Duration};

use alloy_core::primitives::B256;

/// Errors that can occur while loading artifacts, submitting transactions,
/// executing a plan or recording its outcome.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// No compiled definition exists for the logical name.
    #[error("artifact not found for contract `{name}` under {}", .root.display())]
    ArtifactNotFound { name: String, root: PathBuf },

    /// The compiled definition exists but cannot be parsed into ABI + bytecode.
    #[error("malformed artifact for contract `{name}`: {reason}")]
    ArtifactMalformed { name: String, reason: String },

    /// Arguments do not match the ABI of the constructor or entry point.
    #[error("invalid arguments for `{contract}`: {reason}")]
    InvalidArguments { contract: String, reason: String },

    /// The network refused the transaction, or it was included but reverted.
    #[error("transaction rejected: {reason}{}", fmt_tx_hash(.tx_hash))]
    SubmissionRejected {
        reason: String,
        tx_hash: Option<B256>,
    },

    /// The transaction was broadcast but not confirmed within the bounded wait.
    #[error("transaction {tx_hash} not confirmed after {}s", .waited.as_secs())]
    ConfirmationTimeout { tx_hash: B256, waited: Duration },

    /// The confirmation watch failed for a reason other than the timeout.
    #[error("lost track of transaction {tx_hash}: {reason}")]
    Unconfirmed { tx_hash: B256, reason: String },

    /// The node could not be reached before anything was signed or broadcast.
    #[error("RPC endpoint unreachable: {0}")]
    Unreachable(String),

    /// The deployer credential is not a valid private key.
    #[error("invalid deployer credential: {0}")]
    InvalidCredential(String),

    /// The endpoint serves a different chain than the one configured.
    #[error("chain id mismatch: configured {expected}, endpoint reports {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    /// A step or link referenced a contract that has not been deployed yet.
    #[error("unresolved dependency: `{name}` has not been deployed")]
    UnresolvedDependency { name: String },

    /// The plan itself is inconsistent.
    #[error("invalid deployment plan: {0}")]
    InvalidPlan(String),

    /// A deployment step failed; nothing after it was attempted.
    #[error("deployment step {index} (`{name}`) failed: {source}")]
    DeploymentStepFailed {
        index: usize,
        name: String,
        #[source]
        source: Box<DeployError>,
    },

    /// A link action failed; every deployment of the plan is already on chain.
    #[error("link action {index} (`{target}.{method}`) failed: {source}")]
    LinkActionFailed {
        index: usize,
        target: String,
        method: String,
        #[source]
        source: Box<DeployError>,
    },

    /// The deployment result could not be written.
    #[error("failed to persist deployment result to {}: {reason}", .path.display())]
    PersistenceError { path: PathBuf, reason: String },
}

impl DeployError {
    /// Whether retrying the same operation cannot cause a duplicate broadcast.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeployError::Unreachable(_))
    }

    /// Wrap a failure that happened inside deployment step `index`.
    pub(crate) fn in_step(self, index: usize, name: &str) -> Self {
        DeployError::DeploymentStepFailed {
            index,
            name: name.to_string(),
            source: Box::new(self),
        }
    }

    /// Wrap a failure that happened inside link action `index`.
    pub(crate) fn in_link(self, index: usize, target: &str, method: &str) -> Self {
        DeployError::LinkActionFailed {
            index,
            target: target.to_string(),
            method: method.to_string(),
            source: Box::new(self),
        }
    }
}

fn fmt_tx_hash(tx_hash: &Option<B256>) -> String {
    tx_hash
        .map(|hash| format!(" (tx {hash})"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unreachable_is_retryable() {
        assert!(DeployError::Unreachable("connection refused".to_string()).is_retryable());
        assert!(
            !DeployError::SubmissionRejected {
                reason: "nonce too low".to_string(),
                tx_hash: None,
            }
            .is_retryable()
        );
        assert!(
            !DeployError::ConfirmationTimeout {
                tx_hash: B256::ZERO,
                waited: Duration::from_secs(120),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_step_wrapper_keeps_cause() {
        let err = DeployError::UnresolvedDependency {
            name: "FemCanvas".to_string(),
        }
        .in_step(3, "FemCanvasRevenue");

        let message = err.to_string();
        assert!(message.contains("step 3"));
        assert!(message.contains("FemCanvasRevenue"));
        assert!(message.contains("FemCanvas"));

        match err {
            DeployError::DeploymentStepFailed { index, source, .. } => {
                assert_eq!(index, 3);
                assert!(matches!(*source, DeployError::UnresolvedDependency { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejection_message_includes_tx_hash() {
        let err = DeployError::SubmissionRejected {
            reason: "execution reverted".to_string(),
            tx_hash: Some(B256::repeat_byte(0xab)),
        };
        assert!(err.to_string().contains("0xabab"));

        let err = DeployError::SubmissionRejected {
            reason: "insufficient funds".to_string(),
            tx_hash: None,
        };
        assert_eq!(err.to_string(), "transaction rejected: insufficient funds");
    }
}
