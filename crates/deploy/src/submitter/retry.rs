//! Retry wrapper around a [`TransactionSubmitter`].

use std::time::Duration;

use alloy_core::{dyn_abi::DynSolValue, json_abi::Function, primitives::Address};
use backon::{ExponentialBuilder, Retryable};

use super::{CallReceipt, DeployedInstance, TransactionSubmitter};
use crate::{ContractSpec, DeployError};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Retries operations that failed before anything was broadcast.
///
/// Only [`DeployError::is_retryable`] errors are retried, so a retry never
/// sends a second transaction for a step whose first one may be on chain.
#[derive(Debug, Clone)]
pub struct RetryingSubmitter<S> {
    inner: S,
    backoff: ExponentialBuilder,
}

impl<S> RetryingSubmitter<S> {
    pub fn new(inner: S, max_retries: usize) -> Self {
        Self {
            inner,
            backoff: ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(500))
                .with_max_delay(Duration::from_secs(10))
                .with_max_times(max_retries),
        }
    }

    /// Override the back-off policy.
    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn log_retry(operation: &str, err: &DeployError, delay: Duration) {
    tracing::warn!(
        operation,
        error = %err,
        delay_ms = delay.as_millis() as u64,
        "Submission failed before broadcast, retrying..."
    );
}

impl<S> TransactionSubmitter for RetryingSubmitter<S>
where
    S: TransactionSubmitter + Sync,
{
    fn deployer(&self) -> Address {
        self.inner.deployer()
    }

    async fn deploy(
        &self,
        spec: &ContractSpec,
        args: &[DynSolValue],
    ) -> Result<DeployedInstance, DeployError> {
        (|| self.inner.deploy(spec, args))
            .retry(self.backoff)
            .sleep(tokio::time::sleep)
            .when(DeployError::is_retryable)
            .notify(|err, delay| log_retry("deploy", err, delay))
            .await
    }

    async fn call(
        &self,
        to: Address,
        function: &Function,
        args: &[DynSolValue],
    ) -> Result<CallReceipt, DeployError> {
        (|| self.inner.call(to, function, args))
            .retry(self.backoff)
            .sleep(tokio::time::sleep)
            .when(DeployError::is_retryable)
            .notify(|err, delay| log_retry("call", err, delay))
            .await
    }
}
