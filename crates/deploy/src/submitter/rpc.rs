//! [`TransactionSubmitter`] backed by an Ethereum JSON-RPC endpoint.

use std::time::Duration;

use alloy_core::{
    dyn_abi::{DynSolValue, JsonAbiExt},
    json_abi::Function,
    primitives::{Address, B256, Bytes},
};
use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_provider::{
    DynProvider, PendingTransactionError, Provider, ProviderBuilder, WatchTxError,
};
use alloy_rpc_types_eth::{BlockId, TransactionReceipt, TransactionRequest};

use super::{CallReceipt, DeployedInstance, TransactionSubmitter};
use crate::{ContractSpec, DeployError, NetworkContext};

/// Submits transactions through an alloy provider signing with the configured
/// credential.
#[derive(Clone)]
pub struct RpcSubmitter {
    provider: DynProvider,
    deployer: Address,
    confirmations: u64,
    confirmation_timeout: Duration,
}

impl std::fmt::Debug for RpcSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcSubmitter")
            .field("deployer", &self.deployer)
            .field("confirmations", &self.confirmations)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .finish_non_exhaustive()
    }
}

impl RpcSubmitter {
    /// Connect to the endpoint of `network` and check that it serves the
    /// configured chain.
    pub async fn connect(network: &NetworkContext) -> Result<Self, DeployError> {
        let signer = network.credential.signer()?;
        let deployer = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(network.endpoint_url.clone())
            .erased();

        let actual = provider
            .get_chain_id()
            .await
            .map_err(|e| DeployError::Unreachable(e.to_string()))?;

        if actual != network.chain_id {
            return Err(DeployError::ChainIdMismatch {
                expected: network.chain_id,
                actual,
            });
        }

        tracing::info!(
            deployer = %deployer,
            network = %network.label,
            chain_id = actual,
            "Connected to RPC endpoint"
        );

        Ok(Self {
            provider,
            deployer,
            confirmations: network.confirmations,
            confirmation_timeout: network.confirmation_timeout,
        })
    }

    /// Send `tx` with an explicitly pinned nonce and wait for its receipt.
    async fn submit(&self, tx: TransactionRequest) -> Result<TransactionReceipt, DeployError> {
        // Nothing has been signed yet, so a failure here is safe to retry.
        let nonce = self
            .provider
            .get_transaction_count(self.deployer)
            .pending()
            .await
            .map_err(|e| DeployError::Unreachable(e.to_string()))?;

        let tx = tx.with_from(self.deployer).with_nonce(nonce);

        let pending = self
            .provider
            .send_transaction(tx.clone())
            .await
            .map_err(|e| DeployError::SubmissionRejected {
                reason: e.to_string(),
                tx_hash: None,
            })?;

        let tx_hash = *pending.tx_hash();
        tracing::debug!(tx_hash = %tx_hash, nonce, "Transaction broadcast, waiting for confirmation");

        let receipt = pending
            .with_required_confirmations(self.confirmations)
            .with_timeout(Some(self.confirmation_timeout))
            .get_receipt()
            .await
            .map_err(|e| confirmation_error(e, tx_hash, self.confirmation_timeout))?;

        if !receipt.status() {
            let reason = self.revert_reason(tx, receipt.block_number).await;
            return Err(reverted(tx_hash, reason));
        }

        Ok(receipt)
    }

    /// Best-effort revert reason: replay the transaction as a call at the block
    /// that included it.
    async fn revert_reason(&self, tx: TransactionRequest, block_number: Option<u64>) -> String {
        let Some(block_number) = block_number else {
            return "execution reverted".to_string();
        };

        match self
            .provider
            .call(tx)
            .block(BlockId::number(block_number))
            .await
        {
            Err(e) => e.to_string(),
            Ok(_) => "execution reverted".to_string(),
        }
    }
}

/// Classify a failed confirmation wait. Only the bounded wait elapsing is a timeout.
fn confirmation_error(
    err: PendingTransactionError,
    tx_hash: B256,
    waited: Duration,
) -> DeployError {
    match err {
        PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
            DeployError::ConfirmationTimeout { tx_hash, waited }
        }
        other => DeployError::Unconfirmed {
            tx_hash,
            reason: other.to_string(),
        },
    }
}

/// A transaction that was included but failed.
fn reverted(tx_hash: B256, reason: String) -> DeployError {
    DeployError::SubmissionRejected {
        reason,
        tx_hash: Some(tx_hash),
    }
}

/// Address of the instance created by a successful deployment receipt.
fn created_address(
    contract_address: Option<Address>,
    tx_hash: B256,
) -> Result<Address, DeployError> {
    contract_address.ok_or_else(|| DeployError::SubmissionRejected {
        reason: "receipt carries no contract address".to_string(),
        tx_hash: Some(tx_hash),
    })
}

impl TransactionSubmitter for RpcSubmitter {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn deploy(
        &self,
        spec: &ContractSpec,
        args: &[DynSolValue],
    ) -> Result<DeployedInstance, DeployError> {
        let code = spec.deploy_code(args)?;
        let tx = TransactionRequest::default().with_deploy_code(code);

        let receipt = self.submit(tx).await?;
        let tx_hash: B256 = receipt.transaction_hash;
        let address = created_address(receipt.contract_address, tx_hash)?;

        Ok(DeployedInstance {
            name: spec.name.clone(),
            address,
            tx_hash,
        })
    }

    async fn call(
        &self,
        to: Address,
        function: &Function,
        args: &[DynSolValue],
    ) -> Result<CallReceipt, DeployError> {
        let calldata: Bytes = function
            .abi_encode_input(args)
            .map_err(|e| DeployError::InvalidArguments {
                contract: to.to_string(),
                reason: format!("{}: {e}", function.name),
            })?
            .into();

        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata);

        let receipt = self.submit(tx).await?;

        Ok(CallReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }
}
