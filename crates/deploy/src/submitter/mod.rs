//! Transaction submission boundary consumed by the orchestrator.

use std::future::Future;

use alloy_core::{
    dyn_abi::DynSolValue,
    json_abi::Function,
    primitives::{Address, B256},
};
use serde::{Deserialize, Serialize};

use crate::{ContractSpec, DeployError};

mod retry;
mod rpc;

pub use retry::{DEFAULT_MAX_RETRIES, RetryingSubmitter};
pub use rpc::RpcSubmitter;

/// A contract instance created by a confirmed deployment transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedInstance {
    /// Logical name of the contract.
    pub name: String,
    /// On-chain address of the instance.
    pub address: Address,
    /// Hash of the creation transaction.
    pub tx_hash: B256,
}

/// Receipt of a confirmed, successful state-mutating call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Sends transactions from a single signing identity and waits for them to be
/// confirmed.
///
/// Every method suspends until the transaction is included and succeeded,
/// is definitively rejected (including a revert after inclusion), or the
/// bounded confirmation wait elapses. Callers never have more than one
/// transaction in flight, which keeps the account nonce strictly ordered.
pub trait TransactionSubmitter {
    /// Address of the signing identity.
    fn deployer(&self) -> Address;

    /// Deploy `spec` with the given constructor arguments.
    fn deploy(
        &self,
        spec: &ContractSpec,
        args: &[DynSolValue],
    ) -> impl Future<Output = Result<DeployedInstance, DeployError>> + Send;

    /// Invoke `function` on the contract at `to`.
    fn call(
        &self,
        to: Address,
        function: &Function,
        args: &[DynSolValue],
    ) -> impl Future<Output = Result<CallReceipt, DeployError>> + Send;
}
