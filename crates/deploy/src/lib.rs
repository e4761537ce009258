//! fempunk-deploy - Deployment library for the FemPunk contracts.
//!
//! This crate deploys a fixed set of interdependent contracts in order, links
//! them together once they are all on chain and records the resulting
//! addresses. Transaction submission sits behind [`TransactionSubmitter`] so
//! the sequencing logic runs unchanged against a real node or a test double.

mod artifacts;
pub use artifacts::{ArtifactLoader, ArtifactSet, ContractSpec, HardhatArtifacts};

mod config;
pub use config::{Credential, DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_CONFIRMATIONS, NetworkContext};

mod deployer;
pub use deployer::{CONFIG_FILENAME, DEFAULT_ARTIFACTS_DIR, Deployer};

mod error;
pub use error::DeployError;

pub mod fempunk;
pub use fempunk::fempunk_plan;

mod orchestrator;
pub use orchestrator::Orchestrator;

mod plan;
pub use plan::{ArgsFn, DeployedSet, DeploymentPlan, DeploymentStep, LinkAction, address_of};

mod record;
pub use record::{DEFAULT_OUTPUT_FILENAME, DeploymentResult, RESERVED_KEYS};

mod reporter;
pub use reporter::{Event, Reporter, TracingReporter, summary_table};

mod submitter;
pub use submitter::{
    CallReceipt, DEFAULT_MAX_RETRIES, DeployedInstance, RetryingSubmitter, RpcSubmitter,
    TransactionSubmitter,
};
