//! Progress reporting for a deployment run.

use std::path::Path;

use alloy_core::primitives::{Address, B256};
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};

use crate::{CallReceipt, DeployError, DeployedInstance, DeployedSet, DeploymentResult};

/// Something that happened during a run, in the order it happened.
#[derive(Debug)]
pub enum Event<'a> {
    RunStarted {
        deployer: Address,
        network: &'a str,
        chain_id: u64,
        steps: usize,
        links: usize,
    },
    StepStarted {
        index: usize,
        name: &'a str,
    },
    StepSucceeded {
        index: usize,
        instance: &'a DeployedInstance,
    },
    StepFailed {
        index: usize,
        name: &'a str,
        error: &'a DeployError,
    },
    LinkStarted {
        index: usize,
        target: &'a str,
        method: &'a str,
    },
    LinkSucceeded {
        index: usize,
        target: &'a str,
        method: &'a str,
        receipt: &'a CallReceipt,
    },
    LinkFailed {
        index: usize,
        target: &'a str,
        method: &'a str,
        error: &'a DeployError,
    },
    RunSucceeded {
        result: &'a DeploymentResult,
        destination: Option<&'a Path>,
    },
    RunFailed {
        error: &'a DeployError,
        deployed: &'a DeployedSet,
    },
}

/// Observes the progress of a run. Reporting never affects the outcome.
pub trait Reporter {
    fn report(&self, event: &Event<'_>);
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn report(&self, event: &Event<'_>) {
        (**self).report(event)
    }
}

/// Reports through `tracing`, ending with a summary table of the deployed
/// addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &Event<'_>) {
        match event {
            Event::RunStarted {
                deployer,
                network,
                chain_id,
                steps,
                links,
            } => {
                tracing::info!(
                    deployer = %deployer,
                    network,
                    chain_id,
                    steps,
                    links,
                    "Starting deployment..."
                );
            }
            Event::StepStarted { index, name } => {
                tracing::info!(step = index + 1, contract = %name, "Deploying contract...");
            }
            Event::StepSucceeded { index, instance } => {
                tracing::info!(
                    step = index + 1,
                    contract = %instance.name,
                    address = %instance.address,
                    tx_hash = %instance.tx_hash,
                    "Contract deployed"
                );
            }
            Event::StepFailed { index, name, error } => {
                tracing::error!(step = index + 1, contract = %name, error = %error, "Deployment step failed");
            }
            Event::LinkStarted {
                index,
                target,
                method,
            } => {
                tracing::info!(link = index + 1, target = %target, method = %method, "Linking contracts...");
            }
            Event::LinkSucceeded {
                index,
                target,
                method,
                receipt,
            } => {
                tracing::info!(
                    link = index + 1,
                    target = %target,
                    method = %method,
                    tx_hash = %receipt.tx_hash,
                    gas_used = receipt.gas_used,
                    "Contracts linked"
                );
            }
            Event::LinkFailed {
                index,
                target,
                method,
                error,
            } => {
                tracing::error!(link = index + 1, target = %target, method = %method, error = %error, "Link action failed");
            }
            Event::RunSucceeded {
                result,
                destination,
            } => {
                tracing::info!("✓ Deployment complete!");
                for line in summary_table(result).lines() {
                    tracing::info!("{line}");
                }
                if let Some(path) = destination {
                    tracing::info!("Addresses saved to {}", path.display());
                }
            }
            Event::RunFailed { error, deployed } => {
                tracing::error!(error = %error, "Deployment failed");
                if deployed.is_empty() {
                    tracing::warn!("No contract was deployed");
                } else {
                    // These are on chain and must be reused or abandoned by hand.
                    tracing::warn!(
                        count = deployed.len(),
                        "Contracts already deployed before the failure:"
                    );
                    for instance in deployed.iter() {
                        tracing::warn!(contract = %instance.name, address = %instance.address, "  deployed");
                    }
                }
            }
        }
    }
}

/// Render the addresses of a result as a table.
pub fn summary_table(result: &DeploymentResult) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_header(vec!["Contract", "Address", "Transaction"]);

    for (name, address) in &result.contracts {
        let tx_hash = result
            .transactions
            .get(name)
            .map(B256::to_string)
            .unwrap_or_default();
        table.add_row(vec![name.clone(), address.to_string(), tx_hash]);
    }

    format!(
        "{table}\nDeployer: {}\nNetwork:  {} (chain id {})",
        result.deployer, result.network, result.chain_id
    )
}
