//! Sequential execution of a [`DeploymentPlan`].

use std::path::Path;

use indexmap::IndexMap;

use crate::{
    ArtifactLoader, CallReceipt, ContractSpec, DeployError, DeployedInstance, DeployedSet,
    DeploymentPlan, DeploymentResult, DeploymentStep, Event, LinkAction, Reporter,
    TransactionSubmitter,
};

/// Runs deployment plans against one network with one deployer identity.
///
/// Steps and links run strictly one after the other: every step may depend on
/// any earlier address and the deployer nonce is only ever used by one
/// in-flight transaction.
pub struct Orchestrator<L, S, R> {
    loader: L,
    submitter: S,
    reporter: R,
    network: String,
    chain_id: u64,
    deployed: DeployedSet,
    specs: IndexMap<String, ContractSpec>,
}

impl<L, S, R> Orchestrator<L, S, R>
where
    L: ArtifactLoader,
    S: TransactionSubmitter,
    R: Reporter,
{
    pub fn new(
        loader: L,
        submitter: S,
        reporter: R,
        network: impl Into<String>,
        chain_id: u64,
    ) -> Self {
        let deployer = submitter.deployer();
        Self {
            loader,
            submitter,
            reporter,
            network: network.into(),
            chain_id,
            deployed: DeployedSet::new(deployer),
            specs: IndexMap::new(),
        }
    }

    /// Instances deployed by the latest run, including a failed one.
    pub fn deployed(&self) -> &DeployedSet {
        &self.deployed
    }

    pub fn submitter(&self) -> &S {
        &self.submitter
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Execute every step, then every link action, in plan order.
    ///
    /// The first failure aborts the run. Instances confirmed before the
    /// failure stay on chain and remain visible through [`Self::deployed`].
    pub async fn run(&mut self, plan: &DeploymentPlan) -> Result<DeploymentResult, DeployError> {
        match self.run_plan(plan).await {
            Ok(result) => {
                self.reporter.report(&Event::RunSucceeded {
                    result: &result,
                    destination: None,
                });
                Ok(result)
            }
            Err(error) => {
                self.reporter.report(&Event::RunFailed {
                    error: &error,
                    deployed: &self.deployed,
                });
                Err(error)
            }
        }
    }

    /// Run the plan, then persist the result to `destination`.
    ///
    /// A run whose result cannot be written is a failed run.
    pub async fn execute(
        &mut self,
        plan: &DeploymentPlan,
        destination: &Path,
    ) -> Result<DeploymentResult, DeployError> {
        let result = match self.run_plan(plan).await {
            Ok(result) => result,
            Err(error) => {
                self.reporter.report(&Event::RunFailed {
                    error: &error,
                    deployed: &self.deployed,
                });
                return Err(error);
            }
        };

        if let Err(error) = result.persist(destination) {
            self.reporter.report(&Event::RunFailed {
                error: &error,
                deployed: &self.deployed,
            });
            return Err(error);
        }

        self.reporter.report(&Event::RunSucceeded {
            result: &result,
            destination: Some(destination),
        });
        Ok(result)
    }

    async fn run_plan(&mut self, plan: &DeploymentPlan) -> Result<DeploymentResult, DeployError> {
        // Every run starts from scratch: specs are reloaded, nothing is reused.
        self.deployed = DeployedSet::new(self.submitter.deployer());
        self.specs.clear();

        plan.validate()?;

        self.reporter.report(&Event::RunStarted {
            deployer: self.deployed.deployer(),
            network: &self.network,
            chain_id: self.chain_id,
            steps: plan.steps().len(),
            links: plan.links().len(),
        });

        for (index, step) in plan.steps().iter().enumerate() {
            self.reporter.report(&Event::StepStarted {
                index,
                name: step.name(),
            });

            match self.deploy_step(index, step).await {
                Ok(instance) => {
                    self.reporter.report(&Event::StepSucceeded {
                        index,
                        instance: &instance,
                    });
                    self.deployed.insert(instance)?;
                }
                Err(error) => {
                    self.reporter.report(&Event::StepFailed {
                        index,
                        name: step.name(),
                        error: &error,
                    });
                    return Err(error);
                }
            }
        }

        for (index, action) in plan.links().iter().enumerate() {
            self.reporter.report(&Event::LinkStarted {
                index,
                target: action.target(),
                method: action.method(),
            });

            match self.link(index, action).await {
                Ok(receipt) => self.reporter.report(&Event::LinkSucceeded {
                    index,
                    target: action.target(),
                    method: action.method(),
                    receipt: &receipt,
                }),
                Err(error) => {
                    self.reporter.report(&Event::LinkFailed {
                        index,
                        target: action.target(),
                        method: action.method(),
                        error: &error,
                    });
                    return Err(error);
                }
            }
        }

        Ok(DeploymentResult::from_deployed(
            &self.deployed,
            &self.network,
            self.chain_id,
        ))
    }

    async fn deploy_step(
        &mut self,
        index: usize,
        step: &DeploymentStep,
    ) -> Result<DeployedInstance, DeployError> {
        // A reference to a contract that is not deployed yet is a plan error,
        // reported as is.
        let args = step.resolve_args(&self.deployed)?;

        let spec = self
            .loader
            .load(step.name())
            .map_err(|e| e.in_step(index, step.name()))?;

        let instance = self
            .submitter
            .deploy(&spec, &args)
            .await
            .map_err(|e| e.in_step(index, step.name()))?;

        self.specs.insert(spec.name.clone(), spec);
        Ok(instance)
    }

    async fn link(&self, index: usize, action: &LinkAction) -> Result<CallReceipt, DeployError> {
        let target = self.deployed.address(action.target())?;
        let args = action.resolve_args(&self.deployed)?;

        let wrap = |e: DeployError| e.in_link(index, action.target(), action.method());

        let spec = self.specs.get(action.target()).ok_or_else(|| {
            wrap(DeployError::InvalidPlan(format!(
                "no artifact loaded for `{}`",
                action.target()
            )))
        })?;
        let function = spec
            .function(action.method(), args.len())
            .map_err(wrap)?;

        self.submitter
            .call(target, function, &args)
            .await
            .map_err(wrap)
    }
}

impl<L, S, R> std::fmt::Debug for Orchestrator<L, S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("network", &self.network)
            .field("chain_id", &self.chain_id)
            .field("deployed", &self.deployed)
            .finish_non_exhaustive()
    }
}
