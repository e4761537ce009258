//! Data-driven deployment plans.
//!
//! A plan is an ordered list of [`DeploymentStep`]s followed by an ordered list
//! of [`LinkAction`]s. Each step computes its constructor arguments from the
//! instances deployed by the steps before it.

use std::collections::HashSet;

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};
use indexmap::IndexMap;

use crate::{DeployError, DeployedInstance, record::RESERVED_KEYS};

/// Computes arguments from the instances deployed so far.
pub type ArgsFn =
    Box<dyn Fn(&DeployedSet) -> Result<Vec<DynSolValue>, DeployError> + Send + Sync>;

/// Append-only record of the instances deployed during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedSet {
    deployer: Address,
    instances: IndexMap<String, DeployedInstance>,
}

impl DeployedSet {
    pub fn new(deployer: Address) -> Self {
        Self {
            deployer,
            instances: IndexMap::new(),
        }
    }

    /// Address of the signing identity performing the deployment.
    pub fn deployer(&self) -> Address {
        self.deployer
    }

    /// Address of an already deployed instance.
    pub fn address(&self, name: &str) -> Result<Address, DeployError> {
        self.get(name)
            .map(|instance| instance.address)
            .ok_or_else(|| DeployError::UnresolvedDependency {
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Option<&DeployedInstance> {
        self.instances.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instances in deployment order.
    pub fn iter(&self) -> impl Iterator<Item = &DeployedInstance> {
        self.instances.values()
    }

    /// Record a new instance. An instance is never replaced.
    pub(crate) fn insert(&mut self, instance: DeployedInstance) -> Result<(), DeployError> {
        if self.instances.contains_key(&instance.name) {
            return Err(DeployError::InvalidPlan(format!(
                "`{}` deployed twice in one run",
                instance.name
            )));
        }
        self.instances.insert(instance.name.clone(), instance);
        Ok(())
    }
}

/// One contract creation of the plan.
pub struct DeploymentStep {
    name: String,
    args: ArgsFn,
}

impl DeploymentStep {
    /// A step whose constructor takes no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Box::new(|_| Ok(Vec::new())),
        }
    }

    /// Set the function computing the constructor arguments.
    pub fn with_args<F>(mut self, args: F) -> Self
    where
        F: Fn(&DeployedSet) -> Result<Vec<DynSolValue>, DeployError> + Send + Sync + 'static,
    {
        self.args = Box::new(args);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve the constructor arguments against the instances deployed so far.
    pub fn resolve_args(&self, deployed: &DeployedSet) -> Result<Vec<DynSolValue>, DeployError> {
        (self.args)(deployed)
    }
}

impl std::fmt::Debug for DeploymentStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentStep")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A post-deployment call wiring one deployed instance to others.
pub struct LinkAction {
    target: String,
    method: String,
    args: ArgsFn,
}

impl LinkAction {
    pub fn new<F>(target: impl Into<String>, method: impl Into<String>, args: F) -> Self
    where
        F: Fn(&DeployedSet) -> Result<Vec<DynSolValue>, DeployError> + Send + Sync + 'static,
    {
        Self {
            target: target.into(),
            method: method.into(),
            args: Box::new(args),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn resolve_args(&self, deployed: &DeployedSet) -> Result<Vec<DynSolValue>, DeployError> {
        (self.args)(deployed)
    }
}

impl std::fmt::Debug for LinkAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkAction")
            .field("target", &self.target)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Ordered deployment steps followed by ordered link actions.
#[derive(Debug, Default)]
pub struct DeploymentPlan {
    steps: Vec<DeploymentStep>,
    links: Vec<LinkAction>,
}

impl DeploymentPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a deployment step.
    pub fn deploy(mut self, step: DeploymentStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a link action.
    pub fn link(mut self, action: LinkAction) -> Self {
        self.links.push(action);
        self
    }

    pub fn steps(&self) -> &[DeploymentStep] {
        &self.steps
    }

    pub fn links(&self) -> &[LinkAction] {
        &self.links
    }

    /// Check the plan before anything is sent to the network.
    ///
    /// Logical names must be unique and must not collide with the metadata
    /// keys of the persisted record.
    pub fn validate(&self) -> Result<(), DeployError> {
        let mut seen = HashSet::new();

        for step in &self.steps {
            if step.name.is_empty() {
                return Err(DeployError::InvalidPlan(
                    "contract names must not be empty".to_string(),
                ));
            }
            if RESERVED_KEYS.contains(&step.name.as_str()) {
                return Err(DeployError::InvalidPlan(format!(
                    "`{}` is a reserved name",
                    step.name
                )));
            }
            if !seen.insert(step.name.as_str()) {
                return Err(DeployError::InvalidPlan(format!(
                    "`{}` appears more than once",
                    step.name
                )));
            }
        }

        Ok(())
    }
}

/// Constructor/call argument referencing a deployed instance.
pub fn address_of(deployed: &DeployedSet, name: &str) -> Result<DynSolValue, DeployError> {
    deployed.address(name).map(DynSolValue::Address)
}
