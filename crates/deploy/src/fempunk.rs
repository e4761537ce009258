//! The FemPunk contract suite.

use alloy_core::dyn_abi::DynSolValue;

use crate::{DeploymentPlan, DeploymentStep, LinkAction, address_of};

pub const FEM_CANVAS: &str = "FemCanvas";
pub const FEM_COLORS: &str = "FemColors";
pub const FEM_CANVAS_CONTRIBUTION: &str = "FemCanvasContribution";
pub const FEM_CANVAS_REVENUE: &str = "FemCanvasRevenue";

/// Metadata URI template passed to the canvas constructor.
pub const DEFAULT_CANVAS_URI: &str = "https://api.fempunk.com/canvas/{id}";

/// Deployment plan of the FemPunk suite.
///
/// The revenue contract needs the contribution and canvas addresses, and the
/// canvas is told the revenue address once everything is deployed.
pub fn fempunk_plan(canvas_uri: impl Into<String>) -> DeploymentPlan {
    let canvas_uri = canvas_uri.into();

    DeploymentPlan::new()
        .deploy(
            DeploymentStep::new(FEM_CANVAS)
                .with_args(move |_| Ok(vec![DynSolValue::String(canvas_uri.clone())])),
        )
        .deploy(DeploymentStep::new(FEM_COLORS))
        .deploy(DeploymentStep::new(FEM_CANVAS_CONTRIBUTION))
        .deploy(DeploymentStep::new(FEM_CANVAS_REVENUE).with_args(|deployed| {
            Ok(vec![
                address_of(deployed, FEM_CANVAS_CONTRIBUTION)?,
                address_of(deployed, FEM_CANVAS)?,
                DynSolValue::Address(deployed.deployer()),
            ])
        }))
        .link(LinkAction::new(
            FEM_CANVAS,
            "setRevenueContract",
            |deployed| Ok(vec![address_of(deployed, FEM_CANVAS_REVENUE)?]),
        ))
}
