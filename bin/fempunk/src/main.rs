//! fempunk deploys the FemPunk contracts to an EVM network and records their addresses.

mod cli;

use anyhow::Result;
use clap::Parser;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger. Everything goes to stderr.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    let deployer = cli.resolve()?;

    tracing::info!(
        endpoint = %deployer.endpoint_url,
        chain_id = deployer.chain_id,
        network = %deployer.network,
        artifacts = %deployer.artifacts.display(),
        output = %deployer.output.display(),
        "Loaded deployment configuration"
    );

    // Save the configuration before deploying so the run can be reproduced.
    if let Some(path) = &cli.save_config {
        deployer.save_to_file(path)?;
    }

    deployer.deploy().await?;

    Ok(())
}
