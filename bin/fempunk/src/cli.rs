use std::{fmt, path::PathBuf, str::FromStr};

use anyhow::Context;
use clap::Parser;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use fempunk_deploy::{CONFIG_FILENAME, Deployer};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use url::Url;

/// The default target network (Base Sepolia).
const DEFAULT_CHAIN: Chain = Chain::Known(KnownChain::BaseSepolia);

/// Networks with a well-known chain id, label and public RPC endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum KnownChain {
    BaseSepolia,
    Base,
    Sepolia,
    Mainnet,
    Anvil,
}

impl KnownChain {
    pub fn to_chain_id(&self) -> u64 {
        match self {
            KnownChain::BaseSepolia => 84532,
            KnownChain::Base => 8453,
            KnownChain::Sepolia => 11155111,
            KnownChain::Mainnet => 1,
            KnownChain::Anvil => 31337,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            KnownChain::BaseSepolia => "Base Sepolia",
            KnownChain::Base => "Base",
            KnownChain::Sepolia => "Sepolia",
            KnownChain::Mainnet => "Ethereum Mainnet",
            KnownChain::Anvil => "Anvil",
        }
    }

    pub fn rpc_url(&self) -> &'static str {
        match self {
            KnownChain::BaseSepolia => "https://sepolia.base.org",
            KnownChain::Base => "https://mainnet.base.org",
            KnownChain::Sepolia => "https://ethereum-sepolia-rpc.publicnode.com",
            KnownChain::Mainnet => "https://ethereum-mainnet-rpc.publicnode.com",
            KnownChain::Anvil => "http://localhost:8545",
        }
    }
}

/// Target chain: a known network name or a raw chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Known(KnownChain),
    Custom(u64),
}

impl Chain {
    pub fn to_chain_id(&self) -> u64 {
        match self {
            Chain::Known(chain) => chain.to_chain_id(),
            Chain::Custom(id) => *id,
        }
    }

    fn defaults(&self) -> ConfigLayer {
        match self {
            Chain::Known(chain) => ConfigLayer {
                endpoint_url: Url::parse(chain.rpc_url()).ok(),
                chain_id: Some(chain.to_chain_id()),
                network: Some(chain.label().to_string()),
                ..Default::default()
            },
            Chain::Custom(id) => ConfigLayer {
                chain_id: Some(*id),
                network: Some(format!("chain {id}")),
                ..Default::default()
            },
        }
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(chain) = KnownChain::from_str(s) {
            return Ok(Chain::Known(chain));
        }
        s.parse::<u64>()
            .map(Chain::Custom)
            .map_err(|_| format!("unknown chain `{s}` (expected a network name or a chain id)"))
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Known(chain) => write!(f, "{chain}"),
            Chain::Custom(id) => write!(f, "{id}"),
        }
    }
}

/// One layer of deployer settings; unset fields fall through to lower layers.
#[derive(Debug, Default, Serialize)]
struct ConfigLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    credential: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifacts: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    canvas_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confirmations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confirmation_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_retries: Option<usize>,
}

#[derive(Parser)]
#[command(name = "fempunk")]
#[command(
    author,
    version,
    about = "Deploy and link the FemPunk contracts on an EVM network"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "FEMPUNK_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a Fempunk.toml configuration file (or a directory containing one).
    ///
    /// If not provided, ./Fempunk.toml is used when it exists.
    #[arg(long, alias = "conf", env = "FEMPUNK_CONFIG")]
    pub config: Option<PathBuf>,

    /// The target chain (network name or chain ID).
    ///
    /// Known networks: base-sepolia, base, sepolia, mainnet, anvil.
    /// Defaults to base-sepolia.
    #[arg(long, env = "FEMPUNK_CHAIN")]
    pub chain: Option<Chain>,

    /// The URL of the JSON-RPC endpoint. Defaults to the public endpoint of the chain.
    #[arg(long, alias = "rpc-url", env = "FEMPUNK_RPC_URL")]
    pub endpoint_url: Option<Url>,

    /// Human-readable network label written to the output file.
    #[arg(short, long, env = "FEMPUNK_NETWORK")]
    pub network: Option<String>,

    /// Hex-encoded private key of the deployer account.
    #[arg(long, env = "FEMPUNK_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Directory holding the compiled contract artifacts.
    #[arg(long, env = "FEMPUNK_ARTIFACTS")]
    pub artifacts: Option<PathBuf>,

    /// Where the deployed addresses are written.
    #[arg(short, long, env = "FEMPUNK_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Metadata URI template passed to the FemCanvas constructor.
    #[arg(long, env = "FEMPUNK_CANVAS_URI")]
    pub canvas_uri: Option<String>,

    /// Confirmations to wait for on every transaction.
    #[arg(long, env = "FEMPUNK_CONFIRMATIONS")]
    pub confirmations: Option<u64>,

    /// Maximum wait for a single confirmation, in seconds.
    #[arg(long, alias = "timeout", env = "FEMPUNK_CONFIRMATION_TIMEOUT")]
    pub confirmation_timeout: Option<u64>,

    /// Retries of an RPC request that failed before anything was broadcast.
    #[arg(long, env = "FEMPUNK_MAX_RETRIES")]
    pub max_retries: Option<usize>,

    /// Save the resolved configuration (without the private key) to this path
    /// before deploying.
    #[arg(long, env = "FEMPUNK_SAVE_CONFIG")]
    pub save_config: Option<PathBuf>,
}

impl Cli {
    /// Resolve the deployer configuration.
    ///
    /// Layers, lowest first: defaults of the chain, the TOML file, then the
    /// command line (which includes the `FEMPUNK_*` environment).
    pub fn resolve(&self) -> anyhow::Result<Deployer> {
        let chain = self.chain.unwrap_or(DEFAULT_CHAIN);

        let mut figment = Figment::new().merge(Serialized::defaults(chain.defaults()));

        if let Some(path) = self.config_path()? {
            tracing::debug!(path = %path.display(), "Reading configuration file");
            figment = figment.merge(Toml::file(path));
        }

        let overrides = ConfigLayer {
            endpoint_url: self.endpoint_url.clone(),
            chain_id: self.chain.map(|chain| chain.to_chain_id()),
            network: self.network.clone(),
            credential: self.private_key.clone(),
            artifacts: self.artifacts.clone(),
            output: self.output.clone(),
            canvas_uri: self.canvas_uri.clone(),
            confirmations: self.confirmations,
            confirmation_timeout_secs: self.confirmation_timeout,
            max_retries: self.max_retries,
        };

        figment
            .merge(Serialized::defaults(overrides))
            .extract()
            .context("Invalid deployer configuration")
    }

    fn config_path(&self) -> anyhow::Result<Option<PathBuf>> {
        match &self.config {
            Some(path) if path.is_dir() => Ok(Some(path.join(CONFIG_FILENAME))),
            Some(path) if path.is_file() => Ok(Some(path.clone())),
            Some(path) => anyhow::bail!("Configuration file not found: {}", path.display()),
            None => {
                let default = PathBuf::from(CONFIG_FILENAME);
                Ok(default.is_file().then_some(default))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fempunk").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_chain_parsing() {
        assert_eq!(
            "base-sepolia".parse::<Chain>().unwrap(),
            Chain::Known(KnownChain::BaseSepolia)
        );
        assert_eq!("anvil".parse::<Chain>().unwrap().to_chain_id(), 31337);
        assert_eq!("10".parse::<Chain>().unwrap(), Chain::Custom(10));
        assert!("not-a-chain".parse::<Chain>().is_err());

        assert_eq!(Chain::Known(KnownChain::BaseSepolia).to_string(), "base-sepolia");
        assert_eq!(Chain::Custom(10).to_string(), "10");
    }

    #[test]
    fn test_resolve_defaults_to_base_sepolia() {
        let cli = parse(&["--private-key", "0x01", "--config", "/nonexistent/Fempunk.toml"]);
        assert!(cli.resolve().is_err());

        let dir = TempDir::new("cli-test").unwrap();
        let cli = parse(&[
            "--private-key",
            "0x01",
            "--config",
            dir.path().to_str().unwrap(),
        ]);
        let deployer = cli.resolve().unwrap();

        assert_eq!(deployer.chain_id, 84532);
        assert_eq!(deployer.network, "Base Sepolia");
        assert_eq!(deployer.endpoint_url.as_str(), "https://sepolia.base.org/");
        assert!(deployer.credential.is_some());
    }

    #[test]
    fn test_resolve_layers() {
        let dir = TempDir::new("cli-test").unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"
            endpoint_url = "http://10.0.0.5:8545"
            chain_id = 31337
            network = "Local devnet"
            confirmations = 2
            "#,
        )
        .unwrap();

        let config = dir.path().to_str().unwrap();
        let deployer = parse(&["--config", config]).resolve().unwrap();
        assert_eq!(deployer.endpoint_url.as_str(), "http://10.0.0.5:8545/");
        assert_eq!(deployer.chain_id, 31337);
        assert_eq!(deployer.network, "Local devnet");
        assert_eq!(deployer.confirmations, 2);
        assert_eq!(deployer.credential, None);

        // The command line wins over the file.
        let deployer = parse(&["--config", config, "--confirmations", "5", "-n", "Override"])
            .resolve()
            .unwrap();
        assert_eq!(deployer.confirmations, 5);
        assert_eq!(deployer.network, "Override");
        assert_eq!(deployer.chain_id, 31337);
    }

    #[test]
    fn test_custom_chain_requires_endpoint() {
        let dir = TempDir::new("cli-test").unwrap();
        let config = dir.path().to_str().unwrap();

        assert!(parse(&["--config", config, "--chain", "424242"]).resolve().is_err());

        let deployer = parse(&[
            "--config",
            config,
            "--chain",
            "424242",
            "--endpoint-url",
            "http://localhost:9545",
        ])
        .resolve()
        .unwrap();
        assert_eq!(deployer.chain_id, 424242);
        assert_eq!(deployer.network, "chain 424242");
    }
}
