use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use chainship_deploy::DeployConfig;

#[derive(Parser)]
#[command(name = "chainship")]
#[command(
    author,
    version,
    about = "Deploy a compiled contract and record its provenance"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "CHAINSHIP_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a Chainship.toml configuration file.
    ///
    /// If not provided, ./Chainship.toml is used when it exists. Values can be
    /// overridden with CHAINSHIP_<KEY> environment variables.
    #[arg(short, long, alias = "conf")]
    pub config: Option<PathBuf>,

    /// The URL of the JSON-RPC endpoint of the target network.
    #[arg(long, alias = "rpc")]
    pub rpc_url: Option<String>,

    /// The network name used in the deployment record and explorer command.
    ///
    /// If not provided, the name is derived from the chain id.
    #[arg(short, long)]
    pub network: Option<String>,

    /// Path to the compiled contract artifact (Hardhat or Foundry JSON).
    #[arg(long)]
    pub artifact: Option<PathBuf>,

    /// Directory receiving the deployment records.
    #[arg(long, alias = "out")]
    pub records_dir: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub dump_config: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the layered configuration.
    pub fn apply(&self, mut config: DeployConfig) -> DeployConfig {
        if let Some(rpc_url) = &self.rpc_url {
            config.rpc_url = rpc_url.clone();
        }
        if let Some(network) = &self.network {
            config.network_name = Some(network.clone());
        }
        if let Some(artifact) = &self.artifact {
            config.artifact = artifact.clone();
        }
        if let Some(records_dir) = &self.records_dir {
            config.records_dir = records_dir.clone();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "chainship",
            "--rpc-url",
            "http://localhost:9545",
            "--network",
            "sepolia",
        ]);
        let config = cli.apply(DeployConfig::default());

        assert_eq!(config.rpc_url, "http://localhost:9545");
        assert_eq!(config.network_name.as_deref(), Some("sepolia"));
        assert_eq!(config.records_dir, DeployConfig::default().records_dir);
    }

    #[test]
    fn test_cli_rpc_url_overrides_invalid_file_value() {
        let tmp = tempdir::TempDir::new("chainship-cli").unwrap();
        let path = tmp.path().join("Chainship.toml");
        std::fs::write(&path, "rpc_url = \"not a url\"\n").unwrap();

        let cli = Cli::parse_from([
            "chainship",
            "--config",
            path.to_str().unwrap(),
            "--rpc-url",
            "http://localhost:9545",
        ]);
        let config = cli.apply(DeployConfig::load(cli.config.as_deref()).unwrap());

        config.validate().unwrap();
        assert_eq!(config.rpc_url, "http://localhost:9545");
    }

    #[test]
    fn test_cli_without_arguments() {
        let cli = Cli::parse_from(["chainship"]);
        assert_eq!(cli.apply(DeployConfig::default()), DeployConfig::default());
        assert!(!cli.dump_config);
    }
}
