//! Deployment configuration, layered from defaults, a TOML file and the environment.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::{
    executor::ConfirmationPolicy,
    network::LOCAL_CHAIN_ID,
    record::DEFAULT_RECORDS_DIR,
    report::{DEFAULT_EXPLORER_TOOL, Reporter},
};

/// The default name for the configuration file.
pub const CONFIG_FILENAME: &str = "Chainship.toml";

/// Prefix of the environment variables overriding configuration keys.
pub const ENV_PREFIX: &str = "CHAINSHIP_";

/// Configuration of a deployment run.
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// JSON-RPC endpoint of the target network.
    #[serde(deserialize_with = "deserialize_text")]
    pub rpc_url: String,
    /// Network name used in records and explorer commands. Derived from the chain id when unset.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_opt_text"
    )]
    pub network_name: Option<String>,
    /// Path to the compiled contract artifact.
    pub artifact: PathBuf,
    /// Title shown in the deployment summary.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_opt_text"
    )]
    pub display_name: Option<String>,
    /// Directory receiving deployment records.
    pub records_dir: PathBuf,
    /// Maximum time to wait for the creation transaction to be mined.
    pub confirmation_timeout_secs: u64,
    /// Interval between receipt polls.
    pub poll_interval_ms: u64,
    /// Timeout of a single RPC request.
    pub rpc_timeout_secs: u64,
    /// Chain id of the local development network (no explorer verification).
    pub local_chain_id: u64,
    /// Command prefix of the explorer verification tool.
    #[serde(deserialize_with = "deserialize_text")]
    pub explorer_tool: String,
}

/// A scalar read where text is expected.
///
/// Environment values are typed by figment, so `CHAINSHIP_NETWORK_NAME=8453`
/// arrives as a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Text {
    String(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
}

impl From<Text> for String {
    fn from(text: Text) -> Self {
        match text {
            Text::String(s) => s,
            Text::Unsigned(n) => n.to_string(),
            Text::Signed(n) => n.to_string(),
            Text::Float(n) => n.to_string(),
            Text::Bool(b) => b.to_string(),
        }
    }
}

fn deserialize_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Text::deserialize(deserializer).map(String::from)
}

fn deserialize_opt_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Text>::deserialize(deserializer).map(|text| text.map(String::from))
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            network_name: None,
            artifact: PathBuf::from("artifacts/contracts/Project.sol/Project.json"),
            display_name: None,
            records_dir: PathBuf::from(DEFAULT_RECORDS_DIR),
            confirmation_timeout_secs: 120,
            poll_interval_ms: 1000,
            rpc_timeout_secs: 30,
            local_chain_id: LOCAL_CHAIN_ID,
            explorer_tool: DEFAULT_EXPLORER_TOOL.to_string(),
        }
    }
}

impl DeployConfig {
    /// Layer defaults, the TOML file at `path` (when it exists) and `CHAINSHIP_*`
    /// environment variables, in that order.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(DeployConfig::default()));

        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));
        figment = figment.merge(Toml::file(file));

        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load the layered configuration.
    ///
    /// Not validated: command-line overrides still apply on top, so callers
    /// run [`DeployConfig::validate`] on the final value.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
        }

        Self::figment(path)
            .extract()
            .context("Failed to load deployment configuration")
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize deploy config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Load the configuration from a TOML file, without environment overrides.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).context("Failed to parse config file as TOML")?;
        tracing::info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Check values that would otherwise only fail mid-run.
    pub fn validate(&self) -> Result<()> {
        self.rpc_url()?;
        if self.confirmation_timeout_secs == 0 {
            anyhow::bail!("confirmation_timeout_secs must be greater than zero");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than zero");
        }
        if self.explorer_tool.trim().is_empty() {
            anyhow::bail!("explorer_tool must not be empty");
        }
        Ok(())
    }

    pub fn rpc_url(&self) -> Result<Url> {
        Url::parse(&self.rpc_url).context(format!("Invalid RPC URL: {}", self.rpc_url))
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn confirmation(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            timeout: Duration::from_secs(self.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn reporter(&self) -> Reporter {
        Reporter {
            local_chain_id: self.local_chain_id,
            explorer_tool: self.explorer_tool.clone(),
            display_name: self.display_name.clone(),
        }
    }
}
