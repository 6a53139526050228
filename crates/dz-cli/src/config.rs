use std::path::{Path, PathBuf};

use anyhow::Context;
use dz_filter::FilterConfig;
use dz_profile::EngineConfig;
use dz_types::Network;
use serde::Deserialize;

use crate::cli::Cli;

pub const DEFAULT_CONFIG_FILE: &str = "dz.toml";
pub const DEFAULT_LEDGER_FILE: &str = "dz-ledger.json";

/// Settings read from `dz.toml`, then overridden by command-line flags.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub network: Network,
    pub ledger_path: PathBuf,
    pub engine: EngineConfig,
    pub filter: FilterConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            ledger_path: PathBuf::from(DEFAULT_LEDGER_FILE),
            engine: EngineConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl CliConfig {
    /// Read `path`, or `./dz.toml` if it exists, or fall back to defaults.
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = Self::load(cli.config.as_deref())?;
        if let Some(network) = cli.network {
            config.network = network;
        }
        if let Some(path) = &cli.ledger {
            config.ledger_path = path.clone();
        }
        Ok(config)
    }
}
