use std::{
    fs, io,
    path::{Path, PathBuf},
};

use bitcoin::{Amount, Network};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::defaults;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeesConfig {
    /// Fee of withdrawal transactions. Unbonding fees come from the protocol parameters.
    #[serde(default = "defaults::withdrawal_fee_sat")]
    pub withdrawal_fee_sat: u64,
}

impl FeesConfig {
    pub fn withdrawal_fee(&self) -> Amount {
        Amount::from_sat(self.withdrawal_fee_sat)
    }
}

impl Default for FeesConfig {
    fn default() -> Self {
        Self {
            withdrawal_fee_sat: defaults::withdrawal_fee_sat(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one JSON file of intermediate records per staker.
    #[serde(default = "defaults::store_directory")]
    pub directory: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: defaults::store_directory(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Use JSON format for stdout logs instead of compact format.
    #[serde(default)]
    pub json: bool,

    /// Directory for daily-rotated log files. File logging is off when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_directory: Option<PathBuf>,

    /// Prefix for log file names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::network")]
    pub network: Network,

    #[serde(default)]
    pub fees: FeesConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: defaults::network(),
            fees: FeesConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}
