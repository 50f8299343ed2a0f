use std::{fs, path::Path};

use anyhow::Context;
use serde::de::DeserializeOwned;
use stakeline_common::logging::{self, LogFile, LogFormat, LoggerConfig};
use stakeline_config::{defaults::DEFAULT_LOG_FILE_PREFIX, Config};
use stakeline_primitives::Delegation;

/// Loaded configuration shared by the commands.
pub(crate) struct CliContext {
    pub(crate) config: Config,
}

impl CliContext {
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let config = Config::load(path)?;
        Ok(Self { config })
    }

    pub(crate) fn init_logging(&self) -> anyhow::Result<()> {
        let logging = &self.config.logging;
        let format = LogFormat::from_json_flag(logging.json);

        let mut logger = LoggerConfig::new("stakeline-cli").with_console_format(format);
        if let Some(directory) = &logging.file_directory {
            let prefix = logging.file_prefix.as_deref().unwrap_or(DEFAULT_LOG_FILE_PREFIX);
            let file = LogFile::daily(directory.clone(), prefix).with_format(format);
            logger = logger.with_file(file);
        }
        logging::init(logger)?;
        Ok(())
    }
}

/// Reads a JSON document from `path`.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

pub(crate) fn read_delegations(path: &Path) -> anyhow::Result<Vec<Delegation>> {
    read_json(path)
}
