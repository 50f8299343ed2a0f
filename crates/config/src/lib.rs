mod config;
pub mod defaults;

pub use config::{Config, ConfigError, FeesConfig, LoggingConfig, StoreConfig};
