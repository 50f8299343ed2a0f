//! Logging initialization.

use std::io;

use thiserror::Error;
use tracing::*;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    fmt::layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use super::types::{LogFile, LogFormat, LoggerConfig};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("creating log file appender: {0}")]
    FileAppender(String),

    #[error("global subscriber already set: {0}")]
    AlreadyInitialized(String),
}

/// Default INFO, overridable through `RUST_LOG`.
fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy()
}

fn file_appender(file: &LogFile) -> Result<RollingFileAppender, LoggingError> {
    RollingFileAppender::builder()
        .rotation(file.rotation.clone())
        .filename_prefix(&file.prefix)
        .build(&file.directory)
        .map_err(|e| LoggingError::FileAppender(e.to_string()))
}

/// Installs the global subscriber: a console layer plus an optional rotated file layer.
///
/// Console output goes to stderr so that command output on stdout stays machine-readable.
pub fn init(config: LoggerConfig) -> Result<(), LoggingError> {
    let filt = env_filter();

    let console = match config.console_format {
        LogFormat::Json => layer()
            .json()
            .with_writer(io::stderr)
            .with_span_events(config.span_events.clone())
            .with_filter(filt.clone())
            .boxed(),
        LogFormat::Compact => layer()
            .compact()
            .with_writer(io::stderr)
            .with_span_events(config.span_events.clone())
            .with_filter(filt.clone())
            .boxed(),
    };

    let file_layer = config
        .file
        .as_ref()
        .map(|file| {
            let appender = file_appender(file)?;
            let layer = if file.format == LogFormat::Json {
                layer()
                    .json()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_filter(filt.clone())
                    .boxed()
            } else {
                layer()
                    .compact()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_filter(filt.clone())
                    .boxed()
            };
            Ok::<_, LoggingError>(layer)
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    info!(
        program = %config.program,
        log_file = ?config.file.as_ref().map(|f| &f.directory),
        "logging initialized"
    );
    Ok(())
}
