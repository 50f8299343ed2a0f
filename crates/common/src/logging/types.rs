//! Logger settings, assembled by the binaries from their own config files.

use std::path::PathBuf;

use tracing_appender::rolling::Rotation;
use tracing_subscriber::fmt::format::FmtSpan;

/// Line format of a log sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Compact
        }
    }
}

/// Rotated log file sink.
#[derive(Debug, Clone)]
pub struct LogFile {
    /// Created if missing.
    pub directory: PathBuf,

    /// Rotated files are named `<prefix>.<date>`.
    pub prefix: String,

    pub rotation: Rotation,
    pub format: LogFormat,
}

impl LogFile {
    /// Daily rotated, compact lines.
    pub fn daily(directory: PathBuf, prefix: impl Into<String>) -> Self {
        Self {
            directory,
            prefix: prefix.into(),
            rotation: Rotation::DAILY,
            format: LogFormat::Compact,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Reported in the startup line.
    pub program: String,

    pub console_format: LogFormat,

    /// Span events written to the console, none by default.
    pub span_events: FmtSpan,

    pub file: Option<LogFile>,
}

impl LoggerConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            console_format: LogFormat::Compact,
            span_events: FmtSpan::NONE,
            file: None,
        }
    }

    pub fn with_console_format(mut self, format: LogFormat) -> Self {
        self.console_format = format;
        self
    }

    pub fn with_span_events(mut self, span_events: FmtSpan) -> Self {
        self.span_events = span_events;
        self
    }

    pub fn with_file(mut self, file: LogFile) -> Self {
        self.file = Some(file);
        self
    }
}
