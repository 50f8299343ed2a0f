//! Logging setup shared by the binaries.

mod manager;
mod types;


pub use manager::{init, LoggingError};
pub use tracing_appender::rolling::Rotation;
pub use types::{LogFile, LogFormat, LoggerConfig};
