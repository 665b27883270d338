use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

use crate::config::LogLevel;
use crate::error::{AgentError, Result};

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Initialize the logging system.
///
/// `RUST_LOG` still overrides the configured level for individual modules.
pub fn init(level: LogLevel) -> Result<()> {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter(None, level.into())
        .parse_default_env()
        .try_init()
        .map_err(|e| AgentError::Other(format!("Failed to initialise logging: {}", e)))
}
