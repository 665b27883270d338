use config::{self, File, FileFormat};
use log::{debug, error};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::collector::{CollectorConfig, CollectorConfigBuilder};
use crate::error::{AgentError, Result};
use crate::stats::Variant;

mod plugin;
mod tree;

pub use plugin::{configure, configure_instance};
pub use tree::{ConfigItem, ConfigValue};

#[cfg(feature = "varnishstat")]
pub use crate::source::VarnishstatConfig;

/// Agent configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    /// Host name put on samples, the system host name when unset
    #[serde(default)]
    pub hostname: Option<String>,
    /// Collection interval in seconds
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Stat layout of the monitored Varnish
    #[serde(default)]
    pub variant: Variant,
    /// Logging level
    #[serde(default)]
    pub log_level: LogLevel,
    /// Settings for reading statistics through `varnishstat`
    #[cfg(feature = "varnishstat")]
    #[serde(default)]
    pub varnishstat: VarnishstatConfig,
    /// The plugin block with its `Instance` children
    #[serde(default = "default_plugin_block")]
    pub plugin: ConfigItem,
}

/// Default collection interval
fn default_interval() -> u64 {
    10
}

fn default_plugin_block() -> ConfigItem {
    ConfigItem::new("Plugin")
}

impl AgentConfig {
    /// Host name to report, falling back to the system host name
    pub fn resolve_hostname(&self) -> String {
        match &self.hostname {
            Some(host) => host.clone(),
            None => hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|e| {
                    error!("Unable to determine host name: {}", e);
                    "localhost".to_string()
                }),
        }
    }

    /// Settings shared by all instance collectors
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfigBuilder::new(self.resolve_hostname())
            .interval(Duration::from_secs(self.interval.max(1)))
            .build()
    }
}

/// Logging level
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level
    Info,
    /// Debug level
    Debug,
    /// Trace level
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(AgentError::Config(format!("Unknown log level: {}", other))),
        }
    }
}

/// Load agent configuration from a file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AgentConfig> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());

    // Check if the file exists
    if !path.exists() {
        error!("Configuration file {} does not exist", path.display());
        return Err(AgentError::Config(format!("Configuration file not found: {}", path.display())));
    }

    // Get the file extension
    let extension = match path.extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => {
            error!("Configuration file has no extension");
            return Err(AgentError::Config(format!(
                "Configuration file has no extension: {}",
                path.display()
            )));
        }
    };

    let format = match extension.as_str() {
        "toml" => FileFormat::Toml,
        "json" => FileFormat::Json,
        "yaml" | "yml" => FileFormat::Yaml,
        format => {
            error!("Unsupported configuration format: {}", format);
            return Err(AgentError::Config(format!("Unsupported config format: {}", format)));
        }
    };

    let config = config::Config::builder()
        .add_source(File::from(path).format(format))
        .build()
        .map_err(|e| AgentError::Config(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| AgentError::Config(e.to_string()))
}

/// Load agent configuration from a TOML string
pub fn load_config_str(toml: &str) -> Result<AgentConfig> {
    config::Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()
        .map_err(|e| AgentError::Config(format!("Failed to build configuration: {}", e)))?
        .try_deserialize()
        .map_err(|e| AgentError::Config(format!("Failed to deserialize configuration: {}", e)))
}
