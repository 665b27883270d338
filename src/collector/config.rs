use std::time::Duration;

/// Default interval between read cycles
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration shared by every instance collector
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Host name put on every sample
    pub host: String,
    /// Interval between read cycles
    pub interval: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Builder for collector configuration
pub struct CollectorConfigBuilder {
    config: CollectorConfig,
}

impl CollectorConfigBuilder {
    /// Create a new collector config builder
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: CollectorConfig {
                host: host.into(),
                ..Default::default()
            },
        }
    }

    /// Set the collection interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CollectorConfig {
        self.config
    }
}
