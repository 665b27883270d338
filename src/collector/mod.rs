mod config;
mod core;
mod cycle;
mod periodic;

// Re-export public items
pub use self::config::{CollectorConfig, CollectorConfigBuilder, DEFAULT_INTERVAL};
pub use self::core::{PLUGIN_NAME, Sample, SampleValue, Snapshot};
pub use self::cycle::{CycleReport, CycleState, InstanceCollector};
pub use self::periodic::PeriodicRunner;
