//! A metric-collecting agent for Varnish cache statistics

pub mod collector;
pub mod config;
pub mod error;
pub mod instance;
pub mod process;
pub mod registry;
pub mod sink;
pub mod source;
pub mod stats;
pub mod util;

/// Re-export of commonly used types for convenience
pub mod prelude {
    pub use crate::collector::{
        CollectorConfig, InstanceCollector, PeriodicRunner, Sample, SampleValue, Snapshot,
    };
    pub use crate::config::{configure, AgentConfig, ConfigItem, ConfigValue};
    pub use crate::error::{AgentError, Result};
    pub use crate::instance::InstanceConfig;
    pub use crate::registry::ConfigRegistry;
    pub use crate::sink::{JsonLinesSink, MemorySink, MetricSink};
    pub use crate::source::{SnapshotSource, StaticSource};
    pub use crate::stats::{Category, MetricKind, StatField, Variant};
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
