use async_trait::async_trait;

use crate::collector::Sample;
use crate::error::Result;

/// JSON-lines output
pub mod json;
/// In-memory sink for testing
pub mod memory;

pub use json::JsonLinesSink;
pub use memory::MemorySink;

/// Destination for emitted samples
#[async_trait]
pub trait MetricSink: Send + Sync + 'static {
    /// Emit a single sample
    async fn emit(&self, sample: &Sample) -> Result<()>;

    /// Get a name for this sink
    fn name(&self) -> &str;
}
