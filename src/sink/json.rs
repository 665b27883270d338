use async_trait::async_trait;
use std::io::{self, Write};
use std::sync::Mutex;

use crate::collector::Sample;
use crate::error::{AgentError, Result};
use crate::sink::MetricSink;

/// Writes every sample as one JSON object per line
pub struct JsonLinesSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesSink {
    /// Write samples to standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }
}

#[async_trait]
impl MetricSink for JsonLinesSink {
    async fn emit(&self, sample: &Sample) -> Result<()> {
        let line =
            serde_json::to_string(sample).map_err(|e| AgentError::SampleEmit(e.to_string()))?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| AgentError::Other("Lock poisoned".to_string()))?;
        writeln!(writer, "{}", line)
            .and_then(|_| writer.flush())
            .map_err(|e| AgentError::SampleEmit(e.to_string()))
    }

    fn name(&self) -> &str {
        "json"
    }
}
