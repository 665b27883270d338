use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;

use crate::collector::Sample;
use crate::error::{AgentError, Result};
use crate::sink::MetricSink;

/// Collects samples in memory.
///
/// Plugin instances listed with [`MemorySink::reject`] fail to emit, which
/// lets tests exercise per-sample failures.
pub struct MemorySink {
    samples: RwLock<Vec<Sample>>,
    rejected: RwLock<HashSet<String>>,
    name: String,
}

impl MemorySink {
    /// Create a new memory sink
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            samples: RwLock::new(Vec::new()),
            rejected: RwLock::new(HashSet::new()),
            name: name.into(),
        }
    }

    /// Fail every emit for `plugin_instance`
    pub fn reject(&self, plugin_instance: impl Into<String>) -> Result<()> {
        let mut rejected = self
            .rejected
            .write()
            .map_err(|_| AgentError::Other("Lock poisoned".to_string()))?;
        rejected.insert(plugin_instance.into());
        Ok(())
    }

    /// All samples received so far
    pub fn samples(&self) -> Result<Vec<Sample>> {
        let samples = self
            .samples
            .read()
            .map_err(|_| AgentError::Other("Lock poisoned".to_string()))?;
        Ok(samples.clone())
    }

    /// Samples whose plugin instance starts with `prefix`
    pub fn samples_for(&self, prefix: &str) -> Result<Vec<Sample>> {
        Ok(self
            .samples()?
            .into_iter()
            .filter(|s| s.plugin_instance.starts_with(prefix))
            .collect())
    }

    /// Clear all samples
    pub fn clear(&self) -> Result<()> {
        let mut samples = self
            .samples
            .write()
            .map_err(|_| AgentError::Other("Lock poisoned".to_string()))?;
        samples.clear();
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self
            .samples
            .read()
            .map_err(|_| AgentError::Other("Lock poisoned".to_string()))?
            .len())
    }
}

#[async_trait]
impl MetricSink for MemorySink {
    async fn emit(&self, sample: &Sample) -> Result<()> {
        let rejected = self
            .rejected
            .read()
            .map_err(|_| AgentError::Other("Lock poisoned".to_string()))?
            .contains(&sample.plugin_instance);
        if rejected {
            return Err(AgentError::SampleEmit(format!(
                "{} rejected by {}",
                sample.identifier(),
                self.name
            )));
        }

        let mut samples = self
            .samples
            .write()
            .map_err(|_| AgentError::Other("Lock poisoned".to_string()))?;
        samples.push(sample.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
