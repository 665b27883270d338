//! Providers of raw Varnish statistics

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::collector::Snapshot;
use crate::error::{AgentError, Result};

#[cfg(feature = "varnishstat")]
mod varnishstat;

#[cfg(feature = "varnishstat")]
pub use varnishstat::{parse_varnishstat, VarnishstatConfig, VarnishstatSource};

/// Trait for sources that provide statistics snapshots
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    /// Read one snapshot for `instance` (`None` for the local default instance)
    async fn fetch_snapshot(&self, instance: Option<&str>) -> Result<Snapshot>;

    /// Get the source name
    fn name(&self) -> &str;
}

/// A source serving fixed snapshots, used for tests and dry runs.
///
/// Queued results are served first, in order; once the queue is empty every
/// fetch returns the fallback snapshot.
pub struct StaticSource {
    fallback: Snapshot,
    queued: Mutex<VecDeque<std::result::Result<Snapshot, String>>>,
}

impl StaticSource {
    /// Create a source that always returns `snapshot`
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            fallback: snapshot,
            queued: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue a snapshot for the next fetch
    pub fn push_snapshot(&self, snapshot: Snapshot) {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(Ok(snapshot));
        }
    }

    /// Queue a failure for the next fetch
    pub fn push_failure(&self, reason: impl Into<String>) {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(Err(reason.into()));
        }
    }
}

#[async_trait::async_trait]
impl SnapshotSource for StaticSource {
    async fn fetch_snapshot(&self, instance: Option<&str>) -> Result<Snapshot> {
        let next = self
            .queued
            .lock()
            .map_err(|_| AgentError::Other("Lock poisoned".to_string()))?
            .pop_front();

        match next {
            Some(Ok(snapshot)) => Ok(snapshot),
            Some(Err(reason)) => Err(AgentError::snapshot_fetch(
                instance.unwrap_or(crate::instance::LOCALHOST),
                reason,
            )),
            None => Ok(self.fallback.clone()),
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}
