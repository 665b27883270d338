use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::config::CollectorConfig;
use super::cycle::{CycleReport, InstanceCollector};
use crate::error::{AgentError, Result};
use crate::registry::ConfigRegistry;
use crate::sink::MetricSink;
use crate::source::SnapshotSource;

/// Schedules read cycles for every registered instance.
///
/// Each instance gets its own task, so a slow or failing instance never
/// delays the others.
pub struct PeriodicRunner {
    config: CollectorConfig,
    collectors: Vec<Arc<InstanceCollector>>,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl PeriodicRunner {
    /// Build one collector per registry entry
    pub fn new(
        config: CollectorConfig,
        registry: &ConfigRegistry,
        source: Arc<dyn SnapshotSource>,
        sink: Arc<dyn MetricSink>,
    ) -> Self {
        let collectors = registry
            .each()
            .map(|(_, instance)| {
                Arc::new(InstanceCollector::new(
                    Arc::clone(instance),
                    config.host.clone(),
                    Arc::clone(&source),
                    Arc::clone(&sink),
                ))
            })
            .collect();

        Self {
            config,
            collectors,
            shutdown: watch::channel(false).0,
            handles: Vec::new(),
        }
    }

    pub fn collectors(&self) -> &[Arc<InstanceCollector>] {
        &self.collectors
    }

    /// Run one cycle for every instance concurrently
    pub async fn run_once(&self) -> Vec<Result<CycleReport>> {
        let tasks: Vec<_> = self
            .collectors
            .iter()
            .map(|collector| {
                let collector = Arc::clone(collector);
                tokio::spawn(async move { collector.run_cycle().await })
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            results.push(
                task.await.unwrap_or_else(|e| {
                    Err(AgentError::Other(format!("Cycle task failed: {}", e)))
                }),
            );
        }
        results
    }

    /// Start periodic collection, one task per instance
    pub fn start(&mut self) {
        self.shutdown.send_replace(false);

        for collector in &self.collectors {
            let collector = Arc::clone(collector);
            let mut shutdown = self.shutdown.subscribe();
            let interval = self.config.interval;

            info!("Starting collection for {} every {:?}", collector.name(), interval);
            self.handles.push(tokio::spawn(async move {
                let mut interval_timer = time::interval(interval);
                interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        biased;
                        _ = shutdown.wait_for(|stopped| *stopped) => break,
                        _ = interval_timer.tick() => {}
                    }

                    // The next tick retries independently
                    if let Err(e) = collector.run_cycle().await {
                        error!("Collection cycle for {} failed: {}", collector.name(), e);
                    }
                }
                debug!("Collection for {} stopped", collector.name());
            }));
        }
    }

    /// Stop scheduling new cycles.
    ///
    /// Tasks waiting for their next tick exit immediately; a cycle already
    /// running is allowed to finish.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    /// Wait for all collection tasks to exit
    pub async fn wait(&mut self) {
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!("Collection task failed: {}", e);
            }
        }
    }
}
