//! One read cycle for one instance
use chrono::Utc;
use log::{debug, trace, warn};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::core::{Sample, Snapshot};
use crate::error::{AgentError, Result};
use crate::instance::InstanceConfig;
use crate::sink::MetricSink;
use crate::source::SnapshotSource;
use crate::stats::lookup_fields;

/// Progress of a single read cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Fetching,
    Shaping,
    Done,
    Failed,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleState::Idle => "idle",
            CycleState::Fetching => "fetching",
            CycleState::Shaping => "shaping",
            CycleState::Done => "done",
            CycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Registry key of the instance
    pub instance: String,
    /// Samples accepted by the sink
    pub emitted: usize,
    /// Table fields missing from the snapshot
    pub skipped: usize,
    /// Samples the sink refused
    pub failed: usize,
}

/// Collects one instance: fetch a snapshot, shape it, emit it
pub struct InstanceCollector {
    config: Arc<InstanceConfig>,
    host: String,
    source: Arc<dyn SnapshotSource>,
    sink: Arc<dyn MetricSink>,
    cycle_lock: Mutex<()>,
}

impl InstanceCollector {
    pub fn new(
        config: Arc<InstanceConfig>,
        host: impl Into<String>,
        source: Arc<dyn SnapshotSource>,
        sink: Arc<dyn MetricSink>,
    ) -> Self {
        Self {
            config,
            host: host.into(),
            source,
            sink,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        self.config.registry_key()
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    /// Run one full cycle.
    ///
    /// A failed fetch emits nothing and returns [`AgentError::SnapshotFetch`].
    /// Sink failures are logged and counted; they never abort the cycle.
    /// Concurrent calls on the same collector run one after the other.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let _guard = self.cycle_lock.lock().await;
        let name = self.name();
        let mut state = CycleState::Idle;

        self.transition(&mut state, CycleState::Fetching);
        let snapshot = match self.source.fetch_snapshot(self.config.name()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.transition(&mut state, CycleState::Failed);
                debug!("Unable to load statistics for {}: {}", name, e);
                if matches!(e, AgentError::SnapshotFetch { .. }) {
                    return Err(e);
                }
                return Err(AgentError::snapshot_fetch(name, e));
            }
        };

        self.transition(&mut state, CycleState::Shaping);
        let (samples, skipped) = self.shape(&snapshot);

        let mut emitted = 0;
        let mut failed = 0;
        for sample in &samples {
            match self.sink.emit(sample).await {
                Ok(()) => emitted += 1,
                Err(e) => {
                    failed += 1;
                    warn!(
                        "Failed to emit {} to {}: {}",
                        sample.identifier(),
                        self.sink.name(),
                        e
                    );
                }
            }
        }

        self.transition(&mut state, CycleState::Done);
        debug!(
            "Cycle for {} {}: {} emitted, {} skipped, {} failed",
            name, state, emitted, skipped, failed
        );

        Ok(CycleReport {
            instance: name.to_string(),
            emitted,
            skipped,
            failed,
        })
    }

    /// Build samples for every enabled field present in `snapshot`.
    ///
    /// Returns the samples and the number of expected fields the snapshot
    /// did not contain.
    pub fn shape(&self, snapshot: &Snapshot) -> (Vec<Sample>, usize) {
        let time = Utc::now();
        let mut samples = Vec::new();
        let mut skipped = 0;

        let enabled = lookup_fields(snapshot.variant)
            .filter(|f| self.config.is_enabled(f.category));
        for field in enabled {
            match snapshot.get(field.source_key) {
                Some(raw) => samples.push(Sample::from_field(
                    &self.host,
                    self.config.plugin_instance(field.category),
                    field,
                    raw,
                    time,
                )),
                None => {
                    trace!("{}: field {} not in snapshot", self.name(), field.source_key);
                    skipped += 1;
                }
            }
        }

        (samples, skipped)
    }

    fn transition(&self, state: &mut CycleState, next: CycleState) {
        trace!("{}: {} -> {}", self.name(), state, next);
        *state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::SampleValue;
    use crate::sink::MemorySink;
    use crate::source::StaticSource;
    use crate::stats::{Category, STAT_FIELDS, Variant};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn cache_only(name: Option<&str>) -> Arc<InstanceConfig> {
        let mut config = match name {
            Some(name) => InstanceConfig::named(name),
            None => InstanceConfig::new_default(),
        };
        for category in Category::ALL {
            config.set(category, category == Category::Cache);
        }
        Arc::new(config)
    }

    fn full_snapshot(variant: Variant) -> Snapshot {
        let pairs = STAT_FIELDS.iter().enumerate().map(|(i, f)| (f.source_key, i as u64));
        Snapshot::from_pairs(variant, pairs)
    }

    fn collector(
        config: Arc<InstanceConfig>,
        source: Arc<StaticSource>,
        sink: Arc<MemorySink>,
    ) -> InstanceCollector {
        InstanceCollector::new(config, "host1", source, sink)
    }

    #[tokio::test]
    async fn test_cache_only_end_to_end() {
        let snapshot = Snapshot::from_pairs(
            Variant::V3,
            [("cache_hit", 10), ("cache_miss", 2), ("cache_hitpass", 1), ("backend_conn", 5)],
        );
        let source = Arc::new(StaticSource::new(snapshot));
        let sink = Arc::new(MemorySink::new("test"));
        let collector = collector(cache_only(None), source, Arc::clone(&sink));

        let report = collector.run_cycle().await.unwrap();
        assert_eq!(report.emitted, 3);

        let samples = sink.samples().unwrap();
        let got: Vec<_> = samples
            .iter()
            .map(|s| {
                (
                    s.plugin_instance.as_str(),
                    s.type_.as_str(),
                    s.type_instance.as_str(),
                    s.value,
                )
            })
            .collect();
        assert_eq!(
            got,
            vec![
                ("default-cache", "cache_result", "hit", SampleValue::Derive(10)),
                ("default-cache", "cache_result", "miss", SampleValue::Derive(2)),
                ("default-cache", "cache_result", "hitpass", SampleValue::Derive(1)),
            ]
        );
        assert!(samples.iter().all(|s| s.host == "host1" && s.plugin == "varnish"));
    }

    #[tokio::test]
    async fn test_disabled_categories_emit_nothing() {
        for disabled in Category::ALL {
            let mut config = InstanceConfig::named("a");
            for category in Category::ALL {
                config.set(category, category != disabled);
            }
            let source = Arc::new(StaticSource::new(full_snapshot(Variant::V2)));
            let sink = Arc::new(MemorySink::new("test"));
            collector(Arc::new(config), source, Arc::clone(&sink)).run_cycle().await.unwrap();

            let suffix = format!("-{}", disabled);
            let samples = sink.samples().unwrap();
            assert!(!samples.is_empty());
            assert!(samples.iter().all(|s| !s.plugin_instance.ends_with(&suffix)));
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_is_all_or_nothing() {
        let source = Arc::new(StaticSource::new(full_snapshot(Variant::V3)));
        source.push_failure("shared memory not found");
        let sink = Arc::new(MemorySink::new("test"));
        let collector = collector(cache_only(Some("a")), Arc::clone(&source), Arc::clone(&sink));

        let err = collector.run_cycle().await.unwrap_err();
        assert!(matches!(err, AgentError::SnapshotFetch { ref instance, .. } if instance == "a"));
        assert_eq!(sink.len().unwrap(), 0);

        let report = collector.run_cycle().await.unwrap();
        assert_eq!(report.emitted, 3);
        assert_eq!(sink.samples_for("a-cache").unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_fields_are_skipped() {
        let snapshot = Snapshot::from_pairs(Variant::V3, [("cache_hit", 7)]);
        let source = Arc::new(StaticSource::new(snapshot));
        let sink = Arc::new(MemorySink::new("test"));
        let report = collector(cache_only(None), source, Arc::clone(&sink))
            .run_cycle()
            .await
            .unwrap();
        assert_eq!(report.emitted, 1);
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn test_variant_mask_filters_fields() {
        let mut config = InstanceConfig::new_default();
        config.set(Category::Workers, true);
        let config = Arc::new(config);

        let sink = Arc::new(MemorySink::new("test"));
        let source = Arc::new(StaticSource::new(full_snapshot(Variant::V3)));
        collector(Arc::clone(&config), source, Arc::clone(&sink)).run_cycle().await.unwrap();
        let v3: Vec<_> = sink.samples().unwrap().into_iter().map(|s| s.type_instance).collect();
        assert!(!v3.contains(&"queued".to_string()));
        assert!(!v3.contains(&"unused".to_string()));

        sink.clear().unwrap();
        let source = Arc::new(StaticSource::new(full_snapshot(Variant::V2)));
        collector(config, source, Arc::clone(&sink)).run_cycle().await.unwrap();
        let v2: Vec<_> = sink.samples().unwrap().into_iter().map(|s| s.type_instance).collect();
        assert!(v2.contains(&"queued".to_string()));
        assert!(v2.contains(&"unused".to_string()));
    }

    #[tokio::test]
    async fn test_emit_failure_does_not_abort_cycle() {
        let mut config = InstanceConfig::new_default();
        config.set(Category::Backend, false);
        config.set(Category::Shm, false);
        let source = Arc::new(StaticSource::new(full_snapshot(Variant::V3)));
        let sink = Arc::new(MemorySink::new("test"));
        sink.reject("default-cache").unwrap();

        let report = collector(Arc::new(config), source, Arc::clone(&sink))
            .run_cycle()
            .await
            .unwrap();
        assert_eq!(report.failed, 3);
        assert_eq!(report.emitted, 3);
        assert_eq!(sink.samples_for("default-connections").unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_gauges_are_emitted_as_gauges() {
        let mut config = InstanceConfig::new_default();
        config.set(Category::Workers, true);
        let snapshot = Snapshot::from_pairs(Variant::V3, [("n_wrk", 12)]);
        let source = Arc::new(StaticSource::new(snapshot));
        let sink = Arc::new(MemorySink::new("test"));
        collector(Arc::new(config), source, Arc::clone(&sink)).run_cycle().await.unwrap();

        let samples = sink.samples_for("default-workers").unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].type_, "threads");
        assert_eq!(samples[0].value, SampleValue::Gauge(12.0));
    }

    #[tokio::test]
    async fn test_localhost_matches_unnamed() {
        let snapshot = full_snapshot(Variant::V3);
        let mut results = Vec::new();
        for config in [InstanceConfig::named("localhost"), InstanceConfig::new_default()] {
            let source = Arc::new(StaticSource::new(snapshot.clone()));
            let sink = Arc::new(MemorySink::new("test"));
            collector(Arc::new(config), source, Arc::clone(&sink)).run_cycle().await.unwrap();
            let shaped: Vec<_> = sink
                .samples()
                .unwrap()
                .into_iter()
                .map(|s| (s.plugin_instance, s.type_, s.type_instance, s.value))
                .collect();
            results.push(shaped);
        }
        assert_eq!(results[0], results[1]);
    }

    /// Source that takes a while to answer and records overlapping fetches
    #[derive(Default)]
    struct SlowSource {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotSource for SlowSource {
        async fn fetch_snapshot(&self, _instance: Option<&str>) -> Result<Snapshot> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Snapshot::from_pairs(Variant::V3, [("cache_hit", 1)]))
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_overlapping_cycles_run_one_after_the_other() {
        let source = Arc::new(SlowSource::default());
        let sink = Arc::new(MemorySink::new("test"));
        let collector = InstanceCollector::new(
            cache_only(Some("a")),
            "host1",
            Arc::clone(&source) as Arc<dyn SnapshotSource>,
            Arc::clone(&sink) as Arc<dyn MetricSink>,
        );

        let (first, second) = tokio::join!(collector.run_cycle(), collector.run_cycle());
        assert_eq!(first.unwrap().emitted, 1);
        assert_eq!(second.unwrap().emitted, 1);

        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(sink.len().unwrap(), 2);
    }
}
