//! Static mapping from Varnish statistics to emitted metric identities
//!
//! Every field the agent knows about is listed once in [`STAT_FIELDS`]. The
//! table is walked by the collector on each cycle; which Varnish releases
//! expose a field is recorded as data in its [`VariantMask`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AgentError;

/// Version family of the monitored Varnish process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Varnish 2.x (`VSL_stats`)
    V2,
    /// Varnish 3.x (`VSC_C_main`)
    V3,
}

impl Default for Variant {
    fn default() -> Self {
        Variant::V3
    }
}

impl Variant {
    fn bit(self) -> u8 {
        match self {
            Variant::V2 => 0b01,
            Variant::V3 => 0b10,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::V2 => f.write_str("v2"),
            Variant::V3 => f.write_str("v3"),
        }
    }
}

impl FromStr for Variant {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v2" | "2" => Ok(Variant::V2),
            "v3" | "3" => Ok(Variant::V3),
            other => Err(AgentError::Config(format!("Unknown varnish variant: {}", other))),
        }
    }
}

/// Set of variants exposing a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantMask(u8);

impl VariantMask {
    pub const V2: VariantMask = VariantMask(0b01);
    pub const V3: VariantMask = VariantMask(0b10);
    pub const ALL: VariantMask = VariantMask(0b11);

    /// Check whether `variant` is part of this mask
    pub fn contains(self, variant: Variant) -> bool {
        self.0 & variant.bit() != 0
    }
}

/// A group of related stat fields that is enabled or disabled as a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Cache,
    Connections,
    Esi,
    Backend,
    Fetch,
    Hcb,
    Shm,
    Sm,
    Sma,
    Sms,
    Totals,
    Workers,
}

impl Category {
    /// All categories in table order
    pub const ALL: [Category; 12] = [
        Category::Cache,
        Category::Connections,
        Category::Esi,
        Category::Backend,
        Category::Fetch,
        Category::Hcb,
        Category::Shm,
        Category::Sm,
        Category::Sma,
        Category::Sms,
        Category::Totals,
        Category::Workers,
    ];

    /// Name used in the plugin instance (`<instance>-<name>`)
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Cache => "cache",
            Category::Connections => "connections",
            Category::Esi => "esi",
            Category::Backend => "backend",
            Category::Fetch => "fetch",
            Category::Hcb => "hcb",
            Category::Shm => "shm",
            Category::Sm => "sm",
            Category::Sma => "sma",
            Category::Sms => "sms",
            Category::Totals => "totals",
            Category::Workers => "workers",
        }
    }

    /// Configuration option toggling this category
    pub fn option_key(self) -> &'static str {
        match self {
            Category::Cache => "CollectCache",
            Category::Connections => "CollectConnections",
            Category::Esi => "CollectESI",
            Category::Backend => "CollectBackend",
            Category::Fetch => "CollectFetch",
            Category::Hcb => "CollectHCB",
            Category::Shm => "CollectSHM",
            Category::Sm => "CollectSM",
            Category::Sma => "CollectSMA",
            Category::Sms => "CollectSMS",
            Category::Totals => "CollectTotals",
            Category::Workers => "CollectWorkers",
        }
    }

    /// Variants on which the category can be configured
    pub fn variants(self) -> VariantMask {
        match self {
            Category::Sm | Category::Sma => VariantMask::V2,
            _ => VariantMask::ALL,
        }
    }

    /// Resolve a `Collect*` option key (case-insensitive) for `variant`
    pub fn from_option_key(key: &str, variant: Variant) -> Option<Category> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.option_key().eq_ignore_ascii_case(key) && c.variants().contains(variant))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric semantic of an emitted value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonically non-decreasing, emitted as a derive value
    Counter,
    /// Instantaneous value
    Gauge,
}

/// One raw statistic and the metric identity it is emitted under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatField {
    pub source_key: &'static str,
    pub category: Category,
    pub kind: MetricKind,
    pub emitted_type: &'static str,
    pub emitted_type_instance: &'static str,
    pub variants: VariantMask,
}

const fn field(
    category: Category,
    source_key: &'static str,
    kind: MetricKind,
    emitted_type: &'static str,
    emitted_type_instance: &'static str,
    variants: VariantMask,
) -> StatField {
    StatField {
        source_key,
        category,
        kind,
        emitted_type,
        emitted_type_instance,
        variants,
    }
}

use Category as C;
use MetricKind::{Counter, Gauge};
use VariantMask as M;

/// Every statistic the agent knows how to emit
pub static STAT_FIELDS: &[StatField] = &[
    field(C::Cache, "cache_hit", Counter, "cache_result", "hit", M::ALL),
    field(C::Cache, "cache_miss", Counter, "cache_result", "miss", M::ALL),
    field(C::Cache, "cache_hitpass", Counter, "cache_result", "hitpass", M::ALL),
    field(C::Connections, "client_conn", Counter, "connections", "accepted", M::ALL),
    field(C::Connections, "client_drop", Counter, "connections", "dropped", M::ALL),
    field(C::Connections, "client_req", Counter, "connections", "received", M::ALL),
    field(C::Esi, "esi_parse", Counter, "total_operations", "parsed", M::V2),
    field(C::Esi, "esi_errors", Counter, "total_operations", "error", M::ALL),
    field(C::Backend, "backend_conn", Counter, "connections", "success", M::ALL),
    field(C::Backend, "backend_unhealthy", Counter, "connections", "not-attempted", M::ALL),
    field(C::Backend, "backend_busy", Counter, "connections", "too-many", M::ALL),
    field(C::Backend, "backend_fail", Counter, "connections", "failures", M::ALL),
    field(C::Backend, "backend_reuse", Counter, "connections", "reuses", M::ALL),
    field(C::Backend, "backend_toolate", Counter, "connections", "was-closed", M::ALL),
    field(C::Backend, "backend_recycle", Counter, "connections", "recycled", M::ALL),
    field(C::Backend, "backend_unused", Counter, "connections", "unused", M::V2),
    field(C::Fetch, "fetch_head", Counter, "http_requests", "head", M::ALL),
    field(C::Fetch, "fetch_length", Counter, "http_requests", "length", M::ALL),
    field(C::Fetch, "fetch_chunked", Counter, "http_requests", "chunked", M::ALL),
    field(C::Fetch, "fetch_eof", Counter, "http_requests", "eof", M::ALL),
    field(C::Fetch, "fetch_bad", Counter, "http_requests", "bad_headers", M::ALL),
    field(C::Fetch, "fetch_close", Counter, "http_requests", "close", M::ALL),
    field(C::Fetch, "fetch_oldhttp", Counter, "http_requests", "oldhttp", M::ALL),
    field(C::Fetch, "fetch_zero", Counter, "http_requests", "zero", M::ALL),
    field(C::Fetch, "fetch_failed", Counter, "http_requests", "failed", M::ALL),
    field(C::Hcb, "hcb_nolock", Counter, "cache_operation", "lookup_nolock", M::ALL),
    field(C::Hcb, "hcb_lock", Counter, "cache_operation", "lookup_lock", M::ALL),
    field(C::Hcb, "hcb_insert", Counter, "cache_operation", "insert", M::ALL),
    field(C::Shm, "shm_records", Counter, "total_operations", "records", M::ALL),
    field(C::Shm, "shm_writes", Counter, "total_operations", "writes", M::ALL),
    field(C::Shm, "shm_flushes", Counter, "total_operations", "flushes", M::ALL),
    field(C::Shm, "shm_cont", Counter, "total_operations", "contention", M::ALL),
    field(C::Shm, "shm_cycles", Counter, "total_operations", "cycles", M::ALL),
    field(C::Sm, "sm_nreq", Counter, "total_requests", "nreq", M::V2),
    field(C::Sm, "sm_nobj", Gauge, "requests", "outstanding", M::V2),
    field(C::Sm, "sm_balloc", Counter, "total_bytes", "allocated", M::V2),
    field(C::Sm, "sm_bfree", Counter, "total_bytes", "free", M::V2),
    field(C::Sma, "sma_nreq", Counter, "total_requests", "nreq", M::V2),
    field(C::Sma, "sma_nobj", Gauge, "requests", "outstanding", M::V2),
    field(C::Sma, "sma_nbytes", Gauge, "bytes", "outstanding", M::V2),
    field(C::Sma, "sma_balloc", Counter, "total_bytes", "allocated", M::V2),
    field(C::Sma, "sma_bfree", Counter, "total_bytes", "free", M::V2),
    field(C::Sms, "sms_nreq", Counter, "total_requests", "allocator", M::ALL),
    field(C::Sms, "sms_nobj", Gauge, "requests", "outstanding", M::ALL),
    field(C::Sms, "sms_nbytes", Gauge, "bytes", "outstanding", M::ALL),
    field(C::Sms, "sms_balloc", Counter, "total_bytes", "allocated", M::ALL),
    field(C::Sms, "sms_bfree", Counter, "total_bytes", "free", M::ALL),
    field(C::Totals, "s_sess", Counter, "total_sessions", "sessions", M::ALL),
    field(C::Totals, "s_req", Counter, "total_requests", "requests", M::ALL),
    field(C::Totals, "s_pipe", Counter, "total_operations", "pipe", M::ALL),
    field(C::Totals, "s_pass", Counter, "total_operations", "pass", M::ALL),
    field(C::Totals, "s_fetch", Counter, "total_operations", "fetches", M::ALL),
    field(C::Totals, "s_hdrbytes", Counter, "total_bytes", "header-bytes", M::ALL),
    field(C::Totals, "s_bodybytes", Counter, "total_bytes", "body-bytes", M::ALL),
    field(C::Workers, "n_wrk", Gauge, "threads", "worker", M::ALL),
    field(C::Workers, "n_wrk_create", Counter, "total_threads", "created", M::ALL),
    field(C::Workers, "n_wrk_failed", Counter, "total_threads", "failed", M::ALL),
    field(C::Workers, "n_wrk_max", Counter, "total_threads", "limited", M::ALL),
    field(C::Workers, "n_wrk_queue", Counter, "total_requests", "queued", M::V2),
    field(C::Workers, "n_wrk_overflow", Counter, "total_requests", "overflowed", M::V2),
    field(C::Workers, "n_wrk_drop", Counter, "total_requests", "dropped", M::ALL),
];

/// Fields exposed by `variant`, in table order
pub fn lookup_fields(variant: Variant) -> impl Iterator<Item = &'static StatField> {
    STAT_FIELDS.iter().filter(move |f| f.variants.contains(variant))
}

/// Fields of one category exposed by `variant`
pub fn fields_for(
    category: Category,
    variant: Variant,
) -> impl Iterator<Item = &'static StatField> {
    lookup_fields(variant).filter(move |f| f.category == category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_source_keys_are_unique() {
        let keys: HashSet<_> = STAT_FIELDS.iter().map(|f| f.source_key).collect();
        assert_eq!(keys.len(), STAT_FIELDS.len());
    }

    #[test]
    fn test_lookup_is_deterministic() {
        let first: Vec<_> = lookup_fields(Variant::V3).map(|f| f.source_key).collect();
        let second: Vec<_> = lookup_fields(Variant::V3).map(|f| f.source_key).collect();
        assert_eq!(first, second);
        assert_eq!(first[0], "cache_hit");
    }

    #[test]
    fn test_v2_only_fields_are_hidden_from_v3() {
        let v3: HashSet<_> = lookup_fields(Variant::V3).map(|f| f.source_key).collect();
        let v2_only = [
            "esi_parse",
            "backend_unused",
            "sm_nreq",
            "sma_bfree",
            "n_wrk_queue",
            "n_wrk_overflow",
        ];
        for key in v2_only {
            assert!(!v3.contains(key), "{} should not be exposed by v3", key);
        }
        assert_eq!(lookup_fields(Variant::V2).count(), STAT_FIELDS.len());
        assert_eq!(fields_for(Category::Sm, Variant::V3).count(), 0);
    }

    #[test]
    fn test_gauges() {
        let gauges: Vec<_> = STAT_FIELDS
            .iter()
            .filter(|f| f.kind == MetricKind::Gauge)
            .map(|f| f.source_key)
            .collect();
        assert_eq!(
            gauges,
            vec!["sm_nobj", "sma_nobj", "sma_nbytes", "sms_nobj", "sms_nbytes", "n_wrk"]
        );
    }

    #[test]
    fn test_option_keys() {
        assert_eq!(Category::from_option_key("collectesi", Variant::V3), Some(Category::Esi));
        assert_eq!(Category::from_option_key("CollectSM", Variant::V2), Some(Category::Sm));
        assert_eq!(Category::from_option_key("CollectSM", Variant::V3), None);
        assert_eq!(Category::from_option_key("CollectFoo", Variant::V2), None);
    }

    #[test]
    fn test_variant_parsing() {
        assert_eq!("V2".parse::<Variant>().unwrap(), Variant::V2);
        assert_eq!("3".parse::<Variant>().unwrap(), Variant::V3);
        assert!("v4".parse::<Variant>().is_err());
    }
}
