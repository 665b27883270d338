//! Core collector types
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::stats::{MetricKind, StatField, Variant};

/// Plugin name every sample is emitted under
pub const PLUGIN_NAME: &str = "varnish";

/// One point-in-time read of a Varnish instance's counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Stat layout the fields follow
    pub variant: Variant,
    /// Raw field values keyed by stat name
    pub fields: HashMap<String, u64>,
}

impl Snapshot {
    pub fn new(variant: Variant, fields: HashMap<String, u64>) -> Self {
        Self { variant, fields }
    }

    /// Build a snapshot from `(name, value)` pairs
    pub fn from_pairs<I, K>(variant: Variant, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        Self {
            variant,
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.fields.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Value of an emitted sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SampleValue {
    /// Cumulative counter, rates are derived downstream
    Derive(i64),
    /// Instantaneous reading
    Gauge(f64),
}

impl SampleValue {
    /// Convert a raw statistic according to its kind
    pub fn from_raw(kind: MetricKind, raw: u64) -> Self {
        match kind {
            MetricKind::Counter => SampleValue::Derive(i64::try_from(raw).unwrap_or(i64::MAX)),
            MetricKind::Gauge => SampleValue::Gauge(raw as f64),
        }
    }
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleValue::Derive(v) => write!(f, "{}", v),
            SampleValue::Gauge(v) => write!(f, "{}", v),
        }
    }
}

/// A single emitted metric with its full identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub host: String,
    pub plugin: String,
    pub plugin_instance: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub type_instance: String,
    pub value: SampleValue,
    pub time: DateTime<Utc>,
}

impl Sample {
    /// Shape a stat field into a sample
    pub fn from_field(
        host: &str,
        plugin_instance: String,
        field: &StatField,
        raw: u64,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            host: host.to_string(),
            plugin: PLUGIN_NAME.to_string(),
            plugin_instance,
            type_: field.emitted_type.to_string(),
            type_instance: field.emitted_type_instance.to_string(),
            value: SampleValue::from_raw(field.kind, raw),
            time,
        }
    }

    /// Identifier in `host/plugin-instance/type-instance` form
    pub fn identifier(&self) -> String {
        let mut id = format!(
            "{}/{}-{}/{}",
            self.host, self.plugin, self.plugin_instance, self.type_
        );
        if !self.type_instance.is_empty() {
            id.push('-');
            id.push_str(&self.type_instance);
        }
        id
    }

    /// Convert the sample to a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
