//! Generic configuration tree
//!
//! A block such as
//!
//! ```text
//! <Plugin varnish>
//!   <Instance "frontend">
//!     CollectFetch true
//!   </Instance>
//! </Plugin>
//! ```
//!
//! is a [`ConfigItem`] with key `Plugin`, one positional value and a child
//! `Instance` item, which in turn has a `CollectFetch` child holding a single
//! boolean value.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AgentError, Result};

/// A positional value of a configuration item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Boolean(b) => write!(f, "{}", b),
            ConfigValue::Number(n) => write!(f, "{}", n),
            ConfigValue::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// One node of the configuration tree
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    #[serde(default)]
    pub values: Vec<ConfigValue>,
    #[serde(default)]
    pub children: Vec<ConfigItem>,
}

impl ConfigItem {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Append a positional value
    pub fn value(mut self, value: ConfigValue) -> Self {
        self.values.push(value);
        self
    }

    /// Append a child item
    pub fn child(mut self, child: ConfigItem) -> Self {
        self.children.push(child);
        self
    }

    /// Case-insensitive key comparison
    pub fn is(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }

    /// The single string value of this item
    pub fn get_string(&self) -> Result<&str> {
        match self.values.as_slice() {
            [ConfigValue::String(s)] => Ok(s.as_str()),
            _ => Err(AgentError::Config(format!(
                "The \"{}\" option requires exactly one string argument",
                self.key
            ))),
        }
    }

    /// The single boolean value of this item.
    ///
    /// The strings `true`/`false`, `yes`/`no` and `on`/`off` are accepted as
    /// well.
    pub fn get_boolean(&self) -> Result<bool> {
        let err = || {
            AgentError::Config(format!(
                "The \"{}\" option requires exactly one boolean argument",
                self.key
            ))
        };

        match self.values.as_slice() {
            [ConfigValue::Boolean(b)] => Ok(*b),
            [ConfigValue::String(s)] => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Ok(true),
                "false" | "no" | "off" => Ok(false),
                _ => Err(err()),
            },
            _ => Err(err()),
        }
    }
}

/// Shorthand for a string value
impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Boolean(b)
    }
}
