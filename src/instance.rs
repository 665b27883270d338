use log::debug;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::ConfigItem;
use crate::error::{AgentError, Result};
use crate::stats::{Category, Variant};

/// Registry key and display name of the unnamed local instance
pub const LOCALHOST: &str = "localhost";

/// Plugin instance prefix used for the unnamed local instance
pub const DEFAULT_PREFIX: &str = "default";

/// Categories collected when nothing else is configured
pub const DEFAULT_CATEGORIES: [Category; 4] = [
    Category::Backend,
    Category::Cache,
    Category::Connections,
    Category::Shm,
];

/// Per-instance collection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceConfig {
    name: Option<String>,
    enabled: BTreeSet<Category>,
}

impl InstanceConfig {
    /// The unnamed local instance with the baseline categories
    pub fn new_default() -> Self {
        Self {
            name: None,
            enabled: DEFAULT_CATEGORIES.into_iter().collect(),
        }
    }

    /// A named instance with the baseline categories.
    ///
    /// `localhost` and `default` both refer to the unnamed local instance.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut config = Self::new_default();
        if name != LOCALHOST && name != DEFAULT_PREFIX {
            config.name = Some(name);
        }
        config
    }

    /// Explicit instance name, `None` for the local default instance
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Key the instance is registered under
    pub fn registry_key(&self) -> &str {
        self.name.as_deref().unwrap_or(LOCALHOST)
    }

    /// Plugin instance for samples of `category`
    pub fn plugin_instance(&self, category: Category) -> String {
        format!(
            "{}-{}",
            self.name.as_deref().unwrap_or(DEFAULT_PREFIX),
            category.as_str()
        )
    }

    /// Enable or disable a category
    pub fn set(&mut self, category: Category, enabled: bool) {
        if enabled {
            self.enabled.insert(category);
        } else {
            self.enabled.remove(&category);
        }
    }

    /// Apply a `Collect*` configuration option.
    ///
    /// The key is resolved before the value is read, so an unknown option is
    /// reported as unknown whatever its value. Options the `variant` does not
    /// support are rejected like unknown ones and leave the configuration
    /// untouched, as does a value that is not a single boolean.
    pub fn apply_option(&mut self, variant: Variant, option: &ConfigItem) -> Result<()> {
        let category = Category::from_option_key(&option.key, variant).ok_or_else(|| {
            AgentError::Config(format!(
                "Ignoring unknown configuration option: \"{}\"",
                option.key
            ))
        })?;
        let enabled = option.get_boolean()?;
        debug!("{}: {} = {}", self.registry_key(), category.option_key(), enabled);
        self.set(category, enabled);
        Ok(())
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        self.enabled.contains(&category)
    }

    /// Enabled categories in table order
    pub fn enabled_categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.enabled.iter().copied()
    }

    /// Reject configurations that would never emit anything
    pub fn validate(&self) -> Result<()> {
        if self.enabled.is_empty() {
            return Err(AgentError::EmptyConfiguration {
                instance: self.registry_key().to_string(),
            });
        }
        Ok(())
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self::new_default()
    }
}
