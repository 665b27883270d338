use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::instance::InstanceConfig;

/// Registry of the instances to collect from.
///
/// Populated once during startup and shared read-only afterwards.
#[derive(Debug, Default)]
pub struct ConfigRegistry {
    instances: Vec<Arc<InstanceConfig>>,
    name_index: HashMap<String, usize>,
    have_explicit: bool,
}

impl ConfigRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the implicit local instance.
    ///
    /// Does nothing once an explicit instance has been registered, or when the
    /// local instance already exists. Returns whether an instance was added.
    pub fn register_default(&mut self) -> bool {
        if self.have_explicit {
            debug!("Explicit instances configured, skipping default instance");
            return false;
        }

        let config = InstanceConfig::new_default();
        if self.name_index.contains_key(config.registry_key()) {
            return false;
        }

        info!("Registering default instance \"{}\"", config.registry_key());
        self.insert(config);
        true
    }

    /// Register an explicitly configured instance
    pub fn register_instance(&mut self, config: InstanceConfig) -> Result<Arc<InstanceConfig>> {
        config.validate()?;

        let key = config.registry_key();
        if self.name_index.contains_key(key) {
            return Err(AgentError::DuplicateInstance(key.to_string()));
        }

        info!("Registering instance \"{}\"", key);
        let config = self.insert(config);
        self.have_explicit = true;
        Ok(config)
    }

    fn insert(&mut self, config: InstanceConfig) -> Arc<InstanceConfig> {
        let config = Arc::new(config);
        self.name_index
            .insert(config.registry_key().to_string(), self.instances.len());
        self.instances.push(Arc::clone(&config));
        config
    }

    /// Registered instances in registration order
    pub fn each(&self) -> impl Iterator<Item = (&str, &Arc<InstanceConfig>)> + '_ {
        self.instances.iter().map(|c| (c.registry_key(), c))
    }

    /// Get an instance by its registry key
    pub fn get(&self, name: &str) -> Option<&Arc<InstanceConfig>> {
        self.name_index.get(name).map(|&i| &self.instances[i])
    }

    /// Whether an explicit instance has ever been registered
    pub fn has_explicit_instance(&self) -> bool {
        self.have_explicit
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Category;

    #[test]
    fn test_default_only_when_nothing_configured() {
        let mut registry = ConfigRegistry::new();
        assert!(registry.register_default());
        assert!(!registry.register_default());
        assert_eq!(registry.len(), 1);
        assert!(registry.get("localhost").is_some());
        assert!(!registry.has_explicit_instance());
    }

    #[test]
    fn test_default_suppressed_after_explicit() {
        let mut registry = ConfigRegistry::new();
        registry.register_instance(InstanceConfig::named("a")).unwrap();
        assert!(!registry.register_default());

        let names: Vec<_> = registry.each().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn test_duplicate_first_wins() {
        let mut registry = ConfigRegistry::new();
        registry.register_instance(InstanceConfig::named("a")).unwrap();

        let mut second = InstanceConfig::named("a");
        second.set(Category::Workers, true);
        let err = registry.register_instance(second).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateInstance(ref name) if name == "a"));

        assert!(!registry.get("a").unwrap().is_enabled(Category::Workers));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_localhost_duplicates_default_name() {
        let mut registry = ConfigRegistry::new();
        registry.register_instance(InstanceConfig::new_default()).unwrap();
        assert!(matches!(
            registry.register_instance(InstanceConfig::named("localhost")),
            Err(AgentError::DuplicateInstance(_))
        ));
    }

    #[test]
    fn test_empty_instance_is_never_registered() {
        let mut registry = ConfigRegistry::new();
        let mut config = InstanceConfig::named("empty");
        for category in Category::ALL {
            config.set(category, false);
        }
        assert!(matches!(
            registry.register_instance(config),
            Err(AgentError::EmptyConfiguration { .. })
        ));
        assert!(registry.is_empty());
        assert!(!registry.has_explicit_instance());
        assert!(registry.register_default());
    }

    #[test]
    fn test_each_is_restartable_and_ordered() {
        let mut registry = ConfigRegistry::new();
        for name in ["c", "a", "b"] {
            registry.register_instance(InstanceConfig::named(name)).unwrap();
        }
        let first: Vec<_> = registry.each().map(|(n, _)| n.to_string()).collect();
        let second: Vec<_> = registry.each().map(|(n, _)| n.to_string()).collect();
        assert_eq!(first, vec!["c", "a", "b"]);
        assert_eq!(first, second);
    }
}
