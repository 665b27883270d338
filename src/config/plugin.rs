use log::warn;

use super::tree::ConfigItem;
use crate::error::{AgentError, Result};
use crate::instance::InstanceConfig;
use crate::registry::ConfigRegistry;
use crate::stats::Variant;

/// Build the instance registry from the plugin's configuration block.
///
/// Problems with a single option or instance are logged and skipped; the
/// remaining instances are still registered. When no instance could be
/// registered the local default instance is added.
pub fn configure(block: &ConfigItem, variant: Variant) -> ConfigRegistry {
    let mut registry = ConfigRegistry::new();

    for child in &block.children {
        if child.is("Instance") {
            match configure_instance(&mut registry, child, variant) {
                Err(e @ AgentError::EmptyConfiguration { .. }) => {
                    warn!("Varnish plugin: {}. Disabling this instance.", e)
                }
                Err(e) => warn!("Varnish plugin: {}", e),
                Ok(()) => {}
            }
        } else {
            warn!("Varnish plugin: Ignoring unknown configuration option: \"{}\"", child.key);
        }
    }

    registry.register_default();
    registry
}

/// Parse one `Instance` block and register it
pub fn configure_instance(
    registry: &mut ConfigRegistry,
    item: &ConfigItem,
    variant: Variant,
) -> Result<()> {
    let mut config = match item.values.len() {
        0 => InstanceConfig::new_default(),
        1 => InstanceConfig::named(item.get_string()?),
        _ => {
            return Err(AgentError::Config(
                "\"Instance\" blocks accept only one argument".to_string(),
            ));
        }
    };

    for child in &item.children {
        if let Err(e) = config.apply_option(variant, child) {
            warn!("Varnish plugin: {}", e);
        }
    }

    registry.register_instance(config)?;
    Ok(())
}
