//! Ordered plugin registry.

use crate::command::{CommandPlugin, Identify, IsRsDevices, ListDevices};

/// Ordered collection of registered command plugins.
///
/// Lookup is a linear scan in registration order and the first matching
/// plugin wins. The tie-break is part of the contract: when two plugins
/// could match the same line, whichever was registered first handles it,
/// deterministically.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn CommandPlugin>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the commands shipped in this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(IsRsDevices));
        registry.register(Box::new(Identify));
        registry.register(Box::new(ListDevices));
        registry
    }

    /// Append a plugin. Registration order is preserved.
    pub fn register(&mut self, plugin: Box<dyn CommandPlugin>) {
        self.plugins.push(plugin);
    }

    /// First registered plugin whose predicate matches `raw_command`.
    pub fn find(&self, raw_command: &[u8]) -> Option<&dyn CommandPlugin> {
        self.plugins
            .iter()
            .find(|plugin| plugin.is_match(raw_command))
            .map(|plugin| plugin.as_ref())
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugins are registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
