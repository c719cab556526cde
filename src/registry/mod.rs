//! Process-wide catalog of monitor plugins.
//!
//! Plugins are registered once, typically during startup, and never removed. The orchestrator
//! reads the catalog back through [`PluginRegistry::all_monitors`] and registers every monitor
//! with its manager.
//!
//! Production code goes through [`global()`] and the free functions of this module; tests
//! build a private [`PluginRegistry`] so they never observe each other's plugins.
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::monitor::Monitor;

mod crd;
mod error;
mod plugin;
mod validate;

pub use crd::{CrdVersion, CustomResourceDefinition, Scope};
pub use error::{Error, Result};
pub use plugin::{CrdProvider, MonitorPlugin, Plugin};
pub use validate::{validate_condition, validate_monitor, validate_plugin};

#[derive(Default)]
pub struct PluginRegistry {
    plugins: DashMap<String, Arc<dyn MonitorPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin under its name.
    ///
    /// # Errors
    ///
    /// Fails on an empty name or if a plugin with the same name is already registered, in
    /// which case the existing entry is kept.
    pub fn register(&self, plugin: Arc<dyn MonitorPlugin>) -> Result<()> {
        let name = plugin.name();
        if name.is_empty() {
            return Err(Error::EmptyPluginName);
        }
        match self.plugins.entry(name.to_owned()) {
            Entry::Occupied(entry) => Err(Error::DuplicatePlugin(entry.key().clone())),
            Entry::Vacant(entry) => {
                log::debug!("registered plugin `{}`", entry.key());
                entry.insert(plugin);
                Ok(())
            }
        }
    }

    /// Validates the plugin and registers it only if it passed.
    pub fn validate_and_register(&self, plugin: Arc<dyn MonitorPlugin>) -> Result<()> {
        validate_plugin(plugin.as_ref()).map_err(|err| Error::Validation(Box::new(err)))?;
        self.register(plugin)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn MonitorPlugin>> {
        self.plugins.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of all registered plugins, in no particular order.
    pub fn list(&self) -> Vec<Arc<dyn MonitorPlugin>> {
        self.plugins
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Monitors of every registered plugin, concatenated. Callers must not rely on the order.
    pub fn all_monitors(&self) -> Vec<Arc<dyn Monitor>> {
        self.plugins
            .iter()
            .flat_map(|entry| entry.value().monitors())
            .collect()
    }

    /// CRDs of every plugin that provides them.
    pub fn all_crds(&self) -> Vec<CustomResourceDefinition> {
        self.plugins
            .iter()
            .filter_map(|entry| entry.value().crd_provider().map(|provider| provider.crds()))
            .flatten()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

static GLOBAL: LazyLock<PluginRegistry> = LazyLock::new(PluginRegistry::new);

/// The registry shared by the whole process.
pub fn global() -> &'static PluginRegistry {
    &GLOBAL
}

pub fn register(plugin: Arc<dyn MonitorPlugin>) -> Result<()> {
    global().register(plugin)
}

pub fn validate_and_register(plugin: Arc<dyn MonitorPlugin>) -> Result<()> {
    global().validate_and_register(plugin)
}

/// Registers a plugin in the global registry.
///
/// # Panics
///
/// Panics if the plugin cannot be registered. Meant for startup wiring, where a conflict is a
/// programming error.
pub fn must_register(plugin: Arc<dyn MonitorPlugin>) {
    if let Err(err) = register(plugin) {
        panic!("failed to register plugin: {err}");
    }
}
