use std::sync::Arc;

use super::CustomResourceDefinition;
use crate::monitor::Monitor;

/// A named set of monitors contributed to the registry.
pub trait MonitorPlugin: Send + Sync {
    /// Unique identifier of the plugin.
    fn name(&self) -> &str;

    fn monitors(&self) -> Vec<Arc<dyn Monitor>>;

    /// Optional capability: custom resources the plugin needs installed.
    fn crd_provider(&self) -> Option<&dyn CrdProvider> {
        None
    }
}

pub trait CrdProvider {
    fn crds(&self) -> Vec<CustomResourceDefinition>;
}

/// Plain [`MonitorPlugin`] holding a fixed list of monitors and, optionally, CRDs.
pub struct Plugin {
    name: String,
    monitors: Vec<Arc<dyn Monitor>>,
    crds: Option<Vec<CustomResourceDefinition>>,
}

impl Plugin {
    pub fn new(name: impl Into<String>, monitors: Vec<Arc<dyn Monitor>>) -> Self {
        Self {
            name: name.into(),
            monitors,
            crds: None,
        }
    }

    pub fn with_crds(
        name: impl Into<String>,
        monitors: Vec<Arc<dyn Monitor>>,
        crds: Vec<CustomResourceDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            monitors,
            crds: Some(crds),
        }
    }
}

impl MonitorPlugin for Plugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn monitors(&self) -> Vec<Arc<dyn Monitor>> {
        self.monitors.clone()
    }

    fn crd_provider(&self) -> Option<&dyn CrdProvider> {
        self.crds.as_ref().map(|_| self as &dyn CrdProvider)
    }
}

impl CrdProvider for Plugin {
    fn crds(&self) -> Vec<CustomResourceDefinition> {
        self.crds.clone().unwrap_or_default()
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let monitors: Vec<&str> = self.monitors.iter().map(|m| m.name()).collect();
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("monitors", &monitors)
            .field("crds", &self.crds)
            .finish()
    }
}
