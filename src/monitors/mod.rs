//! Built-in monitors.
use std::sync::{Arc, Once};

use crate::config::Rootfs;
use crate::registry;

pub mod kernel;

static BUILTIN: Once = Once::new();

/// Registers every built-in plugin in the global registry.
///
/// Runs once per process; later calls are no-ops, whatever `rootfs` they pass.
///
/// # Panics
///
/// Panics if a built-in plugin name is already taken.
pub fn register_builtin_plugins(rootfs: &Rootfs) {
    BUILTIN.call_once(|| {
        registry::must_register(Arc::new(kernel::plugin(rootfs.clone())));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registration_is_idempotent() {
        register_builtin_plugins(&Rootfs::default());
        register_builtin_plugins(&Rootfs::new("/rootfs"));

        let plugin = registry::global().get(kernel::PLUGIN_NAME).unwrap();
        assert_eq!(plugin.monitors()[0].name(), "kernel");
        assert!(
            registry::global()
                .all_monitors()
                .iter()
                .any(|m| m.name() == "kernel")
        );
    }
}
