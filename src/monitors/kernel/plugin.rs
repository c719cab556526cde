use std::sync::Arc;

use super::KernelMonitor;
use crate::config::Rootfs;
use crate::registry::Plugin;

pub const PLUGIN_NAME: &str = "kernel-monitor";

/// The kernel monitor packaged for the registry.
pub fn plugin(rootfs: Rootfs) -> Plugin {
    Plugin::new(PLUGIN_NAME, vec![Arc::new(KernelMonitor::new(rootfs))])
}
