use std::fmt;
use std::path::Path;

use super::Result;
use super::checks::{
    contains_proc_mount, has_container_indicators, is_pid_namespace_isolated,
    matches_container_cgroup,
};

/// Available runtime environments for the agent.
#[derive(Debug, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    /// Running directly on the host.
    Host,
    /// Running inside a container, e.g. as a DaemonSet pod.
    Container,
}

/// What gave the container away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerEvidence {
    /// The init process under the mounted rootfs lives in another PID namespace.
    PidNamespace,
    /// `/proc/self/cgroup` names a container runtime.
    Cgroup,
    /// Marker files such as `/.dockerenv` or runtime variables are present.
    Marker,
}

impl fmt::Display for ContainerEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ContainerEvidence::PidNamespace => "isolated PID namespace",
            ContainerEvidence::Cgroup => "container cgroup",
            ContainerEvidence::Marker => "container marker",
        };
        f.write_str(text)
    }
}

/// Detects whether the current system is running in a container or on the host.
///
/// Checks, in order: whether the init PID namespace under `rootfs` differs from ours, whether
/// our cgroup names a container runtime, and whether container marker files or variables are
/// present. Failing checks are logged as warnings and skipped.
pub fn detect_runtime_environment(rootfs: impl AsRef<Path>) -> RuntimeEnvironment {
    match container_evidence(rootfs.as_ref()) {
        Some(evidence) => {
            log::info!("running in a container ({evidence})");
            RuntimeEnvironment::Container
        }
        None => RuntimeEnvironment::Host,
    }
}

/// Returns the first check that identifies a container.
pub fn container_evidence(rootfs: &Path) -> Option<ContainerEvidence> {
    let pid_namespace = || -> Result<bool> {
        Ok(contains_proc_mount(rootfs)? && is_pid_namespace_isolated(rootfs)?)
    };
    let checks: [(ContainerEvidence, &dyn Fn() -> Result<bool>); 3] = [
        (ContainerEvidence::PidNamespace, &pid_namespace),
        (ContainerEvidence::Cgroup, &matches_container_cgroup),
        (ContainerEvidence::Marker, &|| Ok(has_container_indicators())),
    ];

    checks
        .into_iter()
        .find_map(|(evidence, check)| match check() {
            Ok(found) => found.then_some(evidence),
            Err(err) => {
                log::warn!("{evidence} check failed during runtime detection: {err}");
                None
            }
        })
}
