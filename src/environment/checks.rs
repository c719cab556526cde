use super::{Error, Result};
use std::path::Path;
use std::{env, fs};

/// Markers in `/proc/self/cgroup` left behind by common container runtimes.
const RUNTIME_MARKERS: [&str; 4] = ["kubepods", "containerd", "docker", "libpod"];

/// Returns true if the given rootfs path contains a mounted `/proc`.
///
/// # Errors
///
/// Returns [`Error::ExistenceCheck`] if checking the existence of the `/proc` directory fails.
pub fn contains_proc_mount(rootfs: impl AsRef<Path>) -> Result<bool> {
    let path = rootfs.as_ref().join("proc");

    path.try_exists()
        .map_err(|source| Error::ExistenceCheck { path, source })
}

/// Returns true if the PID namespace of the rootfs init process differs from ours.
///
/// # Errors
///
/// Returns [`Error::ReadSymlink`] if either namespace link cannot be read.
pub fn is_pid_namespace_isolated(rootfs: impl AsRef<Path>) -> Result<bool> {
    let read_ns = |path: &Path| {
        fs::read_link(path).map_err(|source| Error::ReadSymlink {
            path: path.to_path_buf(),
            source,
        })
    };

    let own = read_ns(Path::new("/proc/self/ns/pid"))?;
    let init = read_ns(&rootfs.as_ref().join("proc/1/ns/pid"))?;

    Ok(own != init)
}

/// Returns true if our cgroup membership points at a container runtime.
///
/// # Errors
///
/// Returns [`Error::FileRead`] if `/proc/self/cgroup` cannot be read.
pub fn matches_container_cgroup() -> Result<bool> {
    let path = Path::new("/proc/self/cgroup");
    let content = fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cgroup_mentions_runtime(&content))
}

/// Returns true if any cgroup path names a runtime or looks like a container ID.
pub fn cgroup_mentions_runtime(content: &str) -> bool {
    content.lines().any(|line| {
        RUNTIME_MARKERS.iter().any(|marker| line.contains(marker))
            || line
                .split(['/', ':', '-', '.'])
                .any(|part| part.len() >= 32 && part.chars().all(|c| c.is_ascii_hexdigit()))
    })
}

/// Returns true if marker files or variables of a container environment are present.
pub fn has_container_indicators() -> bool {
    fs::metadata("/.dockerenv").is_ok()
        || fs::metadata("/run/.containerenv").is_ok()
        || env::var_os("container").is_some()
        || env::var_os("KUBERNETES_SERVICE_HOST").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cgroup_runtime_markers() {
        assert!(cgroup_mentions_runtime(
            "0::/kubepods.slice/kubepods-burstable.slice/cri-containerd-abc.scope\n"
        ));
        assert!(cgroup_mentions_runtime(
            "0::/system.slice/docker-0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef.scope"
        ));
        assert!(!cgroup_mentions_runtime("0::/init.scope\n"));
        assert!(!cgroup_mentions_runtime("0::/user.slice/user-1000.slice/session-2.scope"));
    }

    #[test]
    fn test_contains_proc_mount() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!contains_proc_mount(dir.path()).unwrap());
        fs::create_dir(dir.path().join("proc")).unwrap();
        assert!(contains_proc_mount(dir.path()).unwrap());
    }
}
