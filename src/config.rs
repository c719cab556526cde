//! Runtime configuration read from the process environment.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::environment::{self, RuntimeEnvironment};

/// Explicit host root filesystem; skips runtime environment detection when set.
pub const HOST_ROOT_ENV: &str = "HOST_ROOT";
/// Where the host root is mounted when running inside a container.
pub const ROOTFS_MOUNT_PATH_ENV: &str = "ROOTFS_MOUNT_PATH";
/// Bind address of the status API.
pub const LISTEN_ADDR_ENV: &str = "NODE_MONITOR_LISTEN_ADDR";

const DEFAULT_ROOTFS_MOUNT_PATH: &str = "/rootfs";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "detected container runtime environment, but missing host root mount at `{}`",
        .0.display()
    )]
    MissingHostRoot(PathBuf),
    #[error("invalid listen address `{value}`: {source}")]
    ListenAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Root of the host filesystem as seen by the agent.
///
/// Absolute host paths such as `/proc/sys/fs/file-nr` are resolved beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rootfs(PathBuf);

impl Rootfs {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Resolves an absolute host path beneath the root.
    pub fn join(&self, host_path: impl AsRef<Path>) -> PathBuf {
        let host_path = host_path.as_ref();
        self.0
            .join(host_path.strip_prefix("/").unwrap_or(host_path))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl Default for Rootfs {
    fn default() -> Self {
        Self::new("/")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rootfs: Rootfs,
    pub listen_addr: SocketAddr,
}

impl Config {
    /// Builds the configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingHostRoot`] if the agent runs in a container without the host
    /// root mounted, and [`Error::ListenAddr`] for an unparsable listen address.
    pub fn from_env() -> Result<Self> {
        let rootfs = match std::env::var_os(HOST_ROOT_ENV) {
            Some(root) => Rootfs::new(root),
            None => detect_rootfs()?,
        };
        log::debug!("Final rootfs: {}", rootfs.as_path().display());

        let value =
            std::env::var(LISTEN_ADDR_ENV).unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_owned());
        let listen_addr = value
            .parse()
            .map_err(|source| Error::ListenAddr { value, source })?;

        Ok(Self {
            rootfs,
            listen_addr,
        })
    }
}

fn detect_rootfs() -> Result<Rootfs> {
    let mount = std::env::var_os(ROOTFS_MOUNT_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOTFS_MOUNT_PATH));
    match environment::detect_runtime_environment(&mount) {
        RuntimeEnvironment::Container if !mount.exists() => Err(Error::MissingHostRoot(mount)),
        RuntimeEnvironment::Container => Ok(Rootfs::new(mount)),
        RuntimeEnvironment::Host => Ok(Rootfs::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rootfs_join_strips_leading_slash() {
        let rootfs = Rootfs::new("/rootfs");
        assert_eq!(
            rootfs.join("/proc/sys/fs/file-nr"),
            PathBuf::from("/rootfs/proc/sys/fs/file-nr")
        );
        assert_eq!(rootfs.join("var/log"), PathBuf::from("/rootfs/var/log"));
        assert_eq!(Rootfs::default().join("/proc"), PathBuf::from("/proc"));
    }
}
