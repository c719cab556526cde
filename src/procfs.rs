//! Readers for the procfs and sysctl snapshots used by the periodic checks.
//!
//! Every path is resolved beneath a [`Rootfs`], so the same code reads the host's `/proc` when
//! the agent runs in a container with the host root mounted.

use std::path::PathBuf;
use std::str::FromStr;

use crate::config::Rootfs;
use crate::fsutil::{self, FileReadError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    FileRead(#[from] FileReadError),
    #[error("failed to list directory `{path}`: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid value for sysctl `{name}`: `{value}`")]
    InvalidSysctl { name: String, value: String },
    #[error("invalid stat line for pid {pid}: `{line}`")]
    InvalidStat { pid: u32, line: String },
}

impl Error {
    /// Returns true if the error stems from a process exiting while it was being read.
    pub fn is_vanished_process(&self) -> bool {
        matches!(self, Error::FileRead(err) if err.is_vanished())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reads a sysctl such as `kernel.pid_max` from `/proc/sys`.
pub async fn read_sysctl(rootfs: &Rootfs, name: &str) -> Result<String> {
    let path = rootfs.join("/proc/sys").join(name.replace('.', "/"));
    Ok(fsutil::read_trimmed(path).await?)
}

/// Reads a single-valued sysctl and parses it.
pub async fn parse_sysctl<T: FromStr>(rootfs: &Rootfs, name: &str) -> Result<T> {
    let value = read_sysctl(rootfs, name).await?;
    value.parse().map_err(|_| Error::InvalidSysctl {
        name: name.to_owned(),
        value,
    })
}

/// System-wide file handle usage as reported by `fs.file-nr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHandles {
    pub allocated: u64,
    pub total: u64,
}

impl FromStr for FileHandles {
    type Err = Error;

    /// Parses the three whitespace separated fields `allocated free total`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidSysctl {
            name: "fs.file-nr".to_owned(),
            value: s.to_owned(),
        };
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(invalid());
        }
        let allocated = fields[0].parse().map_err(|_| invalid())?;
        let total = fields[2].parse().map_err(|_| invalid())?;
        Ok(Self { allocated, total })
    }
}

pub async fn file_handles(rootfs: &Rootfs) -> Result<FileHandles> {
    read_sysctl(rootfs, "fs.file-nr").await?.parse()
}

/// Lists the PIDs of all processes, i.e. the numeric entries of `/proc`.
pub async fn list_pids(rootfs: &Rootfs) -> Result<Vec<u32>> {
    let path = rootfs.join("/proc");
    let read_dir_err = |source| Error::ReadDir {
        path: path.clone(),
        source,
    };
    let mut entries = tokio::fs::read_dir(&path).await.map_err(read_dir_err)?;
    let mut pids = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_dir_err)? {
        if let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse().ok()) {
            pids.push(pid);
        }
    }
    Ok(pids)
}

/// Reads the raw, NUL separated environment block of a process.
pub async fn read_environ(rootfs: &Rootfs, pid: u32) -> Result<Vec<u8>> {
    Ok(fsutil::read_bytes(rootfs.join(format!("/proc/{pid}/environ"))).await?)
}

/// Reads the scheduler state letter of a process, e.g. `R`, `S` or `Z` for defunct.
pub async fn process_state(rootfs: &Rootfs, pid: u32) -> Result<char> {
    let line = fsutil::read_trimmed(rootfs.join(format!("/proc/{pid}/stat"))).await?;
    parse_stat_state(&line).ok_or(Error::InvalidStat { pid, line })
}

/// Extracts the state field from a `/proc/<pid>/stat` line.
///
/// The command name may itself contain spaces and parentheses, so the state is taken after the
/// last closing parenthesis.
pub fn parse_stat_state(line: &str) -> Option<char> {
    let (_, rest) = line.rsplit_once(')')?;
    rest.trim_start().chars().next()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn fake_proc() -> (tempfile::TempDir, Rootfs) {
        let dir = tempfile::tempdir().unwrap();
        let rootfs = Rootfs::new(dir.path());
        fs::create_dir_all(rootfs.join("/proc/sys/kernel")).unwrap();
        fs::create_dir_all(rootfs.join("/proc/sys/fs")).unwrap();
        (dir, rootfs)
    }

    #[test]
    fn test_parse_file_handles() {
        let handles: FileHandles = "2912\t0\t9223372036854775807".parse().unwrap();
        assert_eq!(handles.allocated, 2912);
        assert_eq!(handles.total, 9223372036854775807);

        assert!("2912 0".parse::<FileHandles>().is_err());
        assert!("a b c".parse::<FileHandles>().is_err());
    }

    #[test]
    fn test_parse_stat_state() {
        assert_eq!(parse_stat_state("1 (systemd) S 0 1 1 0"), Some('S'));
        assert_eq!(parse_stat_state("42 (sh) Z 1 42 42 0"), Some('Z'));
        assert_eq!(parse_stat_state("7 (weird) name)) R 1 7"), Some('R'));
        assert_eq!(parse_stat_state("garbage"), None);
    }

    #[tokio::test]
    async fn test_sysctl_reads_under_rootfs() {
        let (_dir, rootfs) = fake_proc();
        fs::write(rootfs.join("/proc/sys/kernel/pid_max"), "4194304\n").unwrap();
        fs::write(rootfs.join("/proc/sys/kernel/threads-max"), "nope\n").unwrap();
        fs::write(rootfs.join("/proc/sys/fs/file-nr"), "10\t0\t100\n").unwrap();

        let pid_max: u64 = parse_sysctl(&rootfs, "kernel.pid_max").await.unwrap();
        assert_eq!(pid_max, 4194304);
        assert!(matches!(
            parse_sysctl::<u64>(&rootfs, "kernel.threads-max").await,
            Err(Error::InvalidSysctl { .. })
        ));
        assert_eq!(
            file_handles(&rootfs).await.unwrap(),
            FileHandles {
                allocated: 10,
                total: 100
            }
        );
    }

    #[tokio::test]
    async fn test_list_pids_ignores_non_numeric_entries() {
        let (_dir, rootfs) = fake_proc();
        for name in ["1", "42", "self", "sys"] {
            fs::create_dir_all(rootfs.join(format!("/proc/{name}"))).unwrap();
        }
        let mut pids = list_pids(&rootfs).await.unwrap();
        pids.sort();
        assert_eq!(pids, vec![1, 42]);
    }

    #[tokio::test]
    async fn test_missing_process_is_vanished() {
        let (_dir, rootfs) = fake_proc();
        let err = read_environ(&rootfs, 999).await.unwrap_err();
        assert!(err.is_vanished_process());
    }
}
