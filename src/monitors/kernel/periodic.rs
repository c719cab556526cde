//! Stateless threshold checks over periodic procfs snapshots.

use super::{Error, KernelChecks};
use crate::error::ResultOkLogExt;
use crate::monitor::reasons;
use crate::procfs;

/// Fraction of a kernel limit at which usage is reported.
const USAGE_THRESHOLD: f64 = 0.7;
const ZOMBIE_THRESHOLD: usize = 20;
/// Zombie checks run every ~5 minutes, so five hits amount to roughly 25 minutes of exposure.
const ZOMBIE_MIN_OCCURRENCES: i64 = 5;
const ENVIRONMENT_THRESHOLD: usize = 1000;

impl KernelChecks {
    pub(super) async fn handle_opened_files(&self) -> Result<(), Error> {
        let handles = procfs::file_handles(&self.rootfs).await?;
        self.check_opened_files(handles.allocated, handles.total)
            .await
    }

    pub(super) async fn check_opened_files(&self, allocated: u64, total: u64) -> Result<(), Error> {
        if total == 0 {
            return Err(Error::ZeroLimit("fs.file-nr"));
        }
        let used = allocated as f64 / total as f64;
        if used < USAGE_THRESHOLD {
            return Ok(());
        }
        self.notify(
            reasons::APPROACHING_MAX_OPEN_FILES
                .builder()
                .message(format!(
                    "Approaching Exhaustion of max open file descriptors. {allocated} of {total} total, {:.1}%",
                    used * 100.0
                ))
                .build(),
        )
        .await
    }

    pub(super) async fn handle_pids(&self) -> Result<(), Error> {
        let pid_max: u64 = procfs::parse_sysctl(&self.rootfs, "kernel.pid_max").await?;
        let threads_max: u64 = procfs::parse_sysctl(&self.rootfs, "kernel.threads-max").await?;
        let current = procfs::list_pids(&self.rootfs).await?.len() as u64;
        self.check_pids(current, pid_max.max(threads_max)).await
    }

    pub(super) async fn check_pids(&self, current: u64, max: u64) -> Result<(), Error> {
        if max == 0 {
            return Err(Error::ZeroLimit("kernel.pid_max"));
        }
        let used = current as f64 / max as f64;
        if used < USAGE_THRESHOLD {
            return Ok(());
        }
        self.notify(
            reasons::APPROACHING_KERNEL_PID_MAX
                .builder()
                .message(format!(
                    "Approaching max number of PIDs. {current} of {max} total, {:.1}%",
                    used * 100.0
                ))
                .build(),
        )
        .await
    }

    pub(super) async fn handle_zombies(&self) -> Result<(), Error> {
        let mut zombies = 0;
        for pid in procfs::list_pids(&self.rootfs).await? {
            match procfs::process_state(&self.rootfs, pid).await {
                Ok('Z') => zombies += 1,
                Ok(_) => {}
                Err(err) if err.is_vanished_process() => {}
                Err(err) => {
                    log::warn!("failed to read state of pid {pid}: {err}");
                }
            }
        }
        self.check_zombies(zombies).await
    }

    pub(super) async fn check_zombies(&self, zombies: usize) -> Result<(), Error> {
        if zombies < ZOMBIE_THRESHOLD {
            return Ok(());
        }
        self.notify(
            reasons::EXCESSIVE_ZOMBIE_PROCESSES
                .builder()
                .message(format!("Detected {zombies} zombie processes still running"))
                .min_occurrences(ZOMBIE_MIN_OCCURRENCES)
                .build(),
        )
        .await
    }

    pub(super) async fn handle_environment(&self) -> Result<(), Error> {
        for pid in procfs::list_pids(&self.rootfs).await? {
            let environ = procfs::read_environ(&self.rootfs, pid).await;
            // processes come and go while we iterate
            if matches!(&environ, Err(err) if err.is_vanished_process()) {
                continue;
            }
            let Some(environ) = environ.ok_log() else {
                continue;
            };
            self.check_environment(&environ, pid).await?;
        }
        Ok(())
    }

    pub(super) async fn check_environment(&self, environ: &[u8], pid: u32) -> Result<(), Error> {
        // entries are NUL separated, see environ(7)
        let count = environ
            .split(|b| *b == 0)
            .filter(|entry| !entry.is_empty())
            .count();
        if count <= ENVIRONMENT_THRESHOLD {
            return Ok(());
        }
        self.notify(
            reasons::LARGE_ENVIRONMENT
                .builder()
                .message(format!(
                    "PID {pid} has a higher than normal environment variable count at {count}"
                ))
                .build(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::config::Rootfs;
    use crate::monitor::fake::FakeManager;
    use crate::monitor::{Condition, Severity};

    fn checks(rootfs: Rootfs) -> (Arc<KernelChecks>, UnboundedReceiver<Condition>) {
        let (manager, rx) = FakeManager::new();
        (Arc::new(KernelChecks::new(manager, rootfs)), rx)
    }

    #[tokio::test]
    async fn test_open_files_threshold() {
        let (checks, mut rx) = checks(Rootfs::default());

        checks.check_opened_files(1, 10).await.unwrap();
        assert!(rx.try_recv().is_err());

        checks.check_opened_files(7, 10).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().reason(), "ApproachingMaxOpenFiles");

        checks.check_opened_files(8, 10).await.unwrap();
        let condition = rx.try_recv().unwrap();
        assert_eq!(condition.reason(), "ApproachingMaxOpenFiles");
        assert_eq!(condition.severity(), Severity::Warning);
        assert!(condition.message().contains("8 of 10 total, 80.0%"));

        assert!(matches!(
            checks.check_opened_files(1, 0).await,
            Err(Error::ZeroLimit(_))
        ));
    }

    #[tokio::test]
    async fn test_pid_threshold() {
        let (checks, mut rx) = checks(Rootfs::default());

        checks.check_pids(0, 10).await.unwrap();
        checks.check_pids(6, 10).await.unwrap();
        assert!(rx.try_recv().is_err());

        checks.check_pids(8, 10).await.unwrap();
        let condition = rx.try_recv().unwrap();
        assert_eq!(condition.reason(), "ApproachingKernelPidMax");
        assert_eq!(condition.severity(), Severity::Warning);
    }

    #[tokio::test]
    async fn test_zombie_threshold() {
        let (checks, mut rx) = checks(Rootfs::default());

        checks.check_zombies(19).await.unwrap();
        assert!(rx.try_recv().is_err());

        checks.check_zombies(20).await.unwrap();
        let condition = rx.try_recv().unwrap();
        assert_eq!(condition.reason(), "ExcessiveZombieProcesses");
        assert_eq!(condition.severity(), Severity::Warning);
        assert_eq!(condition.min_occurrences(), 5);
    }

    #[tokio::test]
    async fn test_large_environment() {
        let (checks, mut rx) = checks(Rootfs::default());

        let environ: Vec<u8> = (0..1001)
            .flat_map(|i| format!("VAR{i}=x\0").into_bytes())
            .collect();
        checks.check_environment(&environ, 42).await.unwrap();
        let condition = rx.try_recv().unwrap();
        assert_eq!(condition.reason(), "LargeEnvironment");
        assert!(condition.message().contains("PID 42"));
        assert!(condition.message().contains("1001"));

        let environ: Vec<u8> = (0..1000)
            .flat_map(|i| format!("VAR{i}=x\0").into_bytes())
            .collect();
        checks.check_environment(&environ, 42).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_null_only_environment_is_empty() {
        let (checks, mut rx) = checks(Rootfs::default());
        checks.check_environment(&[0u8; 5000], 1).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    fn write_process(rootfs: &Rootfs, pid: u32, state: char, environ: &[u8]) {
        let dir = rootfs.join(format!("/proc/{pid}"));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stat"), format!("{pid} (proc {pid}) {state} 1 1 1 0")).unwrap();
        fs::write(dir.join("environ"), environ).unwrap();
    }

    #[tokio::test]
    async fn test_snapshots_from_fake_proc() {
        let dir = tempfile::tempdir().unwrap();
        let rootfs = Rootfs::new(dir.path());
        fs::create_dir_all(rootfs.join("/proc/sys/kernel")).unwrap();
        fs::create_dir_all(rootfs.join("/proc/sys/fs")).unwrap();
        fs::write(rootfs.join("/proc/sys/kernel/pid_max"), "10\n").unwrap();
        fs::write(rootfs.join("/proc/sys/kernel/threads-max"), "4\n").unwrap();
        fs::write(rootfs.join("/proc/sys/fs/file-nr"), "90\t0\t100\n").unwrap();

        let big: Vec<u8> = (0..1500).flat_map(|i| format!("K{i}=v\0").into_bytes()).collect();
        for pid in 1..=21 {
            write_process(&rootfs, pid, 'Z', b"A=1\0");
        }
        write_process(&rootfs, 100, 'S', &big);
        // a process whose environ is gone by the time we read it
        fs::create_dir_all(rootfs.join("/proc/200")).unwrap();

        let (checks, mut rx) = checks(rootfs);

        checks.handle_opened_files().await.unwrap();
        assert_eq!(rx.try_recv().unwrap().reason(), "ApproachingMaxOpenFiles");

        // 23 entries against max(pid_max, threads-max) = 10
        checks.handle_pids().await.unwrap();
        assert_eq!(rx.try_recv().unwrap().reason(), "ApproachingKernelPidMax");

        checks.handle_zombies().await.unwrap();
        assert_eq!(rx.try_recv().unwrap().reason(), "ExcessiveZombieProcesses");

        checks.handle_environment().await.unwrap();
        let condition = rx.try_recv().unwrap();
        assert_eq!(condition.reason(), "LargeEnvironment");
        assert!(condition.message().contains("PID 100"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unreadable_process_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let rootfs = Rootfs::new(dir.path());

        let big: Vec<u8> = (0..1500).flat_map(|i| format!("K{i}=v\0").into_bytes()).collect();
        for pid in 6..=25 {
            write_process(&rootfs, pid, 'Z', &big);
        }
        // reading a directory fails with EISDIR, which is not a vanished process
        fs::create_dir_all(rootfs.join("/proc/5/stat")).unwrap();
        fs::create_dir_all(rootfs.join("/proc/5/environ")).unwrap();

        let (checks, mut rx) = checks(rootfs);

        checks.handle_zombies().await.unwrap();
        let condition = rx.try_recv().unwrap();
        assert_eq!(condition.reason(), "ExcessiveZombieProcesses");
        assert!(condition.message().contains("Detected 20 zombie"));

        checks.handle_environment().await.unwrap();
        let reported: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|condition| condition.message().to_owned())
            .collect();
        assert_eq!(reported.len(), 20);
        assert!(reported.iter().all(|message| !message.contains("PID 5 ")));
        assert!(reported.iter().any(|message| message.contains("PID 6 ")));
    }
}
