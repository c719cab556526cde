//! Kernel and process-table health monitor.
//!
//! Watches the kernel ring buffer, the kubelet journal and the host cron log, and samples
//! procfs every few minutes for file handle, PID, zombie and environment-size pressure.
//!
//! # Sources
//!
//! - kernel log: soft lockups, kernel bugs, crashing or blocked processes, full conntrack table
//! - `kubelet` journal: fork/exec failures caused by PID or memory exhaustion
//! - `/var/log/cron.log`: cron jobs repeating faster than every five minutes
//! - periodic: `fs.file-nr`, `kernel.pid_max`/`kernel.threads-max`, `/proc/<pid>/stat`,
//!   `/proc/<pid>/environ`
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::Rootfs;
use crate::handler::{self, ChannelHandler, handler_fn};
use crate::monitor::{Condition, Manager, Monitor, NotifyError, SubscriptionError};
use crate::procfs;
use crate::resource::ResourceAddress;

mod classify;
mod cron;
mod periodic;
mod plugin;

pub use classify::{classify_kernel_line, classify_kubelet_line};
pub use plugin::{PLUGIN_NAME, plugin};

/// Base period of the procfs checks.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

const KUBELET_UNIT: &str = "kubelet";
const CRON_LOG: &str = "/var/log/cron.log";

/// Errors raised while processing a single observation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error(transparent)]
    Procfs(#[from] procfs::Error),
    #[error("`{0}` reports a limit of zero")]
    ZeroLimit(&'static str),
    #[error("expected at least {expected} fields in cron log entry, got {actual}: `{line}`")]
    CronFormat {
        expected: usize,
        actual: usize,
        line: String,
    },
    #[error("invalid cron timestamp `{value}`: {source}")]
    CronTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

#[derive(Debug, Clone, Default)]
pub struct KernelMonitor {
    rootfs: Rootfs,
}

impl KernelMonitor {
    pub fn new(rootfs: Rootfs) -> Self {
        Self { rootfs }
    }
}

impl Monitor for KernelMonitor {
    fn name(&self) -> &str {
        "kernel"
    }

    fn conditions(&self) -> Vec<Condition> {
        Vec::new()
    }

    fn register(
        &self,
        token: CancellationToken,
        manager: Arc<dyn Manager>,
    ) -> Result<(), SubscriptionError> {
        let dmesg = manager.subscribe(ResourceAddress::kernel_log())?;
        let kubelet = manager.subscribe(ResourceAddress::journal(KUBELET_UNIT))?;
        let cron_log = manager.subscribe(ResourceAddress::file(self.rootfs.join(CRON_LOG)))?;

        let checks = Arc::new(KernelChecks::new(manager, self.rootfs.clone()));

        ChannelHandler::new(
            "kernel/dmesg",
            handler_fn({
                let checks = Arc::clone(&checks);
                move |line: String| {
                    let checks = Arc::clone(&checks);
                    async move { checks.notify_if(classify_kernel_line(&line)).await }
                }
            }),
            dmesg,
        )
        .spawn(token.clone());

        ChannelHandler::new(
            "kernel/kubelet",
            handler_fn({
                let checks = Arc::clone(&checks);
                move |line: String| {
                    let checks = Arc::clone(&checks);
                    async move { checks.notify_if(classify_kubelet_line(&line)).await }
                }
            }),
            kubelet,
        )
        .spawn(token.clone());

        ChannelHandler::new(
            "kernel/cron",
            cron::CronFloodDetector::new(Arc::clone(&checks)),
            cron_log,
        )
        .spawn(token.clone());

        spawn_periodic("kernel/pids", &checks, &token, |c| async move {
            c.handle_pids().await
        });
        spawn_periodic("kernel/zombies", &checks, &token, |c| async move {
            c.handle_zombies().await
        });
        spawn_periodic("kernel/opened-files", &checks, &token, |c| async move {
            c.handle_opened_files().await
        });
        spawn_periodic("kernel/environment", &checks, &token, |c| async move {
            c.handle_environment().await
        });

        log::info!("registered kernel monitor");
        Ok(())
    }
}

fn spawn_periodic<F, Fut>(
    name: &str,
    checks: &Arc<KernelChecks>,
    token: &CancellationToken,
    check: F,
) where
    F: Fn(Arc<KernelChecks>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    let checks = Arc::clone(checks);
    let ticks = handler::tick_with_jitter(CHECK_INTERVAL, token.clone());
    ChannelHandler::new(
        name,
        handler_fn(move |_tick: Instant| check(Arc::clone(&checks))),
        ticks,
    )
    .spawn(token.clone());
}

/// State shared by every handler of one registered [`KernelMonitor`].
pub(crate) struct KernelChecks {
    manager: Arc<dyn Manager>,
    rootfs: Rootfs,
}

impl KernelChecks {
    pub(crate) fn new(manager: Arc<dyn Manager>, rootfs: Rootfs) -> Self {
        Self { manager, rootfs }
    }

    async fn notify(&self, condition: Condition) -> Result<(), Error> {
        Ok(self.manager.notify(condition).await?)
    }

    async fn notify_if(&self, condition: Option<Condition>) -> Result<(), Error> {
        match condition {
            Some(condition) => self.notify(condition).await,
            None => Ok(()),
        }
    }
}
