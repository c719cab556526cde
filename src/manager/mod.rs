//! Reference [`Manager`] implementation.
//!
//! [`MonitorManager`] owns one observer per distinct [`ResourceAddress`], fans its lines out
//! to every subscribed monitor, and exports the conditions the monitors report once they
//! have been seen often enough.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use tokio_util::sync::CancellationToken;
//! # use node_health_monitor::config::Rootfs;
//! # use node_health_monitor::manager::{LogExporter, MonitorManager};
//! # use node_health_monitor::monitors::kernel::KernelMonitor;
//! # async fn example() -> Result<(), node_health_monitor::monitor::SubscriptionError> {
//! let token = CancellationToken::new();
//! let manager = MonitorManager::new(Rootfs::default(), LogExporter::new());
//! manager.register_monitor(&KernelMonitor::default(), token.child_token())?;
//! manager.start(token).await;
//! # Ok(())
//! # }
//! ```
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Rootfs;
use crate::monitor::{
    Condition, LineStream, Manager, Monitor, NotifyError, Severity, SubscriptionError,
};
use crate::resource::ResourceAddress;

mod broadcast;
mod exporter;
mod observer;

use broadcast::Broadcaster;
use observer::Source;

pub use exporter::{
    ConditionCount, ConditionStats, Error, Exporter, LogExporter, Result, StatsSnapshot,
};
pub use observer::format_record;

/// Lines buffered per subscriber before new ones are dropped.
pub const SUBSCRIBER_BUFFER: usize = 1000;
const NOTIFICATION_BUFFER: usize = 100;

struct Notification {
    monitor: String,
    condition: Condition,
}

struct Observer {
    address: ResourceAddress,
    source: Source,
    broadcaster: Broadcaster,
    /// Set once the source runs; cancelling it stops only this observer.
    running: OnceLock<CancellationToken>,
}

impl Observer {
    fn start(&self, token: &CancellationToken) {
        let mut spawned = false;
        let child = self.running.get_or_init(|| {
            spawned = true;
            token.child_token()
        });
        if !spawned {
            return;
        }
        log::info!("starting observer `{}`", self.address);
        tokio::spawn(
            self.source
                .clone()
                .run(self.broadcaster.clone(), child.clone()),
        );
    }

    fn stop(&self) {
        if let Some(token) = self.running.get() {
            token.cancel();
        }
    }
}

/// State shared between the manager and the per-monitor handles.
struct Shared {
    rootfs: Rootfs,
    observers: DashMap<ResourceAddress, Arc<Observer>>,
    /// Set by [`MonitorManager::start`]; observers created afterwards start right away.
    running: OnceLock<CancellationToken>,
    notifications: mpsc::Sender<Notification>,
}

impl Shared {
    fn subscribe(
        &self,
        address: ResourceAddress,
    ) -> std::result::Result<LineStream, SubscriptionError> {
        let observer = match self.observers.entry(address) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let source = Source::for_address(entry.key(), &self.rootfs)?;
                let observer = Arc::new(Observer {
                    address: entry.key().clone(),
                    source,
                    broadcaster: Broadcaster::default(),
                    running: OnceLock::new(),
                });
                entry.insert(Arc::clone(&observer));
                observer
            }
        };
        let stream = observer.broadcaster.subscribe(SUBSCRIBER_BUFFER);
        if let Some(token) = self.running.get() {
            observer.start(token);
        }
        Ok(stream)
    }

    fn start_observers(&self, token: &CancellationToken) {
        if self.running.set(token.clone()).is_err() {
            log::warn!("observers already started");
        }
        for observer in self.observers.iter() {
            observer.value().start(token);
        }
    }

    /// Drops the observers of `addresses` that no longer have a subscriber.
    fn release(&self, addresses: &[ResourceAddress]) {
        for address in addresses {
            let removed = self
                .observers
                .remove_if(address, |_, observer| observer.broadcaster.is_idle());
            if let Some((_, observer)) = removed {
                log::debug!("dropping unused observer `{address}`");
                observer.stop();
            }
        }
    }
}

/// The [`Manager`] handed to one monitor; tags its notifications with the monitor's name.
struct MonitorHandle {
    monitor: String,
    shared: Arc<Shared>,
    subscribed: Mutex<Vec<ResourceAddress>>,
}

impl MonitorHandle {
    fn new(monitor: impl Into<String>, shared: Arc<Shared>) -> Self {
        Self {
            monitor: monitor.into(),
            shared,
            subscribed: Mutex::default(),
        }
    }

    fn subscribed(&self) -> Vec<ResourceAddress> {
        self.subscribed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl Manager for MonitorHandle {
    fn subscribe(
        &self,
        address: ResourceAddress,
    ) -> std::result::Result<LineStream, SubscriptionError> {
        let stream = self.shared.subscribe(address.clone())?;
        self.subscribed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(address);
        Ok(stream)
    }

    async fn notify(&self, condition: Condition) -> std::result::Result<(), NotifyError> {
        let notification = Notification {
            monitor: self.monitor.clone(),
            condition,
        };
        self.shared
            .notifications
            .send(notification)
            .await
            .map_err(|_| NotifyError::Closed)
    }
}

/// Counts occurrences per reason and lets a condition through once it reached its minimum.
#[derive(Debug, Default)]
struct OccurrenceGate {
    seen: HashMap<String, i64>,
}

impl OccurrenceGate {
    fn admit(&mut self, condition: &Condition) -> bool {
        let seen = self.seen.entry(condition.reason().to_owned()).or_default();
        *seen += 1;
        if *seen < condition.min_occurrences() {
            log::debug!(
                "condition `{}` seen {} of {} times",
                condition.reason(),
                seen,
                condition.min_occurrences()
            );
            return false;
        }
        *seen = 0;
        true
    }
}

pub struct MonitorManager<E> {
    shared: Arc<Shared>,
    notifications: mpsc::Receiver<Notification>,
    gate: OccurrenceGate,
    exporter: E,
}

impl<E: Exporter> MonitorManager<E> {
    pub fn new(rootfs: Rootfs, exporter: E) -> Self {
        let (tx, rx) = mpsc::channel(NOTIFICATION_BUFFER);
        let shared = Shared {
            rootfs,
            observers: DashMap::new(),
            running: OnceLock::new(),
            notifications: tx,
        };
        Self {
            shared: Arc::new(shared),
            notifications: rx,
            gate: OccurrenceGate::default(),
            exporter,
        }
    }

    /// Registers a monitor, handing it a manager scoped to its name.
    ///
    /// # Errors
    ///
    /// Returns the monitor's [`SubscriptionError`] if any of its subscriptions fails. The
    /// observers it subscribed to before failing are dropped unless another monitor uses them.
    pub fn register_monitor(
        &self,
        monitor: &dyn Monitor,
        token: CancellationToken,
    ) -> std::result::Result<(), SubscriptionError> {
        let handle = Arc::new(MonitorHandle::new(monitor.name(), Arc::clone(&self.shared)));
        if let Err(err) = monitor.register(token, Arc::clone(&handle) as Arc<dyn Manager>) {
            self.shared.release(&handle.subscribed());
            return Err(err);
        }
        log::info!("registered monitor `{}`", monitor.name());
        Ok(())
    }

    /// Number of distinct observed resources.
    pub fn observer_count(&self) -> usize {
        self.shared.observers.len()
    }

    /// Starts every observer and exports notifications until `token` is cancelled.
    pub async fn start(mut self, token: CancellationToken) {
        self.shared.start_observers(&token);
        loop {
            let notification = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    log::debug!("monitor manager cancelled");
                    return;
                }
                notification = self.notifications.recv() => notification,
            };
            let Some(notification) = notification else {
                return;
            };
            if let Err(err) = self.export(notification).await {
                log::error!("failed to export condition: {err}");
            }
        }
    }

    async fn export(&mut self, notification: Notification) -> Result<()> {
        let Notification { monitor, condition } = notification;
        if !self.gate.admit(&condition) {
            return Ok(());
        }
        log::debug!(
            "exporting condition `{}` from monitor `{monitor}`",
            condition.reason()
        );
        match condition.severity() {
            Severity::Info => self.exporter.info(&monitor, &condition).await,
            Severity::Warning => self.exporter.warning(&monitor, &condition).await,
            Severity::Fatal => self.exporter.fatal(&monitor, &condition).await,
        }
    }
}
