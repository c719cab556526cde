//! Host signal sources feeding a [`Broadcaster`].
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::broadcast::Broadcaster;
use crate::config::Rootfs;
use crate::monitor::SubscriptionError;
use crate::resource::{ResourceAddress, ResourceKind};

mod file;
mod journal;
mod kmsg;

pub use kmsg::format_record;

/// How often an idle source is polled for new data.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Source {
    Kmsg(PathBuf),
    Journal {
        unit: String,
        /// Alternative root directory handed to `journalctl --root`.
        root: Option<PathBuf>,
    },
    File(PathBuf),
}

impl Source {
    /// Resolves the source behind an address, checking its part count.
    pub(crate) fn for_address(
        address: &ResourceAddress,
        rootfs: &Rootfs,
    ) -> Result<Self, SubscriptionError> {
        let expected = address.kind().expected_parts();
        let actual = address.parts().len();
        if expected != actual {
            return Err(SubscriptionError::PartCount {
                address: address.clone(),
                expected,
                actual,
            });
        }

        let source = match address.kind() {
            ResourceKind::KernelLog => Source::Kmsg(rootfs.join("/dev/kmsg")),
            ResourceKind::Journal => Source::Journal {
                unit: address.parts()[0].clone(),
                root: (rootfs.as_path() != Path::new("/")).then(|| rootfs.as_path().to_owned()),
            },
            ResourceKind::File => Source::File(PathBuf::from(&address.parts()[0])),
        };
        Ok(source)
    }

    /// Feeds `out` until `token` is cancelled.
    pub(crate) async fn run(self, out: Broadcaster, token: CancellationToken) {
        match self {
            Source::Kmsg(path) => kmsg::follow(path, out, token).await,
            Source::Journal { unit, root } => journal::follow(unit, root, out, token).await,
            Source::File(path) => file::tail(path, out, token).await,
        }
    }
}

/// Sleeps for one poll interval. Returns false if cancelled in the meantime.
async fn idle(token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(POLL_INTERVAL) => true,
    }
}
