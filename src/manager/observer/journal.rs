use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::manager::broadcast::Broadcaster;

const RESTART_DELAY: Duration = Duration::from_secs(5);

enum Exit {
    Cancelled,
    Exited(ExitStatus),
}

/// Follows the journal entries of one syslog identifier through `journalctl`.
///
/// The process is restarted after a short delay whenever it exits.
pub(super) async fn follow(
    unit: String,
    root: Option<PathBuf>,
    out: Broadcaster,
    token: CancellationToken,
) {
    loop {
        match stream(&unit, root.as_deref(), &out, &token).await {
            Ok(Exit::Cancelled) => return,
            Ok(Exit::Exited(status)) => {
                log::warn!("journalctl for `{unit}` exited with {status}, restarting");
            }
            Err(err) => log::error!("failed to follow journal of `{unit}`: {err}"),
        }
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(RESTART_DELAY) => {}
        }
    }
}

fn command(unit: &str, root: Option<&Path>) -> Command {
    let mut command = Command::new("journalctl");
    command
        .args(["--follow", "--lines=0", "--output=cat", "--identifier"])
        .arg(unit);
    if let Some(root) = root {
        command.arg("--root").arg(root);
    }
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    command
}

async fn stream(
    unit: &str,
    root: Option<&Path>,
    out: &Broadcaster,
    token: &CancellationToken,
) -> io::Result<Exit> {
    let mut child = command(unit, root).spawn()?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("journalctl stdout is not captured"))?;
    log::debug!("following journal of `{unit}`");

    let mut lines = BufReader::new(stdout).lines();
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                child.kill().await?;
                return Ok(Exit::Cancelled);
            }
            line = lines.next_line() => match line? {
                Some(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        out.send(line);
                    }
                }
                None => return Ok(Exit::Exited(child.wait().await?)),
            },
        }
    }
}
