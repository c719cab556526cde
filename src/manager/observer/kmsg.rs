use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;

use super::idle;
use crate::manager::broadcast::Broadcaster;

/// Upper bound of a single kmsg record.
const RECORD_SIZE: usize = 8192;

/// Formats a raw `/dev/kmsg` record the way `dmesg` prints it: `[seconds.micros] message`.
///
/// Records look like `6,1234,5678901,-;message`, with the timestamp in microseconds since
/// boot as third header field. Continuation lines (starting with a space) carry key/value
/// metadata and yield `None`.
pub fn format_record(record: &str) -> Option<String> {
    if record.starts_with(' ') {
        return None;
    }
    let (header, message) = record.split_once(';')?;
    let micros: u64 = header.split(',').nth(2)?.parse().ok()?;
    Some(format!(
        "[{:>5}.{:06}] {}",
        micros / 1_000_000,
        micros % 1_000_000,
        message.trim_end()
    ))
}

pub(super) async fn follow(path: PathBuf, out: Broadcaster, token: CancellationToken) {
    loop {
        match read_records(&path, &out, &token).await {
            Ok(()) => return,
            Err(err) => log::error!("failed to read kernel log `{}`: {err}", path.display()),
        }
        if !idle(&token).await {
            return;
        }
    }
}

async fn open(path: &Path) -> io::Result<File> {
    // reads return EAGAIN instead of blocking once the buffer is drained
    let mut file = OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .await?;
    // only records written from now on
    file.seek(SeekFrom::End(0)).await?;
    Ok(file)
}

/// Returns `Ok(())` once cancelled.
async fn read_records(path: &Path, out: &Broadcaster, token: &CancellationToken) -> io::Result<()> {
    let mut file = open(path).await?;
    let mut buf = vec![0u8; RECORD_SIZE];
    while !token.is_cancelled() {
        match file.read(&mut buf).await {
            Ok(0) => {
                if !idle(token).await {
                    break;
                }
            }
            // each read returns exactly one record
            Ok(n) => {
                for record in String::from_utf8_lossy(&buf[..n]).lines() {
                    if let Some(line) = format_record(record) {
                        out.send(&line);
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                if !idle(token).await {
                    break;
                }
            }
            Err(err) if err.raw_os_error() == Some(libc::EPIPE) => {
                log::warn!("kernel log records were overwritten before they could be read");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
