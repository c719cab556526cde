use std::io::{self, SeekFrom};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio_util::sync::CancellationToken;

use super::idle;
use crate::manager::broadcast::Broadcaster;

enum Follow {
    Cancelled,
    /// The path now points to a different file, or to none at all.
    Replaced,
}

/// Tails the file at `path`, like `tail -F`.
///
/// Waits for the file to exist and starts at its end. A file that replaces it later (log
/// rotation) is read from the start; a truncated file is read again from the start.
pub(super) async fn tail(path: PathBuf, out: Broadcaster, token: CancellationToken) {
    let mut from_start = false;
    loop {
        let Some(file) = wait_for_file(&path, &token).await else {
            return;
        };
        match follow(file, &path, from_start, &out, &token).await {
            Ok(Follow::Cancelled) => return,
            Ok(Follow::Replaced) => {
                log::info!("`{}` was replaced, reopening", path.display());
                from_start = true;
            }
            Err(err) => {
                log::error!("failed to tail `{}`: {err}", path.display());
                from_start = false;
                if !idle(&token).await {
                    return;
                }
            }
        }
    }
}

async fn wait_for_file(path: &Path, token: &CancellationToken) -> Option<File> {
    loop {
        match File::open(path).await {
            Ok(file) => {
                log::debug!("opened `{}`", path.display());
                return Some(file);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => log::trace!("failed to open `{}`: {err}", path.display()),
        }
        if !idle(token).await {
            return None;
        }
    }
}

async fn follow(
    mut file: File,
    path: &Path,
    from_start: bool,
    out: &Broadcaster,
    token: &CancellationToken,
) -> io::Result<Follow> {
    let inode = file.metadata().await?.ino();
    let mut position = if from_start {
        0
    } else {
        file.seek(SeekFrom::End(0)).await?
    };
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();

    loop {
        if token.is_cancelled() {
            return Ok(Follow::Cancelled);
        }
        let read = reader.read_until(b'\n', &mut line).await?;
        if read > 0 {
            position += read as u64;
            // a partial line stays buffered until the writer completes it
            if line.ends_with(b"\n") {
                let text = String::from_utf8_lossy(&line);
                let text = text.trim();
                if !text.is_empty() {
                    out.send(text);
                }
                line.clear();
            }
            continue;
        }

        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.ino() != inode => return Ok(Follow::Replaced),
            Ok(meta) if meta.len() < position => {
                log::info!("`{}` was truncated", path.display());
                reader.seek(SeekFrom::Start(0)).await?;
                position = 0;
                line.clear();
                continue;
            }
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Follow::Replaced),
            Err(err) => return Err(err),
        }
        if !idle(token).await {
            return Ok(Follow::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    async fn next_line(lines: &mut mpsc::Receiver<String>) -> String {
        tokio::time::timeout(Duration::from_secs(2), lines.recv())
            .await
            .expect("timed out waiting for a line")
            .expect("observer stopped")
    }

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    fn start(path: &Path) -> (mpsc::Receiver<String>, CancellationToken) {
        let broadcaster = Broadcaster::default();
        let lines = broadcaster.subscribe(100);
        let token = CancellationToken::new();
        tokio::spawn(tail(path.to_owned(), broadcaster, token.clone()));
        (lines, token)
    }

    #[tokio::test]
    async fn test_tail_starts_at_end_and_joins_partial_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cron.log");
        std::fs::write(&path, "old line\n").unwrap();

        let (mut lines, token) = start(&path);
        tokio::time::sleep(Duration::from_millis(300)).await;

        append(&path, "first\nsec");
        assert_eq!(next_line(&mut lines).await, "first");
        tokio::time::sleep(Duration::from_millis(200)).await;
        append(&path, "ond\n");
        assert_eq!(next_line(&mut lines).await, "second");
        token.cancel();
    }

    #[tokio::test]
    async fn test_tail_waits_for_file_and_follows_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cron.log");

        let (mut lines, token) = start(&path);
        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(&path, "").unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        append(&path, "created\n");
        assert_eq!(next_line(&mut lines).await, "created");

        std::fs::rename(&path, dir.path().join("cron.log.1")).unwrap();
        std::fs::write(&path, "rotated\n").unwrap();
        assert_eq!(next_line(&mut lines).await, "rotated");
        token.cancel();
    }

    #[tokio::test]
    async fn test_tail_rereads_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "").unwrap();

        let (mut lines, token) = start(&path);
        tokio::time::sleep(Duration::from_millis(300)).await;
        append(&path, "a fairly long first line\n");
        assert_eq!(next_line(&mut lines).await, "a fairly long first line");

        std::fs::write(&path, "short\n").unwrap();
        assert_eq!(next_line(&mut lines).await, "short");
        token.cancel();
    }
}
