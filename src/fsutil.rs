use std::io;
use std::path::{Path, PathBuf};

/// Error that occurs when reading a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to read file `{path}`: {source}")]
pub struct FileReadError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FileReadError {
    /// Returns true if the file vanished underneath us, e.g. because the owning process exited.
    pub fn is_vanished(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
            || self.source.raw_os_error() == Some(libc::ESRCH)
    }
}

/// Reads the whole file at the given path.
///
/// # Errors
///
/// Returns a [`FileReadError`] carrying the path if the file cannot be read.
///
/// # Example
/// ```no_run
/// # use node_health_monitor::fsutil;
/// # async fn example() -> Result<(), fsutil::FileReadError> {
/// let environ = fsutil::read_bytes("/proc/self/environ").await?;
/// # Ok(())
/// # }
/// ```
pub async fn read_bytes(path: impl AsRef<Path>) -> Result<Vec<u8>, FileReadError> {
    let path = path.as_ref();
    tokio::fs::read(path).await.map_err(|source| FileReadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the file at the given path and trims surrounding whitespace.
///
/// # Errors
///
/// Returns a [`FileReadError`] if the file cannot be read or is not valid UTF-8.
pub async fn read_trimmed(path: impl AsRef<Path>) -> Result<String, FileReadError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FileReadError {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(raw.trim().to_owned())
}
