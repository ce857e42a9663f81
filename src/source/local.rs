//! Local filesystem source implementation
//!
//! Provides async file I/O for reading stripe files from the local filesystem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio::sync::Mutex;

use super::traits::RegionSource;
use crate::error::SourceError;

/// A region source reading from the local filesystem.
///
/// Uses tokio's async file I/O; range requests are served by seek + read
/// behind a mutex, so one handle serves a whole scan.
pub struct LocalSource {
    /// The file handle wrapped in a mutex for safe concurrent access
    file: Mutex<File>,
    /// Path to the file (for error reporting)
    path: PathBuf,
    /// Cached file size
    file_size: u64,
}

impl LocalSource {
    /// Open a local stripe file for reading.
    ///
    /// # Arguments
    /// * `path` - Path to the file to open
    ///
    /// # Returns
    /// A new `LocalSource` instance, or an error if the file cannot be opened.
    ///
    /// # Errors
    /// Returns `SourceError::NotFound` if the file doesn't exist.
    /// Returns `SourceError::PermissionDenied` if access is denied.
    /// Returns `SourceError::FileSystem` for other I/O errors.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();

        let file = File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::NotFound(path.display().to_string())
            } else if e.kind() == std::io::ErrorKind::PermissionDenied {
                SourceError::PermissionDenied(path.display().to_string())
            } else {
                SourceError::FileSystem(format!("{}: {}", path.display(), e))
            }
        })?;

        let metadata = file.metadata().await.map_err(|e| {
            SourceError::FileSystem(format!(
                "Failed to get metadata for {}: {}",
                path.display(),
                e
            ))
        })?;

        let file_size = metadata.len();

        Ok(Self {
            file: Mutex::new(file),
            path,
            file_size,
        })
    }

    /// Get the path to the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RegionSource for LocalSource {
    async fn read_range(&self, offset: u64, length: usize) -> Result<Bytes, SourceError> {
        // The contract is exact-or-fail: report how much actually exists
        // instead of clamping.
        let available = self.file_size.saturating_sub(offset);
        if (length as u64) > available {
            return Err(SourceError::ShortRead {
                offset,
                requested: length,
                returned: available as usize,
            });
        }

        let mut file = self.file.lock().await;

        file.seek(SeekFrom::Start(offset)).await.map_err(|e| {
            SourceError::FileSystem(format!(
                "Failed to seek to offset {} in {}: {}",
                offset,
                self.path.display(),
                e
            ))
        })?;

        let mut buffer = vec![0u8; length];
        let mut filled = 0usize;
        while filled < length {
            let read = file.read(&mut buffer[filled..]).await.map_err(|e| {
                SourceError::FileSystem(format!(
                    "Failed to read {} bytes at offset {} from {}: {}",
                    length,
                    offset,
                    self.path.display(),
                    e
                ))
            })?;
            // A file truncated after open shows up as EOF mid-read.
            if read == 0 {
                return Err(SourceError::ShortRead {
                    offset,
                    requested: length,
                    returned: filled,
                });
            }
            filled += read;
        }

        Ok(Bytes::from(buffer))
    }

    async fn size(&self) -> Result<u64, SourceError> {
        Ok(self.file_size)
    }
}

impl std::fmt::Debug for LocalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSource")
            .field("path", &self.path)
            .field("file_size", &self.file_size)
            .finish()
    }
}
