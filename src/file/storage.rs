//! Physical file storage for vasvault.
//!
//! Files live flat under a single base directory:
//! ```text
//! {base_path}/
//! ├── 3f2a9c1e-5d7b-4e8a-9c0d-1b2a3c4d5e6f.pdf
//! ├── 8e1d4b2c-0a9f-4c3e-8b7d-6a5f4e3d2c1b
//! └── ...
//! ```
//! Stored names are a random UUID v4 plus the original extension, so the
//! original filename never reaches the disk and concurrent uploads never
//! share a destination.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::warn;
use uuid::Uuid;

use crate::{Result, VaultError};

/// A regular file found in the storage directory.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// File name inside the base directory.
    pub name: String,
    /// Last modification time.
    pub modified: SystemTime,
}

/// Storage path resolver and disk access for uploaded files.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `base_path`.
    ///
    /// The directory is created lazily by [`FileStorage::ensure_base_dir`].
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Create the base directory and any missing parents.
    pub async fn ensure_base_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            VaultError::Storage(format!("failed to create upload directory: {e}"))
        })
    }

    /// Generate a new stored name for an upload.
    ///
    /// The extension of `original_name` is kept when it is plain ASCII
    /// alphanumeric; anything else is dropped and the name is the bare UUID.
    pub fn generate_stored_name(original_name: &str) -> String {
        let uuid = Uuid::new_v4();
        match Self::extract_extension(original_name) {
            Some(ext) => format!("{uuid}.{ext}"),
            None => uuid.to_string(),
        }
    }

    fn extract_extension(filename: &str) -> Option<&str> {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    }

    /// Full path for a stored name.
    pub fn path_for(&self, stored_name: &str) -> PathBuf {
        self.base_path.join(stored_name)
    }

    /// Copy `content` into a new file named `stored_name`.
    ///
    /// Returns the number of bytes written. The destination is created
    /// exclusively, so an existing file is never overwritten. On failure the
    /// partially written file is removed.
    pub async fn write<R>(&self, stored_name: &str, content: &mut R) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let path = self.path_for(stored_name);

        let mut dst = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| VaultError::Storage(format!("failed to create file: {e}")))?;

        let copied = async {
            let written = tokio::io::copy(content, &mut dst).await?;
            dst.flush().await?;
            Ok::<u64, io::Error>(written)
        }
        .await;
        drop(dst);

        match copied {
            Ok(written) => Ok(written),
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %cleanup, "Failed to remove partial upload");
                }
                Err(VaultError::Storage(format!("failed to save file: {e}")))
            }
        }
    }

    /// Read a stored file fully into memory.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        fs::read(path.as_ref())
            .await
            .map_err(|e| VaultError::Storage(format!("failed to read file: {e}")))
    }

    /// Remove a stored file.
    ///
    /// A missing file is an error: the caller expected it to exist.
    pub async fn remove(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::remove_file(path.as_ref())
            .await
            .map_err(|e| VaultError::Storage(format!("failed to delete file from disk: {e}")))
    }

    /// Check whether a file exists at `path`.
    pub async fn exists(&self, path: impl AsRef<Path>) -> Result<bool> {
        fs::try_exists(path.as_ref())
            .await
            .map_err(|e| VaultError::Storage(format!("failed to stat file: {e}")))
    }

    /// List regular files directly under the base directory.
    ///
    /// A missing base directory yields an empty list.
    pub async fn list_entries(&self) -> Result<Vec<StoredEntry>> {
        let mut dir = match fs::read_dir(&self.base_path).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(VaultError::Storage(format!(
                    "failed to read upload directory: {e}"
                )))
            }
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| VaultError::Storage(format!("failed to read upload directory: {e}")))?
        {
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(_) => continue,
            };
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            entries.push(StoredEntry {
                name,
                modified: metadata.modified().unwrap_or_else(|_| SystemTime::now()),
            });
        }

        Ok(entries)
    }
}
