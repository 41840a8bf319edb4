//! File service for vasvault.
//!
//! Orchestrates the disk and the metadata store for uploads, lookups,
//! downloads and deletion. The two writes are not transactional: an upload
//! writes the disk file first and removes it again if the insert fails, and
//! a delete removes the disk file before the row.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tokio::io::AsyncRead;
use tracing::{debug, error, info, warn};

use crate::{Result, VaultError};

use super::metadata::{FileRecord, FileStore, NewFileRecord};
use super::storage::FileStorage;

/// Request data for a file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Uploading user.
    pub owner_id: i64,
    /// Original filename as supplied by the client.
    pub filename: String,
    /// MIME type as supplied by the client.
    pub content_type: String,
    /// Size the client claims to send, if known.
    pub declared_size: Option<u64>,
    /// Optional folder reference.
    pub group_id: Option<i64>,
}

impl UploadRequest {
    /// Create a new upload request.
    pub fn new(
        owner_id: i64,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            owner_id,
            filename: filename.into(),
            content_type: content_type.into(),
            declared_size: None,
            group_id: None,
        }
    }

    /// Set the declared size.
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = Some(size);
        self
    }

    /// Set the folder reference.
    pub fn with_group(mut self, group_id: i64) -> Self {
        self.group_id = Some(group_id);
        self
    }
}

/// Result of a file download.
#[derive(Debug)]
pub struct DownloadResult {
    /// File metadata.
    pub record: FileRecord,
    /// File content.
    pub content: Vec<u8>,
}

/// Outcome of a reconciliation sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Stored names removed from disk because no record referenced them.
    pub removed_files: Vec<String>,
    /// IDs of records whose disk file is missing.
    pub missing_files: Vec<i64>,
}

impl ReconcileReport {
    /// True when the sweep found nothing to fix.
    pub fn is_clean(&self) -> bool {
        self.removed_files.is_empty() && self.missing_files.is_empty()
    }
}

/// File service owning the create/delete boundary between disk and store.
pub struct FileService {
    store: Arc<dyn FileStore>,
    storage: FileStorage,
}

impl FileService {
    /// Create a new FileService.
    pub fn new(store: Arc<dyn FileStore>, storage: FileStorage) -> Self {
        Self { store, storage }
    }

    /// Get the underlying storage.
    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    /// Upload a file.
    ///
    /// The content is copied to a freshly named file under the storage base
    /// directory, then a metadata record is inserted. If the record cannot be
    /// stored the disk file is removed again before the error is returned.
    pub async fn upload_file<R>(&self, request: &UploadRequest, content: &mut R) -> Result<FileRecord>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        self.storage.ensure_base_dir().await?;

        let stored_name = FileStorage::generate_stored_name(&request.filename);
        let stored_path = self.storage.path_for(&stored_name);

        let written = self.storage.write(&stored_name, content).await?;

        if let Some(declared) = request.declared_size {
            if declared != written {
                warn!(
                    owner_id = request.owner_id,
                    declared,
                    written,
                    "Declared upload size does not match bytes written"
                );
            }
        }

        let inserted = match i64::try_from(written) {
            Ok(size) => {
                let new_file = NewFileRecord {
                    owner_id: request.owner_id,
                    group_id: request.group_id,
                    stored_name,
                    stored_path: stored_path.to_string_lossy().into_owned(),
                    content_type: request.content_type.clone(),
                    size,
                    uploaded_at: Utc::now(),
                };
                self.store.create(&new_file).await
            }
            Err(_) => Err(VaultError::Validation("file too large".to_string())),
        };

        match inserted {
            Ok(record) => {
                info!(
                    file_id = record.id,
                    owner_id = record.owner_id,
                    stored_name = %record.stored_name,
                    size = record.size,
                    "File uploaded"
                );
                Ok(record)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.remove(&stored_path).await {
                    error!(
                        path = %stored_path.display(),
                        error = %cleanup,
                        "Failed to remove file after metadata insert failed"
                    );
                }
                Err(match e {
                    VaultError::Database(msg) => {
                        VaultError::Database(format!("failed to store file metadata: {msg}"))
                    }
                    other => other,
                })
            }
        }
    }

    /// Get a file record by ID.
    pub async fn get_file_by_id(&self, id: i64) -> Result<FileRecord> {
        self.store.find_by_id(id).await
    }

    /// List all files uploaded by a user, ordered by ID.
    pub async fn list_user_files(&self, owner_id: i64) -> Result<Vec<FileRecord>> {
        self.store.list_by_owner(owner_id).await
    }

    /// Load a file record together with its content.
    pub async fn read_file(&self, id: i64) -> Result<DownloadResult> {
        let record = self.store.find_by_id(id).await?;
        let content = self.storage.read(&record.stored_path).await?;
        Ok(DownloadResult { record, content })
    }

    /// Delete a file.
    ///
    /// The disk file is removed first; if that fails the record is left
    /// untouched. A failure deleting the record afterwards leaves a row
    /// without a disk file, which [`FileService::reconcile`] reports.
    pub async fn delete_file(&self, id: i64) -> Result<()> {
        let record = self.store.find_by_id(id).await?;

        self.storage.remove(&record.stored_path).await?;

        if let Err(e) = self.store.delete(id).await {
            error!(
                file_id = id,
                stored_path = %record.stored_path,
                error = %e,
                "File removed from disk but metadata row could not be deleted"
            );
            return Err(e);
        }

        info!(file_id = id, owner_id = record.owner_id, "File deleted");
        Ok(())
    }

    /// Sweep the storage directory against the metadata store.
    ///
    /// Disk files that no record references and that are older than
    /// `min_age` are removed. Records whose disk file is missing are
    /// reported, never deleted. Files younger than `min_age` are skipped so
    /// an upload between its disk write and its insert is left alone.
    pub async fn reconcile(&self, min_age: Duration) -> Result<ReconcileReport> {
        let records = self.store.list_all().await?;
        let known: HashSet<&str> = records.iter().map(|r| r.stored_name.as_str()).collect();

        let mut report = ReconcileReport::default();
        let now = SystemTime::now();

        for entry in self.storage.list_entries().await? {
            if known.contains(entry.name.as_str()) {
                continue;
            }
            let age = now.duration_since(entry.modified).unwrap_or_default();
            if age < min_age {
                debug!(name = %entry.name, "Skipping recent unreferenced file");
                continue;
            }
            match self.storage.remove(self.storage.path_for(&entry.name)).await {
                Ok(()) => {
                    warn!(name = %entry.name, "Removed orphaned file from storage");
                    report.removed_files.push(entry.name);
                }
                Err(e) => error!(name = %entry.name, error = %e, "Failed to remove orphaned file"),
            }
        }

        for record in &records {
            if !self.storage.exists(&record.stored_path).await? {
                warn!(
                    file_id = record.id,
                    stored_path = %record.stored_path,
                    "File record has no file on disk"
                );
                report.missing_files.push(record.id);
            }
        }

        Ok(report)
    }
}
