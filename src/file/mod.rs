//! File management module for vasvault.
//!
//! This module provides the file upload pipeline:
//! - Physical storage with UUID naming
//! - File metadata persistence
//! - The service tying both together, including orphan reconciliation

mod metadata;
mod service;
mod storage;

pub use metadata::{FileRecord, FileRepository, FileStore, NewFileRecord};
pub use service::{DownloadResult, FileService, ReconcileReport, UploadRequest};
pub use storage::{FileStorage, StoredEntry};

/// Default maximum upload size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Unreferenced files younger than this are left alone by reconciliation.
pub const RECONCILE_MIN_AGE_SECS: u64 = 300;
