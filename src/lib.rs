//! vasvault - multi-tenant file vault backend
//!
//! Users register, log in with token auth, and upload, list, download and
//! delete their own files. File bytes live on local disk and metadata in
//! SQLite.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use auth::{hash_password, validate_password, verify_password, PasswordError};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository, UserUpdate};
pub use error::{Result, VaultError};
pub use file::{FileRecord, FileRepository, FileService, FileStorage, FileStore, UploadRequest};
pub use web::WebServer;
