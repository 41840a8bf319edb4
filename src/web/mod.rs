//! HTTP API module for vasvault.
//!
//! REST endpoints for registration, token auth, profile updates and
//! per-user file storage.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
