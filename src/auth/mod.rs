//! Authentication module for vasvault.
//!
//! Password hashing and verification. Token issuing lives in the web layer.

mod password;

pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
