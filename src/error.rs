//! Error types for the store.
//!
//! This module defines the error type covering the store's failure modes,
//! avoiding panics in favor of explicit error handling. Read operations
//! never fail; only construction, saving, and closing can return errors.

use std::fmt;
use std::io;

/// The main error type for store operations.
#[derive(Debug)]
pub enum StoreError {
    /// An I/O error occurred while reading or writing the snapshot file.
    Io(io::Error),

    /// The snapshot could not be serialized or deserialized.
    Serialization(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "I/O error: {}", err),
            StoreError::Serialization(err) => write!(f, "serialization error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err),
            StoreError::Serialization(err) => Some(err),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err)
    }
}

/// A specialized Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
