//! Storage module for persisting record collections
//!
//! Raw crawl output and the filtered dataset are each stored as one
//! pretty-printed UTF-8 JSON array of user records.

mod json;

pub use json::{append_users, load_users, save_users};

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Serialization error in {path}: {source}")]
    Serialization {
        path: String,
        source: serde_json::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
