use crate::models::UserRecord;
use crate::storage::{StorageError, StorageResult};
use serde::Serialize;
use std::path::Path;

/// Loads a list of user records from a JSON file
///
/// # Arguments
///
/// * `path` - JSON file holding an array of records
///
/// # Returns
///
/// * `Ok(Vec<UserRecord>)` - Records in file order
/// * `Err(StorageError)` - The file is missing, unreadable, or malformed
pub fn load_users(path: &Path) -> StorageResult<Vec<UserRecord>> {
    let content = std::fs::read_to_string(path).map_err(|source| StorageError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let users: Vec<UserRecord> =
        serde_json::from_str(&content).map_err(|source| StorageError::Serialization {
            path: path.display().to_string(),
            source,
        })?;

    tracing::info!(count = users.len(), path = %path.display(), "Loaded users");
    Ok(users)
}

/// Saves a list of user records as a pretty-printed JSON array
///
/// Parent directories are created when missing. The file is replaced.
pub fn save_users(path: &Path, users: &[UserRecord]) -> StorageResult<()> {
    let io_error = |source| StorageError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    users
        .serialize(&mut serializer)
        .map_err(|source| StorageError::Serialization {
            path: path.display().to_string(),
            source,
        })?;

    std::fs::write(path, buffer).map_err(io_error)?;

    tracing::info!(count = users.len(), path = %path.display(), "Saved users");
    Ok(())
}

/// Appends records to an existing JSON array, creating the file if absent
///
/// Used when a crawl resumes from a cursor: records collected by earlier
/// runs are kept ahead of the new ones. Returns the total stored.
pub fn append_users(path: &Path, users: &[UserRecord]) -> StorageResult<usize> {
    if !path.exists() {
        save_users(path, users)?;
        return Ok(users.len());
    }

    let mut stored = load_users(path)?;
    stored.extend_from_slice(users);
    save_users(path, &stored)?;
    Ok(stored.len())
}
