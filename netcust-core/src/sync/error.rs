//! Sync error types.

use super::remote::RemoteError;
use crate::error::StoreError;
use crate::storage::StorageError;

/// Errors that can occur during a sync attempt.
///
/// None of these ever touch local records: a failed sync leaves the
/// RecordSet and the last sync time exactly as they were.
#[derive(Debug)]
pub enum SyncError {
    /// Remote collaborator missing, unreachable or failing
    Remote(RemoteError),
    /// Local snapshot could not be serialized
    Encode(serde_json::Error),
    /// Remote document is not a valid snapshot
    Decode(serde_json::Error),
    /// Sync settings could not be read or written
    Storage(StorageError),
    /// Local records or fields could not be re-read before uploading
    Local(StoreError),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Remote(RemoteError::NotConfigured) => write!(
                f,
                "Sync not configured. Add sync.remote_dir to config or set NETCUST_REMOTE_DIR."
            ),
            SyncError::Remote(e) => write!(f, "Remote error: {}", e),
            SyncError::Encode(e) => write!(f, "Failed to encode snapshot: {}", e),
            SyncError::Decode(e) => write!(f, "Remote snapshot is not valid: {}", e),
            SyncError::Storage(e) => write!(f, "Storage error: {}", e),
            SyncError::Local(e) => write!(f, "Failed to read local data: {}", e),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Remote(e) => Some(e),
            SyncError::Encode(e) | SyncError::Decode(e) => Some(e),
            SyncError::Storage(e) => Some(e),
            SyncError::Local(e) => Some(e),
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(e: RemoteError) -> Self {
        SyncError::Remote(e)
    }
}

impl From<StorageError> for SyncError {
    fn from(e: StorageError) -> Self {
        SyncError::Storage(e)
    }
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        SyncError::Local(e)
    }
}
