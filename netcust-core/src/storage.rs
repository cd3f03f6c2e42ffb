//! JSON document storage for persisting local state to disk.
//!
//! Each logical key is a self-contained JSON file in the data directory:
//! ```text
//! <DATA_DIR>/
//!   customers.json         # RecordSet
//!   customer_fields.json   # Schema Registry
//!   sync_settings.json     # SyncMetadata
//! ```
//!
//! A missing file is a valid empty state, never an error.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

/// Logical documents kept in local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Customers,
    Fields,
    SyncSettings,
}

impl DocKind {
    /// Returns the filename for this document.
    pub fn filename(&self) -> &'static str {
        match self {
            DocKind::Customers => "customers.json",
            DocKind::Fields => "customer_fields.json",
            DocKind::SyncSettings => "sync_settings.json",
        }
    }
}

/// Filesystem-backed storage for the local documents.
#[derive(Debug, Clone)]
pub struct DocumentStorage {
    data_dir: PathBuf,
}

impl DocumentStorage {
    /// Creates a new storage instance rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Returns the full path for a document.
    pub fn path(&self, kind: DocKind) -> PathBuf {
        self.data_dir.join(kind.filename())
    }

    /// Checks if a document exists on disk.
    pub fn exists(&self, kind: DocKind) -> bool {
        self.path(kind).exists()
    }

    /// Loads and parses a document.
    ///
    /// Returns `Ok(None)` if the file doesn't exist.
    pub fn load<T: DeserializeOwned>(&self, kind: DocKind) -> Result<Option<T>, StorageError> {
        let path = self.path(kind);

        match fs::read(&path) {
            Ok(bytes) => {
                let value =
                    serde_json::from_slice(&bytes).map_err(|e| StorageError::Json(path, e))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(path, e)),
        }
    }

    /// Serializes and saves a document.
    ///
    /// Creates the data directory if needed and writes through a temp file
    /// followed by a rename, so a reader never observes a partial document.
    pub fn save<T: Serialize>(&self, kind: DocKind, value: &T) -> Result<(), StorageError> {
        let path = self.path(kind);
        let bytes = serde_json::to_vec(value).map_err(|e| StorageError::Json(path.clone(), e))?;

        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::Io(self.data_dir.clone(), e))?;

        let temp_path = path.with_extension("json.tmp");

        let mut file =
            File::create(&temp_path).map_err(|e| StorageError::Io(temp_path.clone(), e))?;
        file.write_all(&bytes)
            .map_err(|e| StorageError::Io(temp_path.clone(), e))?;
        file.sync_all()
            .map_err(|e| StorageError::Io(temp_path.clone(), e))?;

        fs::rename(&temp_path, &path).map_err(|e| StorageError::Io(path.clone(), e))?;

        tracing::debug!(document = kind.filename(), bytes = bytes.len(), "saved document");
        Ok(())
    }
}

/// Errors that can occur during document storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error reading or writing a file.
    Io(PathBuf, io::Error),
    /// Document could not be encoded or parsed as JSON.
    Json(PathBuf, serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            StorageError::Json(path, e) => {
                write!(f, "Invalid JSON document {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(_, e) => Some(e),
            StorageError::Json(_, e) => Some(e),
        }
    }
}
