//! Remote blob store abstraction.
//!
//! The sync engine only needs three operations from a remote backend:
//! look a document up by name, upload (create or overwrite) it, and
//! download it. Concrete backends live behind [`RemoteStore`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-specific reference to a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentHandle(String);

impl DocumentHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors reported by a remote backend.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// No backend configured (e.g. no credentials or location)
    #[error("Remote storage is not configured")]
    NotConfigured,

    /// Backend exists but cannot be reached right now
    #[error("Remote storage unavailable: {0}")]
    Unavailable(String),

    /// Request reached the backend and failed
    #[error("Transfer failed: {0}")]
    Transport(String),

    #[error("Invalid document name: {0}")]
    InvalidName(String),

    #[error("Remote document not found: {0}")]
    NotFound(String),
}

/// A named-document blob store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Looks a document up by name.
    async fn find_document(&self, name: &str) -> Result<Option<DocumentHandle>, RemoteError>;

    /// Overwrites the document behind `handle`, or creates `name` when
    /// `handle` is `None`. Returns the handle of the written document.
    async fn upload(
        &self,
        handle: Option<&DocumentHandle>,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<DocumentHandle, RemoteError>;

    async fn download(&self, handle: &DocumentHandle) -> Result<Vec<u8>, RemoteError>;

    /// Cheap reachability probe.
    async fn is_available(&self) -> bool {
        true
    }
}

/// Stand-in used when no remote is configured. Every call fails with
/// [`RemoteError::NotConfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRemote;

#[async_trait]
impl RemoteStore for UnavailableRemote {
    async fn find_document(&self, _name: &str) -> Result<Option<DocumentHandle>, RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn upload(
        &self,
        _handle: Option<&DocumentHandle>,
        _name: &str,
        _bytes: Vec<u8>,
    ) -> Result<DocumentHandle, RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn download(&self, _handle: &DocumentHandle) -> Result<Vec<u8>, RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn is_available(&self) -> bool {
        false
    }
}
