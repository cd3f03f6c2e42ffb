//! Remote store backed by a shared directory.
//!
//! Any folder the device can reach only some of the time (a mounted network
//! share, a removable drive, a folder mirrored by a desktop sync client) can
//! act as the remote. Each document is one file named after the document;
//! the handle is that file name.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::remote::{DocumentHandle, RemoteError, RemoteStore};

#[derive(Debug, Clone)]
pub struct DirectoryRemote {
    root: PathBuf,
}

impl DirectoryRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rejects names that would escape the root directory.
    fn validate_name(name: &str) -> Result<(), RemoteError> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.starts_with('.')
        {
            return Err(RemoteError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    /// The root must already exist. It is never created here: a missing
    /// root reads as an unmounted share.
    async fn ensure_reachable(&self) -> Result<(), RemoteError> {
        match fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(RemoteError::Unavailable(format!(
                "{} is not a directory",
                self.root.display()
            ))),
            Err(e) => Err(RemoteError::Unavailable(format!(
                "{}: {}",
                self.root.display(),
                e
            ))),
        }
    }

    fn doc_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl RemoteStore for DirectoryRemote {
    async fn find_document(&self, name: &str) -> Result<Option<DocumentHandle>, RemoteError> {
        Self::validate_name(name)?;
        self.ensure_reachable().await?;

        match fs::metadata(self.doc_path(name)).await {
            Ok(meta) if meta.is_file() => Ok(Some(DocumentHandle::new(name))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RemoteError::Transport(e.to_string())),
        }
    }

    async fn upload(
        &self,
        handle: Option<&DocumentHandle>,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<DocumentHandle, RemoteError> {
        let target = handle.map(DocumentHandle::as_str).unwrap_or(name);
        Self::validate_name(target)?;
        self.ensure_reachable().await?;

        let path = self.doc_path(target);
        let temp_path = self.doc_path(&format!("{}.tmp", target));

        let written = match write_file(&temp_path, &bytes).await {
            Ok(()) => fs::rename(&temp_path, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // Cleanup is best effort.
            let _ = fs::remove_file(&temp_path).await;
            return Err(RemoteError::Transport(e.to_string()));
        }

        tracing::debug!(document = target, bytes = bytes.len(), "uploaded to directory remote");
        Ok(DocumentHandle::new(target))
    }

    async fn download(&self, handle: &DocumentHandle) -> Result<Vec<u8>, RemoteError> {
        Self::validate_name(handle.as_str())?;
        self.ensure_reachable().await?;

        match fs::read(self.doc_path(handle.as_str())).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(RemoteError::NotFound(handle.to_string()))
            }
            Err(e) => Err(RemoteError::Transport(e.to_string())),
        }
    }

    async fn is_available(&self) -> bool {
        self.ensure_reachable().await.is_ok()
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}
