//! Sync engine: pushes the whole book to a single remote document.
//!
//! Conflict policy is last-writer-wins on the entire snapshot. A push never
//! reads the remote document's contents, and a pull never writes local
//! state; combining a pull with a local replace is left to the caller.
//! Each push re-reads the book from storage first, so a long-lived engine
//! uploads what is on disk rather than what it saw at startup.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::error::SyncError;
use super::remote::{DocumentHandle, RemoteStore};
use super::snapshot::{RemoteSnapshot, SyncMetadata};
use crate::book::SharedBook;
use crate::storage::{DocKind, DocumentStorage};

/// Name of the remote document when none is configured.
pub const DEFAULT_DOCUMENT_NAME: &str = "net_customers_backup.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Syncing,
}

/// Result of a [`SyncEngine::manual_sync`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Snapshot written to the remote.
    Uploaded {
        document: DocumentHandle,
        records: usize,
    },
    /// Another sync was already in flight; this call did nothing.
    Skipped,
}

/// Clears the in-flight flag when the owning sync attempt ends, including
/// when its future is dropped mid-flight.
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncEngine {
    book: SharedBook,
    remote: Arc<dyn RemoteStore>,
    storage: DocumentStorage,
    document_name: String,
    metadata: Mutex<SyncMetadata>,
    last_error: Mutex<Option<String>>,
    in_flight: AtomicBool,
}

impl SyncEngine {
    /// Creates an engine, loading sync metadata from `storage`.
    pub fn new(
        book: SharedBook,
        remote: Arc<dyn RemoteStore>,
        storage: DocumentStorage,
    ) -> Result<Self, SyncError> {
        let metadata = storage
            .load::<SyncMetadata>(DocKind::SyncSettings)?
            .unwrap_or_default();

        Ok(Self {
            book,
            remote,
            storage,
            document_name: DEFAULT_DOCUMENT_NAME.to_string(),
            metadata: Mutex::new(metadata),
            last_error: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn with_document_name(mut self, name: impl Into<String>) -> Self {
        self.document_name = name.into();
        self
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn book(&self) -> &SharedBook {
        &self.book
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    pub async fn metadata(&self) -> SyncMetadata {
        self.metadata.lock().await.clone()
    }

    pub fn status(&self) -> SyncStatus {
        if self.in_flight.load(Ordering::Acquire) {
            SyncStatus::Syncing
        } else {
            SyncStatus::Idle
        }
    }

    /// Message of the most recent failed sync, cleared when a new one starts.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    pub async fn set_auto_sync(&self, enabled: bool) -> Result<(), SyncError> {
        self.update_metadata(|m| m.auto_sync_enabled = enabled).await
    }

    /// Uploads the current book as the remote snapshot.
    ///
    /// Single-flight: while an attempt is running, further calls return
    /// [`SyncOutcome::Skipped`] immediately. On failure local records and
    /// `last_sync_time` are left untouched.
    pub async fn manual_sync(&self) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = FlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("sync already in flight, skipping");
            return Ok(SyncOutcome::Skipped);
        };

        *self.last_error.lock().await = None;

        let result = self.push_snapshot().await;
        match &result {
            Ok(SyncOutcome::Uploaded { document, records }) => {
                tracing::info!(document = %document, records, "sync complete");
            }
            Ok(SyncOutcome::Skipped) => {}
            Err(e) => {
                tracing::warn!(error = %e, "sync failed");
                *self.last_error.lock().await = Some(e.to_string());
            }
        }
        result
    }

    /// Downloads the remote snapshot without touching local state.
    ///
    /// Returns `Ok(None)` when the remote has no document yet.
    pub async fn pull(&self) -> Result<Option<RemoteSnapshot>, SyncError> {
        let Some(handle) = self.remote.find_document(&self.document_name).await? else {
            return Ok(None);
        };

        let bytes = self.remote.download(&handle).await?;
        let snapshot: RemoteSnapshot = serde_json::from_slice(&bytes).map_err(SyncError::Decode)?;

        tracing::info!(
            document = %handle,
            records = snapshot.customers.len(),
            "pulled remote snapshot"
        );
        Ok(Some(snapshot))
    }

    /// Reacts to a connectivity event. Going online with autosync enabled
    /// starts one sync attempt; anything else does nothing and returns `None`.
    pub async fn on_connectivity_change(
        &self,
        online: bool,
    ) -> Option<Result<SyncOutcome, SyncError>> {
        if !online || !self.metadata.lock().await.auto_sync_enabled {
            return None;
        }
        tracing::debug!("connectivity restored, starting autosync");
        Some(self.manual_sync().await)
    }

    /// Spawns a task feeding connectivity changes into
    /// [`on_connectivity_change`](Self::on_connectivity_change).
    ///
    /// Each event is handled to completion before the next is read, and the
    /// channel only keeps the latest value, so events that arrive during a
    /// sync collapse into one. Failures are logged, not retried. The task
    /// ends when the sender is dropped.
    pub fn watch_connectivity(self: Arc<Self>, mut online: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while online.changed().await.is_ok() {
                let is_online = *online.borrow_and_update();
                if let Some(Err(e)) = self.on_connectivity_change(is_online).await {
                    tracing::warn!(error = %e, "autosync failed");
                }
            }
        })
    }

    async fn push_snapshot(&self) -> Result<SyncOutcome, SyncError> {
        // Other handles on the same data directory may have written since
        // this book was opened.
        let (customers, fields) = {
            let mut book = self.book.write().await;
            book.reload()?;
            book.snapshot()
        };
        let records = customers.len();

        let snapshot = RemoteSnapshot {
            customers,
            fields,
            last_updated: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot).map_err(SyncError::Encode)?;

        let existing = self.remote.find_document(&self.document_name).await?;
        let document = self
            .remote
            .upload(existing.as_ref(), &self.document_name, bytes)
            .await?;

        let synced_at = snapshot.last_updated;
        let handle = document.to_string();
        self.update_metadata(move |m| {
            m.last_sync_time = Some(synced_at);
            m.remote_file_id = Some(handle);
        })
        .await?;

        Ok(SyncOutcome::Uploaded { document, records })
    }

    /// Persists a modified copy of the metadata, then installs it.
    async fn update_metadata(
        &self,
        change: impl FnOnce(&mut SyncMetadata),
    ) -> Result<(), SyncError> {
        let mut metadata = self.metadata.lock().await;
        let mut next = metadata.clone();
        change(&mut next);
        self.storage.save(DocKind::SyncSettings, &next)?;
        *metadata = next;
        Ok(())
    }
}
