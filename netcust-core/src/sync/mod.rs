//! Whole-snapshot backup of the customer book to a remote document store.
//!
//! ## Flow
//!
//! 1. Snapshot records and field definitions under a read lock
//! 2. Find the remote document by name
//! 3. Overwrite it (or create it) with the JSON snapshot
//! 4. Persist `lastSyncTime` and the document handle locally
//!
//! Local state is never modified by a sync. Pulled snapshots are returned to
//! the caller, which decides whether to apply them.

mod directory;
mod engine;
mod error;
mod remote;
mod snapshot;

pub use directory::DirectoryRemote;
pub use engine::{SyncEngine, SyncOutcome, SyncStatus, DEFAULT_DOCUMENT_NAME};
pub use error::SyncError;
pub use remote::{DocumentHandle, RemoteError, RemoteStore, UnavailableRemote};
pub use snapshot::{RemoteSnapshot, SyncMetadata};
