//! Netcust Core Library
//!
//! Customer records for network installations: a user-editable field
//! schema, the record store, CSV export/import and remote backup sync.

pub mod book;
pub mod error;
pub mod models;
pub mod schema;
pub mod storage;
pub mod store;
pub mod sync;
pub mod tabular;

pub use book::{CustomerBook, SharedBook};
pub use error::{StoreError, ValidationError};
pub use models::{
    default_fields, CustomerRecord, FieldDefinition, FieldType, RecordId, RESERVED_KEYS,
};
pub use schema::{Direction, FieldRegistry};
pub use storage::{DocKind, DocumentStorage, StorageError};
pub use store::{MergeReport, RecordStore};
pub use sync::{
    DirectoryRemote, DocumentHandle, RemoteError, RemoteSnapshot, RemoteStore, SyncEngine,
    SyncError, SyncMetadata, SyncOutcome, SyncStatus, UnavailableRemote, DEFAULT_DOCUMENT_NAME,
};
pub use tabular::{CodecError, HeaderStyle};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
