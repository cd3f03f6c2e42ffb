//! Documents owned by the sync engine: local sync metadata and the remote
//! snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CustomerRecord, FieldDefinition};

/// Sync bookkeeping persisted next to the RecordSet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    #[serde(default, alias = "autoSync")]
    pub auto_sync_enabled: bool,
    #[serde(default)]
    pub last_sync_time: Option<DateTime<Utc>>,
    #[serde(default, alias = "googleDriveFileId")]
    pub remote_file_id: Option<String>,
}

/// The whole store as one remote document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSnapshot {
    pub customers: Vec<CustomerRecord>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_fields;
    use std::collections::BTreeMap;

    #[test]
    fn test_metadata_defaults() {
        let metadata: SyncMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(metadata, SyncMetadata::default());
    }

    #[test]
    fn test_metadata_accepts_legacy_names() {
        let json = r#"{"autoSync":true,"lastSyncTime":null,"googleDriveFileId":"abc"}"#;
        let metadata: SyncMetadata = serde_json::from_str(json).unwrap();
        assert!(metadata.auto_sync_enabled);
        assert!(metadata.last_sync_time.is_none());
        assert_eq!(metadata.remote_file_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_snapshot_wire_shape() {
        let snapshot = RemoteSnapshot {
            customers: vec![CustomerRecord::new(BTreeMap::from([(
                "name".to_string(),
                "Ali".to_string(),
            )]))],
            fields: default_fields(),
            last_updated: Utc::now(),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["customers"][0]["name"], "Ali");
        assert_eq!(json["fields"][0]["key"], "serialNumber");
        assert!(json["lastUpdated"].is_string());

        let parsed: RemoteSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
