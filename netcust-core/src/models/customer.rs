use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::field::FieldDefinition;

/// Attribute names owned by record metadata. Field keys may never use them.
pub const RESERVED_KEYS: [&str; 4] = ["id", "createdAt", "updatedAt", "isFavorite"];

/// Opaque record identifier. Assigned once at creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One customer: schema-driven attribute values plus fixed metadata.
///
/// On the wire the values are flattened next to the metadata, so a record
/// looks like `{"id": .., "serialNumber": .., "createdAt": .., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RecordWire", into = "RecordWire")]
pub struct CustomerRecord {
    pub id: RecordId,
    pub values: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_favorite: bool,
}

impl CustomerRecord {
    /// Creates a record with a fresh id and `created_at == updated_at == now`.
    pub fn new(values: BTreeMap<String, String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            values,
            created_at: now,
            updated_at: now,
            is_favorite: false,
        }
    }

    /// Returns the value stored under `key`, or `""` when absent.
    pub fn value(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    /// Fills every key of the schema that the record does not carry with `""`.
    pub fn with_schema_defaults(mut self, fields: &[FieldDefinition]) -> Self {
        for field in fields {
            self.values.entry(field.key.clone()).or_default();
        }
        self
    }

    /// Bumps `updated_at`, never moving it backwards.
    pub fn touch(&mut self) {
        self.updated_at = next_timestamp(self.updated_at);
    }
}

/// Returns `now`, or one microsecond past `previous` when the clock has not
/// advanced beyond it.
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    is_favorite: bool,
    #[serde(flatten)]
    values: BTreeMap<String, Value>,
}

impl From<RecordWire> for CustomerRecord {
    fn from(wire: RecordWire) -> Self {
        let created_at = wire.created_at.unwrap_or_else(Utc::now);
        let values = wire
            .values
            .into_iter()
            .map(|(key, value)| (key, value_to_string(value)))
            .collect();

        Self {
            id: wire.id.unwrap_or_else(RecordId::generate),
            values,
            created_at,
            updated_at: wire.updated_at.unwrap_or(created_at),
            is_favorite: wire.is_favorite,
        }
    }
}

impl From<CustomerRecord> for RecordWire {
    fn from(record: CustomerRecord) -> Self {
        let values = record
            .values
            .into_iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key, Value::String(value)))
            .collect();

        Self {
            id: Some(record.id),
            created_at: Some(record.created_at),
            updated_at: Some(record.updated_at),
            is_favorite: record.is_favorite,
            values,
        }
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_fields;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_record_new() {
        let record = CustomerRecord::new(values(&[("name", "Ali")]));
        assert_eq!(record.value("name"), "Ali");
        assert_eq!(record.value("location"), "");
        assert_eq!(record.created_at, record.updated_at);
        assert!(!record.is_favorite);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = CustomerRecord::new(BTreeMap::new());
        let b = CustomerRecord::new(BTreeMap::new());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_schema_defaults_fill_missing_keys() {
        let record =
            CustomerRecord::new(values(&[("name", "Ali")])).with_schema_defaults(&default_fields());
        assert_eq!(record.values.len(), 12);
        assert_eq!(record.values["name"], "Ali");
        assert_eq!(record.values["gatewayIp"], "");
    }

    #[test]
    fn test_touch_is_strictly_increasing() {
        let mut record = CustomerRecord::new(BTreeMap::new());
        let mut previous = record.updated_at;
        for _ in 0..100 {
            record.touch();
            assert!(record.updated_at > previous);
            previous = record.updated_at;
        }
    }

    #[test]
    fn test_next_timestamp_from_future() {
        let future = Utc::now() + Duration::hours(1);
        assert_eq!(next_timestamp(future), future + Duration::microseconds(1));
    }

    #[test]
    fn test_json_is_flat() {
        let mut record = CustomerRecord::new(values(&[("serialNumber", "00001")]));
        record.is_favorite = true;

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["serialNumber"], "00001");
        assert_eq!(json["isFavorite"], true);
        assert!(json.get("values").is_none());
        assert!(json.get("createdAt").is_some());

        let parsed: CustomerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_parse_legacy_record() {
        let json = r#"{
            "id": "1712345678901",
            "serialNumber": "00042",
            "name": "Omar",
            "packageSpeed": 8,
            "note": null,
            "createdAt": "2024-04-05T10:00:00.000Z",
            "updatedAt": "2024-04-06T10:00:00.000Z"
        }"#;
        let record: CustomerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id.as_str(), "1712345678901");
        assert_eq!(record.value("packageSpeed"), "8");
        assert_eq!(record.value("note"), "");
        assert!(!record.is_favorite);
        assert!(record.updated_at > record.created_at);
    }

    #[test]
    fn test_parse_record_without_metadata() {
        let record: CustomerRecord = serde_json::from_str(r#"{"name":"Sara"}"#).unwrap();
        assert_eq!(record.value("name"), "Sara");
        assert_eq!(record.created_at, record.updated_at);
        assert!(!record.id.as_str().is_empty());
    }

    #[test]
    fn test_reserved_keys_never_serialized_twice() {
        let mut record = CustomerRecord::new(values(&[("id", "spoof")]));
        record.id = RecordId::from("real");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json.matches("\"id\"").count(), 1);
        assert!(json.contains("\"real\""));
    }
}
