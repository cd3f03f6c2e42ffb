//! Record Store: the canonical RecordSet, validated against the schema and
//! written through to local storage on every mutation.
//!
//! Every mutation builds the next RecordSet, persists it, and only then
//! installs it in memory. A failed write therefore leaves the in-memory set
//! identical to the last successfully persisted one.

use std::collections::{BTreeMap, HashSet};

use crate::error::{StoreError, ValidationError};
use crate::models::{CustomerRecord, FieldDefinition, RecordId, RESERVED_KEYS};
use crate::storage::{DocKind, DocumentStorage};

/// Keys matched by [`RecordStore::search`].
const SEARCH_KEYS: [&str; 4] = ["name", "serialNumber", "location", "ipAddress"];

/// Counts returned by [`RecordStore::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: usize,
    pub updated: usize,
}

/// Owner of the RecordSet.
#[derive(Debug)]
pub struct RecordStore {
    storage: DocumentStorage,
    records: Vec<CustomerRecord>,
}

impl RecordStore {
    /// Loads the RecordSet. A missing document is an empty set.
    pub fn load(storage: DocumentStorage) -> Result<Self, StoreError> {
        let records = storage
            .load::<Vec<CustomerRecord>>(DocKind::Customers)?
            .unwrap_or_default();
        tracing::debug!(count = records.len(), "loaded customers");
        Ok(Self { storage, records })
    }

    /// All records in insertion order, as stored.
    pub fn list(&self) -> &[CustomerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, id: &RecordId) -> Option<&CustomerRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Exact match on the serial number.
    pub fn find_by_serial(&self, serial: &str) -> Option<&CustomerRecord> {
        self.records.iter().find(|r| r.value("serialNumber") == serial)
    }

    /// Case-insensitive substring search over name, serial, location and IP.
    /// A blank query matches everything.
    pub fn search(&self, query: &str) -> Vec<&CustomerRecord> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.records.iter().collect();
        }

        self.records
            .iter()
            .filter(|r| {
                SEARCH_KEYS
                    .iter()
                    .any(|key| r.value(key).to_lowercase().contains(&query))
            })
            .collect()
    }

    pub fn favorites(&self) -> Vec<&CustomerRecord> {
        self.records.iter().filter(|r| r.is_favorite).collect()
    }

    /// Validates `values` against `fields`, then appends and persists a new record.
    pub fn create(
        &mut self,
        fields: &[FieldDefinition],
        values: BTreeMap<String, String>,
    ) -> Result<CustomerRecord, StoreError> {
        check_reserved(&values)?;
        check_required(fields, &values)?;

        let record = CustomerRecord::new(values).with_schema_defaults(fields);

        let mut next = self.records.clone();
        next.push(record.clone());
        self.commit(next)?;

        tracing::debug!(record_id = %record.id, "created customer");
        Ok(record)
    }

    /// Merges `values` into an existing record and bumps `updated_at`.
    pub fn update(
        &mut self,
        fields: &[FieldDefinition],
        id: &RecordId,
        values: BTreeMap<String, String>,
    ) -> Result<CustomerRecord, StoreError> {
        check_reserved(&values)?;
        let index = self.index_of(id)?;

        let mut record = self.records[index].clone();
        record.values.extend(values);
        check_required(fields, &record.values)?;
        record.touch();

        let mut next = self.records.clone();
        next[index] = record.clone();
        self.commit(next)?;

        tracing::debug!(record_id = %record.id, "updated customer");
        Ok(record)
    }

    /// Removes a record. Returns `false` when it was already absent.
    pub fn delete(&mut self, id: &RecordId) -> Result<bool, StoreError> {
        let Some(index) = self.records.iter().position(|r| &r.id == id) else {
            return Ok(false);
        };

        let mut next = self.records.clone();
        next.remove(index);
        self.commit(next)?;

        tracing::debug!(record_id = %id, "deleted customer");
        Ok(true)
    }

    /// Empties the RecordSet and persists the empty set.
    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        self.commit(Vec::new())?;
        tracing::info!("cleared all customers");
        Ok(())
    }

    pub fn toggle_favorite(&mut self, id: &RecordId) -> Result<CustomerRecord, StoreError> {
        let index = self.index_of(id)?;

        let mut record = self.records[index].clone();
        record.is_favorite = !record.is_favorite;
        record.touch();

        let mut next = self.records.clone();
        next[index] = record.clone();
        self.commit(next)?;

        Ok(record)
    }

    /// Replaces the whole RecordSet.
    ///
    /// Required fields are not checked: this is the path for remote snapshots
    /// and spreadsheet imports, which may legitimately hold partial data.
    pub fn replace_all(&mut self, records: Vec<CustomerRecord>) -> Result<(), StoreError> {
        check_unique_ids(&records)?;
        let count = records.len();
        self.commit(records)?;
        tracing::info!(count, "replaced all customers");
        Ok(())
    }

    /// Upserts by id. Known ids take the incoming values and favorite flag
    /// (keeping `created_at`), unknown ids are appended. Like
    /// [`replace_all`](Self::replace_all), required fields are not checked.
    pub fn merge(&mut self, records: Vec<CustomerRecord>) -> Result<MergeReport, StoreError> {
        let mut next = self.records.clone();
        let mut report = MergeReport::default();

        for incoming in records {
            match next.iter_mut().find(|r| r.id == incoming.id) {
                Some(existing) => {
                    existing.values.extend(incoming.values);
                    existing.is_favorite = incoming.is_favorite;
                    existing.touch();
                    report.updated += 1;
                }
                None => {
                    next.push(incoming);
                    report.added += 1;
                }
            }
        }

        self.commit(next)?;
        tracing::info!(added = report.added, updated = report.updated, "merged customers");
        Ok(report)
    }

    fn index_of(&self, id: &RecordId) -> Result<usize, StoreError> {
        self.records
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn commit(&mut self, next: Vec<CustomerRecord>) -> Result<(), StoreError> {
        self.storage.save(DocKind::Customers, &next)?;
        self.records = next;
        Ok(())
    }
}

fn check_reserved(values: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    match values
        .keys()
        .find(|key| RESERVED_KEYS.contains(&key.as_str()))
    {
        Some(key) => Err(ValidationError::ReservedKey(key.clone())),
        None => Ok(()),
    }
}

fn check_required(
    fields: &[FieldDefinition],
    values: &BTreeMap<String, String>,
) -> Result<(), ValidationError> {
    for field in fields.iter().filter(|f| f.required) {
        let blank = values
            .get(&field.key)
            .map(|v| v.trim().is_empty())
            .unwrap_or(true);
        if blank {
            return Err(ValidationError::MissingRequired {
                key: field.key.clone(),
                label: field.label_primary.clone(),
            });
        }
    }
    Ok(())
}

/// Rejects a RecordSet that would carry the same id twice.
pub(crate) fn check_unique_ids(records: &[CustomerRecord]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    match records.iter().find(|r| !seen.insert(&r.id)) {
        Some(duplicate) => Err(ValidationError::DuplicateId(duplicate.id.clone())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_fields;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (RecordStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordStore::load(DocumentStorage::new(temp_dir.path())).unwrap();
        (store, temp_dir)
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn identity(serial: &str) -> BTreeMap<String, String> {
        values(&[("serialNumber", serial), ("location", "X"), ("name", "Y")])
    }

    /// Makes the data directory unwritable by swapping it for a plain file.
    fn break_storage(temp: &TempDir) {
        fs::remove_dir_all(temp.path()).unwrap();
        fs::write(temp.path(), b"").unwrap();
    }

    #[test]
    fn test_create_into_empty_store() {
        let (mut store, _temp) = setup();
        let fields = default_fields();

        let created = store.create(&fields, identity("00001")).unwrap();

        assert_eq!(store.len(), 1);
        let record = &store.list()[0];
        assert_eq!(record.id, created.id);
        assert_eq!(record.value("serialNumber"), "00001");
        assert_eq!(record.value("location"), "X");
        assert_eq!(record.value("name"), "Y");
        for field in &fields[3..] {
            assert_eq!(record.values.get(&field.key).map(String::as_str), Some(""));
        }
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_create_requires_every_required_field() {
        let (mut store, _temp) = setup();
        let fields = default_fields();
        let required = ["serialNumber", "location", "name"];

        // Every non-empty subset of blank required fields must be rejected.
        for mask in 1u8..8 {
            let mut input = identity("00001");
            for (bit, key) in required.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    input.insert(key.to_string(), "   ".into());
                }
            }

            let first_blank = required
                .iter()
                .enumerate()
                .find(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, key)| *key)
                .unwrap();

            match store.create(&fields, input).unwrap_err() {
                StoreError::Validation(ValidationError::MissingRequired { key, .. }) => {
                    assert_eq!(key, first_blank);
                }
                other => panic!("expected MissingRequired, got {other:?}"),
            }
        }

        assert!(store.is_empty());
    }

    #[test]
    fn test_create_missing_key_counts_as_blank() {
        let (mut store, _temp) = setup();
        let err = store
            .create(&default_fields(), values(&[("serialNumber", "1"), ("name", "Y")]))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::MissingRequired { ref key, .. }) if key == "location"
        ));
    }

    #[test]
    fn test_create_rejects_reserved_keys() {
        let (mut store, _temp) = setup();
        let mut input = identity("1");
        input.insert("createdAt".into(), "yesterday".into());

        let err = store.create(&default_fields(), input).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::ReservedKey(_))
        ));
    }

    #[test]
    fn test_ip_fields_are_not_format_checked() {
        let (mut store, _temp) = setup();
        let mut input = identity("1");
        input.insert("ipAddress".into(), "192.168.".into());

        let created = store.create(&default_fields(), input).unwrap();
        assert_eq!(created.value("ipAddress"), "192.168.");
    }

    #[test]
    fn test_update_changes_value_and_bumps_timestamp() {
        let (mut store, _temp) = setup();
        let fields = default_fields();
        let created = store.create(&fields, identity("00001")).unwrap();

        let updated = store
            .update(&fields, &created.id, values(&[("name", "Z")]))
            .unwrap();

        assert_eq!(updated.value("name"), "Z");
        assert_eq!(updated.value("serialNumber"), "00001");
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(store.find(&created.id).unwrap().value("name"), "Z");
    }

    #[test]
    fn test_update_cannot_blank_required_field() {
        let (mut store, _temp) = setup();
        let fields = default_fields();
        let created = store.create(&fields, identity("00001")).unwrap();

        let err = store
            .update(&fields, &created.id, values(&[("location", "")]))
            .unwrap_err();

        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.find(&created.id).unwrap().value("location"), "X");
    }

    #[test]
    fn test_update_unknown_id() {
        let (mut store, _temp) = setup();
        let err = store
            .update(&default_fields(), &RecordId::from("nope"), values(&[("name", "Z")]))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref id) if id.as_str() == "nope"));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (mut store, _temp) = setup();
        let fields = default_fields();
        let keep = store.create(&fields, identity("1")).unwrap();
        let gone = store.create(&fields, identity("2")).unwrap();

        assert!(store.delete(&gone.id).unwrap());
        let after_once = store.list().to_vec();
        assert!(!store.delete(&gone.id).unwrap());

        assert_eq!(store.list(), after_once.as_slice());
        assert_eq!(store.list()[0].id, keep.id);
    }

    #[test]
    fn test_clear_all_persists_empty_set() {
        let (mut store, temp) = setup();
        let fields = default_fields();
        store.create(&fields, identity("1")).unwrap();
        store.create(&fields, identity("2")).unwrap();

        store.clear_all().unwrap();

        assert!(store.is_empty());
        let reloaded = RecordStore::load(DocumentStorage::new(temp.path())).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_toggle_favorite() {
        let (mut store, _temp) = setup();
        let created = store.create(&default_fields(), identity("1")).unwrap();

        let on = store.toggle_favorite(&created.id).unwrap();
        assert!(on.is_favorite);
        assert!(on.updated_at > created.updated_at);
        assert_eq!(store.favorites().len(), 1);

        let off = store.toggle_favorite(&created.id).unwrap();
        assert!(!off.is_favorite);
        assert!(off.updated_at > on.updated_at);
        assert!(store.favorites().is_empty());
    }

    #[test]
    fn test_search_matches_identity_and_ip() {
        let (mut store, _temp) = setup();
        let fields = default_fields();
        let mut input = values(&[("serialNumber", "A-100"), ("location", "Old Town"), ("name", "Khaled")]);
        input.insert("ipAddress".into(), "10.0.0.7".into());
        input.insert("networkName".into(), "hidden-match".into());
        store.create(&fields, input).unwrap();
        store.create(&fields, identity("B-200")).unwrap();

        assert_eq!(store.search("khal").len(), 1);
        assert_eq!(store.search("old town").len(), 1);
        assert_eq!(store.search("10.0.0").len(), 1);
        assert_eq!(store.search("b-2").len(), 1);
        assert!(store.search("hidden").is_empty());
        assert_eq!(store.search("  ").len(), 2);
    }

    #[test]
    fn test_find_by_serial() {
        let (mut store, _temp) = setup();
        let created = store.create(&default_fields(), identity("00077")).unwrap();

        assert_eq!(store.find_by_serial("00077").unwrap().id, created.id);
        assert!(store.find_by_serial("0007").is_none());
    }

    #[test]
    fn test_records_survive_reload_in_order() {
        let (mut store, temp) = setup();
        let fields = default_fields();
        for serial in ["3", "1", "2"] {
            store.create(&fields, identity(serial)).unwrap();
        }

        let reloaded = RecordStore::load(DocumentStorage::new(temp.path())).unwrap();

        assert_eq!(reloaded.list(), store.list());
        let serials: Vec<&str> = reloaded.list().iter().map(|r| r.value("serialNumber")).collect();
        assert_eq!(serials, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_failed_create_rolls_back() {
        let (mut store, temp) = setup();
        let fields = default_fields();
        store.create(&fields, identity("1")).unwrap();
        let before = store.list().to_vec();

        break_storage(&temp);
        let err = store.create(&fields, identity("2")).unwrap_err();

        assert!(matches!(err, StoreError::Persistence(_)));
        assert_eq!(store.list(), before.as_slice());
        fs::remove_file(temp.path()).unwrap();
    }

    #[test]
    fn test_failed_update_rolls_back() {
        let (mut store, temp) = setup();
        let fields = default_fields();
        let created = store.create(&fields, identity("1")).unwrap();

        break_storage(&temp);
        let err = store
            .update(&fields, &created.id, values(&[("name", "Z")]))
            .unwrap_err();

        assert!(matches!(err, StoreError::Persistence(_)));
        assert_eq!(store.find(&created.id).unwrap(), &created);
        fs::remove_file(temp.path()).unwrap();
    }

    #[test]
    fn test_replace_all_skips_required_checks() {
        let (mut store, _temp) = setup();
        store.create(&default_fields(), identity("1")).unwrap();

        let partial = CustomerRecord::new(values(&[("name", "only a name")]));
        store.replace_all(vec![partial.clone()]).unwrap();

        assert_eq!(store.list(), &[partial]);
    }

    #[test]
    fn test_replace_all_rejects_duplicate_ids() {
        let (mut store, _temp) = setup();
        let original = store.create(&default_fields(), identity("1")).unwrap();

        let record = CustomerRecord::new(BTreeMap::new());
        let err = store
            .replace_all(vec![record.clone(), record])
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::DuplicateId(_))
        ));
        assert_eq!(store.list(), &[original]);
    }

    #[test]
    fn test_merge_upserts_by_id() {
        let (mut store, _temp) = setup();
        let fields = default_fields();
        let existing = store.create(&fields, identity("1")).unwrap();

        let mut changed = existing.clone();
        changed.values = values(&[("name", "Renamed")]);
        changed.is_favorite = true;
        let fresh = CustomerRecord::new(values(&[("serialNumber", "9")]));

        let report = store.merge(vec![changed, fresh.clone()]).unwrap();

        assert_eq!(report, MergeReport { added: 1, updated: 1 });
        let merged = store.find(&existing.id).unwrap();
        assert_eq!(merged.value("name"), "Renamed");
        assert_eq!(merged.value("serialNumber"), "1");
        assert!(merged.is_favorite);
        assert_eq!(merged.created_at, existing.created_at);
        assert!(merged.updated_at > existing.updated_at);
        assert_eq!(store.list()[1].id, fresh.id);
    }
}
