//! The customer book: one installation's schema and records.
//!
//! Presentation code holds a [`CustomerBook`] (or a [`SharedBook`] when a
//! sync engine also needs access) and calls into it. Everything it hands out
//! is already defaulted against the current schema.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::{CustomerRecord, FieldDefinition, FieldType, RecordId};
use crate::schema::{Direction, FieldRegistry};
use crate::storage::DocumentStorage;
use crate::store::{check_unique_ids, MergeReport, RecordStore};

/// A book shared between presentation code and the sync engine.
pub type SharedBook = Arc<RwLock<CustomerBook>>;

#[derive(Debug)]
pub struct CustomerBook {
    storage: DocumentStorage,
    registry: FieldRegistry,
    records: RecordStore,
}

impl CustomerBook {
    /// Loads schema and records from `storage`.
    pub fn open(storage: DocumentStorage) -> Result<Self, StoreError> {
        let registry = FieldRegistry::load(storage.clone())?;
        let records = RecordStore::load(storage.clone())?;
        Ok(Self {
            storage,
            registry,
            records,
        })
    }

    /// Re-reads schema and records from storage, picking up writes made by
    /// other handles on the same data directory. Unchanged on failure.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        *self = Self::open(self.storage.clone())?;
        Ok(())
    }

    pub fn into_shared(self) -> SharedBook {
        Arc::new(RwLock::new(self))
    }

    // ========== Fields ==========

    pub fn fields(&self) -> &[FieldDefinition] {
        self.registry.list()
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn add_field(
        &mut self,
        label_primary: &str,
        label_secondary: &str,
        field_type: FieldType,
    ) -> Result<FieldDefinition, StoreError> {
        self.registry.add(label_primary, label_secondary, field_type)
    }

    /// Removes a field definition. Values already stored under its key stay
    /// on the records as orphaned attributes.
    pub fn remove_field(&mut self, field_id: &str) -> Result<FieldDefinition, StoreError> {
        self.registry.remove(field_id)
    }

    pub fn reorder_field(&mut self, field_id: &str, direction: Direction) -> Result<(), StoreError> {
        self.registry.reorder(field_id, direction)
    }

    pub fn replace_fields(&mut self, fields: Vec<FieldDefinition>) -> Result<(), StoreError> {
        self.registry.replace_all(fields)
    }

    // ========== Records ==========

    pub fn customers(&self) -> Vec<CustomerRecord> {
        self.with_defaults(self.records.list().iter())
    }

    pub fn find(&self, id: &RecordId) -> Option<CustomerRecord> {
        self.records
            .find(id)
            .map(|r| r.clone().with_schema_defaults(self.fields()))
    }

    /// Looks a record up by id, falling back to an exact serial number match.
    pub fn resolve(&self, identifier: &str) -> Option<CustomerRecord> {
        self.find(&RecordId::from(identifier)).or_else(|| {
            self.records
                .find_by_serial(identifier)
                .map(|r| r.clone().with_schema_defaults(self.fields()))
        })
    }

    pub fn search(&self, query: &str) -> Vec<CustomerRecord> {
        self.with_defaults(self.records.search(query).into_iter())
    }

    pub fn favorites(&self) -> Vec<CustomerRecord> {
        self.with_defaults(self.records.favorites().into_iter())
    }

    pub fn create(&mut self, values: BTreeMap<String, String>) -> Result<CustomerRecord, StoreError> {
        self.records.create(self.registry.list(), values)
    }

    pub fn update(
        &mut self,
        id: &RecordId,
        values: BTreeMap<String, String>,
    ) -> Result<CustomerRecord, StoreError> {
        let record = self.records.update(self.registry.list(), id, values)?;
        Ok(record.with_schema_defaults(self.registry.list()))
    }

    pub fn delete(&mut self, id: &RecordId) -> Result<bool, StoreError> {
        self.records.delete(id)
    }

    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        self.records.clear_all()
    }

    pub fn toggle_favorite(&mut self, id: &RecordId) -> Result<CustomerRecord, StoreError> {
        let record = self.records.toggle_favorite(id)?;
        Ok(record.with_schema_defaults(self.registry.list()))
    }

    pub fn replace_customers(&mut self, records: Vec<CustomerRecord>) -> Result<(), StoreError> {
        self.records.replace_all(records)
    }

    pub fn merge_customers(&mut self, records: Vec<CustomerRecord>) -> Result<MergeReport, StoreError> {
        self.records.merge(records)
    }

    // ========== Snapshots ==========

    /// Records defaulted against the current schema, plus the schema itself.
    pub fn snapshot(&self) -> (Vec<CustomerRecord>, Vec<FieldDefinition>) {
        (self.customers(), self.registry.list().to_vec())
    }

    /// Overwrites local schema and records with a pulled snapshot.
    ///
    /// Both halves are validated before either is written.
    pub fn apply_snapshot(
        &mut self,
        records: Vec<CustomerRecord>,
        fields: Vec<FieldDefinition>,
    ) -> Result<(), StoreError> {
        check_unique_ids(&records)?;
        self.registry.restore(fields)?;
        self.records.replace_all(records)
    }

    fn with_defaults<'a>(
        &self,
        records: impl Iterator<Item = &'a CustomerRecord>,
    ) -> Vec<CustomerRecord> {
        records
            .map(|r| r.clone().with_schema_defaults(self.fields()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_fields;
    use tempfile::TempDir;

    fn setup() -> (CustomerBook, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let book = CustomerBook::open(DocumentStorage::new(temp_dir.path())).unwrap();
        (book, temp_dir)
    }

    fn identity(serial: &str) -> BTreeMap<String, String> {
        [("serialNumber", serial), ("location", "X"), ("name", "Y")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_new_field_reads_as_empty_on_old_records() {
        let (mut book, _temp) = setup();
        let created = book.create(identity("1")).unwrap();

        let field = book.add_field("الراوتر", "Router", FieldType::Text).unwrap();

        let record = book.find(&created.id).unwrap();
        assert_eq!(record.values.get(&field.key).map(String::as_str), Some(""));
        assert_eq!(book.customers()[0].value(&field.key), "");
    }

    #[test]
    fn test_removed_field_values_are_kept() {
        let (mut book, temp) = setup();
        let mut input = identity("1");
        input.insert("pointName".into(), "Tower 3".into());
        let created = book.create(input).unwrap();

        book.remove_field("4").unwrap();

        let reopened = CustomerBook::open(DocumentStorage::new(temp.path())).unwrap();
        let record = reopened.find(&created.id).unwrap();
        assert_eq!(record.value("pointName"), "Tower 3");
        assert!(reopened.registry().get_by_key("pointName").is_none());
    }

    #[test]
    fn test_new_required_field_is_enforced() {
        let (mut book, _temp) = setup();
        let mut fields = book.fields().to_vec();
        fields[3].required = true;
        book.replace_fields(fields).unwrap();

        let err = book.create(identity("1")).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(crate::error::ValidationError::MissingRequired { ref key, .. })
                if key == "pointName"
        ));
    }

    #[test]
    fn test_resolve_by_id_or_serial() {
        let (mut book, _temp) = setup();
        let created = book.create(identity("00009")).unwrap();

        assert_eq!(book.resolve(created.id.as_str()).unwrap().id, created.id);
        assert_eq!(book.resolve("00009").unwrap().id, created.id);
        assert!(book.resolve("missing").is_none());
    }

    #[test]
    fn test_apply_snapshot_replaces_everything() {
        let (mut book, _temp) = setup();
        book.create(identity("local")).unwrap();
        book.remove_field("12").unwrap();

        let remote = CustomerRecord::new(identity("remote")).with_schema_defaults(&default_fields());
        book.apply_snapshot(vec![remote.clone()], default_fields())
            .unwrap();

        assert_eq!(book.fields().len(), 12);
        assert_eq!(book.customers(), vec![remote]);
    }

    #[test]
    fn test_apply_snapshot_rejects_duplicates_before_writing() {
        let (mut book, _temp) = setup();
        book.create(identity("local")).unwrap();
        let mut fields = default_fields();
        fields.truncate(5);

        let record = CustomerRecord::new(identity("dup"));
        let err = book
            .apply_snapshot(vec![record.clone(), record], fields)
            .unwrap_err();

        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(book.fields().len(), 12);
        assert_eq!(book.customers().len(), 1);
    }

    #[test]
    fn test_snapshot_without_fields_keeps_identity_required() {
        let (mut book, temp) = setup();
        let snapshot: crate::sync::RemoteSnapshot = serde_json::from_str(
            r#"{"customers":[],"lastUpdated":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        book.apply_snapshot(snapshot.customers, snapshot.fields)
            .unwrap();

        assert_eq!(book.fields().len(), 12);
        assert!(book.create(BTreeMap::new()).is_err());

        let reopened = CustomerBook::open(DocumentStorage::new(temp.path())).unwrap();
        assert!(reopened
            .fields()
            .iter()
            .all(|f| !reopened.registry().retired_keys().contains(&f.key)));
    }

    #[test]
    fn test_apply_snapshot_rejects_demoted_identity_field() {
        let (mut book, _temp) = setup();
        let mut fields = default_fields();
        fields[0].required = false;

        let err = book.apply_snapshot(Vec::new(), fields).unwrap_err();

        assert!(matches!(err, StoreError::ProtectedField { ref key } if key == "serialNumber"));
        assert!(book.fields()[0].required);
    }

    #[test]
    fn test_reload_picks_up_other_writers() {
        let (mut book, temp) = setup();
        let mut other = CustomerBook::open(DocumentStorage::new(temp.path())).unwrap();
        other.create(identity("from-other")).unwrap();

        assert!(book.customers().is_empty());
        book.reload().unwrap();

        assert_eq!(book.customers()[0].value("serialNumber"), "from-other");
    }

    #[test]
    fn test_snapshot_defaults_fields_added_later() {
        let (mut book, _temp) = setup();
        book.create(identity("1")).unwrap();
        let field = book.add_field("الراوتر", "Router", FieldType::Text).unwrap();

        let (customers, fields) = book.snapshot();

        assert_eq!(fields.len(), 13);
        assert_eq!(customers[0].values.get(&field.key).map(String::as_str), Some(""));
    }
}
