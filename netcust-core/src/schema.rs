//! Schema Registry: the ordered, user-editable list of field definitions.
//!
//! Fields are kept sorted by `order`, and `order` is always the dense
//! sequence `1..=N`. Removed field keys are remembered as tombstones so a
//! later `add` can never hand out a key that orphaned record values still use.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

use crate::error::{StoreError, ValidationError};
use crate::models::{default_fields, FieldDefinition, FieldType, IDENTITY_KEYS, RESERVED_KEYS};
use crate::storage::{DocKind, DocumentStorage};

/// Direction for [`FieldRegistry::reorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryState {
    fields: Vec<FieldDefinition>,
    #[serde(default)]
    retired_keys: BTreeSet<String>,
}

/// Accepts both the current document and the bare array older installs wrote.
#[derive(Deserialize)]
#[serde(untagged)]
enum RegistryDocument {
    Current(RegistryState),
    Legacy(Vec<FieldDefinition>),
}

/// The persisted, ordered set of field definitions.
#[derive(Debug)]
pub struct FieldRegistry {
    storage: DocumentStorage,
    state: RegistryState,
}

impl FieldRegistry {
    /// Loads the registry, falling back to the built-in fields when nothing
    /// (or an empty list) has been stored yet.
    pub fn load(storage: DocumentStorage) -> Result<Self, StoreError> {
        let mut state = match storage.load::<RegistryDocument>(DocKind::Fields)? {
            Some(RegistryDocument::Current(state)) => state,
            Some(RegistryDocument::Legacy(fields)) => RegistryState {
                fields,
                retired_keys: BTreeSet::new(),
            },
            None => RegistryState::default(),
        };

        if state.fields.is_empty() {
            state.fields = default_fields();
        }
        let live: HashSet<String> = state.fields.iter().map(|f| f.key.clone()).collect();
        state.retired_keys.retain(|key| !live.contains(key));

        // Stable sort keeps insertion order for ties.
        state.fields.sort_by_key(|f| f.order);
        renumber(&mut state.fields);

        Ok(Self { storage, state })
    }

    /// Fields sorted by `order`.
    pub fn list(&self) -> &[FieldDefinition] {
        &self.state.fields
    }

    pub fn get(&self, field_id: &str) -> Option<&FieldDefinition> {
        self.state.fields.iter().find(|f| f.id == field_id)
    }

    pub fn get_by_key(&self, key: &str) -> Option<&FieldDefinition> {
        self.state.fields.iter().find(|f| f.key == key)
    }

    /// Keys of removed fields. Never handed out again.
    pub fn retired_keys(&self) -> &BTreeSet<String> {
        &self.state.retired_keys
    }

    /// Appends a new optional field with a generated key.
    pub fn add(
        &mut self,
        label_primary: &str,
        label_secondary: &str,
        field_type: FieldType,
    ) -> Result<FieldDefinition, StoreError> {
        let label_primary = label_primary.trim();
        let label_secondary = label_secondary.trim();
        if label_primary.is_empty() || label_secondary.is_empty() {
            return Err(ValidationError::BlankLabel.into());
        }

        let key = self.generate_key();
        let order = self.state.fields.len() as u32 + 1;
        let field = FieldDefinition::new(
            Uuid::new_v4().to_string(),
            key,
            label_primary,
            label_secondary,
            field_type,
            order,
        );

        let mut next = self.state.clone();
        next.fields.push(field.clone());
        self.commit(next)?;

        tracing::info!(key = %field.key, "added field");
        Ok(field)
    }

    /// Removes a non-required field and retires its key.
    pub fn remove(&mut self, field_id: &str) -> Result<FieldDefinition, StoreError> {
        let index = self.index_of(field_id)?;
        let field = &self.state.fields[index];
        if field.required {
            return Err(StoreError::ProtectedField {
                key: field.key.clone(),
            });
        }

        let mut next = self.state.clone();
        let removed = next.fields.remove(index);
        next.retired_keys.insert(removed.key.clone());
        renumber(&mut next.fields);
        self.commit(next)?;

        tracing::info!(key = %removed.key, "removed field");
        Ok(removed)
    }

    /// Swaps a field with its neighbour. Moving past either end is a no-op.
    pub fn reorder(&mut self, field_id: &str, direction: Direction) -> Result<(), StoreError> {
        let index = self.index_of(field_id)?;
        let target = match direction {
            Direction::Up if index > 0 => index - 1,
            Direction::Down if index + 1 < self.state.fields.len() => index + 1,
            _ => return Ok(()),
        };

        let mut next = self.state.clone();
        next.fields.swap(index, target);
        renumber(&mut next.fields);
        self.commit(next)
    }

    /// Atomically replaces the whole list, as the field editor does on save.
    ///
    /// The new list must have unique, non-retired, non-reserved keys, non-blank
    /// labels and a dense `1..=N` order. Fields missing from the new list are
    /// removed (and retired). Dropping or demoting a required field is
    /// rejected.
    pub fn replace_all(&mut self, fields: Vec<FieldDefinition>) -> Result<(), StoreError> {
        let fields = validate_list(fields)?;

        if let Some(key) = fields
            .iter()
            .map(|f| &f.key)
            .find(|key| self.state.retired_keys.contains(*key))
        {
            return Err(ValidationError::RetiredKey(key.clone()).into());
        }

        let mut protected: Vec<&str> = self
            .state
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.key.as_str())
            .collect();
        protected.extend(IDENTITY_KEYS);
        check_protected(&fields, &protected)?;

        let incoming: HashSet<&str> = fields.iter().map(|f| f.key.as_str()).collect();
        let dropped: Vec<&FieldDefinition> = self
            .state
            .fields
            .iter()
            .filter(|f| !incoming.contains(f.key.as_str()))
            .collect();

        let mut next = RegistryState {
            fields,
            retired_keys: self.state.retired_keys.clone(),
        };
        next.retired_keys
            .extend(dropped.into_iter().map(|f| f.key.clone()));
        self.commit(next)
    }

    /// Adopts a schema received from a remote snapshot.
    ///
    /// Applies the same structural checks as [`replace_all`](Self::replace_all)
    /// but accepts keys this device had retired: the snapshot is authoritative
    /// for the fields it carries, so those keys come back to life. A snapshot
    /// without fields stands for the built-in schema. The identity fields must
    /// be present and required.
    pub fn restore(&mut self, fields: Vec<FieldDefinition>) -> Result<(), StoreError> {
        let fields = if fields.is_empty() {
            default_fields()
        } else {
            fields
        };
        let fields = validate_list(fields)?;
        check_protected(&fields, &IDENTITY_KEYS)?;

        let incoming: HashSet<&str> = fields.iter().map(|f| f.key.as_str()).collect();
        let mut retired_keys: BTreeSet<String> = self
            .state
            .retired_keys
            .iter()
            .filter(|key| !incoming.contains(key.as_str()))
            .cloned()
            .collect();
        retired_keys.extend(
            self.state
                .fields
                .iter()
                .filter(|f| !incoming.contains(f.key.as_str()))
                .map(|f| f.key.clone()),
        );

        self.commit(RegistryState {
            fields,
            retired_keys,
        })
    }

    fn index_of(&self, field_id: &str) -> Result<usize, StoreError> {
        self.state
            .fields
            .iter()
            .position(|f| f.id == field_id)
            .ok_or_else(|| StoreError::FieldNotFound(field_id.to_string()))
    }

    /// Persists `next`, then installs it. Memory is untouched on failure.
    fn commit(&mut self, next: RegistryState) -> Result<(), StoreError> {
        self.storage.save(DocKind::Fields, &next)?;
        self.state = next;
        Ok(())
    }

    fn generate_key(&self) -> String {
        loop {
            let suffix: String = rand::rng()
                .sample_iter(rand::distr::Alphanumeric)
                .take(6)
                .map(|b| char::from(b).to_ascii_lowercase())
                .collect();
            let key = format!("custom_{}_{}", Utc::now().timestamp_millis(), suffix);

            let taken = self.get_by_key(&key).is_some() || self.state.retired_keys.contains(&key);
            if !taken {
                return key;
            }
        }
    }
}

fn renumber(fields: &mut [FieldDefinition]) {
    for (field, order) in fields.iter_mut().zip(1u32..) {
        field.order = order;
    }
}

/// Structural checks shared by `replace_all` and `restore`. Returns the list
/// sorted by `order`.
fn validate_list(mut fields: Vec<FieldDefinition>) -> Result<Vec<FieldDefinition>, StoreError> {
    if fields.is_empty() {
        return Err(ValidationError::EmptySchema.into());
    }

    let mut seen = HashSet::new();
    for field in &fields {
        if field.label_primary.trim().is_empty() || field.label_secondary.trim().is_empty() {
            return Err(ValidationError::BlankLabel.into());
        }
        if RESERVED_KEYS.contains(&field.key.as_str()) {
            return Err(ValidationError::ReservedKey(field.key.clone()).into());
        }
        if !seen.insert(field.key.as_str()) {
            return Err(ValidationError::DuplicateKey(field.key.clone()).into());
        }
    }

    fields.sort_by_key(|f| f.order);
    let dense = fields
        .iter()
        .zip(1u32..)
        .all(|(field, expected)| field.order == expected);
    if !dense {
        return Err(ValidationError::NonDenseOrder.into());
    }

    Ok(fields)
}

/// Every `protected` key must appear in `fields` and stay required.
fn check_protected(fields: &[FieldDefinition], protected: &[&str]) -> Result<(), StoreError> {
    match protected
        .iter()
        .find(|key| !fields.iter().any(|f| f.key == **key && f.required))
    {
        Some(key) => Err(StoreError::ProtectedField {
            key: key.to_string(),
        }),
        None => Ok(()),
    }
}
