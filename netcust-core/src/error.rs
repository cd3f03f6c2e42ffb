//! Errors raised by the Schema Registry and the Record Store.

use thiserror::Error;

use crate::models::RecordId;
use crate::storage::StorageError;

/// Input rejected before any state changed. The caller can correct and retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field resolved to a blank value. Carries the key and its
    /// label so the caller can localize the message.
    #[error("Required field '{label}' ({key}) must not be empty")]
    MissingRequired { key: String, label: String },

    #[error("Field labels must not be blank")]
    BlankLabel,

    #[error("Duplicate field key: {0}")]
    DuplicateKey(String),

    #[error("Field key '{0}' belongs to a removed field and cannot be reused")]
    RetiredKey(String),

    #[error("Field order must be a contiguous 1..N sequence")]
    NonDenseOrder,

    #[error("Field list must not be empty")]
    EmptySchema,

    #[error("Duplicate record id: {0}")]
    DuplicateId(RecordId),

    #[error("'{0}' is reserved for record metadata")]
    ReservedKey(String),
}

/// Errors from Schema Registry and Record Store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Customer not found: {0}")]
    NotFound(RecordId),

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Field '{key}' is required and cannot be removed")]
    ProtectedField { key: String },

    /// Durable write or read failed. In-memory state has been rolled back.
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_message_names_field() {
        let err: StoreError = ValidationError::MissingRequired {
            key: "serialNumber".into(),
            label: "Serial Number".into(),
        }
        .into();
        let message = err.to_string();
        assert!(message.contains("Serial Number"));
        assert!(message.contains("serialNumber"));
    }

    #[test]
    fn test_protected_field_message() {
        let err = StoreError::ProtectedField { key: "name".into() };
        assert_eq!(err.to_string(), "Field 'name' is required and cannot be removed");
    }
}
