mod customer;
mod field;

pub use customer::{next_timestamp, CustomerRecord, RecordId, RESERVED_KEYS};
pub use field::{default_fields, FieldDefinition, FieldType, IDENTITY_KEYS};
