//! Tabular codec: the RecordSet as spreadsheet rows, and rows as CSV bytes.
//!
//! Rows are schema-ordered. Reading is positional against the current
//! schema; header text is never matched.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{CustomerRecord, FieldDefinition};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to flush CSV output: {0}")]
    Io(#[from] std::io::Error),
}

/// Which label becomes the column header on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderStyle {
    #[default]
    Primary,
    Secondary,
    Key,
}

impl HeaderStyle {
    fn label<'a>(&self, field: &'a FieldDefinition) -> &'a str {
        match self {
            HeaderStyle::Primary => &field.label_primary,
            HeaderStyle::Secondary => &field.label_secondary,
            HeaderStyle::Key => &field.key,
        }
    }
}

impl std::str::FromStr for HeaderStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary" => Ok(HeaderStyle::Primary),
            "secondary" => Ok(HeaderStyle::Secondary),
            "key" => Ok(HeaderStyle::Key),
            _ => Err(format!(
                "Invalid header style: '{}'. Valid styles: primary, secondary, key",
                s
            )),
        }
    }
}

fn ordered(fields: &[FieldDefinition]) -> Vec<&FieldDefinition> {
    let mut sorted: Vec<&FieldDefinition> = fields.iter().collect();
    sorted.sort_by_key(|f| f.order);
    sorted
}

/// Header row of primary labels followed by one row per record.
pub fn to_rows(records: &[CustomerRecord], fields: &[FieldDefinition]) -> Vec<Vec<String>> {
    to_rows_with_header(records, fields, HeaderStyle::Primary)
}

pub fn to_rows_with_header(
    records: &[CustomerRecord],
    fields: &[FieldDefinition],
    header: HeaderStyle,
) -> Vec<Vec<String>> {
    let fields = ordered(fields);

    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(fields.iter().map(|f| header.label(f).to_string()).collect());
    rows.extend(records.iter().map(|record| {
        fields
            .iter()
            .map(|f| record.value(&f.key).to_string())
            .collect()
    }));
    rows
}

/// Reads data rows positionally against the schema order.
///
/// The first row is the header and only fixes how many columns are read.
/// Missing cells become `""`; each record gets a fresh id and timestamps.
/// Required fields are not checked here.
pub fn from_rows(rows: &[Vec<String>], fields: &[FieldDefinition]) -> Vec<CustomerRecord> {
    let Some((header, data)) = rows.split_first() else {
        return Vec::new();
    };
    let fields = ordered(fields);
    let width = header.len();

    data.iter()
        .map(|row| {
            let values: BTreeMap<String, String> = fields
                .iter()
                .enumerate()
                .map(|(col, field)| {
                    let cell = if col < width {
                        row.get(col).cloned().unwrap_or_default()
                    } else {
                        String::new()
                    };
                    (field.key.clone(), cell)
                })
                .collect();
            CustomerRecord::new(values)
        })
        .collect()
}

/// Serializes rows as CSV.
pub fn encode(rows: &[Vec<String>]) -> Result<Vec<u8>, CodecError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    writer.into_inner().map_err(|e| CodecError::Io(e.into_error()))
}

/// Parses CSV bytes into rows. A leading UTF-8 BOM is ignored.
pub fn decode(bytes: &[u8]) -> Result<Vec<Vec<String>>, CodecError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// `to_rows` + `encode`.
pub fn export(
    records: &[CustomerRecord],
    fields: &[FieldDefinition],
    header: HeaderStyle,
) -> Result<Vec<u8>, CodecError> {
    encode(&to_rows_with_header(records, fields, header))
}

/// `decode` + `from_rows`.
pub fn import(bytes: &[u8], fields: &[FieldDefinition]) -> Result<Vec<CustomerRecord>, CodecError> {
    Ok(from_rows(&decode(bytes)?, fields))
}

/// `customers_<YYYY-MM-DD>.csv`
pub fn default_export_file_name(date: NaiveDate) -> String {
    format!("customers_{}.csv", date.format("%Y-%m-%d"))
}
