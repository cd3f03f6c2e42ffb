mod config_cmd;
mod customer;
mod field;
mod sync_cmd;
mod transfer;

use clap::ValueEnum;
use std::collections::BTreeMap;
use std::io::{self, Write};

use netcust_core::{CustomerRecord, FieldDefinition, FieldType};

pub use config_cmd::ConfigCommand;
pub use customer::CustomerCommand;
pub use field::FieldCommand;
pub use sync_cmd::SyncCommand;
pub use transfer::{ExportCommand, ImportCommand};

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parses a `key=value` assignment.
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Expected KEY=VALUE, got '{}'", s)),
    }
}

/// Collects assignments into a value map, rejecting keys the schema doesn't define.
fn collect_values(
    assignments: &[(String, String)],
    fields: &[FieldDefinition],
) -> Result<BTreeMap<String, String>, String> {
    let mut values = BTreeMap::new();
    for (key, value) in assignments {
        if !fields.iter().any(|f| &f.key == key) {
            let known: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();
            return Err(format!(
                "Unknown field '{}'. Known fields: {}",
                key,
                known.join(", ")
            ));
        }
        values.insert(key.clone(), value.clone());
    }
    Ok(values)
}

/// Prints a record field by field in schema order.
fn print_record(record: &CustomerRecord, fields: &[FieldDefinition], reveal: bool) {
    println!("ID: {}", record.id);
    if record.is_favorite {
        println!("Favorite: yes");
    }
    println!();

    for field in fields {
        let value = record.value(&field.key);
        let shown = if field.field_type == FieldType::Password && !reveal && !value.is_empty() {
            "********".to_string()
        } else {
            value.to_string()
        };
        println!("  {:<20} {}", field.label_secondary, shown);
    }

    let orphaned: Vec<_> = record
        .values
        .iter()
        .filter(|(key, _)| !fields.iter().any(|f| f.key == **key))
        .collect();
    if !orphaned.is_empty() {
        println!("\n  Removed fields:");
        for (key, value) in orphaned {
            println!("  {:<20} {}", key, value);
        }
    }

    println!();
    println!("Created: {}", record.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Updated: {}", record.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
}

/// Asks for a y/N confirmation on stdin.
fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
