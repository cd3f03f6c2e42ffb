use clap::{Args, Subcommand, ValueEnum};

use netcust_core::{CustomerBook, Direction, FieldDefinition, FieldType};

use super::{confirm, OutputFormat};

#[derive(Clone, Copy, ValueEnum)]
pub enum MoveDirection {
    Up,
    Down,
}

impl From<MoveDirection> for Direction {
    fn from(direction: MoveDirection) -> Self {
        match direction {
            MoveDirection::Up => Direction::Up,
            MoveDirection::Down => Direction::Down,
        }
    }
}

#[derive(Args)]
pub struct FieldCommand {
    #[command(subcommand)]
    pub command: FieldSubcommand,
}

#[derive(Subcommand)]
pub enum FieldSubcommand {
    /// List field definitions in display order
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a custom field
    Add {
        /// Primary (Arabic) label
        #[arg(long)]
        primary: String,

        /// Secondary (English) label
        #[arg(long)]
        secondary: String,

        /// Field type: text, password, ip, number
        #[arg(long = "type", default_value = "text")]
        field_type: FieldType,
    },

    /// Remove a field definition (stored values are kept)
    Remove {
        /// Field ID or key
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Move a field one position up or down
    Move {
        /// Field ID or key
        identifier: String,

        #[arg(value_enum)]
        direction: MoveDirection,
    },
}

impl FieldCommand {
    pub fn run(&self, book: &mut CustomerBook) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            FieldSubcommand::List { format } => {
                let fields = book.fields();
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(fields)?);
                    }
                    OutputFormat::Text => {
                        for field in fields {
                            println!("{}", field);
                            println!("   key: {}  id: {}", field.key, field.id);
                        }
                        println!("\nTotal: {} field(s)", fields.len());
                    }
                }
                Ok(())
            }

            FieldSubcommand::Add {
                primary,
                secondary,
                field_type,
            } => {
                let field = book.add_field(primary, secondary, *field_type)?;
                println!("Added field:");
                println!("{}", field);
                println!("   key: {}", field.key);
                Ok(())
            }

            FieldSubcommand::Remove { identifier, force } => {
                let field = find_field(book, identifier)?;

                if !force
                    && !confirm(&format!(
                        "Remove field '{}'? Existing values stay on the records.",
                        field.label_secondary
                    ))?
                {
                    println!("Removal cancelled.");
                    return Ok(());
                }

                let removed = book.remove_field(&field.id)?;
                println!("Removed field: {}", removed.label_secondary);
                Ok(())
            }

            FieldSubcommand::Move {
                identifier,
                direction,
            } => {
                let field = find_field(book, identifier)?;
                book.reorder_field(&field.id, (*direction).into())?;

                for field in book.fields() {
                    println!("{}", field);
                }
                Ok(())
            }
        }
    }
}

fn find_field(book: &CustomerBook, identifier: &str) -> Result<FieldDefinition, String> {
    let registry = book.registry();
    registry
        .get(identifier)
        .or_else(|| registry.get_by_key(identifier))
        .cloned()
        .ok_or_else(|| format!("Field not found: {}", identifier))
}
