use clap::{Args, Subcommand};

use netcust_core::{CustomerBook, CustomerRecord};

use super::{collect_values, confirm, parse_assignment, print_record, OutputFormat};

#[derive(Args)]
pub struct CustomerCommand {
    #[command(subcommand)]
    pub command: CustomerSubcommand,
}

#[derive(Subcommand)]
pub enum CustomerSubcommand {
    /// Add a new customer
    Add {
        /// Field value as KEY=VALUE (can be repeated)
        #[arg(long = "set", short = 's', value_name = "KEY=VALUE", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },

    /// List customers
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only customers whose name, serial number, location or IP contains this text
        #[arg(long)]
        search: Option<String>,

        /// Only favorites
        #[arg(long)]
        favorites: bool,
    },

    /// Show a customer's details
    Show {
        /// Customer ID or serial number
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Print password fields in clear text
        #[arg(long)]
        reveal: bool,
    },

    /// Update fields of an existing customer
    Update {
        /// Customer ID or serial number
        identifier: String,

        /// New field value as KEY=VALUE (can be repeated)
        #[arg(long = "set", short = 's', value_name = "KEY=VALUE", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },

    /// Delete a customer
    Delete {
        /// Customer ID or serial number
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Toggle a customer's favorite flag
    Favorite {
        /// Customer ID or serial number
        identifier: String,
    },

    /// Delete every customer
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl CustomerCommand {
    pub fn run(&self, book: &mut CustomerBook) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            CustomerSubcommand::Add { values } => {
                let values = collect_values(values, book.fields())?;
                let created = book.create(values)?;
                println!("Created customer:");
                print_record(&created, book.fields(), false);
                Ok(())
            }

            CustomerSubcommand::List {
                format,
                search,
                favorites,
            } => {
                let customers = match (search, *favorites) {
                    (Some(query), false) => book.search(query),
                    (Some(query), true) => book
                        .search(query)
                        .into_iter()
                        .filter(|c| c.is_favorite)
                        .collect(),
                    (None, true) => book.favorites(),
                    (None, false) => book.customers(),
                };

                if customers.is_empty() {
                    println!("No customers found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&customers)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<36}  {:<12}  {:<24}  {:<20}  IP",
                            "ID", "SERIAL", "NAME", "LOCATION"
                        );
                        println!("{}", "-".repeat(110));
                        for customer in &customers {
                            print_row(customer);
                        }
                        println!("\nTotal: {} customer(s)", customers.len());
                    }
                }
                Ok(())
            }

            CustomerSubcommand::Show {
                identifier,
                format,
                reveal,
            } => {
                let customer = resolve(book, identifier)?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&customer)?);
                    }
                    OutputFormat::Text => print_record(&customer, book.fields(), *reveal),
                }
                Ok(())
            }

            CustomerSubcommand::Update { identifier, values } => {
                if values.is_empty() {
                    return Err("Nothing to update. Provide at least one --set KEY=VALUE.".into());
                }

                let customer = resolve(book, identifier)?;
                let values = collect_values(values, book.fields())?;
                let updated = book.update(&customer.id, values)?;
                println!("Updated customer:");
                print_record(&updated, book.fields(), false);
                Ok(())
            }

            CustomerSubcommand::Delete { identifier, force } => {
                let customer = resolve(book, identifier)?;
                let name = display_name(&customer);

                if !force && !confirm(&format!("Delete customer '{}'?", name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                book.delete(&customer.id)?;
                println!("Deleted customer: {}", name);
                Ok(())
            }

            CustomerSubcommand::Favorite { identifier } => {
                let customer = resolve(book, identifier)?;
                let toggled = book.toggle_favorite(&customer.id)?;
                if toggled.is_favorite {
                    println!("Added to favorites: {}", display_name(&toggled));
                } else {
                    println!("Removed from favorites: {}", display_name(&toggled));
                }
                Ok(())
            }

            CustomerSubcommand::Clear { force } => {
                let count = book.customers().len();
                if count == 0 {
                    println!("No customers to delete");
                    return Ok(());
                }

                if !force && !confirm(&format!("Delete all {} customer(s)?", count))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                book.clear_all()?;
                println!("Deleted {} customer(s)", count);
                Ok(())
            }
        }
    }
}

fn resolve(book: &CustomerBook, identifier: &str) -> Result<CustomerRecord, String> {
    book.resolve(identifier)
        .ok_or_else(|| format!("Customer not found: {}", identifier))
}

fn display_name(customer: &CustomerRecord) -> String {
    let name = customer.value("name");
    if name.is_empty() {
        customer.value("serialNumber").to_string()
    } else {
        name.to_string()
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() > width {
        let kept: String = value.chars().take(width - 3).collect();
        format!("{}...", kept)
    } else {
        value.to_string()
    }
}

fn print_row(customer: &CustomerRecord) {
    let marker = if customer.is_favorite { "*" } else { " " };
    println!(
        "{:<36}  {:<12}  {:<24}  {:<20}  {}{}",
        customer.id.to_string(),
        truncate(customer.value("serialNumber"), 12),
        truncate(customer.value("name"), 24),
        truncate(customer.value("location"), 20),
        customer.value("ipAddress"),
        marker
    );
}
