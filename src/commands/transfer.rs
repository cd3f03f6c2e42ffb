//! CSV export and import.

use clap::Args;
use std::io::Write;
use std::path::PathBuf;

use netcust_core::tabular::{self, HeaderStyle};
use netcust_core::CustomerBook;

use crate::config::Config;

use super::confirm;

/// Export customers to a CSV file
#[derive(Args)]
pub struct ExportCommand {
    /// Output file ("-" for stdout). Defaults to customers_<date>.csv
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Column headers: primary, secondary or key (defaults to export.header)
    #[arg(long)]
    header: Option<HeaderStyle>,

    /// Only favorites
    #[arg(long)]
    favorites: bool,
}

impl ExportCommand {
    pub fn run(&self, book: &CustomerBook, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let customers = if self.favorites {
            book.favorites()
        } else {
            book.customers()
        };
        let header = self.header.unwrap_or(config.export.header.value);
        let bytes = tabular::export(&customers, book.fields(), header)?;

        let output = self.output.clone().unwrap_or_else(|| {
            PathBuf::from(tabular::default_export_file_name(
                chrono::Local::now().date_naive(),
            ))
        });

        if output.as_os_str() == "-" {
            std::io::stdout().write_all(&bytes)?;
            return Ok(());
        }

        std::fs::write(&output, &bytes)?;
        tracing::info!(path = %output.display(), count = customers.len(), "exported customers");
        println!(
            "Exported {} customer(s) to {}",
            customers.len(),
            output.display()
        );
        Ok(())
    }
}

/// Import customers from a CSV file
#[derive(Args)]
pub struct ImportCommand {
    /// CSV file with a header row and columns in field order
    file: PathBuf,

    /// Replace all existing customers instead of appending
    #[arg(long)]
    replace: bool,

    /// Skip confirmation prompt when replacing
    #[arg(long, short)]
    force: bool,
}

impl ImportCommand {
    pub fn run(&self, book: &mut CustomerBook) -> Result<(), Box<dyn std::error::Error>> {
        let bytes = std::fs::read(&self.file)
            .map_err(|e| format!("Failed to read '{}': {}", self.file.display(), e))?;
        let records = tabular::import(&bytes, book.fields())?;

        if records.is_empty() {
            println!("No rows found in {}", self.file.display());
            return Ok(());
        }

        let count = records.len();
        if self.replace {
            let existing = book.customers().len();
            if !self.force
                && existing > 0
                && !confirm(&format!(
                    "Replace {} existing customer(s) with {} imported?",
                    existing, count
                ))?
            {
                println!("Import cancelled.");
                return Ok(());
            }

            book.replace_customers(records)?;
            println!("Imported {} customer(s), replacing {}", count, existing);
        } else {
            let report = book.merge_customers(records)?;
            println!(
                "Imported {} customer(s): {} added, {} updated",
                count, report.added, report.updated
            );
        }
        Ok(())
    }
}
