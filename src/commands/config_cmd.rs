use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::config::Config;

use super::OutputFormat;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# netcust configuration

# Directory for customers.json, customer_fields.json and sync_settings.json
# (default: ~/.local/share/netcust)
# data_dir: ~/.local/share/netcust

# Remote backup. Point remote_dir at a shared or mounted folder to enable sync.
# sync:
#   remote_dir: /mnt/backup/netcust
#   document_name: net_customers_backup.json

# CSV column headers: primary, secondary or key
export:
  header: primary
"#;

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!();

                        match &config.sync.remote_dir.value {
                            Some(dir) => println!("sync.remote_dir: {}", dir.display()),
                            None => println!("sync.remote_dir: (not set)"),
                        }
                        println!("  source: {}", config.sync.remote_dir.source);
                        println!();

                        println!("sync.document_name: {}", config.sync.document_name.value);
                        println!("  source: {}", config.sync.document_name.source);
                        println!();

                        let header = serde_json::to_value(config.export.header.value)?;
                        println!("export.header: {}", header.as_str().unwrap_or_default());
                        println!("  source: {}", config.export.header.source);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = config_path.unwrap_or_else(Config::default_config_path);

                // Check if config already exists
                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'netcust config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(&config_path)?;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}
