use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{
    ConfigCommand, CustomerCommand, ExportCommand, FieldCommand, ImportCommand, SyncCommand,
};
use config::Config;
use netcust_core::{CustomerBook, DocumentStorage};

#[derive(Parser)]
#[command(name = "netcust")]
#[command(version)]
#[command(about = "Customer records for network installations", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage customers
    Customer(CustomerCommand),

    /// Manage the customer field schema
    Field(FieldCommand),

    /// Export customers to CSV
    Export(ExportCommand),

    /// Import customers from CSV
    Import(ImportCommand),

    /// Back up to the remote directory
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netcust=warn,netcust_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Save config path for init command
    let cli_config_path = cli.config.clone();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Customer(cmd)) => {
            let mut book = open_book(&config)?;
            cmd.run(&mut book)?;
        }
        Some(Commands::Field(cmd)) => {
            let mut book = open_book(&config)?;
            cmd.run(&mut book)?;
        }
        Some(Commands::Export(cmd)) => {
            let book = open_book(&config)?;
            cmd.run(&book, &config)?;
        }
        Some(Commands::Import(cmd)) => {
            let mut book = open_book(&config)?;
            cmd.run(&mut book)?;
        }
        Some(Commands::Sync(cmd)) => {
            cmd.run(&config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config, cli_config_path)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

fn open_book(config: &Config) -> Result<CustomerBook, Box<dyn std::error::Error>> {
    Ok(CustomerBook::open(DocumentStorage::new(
        &config.data_dir.value,
    ))?)
}
