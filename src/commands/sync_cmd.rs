//! Sync CLI commands for backing up to the remote directory.

use clap::{Args, Subcommand, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use netcust_core::{
    CustomerBook, DirectoryRemote, DocumentStorage, RemoteStore, SyncEngine, SyncOutcome,
    UnavailableRemote,
};

use crate::config::Config;

use super::confirm;

#[derive(Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

/// Back up customers to the remote directory
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Upload the current customers and fields (default)
    Push,

    /// Download the remote snapshot
    Pull {
        /// Overwrite local customers and fields with the snapshot
        #[arg(long)]
        apply: bool,

        /// Skip confirmation prompt when applying
        #[arg(long, short)]
        force: bool,
    },

    /// Show sync configuration and last sync
    Status,

    /// Turn automatic sync on reconnect on or off
    Auto {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Watch remote reachability and sync on reconnect while autosync is on
    Watch {
        /// Seconds between reachability checks
        #[arg(long, default_value = "30")]
        interval: u64,
    },
}

impl SyncCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let engine = build_engine(config)?;

        match &self.command {
            None | Some(SyncSubcommand::Push) => push(&engine).await,
            Some(SyncSubcommand::Pull { apply, force }) => pull(&engine, *apply, *force).await,
            Some(SyncSubcommand::Status) => status(&engine, config).await,
            Some(SyncSubcommand::Auto { state }) => {
                let enabled = matches!(state, Toggle::On);
                engine.set_auto_sync(enabled).await?;
                println!(
                    "Auto-sync {}",
                    if enabled { "enabled" } else { "disabled" }
                );
                Ok(())
            }
            Some(SyncSubcommand::Watch { interval }) => {
                watch_remote(Arc::new(engine), Duration::from_secs((*interval).max(1))).await
            }
        }
    }
}

fn build_engine(config: &Config) -> Result<SyncEngine, Box<dyn std::error::Error>> {
    let storage = DocumentStorage::new(&config.data_dir.value);
    let book = CustomerBook::open(storage.clone())?.into_shared();

    let remote: Arc<dyn RemoteStore> = match &config.sync.remote_dir.value {
        Some(dir) => Arc::new(DirectoryRemote::new(dir)),
        None => Arc::new(UnavailableRemote),
    };

    Ok(SyncEngine::new(book, remote, storage)?
        .with_document_name(&config.sync.document_name.value))
}

async fn push(engine: &SyncEngine) -> Result<(), Box<dyn std::error::Error>> {
    println!("Syncing to {}...", engine.document_name());

    match engine.manual_sync().await? {
        SyncOutcome::Uploaded { document, records } => {
            println!("✓ uploaded {} customer(s) to {}", records, document);
        }
        SyncOutcome::Skipped => println!("Sync already in progress."),
    }
    Ok(())
}

async fn pull(
    engine: &SyncEngine,
    apply: bool,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(snapshot) = engine.pull().await? else {
        println!("No remote backup named {}", engine.document_name());
        return Ok(());
    };

    println!(
        "Remote backup: {} customer(s), {} field(s), last updated {}",
        snapshot.customers.len(),
        snapshot.fields.len(),
        snapshot.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if !apply {
        println!("Run with --apply to replace local data with this backup.");
        return Ok(());
    }

    if !force && !confirm("Replace local customers and fields with the remote backup?")? {
        println!("Pull cancelled.");
        return Ok(());
    }

    let count = snapshot.customers.len();
    engine
        .book()
        .write()
        .await
        .apply_snapshot(snapshot.customers, snapshot.fields)?;
    println!("✓ restored {} customer(s)", count);
    Ok(())
}

async fn status(engine: &SyncEngine, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Sync Configuration");
    println!("==================");
    println!();

    let Some(remote_dir) = &config.sync.remote_dir.value else {
        println!("Status: Not configured");
        println!();
        println!("To enable sync, add to your config file:");
        println!();
        println!("  sync:");
        println!("    remote_dir: /path/to/shared/folder");
        println!();
        println!("Or set the environment variable:");
        println!("  NETCUST_REMOTE_DIR");
        return Ok(());
    };

    let metadata = engine.metadata().await;

    println!("Remote:    {}", remote_dir.display());
    println!("Document:  {}", engine.document_name());
    println!(
        "Auto-sync: {}",
        if metadata.auto_sync_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    match metadata.last_sync_time {
        Some(time) => println!("Last sync: {}", time.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("Last sync: never"),
    }
    if let Some(id) = &metadata.remote_file_id {
        println!("File:      {}", id);
    }
    println!();

    print!("Remote status: ");
    if engine.remote().is_available().await {
        println!("✓ reachable");
    } else {
        println!("✗ unreachable");
    }
    Ok(())
}

async fn watch_remote(
    engine: Arc<SyncEngine>,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    if !engine.metadata().await.auto_sync_enabled {
        println!("Auto-sync is disabled; enable it with 'netcust sync auto on'.");
        return Ok(());
    }

    println!(
        "Watching {} every {}s (Ctrl-C to stop)",
        engine.document_name(),
        interval.as_secs()
    );

    let (online_tx, online_rx) = watch::channel(false);
    let task = engine.clone().watch_connectivity(online_rx);
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let online = engine.remote().is_available().await;
                let changed = online_tx.send_if_modified(|current| {
                    if *current == online {
                        return false;
                    }
                    *current = online;
                    true
                });
                if changed {
                    tracing::info!(online, "remote reachability changed");
                    println!("Remote {}", if online { "reachable" } else { "unreachable" });
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(online_tx);
    task.await?;

    if let Some(error) = engine.last_error().await {
        println!("Last sync error: {}", error);
    }
    Ok(())
}
