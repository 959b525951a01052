//! Nexus CRM - a terminal front end for the local-first CRM cache.
//!
//! Every command reads the local snapshot first, so it works offline. When
//! a backend is configured the command then fetches, reconciles and prints
//! the merged view.

mod app;
mod output;

use std::io;
use std::path::Path;

use anyhow::{bail, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use nexus_core::Config;

/// Log file written inside the data directory
const LOG_FILE: &str = "nexus.log";

const USAGE: &str = "\
Usage: nexus <command> [args]

Commands:
  leads                       List leads, syncing with the backend if configured
  sync                        Fetch every collection and reconcile it locally
  stats                       Dashboard statistics (does not commit a sync)
  monitor                     Leads ordered by expiration date
  categories                  List categories
  companies                   List companies
  tasks                       List tasks
  save-lead <json>            Create or replace a lead
  update-lead <id> <json>     Change fields of a lead
  delete-lead <id>            Delete a lead
  save-category <json>        Create or replace a category
  delete-category <id>        Delete a category
  status                      Show local snapshot ages";

/// Initialize the tracing subscriber for logging.
/// Returns the guard that flushes the log file on drop.
fn init_tracing(data_dir: &Path) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = if std::fs::create_dir_all(data_dir).is_ok() {
        let appender = tracing_appender::rolling::never(data_dir, LOG_FILE);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let data_dir = config.data_dir()?;
    let _guard = init_tracing(&data_dir);
    info!(data_dir = %data_dir.display(), remote = config.is_remote_configured(), "Nexus starting");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let app = App::new(&config, data_dir)?;
    let result = match (command.as_str(), &args[1..]) {
        ("leads", []) => app.leads().await,
        ("sync", []) => app.sync_all().await,
        ("stats", []) => app.stats().await,
        ("monitor", []) => app.monitor().await,
        ("categories", []) => app.categories().await,
        ("companies", []) => app.companies().await,
        ("tasks", []) => app.tasks().await,
        ("save-lead", [json]) => app.save_lead(json).await,
        ("update-lead", [id, json]) => app.update_lead(id, json).await,
        ("delete-lead", [id]) => app.delete_lead(id).await,
        ("save-category", [json]) => app.save_category(json).await,
        ("delete-category", [id]) => app.delete_category(id).await,
        ("status", []) => {
            app.status();
            Ok(())
        }
        ("help" | "--help" | "-h", _) => {
            println!("{}", USAGE);
            Ok(())
        }
        _ => bail!("Unknown command or wrong arguments: {}\n\n{}", args.join(" "), USAGE),
    };

    info!("Nexus shutting down");
    result
}
