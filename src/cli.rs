//! Command-line interface for the download portal.
//!
//! - `serve` runs the HTTP API (`/api/files`, `/api/download`, `/api/bing`, `/health`).
//! - `list` prints the stored artifacts with their platform, CPU family and size.
//! - `prune` applies the version retention policy from the shell, the same
//!   pass that `/api/files?prune=1` runs.
//!
//! All retention logic lives in `download-portal-core`; this module only wires
//! configuration, storage and output together. [`run`] is the entrypoint for
//! both `main()` and the integration tests.
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use download_portal_core::classify::{categorize_platform, format_file_size, mac_arch, Platform};
use download_portal_core::contract::{Bucket, ObjectLister, StoredObject};
use download_portal_core::prune::{prune, PruneReport, PruneRequest};

use crate::config::PortalConfig;
use crate::load_config::load_config;
use crate::server::{run_server, AppState};
use crate::storage;
use crate::wallpaper::WallpaperClient;

/// CLI for download-portal: serve, list and prune release artifacts.
#[derive(Parser)]
#[clap(
    name = "download-portal",
    version,
    about = "Serve and prune versioned release artifacts from object storage"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API using the given config file
    Serve {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// List stored files
    List {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Only list keys starting with this prefix
        #[clap(long)]
        prefix: Option<String>,
    },
    /// Delete all but the newest versions of every product
    Prune {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Only consider keys starting with this prefix
        #[clap(long)]
        prefix: Option<String>,
        /// Versions to keep per product
        #[clap(long, default_value_t = NonZeroUsize::MIN)]
        retain: NonZeroUsize,
        /// Report what would be deleted without deleting anything
        #[clap(long)]
        dry_run: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Serve { config } => {
            let config = load_config(config)?;
            let storage = storage::connect_optional(config.storage.as_ref())?;
            let state = AppState::new(storage, WallpaperClient::new(&config.wallpaper));
            run_server(&config.server.bind, state).await
        }
        Commands::List { config, prefix } => {
            let bucket = require_storage(&load_config(config)?)?;
            let objects = bucket.list(prefix).await.map_err(anyhow::Error::msg)?;
            for object in &objects {
                println!("{}", listing_row(object));
            }
            println!("{} file(s)", objects.len());
            Ok(())
        }
        Commands::Prune {
            config,
            prefix,
            retain,
            dry_run,
        } => {
            let bucket = require_storage(&load_config(config)?)?;
            let request = PruneRequest {
                prefix,
                retain,
                dry: dry_run,
            };
            println!("Prune starting...");
            match prune(bucket.as_ref(), bucket.as_ref(), &request).await {
                Ok(report) => {
                    print!("{}", report_summary(&report));
                    if report.failed.is_empty() {
                        Ok(())
                    } else {
                        anyhow::bail!("{} delete(s) failed", report.failed.len())
                    }
                }
                Err(e) => {
                    eprintln!("[ERROR] Prune failed: {}", e);
                    Err(anyhow::Error::msg(e))
                }
            }
        }
    }
}

fn require_storage(config: &PortalConfig) -> Result<Arc<dyn Bucket>> {
    let storage = config
        .storage
        .as_ref()
        .context("No storage configured: add a `storage` section or set PORTAL_STORAGE_DSN")?;
    storage::connect(storage)
}

/// One line of `list` output: platform, CPU family, size, key.
pub fn listing_row(object: &StoredObject) -> String {
    let platform = categorize_platform(&object.key);
    let arch = match platform {
        Platform::MacOs => mac_arch(&object.key).map_or("-", |arch| arch.label()),
        _ => "-",
    };
    format!(
        "{:<8} {:<12} {:>10}  {}",
        platform.label(),
        arch,
        format_file_size(object.size),
        object.key
    )
}

/// Human-readable prune outcome.
pub fn report_summary(report: &PruneReport) -> String {
    let verb = if report.dry { "would delete" } else { "deleted" };
    let mut out = String::new();
    for key in &report.deleted {
        out.push_str(&format!("{verb}  {key}\n"));
    }
    for failure in &report.failed {
        out.push_str(&format!("failed  {}: {}\n", failure.key, failure.error));
    }
    out.push_str(&format!(
        "Prune complete: {} {}, {} failed, {} remaining\n",
        report.deleted.len(),
        verb,
        report.failed.len(),
        report.files.len()
    ));
    out
}
