//! # listing-deck CLI
//!
//! Command parsing and orchestration only. The pipeline itself (fetching,
//! encoding, composing, exporting, extracting) lives in `listing-deck-core`;
//! this module wires it to the REST design host and the local filesystem.
//!
//! - `insert`: insert one page per configured listing.
//! - `export`: export the design, extract the bundles and save the files.
//! - `run`: both, through one gated session.
//!
//! For programmatic or integration use, call [`run`] with a constructed [`Cli`].
use crate::design_api::DesignApiClient;
use crate::load_config::{load_config, CliConfig};
use anyhow::Result;
use clap::{Parser, Subcommand};
use listing_deck_core::config::Layout;
use listing_deck_core::download::HttpFetcher;
use listing_deck_core::export::ExportCoordinator;
use listing_deck_core::extract::{extract_bundles, ExtractedFile};
use listing_deck_core::materialise::{materialise, LocalFileSaver};
use listing_deck_core::session::{Collaborators, Session};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// CLI for listing-deck: turn listing images into design pages and export them.
#[derive(Parser)]
#[clap(
    name = "listing-deck",
    version,
    about = "Insert listing images into a design as pages, then export and unpack the result"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Insert one page per listing into the design
    Insert {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Export the design and save the extracted files
    Export {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Insert the listings, then export and save the extracted files
    Run {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Insert { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "insert", listings = config.listings.len(), "Starting insertion");
            let (client, fetcher) = http_collaborators(&config)?;
            let mut session = Session::new(
                Collaborators {
                    fetcher: &fetcher,
                    composer: &client,
                    context: &client,
                    exporter: &client,
                },
                Layout::default(),
                config.export.settings(),
            );
            let report = session.insert_listings(&config.listings).await.map_err(|e| {
                tracing::error!(command = "insert", error = ?e, "Insertion failed");
                e
            })?;
            tracing::info!(
                command = "insert",
                inserted = ?report.inserted_titles(),
                status = session.state().status_message(),
                "Insertion complete"
            );
            Ok(())
        }
        Commands::Export { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "export", "Starting export");
            let (client, fetcher) = http_collaborators(&config)?;
            let settings = config.export.settings();
            settings.trace_loaded();

            let cancel = cancel_on_ctrl_c();
            let coordinator = ExportCoordinator::new(&client, &client, &settings);
            let bundle_urls = coordinator.export(cancel).await.map_err(|e| {
                tracing::error!(command = "export", error = ?e, "Export failed");
                anyhow::Error::new(e).context("Failed to export design.")
            })?;
            let files = extract_bundles(&fetcher, &bundle_urls, &settings.name_prefix)
                .await
                .map_err(|e| {
                    tracing::error!(command = "export", error = ?e, "Extraction failed");
                    anyhow::Error::new(e).context("Failed to extract exported files.")
                })?;
            let saved = save_files(files, &config.export.output_dir)?;
            tracing::info!(command = "export", saved = saved.len(), "Export complete");
            Ok(())
        }
        Commands::Run { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "run", listings = config.listings.len(), "Starting full pipeline");
            let (client, fetcher) = http_collaborators(&config)?;
            let settings = config.export.settings();
            settings.trace_loaded();
            let mut session = Session::new(
                Collaborators {
                    fetcher: &fetcher,
                    composer: &client,
                    context: &client,
                    exporter: &client,
                },
                Layout::default(),
                settings,
            );

            session.insert_listings(&config.listings).await.map_err(|e| {
                tracing::error!(command = "run", error = ?e, "Insertion failed");
                e
            })?;
            let files = session
                .export_and_extract(cancel_on_ctrl_c())
                .await
                .map_err(|e| {
                    tracing::error!(command = "run", error = ?e, state = ?session.state(), "Export failed");
                    e
                })?;
            let saved = save_files(files, &config.export.output_dir)?;
            tracing::info!(
                command = "run",
                saved = saved.len(),
                status = session.state().status_message(),
                "Pipeline complete"
            );
            Ok(())
        }
    }
}

/// Design API client and asset fetcher sharing one HTTP client, bounded by
/// `design.request_timeout_secs`.
pub fn http_collaborators(config: &CliConfig) -> Result<(DesignApiClient, HttpFetcher)> {
    let client = DesignApiClient::new(
        config.design.base_url.clone(),
        config.api_token.clone(),
        config.design.design_id.clone(),
        config.export.poll_interval(),
        config.design.request_timeout(),
    )?;
    let fetcher = HttpFetcher::with_client(client.http_client());
    Ok((client, fetcher))
}

/// Token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling export");
            child.cancel();
        }
    });
    token
}

/// Preview every file, save it under `output_dir`, then release the preview.
pub fn save_files(files: Vec<ExtractedFile>, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let saver = LocalFileSaver::new(output_dir);
    let mut saved = Vec::with_capacity(files.len());
    for file in materialise(files)? {
        tracing::info!(name = %file.file.name, preview = %file.preview.uri(), "Preview ready");
        saved.push(file.save(&saver)?);
        file.into_file()?;
    }
    Ok(saved)
}
