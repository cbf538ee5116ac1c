//! pagetree
//!
//! Serves or statically builds a site from a pages directory.
//!
//! # Architecture Overview
//!
//! ```text
//!     pages/ ──▶ routing::fs ──▶ PageRegistry ──▶ PageRouter ──▶ RouteConfigManager
//!                                                     │                 │
//!                                                     ▼                 ▼
//!                                               EntriesManager ◀────────┘
//!                                                     │
//!                              ┌──────────────────────┴──────────────────────┐
//!                              ▼                                             ▼
//!                     http::RequestHandler                           build::SiteBuilder
//!                     (serve: elements / HTML)                       (files under out_dir)
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use pagetree::config::{load_config, SiteConfig};
use pagetree::lifecycle::signals::forward_signals;
use pagetree::lifecycle::StartupError;
use pagetree::observability::{init_logging, metrics};
use pagetree::{Shutdown, Site};

#[derive(Parser)]
#[command(name = "pagetree")]
#[command(about = "File-driven page router: serve or build a site", long_about = None)]
struct Cli {
    /// Path to the site configuration file.
    #[arg(short, long, default_value = "pagetree.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve documents and elements maps over HTTP
    Serve {
        /// Override `server.bind_address`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Write every static route to the output directory
    Build {
        /// Override `build.out_dir`.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        load_config(&cli.config).map_err(StartupError::from)?
    } else {
        SiteConfig::default()
    };
    init_logging(&config.observability.log_level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        loaded = cli.config.exists(),
        "pagetree starting"
    );

    match cli.command {
        Commands::Serve { bind } => serve(config, bind).await?,
        Commands::Build { out_dir } => build(config, out_dir).await?,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn serve(mut config: SiteConfig, bind: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let address = config.server.bind_address.clone();
    let site = Site::load(config)?;
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    tokio::spawn(forward_signals(shutdown.clone()));
    site.server().run(listener, shutdown.wait()).await?;
    Ok(())
}

async fn build(mut config: SiteConfig, out_dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(out_dir) = out_dir {
        config.build.out_dir = out_dir;
    }
    let site = Site::load(config)?;
    let report = site.builder().build().await?;
    tracing::info!(
        elements_files = report.elements_files.len(),
        html_files = report.html_files.len(),
        "Build finished"
    );
    Ok(())
}
