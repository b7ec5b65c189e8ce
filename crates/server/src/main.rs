//! scanline: page-image OCR and PDF extraction, from the command line or over HTTP.
//!
//! ```bash
//! scanline image scans/page-1.png --persist
//! scanline force-ocr scans/report.pdf
//! scanline tables scans/report.pdf
//! scanline serve --port 8000
//! ```

mod cli;
mod error;
mod logging;
mod server;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use scanline_core::Settings;

const DEFAULT_CONFIG_FILES: &[&str] = &["config.yaml", "config.yml", "config.json", "config.toml"];

#[derive(Parser)]
#[command(name = "scanline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "OCR for scanned pages and PDF documents", long_about = None)]
struct Cli {
    /// Settings file (YAML, JSON or TOML). Defaults to ./config.yaml if present.
    #[arg(long, global = true, env = "SCANLINE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long, env = "SCANLINE_HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(long, env = "SCANLINE_PORT")]
        port: Option<u16>,
    },
    /// Run a page image through orientation, text, word data and searchable PDF
    Image {
        path: PathBuf,

        /// Keep the searchable PDF and text as scratch files
        #[arg(long)]
        persist: bool,

        /// Include the word table in the output
        #[arg(long)]
        words: bool,
    },
    /// OCR every page of a PDF into a new searchable PDF
    ForceOcr { document: PathBuf },
    /// Extract tables from a text-based PDF
    Tables { document: PathBuf },
    /// Print the effective settings
    ShowConfig,
}

fn load_settings(explicit: Option<&Path>) -> anyhow::Result<Settings> {
    if let Some(path) = explicit {
        return Settings::load(path).with_context(|| format!("loading {}", path.display()));
    }
    for name in DEFAULT_CONFIG_FILES {
        let path = Path::new(name);
        if path.is_file() {
            return Settings::load(path).with_context(|| format!("loading {name}"));
        }
    }
    Ok(Settings::default())
}

/// Run blocking extraction work off the async runtime.
async fn blocking<T, F>(f: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    logging::init_tracing(settings.log_format);

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            info!(upload_dir = %settings.server.upload_dir.display(), "starting server");
            server::run_server(&settings.server).await?;
        }
        Commands::Image { path, persist, words } => {
            let opts = cli::ImageOptions { persist, words };
            let summary = blocking(move || cli::run_image(&settings, &path, &opts)).await?;
            cli::print_json(&summary)?;
        }
        Commands::ForceOcr { document } => {
            let summary = blocking(move || cli::run_force_ocr(&settings, &document)).await?;
            cli::print_json(&summary)?;
        }
        Commands::Tables { document } => {
            let summary = blocking(move || cli::run_tables(&settings, &document)).await?;
            cli::print_json(&summary)?;
        }
        Commands::ShowConfig => {
            print!("{}", cli::show_config(&settings)?);
        }
    }

    Ok(())
}
