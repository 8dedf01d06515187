//! # Astro Compress - Main Entry Point
//!
//! Punto di ingresso della CLI, da lanciare dopo la build del sito.
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (directory di build, config, json, verbose)
//! 2. Configura il logging (`RUST_LOG`, oppure INFO/DEBUG con `--verbose`)
//! 3. Valida che la directory di build esista
//! 4. Carica la configurazione (file esplicito o percorso utente di default)
//! 5. Esegue la compressione; un errore della pipeline non fa fallire il processo
//!
//! ## Esempio di utilizzo:
//! ```bash
//! astro-compress ./dist --config compress.json --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use astro_compress::json_output::JsonMessage;
use astro_compress::{Compressor, Config, LocalFileSystem, TracingLogger};

#[derive(Parser)]
#[command(name = "astro-compress")]
#[command(about = "Compress images and SVG files in a static site build directory")]
struct Args {
    /// Build output directory to compress
    build_directory: PathBuf,

    /// JSON configuration file (defaults to the per-user config, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the run result as JSON on stdout (logs go to stderr)
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

async fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow::anyhow!("Config file does not exist: {}", path.display()));
            }
            Config::from_file(path).await
        }
        None => match Config::default_path() {
            Some(path) => Config::from_file(&path).await,
            None => Ok(Config::default()),
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Validate arguments
    if !args.build_directory.is_dir() {
        return Err(anyhow::anyhow!(
            "Build directory does not exist: {}",
            args.build_directory.display()
        ));
    }

    let config = load_config(args.config.as_ref()).await?;
    let logger = TracingLogger;
    let compressor = Compressor::new(&args.build_directory, &config, &logger, LocalFileSystem);

    if args.json {
        match compressor.compress().await {
            Ok(outcomes) => JsonMessage::complete(outcomes).emit(),
            Err(e) => JsonMessage::error(format!("{:#}", e)).emit(),
        }
    } else {
        compressor.run().await;
    }

    Ok(())
}
